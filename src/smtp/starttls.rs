//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Parlour.
//
// Parlour is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Parlour is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Parlour. If not, see <http://www.gnu.org/licenses/>.

//! RFC 3207 STARTTLS.
//!
//! The engine does no TLS work itself. Accepting STARTTLS produces
//! `Reply::StartTls`; the transport sends it, performs the handshake, then
//! calls `Session::tls_established`.

use std::borrow::Cow;
use std::sync::Arc;

use log::{info, warn};

use super::codes::*;
use super::command::CommandHandler;
use super::consumer::Consumed;
use super::extension::Extension;
use super::reply::{Reply, Transition};
use super::session::Session;
use super::state::SessionState;
use super::syntax::arguments;
use crate::support::error::Error;

/// Offers STARTTLS when the configuration allows and TLS is not yet active.
#[derive(Clone, Copy, Debug, Default)]
pub struct StartTlsExtension;

impl Extension for StartTlsExtension {
    fn name(&self) -> &str {
        "STARTTLS"
    }

    fn ehlo_keyword(&self) -> &str {
        "STARTTLS"
    }

    fn is_available(&self, session: &Session) -> bool {
        // RFC 3207 forbids offering STARTTLS once TLS is in use
        session.config().offer_starttls && !session.is_tls()
    }

    fn command_handlers(&self) -> Vec<(String, Arc<dyn CommandHandler>)> {
        let handler: Arc<dyn CommandHandler> = Arc::new(StartTlsCommand);
        vec![("STARTTLS".to_owned(), handler)]
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StartTlsCommand;

impl CommandHandler for StartTlsCommand {
    fn valid_for_state(&self, state: &SessionState) -> bool {
        matches!(*state, SessionState::Connected | SessionState::AfterEhlo)
    }

    fn handle_valid_command(
        &self,
        session: &mut Session,
        line: Option<&str>,
    ) -> Result<Consumed, Error> {
        if session.is_tls() {
            return Ok(Transition::stay(Reply::new(
                pc::BadSequenceOfCommands,
                "TLS already active",
            ))
            .into());
        }

        if !session.config().offer_starttls {
            warn!("{} Rejected STARTTLS: not offered", session.log_prefix());
            return Ok(Transition::stay(Reply::new(
                pc::CommandNotImplemented,
                "STARTTLS not available",
            ))
            .into());
        }

        if !line.map(arguments).unwrap_or("").is_empty() {
            return Ok(Transition::stay(Reply::syntax_error(
                "Syntax: STARTTLS (no parameters allowed)",
            ))
            .into());
        }

        info!("{} Starting TLS", session.log_prefix());
        Ok(Transition::stay(Reply::StartTls(Cow::Borrowed(
            "Ready to start TLS",
        )))
        .into())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::smtp::test_support::*;

    fn tls_session(service: &RecordingMailService) -> Session {
        let mut config = test_config();
        config.offer_starttls = true;
        let engine = builder_with_config(service, config)
            .standard_extensions()
            .build();
        let mut session = engine.new_session("peer");
        session.connect().unwrap();
        session
    }

    #[test]
    fn advertised_until_tls_established() {
        let service = RecordingMailService::default();
        let mut session = tls_session(&service);

        let reply = send(&mut session, "EHLO gir.example");
        assert_eq!("STARTTLS", reply.text());

        assert!(send(&mut session, "STARTTLS").is_start_tls());
        session.tls_established("TLSv1.3".to_owned());
        assert_eq!(SessionState::Connected, *session.state());
        assert_eq!(Some("TLSv1.3"), session.tls_info());

        let reply = send(&mut session, "EHLO gir.example");
        assert_ne!("STARTTLS", reply.text());
        assert_eq!(
            Reply::new(pc::BadSequenceOfCommands, "TLS already active"),
            send(&mut session, "STARTTLS")
        );
    }

    #[test]
    fn handshake_forgets_session_state() {
        let service = RecordingMailService::default();
        let mut session = tls_session(&service);
        send(&mut session, "EHLO gir.example");
        session.properties_mut().set("x-custom", 1u32);

        assert!(send(&mut session, "STARTTLS").is_start_tls());
        session.tls_established("TLSv1.3".to_owned());
        assert!(!session.properties().contains("x-custom"));
        assert!(!session
            .properties()
            .contains(crate::smtp::commands::HELO_PROPERTY));
        assert_eq!(
            Reply::bad_sequence(),
            send(&mut session, "MAIL FROM:<dib@earth.example>")
        );
    }

    #[test]
    fn rejects_arguments_and_bad_sequence() {
        let service = RecordingMailService::default();
        let mut session = tls_session(&service);

        assert_eq!(Some(501), send(&mut session, "STARTTLS now").code());
        ready_for_data(&mut session);
        assert_eq!(Reply::bad_sequence(), send(&mut session, "STARTTLS"));
    }

    #[test]
    fn not_offered() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);
        assert_eq!(Some(502), send(&mut session, "STARTTLS").code());
    }
}
