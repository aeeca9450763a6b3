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

use log::info;

use crate::smtp::codes::*;
use crate::smtp::command::CommandHandler;
use crate::smtp::consumer::Consumed;
use crate::smtp::reply::{Reply, Transition};
use crate::smtp::session::Session;
use crate::smtp::state::SessionState;
use crate::support::error::Error;

fn valid_in_dialog(state: &SessionState) -> bool {
    SessionState::Connected == *state || state.is_greeted()
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Noop;

impl CommandHandler for Noop {
    fn valid_for_state(&self, state: &SessionState) -> bool {
        valid_in_dialog(state)
    }

    fn handle_valid_command(
        &self,
        _session: &mut Session,
        _line: Option<&str>,
    ) -> Result<Consumed, Error> {
        Ok(Transition::stay(Reply::ok()).into())
    }
}

/// VRFY. We never disclose whether a mailbox exists.
#[derive(Clone, Copy, Debug, Default)]
pub struct Verify;

impl CommandHandler for Verify {
    fn valid_for_state(&self, state: &SessionState) -> bool {
        valid_in_dialog(state)
    }

    fn handle_valid_command(
        &self,
        _session: &mut Session,
        _line: Option<&str>,
    ) -> Result<Consumed, Error> {
        Ok(Transition::stay(Reply::new(
            pc::CannotVerify,
            "Cannot VRFY user, but will accept message and attempt delivery",
        ))
        .into())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Help;

impl CommandHandler for Help {
    fn valid_for_state(&self, state: &SessionState) -> bool {
        valid_in_dialog(state)
    }

    fn handle_valid_command(
        &self,
        _session: &mut Session,
        _line: Option<&str>,
    ) -> Result<Consumed, Error> {
        Ok(Transition::stay(Reply::new(
            pc::HelpMessage,
            "See RFC 5321 <https://tools.ietf.org/html/rfc5321>",
        ))
        .into())
    }
}

/// QUIT. Accepted in every state once connected, including after the
/// greeting was a rejection.
#[derive(Clone, Copy, Debug, Default)]
pub struct Quit;

impl CommandHandler for Quit {
    fn valid_for_state(&self, state: &SessionState) -> bool {
        !matches!(
            *state,
            SessionState::BeforeConnect | SessionState::EndingSession
        )
    }

    fn handle_valid_command(
        &self,
        session: &mut Session,
        _line: Option<&str>,
    ) -> Result<Consumed, Error> {
        info!("{} Client quit", session.log_prefix());
        session.clear_mail();
        Ok(Transition::to(
            Reply::new(
                pc::ServiceClosing,
                format!(
                    "{} Service closing transmission channel",
                    session.config().host_name
                ),
            ),
            SessionState::EndingSession,
        )
        .into())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::smtp::test_support::*;

    #[test]
    fn informational_commands() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);

        assert_eq!(Reply::ok(), send(&mut session, "NOOP"));
        assert_eq!(Reply::ok(), send(&mut session, "noop with args"));
        assert_eq!(Some(252), send(&mut session, "VRFY zim").code());
        assert_eq!(Some(214), send(&mut session, "HELP").code());
        assert_eq!(SessionState::Connected, *session.state());
    }

    #[test]
    fn quit() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);
        ready_for_data(&mut session);

        let reply = send(&mut session, "QUIT");
        assert_eq!(Some(221), reply.code());
        assert!(reply.closes_connection());
        assert_eq!(SessionState::EndingSession, *session.state());
        assert_eq!(1, service.journal().count("dispose"));

        assert_eq!(Reply::bad_sequence(), send(&mut session, "NOOP"));
    }

    struct Refuse;
    impl CommandHandler for Refuse {
        fn valid_for_state(&self, state: &SessionState) -> bool {
            SessionState::BeforeConnect == *state
        }

        fn handle_valid_command(
            &self,
            _session: &mut Session,
            _line: Option<&str>,
        ) -> Result<Consumed, Error> {
            Ok(Transition::to(
                Reply::new(pc::TransactionFailed, "No service for you"),
                SessionState::ConnectRejected,
            )
            .into())
        }
    }

    #[test]
    fn only_quit_after_rejected_connection() {
        let service = RecordingMailService::default();
        let engine = builder(&service)
            .connect_handler(Some(Arc::new(Refuse)))
            .build();
        let mut session = engine.new_session("peer");

        assert_eq!(Some(554), session.connect().unwrap().code());
        assert_eq!(SessionState::ConnectRejected, *session.state());

        assert_eq!(
            Reply::bad_sequence(),
            send(&mut session, "EHLO gir.example")
        );
        assert_eq!(Reply::bad_sequence(), send(&mut session, "NOOP"));
        assert_eq!(Some(221), send(&mut session, "QUIT").code());
    }
}
