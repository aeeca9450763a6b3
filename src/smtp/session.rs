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

use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};

use super::auth::{
    SaslMechanism, AUTH_CONSUMER_KEY, AUTH_MECHANISM_PROPERTY,
};
use super::consumer::{Consumed, LineConsumer, LineConsumerChain};
use super::engine::Engine;
use super::extension::Extension;
use super::line::Line;
use super::mail::MailObject;
use super::properties::Properties;
use super::reply::{Reply, Transition};
use super::state::SessionState;
use crate::support::{
    error::Error, log_prefix::LogPrefix, system_config::SmtpConfig,
};

/// The key under which the command router is installed.
pub const ROUTER_CONSUMER_KEY: &str = "router";

/// The protocol state of one connection.
///
/// A session is driven by a single thread; lines are fed to `consume` one at
/// a time in arrival order. Each line passes through the line consumer chain,
/// most recently installed consumer first, with the command router at the
/// end.
pub struct Session {
    engine: Arc<Engine>,
    peer_name: String,
    log_prefix: LogPrefix,
    state: SessionState,
    mail: Option<Box<dyn MailObject>>,
    properties: Properties,
    tls: Option<String>,
    consumers: LineConsumerChain,
}

impl Session {
    pub(super) fn new(engine: Arc<Engine>, peer_name: String) -> Self {
        let log_prefix = LogPrefix::new("smtp".to_owned());
        log_prefix.set_peer(peer_name.clone());

        let mut consumers = LineConsumerChain::new();
        consumers.add(ROUTER_CONSUMER_KEY, Arc::new(engine.build_router()));
        // Installed in reverse so that extension consumers are evaluated in
        // the order the extensions were registered.
        for extension in engine.extensions().iter().rev() {
            if let Some(consumer) = extension.line_consumer() {
                consumers.add(extension.name(), consumer);
            }
        }

        Session {
            engine,
            peer_name,
            log_prefix,
            state: SessionState::BeforeConnect,
            mail: None,
            properties: Properties::new(),
            tls: None,
            consumers,
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn config(&self) -> &SmtpConfig {
        self.engine.config()
    }

    /// The name of the remote end, as reported by the transport.
    pub fn peer_name(&self) -> &str {
        &self.peer_name
    }

    pub fn log_prefix(&self) -> &LogPrefix {
        &self.log_prefix
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Forces the session into `state`.
    ///
    /// Normally states change only through the transitions returned by line
    /// consumers.
    pub fn set_state(&mut self, state: SessionState) {
        if state != self.state {
            debug!("{} State {} => {}", self.log_prefix, self.state, state);
            self.state = state;
        }
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// The extensions configured for this connection. Which of them are
    /// currently offered is up to each extension's `is_available`.
    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        self.engine.extensions()
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// A description of the TLS session, if TLS has been established.
    pub fn tls_info(&self) -> Option<&str> {
        self.tls.as_deref()
    }

    /// Called by the transport once a STARTTLS handshake has completed.
    ///
    /// Per RFC 3207, everything learnt from the client before the handshake
    /// is forgotten and the client must greet again.
    pub fn tls_established(&mut self, description: String) {
        info!("{} TLS established: {}", self.log_prefix, description);
        self.clear_mail();
        self.abandon_auth();
        self.properties.clear_all();
        self.log_prefix.clear_user();
        self.tls = Some(description);
        self.set_state(SessionState::Connected);
    }

    pub fn has_mail(&self) -> bool {
        self.mail.is_some()
    }

    pub fn mail_mut(&mut self) -> Option<&mut (dyn MailObject + 'static)> {
        self.mail.as_deref_mut()
    }

    /// Asks the mail service for a new mail object. The result is not
    /// installed; see `set_mail`.
    pub fn new_mail(&self) -> Box<dyn MailObject> {
        self.engine.mail_service().new_mail(self)
    }

    /// Installs `mail` as the current mail object, disposing any previous
    /// one.
    pub fn set_mail(&mut self, mail: Box<dyn MailObject>) {
        self.clear_mail();
        self.mail = Some(mail);
    }

    /// Disposes and drops the current mail object, if any.
    pub fn clear_mail(&mut self) {
        if let Some(mut mail) = self.mail.take() {
            mail.dispose();
        }
    }

    /// Completes the current mail object, then disposes and drops it.
    pub fn finish_mail(&mut self) -> Result<Reply, Error> {
        let mut mail = self.mail.take().ok_or_else(|| {
            Error::Mail("No mail transaction in progress".to_owned())
        })?;
        let result = mail.complete();
        mail.dispose();
        result
    }

    /// Installs `consumer` at the front of the chain under `key`, replacing
    /// any consumer with the same key.
    ///
    /// If called while a line is being processed, the change takes effect
    /// from the next line.
    pub fn add_line_consumer(
        &mut self,
        key: impl Into<String>,
        consumer: Arc<dyn LineConsumer>,
    ) {
        self.consumers.add(key, consumer);
    }

    pub fn remove_line_consumer(&mut self, key: &str) -> bool {
        self.consumers.remove(key)
    }

    pub fn line_consumers(&self) -> &LineConsumerChain {
        &self.consumers
    }

    /// Produces the greeting for a newly accepted connection.
    ///
    /// If no consumer handles the connect event, a 554 is returned and the
    /// state is left at `BeforeConnect`.
    pub fn connect(&mut self) -> Result<Reply, Error> {
        info!("{} Connection accepted", self.log_prefix);
        for consumer in self.consumers.snapshot() {
            if let Consumed::Handled(transition) = consumer.connect(self)? {
                return Ok(self.apply(transition));
            }
        }

        error!(
            "{} No connect handler accepted the connection",
            self.log_prefix
        );
        Ok(self.apply(Transition::stay(Reply::server_error())))
    }

    /// Processes one line from the client.
    ///
    /// `line` must include its terminator. The consumers in the chain at the
    /// time of the call are offered the line in order until one handles it;
    /// if none does, the reply is 500.
    ///
    /// Errors are only returned for failures a command deliberately lets
    /// escape; the transport should treat them as fatal to the connection.
    pub fn consume(&mut self, line: &mut Line) -> Result<Reply, Error> {
        for consumer in self.consumers.snapshot() {
            if let Consumed::Handled(transition) = consumer.consume(self, line)?
            {
                return Ok(self.apply(transition));
            }
        }

        let mut debug_line = line.verb();
        if let Some((truncate_len, _)) = debug_line.char_indices().nth(64) {
            debug_line = &debug_line[..truncate_len];
        }
        warn!("{} Unrecognised command {:?}", self.log_prefix, debug_line);
        Ok(self.apply(Transition::stay(Reply::unrecognised())))
    }

    /// Called by the transport when the connection goes away, cleanly or
    /// not.
    pub fn connection_lost(&mut self) {
        if self.mail.is_some() {
            info!(
                "{} Connection lost with a mail transaction in progress",
                self.log_prefix
            );
        }
        self.clear_mail();
        self.abandon_auth();
    }

    /// Disposes the mechanism of an unfinished AUTH exchange, if any.
    fn abandon_auth(&mut self) {
        if let Some(mut mechanism) = self
            .properties
            .take::<Box<dyn SaslMechanism>>(AUTH_MECHANISM_PROPERTY)
        {
            mechanism.dispose();
        }
        self.consumers.remove(AUTH_CONSUMER_KEY);
    }

    fn apply(&mut self, transition: Transition) -> Reply {
        let (reply, next_state) = transition.into_parts();
        if let Some(state) = next_state {
            self.set_state(state);
        }
        reply
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.clear_mail();
        self.abandon_auth();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Session")
            .field("peer_name", &self.peer_name)
            .field("state", &self.state)
            .field("has_mail", &self.mail.is_some())
            .field("properties", &self.properties)
            .field("tls", &self.tls)
            .field("consumers", &self.consumers)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::borrow::Cow;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use proptest::prelude::*;

    use super::*;
    use crate::smtp::codes::*;
    use crate::smtp::command::CommandHandler;
    use crate::smtp::commands::standard_commands;
    use crate::smtp::test_support::*;

    struct FnConsumer<F>(F);

    impl<F> LineConsumer for FnConsumer<F>
    where
        F: Fn(&mut Session, &mut Line) -> Result<Consumed, Error> + Send + Sync,
    {
        fn consume(
            &self,
            session: &mut Session,
            line: &mut Line,
        ) -> Result<Consumed, Error> {
            (self.0)(session, line)
        }
    }

    fn consumer<F>(f: F) -> Arc<dyn LineConsumer>
    where
        F: Fn(&mut Session, &mut Line) -> Result<Consumed, Error>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(FnConsumer(f))
    }

    fn replying(text: &'static str) -> Arc<dyn LineConsumer> {
        consumer(move |_: &mut Session, _: &mut Line| {
            Ok(Transition::stay(Reply::new(pc::Ok, text)).into())
        })
    }

    #[test]
    fn unrecognised_command() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);
        assert_eq!(Reply::unrecognised(), send(&mut session, "FROB"));
        assert_eq!(SessionState::Connected, *session.state());
    }

    proptest! {
        #[test]
        fn unregistered_verbs_are_unrecognised(
            verb in "[A-Za-z]{1,10}",
            args in "( [!-~]{1,16})?",
        ) {
            let service = RecordingMailService::default();
            let mut session = connected_session(&service);

            let upper = verb.to_ascii_uppercase();
            let registered = standard_commands()
                .into_iter()
                .map(|(verb, _)| verb.to_owned())
                .chain(
                    session
                        .extensions()
                        .iter()
                        .flat_map(|e| e.command_handlers())
                        .map(|(verb, _)| verb.to_ascii_uppercase()),
                )
                .any(|registered| registered == upper);
            prop_assume!(!registered);

            prop_assert_eq!(
                Reply::unrecognised(),
                send(&mut session, &format!("{}{}", verb, args))
            );
            prop_assert_eq!(&SessionState::Connected, session.state());
        }
    }

    #[test]
    fn consumer_replaced_by_key() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);
        let consumers = session.line_consumers().len();

        session.add_line_consumer("k", replying("first"));
        session.add_line_consumer("k", replying("second"));
        assert_eq!(consumers + 1, session.line_consumers().len());
        assert_eq!(Reply::new(pc::Ok, "second"), send(&mut session, "NOOP"));

        assert!(session.remove_line_consumer("k"));
        assert_eq!(Reply::ok(), send(&mut session, "NOOP"));
    }

    #[test]
    fn chain_changes_apply_from_next_line() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);

        session.add_line_consumer(
            "installer",
            consumer(|session: &mut Session, _: &mut Line| {
                session.add_line_consumer("late", replying("late"));
                Ok(Consumed::Unhandled)
            }),
        );

        // The router still sees the line which caused the installation
        assert_eq!(Reply::ok(), send(&mut session, "NOOP"));
        assert_eq!(Reply::new(pc::Ok, "late"), send(&mut session, "NOOP"));
    }

    #[test]
    fn rewrites_are_seen_downstream() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);

        session.add_line_consumer(
            "alias",
            consumer(|_: &mut Session, line: &mut Line| {
                if line.verb().eq_ignore_ascii_case("PING") {
                    line.rewrite(|bytes| {
                        bytes.clear();
                        bytes.extend_from_slice(b"HELP\r\n");
                    });
                }
                Ok(Consumed::Unhandled)
            }),
        );

        assert_eq!(Some(214), send(&mut session, "PING").code());
    }

    #[test]
    fn consumer_errors_abort_the_line() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);

        session.add_line_consumer(
            "broken",
            consumer(|_: &mut Session, _: &mut Line| {
                Err(Error::Mail("broken".to_owned()))
            }),
        );

        assert_matches!(
            Err(Error::Mail(_)),
            session.consume(&mut Line::from("HELO gir.example\r\n"))
        );
        assert_eq!(SessionState::Connected, *session.state());
    }

    #[test]
    fn connect_without_handler() {
        let service = RecordingMailService::default();
        let engine = builder(&service).connect_handler(None).build();
        let mut session = engine.new_session("peer");

        assert_eq!(Reply::server_error(), session.connect().unwrap());
        assert_eq!(SessionState::BeforeConnect, *session.state());
    }

    /// Valid everywhere, but declines every event.
    struct Abstain;

    impl CommandHandler for Abstain {
        fn valid_for_state(&self, _: &SessionState) -> bool {
            true
        }

        fn handle_valid_command(
            &self,
            _: &mut Session,
            _: Option<&str>,
        ) -> Result<Consumed, Error> {
            Ok(Consumed::Unhandled)
        }
    }

    #[test]
    fn connect_handler_declines() {
        let service = RecordingMailService::default();
        let abstain: Arc<dyn CommandHandler> = Arc::new(Abstain);
        let engine = builder(&service).connect_handler(Some(abstain)).build();
        let mut session = engine.new_session("peer");

        assert_eq!(Reply::server_error(), session.connect().unwrap());
        assert_eq!(SessionState::BeforeConnect, *session.state());
        // Nothing is accepted before a successful connect
        assert_eq!(Reply::bad_sequence(), send(&mut session, "NOOP"));
    }

    struct Forbidden {
        invoked: Arc<AtomicBool>,
    }

    impl CommandHandler for Forbidden {
        fn valid_for_state(&self, _: &SessionState) -> bool {
            false
        }

        fn handle_valid_command(
            &self,
            _: &mut Session,
            _: Option<&str>,
        ) -> Result<Consumed, Error> {
            self.invoked.store(true, Ordering::SeqCst);
            Ok(Transition::stay(Reply::ok()).into())
        }
    }

    #[test]
    fn gate_prevents_invocation() {
        let service = RecordingMailService::default();
        let invoked = Arc::new(AtomicBool::new(false));
        let engine = builder(&service)
            .command(
                "frob",
                Arc::new(Forbidden {
                    invoked: Arc::clone(&invoked),
                }),
            )
            .build();
        let mut session = engine.new_session("peer");
        session.connect().unwrap();

        assert_eq!(Reply::bad_sequence(), send(&mut session, "FROB"));
        assert_eq!(SessionState::Connected, *session.state());
        assert!(!invoked.load(Ordering::SeqCst));
    }

    struct Observer {
        name: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Extension for Observer {
        fn name(&self) -> &str {
            self.name
        }

        fn ehlo_keyword(&self) -> &str {
            self.name
        }

        fn line_consumer(&self) -> Option<Arc<dyn LineConsumer>> {
            let name = self.name;
            let seen = Arc::clone(&self.seen);
            Some(consumer(
                move |_: &mut Session, _: &mut Line| {
                    seen.lock().unwrap().push(name);
                    Ok(Consumed::Unhandled)
                },
            ))
        }
    }

    #[test]
    fn extension_consumers_run_in_registration_order() {
        let service = RecordingMailService::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let engine = builder(&service)
            .extension(Arc::new(Observer {
                name: "X-FIRST",
                seen: Arc::clone(&seen),
            }))
            .extension(Arc::new(Observer {
                name: "X-SECOND",
                seen: Arc::clone(&seen),
            }))
            .build();
        let mut session = engine.new_session("peer");
        session.connect().unwrap();

        assert_eq!(
            vec!["X-FIRST", "X-SECOND", ROUTER_CONSUMER_KEY],
            session.line_consumers().keys().collect::<Vec<_>>()
        );
        assert_eq!(Reply::ok(), send(&mut session, "NOOP"));
        assert_eq!(vec!["X-FIRST", "X-SECOND"], *seen.lock().unwrap());

        let reply = send(&mut session, "EHLO gir.example");
        assert_eq!(
            Reply::multi(
                pc::Ok,
                vec![
                    Cow::Borrowed("mx.irk.example salutations, gir.example"),
                    Cow::Borrowed("X-FIRST"),
                    Cow::Borrowed("X-SECOND"),
                ]
            ),
            reply
        );
    }

    #[test]
    fn mail_disposed_on_drop() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);
        send(&mut session, "EHLO gir.example");
        send(&mut session, "MAIL FROM:<dib@earth.example>");
        assert!(session.has_mail());
        drop(session);

        assert_eq!(1, service.journal().count("dispose"));
    }

    #[test]
    fn connection_lost_disposes_mail() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);
        ready_for_data(&mut session);
        session.connection_lost();
        assert!(!session.has_mail());
        drop(session);

        assert_eq!(1, service.journal().count("dispose"));
    }
}
