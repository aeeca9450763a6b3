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

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::command::{handle_command, CommandHandler};
use super::consumer::{Consumed, LineConsumer};
use super::line::Line;
use super::session::Session;
use crate::support::error::Error;

/// Dispatches lines to command handlers by verb.
///
/// Lookup is case-insensitive and ignores everything after the verb. Lines
/// whose verb has no handler are left unhandled, so that the session can
/// produce its default reply.
#[derive(Clone, Default)]
pub struct CommandRouter {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
    connect_handler: Option<Arc<dyn CommandHandler>>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `verb`, replacing any previous handler for
    /// the same verb.
    pub fn register(&mut self, verb: &str, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(verb.to_ascii_uppercase(), handler);
    }

    /// Sets the handler run by the connect path, which has no verb.
    pub fn set_connect_handler(
        &mut self,
        handler: Option<Arc<dyn CommandHandler>>,
    ) {
        self.connect_handler = handler;
    }

    pub fn handler(&self, verb: &str) -> Option<&Arc<dyn CommandHandler>> {
        self.handlers.get(&verb.to_ascii_uppercase())
    }

    pub fn verbs(&self) -> impl Iterator<Item = &str> + '_ {
        self.handlers.keys().map(|k| k.as_str())
    }
}

impl LineConsumer for CommandRouter {
    /// # Panics
    ///
    /// Panics if `line` has no terminator. The transport guarantees every
    /// line it delivers is terminated, so this indicates a bug in the
    /// caller.
    fn consume(
        &self,
        session: &mut Session,
        line: &mut Line,
    ) -> Result<Consumed, Error> {
        assert!(
            line.has_terminator(),
            "Unterminated line passed to command router: {:?}",
            line
        );

        let handler = match self.handler(line.verb()) {
            Some(handler) => Arc::clone(handler),
            None => return Ok(Consumed::Unhandled),
        };

        handle_command(&*handler, session, Some(line.stripped()))
    }

    fn connect(&self, session: &mut Session) -> Result<Consumed, Error> {
        match self.connect_handler {
            Some(ref handler) => handle_command(&**handler, session, None),
            None => Ok(Consumed::Unhandled),
        }
    }
}

impl fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut verbs = self.verbs().collect::<Vec<_>>();
        verbs.sort_unstable();
        f.debug_struct("CommandRouter")
            .field("verbs", &verbs)
            .field("connect_handler", &self.connect_handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use proptest::prelude::*;

    use super::*;
    use crate::smtp::reply::{Reply, Transition};
    use crate::smtp::state::SessionState;
    use crate::smtp::test_support::*;

    /// Accepts in any state and records the lines it is given.
    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<Option<String>>>,
    }

    impl CommandHandler for Recorder {
        fn valid_for_state(&self, _: &SessionState) -> bool {
            true
        }

        fn handle_valid_command(
            &self,
            _: &mut Session,
            line: Option<&str>,
        ) -> Result<Consumed, Error> {
            self.lines.lock().unwrap().push(line.map(str::to_owned));
            Ok(Transition::stay(Reply::ok()).into())
        }
    }

    fn session() -> Session {
        let service = RecordingMailService::default();
        builder(&service).build().new_session("peer")
    }

    fn route(
        router: &CommandRouter,
        session: &mut Session,
        line: &str,
    ) -> Consumed {
        router.consume(session, &mut Line::from(line)).unwrap()
    }

    #[test]
    fn verbs_are_case_insensitive() {
        let recorder = Arc::new(Recorder::default());
        let mut router = CommandRouter::new();
        router.register(
            "xyzzy",
            Arc::clone(&recorder) as Arc<dyn CommandHandler>,
        );
        let mut session = session();

        for line in &["XYZZY\r\n", "xyzzy plugh\r\n", "XyZzY\tplover\n"] {
            assert_eq!(
                Consumed::Handled(Transition::stay(Reply::ok())),
                route(&router, &mut session, line)
            );
        }

        assert_eq!(
            vec![
                Some("XYZZY".to_owned()),
                Some("xyzzy plugh".to_owned()),
                Some("XyZzY\tplover".to_owned()),
            ],
            *recorder.lines.lock().unwrap()
        );
    }

    #[test]
    fn unknown_verbs_are_unhandled() {
        let mut router = CommandRouter::new();
        router.register("NOOP", Arc::new(Recorder::default()));
        let mut session = session();

        assert_eq!(
            Consumed::Unhandled,
            route(&router, &mut session, "NOOPE\r\n")
        );
        assert_eq!(Consumed::Unhandled, route(&router, &mut session, "\r\n"));
        assert_eq!(
            Consumed::Unhandled,
            router.connect(&mut session).unwrap()
        );
    }

    #[test]
    fn connect_handler_receives_no_line() {
        let recorder = Arc::new(Recorder::default());
        let mut router = CommandRouter::new();
        router.set_connect_handler(Some(
            Arc::clone(&recorder) as Arc<dyn CommandHandler>
        ));
        let mut session = session();

        assert_matches!(
            Consumed::Handled(_),
            router.connect(&mut session).unwrap()
        );
        assert_eq!(vec![None], *recorder.lines.lock().unwrap());
    }

    #[test]
    #[should_panic]
    fn unterminated_line_is_a_bug() {
        let mut router = CommandRouter::new();
        router.register("NOOP", Arc::new(Recorder::default()));
        let mut session = session();
        route(&router, &mut session, "NOOP");
    }

    proptest! {
        #[test]
        fn routes_any_case(
            verb in "[A-Z]{1,8}",
            flips in prop::collection::vec(any::<bool>(), 8),
            args in "( [ -~]{0,20})?",
        ) {
            let mut router = CommandRouter::new();
            router.register(&verb, Arc::new(Recorder::default()));
            let mut session = session();

            let mixed = verb
                .chars()
                .zip(&flips)
                .map(|(c, &flip)| if flip { c.to_ascii_lowercase() } else { c })
                .collect::<String>();
            let consumed = route(
                &router,
                &mut session,
                &format!("{}{}\r\n", mixed, args),
            );
            prop_assert_ne!(Consumed::Unhandled, consumed);
        }
    }
}
