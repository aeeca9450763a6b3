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

use super::consumer::Consumed;
use super::reply::{Reply, Transition};
use super::session::Session;
use super::state::SessionState;
use crate::support::error::Error;

/// The business logic of one SMTP verb, behind a uniform validity gate.
///
/// Handlers are shared by every session and must not keep per-session state
/// in themselves; use the session properties instead.
///
/// Most handlers only implement `valid_for_state`. A handler which needs a
/// reply other than 503 when it cannot run can return `true` from
/// `valid_for_session` and perform its own check in
/// `handle_valid_command`.
pub trait CommandHandler: Send + Sync {
    fn valid_for_state(&self, state: &SessionState) -> bool;

    fn valid_for_session(&self, session: &Session) -> bool {
        self.valid_for_state(session.state())
    }

    /// Runs the command. `line` is the stripped command line, or `None` when
    /// the handler is invoked as the connect handler.
    fn handle_valid_command(
        &self,
        session: &mut Session,
        line: Option<&str>,
    ) -> Result<Consumed, Error>;
}

/// Runs `handler` if it is valid for `session`, or produces a 503 with no
/// state change if it is not.
///
/// When the gate rejects, `handle_valid_command` is not called at all.
pub fn handle_command(
    handler: &dyn CommandHandler,
    session: &mut Session,
    line: Option<&str>,
) -> Result<Consumed, Error> {
    if !handler.valid_for_session(session) {
        return Ok(Transition::stay(Reply::bad_sequence()).into());
    }

    handler.handle_valid_command(session, line)
}
