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

use crate::smtp::command::CommandHandler;
use crate::smtp::consumer::Consumed;
use crate::smtp::reply::{Reply, Transition};
use crate::smtp::session::Session;
use crate::smtp::state::SessionState;
use crate::support::error::Error;

/// RSET: abandons any mail transaction.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reset;

impl CommandHandler for Reset {
    fn valid_for_state(&self, state: &SessionState) -> bool {
        SessionState::Connected == *state || state.is_greeted()
    }

    fn handle_valid_command(
        &self,
        session: &mut Session,
        _line: Option<&str>,
    ) -> Result<Consumed, Error> {
        if session.has_mail() {
            info!("{} Mail transaction reset", session.log_prefix());
        }
        session.clear_mail();

        // Without a prior greeting there is nothing to return to
        let next = if SessionState::Connected == *session.state() {
            SessionState::Connected
        } else {
            SessionState::AfterEhlo
        };
        Ok(Transition::to(Reply::ok(), next).into())
    }
}
