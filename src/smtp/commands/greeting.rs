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

use std::borrow::Cow;

use log::info;

use crate::smtp::codes::*;
use crate::smtp::command::CommandHandler;
use crate::smtp::consumer::Consumed;
use crate::smtp::reply::{Reply, Transition};
use crate::smtp::session::Session;
use crate::smtp::state::SessionState;
use crate::support::error::Error;

/// The default connect handler: sends the 220 banner.
#[derive(Clone, Copy, Debug, Default)]
pub struct Greeting;

impl CommandHandler for Greeting {
    fn valid_for_state(&self, state: &SessionState) -> bool {
        SessionState::BeforeConnect == *state
    }

    fn handle_valid_command(
        &self,
        session: &mut Session,
        _line: Option<&str>,
    ) -> Result<Consumed, Error> {
        info!("{} Sending greeting", session.log_prefix());
        let config = session.config();
        let banner = format!("{} {}", config.host_name, config.greeting);
        Ok(Transition::to(
            Reply::new(pc::ServiceReady, Cow::Owned(banner)),
            SessionState::Connected,
        )
        .into())
    }
}
