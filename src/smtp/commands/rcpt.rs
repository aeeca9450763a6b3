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

use log::{error, warn};

use crate::smtp::codes::*;
use crate::smtp::command::CommandHandler;
use crate::smtp::consumer::Consumed;
use crate::smtp::reply::{Reply, Transition};
use crate::smtp::session::Session;
use crate::smtp::state::SessionState;
use crate::smtp::syntax::{arguments, parse_rcpt_to};
use crate::support::error::Error;

/// The session property counting recipients accepted in the current
/// transaction.
pub const RECIPIENT_COUNT_PROPERTY: &str = "rcpt.count";

/// RCPT: adds a recipient to the current mail object.
#[derive(Clone, Copy, Debug, Default)]
pub struct RcptCommand;

impl CommandHandler for RcptCommand {
    fn valid_for_state(&self, state: &SessionState) -> bool {
        state.in_transaction()
    }

    fn handle_valid_command(
        &self,
        session: &mut Session,
        line: Option<&str>,
    ) -> Result<Consumed, Error> {
        let args = line.map(arguments).unwrap_or("");
        let rcpt_to = match parse_rcpt_to(args) {
            Some(rcpt_to) => rcpt_to,
            None => {
                return Ok(Transition::stay(Reply::syntax_error(
                    "Syntax: RCPT TO:<address> [parameters]",
                ))
                .into())
            },
        };

        let count = session
            .properties()
            .get::<usize>(RECIPIENT_COUNT_PROPERTY)
            .copied()
            .unwrap_or(0);
        if count >= session.config().max_recipients {
            return Ok(Transition::stay(Reply::new(
                pc::InsufficientStorage,
                "Too many recipients",
            ))
            .into());
        }

        let reply = match session.mail_mut() {
            Some(mail) => {
                mail.rcpt_to(rcpt_to.forward_path, rcpt_to.parameters)?
            },
            None => {
                error!(
                    "{} [BUG] In transaction without a mail object",
                    session.log_prefix()
                );
                return Ok(Transition::to(
                    Reply::local_error(),
                    SessionState::AfterEhlo,
                )
                .into());
            },
        };

        if !reply.is_positive() {
            warn!(
                "{} Recipient {:?} rejected: {}",
                session.log_prefix(),
                rcpt_to.forward_path,
                reply.text()
            );
            return Ok(Transition::stay(reply).into());
        }

        session
            .properties_mut()
            .set(RECIPIENT_COUNT_PROPERTY, count + 1);
        Ok(Transition::to(reply, SessionState::AfterRcpt).into())
    }
}
