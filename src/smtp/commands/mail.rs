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

use log::{info, warn};

use crate::smtp::codes::*;
use crate::smtp::command::CommandHandler;
use crate::smtp::consumer::Consumed;
use crate::smtp::reply::{Reply, Transition};
use crate::smtp::session::Session;
use crate::smtp::state::SessionState;
use crate::smtp::syntax::{arguments, parse_mail_from};
use crate::support::error::Error;

use super::rcpt::RECIPIENT_COUNT_PROPERTY;

/// MAIL: starts a transaction by creating a new mail object.
#[derive(Clone, Copy, Debug, Default)]
pub struct MailCommand;

impl CommandHandler for MailCommand {
    fn valid_for_state(&self, state: &SessionState) -> bool {
        SessionState::AfterEhlo == *state
    }

    fn handle_valid_command(
        &self,
        session: &mut Session,
        line: Option<&str>,
    ) -> Result<Consumed, Error> {
        let args = line.map(arguments).unwrap_or("");
        let mail_from = match parse_mail_from(args) {
            Some(mail_from) => mail_from,
            None => {
                return Ok(Transition::stay(Reply::syntax_error(
                    "Syntax: MAIL FROM:<address> [parameters]",
                ))
                .into())
            },
        };

        let max_size = session.config().max_message_size;
        if max_size > 0 && mail_from.size.unwrap_or(0) > max_size {
            return Ok(Transition::stay(Reply::new(
                pc::ExceededStorageAllocation,
                format!("Maximum message size is {} bytes", max_size),
            ))
            .into());
        }

        session.clear_mail();
        session.properties_mut().clear(RECIPIENT_COUNT_PROPERTY);
        let mut mail = session.new_mail();

        // Unlike DATA, failures here are not converted into a reply; the
        // connection is torn down instead.
        let reply =
            match mail.mail_from(mail_from.reverse_path, mail_from.parameters)
            {
                Ok(reply) => reply,
                Err(e) => {
                    mail.dispose();
                    return Err(e);
                },
            };

        if !reply.is_positive() {
            warn!(
                "{} Sender {:?} rejected: {}",
                session.log_prefix(),
                mail_from.reverse_path,
                reply.text()
            );
            mail.dispose();
            return Ok(Transition::stay(reply).into());
        }

        session.set_mail(mail);
        info!("{} Start mail transaction", session.log_prefix());
        Ok(Transition::to(reply, SessionState::AfterMail).into())
    }
}
