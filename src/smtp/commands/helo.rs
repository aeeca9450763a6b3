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
use crate::smtp::syntax::{arguments, helo_domain};
use crate::support::error::Error;

/// The session property holding the name the client gave in HELO or EHLO.
pub const HELO_PROPERTY: &str = "helo.domain";

fn valid_for_state(state: &SessionState) -> bool {
    matches!(
        *state,
        SessionState::Connected
            | SessionState::AfterEhlo
            | SessionState::AfterMail
            | SessionState::AfterRcpt
    )
}

/// Common processing for HELO and EHLO. Returns the domain the client
/// claimed, or the reply to send if the syntax is bad.
fn greet(
    session: &mut Session,
    command: &str,
    line: Option<&str>,
) -> Result<String, Reply> {
    let domain = match line.map(arguments).and_then(helo_domain) {
        Some(domain) => domain.to_owned(),
        None => {
            return Err(Reply::syntax_error(format!(
                "Syntax: {command} hostname"
            )))
        },
    };

    if session.has_mail() {
        info!("{} {command} aborts mail transaction", session.log_prefix());
    }
    session.clear_mail();
    session.log_prefix().set_helo(domain.clone());
    session.properties_mut().set(HELO_PROPERTY, domain.clone());
    info!("{} SMTP {command}", session.log_prefix());
    Ok(domain)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Helo;

impl CommandHandler for Helo {
    fn valid_for_state(&self, state: &SessionState) -> bool {
        valid_for_state(state)
    }

    fn handle_valid_command(
        &self,
        session: &mut Session,
        line: Option<&str>,
    ) -> Result<Consumed, Error> {
        let domain = match greet(session, "HELO", line) {
            Ok(domain) => domain,
            Err(reply) => return Ok(Transition::stay(reply).into()),
        };

        Ok(Transition::to(
            Reply::new(
                pc::Ok,
                format!(
                    "{} salutations, {}",
                    session.config().host_name,
                    domain
                ),
            ),
            SessionState::AfterEhlo,
        )
        .into())
    }
}

/// EHLO: like HELO, but the reply lists every extension currently available
/// on the session.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ehlo;

impl CommandHandler for Ehlo {
    fn valid_for_state(&self, state: &SessionState) -> bool {
        valid_for_state(state)
    }

    fn handle_valid_command(
        &self,
        session: &mut Session,
        line: Option<&str>,
    ) -> Result<Consumed, Error> {
        let domain = match greet(session, "EHLO", line) {
            Ok(domain) => domain,
            Err(reply) => return Ok(Transition::stay(reply).into()),
        };

        let mut lines = vec![Cow::Owned(format!(
            "{} salutations, {}",
            session.config().host_name,
            domain
        ))];
        for extension in session.extensions() {
            if extension.is_available(session) {
                lines.push(Cow::Owned(extension.ehlo_advertisement(session)));
            }
        }

        Ok(Transition::to(
            Reply::multi(pc::Ok, lines),
            SessionState::AfterEhlo,
        )
        .into())
    }
}
