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

//! The RFC 5321 command set.
//!
//! Every handler here is a stateless unit struct; all session data they use
//! lives in the session and its properties.

use std::sync::Arc;

use super::command::CommandHandler;

mod data;
mod greeting;
mod helo;
mod mail;
mod misc;
mod rcpt;
mod reset;

pub use self::data::{abort_transfer, DataCommand, DATA_CONSUMER_KEY};
pub use self::greeting::Greeting;
pub use self::helo::{Ehlo, Helo, HELO_PROPERTY};
pub use self::mail::MailCommand;
pub use self::misc::{Help, Noop, Quit, Verify};
pub use self::rcpt::{RcptCommand, RECIPIENT_COUNT_PROPERTY};
pub use self::reset::Reset;

fn handler<H: CommandHandler + 'static>(h: H) -> Arc<dyn CommandHandler> {
    Arc::new(h)
}

/// The handlers for every RFC 5321 verb, keyed by verb.
pub fn standard_commands() -> Vec<(&'static str, Arc<dyn CommandHandler>)> {
    vec![
        ("HELO", handler(Helo)),
        ("EHLO", handler(Ehlo)),
        ("MAIL", handler(MailCommand)),
        ("RCPT", handler(RcptCommand)),
        ("DATA", handler(DataCommand)),
        ("RSET", handler(Reset)),
        ("NOOP", handler(Noop)),
        ("VRFY", handler(Verify)),
        ("HELP", handler(Help)),
        ("QUIT", handler(Quit)),
    ]
}
