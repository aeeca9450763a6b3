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
use std::io::{self, Write};

use super::codes::*;
use super::state::SessionState;

/// What the engine wants sent to the client in response to one event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Send nothing at all. Used while collecting message data.
    Silent,
    /// A single `<code> <text>` line.
    Line(u16, Cow<'static, str>),
    /// A multi-line reply; every line but the last is sent as
    /// `<code>-<text>`.
    Multi(u16, Vec<Cow<'static, str>>),
    /// A 220 reply after which the transport must begin a TLS handshake.
    StartTls(Cow<'static, str>),
}

impl Reply {
    pub fn new(
        code: impl Into<u16>,
        text: impl Into<Cow<'static, str>>,
    ) -> Self {
        Reply::Line(code.into(), text.into())
    }

    pub fn multi(code: impl Into<u16>, lines: Vec<Cow<'static, str>>) -> Self {
        Reply::Multi(code.into(), lines)
    }

    pub fn ok() -> Self {
        Reply::new(pc::Ok, "OK")
    }

    pub fn bad_sequence() -> Self {
        Reply::new(pc::BadSequenceOfCommands, "Bad sequence of commands")
    }

    pub fn unrecognised() -> Self {
        Reply::new(pc::CommandSyntaxError, "Unrecognised command")
    }

    pub fn syntax_error(text: impl Into<Cow<'static, str>>) -> Self {
        Reply::new(pc::ParameterSyntaxError, text)
    }

    pub fn parameter_not_implemented(
        text: impl Into<Cow<'static, str>>,
    ) -> Self {
        Reply::new(pc::CommandParameterNotImplemented, text)
    }

    /// The catch-all for failures inside collaborator code.
    pub fn server_error() -> Self {
        Reply::new(pc::TransactionFailed, "Server error")
    }

    pub fn local_error() -> Self {
        Reply::new(pc::ActionAborted, "Local error in processing")
    }

    pub fn shutting_down() -> Self {
        Reply::new(
            pc::ServiceNotAvailableClosing,
            "Service shutting down, closing transmission channel",
        )
    }

    /// The reply code, or `None` for `Silent`.
    pub fn code(&self) -> Option<u16> {
        match *self {
            Reply::Silent => None,
            Reply::Line(code, _) | Reply::Multi(code, _) => Some(code),
            Reply::StartTls(_) => Some(pc::ServiceReady.code()),
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(*self, Reply::Silent)
    }

    pub fn is_start_tls(&self) -> bool {
        matches!(*self, Reply::StartTls(_))
    }

    pub fn is_positive(&self) -> bool {
        self.code().map_or(false, is_positive_completion)
    }

    /// Whether the transport should close the connection once this reply has
    /// been sent.
    pub fn closes_connection(&self) -> bool {
        self.code().map_or(false, closes_connection)
    }

    /// The text of the final (or only) line.
    pub fn text(&self) -> &str {
        match *self {
            Reply::Silent => "",
            Reply::Line(_, ref text) | Reply::StartTls(ref text) => {
                text.as_ref()
            },
            Reply::Multi(_, ref lines) => {
                lines.last().map_or("", |l| l.as_ref())
            },
        }
    }

    /// Serialises the reply in wire format. Nothing is written for `Silent`.
    pub fn write_to(&self, mut dst: impl Write) -> io::Result<()> {
        match *self {
            Reply::Silent => Ok(()),
            Reply::Line(code, ref text) => write_line(dst, code, ' ', text),
            Reply::StartTls(ref text) => {
                write_line(dst, pc::ServiceReady.code(), ' ', text)
            },
            Reply::Multi(code, ref lines) => {
                if lines.is_empty() {
                    return write_line(dst, code, ' ', "");
                }

                for (ix, line) in lines.iter().enumerate() {
                    let indicator =
                        if ix + 1 == lines.len() { ' ' } else { '-' };
                    write_line(&mut dst, code, indicator, line)?;
                }
                Ok(())
            },
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        // Writing to a Vec cannot fail
        let _ = self.write_to(&mut buf);
        buf
    }
}

fn write_line(
    mut dst: impl Write,
    code: u16,
    indicator: char,
    text: &str,
) -> io::Result<()> {
    write!(dst, "{code}{indicator}{text}\r\n")
}

/// The result of consuming one line or connection event: what to say to the
/// client, and which state the session moves to.
///
/// `next_state` being `None` means "no change"; it is a deliberate value, not
/// a missing one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    reply: Reply,
    next_state: Option<SessionState>,
}

impl Transition {
    pub fn new(reply: Reply, next_state: Option<SessionState>) -> Self {
        Transition { reply, next_state }
    }

    /// Reply without changing state.
    pub fn stay(reply: Reply) -> Self {
        Transition::new(reply, None)
    }

    /// Reply and move to `state`.
    pub fn to(reply: Reply, state: SessionState) -> Self {
        Transition::new(reply, Some(state))
    }

    pub fn reply(&self) -> &Reply {
        &self.reply
    }

    pub fn next_state(&self) -> Option<&SessionState> {
        self.next_state.as_ref()
    }

    pub fn into_parts(self) -> (Reply, Option<SessionState>) {
        (self.reply, self.next_state)
    }
}
