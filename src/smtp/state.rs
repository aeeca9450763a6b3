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
use std::fmt;

/// Where a session is in the SMTP dialog.
///
/// There is no transition table; each command handler declares the states it
/// is valid in. Extensions needing states of their own use `Custom`, which
/// compares by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// The connection exists but no greeting has been sent.
    BeforeConnect,
    /// The greeting has been sent; waiting for HELO or EHLO.
    Connected,
    /// HELO or EHLO accepted; no mail transaction in progress.
    AfterEhlo,
    /// MAIL accepted; waiting for recipients.
    AfterMail,
    /// At least one RCPT accepted.
    AfterRcpt,
    /// Between DATA and the terminating dot.
    ReadingData,
    /// QUIT accepted; the transport is about to close the connection.
    EndingSession,
    /// The connection was refused at greeting time. Only QUIT is permitted.
    ConnectRejected,
    Custom(Cow<'static, str>),
}

impl SessionState {
    pub fn custom(name: impl Into<Cow<'static, str>>) -> Self {
        SessionState::Custom(name.into())
    }

    pub fn name(&self) -> &str {
        match *self {
            SessionState::BeforeConnect => "before-connect",
            SessionState::Connected => "connected",
            SessionState::AfterEhlo => "after-ehlo",
            SessionState::AfterMail => "after-mail",
            SessionState::AfterRcpt => "after-rcpt",
            SessionState::ReadingData => "reading-data",
            SessionState::EndingSession => "ending-session",
            SessionState::ConnectRejected => "connect-rejected",
            SessionState::Custom(ref name) => name.as_ref(),
        }
    }

    /// Whether the client has greeted and may issue ordinary commands.
    pub fn is_greeted(&self) -> bool {
        matches!(
            *self,
            SessionState::AfterEhlo
                | SessionState::AfterMail
                | SessionState::AfterRcpt
        )
    }

    /// Whether a mail transaction (MAIL through RCPT) is open.
    pub fn in_transaction(&self) -> bool {
        matches!(*self, SessionState::AfterMail | SessionState::AfterRcpt)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
