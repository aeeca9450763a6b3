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

use super::reply::Reply;
use super::session::Session;
use crate::support::error::Error;

/// The accumulator for one message, driven by MAIL, RCPT and DATA.
///
/// A mail object is created when MAIL is received and is exclusively owned by
/// its session. The session guarantees that `mail_from` and `complete` are
/// each called at most once. `dispose` may be called any number of times, at
/// any point in the lifecycle, including before `prepare_for_data`, and must
/// tolerate that.
pub trait MailObject: Send {
    /// Decides whether to accept the reverse path.
    ///
    /// A positive (2yz) reply accepts the transaction; any other reply is
    /// sent to the client and the object is disposed.
    fn mail_from(
        &mut self,
        reverse_path: &str,
        parameters: &str,
    ) -> Result<Reply, Error>;

    /// Decides whether to accept a recipient. A positive reply accepts it.
    fn rcpt_to(
        &mut self,
        forward_path: &str,
        parameters: &str,
    ) -> Result<Reply, Error>;

    /// Called once DATA has been accepted, before any `write_line`.
    fn prepare_for_data(&mut self) -> Result<(), Error>;

    /// Receives one line of message content, already dot-unstuffed and
    /// including its line ending.
    fn write_line(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Called after the terminating dot if every write succeeded. The
    /// returned reply is sent to the client.
    fn complete(&mut self) -> Result<Reply, Error>;

    /// Releases any resources held by the object.
    fn dispose(&mut self);
}

/// Creates mail objects for new transactions.
pub trait MailService: Send + Sync {
    /// Creates the mail object for a transaction beginning on `session`.
    ///
    /// The session is passed so that the service can look at the peer, TLS
    /// state and properties such as the authenticated identity.
    fn new_mail(&self, session: &Session) -> Box<dyn MailObject>;
}
