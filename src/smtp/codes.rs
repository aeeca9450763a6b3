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

//! Reply codes from RFC 5321, plus those added by RFC 3207 and RFC 4954.
//!
//! The module is designed to be wildcard-imported, and defines the `pc`
//! submodule with a short name for accessing the enum values consistently.

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum PrimaryCode {
    // In the order RFC 5321 defines them
    CommandSyntaxError = 500,
    ParameterSyntaxError = 501,
    CommandNotImplemented = 502,
    BadSequenceOfCommands = 503,
    CommandParameterNotImplemented = 504,
    SystemStatus = 211,
    HelpMessage = 214,
    ServiceReady = 220,
    ServiceClosing = 221,
    ServiceNotAvailableClosing = 421,
    Ok = 250,
    WillForward = 251,
    CannotVerify = 252,
    UnableToAccommodateParameters = 455,
    MailOrRecipientParametersNotKnown = 555,
    ActionNotTakenTemporary = 450,
    ActionNotTakenPermanent = 550,
    ActionAborted = 451,
    UserNotLocal = 551,
    // Also TooManyRecipients
    InsufficientStorage = 452,
    ExceededStorageAllocation = 552,
    MailboxNameNotAllowed = 553,
    StartMailInput = 354,
    TransactionFailed = 554,
    // RFC 4954
    AuthenticationSucceeded = 235,
    ServerChallenge = 334,
    PasswordTransitionNeeded = 432,
    TemporaryAuthenticationFailure = 454,
    AuthenticationRequired = 530,
    AuthenticationMechanismTooWeak = 534,
    AuthenticationCredentialsInvalid = 535,
    EncryptionRequiredForRequestedAuthenticationMechanism = 538,
}

impl PrimaryCode {
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl From<PrimaryCode> for u16 {
    fn from(pc: PrimaryCode) -> u16 {
        pc.code()
    }
}

pub mod pc {
    pub use super::PrimaryCode::*;
}

/// Whether `code` is a positive completion (2yz) reply.
pub fn is_positive_completion(code: u16) -> bool {
    (200..=299).contains(&code)
}

/// Whether `code` tells the client the server is about to close the
/// connection.
pub fn closes_connection(code: u16) -> bool {
    code == pc::ServiceClosing.code()
        || code == pc::ServiceNotAvailableClosing.code()
}
