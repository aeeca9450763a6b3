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

//! RFC 4616 PLAIN.

use std::sync::Arc;

use super::mechanism::{
    Authorization, CredentialCheck, MechanismFactory, SaslMechanism,
};
use crate::support::error::Error;

pub struct PlainFactory {
    check: Arc<dyn CredentialCheck>,
}

impl PlainFactory {
    pub fn new(check: Arc<dyn CredentialCheck>) -> Self {
        PlainFactory { check }
    }
}

impl MechanismFactory for PlainFactory {
    fn name(&self) -> &str {
        "PLAIN"
    }

    fn sends_plaintext(&self) -> bool {
        true
    }

    fn create(&self) -> Box<dyn SaslMechanism> {
        Box::new(Plain {
            check: Arc::clone(&self.check),
            stage: Stage::Initial,
            identity: None,
            authcid: None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Initial,
    AwaitingMessage,
    Complete,
}

struct Plain {
    check: Arc<dyn CredentialCheck>,
    stage: Stage,
    identity: Option<String>,
    authcid: Option<String>,
}

impl SaslMechanism for Plain {
    fn mechanism_name(&self) -> &str {
        "PLAIN"
    }

    fn evaluate_response(&mut self, response: &[u8]) -> Result<Vec<u8>, Error> {
        match self.stage {
            Stage::Complete => {
                return Err(Error::Sasl(
                    "PLAIN exchange already complete".to_owned(),
                ));
            },
            // No initial response; ask for the message with an empty
            // challenge, exactly once.
            Stage::Initial if response.is_empty() => {
                self.stage = Stage::AwaitingMessage;
                return Ok(Vec::new());
            },
            Stage::AwaitingMessage if response.is_empty() => {
                self.stage = Stage::Complete;
                return Err(Error::Sasl(
                    "The empty string is not valid for PLAIN".to_owned(),
                ));
            },
            _ => self.stage = Stage::Complete,
        }

        // Format is <authzid>NUL<authcid>NUL<password>
        let mut parts = response.split(|&b| 0 == b);
        let (Some(authzid), Some(authcid), Some(password), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::Sasl("Invalid PLAIN message".to_owned()));
        };

        let (Ok(authzid), Ok(authcid)) =
            (std::str::from_utf8(authzid), std::str::from_utf8(authcid))
        else {
            return Err(Error::Sasl("PLAIN identity is not UTF-8".to_owned()));
        };

        if authcid.is_empty() {
            return Err(Error::Sasl("Empty PLAIN authcid".to_owned()));
        }

        if let Authorization::Authorized(identity) =
            self.check.check(authzid, authcid, password)?
        {
            self.identity = Some(identity);
            self.authcid = Some(authcid.to_owned());
        }

        Ok(Vec::new())
    }

    fn is_complete(&self) -> bool {
        Stage::Complete == self.stage
    }

    fn authorization_id(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    fn negotiated_property(&self, name: &str) -> Option<String> {
        match name {
            "authcid" => self.authcid.clone(),
            _ => None,
        }
    }
}
