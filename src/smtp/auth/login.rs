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

//! The obsolete but ubiquitous LOGIN mechanism
//! (draft-murchison-sasl-login).

use std::sync::Arc;

use super::mechanism::{
    Authorization, CredentialCheck, MechanismFactory, SaslMechanism,
};
use crate::support::error::Error;

pub struct LoginFactory {
    check: Arc<dyn CredentialCheck>,
}

impl LoginFactory {
    pub fn new(check: Arc<dyn CredentialCheck>) -> Self {
        LoginFactory { check }
    }
}

impl MechanismFactory for LoginFactory {
    fn name(&self) -> &str {
        "LOGIN"
    }

    fn allows_initial_response(&self) -> bool {
        false
    }

    fn sends_plaintext(&self) -> bool {
        true
    }

    fn create(&self) -> Box<dyn SaslMechanism> {
        Box::new(Login {
            check: Arc::clone(&self.check),
            stage: Stage::Start,
            identity: None,
            authcid: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Stage {
    Start,
    AwaitingUsername,
    AwaitingPassword(String),
    Complete,
}

struct Login {
    check: Arc<dyn CredentialCheck>,
    stage: Stage,
    identity: Option<String>,
    authcid: Option<String>,
}

impl SaslMechanism for Login {
    fn mechanism_name(&self) -> &str {
        "LOGIN"
    }

    fn evaluate_response(&mut self, response: &[u8]) -> Result<Vec<u8>, Error> {
        match std::mem::replace(&mut self.stage, Stage::Complete) {
            Stage::Start => {
                if !response.is_empty() {
                    return Err(Error::Sasl(
                        "LOGIN does not take an initial response".to_owned(),
                    ));
                }

                self.stage = Stage::AwaitingUsername;
                Ok(b"Username:".to_vec())
            },

            Stage::AwaitingUsername => {
                let username = String::from_utf8(response.to_vec()).map_err(
                    |_| Error::Sasl("LOGIN username is not UTF-8".to_owned()),
                )?;
                self.stage = Stage::AwaitingPassword(username);
                Ok(b"Password:".to_vec())
            },

            Stage::AwaitingPassword(username) => {
                if let Authorization::Authorized(identity) =
                    self.check.check("", &username, response)?
                {
                    self.identity = Some(identity);
                    self.authcid = Some(username);
                }
                Ok(Vec::new())
            },

            Stage::Complete => {
                Err(Error::Sasl("LOGIN exchange already complete".to_owned()))
            },
        }
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
