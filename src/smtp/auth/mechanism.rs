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

use std::fmt;
use std::sync::Arc;

use super::login::LoginFactory;
use super::plain::PlainFactory;
use crate::support::error::Error;

/// One in-progress SASL exchange (RFC 4422).
///
/// A mechanism object is created per AUTH command and lives in the session
/// properties between challenges.
pub trait SaslMechanism: Send {
    fn mechanism_name(&self) -> &str;

    /// Feeds the client's next response (already base64-decoded) and returns
    /// the next challenge.
    ///
    /// The first call receives the initial response, or an empty slice if
    /// there was none.
    fn evaluate_response(&mut self, response: &[u8]) -> Result<Vec<u8>, Error>;

    fn is_complete(&self) -> bool;

    /// Once complete, the identity the client is authorised as, or `None`
    /// if authentication failed.
    fn authorization_id(&self) -> Option<&str>;

    /// Any other property negotiated by the exchange, such as a security
    /// layer. Mechanisms which carry an authentication identity separate
    /// from the authorisation identity report it as `"authcid"`.
    fn negotiated_property(&self, _name: &str) -> Option<String> {
        None
    }

    /// Releases anything held by the mechanism. May be called more than
    /// once.
    fn dispose(&mut self) {}
}

/// Creates `SaslMechanism`s of one kind.
pub trait MechanismFactory: Send + Sync {
    /// The mechanism name, in upper case.
    fn name(&self) -> &str;

    /// Whether the client may send an initial response with the AUTH
    /// command.
    fn allows_initial_response(&self) -> bool {
        true
    }

    /// Whether the mechanism reveals the password to anyone who can see the
    /// connection. Such mechanisms can be restricted to TLS sessions.
    fn sends_plaintext(&self) -> bool {
        false
    }

    fn create(&self) -> Box<dyn SaslMechanism>;
}

/// The outcome of a credential check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Authorization {
    /// The credentials are good; the value is the identity the session acts
    /// as from now on.
    Authorized(String),
    Denied,
}

/// Decides whether a set of credentials is acceptable.
pub trait CredentialCheck: Send + Sync {
    /// `authzid` is the requested authorisation identity, empty if the
    /// client did not ask for one. `authcid` is the identity whose
    /// `credential` was presented.
    fn check(
        &self,
        authzid: &str,
        authcid: &str,
        credential: &[u8],
    ) -> Result<Authorization, Error>;
}

impl<F> CredentialCheck for F
where
    F: Fn(&str, &str, &[u8]) -> Result<Authorization, Error> + Send + Sync,
{
    fn check(
        &self,
        authzid: &str,
        authcid: &str,
        credential: &[u8],
    ) -> Result<Authorization, Error> {
        self(authzid, authcid, credential)
    }
}

/// The mechanisms an AUTH extension offers, in advertisement order.
#[derive(Clone, Default)]
pub struct MechanismRegistry {
    factories: Vec<Arc<dyn MechanismFactory>>,
}

impl MechanismRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry of the built-in mechanisms named in `names`, all
    /// backed by `check`.
    pub fn from_config(
        names: &[String],
        check: Arc<dyn CredentialCheck>,
    ) -> Result<Self, Error> {
        let mut this = Self::new();
        for name in names {
            let factory: Arc<dyn MechanismFactory> =
                match name.to_ascii_uppercase().as_str() {
                    "PLAIN" => Arc::new(PlainFactory::new(Arc::clone(&check))),
                    "LOGIN" => Arc::new(LoginFactory::new(Arc::clone(&check))),
                    _ => {
                        return Err(Error::Sasl(format!(
                            "Unknown SASL mechanism {:?}",
                            name
                        )))
                    },
                };
            this.register(factory);
        }
        Ok(this)
    }

    /// Adds `factory`, replacing any factory with the same name but keeping
    /// its position.
    pub fn register(&mut self, factory: Arc<dyn MechanismFactory>) {
        match self
            .factories
            .iter_mut()
            .find(|f| f.name().eq_ignore_ascii_case(factory.name()))
        {
            Some(existing) => *existing = factory,
            None => self.factories.push(factory),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn MechanismFactory>> {
        self.factories
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    pub fn factories(&self) -> &[Arc<dyn MechanismFactory>] {
        &self.factories
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.iter().map(|f| f.name())
    }
}

impl fmt::Debug for MechanismRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
