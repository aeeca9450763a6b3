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

//! The RFC 4954 AUTH extension.
//!
//! The extension and its command handler are shared by every session. The
//! state of an exchange spanning several lines (the mechanism object) lives
//! in the session properties, and the client's responses are intercepted by
//! a transient line consumer installed for the duration of the exchange.

mod login;
mod mechanism;
mod plain;

pub use self::login::LoginFactory;
pub use self::mechanism::{
    Authorization, CredentialCheck, MechanismFactory, MechanismRegistry,
    SaslMechanism,
};
pub use self::plain::PlainFactory;

use std::sync::Arc;

use log::{error, info, warn};

use super::codes::*;
use super::command::CommandHandler;
use super::consumer::{Consumed, LineConsumer};
use super::extension::Extension;
use super::line::Line;
use super::reply::{Reply, Transition};
use super::session::Session;
use super::state::SessionState;
use super::syntax::{arguments, is_sasl_mechanism_name};
use crate::support::{error::Error, system_config::AuthConfig};

/// The session property recording the identity of a successful AUTH.
pub const AUTH_IDENTITY_PROPERTY: &str = "auth.identity";
/// The session property recording the authentication identity (the user
/// whose credentials were checked) of a successful AUTH, when the mechanism
/// reports one.
pub const AUTH_AUTHCID_PROPERTY: &str = "auth.authcid";
/// The session property holding the `Box<dyn SaslMechanism>` of an exchange
/// awaiting the client's next response.
pub const AUTH_MECHANISM_PROPERTY: &str = "auth.mechanism";
/// The key of the line consumer installed during an exchange.
pub const AUTH_CONSUMER_KEY: &str = "auth";

/// Offers the mechanisms of a `MechanismRegistry` through AUTH.
#[derive(Clone, Debug)]
pub struct AuthExtension {
    inner: Arc<AuthInner>,
}

#[derive(Debug)]
struct AuthInner {
    registry: MechanismRegistry,
    require_tls: bool,
}

impl AuthExtension {
    /// If `require_tls` is set, mechanisms which send plaintext passwords
    /// are only offered under TLS.
    pub fn new(registry: MechanismRegistry, require_tls: bool) -> Self {
        AuthExtension {
            inner: Arc::new(AuthInner {
                registry,
                require_tls,
            }),
        }
    }

    pub fn from_config(
        config: &AuthConfig,
        check: Arc<dyn CredentialCheck>,
    ) -> Result<Self, Error> {
        Ok(Self::new(
            MechanismRegistry::from_config(&config.mechanisms, check)?,
            config.require_tls,
        ))
    }

    pub fn registry(&self) -> &MechanismRegistry {
        &self.inner.registry
    }
}

impl Extension for AuthExtension {
    fn name(&self) -> &str {
        "AUTH"
    }

    fn ehlo_keyword(&self) -> &str {
        "AUTH"
    }

    fn is_available(&self, session: &Session) -> bool {
        self.inner.available(session).next().is_some()
    }

    fn ehlo_advertisement(&self, session: &Session) -> String {
        let mut advertisement = "AUTH".to_owned();
        for factory in self.inner.available(session) {
            advertisement.push(' ');
            advertisement.push_str(factory.name());
        }
        advertisement
    }

    fn command_handlers(&self) -> Vec<(String, Arc<dyn CommandHandler>)> {
        let handler: Arc<dyn CommandHandler> = Arc::new(AuthCommand {
            inner: Arc::clone(&self.inner),
        });
        vec![("AUTH".to_owned(), handler)]
    }
}

impl AuthInner {
    fn is_available(
        &self,
        session: &Session,
        factory: &dyn MechanismFactory,
    ) -> bool {
        !self.require_tls || session.is_tls() || !factory.sends_plaintext()
    }

    fn available<'a>(
        &'a self,
        session: &'a Session,
    ) -> impl Iterator<Item = &'a Arc<dyn MechanismFactory>> + 'a {
        self.registry
            .factories()
            .iter()
            .filter(move |f| self.is_available(session, &***f))
    }

    /// Feeds `response` to `mechanism` and decides what happens next.
    ///
    /// Used both inline by the AUTH command and by the auth consumer.
    fn step(
        self: &Arc<Self>,
        session: &mut Session,
        mut mechanism: Box<dyn SaslMechanism>,
        response: &[u8],
    ) -> Transition {
        let challenge = match mechanism.evaluate_response(response) {
            Ok(challenge) => challenge,
            Err(e) => {
                error!(
                    "{} AUTH {} failed: {}",
                    session.log_prefix(),
                    mechanism.mechanism_name(),
                    e
                );
                mechanism.dispose();
                session.remove_line_consumer(AUTH_CONSUMER_KEY);
                return Transition::stay(Reply::server_error());
            },
        };

        if mechanism.is_complete() {
            session.remove_line_consumer(AUTH_CONSUMER_KEY);
            return self.finish(session, mechanism);
        }

        session
            .properties_mut()
            .set(AUTH_MECHANISM_PROPERTY, mechanism);
        session.add_line_consumer(
            AUTH_CONSUMER_KEY,
            Arc::new(AuthConsumer {
                inner: Arc::clone(self),
            }),
        );
        Transition::stay(Reply::new(
            pc::ServerChallenge,
            base64::encode(&challenge),
        ))
    }

    fn finish(
        &self,
        session: &mut Session,
        mut mechanism: Box<dyn SaslMechanism>,
    ) -> Transition {
        let identity = mechanism.authorization_id().map(str::to_owned);
        let authcid = mechanism.negotiated_property("authcid");
        let mechanism_name = mechanism.mechanism_name().to_owned();
        mechanism.dispose();

        match identity {
            Some(identity) => {
                session.log_prefix().set_user(identity.clone());
                info!(
                    "{} Authenticated with {}",
                    session.log_prefix(),
                    mechanism_name
                );
                session
                    .properties_mut()
                    .set(AUTH_IDENTITY_PROPERTY, identity);
                if let Some(authcid) = authcid {
                    session
                        .properties_mut()
                        .set(AUTH_AUTHCID_PROPERTY, authcid);
                }
                Transition::to(
                    Reply::new(
                        pc::AuthenticationSucceeded,
                        "Authentication successful",
                    ),
                    SessionState::AfterEhlo,
                )
            },

            None => {
                warn!(
                    "{} Authentication with {} failed",
                    session.log_prefix(),
                    mechanism_name
                );
                Transition::stay(Reply::new(
                    pc::AuthenticationCredentialsInvalid,
                    "Authentication credentials invalid",
                ))
            },
        }
    }
}

/// `AUTH mechanism [initial-response]`
pub struct AuthCommand {
    inner: Arc<AuthInner>,
}

impl CommandHandler for AuthCommand {
    fn valid_for_state(&self, state: &SessionState) -> bool {
        matches!(*state, SessionState::Connected | SessionState::AfterEhlo)
    }

    fn valid_for_session(&self, session: &Session) -> bool {
        self.valid_for_state(session.state())
            && !session.properties().contains(AUTH_IDENTITY_PROPERTY)
    }

    fn handle_valid_command(
        &self,
        session: &mut Session,
        line: Option<&str>,
    ) -> Result<Consumed, Error> {
        let mut tokens =
            line.map(arguments).unwrap_or("").split_ascii_whitespace();
        let (Some(mechanism_name), initial_response, None) =
            (tokens.next(), tokens.next(), tokens.next())
        else {
            return Ok(Transition::stay(Reply::parameter_not_implemented(
                "Syntax: AUTH mechanism [initial-response]",
            ))
            .into());
        };

        let factory = match self
            .inner
            .registry
            .get(mechanism_name)
            .filter(|_| is_sasl_mechanism_name(mechanism_name))
            .filter(|f| self.inner.is_available(session, &***f))
        {
            Some(factory) => Arc::clone(factory),
            None => {
                warn!(
                    "{} Rejected attempt to auth with method {:?}",
                    session.log_prefix(),
                    mechanism_name
                );
                return Ok(Transition::stay(Reply::parameter_not_implemented(
                    "Unsupported AUTH mechanism",
                ))
                .into());
            },
        };

        let initial_response = match initial_response {
            None => None,
            Some("=") => Some(Vec::new()),
            Some(data) => match base64::decode(data) {
                Ok(data) => Some(data),
                Err(_) => {
                    return Ok(Transition::stay(Reply::syntax_error(
                        "Invalid base64",
                    ))
                    .into())
                },
            },
        };

        if initial_response.is_some() && !factory.allows_initial_response() {
            return Ok(Transition::stay(Reply::syntax_error(format!(
                "{} does not permit an initial response",
                factory.name()
            )))
            .into());
        }

        let mechanism = factory.create();
        Ok(self
            .inner
            .step(session, mechanism, &initial_response.unwrap_or_default())
            .into())
    }
}

/// Intercepts the client's responses while an exchange is in progress.
struct AuthConsumer {
    inner: Arc<AuthInner>,
}

impl LineConsumer for AuthConsumer {
    fn consume(
        &self,
        session: &mut Session,
        line: &mut Line,
    ) -> Result<Consumed, Error> {
        let Some(mut mechanism) = session
            .properties_mut()
            .take::<Box<dyn SaslMechanism>>(AUTH_MECHANISM_PROPERTY)
        else {
            error!(
                "{} [BUG] AUTH consumer installed without a mechanism",
                session.log_prefix()
            );
            session.remove_line_consumer(AUTH_CONSUMER_KEY);
            return Ok(Transition::stay(Reply::local_error()).into());
        };

        let data = line.stripped().trim();
        if "*" == data {
            info!("{} Client aborted AUTH", session.log_prefix());
            mechanism.dispose();
            session.remove_line_consumer(AUTH_CONSUMER_KEY);
            return Ok(Transition::to(
                Reply::syntax_error("Authentication canceled"),
                SessionState::AfterEhlo,
            )
            .into());
        }

        let response = match base64::decode(data) {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "{} Bad base64 in AUTH response: {}",
                    session.log_prefix(),
                    e
                );
                mechanism.dispose();
                session.remove_line_consumer(AUTH_CONSUMER_KEY);
                return Ok(Transition::stay(Reply::server_error()).into());
            },
        };

        Ok(self.inner.step(session, mechanism, &response).into())
    }
}
