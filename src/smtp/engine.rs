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

use super::command::CommandHandler;
use super::commands;
use super::extension::{Extension, KeywordExtension, SizeExtension};
use super::mail::MailService;
use super::router::CommandRouter;
use super::session::Session;
use super::starttls::StartTlsExtension;
use crate::support::system_config::SmtpConfig;

/// Everything sessions share: configuration, the stateless command handlers
/// and extensions, and the mail service.
pub struct Engine {
    config: SmtpConfig,
    commands: Vec<(String, Arc<dyn CommandHandler>)>,
    connect_handler: Option<Arc<dyn CommandHandler>>,
    extensions: Vec<Arc<dyn Extension>>,
    mail_service: Arc<dyn MailService>,
}

impl Engine {
    /// Starts building an engine with the standard RFC 5321 commands and
    /// greeting.
    pub fn builder(
        config: SmtpConfig,
        mail_service: Arc<dyn MailService>,
    ) -> EngineBuilder {
        EngineBuilder::new(config, mail_service)
    }

    pub fn config(&self) -> &SmtpConfig {
        &self.config
    }

    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        &self.extensions
    }

    pub fn mail_service(&self) -> &Arc<dyn MailService> {
        &self.mail_service
    }

    /// Creates the session for a newly accepted connection.
    pub fn new_session(
        self: &Arc<Self>,
        peer_name: impl Into<String>,
    ) -> Session {
        Session::new(Arc::clone(self), peer_name.into())
    }

    /// Builds the router for one session: the engine's own commands, then
    /// those contributed by extensions.
    pub(super) fn build_router(&self) -> CommandRouter {
        let mut router = CommandRouter::new();
        for &(ref verb, ref handler) in &self.commands {
            router.register(verb, Arc::clone(handler));
        }

        for extension in &self.extensions {
            for (verb, handler) in extension.command_handlers() {
                router.register(&verb, handler);
            }
        }

        router.set_connect_handler(self.connect_handler.clone());
        router
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field(
                "commands",
                &self.commands.iter().map(|c| &c.0).collect::<Vec<_>>(),
            )
            .field(
                "extensions",
                &self.extensions.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

pub struct EngineBuilder {
    config: SmtpConfig,
    mail_service: Arc<dyn MailService>,
    commands: Vec<(String, Arc<dyn CommandHandler>)>,
    connect_handler: Option<Arc<dyn CommandHandler>>,
    extensions: Vec<Arc<dyn Extension>>,
}

impl EngineBuilder {
    pub fn new(config: SmtpConfig, mail_service: Arc<dyn MailService>) -> Self {
        let mut this = Self::bare(config, mail_service);
        this.connect_handler = Some(Arc::new(commands::Greeting));
        for (verb, handler) in commands::standard_commands() {
            this = this.command(verb, handler);
        }
        this
    }

    /// Starts building an engine with no commands, connect handler or
    /// extensions at all.
    pub fn bare(
        config: SmtpConfig,
        mail_service: Arc<dyn MailService>,
    ) -> Self {
        EngineBuilder {
            config,
            mail_service,
            commands: Vec::new(),
            connect_handler: None,
            extensions: Vec::new(),
        }
    }

    /// Adds a command handler, replacing any existing handler for the verb.
    pub fn command(
        mut self,
        verb: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        let verb = verb.into().to_ascii_uppercase();
        self.commands.retain(|&(ref v, _)| *v != verb);
        self.commands.push((verb, handler));
        self
    }

    pub fn connect_handler(
        mut self,
        handler: Option<Arc<dyn CommandHandler>>,
    ) -> Self {
        self.connect_handler = handler;
        self
    }

    /// Adds an extension. Extensions are advertised in the order added.
    pub fn extension(mut self, extension: Arc<dyn Extension>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Adds `8BITMIME`, `PIPELINING`, `SIZE` and `STARTTLS`.
    ///
    /// `SIZE` and `STARTTLS` are only advertised when the configuration
    /// enables them.
    pub fn standard_extensions(self) -> Self {
        self.extension(Arc::new(KeywordExtension::new("8BITMIME")))
            .extension(Arc::new(KeywordExtension::new("PIPELINING")))
            .extension(Arc::new(SizeExtension))
            .extension(Arc::new(StartTlsExtension))
    }

    pub fn build(self) -> Arc<Engine> {
        Arc::new(Engine {
            config: self.config,
            commands: self.commands,
            connect_handler: self.connect_handler,
            extensions: self.extensions,
            mail_service: self.mail_service,
        })
    }
}
