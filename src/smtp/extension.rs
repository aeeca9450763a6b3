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

use std::sync::Arc;

use super::command::CommandHandler;
use super::consumer::LineConsumer;
use super::session::Session;

/// An optional SMTP capability.
///
/// Extensions are shared by every session of an engine. Whatever state they
/// need per session goes into the session properties.
pub trait Extension: Send + Sync {
    /// A unique name, also used as the key of the extension's line consumer.
    fn name(&self) -> &str;

    /// The keyword this extension is advertised under in EHLO responses.
    fn ehlo_keyword(&self) -> &str;

    /// Whether the extension is offered on `session` at the moment.
    fn is_available(&self, _session: &Session) -> bool {
        true
    }

    /// The full EHLO line for this extension, e.g. `SIZE 1048576`.
    fn ehlo_advertisement(&self, _session: &Session) -> String {
        self.ehlo_keyword().to_owned()
    }

    /// Command handlers to add to each session's router, keyed by verb.
    fn command_handlers(&self) -> Vec<(String, Arc<dyn CommandHandler>)> {
        Vec::new()
    }

    /// A line consumer to install when each session is created.
    fn line_consumer(&self) -> Option<Arc<dyn LineConsumer>> {
        None
    }
}

/// An extension which does nothing but advertise a keyword, for capabilities
/// such as `8BITMIME` or `PIPELINING` which need no support from the engine.
#[derive(Clone, Debug)]
pub struct KeywordExtension {
    keyword: String,
}

impl KeywordExtension {
    pub fn new(keyword: impl Into<String>) -> Self {
        KeywordExtension {
            keyword: keyword.into(),
        }
    }
}

impl Extension for KeywordExtension {
    fn name(&self) -> &str {
        &self.keyword
    }

    fn ehlo_keyword(&self) -> &str {
        &self.keyword
    }
}

/// The RFC 1870 `SIZE` extension, advertising the configured message size
/// limit. The limit itself is enforced by the DATA consumer.
#[derive(Clone, Copy, Debug)]
pub struct SizeExtension;

impl Extension for SizeExtension {
    fn name(&self) -> &str {
        "SIZE"
    }

    fn ehlo_keyword(&self) -> &str {
        "SIZE"
    }

    fn is_available(&self, session: &Session) -> bool {
        session.config().max_message_size > 0
    }

    fn ehlo_advertisement(&self, session: &Session) -> String {
        format!("SIZE {}", session.config().max_message_size)
    }
}
