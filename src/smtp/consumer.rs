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

use super::line::Line;
use super::reply::Transition;
use super::session::Session;
use crate::support::error::Error;

/// The outcome of offering an event to one line consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Consumed {
    /// The consumer declined; the next one in the chain is tried.
    Unhandled,
    /// The consumer took the event. No further consumers see it.
    Handled(Transition),
}

impl From<Transition> for Consumed {
    fn from(t: Transition) -> Self {
        Consumed::Handled(t)
    }
}

/// Something which is offered each input line and connection event.
///
/// Consumers are shared between sessions, so any state they need must be
/// kept in the session's properties.
pub trait LineConsumer: Send + Sync {
    fn consume(
        &self,
        session: &mut Session,
        line: &mut Line,
    ) -> Result<Consumed, Error>;

    fn connect(&self, _session: &mut Session) -> Result<Consumed, Error> {
        Ok(Consumed::Unhandled)
    }
}

/// An ordered, keyed stack of line consumers.
///
/// Consumers are evaluated front to back; `add` always inserts at the front,
/// so the most recently installed consumer sees events first.
#[derive(Clone, Default)]
pub struct LineConsumerChain {
    entries: Vec<(String, Arc<dyn LineConsumer>)>,
}

impl LineConsumerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `consumer` under `key` at the front of the chain, removing
    /// any consumer previously installed under the same key.
    pub fn add(
        &mut self,
        key: impl Into<String>,
        consumer: Arc<dyn LineConsumer>,
    ) {
        let key = key.into();
        self.remove(&key);
        self.entries.insert(0, (key, consumer));
    }

    /// Removes the consumer under `key`, returning whether there was one.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|&(ref k, _)| k != key);
        before != self.entries.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|&(ref k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn LineConsumer>> {
        self.entries
            .iter()
            .find(|&&(ref k, _)| k == key)
            .map(|&(_, ref c)| c)
    }

    /// The keys in evaluation order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|&(ref k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Captures the consumers in evaluation order.
    ///
    /// Changes made to the chain after this call do not affect the returned
    /// list.
    pub fn snapshot(&self) -> Vec<Arc<dyn LineConsumer>> {
        self.entries.iter().map(|&(_, ref c)| Arc::clone(c)).collect()
    }
}

impl fmt::Debug for LineConsumerChain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}
