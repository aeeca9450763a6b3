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

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// A per-session, string-keyed store of arbitrary values.
///
/// Command handlers and extensions are shared by every session and hold no
/// per-session state of their own; anything they need to remember between
/// lines lives here.
#[derive(Default)]
pub struct Properties {
    values: HashMap<String, Box<dyn Any + Send>>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value under `key` if there is one and it is a `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Sets `key` to `value`, discarding any previous value.
    pub fn set<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Removes the value under `key`, returning it if it is a `T`.
    ///
    /// A value of another type is still removed.
    pub fn take<T: Any>(&mut self, key: &str) -> Option<T> {
        self.values
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    /// Removes the value under `key`, returning whether there was one.
    pub fn clear(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn clear_all(&mut self) {
        self.values.clear();
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut keys = self.values.keys().collect::<Vec<_>>();
        keys.sort();
        f.debug_set().entries(keys).finish()
    }
}
