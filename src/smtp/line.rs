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

use std::cell::OnceCell;
use std::fmt;

/// One line received from the client, including its terminator.
///
/// The verb and stripped views are computed lazily and remembered until the
/// line is rewritten. Any line consumer may rewrite the line, and consumers
/// later in the same chain pass see the rewritten content.
#[derive(Clone)]
pub struct Line {
    bytes: Vec<u8>,
    stripped: OnceCell<String>,
    verb: OnceCell<String>,
}

impl Line {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Line {
            bytes: bytes.into(),
            stripped: OnceCell::new(),
            verb: OnceCell::new(),
        }
    }

    /// The raw bytes, including the terminator.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the line ends with LF (with or without a preceding CR).
    pub fn has_terminator(&self) -> bool {
        self.bytes.ends_with(b"\n")
    }

    pub fn terminator_len(&self) -> usize {
        if self.bytes.ends_with(b"\r\n") {
            2
        } else if self.bytes.ends_with(b"\n") {
            1
        } else {
            0
        }
    }

    /// The raw bytes without the terminator.
    pub fn content(&self) -> &[u8] {
        &self.bytes[..self.bytes.len() - self.terminator_len()]
    }

    /// The content without the terminator, decoded as UTF-8.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD, which no command syntax
    /// accepts.
    pub fn stripped(&self) -> &str {
        self.stripped.get_or_init(|| {
            String::from_utf8_lossy(self.content()).into_owned()
        })
    }

    /// The first whitespace-delimited token of the stripped content, as the
    /// client sent it.
    pub fn verb(&self) -> &str {
        self.verb.get_or_init(|| {
            let s = self.stripped().trim_start_matches(is_space);
            let end =
                memchr::memchr2(b' ', b'\t', s.as_bytes()).unwrap_or(s.len());
            s[..end].to_owned()
        })
    }

    /// Everything after the verb, with leading whitespace removed.
    pub fn arguments(&self) -> &str {
        let s = self.stripped().trim_start_matches(is_space);
        s[self.verb().len()..].trim_start_matches(is_space)
    }

    /// Rewrites the line in place.
    pub fn rewrite(&mut self, f: impl FnOnce(&mut Vec<u8>)) {
        f(&mut self.bytes);
        self.stripped = OnceCell::new();
        self.verb = OnceCell::new();
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn is_space(c: char) -> bool {
    ' ' == c || '\t' == c
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Line({:?})", String::from_utf8_lossy(&self.bytes))
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Line::new(s.as_bytes())
    }
}
