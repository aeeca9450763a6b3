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

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Error;

/// Configuration shared by every session an `Engine` creates.
///
/// This is typically stored in a TOML file owned by the embedding server.
/// Every field has a usable default, so an empty file is a valid
/// configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// The host name to report in the greeting and in EHLO responses.
    pub host_name: String,

    /// Text following the host name in the 220 greeting.
    pub greeting: String,

    /// The maximum length of a single line, including the line ending.
    ///
    /// RFC 5321 requires at least 512 bytes for commands and 1000 bytes for
    /// text lines. Longer lines are rejected by the transport.
    pub max_line_length: usize,

    /// The maximum message size in bytes, or 0 for no limit.
    ///
    /// When non-zero, this is also advertised via the `SIZE` keyword.
    pub max_message_size: u64,

    /// The maximum number of recipients in one mail transaction.
    pub max_recipients: usize,

    /// Whether STARTTLS is offered to clients not already under TLS.
    ///
    /// This should only be set if the transport is able to perform the
    /// upgrade.
    pub offer_starttls: bool,

    /// Configuration for the AUTH extension.
    pub auth: AuthConfig,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        SmtpConfig {
            host_name: "localhost".to_owned(),
            greeting: "ESMTP ready".to_owned(),
            max_line_length: 1024,
            max_message_size: 0,
            max_recipients: 100,
            offer_starttls: false,
            auth: AuthConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// If true, AUTH is neither advertised nor accepted until TLS has been
    /// established.
    ///
    /// Both PLAIN and LOGIN send the password in the clear, so this should
    /// only be disabled for testing or for loopback-only servers.
    pub require_tls: bool,

    /// The SASL mechanisms to enable, in the order they are advertised.
    ///
    /// Only `PLAIN` and `LOGIN` are known; any other name is a configuration
    /// error.
    pub mechanisms: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            require_tls: true,
            mechanisms: vec!["PLAIN".to_owned(), "LOGIN".to_owned()],
        }
    }
}

impl SmtpConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
