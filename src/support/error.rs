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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Line exceeds the maximum length of {0} bytes")]
    LineTooLong(usize),
    #[error("Mail object failure: {0}")]
    Mail(String),
    #[error("SASL failure: {0}")]
    Sasl(String),
    #[error("Credential check failed: {0}")]
    Credentials(String),
    #[error("TLS upgrade failed: {0}")]
    TlsUpgrade(String),
    #[error("Client sent data after STARTTLS before the handshake")]
    PipelinedStartTls,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] toml::de::Error),
}
