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

//! Parlour is a transport-independent SMTP session engine.
//!
//! A `Session` holds the protocol state of one connection. The transport
//! feeds it lines of client input and sends back the replies it produces.
//! Commands and extensions plug into the session through the line consumer
//! chain; message storage plugs in through the `MailObject` contract.
//!
//! `smtp::transport::serve` is a ready-made blocking transport for anything
//! implementing `Read + Write`.

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod smtp;
pub mod support;

pub use crate::smtp::engine::{Engine, EngineBuilder};
pub use crate::smtp::mail::{MailObject, MailService};
pub use crate::smtp::reply::{Reply, Transition};
pub use crate::smtp::session::Session;
pub use crate::smtp::state::SessionState;
pub use crate::support::error::Error;
pub use crate::support::system_config::SmtpConfig;

#[cfg(test)]
static INIT_TEST_LOG: std::sync::Once = std::sync::Once::new();

#[cfg(test)]
fn init_test_log() {
    INIT_TEST_LOG.call_once(|| {
        fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} [{}][{}] {}",
                    chrono::Local::now().format("%H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message,
                ))
            })
            .level(log::LevelFilter::Debug)
            .chain(std::io::stderr())
            .apply()
            .unwrap();
    })
}
