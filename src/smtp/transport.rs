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

//! A blocking transport driving one `Session` over a byte stream.
//!
//! This is all the framing the engine needs: it splits the input into
//! lines, feeds them to the session, writes back whatever the session
//! replies, and hands the stream to a `TlsUpgrader` when STARTTLS is
//! accepted.

use std::io::{self, BufRead, BufReader, Read, Write};

use log::{error, info, warn};

use super::codes::*;
use super::commands::abort_transfer;
use super::line::Line;
use super::reply::Reply;
use super::session::Session;
use super::state::SessionState;
use crate::support::error::Error;

/// A bidirectional byte stream.
pub trait ReadWrite: Read + Write + Send {}
impl<T: Read + Write + Send> ReadWrite for T {}

/// Performs the server side of a TLS handshake.
pub trait TlsUpgrader {
    /// Wraps `io` in TLS, returning the encrypted stream and a description
    /// of the TLS session for logging.
    fn upgrade(
        &self,
        io: Box<dyn ReadWrite>,
    ) -> Result<(Box<dyn ReadWrite>, String), Error>;
}

type Io = BufReader<Box<dyn ReadWrite>>;

/// Runs `session` over `io` until the client quits, the connection is
/// closed, or an error occurs.
///
/// `Session::connection_lost` is always called before returning. A client
/// hanging up without QUIT is reported as an `UnexpectedEof` error.
pub fn serve(
    session: &mut Session,
    io: Box<dyn ReadWrite>,
    tls: Option<&dyn TlsUpgrader>,
) -> Result<(), Error> {
    let result = run(session, BufReader::new(io), tls);
    match result {
        Ok(()) => info!("{} Normal client disconnect", session.log_prefix()),
        Err(ref e) => {
            warn!("{} Abnormal client disconnect: {}", session.log_prefix(), e)
        },
    }

    session.connection_lost();
    result
}

fn run(
    session: &mut Session,
    mut io: Io,
    tls: Option<&dyn TlsUpgrader>,
) -> Result<(), Error> {
    let reply = session.connect()?;
    send_reply(&mut io, &reply)?;
    if reply.closes_connection() {
        return Ok(());
    }

    let max_line_length = session.config().max_line_length.max(3);
    loop {
        let mut buffer = Vec::new();
        (&mut io)
            .take(max_line_length as u64)
            .read_until(b'\n', &mut buffer)?;

        if buffer.is_empty() {
            return Err(Error::Io(io::ErrorKind::UnexpectedEof.into()));
        }

        if !buffer.ends_with(b"\n") {
            if buffer.len() < max_line_length {
                return Err(Error::Io(io::ErrorKind::UnexpectedEof.into()));
            }

            skip_line(&mut io)?;
            let reply = line_too_long(session, max_line_length);
            send_reply(&mut io, &reply)?;
            continue;
        }

        let reply = match session.consume(&mut Line::new(buffer)) {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    "{} Aborting connection after error: {}",
                    session.log_prefix(),
                    e
                );
                let _ = send_reply(&mut io, &Reply::shutting_down());
                return Err(e);
            },
        };

        if reply.is_start_tls() {
            io = start_tls(session, io, &reply, tls)?;
            continue;
        }

        send_reply(&mut io, &reply)?;
        if reply.closes_connection() {
            return Ok(());
        }
    }
}

fn line_too_long(session: &mut Session, max_line_length: usize) -> Reply {
    warn!(
        "{} {}",
        session.log_prefix(),
        Error::LineTooLong(max_line_length)
    );

    let reply = Reply::new(pc::CommandSyntaxError, "Line too long");
    if SessionState::ReadingData == *session.state() {
        // Reported when the client finishes the message
        abort_transfer(session, reply);
        Reply::Silent
    } else {
        reply
    }
}

fn start_tls(
    session: &mut Session,
    mut io: Io,
    reply: &Reply,
    tls: Option<&dyn TlsUpgrader>,
) -> Result<Io, Error> {
    let Some(tls) = tls else {
        error!(
            "{} [BUG] STARTTLS accepted without a TLS upgrader",
            session.log_prefix()
        );
        send_reply(&mut io, &Reply::local_error())?;
        return Ok(io);
    };

    // Anything sent after STARTTLS but before the handshake would be
    // processed as if it had come over TLS.
    if !io.buffer().is_empty() {
        warn!(
            "{} Client pipelined data after STARTTLS",
            session.log_prefix()
        );
        let _ = send_reply(&mut io, &Reply::shutting_down());
        return Err(Error::PipelinedStartTls);
    }

    send_reply(&mut io, reply)?;
    let (io, description) = tls.upgrade(io.into_inner())?;
    session.tls_established(description);
    Ok(BufReader::new(io))
}

/// Discards input up to and including the next LF.
fn skip_line(io: &mut impl BufRead) -> io::Result<()> {
    loop {
        let buf = io.fill_buf()?;
        if buf.is_empty() {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }

        match memchr::memchr(b'\n', buf) {
            Some(ix) => {
                io.consume(ix + 1);
                return Ok(());
            },
            None => {
                let len = buf.len();
                io.consume(len);
            },
        }
    }
}

fn send_reply(io: &mut Io, reply: &Reply) -> io::Result<()> {
    if reply.is_silent() {
        return Ok(());
    }

    let dst = io.get_mut();
    reply.write_to(&mut *dst)?;
    dst.flush()
}
