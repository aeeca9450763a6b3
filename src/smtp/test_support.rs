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

//! Collaborators shared by the unit and integration tests.

use std::sync::{Arc, Mutex};

use super::auth::{Authorization, CredentialCheck};
use super::codes::*;
use super::engine::{Engine, EngineBuilder};
use super::line::Line;
use super::mail::{MailObject, MailService};
use super::reply::Reply;
use super::session::Session;
use crate::support::{error::Error, system_config::SmtpConfig};

/// How the mail objects of a `RecordingMailService` misbehave.
#[derive(Clone, Debug, Default)]
pub struct Faults {
    /// `mail_from` returns an error.
    pub mail_from_error: bool,
    /// Reverse paths which `mail_from` rejects with 550.
    pub rejected_senders: Vec<String>,
    /// Forward paths which `rcpt_to` rejects with 550.
    pub rejected_recipients: Vec<String>,
    /// `write_line` fails once this many lines have been written.
    pub fail_write_after: Option<usize>,
    /// `complete` returns an error.
    pub complete_error: bool,
}

/// Everything the mail objects of a `RecordingMailService` were asked to do.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    pub events: Vec<String>,
    pub data: Vec<u8>,
    pub messages: Vec<Vec<u8>>,
}

impl Journal {
    pub fn count(&self, event: &str) -> usize {
        self.events.iter().filter(|e| e.as_str() == event).count()
    }
}

#[derive(Clone, Default)]
pub struct RecordingMailService {
    pub faults: Faults,
    pub journal: Arc<Mutex<Journal>>,
}

impl RecordingMailService {
    pub fn new(faults: Faults) -> Self {
        RecordingMailService {
            faults,
            journal: Default::default(),
        }
    }

    pub fn journal(&self) -> Journal {
        self.journal.lock().unwrap().clone()
    }
}

impl MailService for RecordingMailService {
    fn new_mail(&self, session: &Session) -> Box<dyn MailObject> {
        self.journal
            .lock()
            .unwrap()
            .events
            .push(format!("new {}", session.peer_name()));
        Box::new(RecordingMail {
            faults: self.faults.clone(),
            journal: Arc::clone(&self.journal),
            written: 0,
            data: Vec::new(),
        })
    }
}

struct RecordingMail {
    faults: Faults,
    journal: Arc<Mutex<Journal>>,
    written: usize,
    data: Vec<u8>,
}

impl RecordingMail {
    fn log(&self, event: String) {
        self.journal.lock().unwrap().events.push(event);
    }
}

impl MailObject for RecordingMail {
    fn mail_from(
        &mut self,
        reverse_path: &str,
        _parameters: &str,
    ) -> Result<Reply, Error> {
        self.log(format!("mail_from {}", reverse_path));
        if self.faults.mail_from_error {
            return Err(Error::Mail("sender lookup exploded".to_owned()));
        }

        if self.faults.rejected_senders.iter().any(|s| s == reverse_path) {
            return Ok(Reply::new(pc::ActionNotTakenPermanent, "Go away"));
        }

        Ok(Reply::ok())
    }

    fn rcpt_to(
        &mut self,
        forward_path: &str,
        _parameters: &str,
    ) -> Result<Reply, Error> {
        self.log(format!("rcpt_to {}", forward_path));
        if self.faults.rejected_recipients.iter().any(|r| r == forward_path) {
            return Ok(Reply::new(pc::ActionNotTakenPermanent, "No such user"));
        }

        Ok(Reply::ok())
    }

    fn prepare_for_data(&mut self) -> Result<(), Error> {
        self.log("prepare_for_data".to_owned());
        Ok(())
    }

    fn write_line(&mut self, data: &[u8]) -> Result<(), Error> {
        if Some(self.written) == self.faults.fail_write_after {
            self.log("write_line failed".to_owned());
            return Err(Error::Mail("disk full".to_owned()));
        }

        self.written += 1;
        self.data.extend_from_slice(data);
        self.journal
            .lock()
            .unwrap()
            .data
            .extend_from_slice(data);
        self.log("write_line".to_owned());
        Ok(())
    }

    fn complete(&mut self) -> Result<Reply, Error> {
        self.log("complete".to_owned());
        if self.faults.complete_error {
            return Err(Error::Mail("spool vanished".to_owned()));
        }

        self.journal
            .lock()
            .unwrap()
            .messages
            .push(self.data.clone());
        Ok(Reply::new(pc::Ok, "Message accepted"))
    }

    fn dispose(&mut self) {
        self.log("dispose".to_owned());
    }
}

pub fn test_config() -> SmtpConfig {
    SmtpConfig {
        host_name: "mx.irk.example".to_owned(),
        ..SmtpConfig::default()
    }
}

pub fn builder(service: &RecordingMailService) -> EngineBuilder {
    builder_with_config(service, test_config())
}

pub fn builder_with_config(
    service: &RecordingMailService,
    config: SmtpConfig,
) -> EngineBuilder {
    crate::init_test_log();
    Engine::builder(config, Arc::new(service.clone()))
}

/// Creates a session on the standard engine and greets it.
pub fn connected_session(service: &RecordingMailService) -> Session {
    let engine = builder(service).standard_extensions().build();
    let mut session = engine.new_session("192.0.2.7:4321");
    assert_eq!(Some(220), session.connect().unwrap().code());
    session
}

/// Feeds `line` (with CRLF appended) to `session`.
pub fn send(session: &mut Session, line: &str) -> Reply {
    session
        .consume(&mut Line::new(format!("{}\r\n", line)))
        .unwrap()
}

/// Runs HELO through RCPT so that DATA is the next valid command.
pub fn ready_for_data(session: &mut Session) {
    assert!(send(session, "EHLO gir.earth.example").is_positive());
    assert!(send(session, "MAIL FROM:<dib@earth.example>").is_positive());
    assert!(send(session, "RCPT TO:<zim@irk.example>").is_positive());
}

/// Accepts `dib`/`hunter2` and `zim`/`gir`. The authcid `boom` makes the
/// check itself fail.
pub fn table_credentials() -> Arc<dyn CredentialCheck> {
    Arc::new(
        |authzid: &str,
         authcid: &str,
         credential: &[u8]|
         -> Result<Authorization, Error> {
            let expected = match authcid {
                "dib" => &b"hunter2"[..],
                "zim" => &b"gir"[..],
                "boom" => {
                    return Err(Error::Credentials(
                        "directory unreachable".to_owned(),
                    ))
                },
                _ => return Ok(Authorization::Denied),
            };

            if (authzid.is_empty() || authzid == authcid)
                && credential == expected
            {
                Ok(Authorization::Authorized(authcid.to_owned()))
            } else {
                Ok(Authorization::Denied)
            }
        },
    )
}
