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

use log::{error, info, warn};

use crate::smtp::codes::*;
use crate::smtp::command::CommandHandler;
use crate::smtp::consumer::{Consumed, LineConsumer};
use crate::smtp::line::Line;
use crate::smtp::reply::{Reply, Transition};
use crate::smtp::session::Session;
use crate::smtp::state::SessionState;
use crate::smtp::syntax::arguments;
use crate::support::error::Error;

/// The key under which the data consumer is installed while message content
/// is being received.
pub const DATA_CONSUMER_KEY: &str = "smtp.data";

/// Holds the reply to give at the end of the transfer once something has
/// gone wrong. While set, content lines are discarded.
const DATA_ERROR_PROPERTY: &str = "data.error";
/// The number of content bytes received so far.
const DATA_SIZE_PROPERTY: &str = "data.size";

/// DATA: switches the session into message-content mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct DataCommand;

impl CommandHandler for DataCommand {
    fn valid_for_state(&self, state: &SessionState) -> bool {
        SessionState::AfterRcpt == *state
    }

    fn handle_valid_command(
        &self,
        session: &mut Session,
        line: Option<&str>,
    ) -> Result<Consumed, Error> {
        if !line.map(arguments).unwrap_or("").is_empty() {
            return Ok(Transition::stay(Reply::syntax_error(
                "Syntax: DATA (no parameters allowed)",
            ))
            .into());
        }

        session.properties_mut().clear(DATA_ERROR_PROPERTY);
        session.properties_mut().set(DATA_SIZE_PROPERTY, 0u64);
        session.add_line_consumer(DATA_CONSUMER_KEY, Arc::new(DataConsumer));

        let prepared = match session.mail_mut() {
            Some(mail) => mail.prepare_for_data(),
            None => Err(Error::Mail("No mail object at DATA".to_owned())),
        };
        if let Err(e) = prepared {
            warn!("{} Failed to prepare for data: {}", session.log_prefix(), e);
            session.remove_line_consumer(DATA_CONSUMER_KEY);
            session.properties_mut().clear(DATA_SIZE_PROPERTY);
            session.clear_mail();
            return Ok(Transition::to(
                Reply::local_error(),
                SessionState::AfterEhlo,
            )
            .into());
        }

        info!("{} Begin data transfer", session.log_prefix());
        Ok(Transition::to(
            Reply::new(
                pc::StartMailInput,
                "Start mail input; end with <CRLF>.<CRLF>",
            ),
            SessionState::ReadingData,
        )
        .into())
    }
}

/// Causes the transfer in progress on `session` to fail with `reply` once
/// the terminating dot arrives. Content received until then is discarded.
///
/// Has no effect if no transfer is in progress or one has already failed.
pub fn abort_transfer(session: &mut Session, reply: Reply) {
    if session.line_consumers().contains(DATA_CONSUMER_KEY)
        && !session.properties().contains(DATA_ERROR_PROPERTY)
    {
        session.properties_mut().set(DATA_ERROR_PROPERTY, reply);
    }
}

/// Receives message content between DATA and the terminating dot.
///
/// SMTP gives the server no way to interrupt the client mid-transfer, so any
/// failure is remembered and reported in response to the final dot. No reply
/// is sent for content lines.
struct DataConsumer;

impl DataConsumer {
    fn end_of_data(&self, session: &mut Session) -> Transition {
        session.remove_line_consumer(DATA_CONSUMER_KEY);
        let size = session
            .properties_mut()
            .take::<u64>(DATA_SIZE_PROPERTY)
            .unwrap_or(0);

        if let Some(reply) =
            session.properties_mut().take::<Reply>(DATA_ERROR_PROPERTY)
        {
            info!(
                "{} Completed data transfer unsuccessfully: {}",
                session.log_prefix(),
                reply.text()
            );
            session.clear_mail();
            return Transition::to(reply, SessionState::AfterEhlo);
        }

        let reply = match session.finish_mail() {
            Ok(reply) => {
                info!(
                    "{} Completed data transfer of {} bytes",
                    session.log_prefix(),
                    size
                );
                reply
            },
            Err(e) => {
                error!(
                    "{} Failed to complete message: {}",
                    session.log_prefix(),
                    e
                );
                Reply::server_error()
            },
        };

        Transition::to(reply, SessionState::AfterEhlo)
    }

    fn write(&self, session: &mut Session, data: &[u8]) {
        let max_size = session.config().max_message_size;
        let size = match session
            .properties_mut()
            .get_mut::<u64>(DATA_SIZE_PROPERTY)
        {
            Some(size) => {
                *size += data.len() as u64;
                *size
            },
            None => data.len() as u64,
        };

        if max_size > 0 && size > max_size {
            warn!(
                "{} Message exceeds maximum size of {} bytes",
                session.log_prefix(),
                max_size
            );
            abort_transfer(
                session,
                Reply::new(
                    pc::ExceededStorageAllocation,
                    format!("Maximum message size is {} bytes", max_size),
                ),
            );
            return;
        }

        let result = match session.mail_mut() {
            Some(mail) => mail.write_line(data),
            None => Err(Error::Mail("No mail object during DATA".to_owned())),
        };

        if let Err(e) = result {
            warn!(
                "{} Failed to write message data: {}",
                session.log_prefix(),
                e
            );
            abort_transfer(session, Reply::server_error());
        }
    }
}

impl LineConsumer for DataConsumer {
    fn consume(
        &self,
        session: &mut Session,
        line: &mut Line,
    ) -> Result<Consumed, Error> {
        if b"." == line.content() {
            return Ok(self.end_of_data(session).into());
        }

        if !session.properties().contains(DATA_ERROR_PROPERTY) {
            // RFC 5321 §4.5.2: remove one leading dot
            let data = match line.bytes() {
                [b'.', rest @ ..] => rest,
                bytes => bytes,
            };
            self.write(session, data);
        }

        Ok(Transition::stay(Reply::Silent).into())
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;
    use crate::smtp::test_support::*;

    #[test]
    fn successful_transfer() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);
        ready_for_data(&mut session);

        assert_eq!(Some(354), send(&mut session, "DATA").code());
        assert_eq!(SessionState::ReadingData, *session.state());
        assert!(session.line_consumers().contains(DATA_CONSUMER_KEY));

        assert_eq!(Reply::Silent, send(&mut session, "Subject: hi"));
        assert_eq!(Reply::Silent, send(&mut session, ""));
        // Commands are just content now
        assert_eq!(Reply::Silent, send(&mut session, "QUIT"));
        assert_eq!(SessionState::ReadingData, *session.state());

        assert_eq!(
            Reply::new(pc::Ok, "Message accepted"),
            send(&mut session, ".")
        );
        assert_eq!(SessionState::AfterEhlo, *session.state());
        assert!(!session.has_mail());
        assert!(!session.line_consumers().contains(DATA_CONSUMER_KEY));

        let journal = service.journal();
        assert_eq!(1, journal.count("complete"));
        assert_eq!(1, journal.count("dispose"));
        assert_eq!(
            vec![b"Subject: hi\r\n\r\nQUIT\r\n".to_vec()],
            journal.messages
        );

        // The session is usable for another transaction
        assert_eq!(Reply::ok(), send(&mut session, "MAIL FROM:<>"));
    }

    #[test]
    fn dot_unstuffing() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);
        ready_for_data(&mut session);
        send(&mut session, "DATA");

        send(&mut session, "..foo");
        send(&mut session, "..");
        send(&mut session, ". bar");
        send(&mut session, "baz.");
        send(&mut session, ".");

        assert_eq!(
            vec![b".foo\r\n.\r\n bar\r\nbaz.\r\n".to_vec()],
            service.journal().messages
        );
    }

    #[test]
    fn unix_line_endings() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);
        ready_for_data(&mut session);
        send(&mut session, "DATA");

        session.consume(&mut Line::from("..foo\n")).unwrap();
        let reply = session.consume(&mut Line::from(".\n")).unwrap();
        assert_eq!(Some(250), reply.code());
        assert_eq!(vec![b".foo\n".to_vec()], service.journal().messages);
    }

    #[test]
    fn data_with_arguments() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);
        ready_for_data(&mut session);

        assert_eq!(Some(501), send(&mut session, "DATA now").code());
        assert_eq!(SessionState::AfterRcpt, *session.state());
        assert!(!session.line_consumers().contains(DATA_CONSUMER_KEY));
        assert_eq!(0, service.journal().count("prepare_for_data"));
    }

    #[test]
    fn data_out_of_sequence() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);
        send(&mut session, "EHLO gir.example");
        send(&mut session, "MAIL FROM:<dib@earth.example>");

        assert_eq!(Reply::bad_sequence(), send(&mut session, "DATA"));
        assert!(!session.line_consumers().contains(DATA_CONSUMER_KEY));
    }

    #[test]
    fn write_failure_is_deferred() {
        let service = RecordingMailService::new(Faults {
            fail_write_after: Some(1),
            ..Faults::default()
        });
        let mut session = connected_session(&service);
        ready_for_data(&mut session);
        send(&mut session, "DATA");

        assert_eq!(Reply::Silent, send(&mut session, "line one"));
        assert_eq!(Reply::Silent, send(&mut session, "line two"));
        assert_eq!(Reply::Silent, send(&mut session, "line three"));
        assert_eq!(Reply::Silent, send(&mut session, "..line four"));

        let reply = send(&mut session, ".");
        assert_eq!(Some(554), reply.code());
        assert_eq!(SessionState::AfterEhlo, *session.state());
        assert!(!session.has_mail());

        let journal = service.journal();
        assert_eq!(1, journal.count("write_line"));
        assert_eq!(1, journal.count("write_line failed"));
        assert_eq!(0, journal.count("complete"));
        assert_eq!(1, journal.count("dispose"));
        assert_eq!(b"line one\r\n".to_vec(), journal.data);
    }

    #[test]
    fn complete_failure_becomes_server_error() {
        let service = RecordingMailService::new(Faults {
            complete_error: true,
            ..Faults::default()
        });
        let mut session = connected_session(&service);
        ready_for_data(&mut session);
        send(&mut session, "DATA");
        send(&mut session, "content");

        assert_eq!(Reply::server_error(), send(&mut session, "."));
        assert_eq!(SessionState::AfterEhlo, *session.state());
        assert_eq!(1, service.journal().count("dispose"));
    }

    #[test]
    fn size_limit() {
        let service = RecordingMailService::default();
        let mut config = test_config();
        config.max_message_size = 16;
        let engine = builder_with_config(&service, config).build();
        let mut session = engine.new_session("peer");
        session.connect().unwrap();
        ready_for_data(&mut session);
        send(&mut session, "DATA");

        assert_eq!(Reply::Silent, send(&mut session, "0123456789"));
        assert_eq!(Reply::Silent, send(&mut session, "0123456789"));
        assert_eq!(Reply::Silent, send(&mut session, "0123456789"));
        assert_eq!(Some(552), send(&mut session, ".").code());

        let journal = service.journal();
        assert_eq!(1, journal.count("write_line"));
        assert_eq!(0, journal.count("complete"));
    }

    #[test]
    fn abort_transfer_outside_data_is_ignored() {
        let service = RecordingMailService::default();
        let mut session = connected_session(&service);
        abort_transfer(&mut session, Reply::server_error());
        assert!(!session.properties().contains(DATA_ERROR_PROPERTY));
    }

    proptest! {
        #[test]
        fn content_survives_unstuffing(
            lines in prop::collection::vec("[.x ]{0,8}", 0..10)
        ) {
            let service = RecordingMailService::default();
            let mut session = connected_session(&service);
            ready_for_data(&mut session);
            send(&mut session, "DATA");

            let mut expected = Vec::<u8>::new();
            for line in &lines {
                let stuffed = if line.starts_with('.') {
                    format!(".{}", line)
                } else {
                    line.clone()
                };
                prop_assert_eq!(Reply::Silent, send(&mut session, &stuffed));
                expected.extend_from_slice(line.as_bytes());
                expected.extend_from_slice(b"\r\n");
            }

            prop_assert!(send(&mut session, ".").is_positive());
            prop_assert_eq!(vec![expected], service.journal().messages);
        }
    }
}
