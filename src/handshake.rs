//! tls-handshake-io
//! https://github.com/grahamking/ort
//!
//! MIT License
//! Copyright (c) 2025 Graham King
//!
//! The handshake I/O driver: five cooperating pieces (`spec.md` §2) wired
//! together by `negotiate`, the top-level loop the rest of a TLS endpoint
//! drives until application data may flow.

pub mod catalog;
pub mod connection;
pub mod messages;
pub mod read;
pub mod record;
pub mod transcript;
pub mod types;
pub mod variant_table;
pub mod write;

pub use connection::Connection;
pub use types::{Blocked, HandshakeType, MessageKind, Mode, Writer};

/// Upper bound on a handshake message's declared body length (`spec.md`
/// §6 wire format: the 3-byte length field could in principle encode up
/// to 16 MiB; this driver refuses anything past a sane ceiling before
/// ever touching a handler, per scenario S6).
pub const MAX_HANDSHAKE_MESSAGE_LENGTH: u32 = 1 << 16;

/// Drive `conn` until the handshake reaches `APPLICATION_DATA` or the
/// transport blocks (`spec.md` §6 `negotiate`). Each iteration asks C1-C3
/// which side writes the current message and calls into C4 or C5
/// accordingly; a blocked I/O error is turned into the matching
/// `Blocked` value rather than propagated, so callers can poll their
/// transport's readiness and call `negotiate` again without losing state
/// (`spec.md` §5 resumability invariant).
pub fn negotiate(conn: &mut Connection) -> crate::error::HsResult<Blocked> {
    loop {
        if conn.is_killed() {
            return Err(crate::error::bad_message("negotiate called on a killed connection"));
        }

        let kind = conn.current_message()?;
        if kind == MessageKind::ApplicationData {
            conn.release_buffers();
            return Ok(Blocked::NotBlocked);
        }

        let descriptor = conn.current_descriptor()?;
        let result = if descriptor.writer.matches(conn.mode) {
            write::handshake_write_io(conn)
        } else {
            read::handshake_read_io(conn)
        };

        match result {
            Ok(()) => continue,
            Err(err) if err.is_blocked() => {
                return Ok(if descriptor.writer.matches(conn.mode) {
                    Blocked::OnWrite
                } else {
                    Blocked::OnRead
                });
            }
            Err(write_err) if descriptor.writer.matches(conn.mode) => {
                // `spec.md` §5: a non-retryable write error gets one
                // chance to be explained by a peer alert before it is
                // surfaced. The read attempt's own blocked/killed status
                // is irrelevant here; only an `Alert` outranks the
                // original write error.
                match read::handshake_read_io(conn) {
                    Err(read_err) if read_err.is_alert() => return Err(read_err),
                    _ => return Err(write_err),
                }
            }
            Err(read_err) => return Err(read_err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use record::LoopbackTransport;

    /// Drives both ends of a handshake over one shared in-memory pipe by
    /// swapping which `LoopbackTransport` each connection reads from /
    /// writes to after every blocked call — the loopback equivalent of
    /// two processes sharing a socket.
    struct Pipe {
        client_to_server: std::collections::VecDeque<u8>,
        server_to_client: std::collections::VecDeque<u8>,
    }

    fn pump(client: &mut Connection, server: &mut Connection, pipe: &mut Pipe) -> crate::error::HsResult<()> {
        for _ in 0..10_000 {
            // Ferry any bytes one side wrote into the other side's inbox.
            if let Some(t) = client.loopback_mut() {
                pipe.client_to_server.extend(t.drain_outbox());
            }
            if let Some(t) = server.loopback_mut() {
                pipe.server_to_client.extend(t.drain_outbox());
            }
            if let Some(t) = server.loopback_mut() {
                t.feed(&pipe.client_to_server.drain(..).collect::<Vec<_>>());
            }
            if let Some(t) = client.loopback_mut() {
                t.feed(&pipe.server_to_client.drain(..).collect::<Vec<_>>());
            }

            let client_blocked = negotiate(client)?;
            let server_blocked = negotiate(server)?;

            if client_blocked == Blocked::NotBlocked && server_blocked == Blocked::NotBlocked {
                return Ok(());
            }
        }
        panic!("handshake did not converge");
    }

    /// S1: resumed session, no ticket.
    #[test]
    fn resumed_session_reaches_application_data() {
        let mut client = Connection::new(Mode::Client, Config::default(), Box::new(LoopbackTransport::new()));
        let mut server = Connection::new(Mode::Server, Config::default(), Box::new(LoopbackTransport::new()));
        client.negotiation_inputs.resuming_session = true;
        server.negotiation_inputs.resuming_session = true;
        client.set_handshake_type().unwrap();
        server.set_handshake_type().unwrap();

        let mut pipe = Pipe {
            client_to_server: Default::default(),
            server_to_client: Default::default(),
        };
        pump(&mut client, &mut server, &mut pipe).unwrap();

        assert_eq!(client.current_message().unwrap(), MessageKind::ApplicationData);
        assert_eq!(server.current_message().unwrap(), MessageKind::ApplicationData);
        assert_eq!(
            client.transcript.sha256_digest(),
            server.transcript.sha256_digest()
        );
    }

    /// S2: full handshake with PFS and OCSP, ticket issued.
    #[test]
    fn full_handshake_with_pfs_ocsp_and_ticket_reaches_application_data() {
        let mut client = Connection::new(Mode::Client, Config::default(), Box::new(LoopbackTransport::new()));
        let mut server = Connection::new(Mode::Server, Config::default(), Box::new(LoopbackTransport::new()));
        for conn in [&mut client, &mut server] {
            conn.negotiation_inputs.resuming_session = false;
            conn.negotiation_inputs.perfect_forward_secrecy = true;
            conn.negotiation_inputs.ocsp_status_requested = true;
            conn.negotiation_inputs.session_ticket_requested = true;
            conn.set_handshake_type().unwrap();
        }

        let mut pipe = Pipe {
            client_to_server: Default::default(),
            server_to_client: Default::default(),
        };
        pump(&mut client, &mut server, &mut pipe).unwrap();

        assert_eq!(client.current_message().unwrap(), MessageKind::ApplicationData);
        assert_eq!(server.current_message().unwrap(), MessageKind::ApplicationData);
    }
}
