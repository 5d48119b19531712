//! tls-handshake-io
//! https://github.com/grahamking/ort
//!
//! MIT License
//! Copyright (c) 2025 Graham King
//!
//! C5: the read path. Mirrors `handshake_read_io`/`read_full_handshake_message`:
//! pull bytes off the wire, reassemble handshake messages that were split
//! across records and split apart messages that were coalesced into one
//! record, validate each against what the progression engine currently
//! expects, fold the raw bytes into the transcript only after the
//! handler has observed the pre-update transcript, then advance
//! (`spec.md` §4.5, §7).

use crate::error::{alert, bad_message, HsResult};

use super::connection::Connection;
use super::record::{RecordRead, WireRecordType};
use super::types::{HandshakeType, MessageKind, RecordType};

/// 4-byte handshake message header: 1-byte type, 3-byte big-endian length.
const HANDSHAKE_HEADER_LEN: usize = 4;

/// Outcome of trying to assemble one handshake message out of whatever is
/// currently buffered in `conn.io` plus whatever remains of the current
/// record in `conn.record_in` (`spec.md` §4.5 step 4a).
enum Reassembly {
    NeedMore,
    Complete(u8),
}

/// Read and dispatch handshake-record traffic until either one full
/// message has been delivered to its handler or the transport blocks.
/// A single record may contain zero, one, or several handshake messages;
/// a single handshake message may span many records. Both are
/// transparent to the caller (`spec.md` §8 invariant 6).
pub fn handshake_read_io(conn: &mut Connection) -> HsResult<()> {
    let descriptor = conn.current_descriptor()?;
    if descriptor.writer.matches(conn.mode) {
        return Err(bad_message("handshake_read_io called out of turn"));
    }

    loop {
        if conn.record_in.is_empty() {
            conn.current_record_kind = None;
            let outcome = conn
                .record_reader
                .poll(conn.transport.as_mut(), &mut conn.record_in)?;

            match outcome {
                RecordRead::Sslv2ClientHello { header } => return handle_sslv2_hello(conn, header),
                RecordRead::Complete(WireRecordType::ApplicationData) => {
                    return Err(bad_message("application data received during handshake"));
                }
                RecordRead::Complete(WireRecordType::Alert) => {
                    let raw = conn.record_in.as_slice();
                    let level = raw.first().copied().unwrap_or(2);
                    let description = raw.get(1).copied().unwrap_or(0);
                    conn.record_in.wipe();
                    conn.kill();
                    return Err(alert(level, description));
                }
                RecordRead::Complete(WireRecordType::ChangeCipherSpec) => {
                    return handle_change_cipher_spec(conn);
                }
                RecordRead::Complete(WireRecordType::Handshake) => {
                    conn.current_record_kind = Some(WireRecordType::Handshake);
                }
            }
        }

        // Bytes left over from a record type this driver doesn't expect
        // mid-handshake slip through as a fresh `record_in` whose kind we
        // never set; silently drop them and return, as an unknown type
        // would be (`spec.md` §4.5 step 3, "Unknown types -> silently
        // drop").
        if conn.current_record_kind != Some(WireRecordType::Handshake) {
            conn.record_in.wipe();
            return Ok(());
        }

        match read_full_handshake_message(conn)? {
            Reassembly::NeedMore => {
                // The record is exhausted but the message is not yet
                // complete; `conn.io` keeps what was buffered so the next
                // call picks up where this one left off.
                conn.record_in.wipe();
                conn.current_record_kind = None;
                return Ok(());
            }
            Reassembly::Complete(actual_type) => {
                repair_state_machine(conn, actual_type);

                let descriptor = conn.current_descriptor()?;
                if actual_type != descriptor.wire_type {
                    return Err(bad_message(format!(
                        "expected handshake type {}, got {actual_type}",
                        descriptor.wire_type
                    )));
                }

                let header_and_body = conn.io.as_slice().to_vec();
                let body = header_and_body[HANDSHAKE_HEADER_LEN..].to_vec();

                // Hand the handler only the payload, positioned at its
                // start, before this message's own bytes join the
                // transcript (`Finished` verification needs the
                // transcript as it stood *before* its own digest byte).
                conn.io.wipe();
                conn.io.write(&body);
                let handler = descriptor.handlers[conn.mode.handler_index()];
                let Some(handler) = handler else {
                    return Err(bad_message("message has no read handler"));
                };
                let result = handler(conn);

                conn.transcript.update(&header_and_body);
                conn.io.wipe();

                if let Err(err) = result {
                    conn.kill();
                    return Err(err);
                }
                conn.advance()?;

                // The terminal slot has no handler and ends the loop
                // even if bytes somehow remain.
                if conn.current_message()? == MessageKind::ApplicationData {
                    conn.record_in.wipe();
                    conn.current_record_kind = None;
                    return Ok(());
                }

                if conn.record_in.is_empty() {
                    conn.current_record_kind = None;
                    return Ok(());
                }
                // Otherwise the record coalesced another handshake
                // message; loop around and process it without polling
                // the transport again.
            }
        }
    }
}

/// `spec.md` §4.5 step 4a: accumulate header then body bytes of one
/// handshake message into `conn.io`, pulling only from what remains of
/// the current record. Returns `NeedMore` the moment the record runs dry
/// before the message is complete; the caller is responsible for
/// preserving `conn.io` across calls (it never wipes a partial message).
fn read_full_handshake_message(conn: &mut Connection) -> HsResult<Reassembly> {
    if conn.io.as_slice().len() < HANDSHAKE_HEADER_LEN {
        let need = HANDSHAKE_HEADER_LEN - conn.io.as_slice().len();
        let take = need.min(conn.record_in.data_available());
        if take > 0 {
            let bytes = conn.record_in.raw_read(take).to_vec();
            conn.io.write(&bytes);
        }
        if conn.io.as_slice().len() < HANDSHAKE_HEADER_LEN {
            return Ok(Reassembly::NeedMore);
        }
    }

    let header = conn.io.as_slice();
    let wire_type = header[0];
    let body_len = ((header[1] as usize) << 16) | ((header[2] as usize) << 8) | header[3] as usize;
    if body_len > conn.config.max_handshake_message_len as usize {
        return Err(bad_message("handshake message exceeds the maximum allowed length"));
    }

    let buffered_body = conn.io.as_slice().len() - HANDSHAKE_HEADER_LEN;
    let need_body = body_len - buffered_body;
    if need_body > 0 {
        let take = need_body.min(conn.record_in.data_available());
        if take > 0 {
            let bytes = conn.record_in.raw_read(take).to_vec();
            conn.io.write(&bytes);
        }
    }

    if conn.io.as_slice().len() == HANDSHAKE_HEADER_LEN + body_len {
        Ok(Reassembly::Complete(wire_type))
    } else {
        Ok(Reassembly::NeedMore)
    }
}

/// Client-side state-machine repairs applied before the type check, for
/// the two rare mid-handshake escalations the spec calls out by name
/// (`spec.md` §4.5 step 4c).
fn repair_state_machine(conn: &mut Connection, actual_type: u8) {
    use super::catalog::descriptor;

    if !matches!(conn.mode, super::types::Mode::Client) {
        return;
    }
    let Ok(expected) = conn.current_message() else {
        return;
    };

    if expected == MessageKind::ServerHelloDone
        && conn.config.client_auth_mode == crate::config::ClientAuthMode::Optional
        && actual_type == descriptor(MessageKind::ServerCertReq).wire_type
    {
        conn.set_handshake_type_flag(HandshakeType::CLIENT_AUTH);
    }

    if expected == MessageKind::ServerCertStatus && actual_type != descriptor(MessageKind::ServerCertStatus).wire_type
    {
        conn.clear_handshake_type_flag(HandshakeType::OCSP_STATUS);
    }
}

fn handle_change_cipher_spec(conn: &mut Connection) -> HsResult<()> {
    let raw = conn.record_in.as_slice().to_vec();
    conn.record_in.wipe();
    conn.current_record_kind = None;
    if raw.len() != 1 {
        return Err(bad_message("change_cipher_spec record must be exactly one byte"));
    }
    dispatch_body(conn, &raw)
}

/// Only ever legal as the very first record of a connection (Open
/// Question 1, resolved: terminal for this record — the embedded hello
/// is the only thing ever extracted from an SSLv2-framed record, and no
/// further record-type dispatch is attempted against it).
fn handle_sslv2_hello(conn: &mut Connection, header: [u8; 3]) -> HsResult<()> {
    if conn.message_number() != 0 || conn.current_message()? != MessageKind::ClientHello {
        return Err(bad_message("SSLv2 hello received outside the initial state"));
    }
    conn.transcript.update(&header);
    let body = conn.record_in.as_slice().to_vec();
    conn.record_in.wipe();
    conn.transcript.update(&body);
    dispatch_body(conn, &body)
}

fn dispatch_body(conn: &mut Connection, body: &[u8]) -> HsResult<()> {
    let descriptor = conn.current_descriptor()?;
    conn.io.wipe();
    conn.io.write(body);
    let handler = descriptor.handlers[conn.mode.handler_index()]
        .ok_or_else(|| bad_message("message has no read handler"))?;
    let result = handler(conn);
    conn.io.wipe();
    if let Err(err) = result {
        conn.kill();
        return Err(err);
    }
    conn.advance()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handshake::record::LoopbackTransport;
    use crate::handshake::types::Mode;
    use crate::handshake::write::handshake_write_io;

    #[test]
    fn client_hello_written_by_client_is_read_back_by_server() {
        let mut client = Connection::new(Mode::Client, Config::default(), Box::new(LoopbackTransport::new()));
        client.session_id = vec![9, 9];
        client.set_handshake_type().unwrap();
        handshake_write_io(&mut client).unwrap();

        let on_wire = client
            .loopback_mut()
            .expect("test transport is a LoopbackTransport")
            .drain_outbox();

        let mut server = Connection::new(Mode::Server, Config::default(), Box::new(LoopbackTransport::new()));
        server.set_handshake_type().unwrap();
        server
            .loopback_mut()
            .expect("test transport is a LoopbackTransport")
            .feed(&on_wire);

        handshake_read_io(&mut server).unwrap();
        assert_eq!(server.session_id, vec![9, 9]);
        assert_eq!(server.message_number(), 1);
        assert_eq!(server.current_message().unwrap(), MessageKind::ServerHello);
    }

    #[test]
    fn reading_with_nothing_on_the_wire_blocks() {
        let mut server = Connection::new(Mode::Server, Config::default(), Box::new(LoopbackTransport::new()));
        server.set_handshake_type().unwrap();
        let err = handshake_read_io(&mut server).unwrap_err();
        assert!(err.is_blocked());
    }

    /// S5: an 18 KB `SERVER_CERT` delivered as thirty-seven 512-byte
    /// records plus one zero-byte record (`spec.md` §8 scenario S5).
    #[test]
    fn hostile_fragmentation_reassembles_across_many_records() {
        use crate::handshake::record::{record_write, WireRecordType};

        let mut framed = Vec::new();
        framed.push(11u8); // SERVER_CERT wire type
        let body = vec![0x7Au8; 18 * 1024 - HANDSHAKE_HEADER_LEN];
        let len = body.len() as u32;
        framed.extend_from_slice(&len.to_be_bytes()[1..]);
        framed.extend_from_slice(&body);

        // Build the on-wire bytes on a scratch transport, fragmented into
        // 512-byte records plus one interleaved zero-byte record, then
        // feed the concatenated bytes into the server's actual inbox.
        let mut builder = LoopbackTransport::new();
        let mut offset = 0;
        let mut chunks_written = 0;
        while offset < framed.len() {
            let take = 512.min(framed.len() - offset);
            record_write(&mut builder, WireRecordType::Handshake, (3, 3), &framed[offset..offset + take]).unwrap();
            offset += take;
            chunks_written += 1;
        }
        record_write(&mut builder, WireRecordType::Handshake, (3, 3), &[]).unwrap();
        assert_eq!(chunks_written, 37);

        let mut t = LoopbackTransport::new();
        t.feed(&builder.drain_outbox());

        let mut server = Connection::new(Mode::Server, Config::default(), Box::new(t));
        server.negotiation_inputs.perfect_forward_secrecy = false;
        server.set_handshake_type().unwrap();
        // Walk the server to SERVER_CERT (past CLIENT_HELLO/SERVER_HELLO
        // writes is out of scope here; drive message_number directly via
        // repeated advance is not exposed, so exercise the read path by
        // forcing the sequence position with a full-handshake connection
        // that starts its read precisely at SERVER_CERT).
        while server.current_message().unwrap() != MessageKind::ServerCert {
            server.advance().unwrap();
        }

        let mut reads = 0;
        loop {
            match handshake_read_io(&mut server) {
                Ok(()) => break,
                Err(e) if e.is_blocked() => {
                    reads += 1;
                    assert!(reads < 100, "did not converge on a complete message");
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(server.current_message().unwrap(), MessageKind::ServerHelloDone);
    }

    /// S6: an oversized handshake header is rejected before any handler
    /// runs (`spec.md` §8 scenario S6).
    #[test]
    fn oversize_handshake_message_is_rejected() {
        use crate::handshake::record::{record_write, WireRecordType};

        let config = Config::default();
        let too_big = config.max_handshake_message_len + 1;

        let mut t = LoopbackTransport::new();
        let mut framed = vec![11u8];
        framed.extend_from_slice(&too_big.to_be_bytes()[1..]);
        record_write(&mut t, WireRecordType::Handshake, (3, 3), &framed).unwrap();

        let mut server = Connection::new(Mode::Server, config, Box::new(t));
        server.set_handshake_type().unwrap();
        while server.current_message().unwrap() != MessageKind::ServerCert {
            server.advance().unwrap();
        }
        let message_number_before = server.message_number();

        let err = handshake_read_io(&mut server).unwrap_err();
        assert!(!err.is_blocked());
        // No handler ran and the progression engine never advanced past
        // the rejected message.
        assert_eq!(server.message_number(), message_number_before);
    }

    /// S3: the client negotiated `OCSP_STATUS` but the server sends
    /// `SERVER_KEY` where `SERVER_CERT_STATUS` was expected — the repair
    /// clears the flag and the type check that follows accepts
    /// `SERVER_KEY` against the now-current position (`spec.md` §8 S3).
    #[test]
    fn ocsp_opt_out_clears_flag_when_server_skips_cert_status() {
        use crate::handshake::catalog::descriptor;

        let mut client = Connection::new(Mode::Client, Config::default(), Box::new(LoopbackTransport::new()));
        client.negotiation_inputs.ocsp_status_requested = true;
        client.set_handshake_type().unwrap();
        while client.current_message().unwrap() != MessageKind::ServerCertStatus {
            client.advance().unwrap();
        }
        assert!(client.handshake_type().contains(HandshakeType::OCSP_STATUS));

        let server_key_wire_type = descriptor(MessageKind::ServerKey).wire_type;
        repair_state_machine(&mut client, server_key_wire_type);

        assert!(!client.handshake_type().contains(HandshakeType::OCSP_STATUS));
    }

    /// S4: the client negotiated without `CLIENT_AUTH`, auth mode is
    /// optional, and the server sends `CLIENT_CERT_REQ` where
    /// `SERVER_HELLO_DONE` was expected — the repair promotes the bitset
    /// so the position now expects `CLIENT_CERT_REQ` (`spec.md` §8 S4).
    #[test]
    fn optional_auth_upgrade_sets_flag_when_server_requests_a_cert() {
        use crate::handshake::catalog::descriptor;

        let mut client = Connection::new(Mode::Client, Config::default(), Box::new(LoopbackTransport::new()));
        client.config.client_auth_mode = crate::config::ClientAuthMode::Optional;
        client.set_handshake_type().unwrap();
        while client.current_message().unwrap() != MessageKind::ServerHelloDone {
            client.advance().unwrap();
        }
        assert!(!client.handshake_type().contains(HandshakeType::CLIENT_AUTH));

        let cert_req_wire_type = descriptor(MessageKind::ServerCertReq).wire_type;
        repair_state_machine(&mut client, cert_req_wire_type);

        assert!(client.handshake_type().contains(HandshakeType::CLIENT_AUTH));
    }

    /// SSLv2-compatible `ClientHello`: the 3 bytes following the 2-byte
    /// length field join the transcript ahead of the body but never
    /// reach the handler, mirroring `s2n_handshake_handle_sslv2`'s
    /// `header_in[2..5)` vs `conn->in` split (`spec.md` §4.5 edge case).
    #[test]
    fn sslv2_hello_hashes_header_before_body_but_hides_it_from_the_handler() {
        use crate::handshake::transcript::{RequiredHashes, Transcript};

        let header = [0x01u8, 0x03, 0x03];
        let body = vec![2u8, 7, 8]; // session-id length 2, then [7, 8]

        let mut t = LoopbackTransport::new();
        let remaining_len = header.len() + body.len();
        t.feed(&[0x80, remaining_len as u8]);
        t.feed(&header);
        t.feed(&body);

        let mut server = Connection::new(Mode::Server, Config::default(), Box::new(t));
        server.negotiation_inputs.required_hashes = RequiredHashes::TLS12_SHA256;
        server.set_handshake_type().unwrap();

        handshake_read_io(&mut server).unwrap();

        assert_eq!(server.session_id, vec![7, 8]);

        let mut expected = Transcript::new(RequiredHashes::TLS12_SHA256);
        expected.update(&header);
        expected.update(&body);
        assert_eq!(server.transcript.sha256_digest(), expected.sha256_digest());
    }
}
