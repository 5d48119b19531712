//! tls-handshake-io
//! https://github.com/grahamking/ort
//!
//! MIT License
//! Copyright (c) 2025 Graham King
//!
//! C4: the write path. Mirrors `handshake_write_io`: produce the current
//! message's body (once), frame it for the wire, fold it into the
//! transcript, push it out through the transport, and only then move the
//! cursor forward. Framing and hashing happen exactly once per message —
//! `Connection::io`'s `wiped` flag is what tells a fresh message apart
//! from one a blocked flush is still draining (`spec.md` §4.4).

use crate::error::{bad_message, HsResult};

use super::connection::{Connection, LEGACY_RECORD_VERSION};
use super::record::WireRecordType;
use super::types::RecordType;

/// Advance the write side by exactly one message, or return `Blocked`
/// (via `HsError::is_blocked`) with enough state retained in `conn` to
/// resume on the next call without re-producing or re-hashing the body.
pub fn handshake_write_io(conn: &mut Connection) -> HsResult<()> {
    if !conn.record_writer.has_pending() {
        let descriptor = conn.current_descriptor()?;
        if !descriptor.writer.matches(conn.mode) {
            return Err(bad_message("handshake_write_io called out of turn"));
        }

        if conn.io.is_wiped() {
            let handler = descriptor.handlers[conn.mode.handler_index()]
                .ok_or_else(|| bad_message("message has no write handler"))?;
            handler(conn)?;
        }

        let body = conn.io.as_slice().to_vec();
        let wire_record_type = match descriptor.record_type {
            RecordType::Handshake => WireRecordType::Handshake,
            RecordType::ChangeCipherSpec => WireRecordType::ChangeCipherSpec,
            RecordType::ApplicationData => WireRecordType::ApplicationData,
        };

        let on_wire = if descriptor.record_type == RecordType::Handshake {
            let mut framed = Vec::with_capacity(4 + body.len());
            framed.push(descriptor.wire_type);
            let len_bytes = (body.len() as u32).to_be_bytes();
            framed.extend_from_slice(&len_bytes[1..]);
            framed.extend_from_slice(&body);
            conn.transcript.update(&framed);
            framed
        } else {
            body
        };

        conn.record_writer.queue(wire_record_type, LEGACY_RECORD_VERSION, &on_wire);
    }

    conn.record_writer.flush(conn.transport.as_mut())?;
    conn.advance()
}
