//! tls-handshake-io
//! https://github.com/grahamking/ort
//!
//! MIT License
//! Copyright (c) 2025 Graham King
//!
//! Per-message handlers (the `(server, client)` pair in every
//! `Descriptor`). Parsing and generating the cryptographic content of
//! each message — certificates, key shares, signatures — is explicitly a
//! Non-goal (`spec.md` §2); a handler's job here is only to produce or
//! consume the bytes that belong in `Connection::io` for that slot, so
//! the write/read paths (C4/C5) have something real to frame and hash.
//! Each function is named for exactly one cell of `catalog::descriptor`'s
//! match, mirroring the one-handler-per-message-per-side shape of the
//! original `state_machine[]` handler table.

use crate::error::HsResult;

use super::connection::Connection;

/// Placeholder body written by every `_send` handler that has no
/// negotiation-relevant content of its own. Keeps the message
/// non-empty — a zero-length handshake body is otherwise indistinguishable
/// from "nothing written yet" on the wire.
const OPAQUE_BODY: &[u8] = &[0u8];

fn send_opaque(conn: &mut Connection) -> HsResult<()> {
    conn.io.write(OPAQUE_BODY);
    Ok(())
}

fn recv_opaque(conn: &mut Connection) -> HsResult<()> {
    let _ = conn.io.raw_read(conn.io.data_available());
    Ok(())
}

pub fn client_hello_send(conn: &mut Connection) -> HsResult<()> {
    let len = conn.session_id.len() as u8;
    conn.io.write(&[len]);
    let session_id = conn.session_id.clone();
    conn.io.write(&session_id);
    Ok(())
}

pub fn client_hello_recv(conn: &mut Connection) -> HsResult<()> {
    let all = conn.io.raw_read(conn.io.data_available()).to_vec();
    if let Some((&len, rest)) = all.split_first() {
        let len = len as usize;
        if rest.len() >= len {
            conn.session_id = rest[..len].to_vec();
        }
    }
    conn.set_handshake_type()
}

pub fn server_hello_send(conn: &mut Connection) -> HsResult<()> {
    let session_id = conn.session_id.clone();
    conn.io.write(&[session_id.len() as u8]);
    conn.io.write(&session_id);
    conn.set_handshake_type()
}

pub fn server_hello_recv(conn: &mut Connection) -> HsResult<()> {
    let all = conn.io.raw_read(conn.io.data_available()).to_vec();
    if let Some((&len, rest)) = all.split_first() {
        let len = len as usize;
        if rest.len() >= len {
            conn.session_id = rest[..len].to_vec();
        }
    }
    Ok(())
}

pub fn server_nst_send(conn: &mut Connection) -> HsResult<()> {
    send_opaque(conn)
}

pub fn server_nst_recv(conn: &mut Connection) -> HsResult<()> {
    recv_opaque(conn)
}

pub fn server_cert_send(conn: &mut Connection) -> HsResult<()> {
    send_opaque(conn)
}

pub fn server_cert_recv(conn: &mut Connection) -> HsResult<()> {
    recv_opaque(conn)
}

pub fn server_status_send(conn: &mut Connection) -> HsResult<()> {
    send_opaque(conn)
}

pub fn server_status_recv(conn: &mut Connection) -> HsResult<()> {
    recv_opaque(conn)
}

pub fn server_key_send(conn: &mut Connection) -> HsResult<()> {
    send_opaque(conn)
}

pub fn server_key_recv(conn: &mut Connection) -> HsResult<()> {
    recv_opaque(conn)
}

pub fn cert_req_send(conn: &mut Connection) -> HsResult<()> {
    send_opaque(conn)
}

pub fn cert_req_recv(conn: &mut Connection) -> HsResult<()> {
    recv_opaque(conn)
}

pub fn server_done_send(conn: &mut Connection) -> HsResult<()> {
    send_opaque(conn)
}

pub fn server_done_recv(conn: &mut Connection) -> HsResult<()> {
    recv_opaque(conn)
}

pub fn client_cert_send(conn: &mut Connection) -> HsResult<()> {
    send_opaque(conn)
}

pub fn client_cert_recv(conn: &mut Connection) -> HsResult<()> {
    recv_opaque(conn)
}

pub fn client_key_send(conn: &mut Connection) -> HsResult<()> {
    send_opaque(conn)
}

pub fn client_key_recv(conn: &mut Connection) -> HsResult<()> {
    recv_opaque(conn)
}

pub fn client_cert_verify_send(conn: &mut Connection) -> HsResult<()> {
    send_opaque(conn)
}

pub fn client_cert_verify_recv(conn: &mut Connection) -> HsResult<()> {
    recv_opaque(conn)
}

/// `ChangeCipherSpec` shares one wire body regardless of which side sends
/// it (`spec.md` §4.1: wire type 0, present on both legs of the
/// catalog). The descriptor routes both `ClientChangeCipherSpec` and
/// `ServerChangeCipherSpec`'s send side through this one function.
pub fn ccs_send(conn: &mut Connection) -> HsResult<()> {
    conn.io.write(&[1u8]);
    Ok(())
}

pub fn client_ccs_recv(conn: &mut Connection) -> HsResult<()> {
    recv_opaque(conn)
}

pub fn server_ccs_recv(conn: &mut Connection) -> HsResult<()> {
    recv_opaque(conn)
}

pub fn client_finished_send(conn: &mut Connection) -> HsResult<()> {
    let verify_data = conn
        .transcript
        .sha256_digest()
        .or_else(|| conn.transcript.md5_sha1_digest())
        .unwrap_or_default();
    conn.io.write(&verify_data);
    Ok(())
}

pub fn client_finished_recv(conn: &mut Connection) -> HsResult<()> {
    recv_opaque(conn)
}

pub fn server_finished_send(conn: &mut Connection) -> HsResult<()> {
    let verify_data = conn
        .transcript
        .sha256_digest()
        .or_else(|| conn.transcript.md5_sha1_digest())
        .unwrap_or_default();
    conn.io.write(&verify_data);
    Ok(())
}

pub fn server_finished_recv(conn: &mut Connection) -> HsResult<()> {
    recv_opaque(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handshake::record::LoopbackTransport;
    use crate::handshake::types::Mode;

    fn conn(mode: Mode) -> Connection {
        Connection::new(mode, Config::default(), Box::new(LoopbackTransport::new()))
    }

    #[test]
    fn client_hello_round_trips_session_id() {
        let mut client = conn(Mode::Client);
        client.session_id = vec![1, 2, 3];
        client_hello_send(&mut client).unwrap();
        let body = client.io.as_slice().to_vec();

        let mut server = conn(Mode::Server);
        server.io.write(&body);
        client_hello_recv(&mut server).unwrap();
        assert_eq!(server.session_id, vec![1, 2, 3]);
    }

    #[test]
    fn finished_verify_data_matches_transcript_digest() {
        use crate::handshake::transcript::{RequiredHashes, Transcript};
        let mut c = conn(Mode::Client);
        c.transcript = Transcript::new(RequiredHashes::TLS12_SHA256);
        c.transcript.update(b"transcript-so-far");
        client_finished_send(&mut c).unwrap();
        assert_eq!(c.io.as_slice(), c.transcript.sha256_digest().unwrap().as_slice());
    }
}
