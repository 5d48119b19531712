//! tls-handshake-io
//! https://github.com/grahamking/ort
//!
//! MIT License
//! Copyright (c) 2025 Graham King
//!
//! `hsio`: a tiny loopback demo. Drives a client and a server
//! `Connection` against each other over an in-memory transport through a
//! full handshake, then prints the negotiated handshake type and the
//! resulting transcript digest — useful for eyeballing that the driver
//! actually reaches `APPLICATION_DATA` with matching transcripts
//! (testable property 5, `spec.md` §8), without a real socket or peer.

use std::collections::VecDeque;
use std::process::ExitCode;

use tls_handshake_io::config::Config;
use tls_handshake_io::handshake::record::LoopbackTransport;
use tls_handshake_io::handshake::transcript::RequiredHashes;
use tls_handshake_io::handshake::types::Mode;
use tls_handshake_io::{negotiate, Blocked, Connection, MessageKind};

const DEBUG_LOG: bool = false;

fn debug_print(msg: &str) {
    if DEBUG_LOG {
        eprintln!("{msg}");
    }
}

fn pump(client: &mut Connection, server: &mut Connection) -> tls_handshake_io::HsResult<()> {
    let mut client_to_server: VecDeque<u8> = VecDeque::new();
    let mut server_to_client: VecDeque<u8> = VecDeque::new();

    for _ in 0..10_000 {
        if let Some(t) = client.loopback_mut() {
            client_to_server.extend(t.drain_outbox());
        }
        if let Some(t) = server.loopback_mut() {
            server_to_client.extend(t.drain_outbox());
        }
        if let Some(t) = server.loopback_mut() {
            let bytes: Vec<u8> = client_to_server.drain(..).collect();
            t.feed(&bytes);
        }
        if let Some(t) = client.loopback_mut() {
            let bytes: Vec<u8> = server_to_client.drain(..).collect();
            t.feed(&bytes);
        }

        let client_blocked = negotiate(client)?;
        let server_blocked = negotiate(server)?;
        debug_print(&format!(
            "client at {} ({:?}), server at {} ({:?})",
            client.last_message_name(),
            client_blocked,
            server.last_message_name(),
            server_blocked,
        ));

        if client_blocked == Blocked::NotBlocked && server_blocked == Blocked::NotBlocked {
            return Ok(());
        }
    }

    Err(tls_handshake_io::bad_message("loopback handshake did not converge"))
}

fn run() -> tls_handshake_io::HsResult<()> {
    let config = Config::default();

    let mut client = Connection::new(Mode::Client, config.clone(), Box::new(LoopbackTransport::new()));
    let mut server = Connection::new(Mode::Server, config, Box::new(LoopbackTransport::new()));

    client.negotiation_inputs.perfect_forward_secrecy = true;
    server.negotiation_inputs.perfect_forward_secrecy = true;
    client.negotiation_inputs.required_hashes = RequiredHashes::TLS12_SHA256;
    server.negotiation_inputs.required_hashes = RequiredHashes::TLS12_SHA256;
    client.set_handshake_type()?;
    server.set_handshake_type()?;

    pump(&mut client, &mut server)?;

    println!("client handshake type: {}", client.handshake_type_name());
    println!("server handshake type: {}", server.handshake_type_name());
    println!(
        "both sides at: {:?}",
        (client.current_message()?, server.current_message()?)
    );
    assert_eq!(client.current_message()?, MessageKind::ApplicationData);

    match (client.transcript.sha256_digest(), server.transcript.sha256_digest()) {
        (Some(c), Some(s)) => {
            println!("client transcript sha256: {}", hex(&c));
            println!("server transcript sha256: {}", hex(&s));
            println!("transcripts match: {}", c == s);
        }
        _ => println!("no SHA-256 transcript required for this cipher suite"),
    }

    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}
