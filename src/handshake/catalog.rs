//! tls-handshake-io
//! https://github.com/grahamking/ort
//!
//! MIT License
//! Copyright (c) 2025 Graham King
//!
//! C1: the message catalog. Static per-kind metadata, grounded on
//! `state_machine[]` in the original handshake driver this was distilled
//! from: record type, wire-format type byte, which side writes the
//! message, and the (server, client) handler pair.

use super::connection::Connection;
use super::messages;
use super::types::{MessageKind, RecordType, Writer};
use crate::error::HsResult;

pub type HandlerFn = fn(&mut Connection) -> HsResult<()>;

/// Immutable per-kind descriptor (`spec.md` §3).
pub struct Descriptor {
    pub record_type: RecordType,
    /// 8-bit TLS handshake type byte. Unused when `record_type != Handshake`.
    pub wire_type: u8,
    pub writer: Writer,
    /// Indexed by `Mode::handler_index()`: `[server, client]`.
    pub handlers: [Option<HandlerFn>; 2],
}

macro_rules! descriptor {
    ($record_type:expr, $wire_type:expr, $writer:expr, $server:expr, $client:expr) => {
        Descriptor {
            record_type: $record_type,
            wire_type: $wire_type,
            writer: $writer,
            handlers: [Some($server), Some($client)],
        }
    };
}

/// O(1) lookup: given a message kind, its descriptor.
pub fn descriptor(kind: MessageKind) -> &'static Descriptor {
    use MessageKind::*;
    use RecordType::*;
    use Writer::*;

    match kind {
        ClientHello => {
            const D: Descriptor = descriptor!(
                Handshake,
                1,
                Client,
                messages::client_hello_recv,
                messages::client_hello_send
            );
            &D
        }
        ServerHello => {
            const D: Descriptor = descriptor!(
                Handshake,
                2,
                Server,
                messages::server_hello_send,
                messages::server_hello_recv
            );
            &D
        }
        ServerNewSessionTicket => {
            const D: Descriptor = descriptor!(
                Handshake,
                4,
                Server,
                messages::server_nst_send,
                messages::server_nst_recv
            );
            &D
        }
        ServerCert => {
            const D: Descriptor = descriptor!(
                Handshake,
                11,
                Server,
                messages::server_cert_send,
                messages::server_cert_recv
            );
            &D
        }
        ServerCertStatus => {
            const D: Descriptor = descriptor!(
                Handshake,
                22,
                Server,
                messages::server_status_send,
                messages::server_status_recv
            );
            &D
        }
        ServerKey => {
            const D: Descriptor = descriptor!(
                Handshake,
                12,
                Server,
                messages::server_key_send,
                messages::server_key_recv
            );
            &D
        }
        ServerCertReq => {
            const D: Descriptor = descriptor!(
                Handshake,
                13,
                Server,
                messages::cert_req_send,
                messages::cert_req_recv
            );
            &D
        }
        ServerHelloDone => {
            const D: Descriptor = descriptor!(
                Handshake,
                14,
                Server,
                messages::server_done_send,
                messages::server_done_recv
            );
            &D
        }
        ClientCert => {
            const D: Descriptor = descriptor!(
                Handshake,
                11,
                Client,
                messages::client_cert_recv,
                messages::client_cert_send
            );
            &D
        }
        ClientKey => {
            const D: Descriptor = descriptor!(
                Handshake,
                16,
                Client,
                messages::client_key_recv,
                messages::client_key_send
            );
            &D
        }
        ClientCertVerify => {
            const D: Descriptor = descriptor!(
                Handshake,
                15,
                Client,
                messages::client_cert_verify_recv,
                messages::client_cert_verify_send
            );
            &D
        }
        ClientChangeCipherSpec => {
            const D: Descriptor = descriptor!(
                ChangeCipherSpec,
                0,
                Client,
                messages::client_ccs_recv,
                messages::ccs_send
            );
            &D
        }
        ClientFinished => {
            const D: Descriptor = descriptor!(
                Handshake,
                20,
                Client,
                messages::client_finished_recv,
                messages::client_finished_send
            );
            &D
        }
        ServerChangeCipherSpec => {
            const D: Descriptor = descriptor!(
                ChangeCipherSpec,
                0,
                Server,
                messages::ccs_send,
                messages::server_ccs_recv
            );
            &D
        }
        ServerFinished => {
            const D: Descriptor = descriptor!(
                Handshake,
                20,
                Server,
                messages::server_finished_send,
                messages::server_finished_recv
            );
            &D
        }
        ApplicationData => {
            const D: Descriptor = Descriptor {
                record_type: ApplicationData,
                wire_type: 0,
                writer: Both,
                handlers: [None, None],
            };
            &D
        }
    }
}
