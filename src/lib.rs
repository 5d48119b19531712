//! tls-handshake-io
//! https://github.com/grahamking/ort
//!
//! MIT License
//! Copyright (c) 2025 Graham King
//!
//! The handshake I/O driver of a TLS 1.0-1.2 implementation: the
//! subsystem that sequences, emits and consumes handshake messages for
//! both client and server endpoints until application data may flow.
//! Per-message parsing, record encryption, key exchange, certificate
//! validation and session storage are narrow collaborator interfaces,
//! not implemented here (`spec.md` §1).

pub mod config;
pub mod error;
pub mod handshake;
pub mod stuffer;

pub use error::{bad_message, hs_err, hs_error, Context, HsError, HsErrorKind, HsResult};
pub use handshake::{negotiate, Blocked, Connection, HandshakeType, MessageKind, Mode};
