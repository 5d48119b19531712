//! tls-handshake-io
//! https://github.com/grahamking/ort
//!
//! MIT License
//! Copyright (c) 2025 Graham King

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Which endpoint this connection is acting as. Also used as the array
/// index into `Descriptor::handlers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Server,
    Client,
}

impl Mode {
    pub fn handler_index(self) -> usize {
        match self {
            Mode::Server => 0,
            Mode::Client => 1,
        }
    }
}

/// Which side writes a given message; `Both` marks the terminal
/// application-data slot that ends the handshake for either endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Writer {
    Server,
    Client,
    Both,
}

impl Writer {
    pub fn matches(self, mode: Mode) -> bool {
        matches!(
            (self, mode),
            (Writer::Server, Mode::Server) | (Writer::Client, Mode::Client)
        )
    }
}

/// TLS record-layer content type as relevant to the handshake driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    ChangeCipherSpec,
    Handshake,
    ApplicationData,
}

/// One handshake message role in a sequence (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    ClientHello,
    ServerHello,
    ServerNewSessionTicket,
    ServerCert,
    ServerCertStatus,
    ServerKey,
    ServerCertReq,
    ServerHelloDone,
    ClientCert,
    ClientKey,
    ClientCertVerify,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
}

impl MessageKind {
    /// Human name, as surfaced by `last_message_name`.
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::ClientHello => "CLIENT_HELLO",
            MessageKind::ServerHello => "SERVER_HELLO",
            MessageKind::ServerNewSessionTicket => "SERVER_NEW_SESSION_TICKET",
            MessageKind::ServerCert => "SERVER_CERT",
            MessageKind::ServerCertStatus => "SERVER_CERT_STATUS",
            MessageKind::ServerKey => "SERVER_KEY",
            MessageKind::ServerCertReq => "SERVER_CERT_REQ",
            MessageKind::ServerHelloDone => "SERVER_HELLO_DONE",
            MessageKind::ClientCert => "CLIENT_CERT",
            MessageKind::ClientKey => "CLIENT_KEY",
            MessageKind::ClientCertVerify => "CLIENT_CERT_VERIFY",
            MessageKind::ClientChangeCipherSpec => "CLIENT_CHANGE_CIPHER_SPEC",
            MessageKind::ClientFinished => "CLIENT_FINISHED",
            MessageKind::ServerChangeCipherSpec => "SERVER_CHANGE_CIPHER_SPEC",
            MessageKind::ServerFinished => "SERVER_FINISHED",
            MessageKind::ApplicationData => "APPLICATION_DATA",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The handshake-type bitset (`spec.md` §3). Each flag keeps the bit
/// position of the original `handshakes[128][...]` table so that
/// `handshake_type_name`'s pipe-joined ordering matches the source this
/// was distilled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandshakeType(pub u8);

impl HandshakeType {
    pub const INITIAL: HandshakeType = HandshakeType(0);
    pub const NEGOTIATED: HandshakeType = HandshakeType(1 << 0);
    pub const FULL_HANDSHAKE: HandshakeType = HandshakeType(1 << 1);
    pub const PERFECT_FORWARD_SECRECY: HandshakeType = HandshakeType(1 << 2);
    pub const OCSP_STATUS: HandshakeType = HandshakeType(1 << 3);
    pub const CLIENT_AUTH: HandshakeType = HandshakeType(1 << 4);
    pub const WITH_SESSION_TICKET: HandshakeType = HandshakeType(1 << 5);
    pub const NO_CLIENT_CERT: HandshakeType = HandshakeType(1 << 6);

    const NAMES: [(HandshakeType, &'static str); 7] = [
        (HandshakeType::NEGOTIATED, "NEGOTIATED"),
        (HandshakeType::FULL_HANDSHAKE, "FULL_HANDSHAKE"),
        (HandshakeType::PERFECT_FORWARD_SECRECY, "PERFECT_FORWARD_SECRECY"),
        (HandshakeType::OCSP_STATUS, "OCSP_STATUS"),
        (HandshakeType::CLIENT_AUTH, "CLIENT_AUTH"),
        (HandshakeType::WITH_SESSION_TICKET, "WITH_SESSION_TICKET"),
        (HandshakeType::NO_CLIENT_CERT, "NO_CLIENT_CERT"),
    ];

    pub fn contains(self, flag: HandshakeType) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn insert(&mut self, flag: HandshakeType) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: HandshakeType) {
        self.0 &= !flag.0;
    }

    /// Pipe-joined names of set flags, `"INITIAL"` when zero. Pure
    /// function of the bitset — recomputed on every call rather than
    /// memoized in a shared buffer (see Design Notes).
    pub fn name(self) -> String {
        if self == HandshakeType::INITIAL {
            return "INITIAL".to_string();
        }
        Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl BitOr for HandshakeType {
    type Output = HandshakeType;
    fn bitor(self, rhs: HandshakeType) -> HandshakeType {
        HandshakeType(self.0 | rhs.0)
    }
}

impl BitOrAssign for HandshakeType {
    fn bitor_assign(&mut self, rhs: HandshakeType) {
        self.0 |= rhs.0;
    }
}

/// Out-parameter mirroring `s2n_blocked_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocked {
    NotBlocked,
    OnRead,
    OnWrite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_name_is_initial() {
        assert_eq!(HandshakeType::INITIAL.name(), "INITIAL");
    }

    #[test]
    fn name_is_pure_and_ordered() {
        let ht = HandshakeType::NEGOTIATED
            | HandshakeType::FULL_HANDSHAKE
            | HandshakeType::PERFECT_FORWARD_SECRECY;
        assert_eq!(ht.name(), "NEGOTIATED|FULL_HANDSHAKE|PERFECT_FORWARD_SECRECY");
        assert_eq!(ht.name(), ht.name());
    }

    #[test]
    fn contains_checks_all_bits_of_flag() {
        let ht = HandshakeType::NEGOTIATED | HandshakeType::CLIENT_AUTH;
        assert!(ht.contains(HandshakeType::NEGOTIATED));
        assert!(ht.contains(HandshakeType::CLIENT_AUTH));
        assert!(!ht.contains(HandshakeType::FULL_HANDSHAKE));
    }
}
