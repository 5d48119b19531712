//! tls-handshake-io
//! https://github.com/grahamking/ort
//!
//! MIT License
//! Copyright (c) 2025 Graham King
//!
//! C2: the handshake-variant table. Maps a `HandshakeType` bitset to the
//! ordered sequence of `MessageKind`s for that variant. Transcribed
//! verbatim (message-for-message) from the `handshakes[128][16]` array in
//! the original driver this crate was distilled from, not re-derived from
//! the ordering prose in `spec.md` §4.2 — the literal table is the source
//! of truth for the 26 reachable non-initial combinations plus `INITIAL`.

use super::types::{HandshakeType, MessageKind};

use MessageKind::*;

/// `handshakes[INITIAL]` — before `set_handshake_type` has run.
const INITIAL_SEQ: &[MessageKind] = &[ClientHello, ServerHello];

const NEGOTIATED: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerChangeCipherSpec,
    ServerFinished,
    ClientChangeCipherSpec,
    ClientFinished,
    ApplicationData,
];

const NEGOTIATED_TICKET: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerNewSessionTicket,
    ServerChangeCipherSpec,
    ServerFinished,
    ClientChangeCipherSpec,
    ClientFinished,
    ApplicationData,
];

const FULL: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerHelloDone,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_TICKET: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerHelloDone,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerNewSessionTicket,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_PFS: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerKey,
    ServerHelloDone,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_PFS_TICKET: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerKey,
    ServerHelloDone,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerNewSessionTicket,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_OCSP: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerCertStatus,
    ServerHelloDone,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_OCSP_TICKET: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerCertStatus,
    ServerHelloDone,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerNewSessionTicket,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_PFS_OCSP: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerCertStatus,
    ServerKey,
    ServerHelloDone,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_PFS_OCSP_TICKET: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerCertStatus,
    ServerKey,
    ServerHelloDone,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerNewSessionTicket,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_CA: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
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
];

const FULL_CA_NOCERT: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerCertReq,
    ServerHelloDone,
    ClientCert,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_CA_TICKET: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerCertReq,
    ServerHelloDone,
    ClientCert,
    ClientKey,
    ClientCertVerify,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerNewSessionTicket,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_CA_NOCERT_TICKET: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerCertReq,
    ServerHelloDone,
    ClientCert,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerNewSessionTicket,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_PFS_CA: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
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
];

const FULL_PFS_CA_NOCERT: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerKey,
    ServerCertReq,
    ServerHelloDone,
    ClientCert,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_PFS_CA_TICKET: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerKey,
    ServerCertReq,
    ServerHelloDone,
    ClientCert,
    ClientKey,
    ClientCertVerify,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerNewSessionTicket,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_PFS_CA_NOCERT_TICKET: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerKey,
    ServerCertReq,
    ServerHelloDone,
    ClientCert,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerNewSessionTicket,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_OCSP_CA: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerCertStatus,
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
];

const FULL_OCSP_CA_NOCERT: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerCertStatus,
    ServerCertReq,
    ServerHelloDone,
    ClientCert,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_OCSP_CA_TICKET: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerCertStatus,
    ServerCertReq,
    ServerHelloDone,
    ClientCert,
    ClientKey,
    ClientCertVerify,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerNewSessionTicket,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_OCSP_CA_NOCERT_TICKET: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerCertStatus,
    ServerCertReq,
    ServerHelloDone,
    ClientCert,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerNewSessionTicket,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_PFS_OCSP_CA: &[MessageKind] = &[
    ClientHello,
    ServerHello,
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
];

const FULL_PFS_OCSP_CA_NOCERT: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerCertStatus,
    ServerKey,
    ServerCertReq,
    ServerHelloDone,
    ClientCert,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_PFS_OCSP_CA_TICKET: &[MessageKind] = &[
    ClientHello,
    ServerHello,
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
    ServerNewSessionTicket,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

const FULL_PFS_OCSP_CA_NOCERT_TICKET: &[MessageKind] = &[
    ClientHello,
    ServerHello,
    ServerCert,
    ServerCertStatus,
    ServerKey,
    ServerCertReq,
    ServerHelloDone,
    ClientCert,
    ClientKey,
    ClientChangeCipherSpec,
    ClientFinished,
    ServerNewSessionTicket,
    ServerChangeCipherSpec,
    ServerFinished,
    ApplicationData,
];

macro_rules! ht {
    ($($flag:ident)|+) => {
        HandshakeType(0 $(| HandshakeType::$flag.0)+)
    };
}

/// Every reachable `(bitset, sequence)` pair, including `INITIAL`. Order
/// matches the original `handshakes[128]` array (INITIAL is handled
/// specially there; we list it first here).
const TABLE: &[(HandshakeType, &[MessageKind])] = &[
    (HandshakeType::INITIAL, INITIAL_SEQ),
    (ht!(NEGOTIATED), NEGOTIATED),
    (ht!(NEGOTIATED | WITH_SESSION_TICKET), NEGOTIATED_TICKET),
    (ht!(NEGOTIATED | FULL_HANDSHAKE), FULL),
    (
        ht!(NEGOTIATED | FULL_HANDSHAKE | WITH_SESSION_TICKET),
        FULL_TICKET,
    ),
    (
        ht!(NEGOTIATED | FULL_HANDSHAKE | PERFECT_FORWARD_SECRECY),
        FULL_PFS,
    ),
    (
        ht!(
            NEGOTIATED
                | FULL_HANDSHAKE
                | PERFECT_FORWARD_SECRECY
                | WITH_SESSION_TICKET
        ),
        FULL_PFS_TICKET,
    ),
    (
        ht!(NEGOTIATED | FULL_HANDSHAKE | OCSP_STATUS),
        FULL_OCSP,
    ),
    (
        ht!(NEGOTIATED | FULL_HANDSHAKE | OCSP_STATUS | WITH_SESSION_TICKET),
        FULL_OCSP_TICKET,
    ),
    (
        ht!(NEGOTIATED | FULL_HANDSHAKE | PERFECT_FORWARD_SECRECY | OCSP_STATUS),
        FULL_PFS_OCSP,
    ),
    (
        ht!(
            NEGOTIATED
                | FULL_HANDSHAKE
                | PERFECT_FORWARD_SECRECY
                | OCSP_STATUS
                | WITH_SESSION_TICKET
        ),
        FULL_PFS_OCSP_TICKET,
    ),
    (
        ht!(NEGOTIATED | FULL_HANDSHAKE | CLIENT_AUTH),
        FULL_CA,
    ),
    (
        ht!(NEGOTIATED | FULL_HANDSHAKE | CLIENT_AUTH | NO_CLIENT_CERT),
        FULL_CA_NOCERT,
    ),
    (
        ht!(NEGOTIATED | FULL_HANDSHAKE | CLIENT_AUTH | WITH_SESSION_TICKET),
        FULL_CA_TICKET,
    ),
    (
        ht!(
            NEGOTIATED
                | FULL_HANDSHAKE
                | CLIENT_AUTH
                | NO_CLIENT_CERT
                | WITH_SESSION_TICKET
        ),
        FULL_CA_NOCERT_TICKET,
    ),
    (
        ht!(NEGOTIATED | FULL_HANDSHAKE | PERFECT_FORWARD_SECRECY | CLIENT_AUTH),
        FULL_PFS_CA,
    ),
    (
        ht!(
            NEGOTIATED
                | FULL_HANDSHAKE
                | PERFECT_FORWARD_SECRECY
                | CLIENT_AUTH
                | NO_CLIENT_CERT
        ),
        FULL_PFS_CA_NOCERT,
    ),
    (
        ht!(
            NEGOTIATED
                | FULL_HANDSHAKE
                | PERFECT_FORWARD_SECRECY
                | CLIENT_AUTH
                | WITH_SESSION_TICKET
        ),
        FULL_PFS_CA_TICKET,
    ),
    (
        ht!(
            NEGOTIATED
                | FULL_HANDSHAKE
                | PERFECT_FORWARD_SECRECY
                | CLIENT_AUTH
                | NO_CLIENT_CERT
                | WITH_SESSION_TICKET
        ),
        FULL_PFS_CA_NOCERT_TICKET,
    ),
    (
        ht!(NEGOTIATED | FULL_HANDSHAKE | OCSP_STATUS | CLIENT_AUTH),
        FULL_OCSP_CA,
    ),
    (
        ht!(
            NEGOTIATED | FULL_HANDSHAKE | OCSP_STATUS | CLIENT_AUTH | NO_CLIENT_CERT
        ),
        FULL_OCSP_CA_NOCERT,
    ),
    (
        ht!(
            NEGOTIATED | FULL_HANDSHAKE | OCSP_STATUS | CLIENT_AUTH | WITH_SESSION_TICKET
        ),
        FULL_OCSP_CA_TICKET,
    ),
    (
        ht!(
            NEGOTIATED
                | FULL_HANDSHAKE
                | OCSP_STATUS
                | CLIENT_AUTH
                | NO_CLIENT_CERT
                | WITH_SESSION_TICKET
        ),
        FULL_OCSP_CA_NOCERT_TICKET,
    ),
    (
        ht!(
            NEGOTIATED
                | FULL_HANDSHAKE
                | PERFECT_FORWARD_SECRECY
                | OCSP_STATUS
                | CLIENT_AUTH
        ),
        FULL_PFS_OCSP_CA,
    ),
    (
        ht!(
            NEGOTIATED
                | FULL_HANDSHAKE
                | PERFECT_FORWARD_SECRECY
                | OCSP_STATUS
                | CLIENT_AUTH
                | NO_CLIENT_CERT
        ),
        FULL_PFS_OCSP_CA_NOCERT,
    ),
    (
        ht!(
            NEGOTIATED
                | FULL_HANDSHAKE
                | PERFECT_FORWARD_SECRECY
                | OCSP_STATUS
                | CLIENT_AUTH
                | WITH_SESSION_TICKET
        ),
        FULL_PFS_OCSP_CA_TICKET,
    ),
    (
        ht!(
            NEGOTIATED
                | FULL_HANDSHAKE
                | PERFECT_FORWARD_SECRECY
                | OCSP_STATUS
                | CLIENT_AUTH
                | NO_CLIENT_CERT
                | WITH_SESSION_TICKET
        ),
        FULL_PFS_OCSP_CA_NOCERT_TICKET,
    ),
];

/// All reachable bitsets, `INITIAL` included. Used by tests to walk every
/// sequence (testable property #1, #2).
pub static ALL_REACHABLE: &[HandshakeType] = &[
    HandshakeType::INITIAL,
    ht!(NEGOTIATED),
    ht!(NEGOTIATED | WITH_SESSION_TICKET),
    ht!(NEGOTIATED | FULL_HANDSHAKE),
    ht!(NEGOTIATED | FULL_HANDSHAKE | WITH_SESSION_TICKET),
    ht!(NEGOTIATED | FULL_HANDSHAKE | PERFECT_FORWARD_SECRECY),
    ht!(NEGOTIATED | FULL_HANDSHAKE | PERFECT_FORWARD_SECRECY | WITH_SESSION_TICKET),
    ht!(NEGOTIATED | FULL_HANDSHAKE | OCSP_STATUS),
    ht!(NEGOTIATED | FULL_HANDSHAKE | OCSP_STATUS | WITH_SESSION_TICKET),
    ht!(NEGOTIATED | FULL_HANDSHAKE | PERFECT_FORWARD_SECRECY | OCSP_STATUS),
    ht!(
        NEGOTIATED
            | FULL_HANDSHAKE
            | PERFECT_FORWARD_SECRECY
            | OCSP_STATUS
            | WITH_SESSION_TICKET
    ),
    ht!(NEGOTIATED | FULL_HANDSHAKE | CLIENT_AUTH),
    ht!(NEGOTIATED | FULL_HANDSHAKE | CLIENT_AUTH | NO_CLIENT_CERT),
    ht!(NEGOTIATED | FULL_HANDSHAKE | CLIENT_AUTH | WITH_SESSION_TICKET),
    ht!(
        NEGOTIATED | FULL_HANDSHAKE | CLIENT_AUTH | NO_CLIENT_CERT | WITH_SESSION_TICKET
    ),
    ht!(NEGOTIATED | FULL_HANDSHAKE | PERFECT_FORWARD_SECRECY | CLIENT_AUTH),
    ht!(
        NEGOTIATED
            | FULL_HANDSHAKE
            | PERFECT_FORWARD_SECRECY
            | CLIENT_AUTH
            | NO_CLIENT_CERT
    ),
    ht!(
        NEGOTIATED
            | FULL_HANDSHAKE
            | PERFECT_FORWARD_SECRECY
            | CLIENT_AUTH
            | WITH_SESSION_TICKET
    ),
    ht!(
        NEGOTIATED
            | FULL_HANDSHAKE
            | PERFECT_FORWARD_SECRECY
            | CLIENT_AUTH
            | NO_CLIENT_CERT
            | WITH_SESSION_TICKET
    ),
    ht!(NEGOTIATED | FULL_HANDSHAKE | OCSP_STATUS | CLIENT_AUTH),
    ht!(NEGOTIATED | FULL_HANDSHAKE | OCSP_STATUS | CLIENT_AUTH | NO_CLIENT_CERT),
    ht!(
        NEGOTIATED | FULL_HANDSHAKE | OCSP_STATUS | CLIENT_AUTH | WITH_SESSION_TICKET
    ),
    ht!(
        NEGOTIATED
            | FULL_HANDSHAKE
            | OCSP_STATUS
            | CLIENT_AUTH
            | NO_CLIENT_CERT
            | WITH_SESSION_TICKET
    ),
    ht!(
        NEGOTIATED | FULL_HANDSHAKE | PERFECT_FORWARD_SECRECY | OCSP_STATUS | CLIENT_AUTH
    ),
    ht!(
        NEGOTIATED
            | FULL_HANDSHAKE
            | PERFECT_FORWARD_SECRECY
            | OCSP_STATUS
            | CLIENT_AUTH
            | NO_CLIENT_CERT
    ),
    ht!(
        NEGOTIATED
            | FULL_HANDSHAKE
            | PERFECT_FORWARD_SECRECY
            | OCSP_STATUS
            | CLIENT_AUTH
            | WITH_SESSION_TICKET
    ),
    ht!(
        NEGOTIATED
            | FULL_HANDSHAKE
            | PERFECT_FORWARD_SECRECY
            | OCSP_STATUS
            | CLIENT_AUTH
            | NO_CLIENT_CERT
            | WITH_SESSION_TICKET
    ),
];

/// `sequence_of(handshake_type) -> ordered sequence of message kinds`.
/// Returns `None` for an unreachable bitset (`spec.md` §3: "illegal
/// combinations are absent").
pub fn sequence_of(handshake_type: HandshakeType) -> Option<&'static [MessageKind]> {
    TABLE
        .iter()
        .find(|(ht, _)| *ht == handshake_type)
        .map(|(_, seq)| *seq)
}

/// Iterator over every reachable bitset, for exhaustive tests.
pub fn reachable() -> impl Iterator<Item = HandshakeType> {
    TABLE.iter().map(|(ht, _)| *ht)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_reachable_sequence_is_nonempty_and_ends_in_application_data() {
        for ht in reachable() {
            let seq = sequence_of(ht).unwrap();
            assert!(!seq.is_empty());
            if ht != HandshakeType::INITIAL {
                assert_eq!(*seq.last().unwrap(), MessageKind::ApplicationData);
            }
        }
    }

    #[test]
    fn table_has_26_reachable_non_initial_entries_plus_initial() {
        // Transcribed 1:1 from the original `handshakes[128]` array: 26
        // full/abbreviated combinations, not the ~28 spec.md's prose
        // estimates (see DESIGN.md).
        assert_eq!(TABLE.len(), 27);
    }

    #[test]
    fn initial_sequence_is_client_hello_then_server_hello_only() {
        let seq = sequence_of(HandshakeType::INITIAL).unwrap();
        assert_eq!(seq, &[MessageKind::ClientHello, MessageKind::ServerHello]);
    }

    #[test]
    fn unreachable_bitset_is_absent() {
        // NO_CLIENT_CERT without CLIENT_AUTH is not a legal combination.
        let bogus = ht!(NEGOTIATED | FULL_HANDSHAKE | NO_CLIENT_CERT);
        assert!(sequence_of(bogus).is_none());
    }

    #[test]
    fn resumption_with_ticket_inserts_nst_between_hello_and_ccs() {
        let seq = sequence_of(ht!(NEGOTIATED | WITH_SESSION_TICKET)).unwrap();
        assert_eq!(
            seq,
            &[
                MessageKind::ClientHello,
                MessageKind::ServerHello,
                MessageKind::ServerNewSessionTicket,
                MessageKind::ServerChangeCipherSpec,
                MessageKind::ServerFinished,
                MessageKind::ClientChangeCipherSpec,
                MessageKind::ClientFinished,
                MessageKind::ApplicationData,
            ]
        );
    }
}
