//! tls-handshake-io
//! https://github.com/grahamking/ort
//!
//! MIT License
//! Copyright (c) 2025 Graham King
//!
//! The `Connection`: everything C3's progression engine needs to know
//! where a handshake is and where it's going next. Grounded on the
//! relevant fields of `struct s2n_connection` in the original driver
//! (`mode`, `handshake.handshake_type`, `handshake.message_number`,
//! `handshake.io`, session-ticket/client-cert-request flags) plus the
//! teacher's pattern of a single struct owning its I/O buffers and
//! config (`core/src/net/tls.rs`'s connection state).

use ring::rand::{SecureRandom, SystemRandom};

use crate::config::Config;
use crate::error::{bad_message, hs_err, hs_error, HsErrorKind, HsResult};
use crate::stuffer::Stuffer;

use super::catalog::{self, Descriptor};
use super::record::{RecordReader, RecordWriter, Transport};
use super::transcript::{RequiredHashes, Transcript};
use super::types::{HandshakeType, MessageKind, Mode};
use super::variant_table;

/// TLS 1.2 legacy record-layer version (RFC 5246). The driver does not
/// negotiate the record-layer version field itself (Non-goal, `spec.md`
/// §2); it stamps every record it writes with this fixed value.
pub const LEGACY_RECORD_VERSION: (u8, u8) = (3, 3);

/// What this connection learned during negotiation that determines which
/// handshake variant it is running (`spec.md` §4.3 C3, the `set_handshake_type`
/// step). Each field is set at most once, the moment the corresponding
/// message is parsed, and never retracted afterward — mirroring the
/// monotonic bitset it feeds (Design Notes §9).
#[derive(Debug, Clone, Copy, Default)]
pub struct NegotiationInputs {
    pub resuming_session: bool,
    pub perfect_forward_secrecy: bool,
    pub ocsp_status_requested: bool,
    pub client_auth_requested: bool,
    pub client_cert_present: bool,
    pub session_ticket_requested: bool,
    pub required_hashes: RequiredHashes,
}

/// One handshake in progress. Owns the scratch buffer the current message
/// is assembled into or parsed out of (`io`), the most recently read
/// record's payload (`record_in`), the running transcript hashes, and the
/// bitset + cursor the progression engine walks (`spec.md` §3).
pub struct Connection {
    pub mode: Mode,
    pub config: Config,
    handshake_type: HandshakeType,
    message_number: usize,
    pub io: Stuffer,
    pub record_in: Stuffer,
    pub record_reader: RecordReader,
    pub record_writer: RecordWriter,
    pub transcript: Transcript,
    pub transport: Box<dyn Transport>,
    pub negotiation_inputs: NegotiationInputs,
    user_precorked: bool,
    corked: bool,
    killed: bool,
    /// Set the first time `set_handshake_type` runs, so that later calls
    /// (the server re-derives the bitset once more from `ServerHello`)
    /// update `handshake_type` without tearing down a transcript that
    /// already has bytes folded into it.
    transcript_fixed: bool,
    pub session_id: Vec<u8>,
    /// Which wire record type `record_in`'s unconsumed bytes belong to,
    /// while the read path is still walking a record that coalesces more
    /// than one handshake message (`spec.md` §4.5 step 4). `None` when
    /// `record_in` is empty and the next read should poll a fresh record.
    pub(super) current_record_kind: Option<super::record::WireRecordType>,
}

/// Length, in bytes, of a freshly generated session ID (`spec.md` §4.3:
/// "generate a fresh session ID (servers only)" on a full handshake).
const SESSION_ID_LEN: usize = 32;

/// Mint a fresh random session ID (`spec.md` §4.3, full-handshake branch,
/// servers only). Uses `ring`'s system RNG rather than hand-rolling one —
/// the one piece of this driver that is genuinely security-sensitive
/// randomness, as opposed to the opaque placeholder bytes the per-message
/// handlers in `messages.rs` write for content this crate does not parse.
fn generate_session_id() -> HsResult<Vec<u8>> {
    let rng = SystemRandom::new();
    let mut id = vec![0u8; SESSION_ID_LEN];
    rng.fill(&mut id)
        .map_err(|_| hs_error(HsErrorKind::Collaborator, "failed to generate a fresh session id"))?;
    Ok(id)
}

impl Connection {
    pub fn new(mode: Mode, config: Config, transport: Box<dyn Transport>) -> Self {
        Connection {
            mode,
            config,
            handshake_type: HandshakeType::INITIAL,
            message_number: 0,
            io: Stuffer::new(),
            record_in: Stuffer::new(),
            record_reader: RecordReader::new(),
            record_writer: RecordWriter::new(),
            transcript: Transcript::new(RequiredHashes::default()),
            transport,
            negotiation_inputs: NegotiationInputs::default(),
            user_precorked: false,
            corked: false,
            killed: false,
            transcript_fixed: false,
            session_id: Vec::new(),
            current_record_kind: None,
        }
    }

    pub fn handshake_type(&self) -> HandshakeType {
        self.handshake_type
    }

    /// Pipe-joined flag names of the current bitset, or `"INITIAL"`
    /// (`spec.md` §4.1's `handshake_type_name`). Recomputed fresh each
    /// call — there is no shared mutable name buffer to invalidate.
    pub fn handshake_type_name(&self) -> String {
        self.handshake_type.name()
    }

    pub fn message_number(&self) -> usize {
        self.message_number
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    pub fn kill(&mut self) {
        self.killed = true;
    }

    /// The message this connection currently expects to send or receive.
    /// `None` once the sequence for the negotiated variant is exhausted
    /// (`spec.md` §4.3 edge case: negotiating past the end is an error
    /// the caller must not trigger, since `advance` stops short of it).
    pub fn current_message(&self) -> HsResult<MessageKind> {
        let sequence = variant_table::sequence_of(self.handshake_type)
            .ok_or_else(|| bad_message(format!("unreachable handshake type {}", self.handshake_type.name())))?;
        sequence
            .get(self.message_number)
            .copied()
            .ok_or_else(|| bad_message("handshake sequence exhausted"))
    }

    pub fn current_descriptor(&self) -> HsResult<&'static Descriptor> {
        Ok(catalog::descriptor(self.current_message()?))
    }

    /// Human name of the last message fully sent or received, for logging
    /// (`spec.md` §4.1). Returns `"NONE"` before the first message.
    pub fn last_message_name(&self) -> &'static str {
        if self.message_number == 0 {
            return "NONE";
        }
        let sequence = match variant_table::sequence_of(self.handshake_type) {
            Some(s) => s,
            None => return "NONE",
        };
        sequence
            .get(self.message_number - 1)
            .map(|k| k.name())
            .unwrap_or("NONE")
    }

    /// Commit negotiated facts to the handshake-type bitset. Mirrors
    /// `s2n_conn_set_handshake_type`, but follows `spec.md` §4.3's literal
    /// numbered steps rather than the original's early-return-on-failed-
    /// ticket-decrypt control flow, which is ambiguous standalone about
    /// whether a failed decrypt silently falls back to a full handshake
    /// or aborts the connection (documented as a resolved Open Question
    /// in DESIGN.md). Called at least once, right after `ClientHello` is
    /// fully parsed by either side, and again by the server once
    /// `ServerHello` is produced; only the first call fixes the
    /// transcript's required hashes; a bitset recomputed on a later call
    /// never discards bytes the transcript already absorbed.
    pub fn set_handshake_type(&mut self) -> HsResult<()> {
        let inputs = self.negotiation_inputs;
        let mut ht = HandshakeType::INITIAL;

        // 1. A session resumed from a ticket or cache is NEGOTIATED but
        //    not FULL_HANDSHAKE; anything else is a full handshake, which
        //    mints a fresh session ID on the server side.
        if inputs.resuming_session {
            ht.insert(HandshakeType::NEGOTIATED);
        } else {
            ht.insert(HandshakeType::NEGOTIATED);
            ht.insert(HandshakeType::FULL_HANDSHAKE);
            if matches!(self.mode, Mode::Server) {
                self.session_id = generate_session_id()?;
            }
        }

        // 2. Ephemeral key exchange was negotiated.
        if inputs.perfect_forward_secrecy {
            ht.insert(HandshakeType::PERFECT_FORWARD_SECRECY);
        }

        // 3. An OCSP status response will be stapled to the certificate.
        if inputs.ocsp_status_requested {
            ht.insert(HandshakeType::OCSP_STATUS);
        }

        // 4. Client authentication: requested implies CLIENT_AUTH; a
        //    request with no certificate in reply additionally sets
        //    NO_CLIENT_CERT (only meaningful alongside CLIENT_AUTH).
        if inputs.client_auth_requested {
            ht.insert(HandshakeType::CLIENT_AUTH);
            if !inputs.client_cert_present {
                ht.insert(HandshakeType::NO_CLIENT_CERT);
            }
        }

        if inputs.session_ticket_requested {
            ht.insert(HandshakeType::WITH_SESSION_TICKET);
        }

        if variant_table::sequence_of(ht).is_none() {
            return hs_err(
                HsErrorKind::BadMessage,
                format!("negotiated an unreachable handshake type {}", ht.name()),
            );
        }

        self.handshake_type = ht;
        if !self.transcript_fixed {
            self.transcript = Transcript::new(inputs.required_hashes);
            self.transcript_fixed = true;
        }
        Ok(())
    }

    /// Drop `CLIENT_AUTH` down to `CLIENT_AUTH|NO_CLIENT_CERT` when a
    /// requested client certificate never arrives (`spec.md` §4.3 edge
    /// case: optional client auth, no certificate offered). Only legal
    /// when this endpoint's auth mode is *optional*.
    pub fn downgrade_to_no_client_cert(&mut self) -> HsResult<()> {
        if self.config.client_auth_mode != crate::config::ClientAuthMode::Optional {
            return hs_err(
                HsErrorKind::BadMessage,
                "cannot downgrade to NO_CLIENT_CERT unless client auth is optional",
            );
        }
        self.handshake_type.insert(HandshakeType::NO_CLIENT_CERT);
        Ok(())
    }

    /// Set one flag of the handshake-type bitset mid-handshake. Used by
    /// the read path's state-machine repair (`spec.md` §4.5 step 4c) to
    /// switch variant sequences in place.
    pub(crate) fn set_handshake_type_flag(&mut self, flag: HandshakeType) {
        self.handshake_type.insert(flag);
    }

    /// Clear one flag of the handshake-type bitset mid-handshake (the
    /// OCSP opt-out repair, `spec.md` §4.5 step 4c).
    pub(crate) fn clear_handshake_type_flag(&mut self, flag: HandshakeType) {
        self.handshake_type.remove(flag);
    }

    /// Move past the current message. Mirrors `s2n_advance_message`:
    /// always hint the transport that the next read is latency-sensitive
    /// (`quickack`), then leave corking alone unless this connection both
    /// opted into managed corking (`config.corked_io`) and didn't start
    /// out corked by the caller (`precork`). A direction change corks
    /// when *this* side becomes the new writer and uncorks otherwise —
    /// including the terminal transition into `APPLICATION_DATA`, whose
    /// `Writer::Both` never matches either side (`spec.md` §4.4 C4).
    pub fn advance(&mut self) -> HsResult<()> {
        let descriptor = self.current_descriptor()?;
        let writer = descriptor.writer;

        self.io.wipe();
        self.message_number += 1;

        self.transport.quickack();

        if !self.config.corked_io || self.user_precorked {
            return Ok(());
        }

        let Ok(next_kind) = self.current_message() else {
            return Ok(());
        };
        let next_writer = catalog::descriptor(next_kind).writer;

        // Same side keeps talking: no direction change, nothing to do.
        if next_writer == writer {
            return Ok(());
        }

        if next_writer.matches(self.mode) {
            if !self.corked {
                self.transport.cork();
                self.corked = true;
            }
        } else if self.corked {
            self.transport.uncork();
            self.corked = false;
        }

        Ok(())
    }

    /// Release the scratch buffers' backing allocations once the
    /// handshake has reached `APPLICATION_DATA` (`spec.md` §3: "io
    /// resized to zero on completion"). Idempotent — safe to call on
    /// every `negotiate` iteration once the connection is done.
    pub fn release_buffers(&mut self) {
        self.io.shrink_to_fit();
        self.record_in.shrink_to_fit();
    }

    pub fn precork(&mut self) {
        self.user_precorked = true;
        self.transport.cork();
        self.corked = true;
    }

    /// Downcast this connection's transport back to a `LoopbackTransport`,
    /// for tests and the demo binary that drive both ends of a handshake
    /// in one process. `None` for any other transport.
    pub fn loopback_mut(&mut self) -> Option<&mut super::record::LoopbackTransport> {
        super::record::as_loopback_mut(self.transport.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::record::LoopbackTransport;

    fn conn(mode: Mode) -> Connection {
        Connection::new(mode, Config::default(), Box::new(LoopbackTransport::new()))
    }

    #[test]
    fn fresh_connection_starts_at_client_hello_with_initial_type() {
        let c = conn(Mode::Client);
        assert_eq!(c.handshake_type(), HandshakeType::INITIAL);
        assert_eq!(c.current_message().unwrap(), MessageKind::ClientHello);
        assert_eq!(c.last_message_name(), "NONE");
    }

    #[test]
    fn set_handshake_type_full_handshake_reaches_application_data() {
        let mut c = conn(Mode::Server);
        c.negotiation_inputs.resuming_session = false;
        c.set_handshake_type().unwrap();
        assert!(c.handshake_type().contains(HandshakeType::FULL_HANDSHAKE));
        let sequence = variant_table::sequence_of(c.handshake_type()).unwrap();
        assert_eq!(*sequence.last().unwrap(), MessageKind::ApplicationData);
    }

    #[test]
    fn set_handshake_type_resumption_skips_full_handshake_flag() {
        let mut c = conn(Mode::Client);
        c.negotiation_inputs.resuming_session = true;
        c.set_handshake_type().unwrap();
        assert!(!c.handshake_type().contains(HandshakeType::FULL_HANDSHAKE));
        assert!(c.handshake_type().contains(HandshakeType::NEGOTIATED));
    }

    #[test]
    fn advance_walks_through_the_negotiated_sequence() {
        let mut c = conn(Mode::Client);
        c.set_handshake_type().unwrap();
        let first = c.current_message().unwrap();
        c.advance().unwrap();
        let second = c.current_message().unwrap();
        assert_ne!(first, second);
        assert_eq!(c.last_message_name(), first.name());
    }

    /// Test-only `Transport` that logs `cork`/`uncork`/`quickack` calls
    /// instead of acting on them, so `advance`'s transport-hint sequence
    /// (`s2n_advance_message`) can be asserted directly rather than only
    /// through message progression.
    struct RecordingTransport {
        inner: LoopbackTransport,
        log: std::rc::Rc<std::cell::RefCell<Vec<&'static str>>>,
    }

    impl Transport for RecordingTransport {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.inner.write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            self.inner.flush()
        }
        fn cork(&mut self) {
            self.log.borrow_mut().push("cork");
        }
        fn uncork(&mut self) {
            self.log.borrow_mut().push("uncork");
        }
        fn quickack(&mut self) {
            self.log.borrow_mut().push("quickack");
        }
    }

    #[test]
    fn advance_corks_on_a_direction_change_into_this_side_and_is_quiet_otherwise() {
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let transport = RecordingTransport {
            inner: LoopbackTransport::new(),
            log: log.clone(),
        };
        let mut c = Connection::new(Mode::Server, Config::default(), Box::new(transport));
        c.negotiation_inputs.resuming_session = false;
        c.set_handshake_type().unwrap();

        // ClientHello (Client) -> ServerHello (Server): this side becomes
        // the writer, so `advance` corks after quickack-ing.
        assert_eq!(c.current_message().unwrap(), MessageKind::ClientHello);
        c.advance().unwrap();
        assert_eq!(c.current_message().unwrap(), MessageKind::ServerHello);
        assert_eq!(*log.borrow(), vec!["quickack", "cork"]);
        log.borrow_mut().clear();

        // ServerHello -> ServerCert: writer unchanged, only quickack.
        c.advance().unwrap();
        assert_eq!(c.current_message().unwrap(), MessageKind::ServerCert);
        assert_eq!(*log.borrow(), vec!["quickack"]);
        log.borrow_mut().clear();

        // ServerHelloDone -> ClientKey: writer changes away from this
        // side, so `advance` uncorks.
        c.advance().unwrap();
        assert_eq!(c.current_message().unwrap(), MessageKind::ServerHelloDone);
        log.borrow_mut().clear();
        c.advance().unwrap();
        assert_eq!(c.current_message().unwrap(), MessageKind::ClientKey);
        assert_eq!(*log.borrow(), vec!["quickack", "uncork"]);
    }

    #[test]
    fn client_auth_without_certificate_sets_no_client_cert() {
        let mut c = conn(Mode::Server);
        c.negotiation_inputs.client_auth_requested = true;
        c.negotiation_inputs.client_cert_present = false;
        c.set_handshake_type().unwrap();
        assert!(c.handshake_type().contains(HandshakeType::CLIENT_AUTH));
        assert!(c.handshake_type().contains(HandshakeType::NO_CLIENT_CERT));
    }
}
