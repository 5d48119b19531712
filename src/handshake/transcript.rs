//! tls-handshake-io
//! https://github.com/grahamking/ort
//!
//! MIT License
//! Copyright (c) 2025 Graham King
//!
//! C6: transcript hashing. Feeds every handshake byte into the running
//! hash contexts that Finished, CertificateVerify and the PRF depend on
//! (`spec.md` §4.6). `ring` already covers SHA-256 for the teacher's own
//! TLS 1.3 client (`src/net/tls/sha2.rs`); TLS 1.0-1.2 also needs MD5,
//! SHA-1 and SHA-224/384/512, which `ring` does not provide, so those come
//! from the RustCrypto `md-5`, `sha1` and `sha2` crates — same `Digest`
//! trait shape, one dependency family per algorithm family already
//! present in the corpus.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

/// Which hashes this connection will ever need. Computed once, at the
/// earliest negotiated moment, per the monotonicity note in Design Notes
/// §9: "precompute the superset of required hashes ... and stop worrying
/// about retroactive activation."
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequiredHashes {
    pub md5: bool,
    pub sha1: bool,
    pub sha224: bool,
    pub sha256: bool,
    pub sha384: bool,
    pub sha512: bool,
}

impl RequiredHashes {
    /// TLS 1.0/1.1 PRF: MD5 and SHA-1, concatenated, nothing else.
    pub const TLS10: RequiredHashes = RequiredHashes {
        md5: true,
        sha1: true,
        sha224: false,
        sha256: false,
        sha384: false,
        sha512: false,
    };

    /// TLS 1.2 with a SHA-256 PRF cipher suite (the common case).
    pub const TLS12_SHA256: RequiredHashes = RequiredHashes {
        md5: false,
        sha1: false,
        sha224: false,
        sha256: true,
        sha384: false,
        sha512: false,
    };

    /// TLS 1.2 with a SHA-384 PRF cipher suite.
    pub const TLS12_SHA384: RequiredHashes = RequiredHashes {
        md5: false,
        sha1: false,
        sha224: false,
        sha256: false,
        sha384: true,
        sha512: false,
    };

    fn md5_sha1(self) -> bool {
        self.md5 && self.sha1
    }
}

/// The set of running hash contexts for one connection. Every handshake
/// byte, in wire order, is fed to every hash whose `required` flag was
/// set at construction time (§4.6, §9).
#[derive(Clone)]
pub struct Transcript {
    required: RequiredHashes,
    md5: Option<Md5>,
    sha1: Option<Sha1>,
    sha224: Option<Sha224>,
    sha256: Option<Sha256>,
    sha384: Option<Sha384>,
    sha512: Option<Sha512>,
}

impl Transcript {
    pub fn new(required: RequiredHashes) -> Self {
        Transcript {
            required,
            md5: required.md5.then(Md5::new),
            sha1: required.sha1.then(Sha1::new),
            sha224: required.sha224.then(Sha224::new),
            sha256: required.sha256.then(Sha256::new),
            sha384: required.sha384.then(Sha384::new),
            sha512: required.sha512.then(Sha512::new),
        }
    }

    pub fn required(&self) -> RequiredHashes {
        self.required
    }

    /// Feed `data` into every required hash, in the order the caller
    /// presents it. Callers must call this exactly once per handshake
    /// byte, in transmission order (invariant #4, `spec.md` §3).
    pub fn update(&mut self, data: &[u8]) {
        if let Some(h) = self.md5.as_mut() {
            h.update(data);
        }
        if let Some(h) = self.sha1.as_mut() {
            h.update(data);
        }
        if let Some(h) = self.sha224.as_mut() {
            h.update(data);
        }
        if let Some(h) = self.sha256.as_mut() {
            h.update(data);
        }
        if let Some(h) = self.sha384.as_mut() {
            h.update(data);
        }
        if let Some(h) = self.sha512.as_mut() {
            h.update(data);
        }
    }

    /// TLS 1.0/1.1 combined MD5||SHA1 digest. There is no running
    /// "MD5_SHA1" hash primitive in RustCrypto; since the combined value
    /// is just the concatenation of the two finalized digests, it is
    /// derived on demand from clones of the running contexts rather than
    /// fed a third time (§4.6: "MD5-SHA1 (iff both MD5 and SHA1
    /// required)" describes the *predicate*, not a distinct running
    /// state).
    pub fn md5_sha1_digest(&self) -> Option<Vec<u8>> {
        if !self.required.md5_sha1() {
            return None;
        }
        let md5 = self.md5.clone()?.finalize();
        let sha1 = self.sha1.clone()?.finalize();
        let mut out = Vec::with_capacity(md5.len() + sha1.len());
        out.extend_from_slice(&md5);
        out.extend_from_slice(&sha1);
        Some(out)
    }

    pub fn md5_digest(&self) -> Option<Vec<u8>> {
        self.md5.clone().map(|h| h.finalize().to_vec())
    }

    pub fn sha1_digest(&self) -> Option<Vec<u8>> {
        self.sha1.clone().map(|h| h.finalize().to_vec())
    }

    pub fn sha256_digest(&self) -> Option<Vec<u8>> {
        self.sha256.clone().map(|h| h.finalize().to_vec())
    }

    pub fn sha384_digest(&self) -> Option<Vec<u8>> {
        self.sha384.clone().map(|h| h.finalize().to_vec())
    }

    pub fn sha512_digest(&self) -> Option<Vec<u8>> {
        self.sha512.clone().map(|h| h.finalize().to_vec())
    }
}
