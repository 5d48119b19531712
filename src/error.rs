//! tls-handshake-io
//! https://github.com/grahamking/ort
//!
//! MIT License
//! Copyright (c) 2025 Graham King

use std::fmt::{self, Display};

pub type HsResult<T> = Result<T, HsError>;

/// The driver's error taxonomy (spec: BLOCKED, BAD_MESSAGE, ALERT, plus
/// anything propagated unchanged from a collaborator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HsErrorKind {
    /// Unexpected message type, oversized body, malformed framing, etc.
    /// Terminal for the connection.
    BadMessage,
    /// Non-terminal: the transport would block. Resumable.
    Blocked,
    /// A peer alert was read off the wire.
    Alert { level: u8, description: u8 },
    /// Propagated unchanged from a collaborator (I/O, crypto, cache, ...).
    Collaborator,
}

#[derive(Debug, Clone)]
pub struct HsError {
    kind: HsErrorKind,
    msg: String,
    context: Vec<String>,
}

pub fn hs_error<T: Into<String>>(kind: HsErrorKind, msg: T) -> HsError {
    HsError {
        kind,
        msg: msg.into(),
        context: vec![],
    }
}

pub fn hs_err<X, T: Into<String>>(kind: HsErrorKind, msg: T) -> Result<X, HsError> {
    Err(hs_error(kind, msg))
}

pub fn bad_message<T: Into<String>>(msg: T) -> HsError {
    hs_error(HsErrorKind::BadMessage, msg)
}

pub fn blocked() -> HsError {
    hs_error(HsErrorKind::Blocked, "operation would block")
}

pub fn alert(level: u8, description: u8) -> HsError {
    HsError {
        kind: HsErrorKind::Alert { level, description },
        msg: format!("peer alert: level={level} description={description}"),
        context: vec![],
    }
}

impl HsError {
    pub fn kind(&self) -> &HsErrorKind {
        &self.kind
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.kind, HsErrorKind::Blocked)
    }

    pub fn is_alert(&self) -> bool {
        matches!(self.kind, HsErrorKind::Alert { .. })
    }

    // Save extra context with this error.
    pub fn context<T: Into<String>>(&mut self, s: T) -> &mut Self {
        self.context.push(s.into());
        self
    }
}

impl std::error::Error for HsError {}

impl fmt::Display for HsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.context.is_empty() {
            write!(f, "{}", self.msg)
        } else {
            write!(
                f,
                "Error: {}. Context: {}",
                self.msg,
                self.context.join(",")
            )
        }
    }
}

impl From<std::io::Error> for HsError {
    fn from(err: std::io::Error) -> HsError {
        if err.kind() == std::io::ErrorKind::WouldBlock {
            return blocked();
        }
        hs_error(HsErrorKind::Collaborator, err.to_string())
    }
}

impl From<serde_json::Error> for HsError {
    fn from(err: serde_json::Error) -> HsError {
        hs_error(HsErrorKind::Collaborator, err.to_string())
    }
}

pub trait Context<T, E> {
    /// Wrap the error value with additional context.
    fn context<C>(self, context: C) -> Result<T, HsError>
    where
        C: Display + Send + Sync + 'static;
}

impl<T, E> Context<T, E> for Result<T, E>
where
    E: Into<HsError>,
{
    fn context<C>(self, context: C) -> HsResult<T>
    where
        C: Display + Send + Sync + 'static,
    {
        match self {
            Ok(ok) => Ok(ok),
            Err(error) => {
                let mut err: HsError = error.into();
                err.context(context.to_string());
                Err(err)
            }
        }
    }
}
