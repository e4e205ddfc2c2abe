//! Error types for marshalling, unmarshalling, and the wire codecs.
//!
//! Every failure in this crate is terminal: the first error encountered
//! aborts the current step, propagates unchanged through the driver and the
//! pump, and ends the whole operation. There is no partial-result recovery.
//!
//! ## Error categories
//!
//! - **Malformed stream**: a token arrived that is illegal for the
//!   receiver's current phase (an array-close where a map key was expected).
//! - **Shape mismatch**: the token stream implies a shape incompatible with
//!   the target or source value's type.
//! - **Positional wire errors**: the JSON codec reports line/column, the
//!   CBOR codec reports byte offsets.
//! - **Atlas construction errors**: duplicate entries or malformed
//!   descriptors, surfaced at build time before any operation begins.

use crate::token::TokenKind;
use std::fmt;
use thiserror::Error;

/// All errors produced by this crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// IO error while reading or writing through a convenience wrapper.
    #[error("IO error: {0}")]
    Io(String),

    /// A token illegal for the receiver's current phase.
    #[error("malformed token stream: expected {expected}, found {found}")]
    MalformedStream { expected: String, found: TokenKind },

    /// The stream implies a shape the target/source type cannot hold.
    #[error("shape mismatch: cannot fit {found} into {expected}")]
    ShapeMismatch { expected: String, found: String },

    /// No atlas entry and no default behavior for a value's type.
    #[error("no atlas entry or default handling for type {type_name}")]
    Unresolvable { type_name: String },

    /// A map or record key appeared twice in one composite.
    #[error("duplicate key {key:?} in one composite")]
    DuplicateKey { key: String },

    /// A record received a key its atlas entry does not declare.
    #[error("no such field {name:?}")]
    NoSuchField { name: String },

    /// A definite-length composite's count disagreed with its entries.
    #[error("length mismatch: announced {announced} entries, observed {observed}")]
    LengthMismatch { announced: usize, observed: usize },

    /// Syntax error in the text wire format.
    #[error("syntax error at line {line}, column {col}: {msg}")]
    Syntax { line: usize, col: usize, msg: String },

    /// Malformed bytes in the binary wire format.
    #[error("invalid byte stream at offset {offset}: {msg}")]
    InvalidByte { offset: usize, msg: String },

    /// A wire construct with no token equivalent (e.g. a CBOR tag).
    #[error("unsupported wire feature at offset {offset}: {msg}")]
    UnsupportedWire { offset: usize, msg: String },

    /// A source and sink bound by a pump disagreed on completion.
    #[error("pump desync: {0}")]
    PumpDesync(&'static str),

    /// Atlas construction failure.
    #[error("atlas construction: {0}")]
    AtlasConstruction(String),

    /// Custom error with a display message.
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// A malformed-stream error naming the expected phase and actual token.
    pub fn malformed(expected: impl Into<String>, found: TokenKind) -> Self {
        Error::MalformedStream {
            expected: expected.into(),
            found,
        }
    }

    /// A shape-mismatch error naming both shapes.
    pub fn shape(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::ShapeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// A syntax error with line and column information.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tokenwire::Error;
    ///
    /// let err = Error::syntax(3, 14, "expected ',' or '}'");
    /// assert!(err.to_string().contains("line 3"));
    /// ```
    pub fn syntax(line: usize, col: usize, msg: impl Into<String>) -> Self {
        Error::Syntax {
            line,
            col,
            msg: msg.into(),
        }
    }

    /// A binary-codec error at a byte offset.
    pub fn invalid_byte(offset: usize, msg: impl Into<String>) -> Self {
        Error::InvalidByte {
            offset,
            msg: msg.into(),
        }
    }

    /// An unsupported-wire-feature error at a byte offset.
    pub fn unsupported(offset: usize, msg: impl Into<String>) -> Self {
        Error::UnsupportedWire {
            offset,
            msg: msg.into(),
        }
    }

    /// A custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// An I/O error for reader/writer convenience wrappers.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
