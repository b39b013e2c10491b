//! Error types for URL dispatch, retrieval and envelope unwrapping.
//!
//! One taxonomy covers the whole pipeline so the binary can report and count
//! per-URL failures uniformly:
//!
//! | Category | Errors | Description |
//! |----------|--------|-------------|
//! | Dispatch | [`UnknownDestination`], [`BadUrl`], [`Template`] | The URL cannot be routed |
//! | Transport | [`TransportFailure`] | Non-success HTTP status or network error |
//! | Envelope | [`MalformedEnvelope`], [`UnsupportedParameters`] | The fetched body is not a usable envelope |
//! | Crypto | [`AuthenticationFailed`], [`MissingSecret`] | Integrity or secret-material failure |
//! | Post | [`Decompress`], [`Io`] | Plaintext post-processing |
//!
//! [`UnknownDestination`]: UnpasteError::UnknownDestination
//! [`BadUrl`]: UnpasteError::BadUrl
//! [`Template`]: UnpasteError::Template
//! [`TransportFailure`]: UnpasteError::TransportFailure
//! [`MalformedEnvelope`]: UnpasteError::MalformedEnvelope
//! [`UnsupportedParameters`]: UnpasteError::UnsupportedParameters
//! [`AuthenticationFailed`]: UnpasteError::AuthenticationFailed
//! [`MissingSecret`]: UnpasteError::MissingSecret
//! [`Decompress`]: UnpasteError::Decompress
//! [`Io`]: UnpasteError::Io

use std::fmt;
use std::io;

/// Error type for retrieval and unwrap operations.
#[derive(Debug)]
pub enum UnpasteError {
    /// No rule in the site table matched the input URL.
    ///
    /// The `String` is the URL as given, for diagnostics.
    UnknownDestination(String),

    /// The input string could not be parsed as a URL record.
    BadUrl(String),

    /// A rewrite template contained token syntax the engine does not know.
    ///
    /// Out-of-range capture indices expand to the empty string; this error is
    /// reserved for genuinely malformed templates (e.g. `#` followed by
    /// neither a digit nor `{field.N}`).
    Template(String),

    /// The transport collaborator failed: connection error or a non-success
    /// HTTP status.
    TransportFailure {
        /// URL that was being fetched.
        url: String,
        /// Status code or error description.
        detail: String,
    },

    /// The fetched body cannot be parsed into the expected envelope shape.
    ///
    /// Covers missing delimiters, bad magic markers, undecodable hex/base64
    /// fields and truncated payloads.
    MalformedEnvelope(String),

    /// The envelope declares a cipher, mode or version this adapter does not
    /// implement.
    UnsupportedParameters(String),

    /// A MAC, AEAD tag or digest check failed.
    ///
    /// Partially-computed plaintext is never returned alongside this error.
    AuthenticationFailed,

    /// A decryption secret is required, none was supplied, and stdin is not a
    /// terminal so no prompt is possible.
    MissingSecret,

    /// The decompression collaborator failed on the recovered plaintext.
    Decompress(String),

    /// An I/O error occurred (writing output, reading stdin).
    Io(io::Error),
}

impl fmt::Display for UnpasteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDestination(url) => write!(f, "No site rule matches {}", url),
            Self::BadUrl(s) => write!(f, "Not a parseable URL: {}", s),
            Self::Template(t) => write!(f, "Bad rewrite template: {}", t),
            Self::TransportFailure { url, detail } => {
                write!(f, "Fetch failed for {}: {}", url, detail)
            }
            Self::MalformedEnvelope(msg) => write!(f, "Malformed envelope: {}", msg),
            Self::UnsupportedParameters(msg) => write!(f, "Unsupported parameters: {}", msg),
            Self::AuthenticationFailed => {
                write!(f, "Authentication failed (wrong key or tampered data)")
            }
            Self::MissingSecret => write!(f, "Decryption secret required but not available"),
            Self::Decompress(msg) => write!(f, "Decompression failed: {}", msg),
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for UnpasteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for UnpasteError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, UnpasteError>;
