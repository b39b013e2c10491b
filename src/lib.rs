//! Retrieval library for client-side-encrypted paste and file-drop services.
//!
//! Two subsystems do the real work:
//! - the declarative URL rule engine ([`rules`]): an ordered table of
//!   per-field matchers and rewrite templates that turns a share URL into
//!   either a directly-fetchable raw URL or a handoff to a named adapter;
//! - the unwrap adapters ([`unwrap`]): one per hosting service's encryption
//!   scheme, from colon-delimited hex fields through JSON parameter arrays
//!   to raw `Salted__` blobs, including a from-scratch OCB2 AEAD
//!   ([`ocb2`]) for the one service that used it.
//!
//! [`pipeline::Pipeline`] ties the two together over a blocking
//! [`transport::Transport`].

pub mod aead;
pub mod codec;
pub mod decompress;
pub mod error;
pub mod kdf;
pub mod ocb2;
pub mod pipeline;
pub mod rules;
pub mod transport;
pub mod unwrap;
pub mod urlrec;

pub use error::{Result, UnpasteError};
pub use pipeline::Pipeline;
pub use rules::{default_table, Dispatch, RuleTable, SiteRule};
pub use transport::{HttpTransport, Transport};
pub use urlrec::{Field, UrlRecord};
