//! Unwrap adapters: one per hosting service's client-side encryption scheme.
//!
//! Each scheme is a distinct, bit-exact protocol: its own envelope
//! serialization (delimited hex fields, JSON objects with positional
//! parameter arrays, raw binary with magic headers), its own key derivation
//! and its own cipher/integrity chain. The envelope parsing and decryption of
//! every adapter is a pure `unwrap_*` function, testable without any network;
//! the [`Adapter`] impl on top fetches (or POSTs) through the transport
//! collaborator and feeds the body through it.
//!
//! Adapters are looked up by name through [`adapter_by_name`]; the site table
//! references these names as plain strings.
//!
//! | Name | Envelope | KDF | Cipher | Integrity |
//! |------|----------|-----|--------|-----------|
//! | `ocb_hex` | `iter:salt:iv:ct` hex fields | PBKDF2-SHA256 | AES-128 OCB2 | OCB2 tag |
//! | `salted_ofb` | raw `salt‖ct` | PBKDF2-SHA1, 1 iter | AES-256-OFB | none |
//! | `versioned_ofb` | JSON `{data, cipher}` | as `salted_ofb` | AES-256-OFB | none |
//! | `openssl_cbc` | `Salted__‖salt‖ct` | digest stretch / PBKDF2 | AES-CBC | none |
//! | `mac_gated` | detached HMAC + `openssl_cbc` | PBKDF2-SHA512 | AES-CBC | HMAC-SHA512 chain |
//! | `structured_v2` | JSON, versioned, positional params | PBKDF2-SHA256 over base58 | AES-GCM | GCM tag over adata |
//! | `small_object` | JSON with defaultable fields | PBKDF2-SHA256 or direct key | AES-CCM/GCM | per mode |
//! | `challenge_post` | form-gated JSON | as `salted_ofb` | AES-256-OFB | none |
//! | `keyed_header` | `Key: value` header block + data | as `openssl_cbc` | AES-CBC | RIPEMD-160 key check |
//! | `fixed_key` | raw CCM body | SHA-512 of decoded secret | AES-CCM | CCM tag |

mod fixed_key;
mod keyed_header;
mod mac_gated;
mod ocb_hex;
mod ofb;
mod openssl;
mod small_object;
mod structured;

pub use ofb::unwrap_salted_ofb;
pub use openssl::{unwrap_openssl, DeriveParams};

use crate::error::{Result, UnpasteError};
use crate::transport::Transport;
use crate::urlrec::UrlRecord;

/// Shared capabilities handed to an adapter for one retrieval.
pub struct UnwrapContext<'a> {
    pub transport: &'a dyn Transport,
    /// Secret material: the URL fragment, or an explicit override.
    pub secret: Option<String>,
    /// File index requested for multi-file bundles; `None` picks the first
    /// and warns.
    pub want_index: Option<usize>,
    /// Whether stdin can be prompted; set from `IsTerminal` by the caller.
    pub interactive: bool,
}

impl UnwrapContext<'_> {
    /// The secret, falling back to an interactive prompt when stdin is a
    /// terminal. Without a terminal a missing secret is `MissingSecret`.
    pub fn secret_or_prompt(&self, prompt: &str) -> Result<String> {
        if let Some(s) = self.secret.as_deref() {
            if !s.is_empty() {
                return Ok(s.to_string());
            }
        }
        if self.interactive {
            rpassword::prompt_password(prompt).map_err(UnpasteError::Io)
        } else {
            Err(UnpasteError::MissingSecret)
        }
    }
}

/// One hosting service's retrieval + unwrap protocol.
pub trait Adapter: Sync {
    /// Registry name, referenced from the site table.
    fn name(&self) -> &'static str;

    /// Fetch the envelope for `url` and recover the plaintext.
    fn retrieve(&self, ctx: &UnwrapContext<'_>, url: &UrlRecord) -> Result<Vec<u8>>;
}

static ADAPTERS: [&(dyn Adapter); 10] = [
    &ocb_hex::OcbHex,
    &ofb::SaltedOfb,
    &ofb::VersionedOfb,
    &ofb::ChallengePost,
    &openssl::OpensslCbc,
    &mac_gated::MacGated,
    &structured::StructuredV2,
    &small_object::SmallObject,
    &keyed_header::KeyedHeader,
    &fixed_key::FixedKey,
];

/// Look up an adapter implementation by its table name.
pub fn adapter_by_name(name: &str) -> Option<&'static dyn Adapter> {
    ADAPTERS.iter().copied().find(|a| a.name() == name)
}
