//! Header-block envelopes: newline-delimited `Key: value` pairs, a blank
//! line, then a base64 data block.
//!
//! An optional `Hash` header carries the RIPEMD-160 hex of the key and gates
//! decryption; `Burn` flags a burn-after-reading paste (worth a warning
//! before the fetch destroys it); `Compressed` selects gzip after decrypt.
//! The data block itself is an OpenSSL-style `Salted__` envelope.

use ripemd::{Digest, Ripemd160};

use crate::codec::{from_b64, to_hex};
use crate::decompress::{decompress, Compression};
use crate::error::{Result, UnpasteError};
use crate::urlrec::UrlRecord;

use super::openssl::{unwrap_openssl, DeriveParams};
use super::{Adapter, UnwrapContext};

/// Parse the header block and decrypt the data block.
pub fn unwrap_keyed_header(text: &str, secret: &str) -> Result<Vec<u8>> {
    let mut hash: Option<String> = None;
    let mut burn = false;
    let mut compressed = false;

    let mut lines = text.lines();
    let mut saw_blank = false;
    for line in lines.by_ref() {
        if line.trim().is_empty() {
            saw_blank = true;
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(UnpasteError::MalformedEnvelope(format!(
                "header line without a colon: {:?}",
                line
            )));
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("hash") {
            hash = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("burn") {
            burn = value.eq_ignore_ascii_case("true");
        } else if name.eq_ignore_ascii_case("compressed") {
            compressed = value.eq_ignore_ascii_case("true");
        }
        // Unknown headers pass through untouched.
    }
    if !saw_blank {
        return Err(UnpasteError::MalformedEnvelope(
            "no blank line between headers and data".into(),
        ));
    }

    if let Some(expected) = hash {
        let actual = to_hex(&Ripemd160::digest(secret.as_bytes()));
        if !expected.eq_ignore_ascii_case(&actual) {
            return Err(UnpasteError::AuthenticationFailed);
        }
    }
    if burn {
        tracing::warn!("paste is burn-after-reading; this fetch destroyed it");
    }

    let data: String = lines.collect::<Vec<_>>().concat();
    let data: String = data.split_whitespace().collect();
    let envelope = from_b64(&data)?;
    let plain = unwrap_openssl(&envelope, secret, &DeriveParams::default())?;
    if compressed {
        decompress(plain, Compression::Gzip)
    } else {
        Ok(plain)
    }
}

pub struct KeyedHeader;

impl Adapter for KeyedHeader {
    fn name(&self) -> &'static str {
        "keyed_header"
    }

    fn retrieve(&self, ctx: &UnwrapContext<'_>, url: &UrlRecord) -> Result<Vec<u8>> {
        let body = ctx.transport.get(&url.to_fetch_url())?;
        let text = String::from_utf8_lossy(&body);
        let secret = ctx.secret_or_prompt("passphrase: ")?;
        unwrap_keyed_header(&text, &secret)
    }
}
