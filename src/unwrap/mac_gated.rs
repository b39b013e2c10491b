//! HMAC-gated legacy envelopes: an optional detached HMAC-SHA512 tag in
//! front of an OpenSSL-style payload.
//!
//! Two generations exist. The first is a bare `Salted__` payload with a
//! single PBKDF2 iteration and no tag. The second prepends a 64-byte tag
//! computed as `HMAC-SHA512(HMAC-SHA512("auth key", secret), payload)` and
//! bumps the iteration count to the producing library's default of 1000. The
//! tag is checked in constant time before the payload is touched at all.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::codec::from_b64;
use crate::error::{Result, UnpasteError};
use crate::kdf::DigestKind;
use crate::urlrec::UrlRecord;

use super::openssl::{unwrap_openssl, DeriveParams};
use super::{Adapter, UnwrapContext};

type HmacSha512 = Hmac<Sha512>;

const MAGIC: &[u8; 8] = b"Salted__";
const TAG_LEN: usize = 64;
const V2_ITERATIONS: u32 = 1000;

fn hmac_sha512(key: &[u8], message: &[u8]) -> Vec<u8> {
    // HMAC accepts any key length, so new_from_slice cannot fail.
    let mut mac = HmacSha512::new_from_slice(key).unwrap_or_else(|_| unreachable!());
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Verify the detached tag (when present) and decrypt the payload beneath.
pub fn unwrap_mac_gated(envelope: &[u8], secret: &str) -> Result<Vec<u8>> {
    let (payload, iterations) = if envelope.starts_with(MAGIC) {
        (envelope, 1)
    } else if envelope.len() > TAG_LEN + MAGIC.len()
        && &envelope[TAG_LEN..TAG_LEN + MAGIC.len()] == MAGIC
    {
        let (tag, payload) = envelope.split_at(TAG_LEN);
        let auth_key = hmac_sha512(b"auth key", secret.as_bytes());
        let expected = hmac_sha512(&auth_key, payload);
        if !bool::from(expected.ct_eq(tag)) {
            return Err(UnpasteError::AuthenticationFailed);
        }
        (payload, V2_ITERATIONS)
    } else {
        return Err(UnpasteError::MalformedEnvelope(
            "neither a bare nor a tagged Salted__ payload".into(),
        ));
    };
    unwrap_openssl(
        payload,
        secret,
        &DeriveParams {
            digest: DigestKind::Sha512,
            iterations: Some(iterations),
            key_len: 32,
        },
    )
}

pub struct MacGated;

impl Adapter for MacGated {
    fn name(&self) -> &'static str {
        "mac_gated"
    }

    fn retrieve(&self, ctx: &UnwrapContext<'_>, url: &UrlRecord) -> Result<Vec<u8>> {
        let body = ctx.transport.get(&url.to_fetch_url())?;
        let raw = if body.starts_with(MAGIC)
            || (body.len() > TAG_LEN && body[TAG_LEN..].starts_with(MAGIC))
        {
            body
        } else {
            from_b64(String::from_utf8_lossy(&body).trim())?
        };
        let secret = ctx.secret_or_prompt("passphrase: ")?;
        unwrap_mac_gated(&raw, &secret)
    }
}
