//! Generic small-object envelopes: JSON where almost every field has a
//! default.
//!
//! `{v: 1, cipher: "aes", mode: "ccm", iter: 1000, ks: 128, ts: 64, salt?,
//! iv, ct, adata?}` with iv/ct/salt base64. A present `salt` means
//! PBKDF2-HMAC-SHA256 over the secret; an absent one means the secret itself
//! is the (base64-coded) key. The tag occupies the last `ts/8` bytes of the
//! ciphertext and the optional `adata` string is the AAD.

use serde::Deserialize;

use crate::aead::{self, AeadMode};
use crate::codec::from_b64;
use crate::error::{Result, UnpasteError};
use crate::kdf::{pbkdf2, DigestKind};
use crate::urlrec::UrlRecord;

use super::{Adapter, UnwrapContext};

fn default_v() -> u64 {
    1
}
fn default_cipher() -> String {
    "aes".to_string()
}
fn default_mode() -> String {
    "ccm".to_string()
}
fn default_iter() -> u32 {
    1000
}
fn default_ks() -> u64 {
    128
}
fn default_ts() -> u64 {
    64
}

#[derive(Deserialize)]
struct SmallEnvelope {
    #[serde(default = "default_v")]
    v: u64,
    #[serde(default = "default_cipher")]
    cipher: String,
    #[serde(default = "default_mode")]
    mode: String,
    #[serde(default = "default_iter")]
    iter: u32,
    #[serde(default = "default_ks")]
    ks: u64,
    #[serde(default = "default_ts")]
    ts: u64,
    #[serde(default)]
    salt: Option<String>,
    iv: String,
    ct: String,
    #[serde(default)]
    adata: Option<String>,
}

/// Decrypt a small-object envelope.
pub fn unwrap_small_object(body: &[u8], secret: &str) -> Result<Vec<u8>> {
    let envelope: SmallEnvelope = serde_json::from_slice(body)
        .map_err(|e| UnpasteError::MalformedEnvelope(format!("envelope JSON: {}", e)))?;
    if envelope.v != 1 {
        return Err(UnpasteError::UnsupportedParameters(format!(
            "envelope version {}",
            envelope.v
        )));
    }
    if envelope.cipher != "aes" {
        return Err(UnpasteError::UnsupportedParameters(format!(
            "cipher {:?}",
            envelope.cipher
        )));
    }
    let mode = AeadMode::from_name(&envelope.mode).ok_or_else(|| {
        UnpasteError::UnsupportedParameters(format!("mode {:?}", envelope.mode))
    })?;
    // Reject before key derivation: `ks` sizes the derived buffer.
    if !matches!(envelope.ks, 128 | 192 | 256) {
        return Err(UnpasteError::UnsupportedParameters(format!(
            "key size {} bits",
            envelope.ks
        )));
    }
    if envelope.ts % 8 != 0 {
        return Err(UnpasteError::UnsupportedParameters(
            "fractional tag size".into(),
        ));
    }

    let key = match &envelope.salt {
        Some(salt) => {
            let salt = from_b64(salt)?;
            pbkdf2(
                DigestKind::Sha256,
                secret.as_bytes(),
                &salt,
                envelope.iter,
                (envelope.ks / 8) as usize,
            )
        }
        // No salt: the secret is the key itself.
        None => from_b64(secret)?,
    };
    let iv = from_b64(&envelope.iv)?;
    let ct = from_b64(&envelope.ct)?;
    let aad = envelope.adata.as_deref().unwrap_or("").as_bytes();

    aead::open(mode, &key, &iv, aad, &ct, (envelope.ts / 8) as usize)
}

pub struct SmallObject;

impl Adapter for SmallObject {
    fn name(&self) -> &'static str {
        "small_object"
    }

    fn retrieve(&self, ctx: &UnwrapContext<'_>, url: &UrlRecord) -> Result<Vec<u8>> {
        let body = ctx.transport.get(&url.to_fetch_url())?;
        let secret = ctx.secret_or_prompt("passphrase: ")?;
        unwrap_small_object(&body, &secret)
    }
}
