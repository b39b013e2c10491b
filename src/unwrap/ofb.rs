//! The AES-256-OFB family: three services sharing one cipher chain.
//!
//! The common core is [`unwrap_salted_ofb`]: a 16-byte salt prefixed to the
//! ciphertext doubles as the IV, and the key is PBKDF2-HMAC-SHA1 with a
//! single iteration (the producers cared about obfuscation, not stretching).
//! There is no integrity tag; a wrong passphrase yields garbage bytes, not an
//! error.
//!
//! On top of that core:
//! - `salted_ofb` serves the envelope as plain base64;
//! - `versioned_ofb` wraps it in JSON with a cipher-name field, and the
//!   plaintext may itself be a JSON bundle of several base64 files;
//! - `challenge_post` gates the envelope behind a password form that wants
//!   the SHA-1 hex of an interactively typed password POSTed back.


use aes::Aes256;
use ofb::cipher::{KeyIvInit, StreamCipher};
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::codec::{from_b64, to_hex};
use crate::error::{Result, UnpasteError};
use crate::kdf::{pbkdf2, DigestKind};
use crate::urlrec::UrlRecord;

use super::{Adapter, UnwrapContext};

type Aes256Ofb = ofb::Ofb<Aes256>;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Decrypt a `salt ‖ ciphertext` envelope with AES-256-OFB, IV = salt.
pub fn unwrap_salted_ofb(envelope: &[u8], passphrase: &str) -> Result<Vec<u8>> {
    if envelope.len() < SALT_LEN {
        return Err(UnpasteError::MalformedEnvelope(
            "envelope shorter than its salt".into(),
        ));
    }
    let (salt, ct) = envelope.split_at(SALT_LEN);
    let key = pbkdf2(DigestKind::Sha1, passphrase.as_bytes(), salt, 1, KEY_LEN);
    let mut cipher = Aes256Ofb::new_from_slices(&key, salt)
        .map_err(|_| UnpasteError::MalformedEnvelope("bad key/IV length".into()))?;
    let mut out = ct.to_vec();
    cipher.apply_keystream(&mut out);
    Ok(out)
}

pub struct SaltedOfb;

impl Adapter for SaltedOfb {
    fn name(&self) -> &'static str {
        "salted_ofb"
    }

    fn retrieve(&self, ctx: &UnwrapContext<'_>, url: &UrlRecord) -> Result<Vec<u8>> {
        let body = ctx.transport.get(&url.to_fetch_url())?;
        let raw = from_b64(String::from_utf8_lossy(&body).trim())?;
        let secret = ctx.secret_or_prompt("passphrase: ")?;
        unwrap_salted_ofb(&raw, &secret)
    }
}

#[derive(Deserialize)]
struct VersionedEnvelope {
    data: String,
    cipher: String,
}

#[derive(Deserialize)]
struct BundleFile {
    #[serde(default)]
    filename: String,
    data: String,
}

/// Pick one file out of a decrypted multi-file bundle. Without a requested
/// index the first file wins and the rest are only warned about.
fn select_bundle_file(plain: Vec<u8>, want_index: Option<usize>) -> Result<Vec<u8>> {
    let Ok(files) = serde_json::from_slice::<Vec<BundleFile>>(&plain) else {
        return Ok(plain);
    };
    if files.is_empty() {
        return Err(UnpasteError::MalformedEnvelope("empty file bundle".into()));
    }
    let index = match want_index {
        Some(i) => i,
        None => {
            if files.len() > 1 {
                tracing::warn!(
                    files = files.len(),
                    first = %files[0].filename,
                    "bundle holds several files, taking the first"
                );
            }
            0
        }
    };
    let file = files.get(index).ok_or_else(|| {
        UnpasteError::MalformedEnvelope(format!(
            "requested file {} of a {}-file bundle",
            index,
            files.len()
        ))
    })?;
    from_b64(&file.data)
}

pub struct VersionedOfb;

impl Adapter for VersionedOfb {
    fn name(&self) -> &'static str {
        "versioned_ofb"
    }

    fn retrieve(&self, ctx: &UnwrapContext<'_>, url: &UrlRecord) -> Result<Vec<u8>> {
        let body = ctx.transport.get(&url.to_fetch_url())?;
        let envelope: VersionedEnvelope = serde_json::from_slice(&body)
            .map_err(|e| UnpasteError::MalformedEnvelope(format!("envelope JSON: {}", e)))?;
        if envelope.cipher != "AES-256-OFB" {
            return Err(UnpasteError::UnsupportedParameters(format!(
                "cipher {:?}",
                envelope.cipher
            )));
        }
        let raw = from_b64(&envelope.data)?;
        let secret = ctx.secret_or_prompt("passphrase: ")?;
        let plain = unwrap_salted_ofb(&raw, &secret)?;
        select_bundle_file(plain, ctx.want_index)
    }
}

#[derive(Deserialize)]
struct ChallengeResponse {
    data: String,
}

/// The page password is always typed, never taken from the fragment (the
/// fragment is the decryption passphrase, not the access password).
fn prompt_page_password(ctx: &UnwrapContext<'_>) -> Result<String> {
    if ctx.interactive {
        rpassword::prompt_password("paste password: ").map_err(UnpasteError::Io)
    } else {
        Err(UnpasteError::MissingSecret)
    }
}

pub struct ChallengePost;

impl Adapter for ChallengePost {
    fn name(&self) -> &'static str {
        "challenge_post"
    }

    fn retrieve(&self, ctx: &UnwrapContext<'_>, url: &UrlRecord) -> Result<Vec<u8>> {
        let fetch_url = url.to_fetch_url();
        let body = ctx.transport.get(&fetch_url)?;
        let text = String::from_utf8_lossy(&body).into_owned();
        let json_text = if text.contains("type=\"password\"") {
            let password = prompt_page_password(ctx)?;
            let digest = to_hex(&Sha1::digest(password.as_bytes()));
            let response = ctx
                .transport
                .post(&fetch_url, &[("password".to_string(), digest)])?;
            String::from_utf8_lossy(&response).into_owned()
        } else {
            text
        };
        let response: ChallengeResponse = serde_json::from_str(&json_text)
            .map_err(|e| UnpasteError::MalformedEnvelope(format!("response JSON: {}", e)))?;
        let raw = from_b64(&response.data)?;
        let secret = ctx.secret_or_prompt("passphrase: ")?;
        unwrap_salted_ofb(&raw, &secret)
    }
}
