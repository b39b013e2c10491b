//! GCM/CCM decrypt-verify dispatch.
//!
//! The RustCrypto AEAD types fix key, nonce and tag sizes at the type level,
//! while the envelopes declare them as runtime data. This module maps a
//! declared (key length, nonce length, tag length) triple onto a concrete
//! instantiation, rejecting anything outside the supported grid as
//! `UnsupportedParameters` — sizes are never silently truncated or padded.
//!
//! The ciphertext is passed with its tag still attached at the end, which is
//! how every envelope carries it.

use aes::cipher::consts::{U11, U12, U13, U16, U8};
use aes::cipher::generic_array::GenericArray;
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::AesGcm;
use ccm::Ccm;

use crate::error::{Result, UnpasteError};

/// AEAD mode declared by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadMode {
    Gcm,
    Ccm,
}

impl AeadMode {
    pub fn from_name(name: &str) -> Option<AeadMode> {
        match name.to_ascii_lowercase().as_str() {
            "gcm" => Some(AeadMode::Gcm),
            "ccm" => Some(AeadMode::Ccm),
            _ => None,
        }
    }
}

macro_rules! open_with {
    ($ty:ty, $key:expr, $nonce:expr, $aad:expr, $msg:expr) => {{
        let cipher = <$ty>::new_from_slice($key)
            .map_err(|_| UnpasteError::UnsupportedParameters("bad AEAD key length".into()))?;
        cipher
            .decrypt(
                GenericArray::from_slice($nonce),
                Payload { msg: $msg, aad: $aad },
            )
            .map_err(|_| UnpasteError::AuthenticationFailed)
    }};
}

/// CCM length-field size, following the clamp the envelope producers use:
/// start at `L = 2`, grow while the message length needs more than `8·L`
/// bits, floor at `15 − iv_len`.
fn ccm_length_field(iv_len: usize, msg_len: usize) -> usize {
    let mut l = 2usize;
    while l < 4 && (msg_len >> (8 * l)) != 0 {
        l += 1;
    }
    if iv_len < 15 && l < 15 - iv_len {
        l = 15 - iv_len;
    }
    l
}

fn open_gcm(key: &[u8], iv: &[u8], aad: &[u8], msg: &[u8], tag_len: usize) -> Result<Vec<u8>> {
    match (key.len(), iv.len(), tag_len) {
        (16, 12, 16) => open_with!(AesGcm<Aes128, U12, U16>, key, iv, aad, msg),
        (16, 12, 12) => open_with!(AesGcm<Aes128, U12, U12>, key, iv, aad, msg),
        (16, 16, 16) => open_with!(AesGcm<Aes128, U16, U16>, key, iv, aad, msg),
        (16, 16, 12) => open_with!(AesGcm<Aes128, U16, U12>, key, iv, aad, msg),
        (24, 12, 16) => open_with!(AesGcm<Aes192, U12, U16>, key, iv, aad, msg),
        (24, 12, 12) => open_with!(AesGcm<Aes192, U12, U12>, key, iv, aad, msg),
        (24, 16, 16) => open_with!(AesGcm<Aes192, U16, U16>, key, iv, aad, msg),
        (24, 16, 12) => open_with!(AesGcm<Aes192, U16, U12>, key, iv, aad, msg),
        (32, 12, 16) => open_with!(AesGcm<Aes256, U12, U16>, key, iv, aad, msg),
        (32, 12, 12) => open_with!(AesGcm<Aes256, U12, U12>, key, iv, aad, msg),
        (32, 16, 16) => open_with!(AesGcm<Aes256, U16, U16>, key, iv, aad, msg),
        (32, 16, 12) => open_with!(AesGcm<Aes256, U16, U12>, key, iv, aad, msg),
        (k, n, t) => Err(UnpasteError::UnsupportedParameters(format!(
            "GCM with key {} / nonce {} / tag {} bytes",
            k, n, t
        ))),
    }
}

fn open_ccm(key: &[u8], nonce: &[u8], aad: &[u8], msg: &[u8], tag_len: usize) -> Result<Vec<u8>> {
    match (key.len(), nonce.len(), tag_len) {
        (16, 13, 8) => open_with!(Ccm<Aes128, U8, U13>, key, nonce, aad, msg),
        (16, 13, 12) => open_with!(Ccm<Aes128, U12, U13>, key, nonce, aad, msg),
        (16, 13, 16) => open_with!(Ccm<Aes128, U16, U13>, key, nonce, aad, msg),
        (16, 12, 8) => open_with!(Ccm<Aes128, U8, U12>, key, nonce, aad, msg),
        (16, 12, 12) => open_with!(Ccm<Aes128, U12, U12>, key, nonce, aad, msg),
        (16, 12, 16) => open_with!(Ccm<Aes128, U16, U12>, key, nonce, aad, msg),
        (16, 11, 8) => open_with!(Ccm<Aes128, U8, U11>, key, nonce, aad, msg),
        (16, 11, 12) => open_with!(Ccm<Aes128, U12, U11>, key, nonce, aad, msg),
        (16, 11, 16) => open_with!(Ccm<Aes128, U16, U11>, key, nonce, aad, msg),
        (24, 13, 8) => open_with!(Ccm<Aes192, U8, U13>, key, nonce, aad, msg),
        (24, 13, 12) => open_with!(Ccm<Aes192, U12, U13>, key, nonce, aad, msg),
        (24, 13, 16) => open_with!(Ccm<Aes192, U16, U13>, key, nonce, aad, msg),
        (24, 12, 8) => open_with!(Ccm<Aes192, U8, U12>, key, nonce, aad, msg),
        (24, 12, 12) => open_with!(Ccm<Aes192, U12, U12>, key, nonce, aad, msg),
        (24, 12, 16) => open_with!(Ccm<Aes192, U16, U12>, key, nonce, aad, msg),
        (24, 11, 8) => open_with!(Ccm<Aes192, U8, U11>, key, nonce, aad, msg),
        (24, 11, 12) => open_with!(Ccm<Aes192, U12, U11>, key, nonce, aad, msg),
        (24, 11, 16) => open_with!(Ccm<Aes192, U16, U11>, key, nonce, aad, msg),
        (32, 13, 8) => open_with!(Ccm<Aes256, U8, U13>, key, nonce, aad, msg),
        (32, 13, 12) => open_with!(Ccm<Aes256, U12, U13>, key, nonce, aad, msg),
        (32, 13, 16) => open_with!(Ccm<Aes256, U16, U13>, key, nonce, aad, msg),
        (32, 12, 8) => open_with!(Ccm<Aes256, U8, U12>, key, nonce, aad, msg),
        (32, 12, 12) => open_with!(Ccm<Aes256, U12, U12>, key, nonce, aad, msg),
        (32, 12, 16) => open_with!(Ccm<Aes256, U16, U12>, key, nonce, aad, msg),
        (32, 11, 8) => open_with!(Ccm<Aes256, U8, U11>, key, nonce, aad, msg),
        (32, 11, 12) => open_with!(Ccm<Aes256, U12, U11>, key, nonce, aad, msg),
        (32, 11, 16) => open_with!(Ccm<Aes256, U16, U11>, key, nonce, aad, msg),
        (k, n, t) => Err(UnpasteError::UnsupportedParameters(format!(
            "CCM with key {} / nonce {} / tag {} bytes",
            k, n, t
        ))),
    }
}

/// Decrypt and verify `ciphertext_and_tag` (tag attached to the end, `tag_len`
/// bytes of it) under the given mode.
///
/// For GCM the IV is used as the nonce verbatim. For CCM the nonce is the IV
/// clamped to `15 − L` bytes per the producers' length-field rule.
pub fn open(
    mode: AeadMode,
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext_and_tag: &[u8],
    tag_len: usize,
) -> Result<Vec<u8>> {
    if ciphertext_and_tag.len() < tag_len {
        return Err(UnpasteError::MalformedEnvelope(
            "ciphertext shorter than its tag".into(),
        ));
    }
    match mode {
        AeadMode::Gcm => open_gcm(key, iv, aad, ciphertext_and_tag, tag_len),
        AeadMode::Ccm => {
            let msg_len = ciphertext_and_tag.len() - tag_len;
            let l = ccm_length_field(iv.len(), msg_len);
            if iv.len() < 15 - l {
                return Err(UnpasteError::MalformedEnvelope("CCM IV too short".into()));
            }
            open_ccm(key, &iv[..15 - l], aad, ciphertext_and_tag, tag_len)
        }
    }
}
