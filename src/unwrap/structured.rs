//! Structured v2 envelopes: versioned JSON with a positional parameter array
//! bound into the GCM tag as associated data.
//!
//! Shape: `{v: 2, adata: [[iv, salt, iterations, keyBits, tagBits, "aes",
//! "gcm", compression], ...], ct}` with iv/salt/ct base64. The whole `adata`
//! value, re-encoded as compact JSON, is the AAD, so the re-encoding has to
//! be byte-exact or the tag never verifies. The passphrase travels base58 in
//! the URL fragment and is decoded before key derivation.
//!
//! Some producers compressed arbitrary binary as if it were UTF-8 text;
//! after decompression the bytes are widened from Latin-1 when they fail a
//! strict UTF-8 decode.

use serde::Deserialize;
use serde_json::Value;

use crate::codec::{from_b58, from_b64, widen_latin1};
use crate::decompress::{decompress, Compression};
use crate::error::{Result, UnpasteError};
use crate::kdf::{pbkdf2, DigestKind};
use crate::urlrec::UrlRecord;

use super::{Adapter, UnwrapContext};

const VERSION: u64 = 2;

#[derive(Deserialize)]
struct StructuredEnvelope {
    v: u64,
    adata: Value,
    ct: String,
}

fn param_str(params: &[Value], index: usize) -> Result<&str> {
    params.get(index).and_then(Value::as_str).ok_or_else(|| {
        UnpasteError::MalformedEnvelope(format!("adata[0][{}] is not a string", index))
    })
}

fn param_u64(params: &[Value], index: usize) -> Result<u64> {
    params.get(index).and_then(Value::as_u64).ok_or_else(|| {
        UnpasteError::MalformedEnvelope(format!("adata[0][{}] is not a number", index))
    })
}

/// Decrypt a structured v2 envelope with the base58-coded passphrase.
pub fn unwrap_structured_v2(body: &[u8], passphrase: &str) -> Result<Vec<u8>> {
    let envelope: StructuredEnvelope = serde_json::from_slice(body)
        .map_err(|e| UnpasteError::MalformedEnvelope(format!("envelope JSON: {}", e)))?;
    if envelope.v != VERSION {
        return Err(UnpasteError::UnsupportedParameters(format!(
            "envelope version {}",
            envelope.v
        )));
    }
    let params = envelope
        .adata
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            UnpasteError::MalformedEnvelope("adata[0] is not a parameter array".into())
        })?;

    let iv = from_b64(param_str(params, 0)?)?;
    let salt = from_b64(param_str(params, 1)?)?;
    let iterations = u32::try_from(param_u64(params, 2)?)
        .map_err(|_| UnpasteError::MalformedEnvelope("iteration count overflow".into()))?;
    let key_bits = param_u64(params, 3)?;
    let tag_bits = param_u64(params, 4)?;
    let cipher = param_str(params, 5)?;
    let mode = param_str(params, 6)?;
    let compression_name = param_str(params, 7)?;

    if cipher != "aes" || mode != "gcm" {
        return Err(UnpasteError::UnsupportedParameters(format!(
            "cipher {:?} mode {:?}",
            cipher, mode
        )));
    }
    // Reject before key derivation: `key_bits` sizes the derived buffer.
    if !matches!(key_bits, 128 | 192 | 256) {
        return Err(UnpasteError::UnsupportedParameters(format!(
            "key size {} bits",
            key_bits
        )));
    }
    if tag_bits % 8 != 0 {
        return Err(UnpasteError::UnsupportedParameters(
            "fractional tag size".into(),
        ));
    }
    let compression = match compression_name {
        "none" => Compression::None,
        // the producers label raw deflate "zlib"
        "zlib" | "rawdeflate" => Compression::Deflate,
        other => Compression::from_name(other).ok_or_else(|| {
            UnpasteError::UnsupportedParameters(format!("compression {:?}", other))
        })?,
    };

    let key_material = from_b58(passphrase)?;
    let key = pbkdf2(
        DigestKind::Sha256,
        &key_material,
        &salt,
        iterations,
        (key_bits / 8) as usize,
    );
    let aad = serde_json::to_vec(&envelope.adata)
        .map_err(|e| UnpasteError::MalformedEnvelope(format!("adata re-encode: {}", e)))?;
    let ct = from_b64(&envelope.ct)?;

    let plain = crate::aead::open(
        crate::aead::AeadMode::Gcm,
        &key,
        &iv,
        &aad,
        &ct,
        (tag_bits / 8) as usize,
    )?;
    let plain = decompress(plain, compression)?;
    Ok(widen_latin1(plain))
}

pub struct StructuredV2;

impl Adapter for StructuredV2 {
    fn name(&self) -> &'static str {
        "structured_v2"
    }

    fn retrieve(&self, ctx: &UnwrapContext<'_>, url: &UrlRecord) -> Result<Vec<u8>> {
        let body = ctx.transport.get(&url.to_fetch_url())?;
        let secret = ctx.secret_or_prompt("passphrase: ")?;
        unwrap_structured_v2(&body, &secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::to_b64;
    use aes_gcm::aead::{Aead, Payload};
    use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    fn seal(passphrase_bytes: &[u8], plaintext: &[u8], compression: &str) -> (String, String) {
        let iv = [0x0Au8; 12];
        let salt = [0x0Bu8; 8];
        let iterations = 1000u32;

        let body = match compression {
            "none" => plaintext.to_vec(),
            "zlib" => {
                let mut enc = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
                enc.write_all(plaintext).unwrap();
                enc.finish().unwrap()
            }
            _ => unreachable!(),
        };

        let adata: Value = serde_json::json!([[
            to_b64(&iv),
            to_b64(&salt),
            iterations,
            256,
            128,
            "aes",
            "gcm",
            compression
        ]]);
        let aad = serde_json::to_vec(&adata).unwrap();

        let key = pbkdf2(DigestKind::Sha256, passphrase_bytes, &salt, iterations, 32);
        let ct = Aes256Gcm::new_from_slice(&key)
            .unwrap()
            .encrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &body,
                    aad: &aad,
                },
            )
            .unwrap();

        let envelope = serde_json::json!({
            "v": 2,
            "adata": adata,
            "ct": to_b64(&ct),
        });
        let passphrase = bs58::encode(passphrase_bytes).into_string();
        (envelope.to_string(), passphrase)
    }

    #[test]
    fn uncompressed_round_trip() {
        let (envelope, passphrase) = seal(b"key material", b"structured plaintext", "none");
        assert_eq!(
            unwrap_structured_v2(envelope.as_bytes(), &passphrase).unwrap(),
            b"structured plaintext"
        );
    }

    #[test]
    fn zlib_label_means_raw_deflate() {
        let (envelope, passphrase) = seal(b"key material", b"compressed plaintext", "zlib");
        assert_eq!(
            unwrap_structured_v2(envelope.as_bytes(), &passphrase).unwrap(),
            b"compressed plaintext"
        );
    }

    #[test]
    fn latin1_widening_after_decrypt() {
        // 0xE9 alone is invalid UTF-8 and widens to U+00E9.
        let (envelope, passphrase) = seal(b"key material", &[0xE9], "none");
        assert_eq!(
            unwrap_structured_v2(envelope.as_bytes(), &passphrase).unwrap(),
            "\u{e9}".as_bytes()
        );
    }

    #[test]
    fn tampered_adata_breaks_the_tag() {
        let (envelope, passphrase) = seal(b"key material", b"bound", "none");
        // "gzip" still passes the parameter checks, so the failure can only
        // come from the AAD no longer matching the tag.
        let tampered = envelope.replacen("\"none\"", "\"gzip\"", 1);
        assert!(matches!(
            unwrap_structured_v2(tampered.as_bytes(), &passphrase),
            Err(UnpasteError::AuthenticationFailed)
        ));
    }

    #[test]
    fn oversized_key_declaration_is_rejected_before_derivation() {
        let (envelope, passphrase) = seal(b"key material", b"x", "none");
        // 2^40 declared key bits must fail parameter validation, not try to
        // derive a terabyte of key material.
        let tampered = envelope.replacen(",256,128,", ",1099511627776,128,", 1);
        assert!(matches!(
            unwrap_structured_v2(tampered.as_bytes(), &passphrase),
            Err(UnpasteError::UnsupportedParameters(_))
        ));
    }

    #[test]
    fn wrong_version_is_unsupported() {
        let (envelope, passphrase) = seal(b"key material", b"x", "none");
        let tampered = envelope.replacen("\"v\":2", "\"v\":1", 1);
        assert!(matches!(
            unwrap_structured_v2(tampered.as_bytes(), &passphrase),
            Err(UnpasteError::UnsupportedParameters(_))
        ));
    }

    #[test]
    fn unknown_cipher_is_unsupported() {
        let (envelope, passphrase) = seal(b"key material", b"x", "none");
        let tampered = envelope.replacen("\"aes\"", "\"twofish\"", 1);
        assert!(matches!(
            unwrap_structured_v2(tampered.as_bytes(), &passphrase),
            Err(UnpasteError::UnsupportedParameters(_))
        ));
    }
}
