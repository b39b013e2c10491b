//! OpenSSL `enc`-style envelopes: `"Salted__" ‖ salt(8) ‖ ciphertext`,
//! AES-CBC with PKCS#7 padding.
//!
//! Key and IV come from one stretched buffer. The classic producers use the
//! iterative digest scheme (digest of previous output ‖ passphrase ‖ salt,
//! repeated) with MD5; later ones switched to PBKDF2. [`DeriveParams`] picks
//! between the two, so the HMAC-gated and header-block adapters can reuse
//! this chain with their own digests and iteration counts.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};

use crate::codec::from_b64;
use crate::error::{Result, UnpasteError};
use crate::kdf::{bytes_to_key, pbkdf2, DigestKind};
use crate::urlrec::UrlRecord;

use super::{Adapter, UnwrapContext};

const MAGIC: &[u8; 8] = b"Salted__";
const IV_LEN: usize = 16;

/// Key-derivation knobs for one OpenSSL-style envelope flavor.
pub struct DeriveParams {
    pub digest: DigestKind,
    /// `None` selects the legacy iterative digest stretch, `Some(n)` PBKDF2.
    pub iterations: Option<u32>,
    pub key_len: usize,
}

impl Default for DeriveParams {
    fn default() -> DeriveParams {
        DeriveParams {
            digest: DigestKind::Md5,
            iterations: None,
            key_len: 32,
        }
    }
}

fn cbc_decrypt(key: &[u8], iv: &[u8], ct: &[u8]) -> Result<Vec<u8>> {
    if ct.is_empty() || ct.len() % IV_LEN != 0 {
        return Err(UnpasteError::MalformedEnvelope(
            "ciphertext is not a whole number of cipher blocks".into(),
        ));
    }
    let bad_key = |_| UnpasteError::MalformedEnvelope("bad key/IV length".into());
    let plain = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(ct),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(ct),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(ct),
        n => {
            return Err(UnpasteError::UnsupportedParameters(format!(
                "AES key of {} bytes",
                n
            )))
        }
    };
    plain.map_err(|_| UnpasteError::MalformedEnvelope("bad PKCS#7 padding".into()))
}

/// Decrypt a `Salted__` envelope with the given derivation flavor.
pub fn unwrap_openssl(envelope: &[u8], passphrase: &str, params: &DeriveParams) -> Result<Vec<u8>> {
    if envelope.len() < MAGIC.len() + 8 || &envelope[..MAGIC.len()] != MAGIC {
        return Err(UnpasteError::MalformedEnvelope(
            "missing Salted__ magic".into(),
        ));
    }
    let salt = &envelope[MAGIC.len()..MAGIC.len() + 8];
    let ct = &envelope[MAGIC.len() + 8..];

    let material = match params.iterations {
        None => bytes_to_key(
            params.digest,
            salt,
            passphrase.as_bytes(),
            params.key_len + IV_LEN,
        ),
        Some(n) => pbkdf2(
            params.digest,
            passphrase.as_bytes(),
            salt,
            n,
            params.key_len + IV_LEN,
        ),
    };
    let (key, iv) = material.split_at(params.key_len);
    cbc_decrypt(key, iv, ct)
}

pub struct OpensslCbc;

impl Adapter for OpensslCbc {
    fn name(&self) -> &'static str {
        "openssl_cbc"
    }

    fn retrieve(&self, ctx: &UnwrapContext<'_>, url: &UrlRecord) -> Result<Vec<u8>> {
        let body = ctx.transport.get(&url.to_fetch_url())?;
        // Services serve either the raw envelope or its base64.
        let raw = if body.starts_with(MAGIC) {
            body
        } else {
            from_b64(String::from_utf8_lossy(&body).trim())?
        };
        let secret = ctx.secret_or_prompt("passphrase: ")?;
        unwrap_openssl(&raw, &secret, &DeriveParams::default())
    }
}

/// Encrypt side of the chain, for building test fixtures.
#[cfg(test)]
pub(crate) fn seal(
    passphrase: &str,
    salt: &[u8; 8],
    plaintext: &[u8],
    params: &DeriveParams,
) -> Vec<u8> {
    use aes::cipher::BlockEncryptMut;

    let material = match params.iterations {
        None => bytes_to_key(
            params.digest,
            salt,
            passphrase.as_bytes(),
            params.key_len + IV_LEN,
        ),
        Some(n) => pbkdf2(
            params.digest,
            passphrase.as_bytes(),
            salt,
            n,
            params.key_len + IV_LEN,
        ),
    };
    let (key, iv) = material.split_at(params.key_len);
    let ct = match params.key_len {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        _ => unreachable!(),
    };
    let mut envelope = MAGIC.to_vec();
    envelope.extend_from_slice(salt);
    envelope.extend_from_slice(&ct);
    envelope
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_md5_round_trip() {
        let params = DeriveParams::default();
        let envelope = seal("pw", &[0x11; 8], b"openssl enc style", &params);
        assert_eq!(
            unwrap_openssl(&envelope, "pw", &params).unwrap(),
            b"openssl enc style"
        );
    }

    #[test]
    fn pbkdf2_flavor_round_trip() {
        let params = DeriveParams {
            digest: DigestKind::Sha512,
            iterations: Some(1000),
            key_len: 32,
        };
        let envelope = seal("pw", &[0x22; 8], b"pbkdf2 flavor", &params);
        assert_eq!(
            unwrap_openssl(&envelope, "pw", &params).unwrap(),
            b"pbkdf2 flavor"
        );
    }

    #[test]
    fn garbled_magic_is_malformed_not_a_cipher_error() {
        let params = DeriveParams::default();
        let mut envelope = seal("pw", &[0x33; 8], b"x", &params);
        envelope[0] = b'X';
        assert!(matches!(
            unwrap_openssl(&envelope, "pw", &params),
            Err(UnpasteError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn wrong_passphrase_breaks_padding() {
        let params = DeriveParams::default();
        let envelope = seal("pw", &[0x44; 8], b"padded plaintext", &params);
        // A wrong key almost always yields an invalid pad byte.
        assert!(matches!(
            unwrap_openssl(&envelope, "nope", &params),
            Err(UnpasteError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn ragged_ciphertext_is_malformed() {
        let mut envelope = MAGIC.to_vec();
        envelope.extend_from_slice(&[0u8; 8]);
        envelope.extend_from_slice(&[0u8; 15]);
        assert!(matches!(
            unwrap_openssl(&envelope, "pw", &DeriveParams::default()),
            Err(UnpasteError::MalformedEnvelope(_))
        ));
    }
}
