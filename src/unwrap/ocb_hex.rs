//! Colon-delimited hex envelope decrypted with AES-128 OCB2.
//!
//! Envelope shape: `iterations:saltHex:ivHex:ciphertextHex`, where the
//! ciphertext field carries an 8-byte OCB2 tag at its end. The passphrase is
//! stretched with PBKDF2-HMAC-SHA256 to a 128-bit key; there is no associated
//! data.

use aes::Aes128;

use crate::codec::from_hex;
use crate::error::{Result, UnpasteError};
use crate::kdf::{pbkdf2, DigestKind};
use crate::ocb2;

use super::{Adapter, UnwrapContext};
use crate::urlrec::UrlRecord;

const KEY_LEN: usize = 16;

/// Parse and decrypt a colon-hex envelope.
pub fn unwrap_ocb_hex(envelope: &str, passphrase: &str) -> Result<Vec<u8>> {
    let mut parts = envelope.trim().split(':');
    let (Some(iter), Some(salt), Some(iv), Some(ct), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(UnpasteError::MalformedEnvelope(
            "expected iterations:salt:iv:ciphertext".into(),
        ));
    };

    let iterations: u32 = iter
        .parse()
        .map_err(|_| UnpasteError::MalformedEnvelope("bad iteration count".into()))?;
    let salt = from_hex(salt)?;
    let iv = from_hex(iv)?;
    let ct = from_hex(ct)?;

    let nonce: [u8; ocb2::BLOCK] = iv.as_slice().try_into().map_err(|_| {
        UnpasteError::MalformedEnvelope(format!("IV must be {} bytes", ocb2::BLOCK))
    })?;
    if ct.len() < ocb2::DEFAULT_TAG_LEN {
        return Err(UnpasteError::MalformedEnvelope(
            "ciphertext shorter than its tag".into(),
        ));
    }
    let (body, tag) = ct.split_at(ct.len() - ocb2::DEFAULT_TAG_LEN);

    let key = pbkdf2(DigestKind::Sha256, passphrase.as_bytes(), &salt, iterations, KEY_LEN);
    ocb2::open::<Aes128>(&key, &nonce, &[], body, tag)
}

pub struct OcbHex;

impl Adapter for OcbHex {
    fn name(&self) -> &'static str {
        "ocb_hex"
    }

    fn retrieve(&self, ctx: &UnwrapContext<'_>, url: &UrlRecord) -> Result<Vec<u8>> {
        let body = ctx.transport.get(&url.to_fetch_url())?;
        let text = String::from_utf8_lossy(&body);
        let secret = ctx.secret_or_prompt("passphrase: ")?;
        unwrap_ocb_hex(&text, &secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::to_hex;

    /// Build a fixture envelope with the encrypt side of the construction.
    fn seal_envelope(passphrase: &str, iterations: u32, plaintext: &[u8]) -> String {
        let salt = [0xA5u8; 16];
        let nonce = [0x3Cu8; 16];
        let key = pbkdf2(
            DigestKind::Sha256,
            passphrase.as_bytes(),
            &salt,
            iterations,
            KEY_LEN,
        );
        let (mut ct, tag) = crate::ocb2::seal(&key, &nonce, &[], plaintext, ocb2::DEFAULT_TAG_LEN);
        ct.extend_from_slice(&tag);
        format!(
            "{}:{}:{}:{}",
            iterations,
            to_hex(&salt),
            to_hex(&nonce),
            to_hex(&ct)
        )
    }

    #[test]
    fn end_to_end_colon_hex_fixture() {
        let envelope = seal_envelope("pw", 1000, b"attack at dawn");
        assert_eq!(unwrap_ocb_hex(&envelope, "pw").unwrap(), b"attack at dawn");
    }

    #[test]
    fn end_to_end_multi_block_fixture() {
        let plaintext = b"a message long enough to span multiple cipher blocks in the envelope";
        let envelope = seal_envelope("pw", 1000, plaintext);
        assert_eq!(unwrap_ocb_hex(&envelope, "pw").unwrap(), plaintext);
    }

    #[test]
    fn wrong_passphrase_fails_authentication() {
        let envelope = seal_envelope("pw", 1000, b"attack at dawn");
        assert!(matches!(
            unwrap_ocb_hex(&envelope, "pv"),
            Err(UnpasteError::AuthenticationFailed)
        ));
    }

    #[test]
    fn flipped_ciphertext_bit_fails_authentication() {
        let envelope = seal_envelope("pw", 100, b"payload");
        // Flip one bit by swapping a hex digit inside the ciphertext field
        let parts: Vec<&str> = envelope.split(':').collect();
        let first = parts[3].chars().next().unwrap();
        let flipped = if first == '0' { '1' } else { '0' };
        let tampered = format!(
            "{}:{}:{}:{}{}",
            parts[0],
            parts[1],
            parts[2],
            flipped,
            &parts[3][1..]
        );
        assert!(matches!(
            unwrap_ocb_hex(&tampered, "pw"),
            Err(UnpasteError::AuthenticationFailed)
        ));
    }

    #[test]
    fn missing_field_is_malformed() {
        assert!(matches!(
            unwrap_ocb_hex("1000:aabb:ccdd", "pw"),
            Err(UnpasteError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            unwrap_ocb_hex("1000:aa:bb:cc:dd", "pw"),
            Err(UnpasteError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn bad_iteration_count_is_malformed() {
        assert!(matches!(
            unwrap_ocb_hex("many:aa:bb:cc", "pw"),
            Err(UnpasteError::MalformedEnvelope(_))
        ));
    }
}
