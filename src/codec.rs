//! Byte/string codecs shared by the unwrap adapters.
//!
//! Envelope fields arrive hex-, base64- or base58-encoded depending on the
//! scheme, frequently with sloppy padding or stray whitespace, so the decode
//! helpers here are deliberately tolerant. Encoding is only needed for
//! diagnostics and URL construction.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::error::{Result, UnpasteError};

/// Decode a hex field, ignoring ASCII whitespace.
pub fn from_hex(s: &str) -> Result<Vec<u8>> {
    let compact: String = s.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(&compact).map_err(|e| UnpasteError::MalformedEnvelope(format!("bad hex: {}", e)))
}

/// Encode bytes as lowercase hex.
pub fn to_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode base64 accepting the standard and URL-safe alphabets, padded or not.
///
/// The engines are tried in order; the first that accepts the input wins.
/// Whitespace (newline-wrapped blobs are common) is stripped first.
pub fn from_b64(s: &str) -> Result<Vec<u8>> {
    let compact: String = s.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    for engine in [&STANDARD, &STANDARD_NO_PAD, &URL_SAFE, &URL_SAFE_NO_PAD] {
        if let Ok(bytes) = engine.decode(&compact) {
            return Ok(bytes);
        }
    }
    Err(UnpasteError::MalformedEnvelope("bad base64".into()))
}

/// Encode bytes as standard padded base64.
pub fn to_b64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode a base58 string (Bitcoin alphabet).
pub fn from_b58(s: &str) -> Result<Vec<u8>> {
    bs58::decode(s.trim())
        .into_vec()
        .map_err(|e| UnpasteError::MalformedEnvelope(format!("bad base58: {}", e)))
}

/// Recover text from bytes that may have been mis-encoded by the producer.
///
/// Some producers encoded arbitrary binary plaintext as if it were UTF-8 text
/// before compressing. The compatible reversal is: try a strict UTF-8 decode;
/// on failure, reinterpret every byte as the Latin-1 scalar with the same
/// value and re-encode as UTF-8. A heuristic, not a guaranteed-correct
/// transform.
pub fn widen_latin1(data: Vec<u8>) -> Vec<u8> {
    match String::from_utf8(data) {
        Ok(s) => s.into_bytes(),
        Err(e) => {
            let bytes = e.into_bytes();
            let widened: String = bytes.iter().map(|&b| char::from(b)).collect();
            widened.into_bytes()
        }
    }
}
