//! Fixed-derivation envelopes: the secret alone yields key, IV and the
//! download location.
//!
//! SHA-512 of the base64-decoded secret is split into a 32-byte AES key, a
//! 16-byte IV and a 16-byte identifier; the identifier's hex spelling is the
//! download path. The body is bare AES-256-CCM ciphertext with a 64-bit tag.

use sha2::{Digest, Sha512};

use crate::aead::{self, AeadMode};
use crate::codec::{from_b64, to_hex};
use crate::error::{Result, UnpasteError};
use crate::urlrec::{Field, UrlRecord};

use super::{Adapter, UnwrapContext};

const TAG_LEN: usize = 8;

struct Material {
    key: [u8; 32],
    iv: [u8; 16],
    id: [u8; 16],
}

fn derive_material(secret: &str) -> Result<Material> {
    let decoded = from_b64(secret)?;
    let digest = Sha512::digest(&decoded);
    let mut material = Material {
        key: [0; 32],
        iv: [0; 16],
        id: [0; 16],
    };
    material.key.copy_from_slice(&digest[..32]);
    material.iv.copy_from_slice(&digest[32..48]);
    material.id.copy_from_slice(&digest[48..64]);
    Ok(material)
}

/// Decrypt a fetched body under the derived key and IV.
pub fn unwrap_fixed_key(body: &[u8], secret: &str) -> Result<Vec<u8>> {
    let material = derive_material(secret)?;
    aead::open(
        AeadMode::Ccm,
        &material.key,
        &material.iv,
        &[],
        body,
        TAG_LEN,
    )
}

pub struct FixedKey;

impl Adapter for FixedKey {
    fn name(&self) -> &'static str {
        "fixed_key"
    }

    fn retrieve(&self, ctx: &UnwrapContext<'_>, url: &UrlRecord) -> Result<Vec<u8>> {
        let secret = ctx.secret_or_prompt("secret: ")?;
        let material = derive_material(&secret)?;
        let scheme = match url.get(Field::Scheme) {
            "" => "https",
            s => s,
        };
        let host = url.get(Field::Host);
        if host.is_empty() {
            return Err(UnpasteError::BadUrl(url.to_string()));
        }
        let fetch_url = format!("{}://{}/dl/{}", scheme, host, to_hex(&material.id));
        let body = ctx.transport.get(&fetch_url)?;
        aead::open(
            AeadMode::Ccm,
            &material.key,
            &material.iv,
            &[],
            &body,
            TAG_LEN,
        )
    }
}
