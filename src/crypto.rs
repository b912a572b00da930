//! Password-based content encryption.
//!
//! The payload must be decryptable by the in-browser script through the
//! WebCrypto API, so every parameter is pinned rather than left to library
//! defaults: PBKDF2-HMAC-SHA256 at 100 000 iterations over a 16-byte salt
//! derives a 256-bit AES-GCM key; a fresh 12-byte nonce is drawn per call;
//! the GCM tag stays appended to the ciphertext (the layout WebCrypto
//! produces and consumes). Wire format, three colon-separated segments:
//!
//! ```text
//! base64(salt):base64(nonce):base64(ciphertext || tag)
//! ```

use crate::error::{Error, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

fn derive_key(password: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Encrypts a UTF-8 body for embedding in a post page.
///
/// Salt and nonce are drawn fresh per call, so encrypting the same
/// plaintext with the same password twice never yields the same payload.
pub fn encrypt(plaintext: &str, password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| Error::Render("content encryption failed".to_string()))?;

    Ok(format!(
        "{}:{}:{}",
        BASE64.encode(salt),
        BASE64.encode(nonce),
        BASE64.encode(&ciphertext)
    ))
}

/// Inverse of [`encrypt`]; mirrors what the browser-side decryptor does.
///
/// A malformed payload or a wrong password is an error, never garbage
/// output (the GCM tag authenticates the ciphertext).
pub fn decrypt(payload: &str, password: &str) -> Result<String> {
    let corrupted = || Error::Render("corrupted encrypted payload".to_string());

    let parts: Vec<&str> = payload.split(':').collect();
    if parts.len() != 3 {
        return Err(corrupted());
    }

    let salt = BASE64.decode(parts[0]).map_err(|_| corrupted())?;
    let nonce = BASE64.decode(parts[1]).map_err(|_| corrupted())?;
    let ciphertext = BASE64.decode(parts[2]).map_err(|_| corrupted())?;
    if salt.len() != SALT_LEN || nonce.len() != NONCE_LEN {
        return Err(corrupted());
    }

    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
        .map_err(|_| Error::Render("wrong password or tampered payload".to_string()))?;

    String::from_utf8(plaintext).map_err(|_| corrupted())
}
