/// Symmetric cipher for transporting secrets through untrusted channels.
///
/// The reset token travels inside a URL in an email, so the transported
/// form is AES-256-GCM with a fresh random 96-bit nonce per call, the nonce
/// prepended to the ciphertext, and the whole thing URL-safe base64
/// encoded. GCM authenticates the ciphertext, so a flipped bit, a truncated
/// string, or a wrong key all fail decryption outright — decrypt never
/// hands back plaintext-looking garbage.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::RngCore;
use std::fmt;

use crate::error::AuthError;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// Input is not valid base64 or is too short to hold a nonce.
    Malformed,
    /// Authentication failed: tampered ciphertext or wrong key.
    DecryptionFailed,
}

impl fmt::Display for CipherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherError::Malformed => write!(f, "ciphertext is malformed"),
            CipherError::DecryptionFailed => write!(f, "ciphertext failed authentication"),
        }
    }
}

impl std::error::Error for CipherError {}

// The only secret this core transports is a reset token, so an undecryptable
// input surfaces to callers as an unusable reset link.
impl From<CipherError> for AuthError {
    fn from(_: CipherError) -> Self {
        AuthError::InvalidResetLink
    }
}

pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        let key = aes_gcm::Key::<Aes256Gcm>::from(*key);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Builds the cipher from the configured base64-encoded key.
    pub fn from_base64_key(encoded: &str) -> Result<Self, AuthError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| AuthError::Internal("cipher key is not valid base64".to_string()))?;
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| AuthError::Internal("cipher key must decode to 32 bytes".to_string()))?;
        Ok(Self::new(&key))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, AuthError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| AuthError::Internal("encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    /// Fails closed on malformed input, a wrong key, and tampering.
    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| CipherError::Malformed)?;

        if bytes.len() <= NONCE_LEN {
            return Err(CipherError::Malformed);
        }
        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> TokenCipher {
        TokenCipher::new(&[7u8; KEY_LEN])
    }

    #[test]
    fn round_trip() {
        let c = cipher();
        let encrypted = c.encrypt("reset-token-123").expect("encrypt failed");

        assert_ne!(encrypted, "reset-token-123");
        assert_eq!(c.decrypt(&encrypted).unwrap(), "reset-token-123");
    }

    #[test]
    fn nonce_is_fresh_per_call() {
        let c = cipher();
        let a = c.encrypt("same input").unwrap();
        let b = c.encrypt("same input").unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let c = cipher();
        let encrypted = c.encrypt("reset-token-123").unwrap();

        let mut bytes = URL_SAFE_NO_PAD.decode(&encrypted).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(bytes);

        assert_eq!(c.decrypt(&tampered), Err(CipherError::DecryptionFailed));
    }

    #[test]
    fn wrong_key_fails() {
        let encrypted = cipher().encrypt("reset-token-123").unwrap();
        let other = TokenCipher::new(&[8u8; KEY_LEN]);

        assert_eq!(other.decrypt(&encrypted), Err(CipherError::DecryptionFailed));
    }

    #[test]
    fn garbage_input_fails_not_passes_through() {
        let c = cipher();

        // Not base64 at all
        assert!(c.decrypt("definitely not a token!").is_err());
        // Valid base64 but too short to even hold a nonce
        assert_eq!(c.decrypt("YWJj"), Err(CipherError::Malformed));
        // A plaintext-looking string must never come back as "decrypted"
        let plain = URL_SAFE_NO_PAD.encode(b"plaintext-legacy-value-here");
        assert!(c.decrypt(&plain).is_err());
    }

    #[test]
    fn key_decoding() {
        let encoded = STANDARD.encode([9u8; KEY_LEN]);
        assert!(TokenCipher::from_base64_key(&encoded).is_ok());

        assert!(TokenCipher::from_base64_key("not base64!!").is_err());
        let short = STANDARD.encode([9u8; 16]);
        assert!(TokenCipher::from_base64_key(&short).is_err());
    }
}
