//! Message confidentiality. Payloads are encrypted before they reach the
//! ledger, which only ever sees the resulting hex string.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("key must be {} hex characters", KEY_LEN * 2)]
    InvalidKey,
    #[error("encryption failed")]
    Encryption,
    #[error("payload is not hex nonce||ciphertext")]
    MalformedPayload,
    #[error("decryption failed: wrong key or corrupted payload")]
    Decryption,
    #[error("decrypted payload is not valid UTF-8")]
    NotUtf8,
}

pub struct MessageCipher {
    cipher: ChaCha20Poly1305,
}

impl MessageCipher {
    pub fn from_hex_key(key_hex: &str) -> Result<Self, CipherError> {
        let bytes = hex::decode(key_hex.trim()).map_err(|_| CipherError::InvalidKey)?;
        if bytes.len() != KEY_LEN {
            return Err(CipherError::InvalidKey);
        }
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&bytes)),
        })
    }

    /// Returns hex(`nonce || ciphertext`) with a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CipherError::Encryption)?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(hex::encode(payload))
    }

    pub fn decrypt(&self, payload_hex: &str) -> Result<String, CipherError> {
        let payload = hex::decode(payload_hex).map_err(|_| CipherError::MalformedPayload)?;
        if payload.len() < NONCE_LEN {
            return Err(CipherError::MalformedPayload);
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::Decryption)?;
        String::from_utf8(plaintext).map_err(|_| CipherError::NotUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::{CipherError, MessageCipher};

    const KEY: &str = "1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";

    #[test]
    fn decrypts_what_it_encrypted() {
        let cipher = MessageCipher::from_hex_key(KEY).unwrap();
        let sealed = cipher.encrypt("Hello, Blockchain!").unwrap();
        assert_ne!(sealed, "Hello, Blockchain!");
        assert_eq!(cipher.decrypt(&sealed).unwrap(), "Hello, Blockchain!");
    }

    #[test]
    fn nonces_differ_between_calls() {
        let cipher = MessageCipher::from_hex_key(KEY).unwrap();
        assert_ne!(cipher.encrypt("same").unwrap(), cipher.encrypt("same").unwrap());
    }

    #[test]
    fn wrong_key_is_reported() {
        let sealed = MessageCipher::from_hex_key(KEY).unwrap().encrypt("secret").unwrap();
        let other = MessageCipher::from_hex_key(&"ab".repeat(32)).unwrap();
        assert_eq!(other.decrypt(&sealed), Err(CipherError::Decryption));
    }

    #[test]
    fn rejects_bad_keys_and_payloads() {
        assert!(matches!(
            MessageCipher::from_hex_key("short"),
            Err(CipherError::InvalidKey)
        ));
        let cipher = MessageCipher::from_hex_key(KEY).unwrap();
        assert_eq!(cipher.decrypt("zz"), Err(CipherError::MalformedPayload));
        assert_eq!(cipher.decrypt("abcd"), Err(CipherError::MalformedPayload));
    }
}
