//! Credential encryption
//!
//! AES-256-GCM with a random 96-bit nonce per message. Payloads are stored
//! as `hex(nonce):hex(ciphertext || tag)`.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use thiserror::Error;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Debug, Error, PartialEq)]
pub enum CryptoError {
    #[error("Encryption key must be {} hex characters", KEY_LEN * 2)]
    InvalidKey,

    #[error("Malformed ciphertext")]
    Malformed,

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed")]
    Decrypt,
}

/// Encrypts and decrypts exchange API secrets
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialCipher")
    }
}

impl CredentialCipher {
    /// Build from a 64 character hex key
    pub fn from_hex_key(hex_key: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| CryptoError::InvalidKey)?;
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKey);
        }
        let key = Key::<Aes256Gcm>::from_slice(&bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Fresh random key, hex encoded
    pub fn generate_hex_key() -> String {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        hex::encode(key)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        Ok(format!("{}:{}", hex::encode(nonce_bytes), hex::encode(ciphertext)))
    }

    pub fn decrypt(&self, payload: &str) -> Result<String, CryptoError> {
        let (nonce_hex, ct_hex) = payload.split_once(':').ok_or(CryptoError::Malformed)?;
        let nonce_bytes = hex::decode(nonce_hex).map_err(|_| CryptoError::Malformed)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CryptoError::Malformed);
        }
        let ciphertext = hex::decode(ct_hex).map_err(|_| CryptoError::Malformed)?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| CryptoError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::Decrypt)
    }
}

/// Show only the first and last four characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> CredentialCipher {
        CredentialCipher::from_hex_key(&"ab".repeat(32)).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt() {
        let c = cipher();
        let payload = c.encrypt("my-api-secret").unwrap();
        let (nonce, _) = payload.split_once(':').unwrap();
        assert_eq!(nonce.len(), NONCE_LEN * 2);
        assert_eq!(c.decrypt(&payload).unwrap(), "my-api-secret");
    }

    #[test]
    fn test_nonce_is_random() {
        let c = cipher();
        assert_ne!(c.encrypt("same").unwrap(), c.encrypt("same").unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let payload = cipher().encrypt("secret").unwrap();
        let other = CredentialCipher::from_hex_key(&"cd".repeat(32)).unwrap();
        assert_eq!(other.decrypt(&payload), Err(CryptoError::Decrypt));
    }

    #[test]
    fn test_tampered_and_malformed() {
        let c = cipher();
        let payload = c.encrypt("secret").unwrap();
        let mut tampered = payload.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert_eq!(c.decrypt(&tampered), Err(CryptoError::Decrypt));

        assert_eq!(c.decrypt("no-separator"), Err(CryptoError::Malformed));
        assert_eq!(c.decrypt("zz:00"), Err(CryptoError::Malformed));
        assert_eq!(c.decrypt("00:00"), Err(CryptoError::Malformed));
    }

    #[test]
    fn test_invalid_keys() {
        assert!(CredentialCipher::from_hex_key("abcd").is_err());
        assert!(CredentialCipher::from_hex_key(&"zz".repeat(32)).is_err());
        assert!(CredentialCipher::from_hex_key(&CredentialCipher::generate_hex_key()).is_ok());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("ABCD1234WXYZ"), "ABCD****WXYZ");
        assert_eq!(mask_secret("short"), "*****");
    }
}
