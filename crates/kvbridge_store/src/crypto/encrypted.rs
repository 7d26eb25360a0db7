//! AES-256-GCM record cipher.

use super::SALT_SIZE;
use crate::error::{StoreError, StoreResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::Zeroize;

/// Size of the derived AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Seals and opens record bodies.
pub struct RecordCipher {
    cipher: Aes256Gcm,
}

impl RecordCipher {
    /// Derives a cipher from a crypt key and the file's salt.
    pub fn new(key: &[u8], salt: &[u8; SALT_SIZE]) -> StoreResult<Self> {
        use hkdf::Hkdf;
        use sha2::Sha256;

        if key.is_empty() {
            return Err(StoreError::invalid_argument("empty crypt key"));
        }

        let hk = Hkdf::<Sha256>::new(Some(&salt[..]), key);
        let mut derived = [0u8; KEY_SIZE];
        hk.expand(b"kvbridge-record-key-v1", &mut derived)
            .map_err(|_| StoreError::encryption_failed("HKDF expand failed"))?;

        let cipher = Aes256Gcm::new(GenericArray::from_slice(&derived));
        derived.zeroize();

        Ok(Self { cipher })
    }

    /// Seals a record body.
    ///
    /// The output format is: `nonce (12 bytes) || ciphertext || tag (16 bytes)`
    pub fn seal(&self, plaintext: &[u8]) -> StoreResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| StoreError::encryption_failed("encryption error"))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend(ciphertext);
        Ok(result)
    }

    /// Opens a body produced by [`seal`](Self::seal).
    ///
    /// # Errors
    ///
    /// Returns an error if the key is wrong or the data was altered.
    pub fn open(&self, sealed: &[u8]) -> StoreResult<Vec<u8>> {
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(StoreError::decryption_failed("ciphertext too short"));
        }

        let nonce = Nonce::from_slice(&sealed[..NONCE_SIZE]);
        self.cipher
            .decrypt(nonce, &sealed[NONCE_SIZE..])
            .map_err(|_| StoreError::decryption_failed("decryption error"))
    }
}

impl std::fmt::Debug for RecordCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Generates a fresh random salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let cipher = RecordCipher::new(b"secret", &generate_salt()).unwrap();
        let sealed = cipher.seal(b"hello").unwrap();
        assert_eq!(sealed.len(), NONCE_SIZE + 5 + TAG_SIZE);
        assert_eq!(cipher.open(&sealed).unwrap(), b"hello");
    }

    #[test]
    fn seal_produces_different_ciphertext() {
        let cipher = RecordCipher::new(b"secret", &generate_salt()).unwrap();
        let a = cipher.seal(b"same").unwrap();
        let b = cipher.seal(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails() {
        let salt = generate_salt();
        let a = RecordCipher::new(b"key-a", &salt).unwrap();
        let b = RecordCipher::new(b"key-b", &salt).unwrap();
        let sealed = a.seal(b"data").unwrap();
        assert!(b.open(&sealed).is_err());
    }

    #[test]
    fn different_salt_fails() {
        let a = RecordCipher::new(b"key", &generate_salt()).unwrap();
        let b = RecordCipher::new(b"key", &generate_salt()).unwrap();
        let sealed = a.seal(b"data").unwrap();
        assert!(b.open(&sealed).is_err());
    }

    #[test]
    fn tampered_data_fails() {
        let cipher = RecordCipher::new(b"key", &generate_salt()).unwrap();
        let mut sealed = cipher.seal(b"data").unwrap();
        sealed[NONCE_SIZE] ^= 0xFF;
        assert!(cipher.open(&sealed).is_err());
    }

    #[test]
    fn too_short_fails() {
        let cipher = RecordCipher::new(b"key", &generate_salt()).unwrap();
        assert!(cipher.open(&[0u8; 10]).is_err());
    }

    #[test]
    fn empty_key_rejected() {
        assert!(RecordCipher::new(b"", &generate_salt()).is_err());
    }

    #[test]
    fn debug_is_redacted() {
        let cipher = RecordCipher::new(b"secret", &generate_salt()).unwrap();
        assert!(!format!("{cipher:?}").contains("secret"));
    }
}
