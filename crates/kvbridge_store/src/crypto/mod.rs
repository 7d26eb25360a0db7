//! Record encryption.
//!
//! Encrypted stores seal every record body with AES-256-GCM. The cipher
//! key is derived from the caller's crypt key (at most 16 bytes) and a
//! per-file salt kept in the meta file, so re-keying only needs a new salt
//! and a rewrite.
//!
//! Encryption is optional and must be enabled via the `encryption` feature.

/// Size of the per-file salt.
pub const SALT_SIZE: usize = 16;

#[cfg(feature = "encryption")]
mod encrypted;

#[cfg(feature = "encryption")]
pub use encrypted::*;

/// Module contents when encryption feature is disabled.
#[cfg(not(feature = "encryption"))]
mod stub {
    use super::SALT_SIZE;
    use crate::error::{StoreError, StoreResult};

    /// Record cipher (stub when encryption disabled).
    #[derive(Debug)]
    pub struct RecordCipher {
        _private: (),
    }

    impl RecordCipher {
        /// Always returns an error when encryption is disabled.
        pub fn new(_key: &[u8], _salt: &[u8; SALT_SIZE]) -> StoreResult<Self> {
            Err(StoreError::encryption_not_enabled())
        }

        /// Always returns an error when encryption is disabled.
        pub fn seal(&self, _plaintext: &[u8]) -> StoreResult<Vec<u8>> {
            Err(StoreError::encryption_not_enabled())
        }

        /// Always returns an error when encryption is disabled.
        pub fn open(&self, _sealed: &[u8]) -> StoreResult<Vec<u8>> {
            Err(StoreError::encryption_not_enabled())
        }
    }

    /// Salt of a plain store.
    pub fn generate_salt() -> [u8; SALT_SIZE] {
        [0u8; SALT_SIZE]
    }
}

#[cfg(not(feature = "encryption"))]
pub use stub::*;
