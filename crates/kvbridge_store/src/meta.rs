//! Meta side file and the inter-process lock.
//!
//! Every data file `<name>` has a companion `<name>.crc`:
//!
//! ```text
//! | magic (4) | version (4) | crc (4) | sequence (4) | actual_size (4) | salt (16) |
//! | flags (4) | default_expire (4) | reserved (20) |
//! ```
//!
//! The meta file doubles as the lock file in multi-process mode. Other
//! processes detect changes by comparing `(sequence, crc, actual_size)`.

use crate::crypto::SALT_SIZE;
use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Magic bytes of a meta file.
const META_MAGIC: [u8; 4] = *b"KVBM";
/// Current meta format version.
const META_VERSION: u32 = 1;
/// Encoded size of a meta block.
pub const META_SIZE: usize = 64;

/// Suffix of meta files.
pub const META_SUFFIX: &str = ".crc";

/// Returns the meta path for a data path.
pub fn meta_path(data_path: &Path) -> PathBuf {
    let mut name = data_path.as_os_str().to_os_string();
    name.push(META_SUFFIX);
    PathBuf::from(name)
}

/// Contents of a meta file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Meta {
    /// CRC32 of the record region.
    pub crc: u32,
    /// Bumped on every full rewrite.
    pub sequence: u32,
    /// Length of the record region.
    pub actual_size: u32,
    /// Key derivation salt.
    pub salt: [u8; SALT_SIZE],
    /// Feature bits, see [`Meta::EXPIRE_ENABLED`].
    pub flags: u32,
    /// Default expiration duration in seconds, `0` meaning never.
    pub default_expire: u32,
}

impl Meta {
    /// Auto-expiration is on.
    pub const EXPIRE_ENABLED: u32 = 1;

    /// Returns true if auto-expiration is on.
    pub fn expire_enabled(&self) -> bool {
        self.flags & Self::EXPIRE_ENABLED != 0
    }

    /// Encodes to a fixed-size block.
    pub fn encode(&self) -> [u8; META_SIZE] {
        let mut out = [0u8; META_SIZE];
        out[0..4].copy_from_slice(&META_MAGIC);
        out[4..8].copy_from_slice(&META_VERSION.to_le_bytes());
        out[8..12].copy_from_slice(&self.crc.to_le_bytes());
        out[12..16].copy_from_slice(&self.sequence.to_le_bytes());
        out[16..20].copy_from_slice(&self.actual_size.to_le_bytes());
        out[20..20 + SALT_SIZE].copy_from_slice(&self.salt);
        out[36..40].copy_from_slice(&self.flags.to_le_bytes());
        out[40..44].copy_from_slice(&self.default_expire.to_le_bytes());
        out
    }

    /// Decodes a block. An all-zero block decodes to the default.
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        if bytes.len() < META_SIZE {
            return Err(StoreError::corrupted(format!(
                "meta block too short: {} bytes",
                bytes.len()
            )));
        }
        if bytes[..META_SIZE].iter().all(|b| *b == 0) {
            return Ok(Self::default());
        }
        if bytes[0..4] != META_MAGIC {
            return Err(StoreError::corrupted("bad meta magic"));
        }
        let version = read_u32(&bytes[4..8]);
        if version != META_VERSION {
            return Err(StoreError::corrupted(format!(
                "unsupported meta version {version}"
            )));
        }
        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&bytes[20..20 + SALT_SIZE]);
        Ok(Self {
            crc: read_u32(&bytes[8..12]),
            sequence: read_u32(&bytes[12..16]),
            actual_size: read_u32(&bytes[16..20]),
            salt,
            flags: read_u32(&bytes[36..40]),
            default_expire: read_u32(&bytes[40..44]),
        })
    }
}

#[inline]
pub(crate) fn read_u32(slice: &[u8]) -> u32 {
    u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]])
}

/// Open handle on a meta file.
#[derive(Debug)]
pub struct MetaFile {
    file: File,
    lock_depth: u32,
}

impl MetaFile {
    /// Opens or creates the meta file next to `data_path`.
    pub fn open(data_path: &Path) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(meta_path(data_path))?;
        Ok(Self {
            file,
            lock_depth: 0,
        })
    }

    /// Reads the current meta block. A missing or short file reads as default.
    pub fn read(&self) -> StoreResult<Meta> {
        let mut buf = [0u8; META_SIZE];
        let mut f = &self.file;
        f.seek(SeekFrom::Start(0))?;
        let mut filled = 0;
        while filled < META_SIZE {
            let n = f.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled < META_SIZE {
            return Ok(Meta::default());
        }
        Meta::decode(&buf)
    }

    /// Writes a meta block.
    pub fn write(&self, meta: &Meta) -> StoreResult<()> {
        let mut f = &self.file;
        f.seek(SeekFrom::Start(0))?;
        f.write_all(&meta.encode())?;
        Ok(())
    }

    /// Flushes the meta file to disk.
    pub fn sync(&self) -> StoreResult<()> {
        self.file.sync_data()?;
        Ok(())
    }

    /// Takes the exclusive inter-process lock, blocking. Re-entrant.
    pub fn lock(&mut self) -> StoreResult<()> {
        if self.lock_depth == 0 {
            self.file.lock_exclusive()?;
        }
        self.lock_depth += 1;
        Ok(())
    }

    /// Tries to take the exclusive lock without blocking.
    pub fn try_lock(&mut self) -> StoreResult<()> {
        if self.lock_depth == 0 && self.file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }
        self.lock_depth += 1;
        Ok(())
    }

    /// Releases one level of the lock.
    pub fn unlock(&mut self) -> StoreResult<()> {
        match self.lock_depth {
            0 => Ok(()),
            1 => {
                self.lock_depth = 0;
                FileExt::unlock(&self.file)?;
                Ok(())
            }
            _ => {
                self.lock_depth -= 1;
                Ok(())
            }
        }
    }

    /// Returns true if this handle holds the lock.
    pub fn is_locked(&self) -> bool {
        self.lock_depth > 0
    }
}
