//! Store configuration.

use std::path::{Path, PathBuf};

/// Size of one mapping page. Data files are always a multiple of this.
pub const DEFAULT_MMAP_SIZE: usize = 4096;

/// Identifier of the default store.
pub const DEFAULT_MMAP_ID: &str = "kvbridge.default";

/// Crypt keys longer than this are truncated.
pub const MAX_CRYPT_KEY_LEN: usize = 16;

/// Process sharing mode of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum Mode {
    /// Only this process touches the files.
    #[default]
    SingleProcess = 1,
    /// Several processes share the files under an advisory lock.
    MultiProcess = 2,
}

impl From<i32> for Mode {
    fn from(code: i32) -> Self {
        match code {
            2 => Mode::MultiProcess,
            _ => Mode::SingleProcess,
        }
    }
}

/// Options for opening a store.
///
/// Identity is `(id, root_path)`. The crypt key and capacity hint only
/// apply when the call actually creates the instance.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Store identifier.
    pub id: String,
    /// Process sharing mode.
    pub mode: Mode,
    /// Crypt key, `None` for a plain store.
    pub crypt_key: Option<Vec<u8>>,
    /// Root directory. `None` uses the directory given to `initialize`.
    pub root_path: Option<PathBuf>,
    /// Initial file size hint in bytes.
    pub expected_capacity: u64,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            id: DEFAULT_MMAP_ID.to_string(),
            mode: Mode::SingleProcess,
            crypt_key: None,
            root_path: None,
            expected_capacity: 0,
        }
    }
}

impl OpenOptions {
    /// Creates options for the given identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the process sharing mode.
    #[must_use]
    pub const fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the crypt key. An empty key means no encryption.
    #[must_use]
    pub fn crypt_key(mut self, key: impl AsRef<[u8]>) -> Self {
        let key = key.as_ref();
        self.crypt_key = if key.is_empty() {
            None
        } else {
            Some(key[..key.len().min(MAX_CRYPT_KEY_LEN)].to_vec())
        };
        self
    }

    /// Sets the root directory.
    #[must_use]
    pub fn root_path(mut self, path: impl AsRef<Path>) -> Self {
        self.root_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the initial file size hint.
    #[must_use]
    pub const fn expected_capacity(mut self, bytes: u64) -> Self {
        self.expected_capacity = bytes;
        self
    }
}

/// Rounds `len` up to a whole number of pages, never below one page.
pub(crate) fn round_to_page(len: u64) -> u64 {
    let page = DEFAULT_MMAP_SIZE as u64;
    len.max(1).div_ceil(page) * page
}
