//! Process-wide instance registry.
//!
//! Maps data file paths to open stores so that opening the same identifier
//! under the same root twice yields the same instance.

use crate::config::{Mode, OpenOptions, DEFAULT_MMAP_ID};
use crate::error::{StoreError, StoreResult};
use crate::log::{self, LogLevel};
use crate::meta::meta_path;
use crate::store::{validate_files, Store};
use crate::{kv_info, kv_warn};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

/// Sub-directory for identifiers that are not valid file names.
pub const SPECIAL_DIR: &str = "special";

const SPECIAL_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

#[derive(Default)]
struct Registry {
    root: Option<PathBuf>,
    stores: HashMap<PathBuf, Arc<Store>>,
}

static REGISTRY: LazyLock<Mutex<Registry>> = LazyLock::new(|| Mutex::new(Registry::default()));

/// Sets the default root directory and the minimum log level.
///
/// May be called again to move the default root; open stores are kept.
pub fn initialize(root: impl AsRef<Path>, level: LogLevel) -> StoreResult<()> {
    let root = root.as_ref();
    if root.as_os_str().is_empty() {
        return Err(StoreError::invalid_argument("empty root directory"));
    }
    fs::create_dir_all(root)?;
    log::set_level(level);
    REGISTRY.lock().root = Some(root.to_path_buf());
    kv_info!("root dir: {}", root.display());
    Ok(())
}

/// Flushes and closes every open store and forgets the root directory.
pub fn on_exit() {
    let stores: Vec<Arc<Store>> = {
        let mut registry = REGISTRY.lock();
        registry.root = None;
        registry.stores.drain().map(|(_, store)| store).collect()
    };
    for store in stores {
        store.close();
    }
}

/// Returns the default root directory, if initialized.
pub fn root_dir() -> Option<PathBuf> {
    REGISTRY.lock().root.clone()
}

/// File name used for an identifier.
///
/// Identifiers containing path separators or other reserved characters are
/// hashed into the `special` sub-directory.
pub fn mapped_name(id: &str) -> PathBuf {
    if id.contains(SPECIAL_CHARS) {
        let digest = Sha256::digest(id.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Path::new(SPECIAL_DIR).join(hex)
    } else {
        PathBuf::from(id)
    }
}

/// Data file path of `id` under `root`, or under the default root.
pub fn data_path(id: &str, root: Option<&Path>) -> StoreResult<PathBuf> {
    if id.is_empty() {
        return Err(StoreError::invalid_argument("empty store id"));
    }
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => root_dir().ok_or(StoreError::NotInitialized)?,
    };
    Ok(root.join(mapped_name(id)))
}

/// Opens a store, or returns the instance already open for the same path.
pub fn open(options: &OpenOptions) -> StoreResult<Arc<Store>> {
    let path = data_path(&options.id, options.root_path.as_deref())?;
    let mut registry = REGISTRY.lock();
    if let Some(store) = registry.stores.get(&path) {
        return Ok(Arc::clone(store));
    }
    let store = Arc::new(Store::open(&options.id, &path, options)?);
    registry.stores.insert(path, Arc::clone(&store));
    Ok(store)
}

/// Opens the default store under the default root.
pub fn open_default(mode: Mode, crypt_key: Option<&[u8]>) -> StoreResult<Arc<Store>> {
    let mut options = OpenOptions::new(DEFAULT_MMAP_ID).mode(mode);
    if let Some(key) = crypt_key {
        options = options.crypt_key(key);
    }
    open(&options)
}

/// Returns the open instance for a data path.
pub fn lookup(path: &Path) -> Option<Arc<Store>> {
    REGISTRY.lock().stores.get(path).cloned()
}

/// Closes a store and drops it from the registry.
pub fn close(store: &Store) {
    {
        let mut registry = REGISTRY.lock();
        let registered = registry
            .stores
            .get(store.path())
            .is_some_and(|s| std::ptr::eq(Arc::as_ptr(s), store));
        if registered {
            registry.stores.remove(store.path());
        }
    }
    store.close();
}

/// Returns true if a store's files are intact. Missing files count as valid.
pub fn is_file_valid(id: &str, root: Option<&Path>) -> bool {
    let Ok(path) = data_path(id, root) else {
        return false;
    };
    if !path.exists() {
        return true;
    }
    match validate_files(&path) {
        Ok(()) => true,
        Err(err) => {
            kv_warn!("[{id}] invalid files: {err}");
            false
        }
    }
}

/// Closes the store if open and deletes its files.
pub fn remove_storage(id: &str, root: Option<&Path>) -> StoreResult<()> {
    let path = data_path(id, root)?;
    let open = REGISTRY.lock().stores.remove(&path);
    if let Some(store) = open {
        store.close();
    }
    remove_if_exists(&path)?;
    remove_if_exists(&meta_path(&path))?;
    kv_info!("[{id}] storage removed");
    Ok(())
}

fn remove_if_exists(path: &Path) -> StoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn plain_ids_map_to_themselves() {
        assert_eq!(mapped_name("settings"), PathBuf::from("settings"));
    }

    #[test]
    fn special_ids_are_hashed() {
        let name = mapped_name("a/b:c");
        assert!(name.starts_with(SPECIAL_DIR));
        assert_eq!(name.file_name().unwrap().len(), 64);
        assert_eq!(name, mapped_name("a/b:c"));
        assert_ne!(name, mapped_name("a/b:d"));
    }

    #[test]
    fn explicit_root_needs_no_initialize() {
        let dir = tempdir().unwrap();
        let path = data_path("x", Some(dir.path())).unwrap();
        assert_eq!(path, dir.path().join("x"));
        assert!(data_path("", Some(dir.path())).is_err());
    }

    #[test]
    fn open_is_idempotent() {
        let dir = tempdir().unwrap();
        let options = OpenOptions::new("same").root_path(dir.path());
        let a = open(&options).unwrap();
        let b = open(&options.clone().expected_capacity(1 << 16)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let other = open(&OpenOptions::new("different").root_path(dir.path())).unwrap();
        assert!(!Arc::ptr_eq(&a, &other));

        close(&a);
        assert!(a.is_closed());
        let reopened = open(&options).unwrap();
        assert!(!Arc::ptr_eq(&a, &reopened));
        close(&reopened);
        close(&other);
    }

    #[test]
    fn remove_storage_deletes_files() {
        let dir = tempdir().unwrap();
        let options = OpenOptions::new("doomed").root_path(dir.path());
        let store = open(&options).unwrap();
        store.set("k", 1i32, None).unwrap();

        remove_storage("doomed", Some(dir.path())).unwrap();
        assert!(store.is_closed());
        assert!(!dir.path().join("doomed").exists());
        assert!(!dir.path().join("doomed.crc").exists());

        let fresh = open(&options).unwrap();
        assert_eq!(fresh.count(false), 0);
        close(&fresh);
    }

    #[test]
    fn file_validity() {
        let dir = tempdir().unwrap();
        assert!(is_file_valid("nothing", Some(dir.path())));

        let store = open(&OpenOptions::new("checked").root_path(dir.path())).unwrap();
        store.set_bytes("k", b"v", None).unwrap();
        store.sync(true).unwrap();
        assert!(is_file_valid("checked", Some(dir.path())));
        close(&store);
    }
}
