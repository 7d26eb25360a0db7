//! Backup and restore.
//!
//! A backup of a store is a copy of its data file and meta file under the
//! same mapped name in the target directory. Open stores are flushed before
//! being copied and reloaded after being restored into.

use crate::error::{StoreError, StoreResult};
use crate::meta::{meta_path, META_SUFFIX};
use crate::registry::{self, mapped_name, SPECIAL_DIR};
use crate::store::copy_pair;
use crate::{kv_error, kv_info};
use std::fs;
use std::path::{Path, PathBuf};

/// Backs up one store from `src_root` (or the default root) into `dst_dir`.
pub fn backup_one(id: &str, dst_dir: &Path, src_root: Option<&Path>) -> StoreResult<()> {
    let src = registry::data_path(id, src_root)?;
    backup_path(&src, &dst_dir.join(mapped_name(id)))?;
    kv_info!("[{id}] backed up to {}", dst_dir.display());
    Ok(())
}

/// Restores one store from `src_dir` into `dst_root` (or the default root).
pub fn restore_one(id: &str, src_dir: &Path, dst_root: Option<&Path>) -> StoreResult<()> {
    let dst = registry::data_path(id, dst_root)?;
    restore_path(&src_dir.join(mapped_name(id)), &dst)?;
    kv_info!("[{id}] restored from {}", src_dir.display());
    Ok(())
}

/// Backs up every store found in `src_root` (or the default root).
///
/// Returns how many stores were copied.
pub fn backup_all(dst_dir: &Path, src_root: Option<&Path>) -> StoreResult<usize> {
    let src_root = resolve_root(src_root)?;
    let mut copied = 0;
    for name in list_stores(&src_root)? {
        match backup_path(&src_root.join(&name), &dst_dir.join(&name)) {
            Ok(()) => copied += 1,
            Err(err) => kv_error!("backup of {} failed: {err}", name.display()),
        }
    }
    Ok(copied)
}

/// Restores every store found in `src_dir` into `dst_root` (or the
/// default root).
///
/// Returns how many stores were restored.
pub fn restore_all(src_dir: &Path, dst_root: Option<&Path>) -> StoreResult<usize> {
    let dst_root = resolve_root(dst_root)?;
    let mut restored = 0;
    for name in list_stores(src_dir)? {
        match restore_path(&src_dir.join(&name), &dst_root.join(&name)) {
            Ok(()) => restored += 1,
            Err(err) => kv_error!("restore of {} failed: {err}", name.display()),
        }
    }
    Ok(restored)
}

fn resolve_root(root: Option<&Path>) -> StoreResult<PathBuf> {
    match root {
        Some(root) => Ok(root.to_path_buf()),
        None => registry::root_dir().ok_or(StoreError::NotInitialized),
    }
}

fn backup_path(src: &Path, dst: &Path) -> StoreResult<()> {
    match registry::lookup(src) {
        Some(store) => store.backup_to(dst),
        None if src.exists() => copy_pair(src, dst),
        None => Err(StoreError::invalid_argument(format!(
            "no store at {}",
            src.display()
        ))),
    }
}

fn restore_path(src: &Path, dst: &Path) -> StoreResult<()> {
    match registry::lookup(dst) {
        Some(store) => store.restore_from(src),
        None if src.exists() => copy_pair(src, dst),
        None => Err(StoreError::invalid_argument(format!(
            "no backup at {}",
            src.display()
        ))),
    }
}

/// Names, relative to `dir`, of data files that have a meta file.
fn list_stores(dir: &Path) -> StoreResult<Vec<PathBuf>> {
    let mut names = Vec::new();
    collect_stores(dir, None, &mut names)?;
    let special = dir.join(SPECIAL_DIR);
    if special.is_dir() {
        collect_stores(&special, Some(Path::new(SPECIAL_DIR)), &mut names)?;
    }
    names.sort();
    Ok(names)
}

fn collect_stores(dir: &Path, prefix: Option<&Path>, out: &mut Vec<PathBuf>) -> StoreResult<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let is_meta = name.to_string_lossy().ends_with(META_SUFFIX);
        if is_meta || !meta_path(&entry.path()).exists() {
            continue;
        }
        out.push(match prefix {
            Some(prefix) => prefix.join(&name),
            None => PathBuf::from(&name),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenOptions;
    use tempfile::tempdir;

    #[test]
    fn list_skips_meta_and_orphans() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a"), b"").unwrap();
        fs::write(dir.path().join("a.crc"), b"").unwrap();
        fs::write(dir.path().join("orphan"), b"").unwrap();
        fs::create_dir(dir.path().join(SPECIAL_DIR)).unwrap();
        fs::write(dir.path().join(SPECIAL_DIR).join("ff"), b"").unwrap();
        fs::write(dir.path().join(SPECIAL_DIR).join("ff.crc"), b"").unwrap();

        let names = list_stores(dir.path()).unwrap();
        assert_eq!(
            names,
            vec![PathBuf::from("a"), Path::new(SPECIAL_DIR).join("ff")]
        );
    }

    #[test]
    fn backup_missing_store_fails() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        assert!(backup_one("absent", dst.path(), Some(src.path())).is_err());
    }

    #[test]
    fn backup_and_restore_closed_store() {
        let root = tempdir().unwrap();
        let backup = tempdir().unwrap();
        let fresh = tempdir().unwrap();

        let store = registry::open(&OpenOptions::new("b1").root_path(root.path())).unwrap();
        store.set_bytes("k", b"v", None).unwrap();
        registry::close(&store);

        backup_one("b1", backup.path(), Some(root.path())).unwrap();
        restore_one("b1", backup.path(), Some(fresh.path())).unwrap();

        let restored = registry::open(&OpenOptions::new("b1").root_path(fresh.path())).unwrap();
        assert_eq!(restored.get_bytes("k").unwrap().unwrap(), b"v");
        registry::close(&restored);
    }
}
