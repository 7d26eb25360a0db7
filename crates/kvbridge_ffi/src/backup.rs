//! Backup, restore and storage removal by identifier.

use crate::error::{guard, optional_str, required_str};
use crate::handles;
use crate::types::KvStr;
use std::path::Path;

/// Copies one store from `src_root` (null: default root) into `dst_dir`.
///
/// # Safety
///
/// Views must be valid; `src_root` may be null.
#[no_mangle]
pub unsafe extern "C" fn kv_backup_one_to_directory(
    id: KvStr,
    dst_dir: KvStr,
    src_root: KvStr,
) -> bool {
    guard(false, || {
        let id = required_str(id, "id")?;
        let dst = required_str(dst_dir, "destination")?;
        let root = optional_str(src_root, "root")?;
        kvbridge_store::backup_one(id, Path::new(dst), root.map(Path::new)).map(|()| true)
    })
}

/// Restores one store from `src_dir` into `dst_root` (null: default root).
/// An open store is reloaded in place.
///
/// # Safety
///
/// Views must be valid; `dst_root` may be null.
#[no_mangle]
pub unsafe extern "C" fn kv_restore_one_from_directory(
    id: KvStr,
    src_dir: KvStr,
    dst_root: KvStr,
) -> bool {
    guard(false, || {
        let id = required_str(id, "id")?;
        let src = required_str(src_dir, "source")?;
        let root = optional_str(dst_root, "root")?;
        kvbridge_store::restore_one(id, Path::new(src), root.map(Path::new)).map(|()| true)
    })
}

/// Copies every store under `src_root` into `dst_dir`. Returns the count.
///
/// # Safety
///
/// Views must be valid; `src_root` may be null.
#[no_mangle]
pub unsafe extern "C" fn kv_backup_all_to_directory(dst_dir: KvStr, src_root: KvStr) -> u64 {
    guard(0, || {
        let dst = required_str(dst_dir, "destination")?;
        let root = optional_str(src_root, "root")?;
        kvbridge_store::backup_all(Path::new(dst), root.map(Path::new)).map(|n| n as u64)
    })
}

/// Restores every store found in `src_dir` into `dst_root`. Returns the
/// count.
///
/// # Safety
///
/// Views must be valid; `dst_root` may be null.
#[no_mangle]
pub unsafe extern "C" fn kv_restore_all_from_directory(src_dir: KvStr, dst_root: KvStr) -> u64 {
    guard(0, || {
        let src = required_str(src_dir, "source")?;
        let root = optional_str(dst_root, "root")?;
        kvbridge_store::restore_all(Path::new(src), root.map(Path::new)).map(|n| n as u64)
    })
}

/// Closes the store if open and deletes its files. Handles to it become
/// stale; opening the identifier again yields an empty store.
///
/// # Safety
///
/// Views must be valid; `root` may be null.
#[no_mangle]
pub unsafe extern "C" fn kv_remove_storage(id: KvStr, root: KvStr) -> bool {
    guard(false, || {
        let id = required_str(id, "id")?;
        let root = optional_str(root, "root")?;
        let removed = kvbridge_store::remove_storage(id, root.map(Path::new));
        handles::prune_closed();
        removed.map(|()| true)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessors::{kv_get_i64, kv_set_i64};
    use crate::store::{kv_close, kv_count, kv_open_with_id};
    use tempfile::tempdir;

    #[test]
    fn remove_then_restore() {
        let root = tempdir().unwrap();
        let backup = tempdir().unwrap();
        let root_view = KvStr::from_str(root.path().to_str().unwrap());
        let backup_view = KvStr::from_str(backup.path().to_str().unwrap());
        let id = KvStr::from_str("kept");

        unsafe {
            let h = kv_open_with_id(id, 1, KvStr::null(), root_view, 0);
            assert!(kv_set_i64(h, KvStr::from_str("n"), 1 << 40));
            assert!(kv_backup_one_to_directory(id, backup_view, root_view));

            assert!(kv_remove_storage(id, root_view));
            assert_eq!(kv_get_i64(h, KvStr::from_str("n"), -1), -1);

            let fresh = kv_open_with_id(id, 1, KvStr::null(), root_view, 0);
            assert_ne!(fresh, h);
            assert_eq!(kv_count(fresh, false), 0);

            assert!(kv_restore_one_from_directory(id, backup_view, root_view));
            assert_eq!(kv_get_i64(fresh, KvStr::from_str("n"), -1), 1 << 40);
            kv_close(fresh);
        }
    }

    #[test]
    fn whole_directory() {
        let root = tempdir().unwrap();
        let backup = tempdir().unwrap();
        let root_view = KvStr::from_str(root.path().to_str().unwrap());
        let backup_view = KvStr::from_str(backup.path().to_str().unwrap());

        unsafe {
            for id in ["x", "y"] {
                let h = kv_open_with_id(KvStr::from_str(id), 1, KvStr::null(), root_view, 0);
                kv_set_i64(h, KvStr::from_str("v"), 3);
                kv_close(h);
            }
            assert_eq!(kv_backup_all_to_directory(backup_view, root_view), 2);
            assert_eq!(kv_restore_all_from_directory(backup_view, root_view), 2);
            assert_eq!(kv_backup_all_to_directory(KvStr::null(), root_view), 0);
        }
    }
}
