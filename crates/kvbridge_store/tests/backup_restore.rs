//! Backup and restore through the registry.

use kvbridge_store::{
    backup_all, backup_one, close, open, remove_storage, restore_all, restore_one, OpenOptions,
};
use tempfile::tempdir;

fn options(id: &str, root: &std::path::Path) -> OpenOptions {
    OpenOptions::new(id).root_path(root)
}

#[test]
fn restore_into_fresh_root() {
    let root = tempdir().unwrap();
    let backup = tempdir().unwrap();
    let fresh = tempdir().unwrap();

    let store = open(&options("profile", root.path())).unwrap();
    store.set_bytes("name", "Ada".as_bytes(), None).unwrap();
    store.set("age", 36u32, None).unwrap();

    // Backing up an open store flushes it first.
    backup_one("profile", backup.path(), Some(root.path())).unwrap();
    close(&store);

    restore_one("profile", backup.path(), Some(fresh.path())).unwrap();
    let restored = open(&options("profile", fresh.path())).unwrap();
    assert_eq!(restored.get_bytes("name").unwrap().unwrap(), b"Ada");
    assert_eq!(restored.get::<u32>("age").unwrap(), Some(36));
    close(&restored);
}

#[cfg(feature = "encryption")]
#[test]
fn encrypted_restore_after_remove_storage() {
    let root = tempdir().unwrap();
    let backup = tempdir().unwrap();
    let opts = options("vault", root.path()).crypt_key("hunter2");

    let store = open(&opts).unwrap();
    store.set_bytes("pin", b"0000", None).unwrap();
    backup_one("vault", backup.path(), Some(root.path())).unwrap();

    remove_storage("vault", Some(root.path())).unwrap();
    assert!(store.is_closed());

    restore_one("vault", backup.path(), Some(root.path())).unwrap();
    let restored = open(&opts).unwrap();
    assert_eq!(restored.get_bytes("pin").unwrap().unwrap(), b"0000");
    assert_eq!(restored.crypt_key().as_deref(), Some(&b"hunter2"[..]));
    close(&restored);
}

#[test]
fn restore_into_open_store_reloads_it() {
    let root = tempdir().unwrap();
    let backup = tempdir().unwrap();

    let store = open(&options("live", root.path())).unwrap();
    store.set("v", 1i64, None).unwrap();
    backup_one("live", backup.path(), Some(root.path())).unwrap();

    store.set("v", 2i64, None).unwrap();
    store.set("extra", true, None).unwrap();
    restore_one("live", backup.path(), Some(root.path())).unwrap();

    assert_eq!(store.get::<i64>("v").unwrap(), Some(1));
    assert!(!store.contains("extra"));
    close(&store);
}

#[test]
fn backup_all_and_restore_all() {
    let root = tempdir().unwrap();
    let backup = tempdir().unwrap();
    let fresh = tempdir().unwrap();

    for id in ["one", "two", "nested/three"] {
        let store = open(&options(id, root.path())).unwrap();
        store.set_bytes("id", id.as_bytes(), None).unwrap();
        close(&store);
    }

    assert_eq!(backup_all(backup.path(), Some(root.path())).unwrap(), 3);
    assert_eq!(restore_all(backup.path(), Some(fresh.path())).unwrap(), 3);

    for id in ["one", "two", "nested/three"] {
        let store = open(&options(id, fresh.path())).unwrap();
        assert_eq!(store.get_bytes("id").unwrap().unwrap(), id.as_bytes());
        close(&store);
    }
}
