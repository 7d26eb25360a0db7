//! Process-wide setup, the default store and backups.
//!
//! Everything here shares the default root, so it runs as one sequence.

use kvbridge::{
    backup_all, backup_one, default_kv, default_kv_with, initialize, is_file_valid, on_exit,
    open, remove_storage, restore_all, restore_one, LogLevel, Mode, OpenOptions,
};
use tempfile::tempdir;

#[test]
fn lifecycle() {
    let root = tempdir().unwrap();
    let backups = tempdir().unwrap();

    // Without a root there is no default store.
    assert!(default_kv().is_err());

    initialize(root.path(), LogLevel::Warning).unwrap();
    assert_eq!(kvbridge::page_size(), 4096);
    assert_eq!(kvbridge::version(), env!("CARGO_PKG_VERSION"));

    let kv = default_kv().unwrap();
    assert_eq!(kv.mmap_id(), "kvbridge.default");
    assert_eq!(default_kv_with(Mode::SingleProcess, None).unwrap(), kv);
    kv.set_string("where", "default");

    // Plain store under the default root.
    let plain = open(&OpenOptions::new("plain")).unwrap();
    plain.set("n", 10u32);
    backup_one("plain", backups.path(), None).unwrap();
    plain.set("n", 11u32);
    restore_one("plain", backups.path(), None).unwrap();
    assert_eq!(plain.get::<u32>("n"), 10);

    // Encrypted store survives remove-and-restore.
    let secret = OpenOptions::new("secret").crypt_key("p@ss");
    let kv_secret = open(&secret).unwrap();
    kv_secret.set_string("token", "abc123");
    assert_eq!(kv_secret.crypt_key().as_deref(), Some(&b"p@ss"[..]));
    backup_one("secret", backups.path(), None).unwrap();

    remove_storage("secret", None).unwrap();
    assert_eq!(kv_secret.get_string("token"), None);
    let fresh = open(&secret).unwrap();
    assert_eq!(fresh.count(), 0);

    restore_one("secret", backups.path(), None).unwrap();
    assert_eq!(fresh.get_string("token").as_deref(), Some("abc123"));

    // Whole-directory copies.
    let copies = tempdir().unwrap();
    assert!(backup_all(copies.path(), None).unwrap() >= 3);
    let elsewhere = tempdir().unwrap();
    let restored = restore_all(copies.path(), Some(elsewhere.path())).unwrap();
    assert!(restored >= 3);
    assert!(is_file_valid("plain", Some(elsewhere.path())));
    assert!(is_file_valid("never_created", None));

    let moved = open(&OpenOptions::new("plain").root(elsewhere.path())).unwrap();
    assert_eq!(moved.get::<u32>("n"), 10);

    on_exit();
    assert!(!kv.contains("where"));
    assert!(default_kv().is_err());
    assert!(kvbridge::last_error().is_some());
}
