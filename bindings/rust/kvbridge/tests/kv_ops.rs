//! Store operations through the safe bindings.

use kvbridge::{open, Kv, Mode, OpenOptions};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

fn open_in(root: &Path, id: &str) -> Kv {
    open(&OpenOptions::new(id).root(root)).unwrap()
}

#[test]
fn scalar_round_trips() {
    let dir = tempdir().unwrap();
    let kv = open_in(dir.path(), "scalars");

    assert!(kv.set("bool", true));
    assert!(kv.set("i32", i32::MIN));
    assert!(kv.set("u32", u32::MAX));
    assert!(kv.set("i64", -1_234_567_890_123i64));
    assert!(kv.set("u64", u64::MAX));
    assert!(kv.set("f32", 3.25f32));
    assert!(kv.set("f64", -0.125f64));

    assert!(kv.get::<bool>("bool"));
    assert_eq!(kv.get::<i32>("i32"), i32::MIN);
    assert_eq!(kv.get::<u32>("u32"), u32::MAX);
    assert_eq!(kv.get::<i64>("i64"), -1_234_567_890_123);
    assert_eq!(kv.get::<u64>("u64"), u64::MAX);
    assert_eq!(kv.get::<f32>("f32"), 3.25);
    assert_eq!(kv.get::<f64>("f64"), -0.125);
    kv.close();
}

#[test]
fn text_and_bytes() {
    let dir = tempdir().unwrap();
    let kv = open_in(dir.path(), "text");

    assert!(kv.set_string("greeting", "héllo wörld"));
    assert!(kv.set_bytes("blob", &[0, 1, 2, 255]));
    assert!(kv.set_string("empty", ""));

    assert_eq!(kv.get_string("greeting").as_deref(), Some("héllo wörld"));
    assert_eq!(kv.get_bytes("blob"), Some(vec![0, 1, 2, 255]));
    assert_eq!(kv.get_string("empty").as_deref(), Some(""));
    assert_eq!(kv.get_string("blob"), None);

    let buffer = kv.get_string_buffer("greeting").unwrap();
    assert_eq!(buffer.as_str().unwrap(), "héllo wörld");
    buffer.release();
    assert!(kv.get_string_buffer("blob").is_none());
    assert_eq!(kv.get_bytes_buffer("blob").unwrap().as_bytes(), &[0, 1, 2, 255]);

    assert_eq!(kv.value_size("blob", true), 4);
    assert!(kv.value_size("blob", false) > 4);
    assert_eq!(kv.value_size("nothing", true), 0);
    kv.close();
}

#[test]
fn defaults_for_absent_and_mismatched() {
    let dir = tempdir().unwrap();
    let kv = open_in(dir.path(), "defaults");
    kv.set("number", 42i32);
    kv.set_string("text", "x");

    assert_eq!(kv.get_or("missing", 7i64), 7);
    assert_eq!(kv.get::<u64>("missing"), 0);
    assert_eq!(kv.get_or("number", 1.5f64), 1.5);
    assert!(kv.get_or("text", true));
    assert_eq!(kv.get_string("number"), None);
    assert_eq!(kv.get_bytes("missing"), None);
    kv.close();
}

#[test]
fn demo_bool_remove() {
    let dir = tempdir().unwrap();
    let kv = open_in(dir.path(), "demo");
    assert!(kv.set("bool", true));
    assert!(kv.get::<bool>("bool"));
    assert!(kv.remove("bool"));
    assert!(!kv.contains("bool"));
    kv.close();
}

#[test]
fn remove_many_and_enumerate() {
    let dir = tempdir().unwrap();
    let kv = open_in(dir.path(), "many");
    for key in ["a", "b", "c", "d", "e"] {
        kv.set_string(key, key);
    }

    assert_eq!(kv.remove_keys(&["a", "c", "missing"]), 2);
    assert!(!kv.contains("a"));
    assert!(!kv.contains("c"));
    assert!(kv.contains("b"));

    let keys = kv.all_keys();
    assert_eq!(keys, vec!["b", "d", "e"]);
    assert_eq!(kv.count(), keys.len() as u64);

    let owned: Vec<String> = vec!["b".into(), "d".into()];
    assert_eq!(kv.remove_keys(&owned), 2);
    assert_eq!(kv.remove_keys::<&str>(&[]), 0);
    assert_eq!(kv.all_keys(), vec!["e"]);

    assert!(kv.clear_all());
    assert!(kv.all_keys().is_empty());
    assert_eq!(kv.count(), 0);
    kv.close();
}

#[test]
fn clear_keep_space_and_trim() {
    let dir = tempdir().unwrap();
    let kv = open_in(dir.path(), "space");
    for i in 0..500 {
        kv.set_bytes(&format!("k{i}"), &[7u8; 64]);
    }
    let grown = kv.total_size();
    assert!(grown > u64::from(kvbridge::page_size().unsigned_abs()));

    assert!(kv.clear_all_keep_space());
    assert_eq!(kv.total_size(), grown);
    assert_eq!(kv.actual_size(), 0);

    kv.set("one", 1u32);
    assert!(kv.trim());
    assert!(kv.total_size() < grown);
    assert_eq!(kv.get::<u32>("one"), 1);
    kv.close();
}

#[test]
fn expiry_after_sleep() {
    let dir = tempdir().unwrap();
    let kv = open_in(dir.path(), "expiring");
    assert!(kv.set_with_expire("short", 1i32, 1));
    assert!(kv.set_string_with_expire("forever", "x", 0));
    assert!(kv.contains("short"));

    thread::sleep(Duration::from_secs(2));

    assert!(!kv.contains("short"));
    assert_eq!(kv.get_or("short", -1i32), -1);
    assert!(kv.contains("forever"));
    assert_eq!(kv.count_non_expired(), 1);
    assert_eq!(kv.all_non_expired_keys(), vec!["forever"]);
    kv.close();
}

#[test]
fn default_expiration() {
    let dir = tempdir().unwrap();
    let kv = open_in(dir.path(), "default_expire");
    assert!(kv.enable_auto_expire(1));
    kv.set("uses_default", true);
    kv.set_with_expire("never", true, 0);

    thread::sleep(Duration::from_secs(2));
    assert!(!kv.contains("uses_default"));
    assert!(kv.contains("never"));

    assert!(kv.disable_auto_expire());
    kv.set("plain", 1u64);
    assert!(kv.contains("plain"));
    kv.close();
}

#[test]
fn compare_before_set_skips_identical_writes() {
    let dir = tempdir().unwrap();
    let kv = open_in(dir.path(), "compare");
    kv.set_string("k", "value");
    kv.set("n", 5i64);

    assert!(kv.enable_compare_before_set());
    let size = kv.actual_size();
    kv.set_string("k", "value");
    kv.set("n", 5i64);
    assert_eq!(kv.actual_size(), size);

    kv.set_string("k", "other");
    assert!(kv.actual_size() > size);

    assert!(kv.enable_auto_expire(0));
    assert!(!kv.enable_compare_before_set());
    kv.close();
}

#[test]
fn same_identity_same_handle() {
    let dir = tempdir().unwrap();
    let a = open_in(dir.path(), "same");
    let b = open(&OpenOptions::new("same").root(dir.path()).expected_capacity(1 << 20)).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.mmap_id(), "same");
    assert!(!a.is_multi_process());

    a.close();
    assert!(!b.set("stale", true));
    assert!(!b.contains("stale"));
}

#[test]
fn multi_process_mode_locks() {
    let dir = tempdir().unwrap();
    let kv = open(&OpenOptions::new("shared").root(dir.path()).mode(Mode::MultiProcess)).unwrap();
    assert!(kv.is_multi_process());
    assert!(kv.lock());
    kv.set("inside", 1i32);
    assert!(kv.unlock());
    assert!(kv.try_lock());
    assert!(kv.unlock());
    assert!(kv.check_content_changed());
    kv.close();
}

#[test]
fn memory_cache_reload() {
    let dir = tempdir().unwrap();
    let kv = open_in(dir.path(), "reload");
    kv.set_string("k", "v");
    assert!(kv.sync());
    kv.clear_memory_cache();
    assert_eq!(kv.get_string("k").as_deref(), Some("v"));
    assert!(kv.async_sync());
    kv.close();
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn last_write_wins(key in "[a-zA-Z0-9_.]{1,24}", values in prop::collection::vec(any::<String>(), 1..6)) {
            let dir = tempdir().unwrap();
            let kv = open_in(dir.path(), "prop");
            for value in &values {
                prop_assert!(kv.set_string(&key, value));
            }
            prop_assert_eq!(kv.get_string(&key), values.last().cloned());
            prop_assert_eq!(kv.all_keys(), vec![key.clone()]);
            kv.close();
        }
    }
}
