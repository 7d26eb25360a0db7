//! Benchmark utilities.

use kvbridge::{open, Kv, OpenOptions};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::Path;

/// Generate random bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a random alphanumeric string of the specified length.
pub fn random_text(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate `count` distinct keys.
pub fn generate_keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("key_{i}")).collect()
}

/// Open a fresh store under `root`.
pub fn open_store(root: &Path, id: &str) -> Kv {
    open(&OpenOptions::new(id).root(root)).expect("open bench store")
}
