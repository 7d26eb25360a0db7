//! Integer handle table.
//!
//! Stores never cross the boundary as pointers. Each open instance gets a
//! non-zero token; asking for the same instance again returns the same
//! token. Tokens of closed stores resolve to nothing, so a stale handle
//! can never reach freed memory.

use crate::types::KvHandle;
use kvbridge_store::Store;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

#[derive(Default)]
struct HandleTable {
    next: u64,
    by_token: HashMap<u64, Arc<Store>>,
    by_store: HashMap<usize, u64>,
}

impl HandleTable {
    fn forget(&mut self, token: u64) -> Option<Arc<Store>> {
        let store = self.by_token.remove(&token)?;
        self.by_store.remove(&(Arc::as_ptr(&store) as usize));
        Some(store)
    }
}

static HANDLES: LazyLock<Mutex<HandleTable>> = LazyLock::new(|| Mutex::new(HandleTable::default()));

/// Returns the token of `store`, issuing one if needed.
pub(crate) fn insert(store: Arc<Store>) -> KvHandle {
    let mut table = HANDLES.lock();
    let key = Arc::as_ptr(&store) as usize;
    if let Some(&token) = table.by_store.get(&key) {
        return KvHandle(token);
    }
    table.next += 1;
    let token = table.next;
    table.by_token.insert(token, store);
    table.by_store.insert(key, token);
    KvHandle(token)
}

/// Resolves a token to its open store.
pub(crate) fn resolve(handle: KvHandle) -> Option<Arc<Store>> {
    if handle.is_null() {
        return None;
    }
    let mut table = HANDLES.lock();
    let store = table.by_token.get(&handle.0)?;
    if store.is_closed() {
        table.forget(handle.0);
        return None;
    }
    Some(Arc::clone(store))
}

/// Invalidates a token, returning its store.
pub(crate) fn remove(handle: KvHandle) -> Option<Arc<Store>> {
    HANDLES.lock().forget(handle.0)
}

/// Drops every token whose store was closed behind the table's back.
pub(crate) fn prune_closed() {
    let mut table = HANDLES.lock();
    let closed: Vec<u64> = table
        .by_token
        .iter()
        .filter(|(_, store)| store.is_closed())
        .map(|(token, _)| *token)
        .collect();
    for token in closed {
        table.forget(token);
    }
}

/// Invalidates every token.
pub(crate) fn clear() {
    let mut table = HANDLES.lock();
    table.by_token.clear();
    table.by_store.clear();
}
