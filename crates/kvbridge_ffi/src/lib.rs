//! # kvbridge FFI
//!
//! Stable C ABI for the kvbridge store.
//!
//! This crate provides:
//! - C-compatible function exports for every store operation
//! - Integer store handles instead of pointers
//! - Borrowed `{pointer, length}` views for inbound strings and keys
//! - Native-owned buffers released exactly once with `kv_buffer_free`
//! - Log, error and content change callbacks
//!
//! Nothing unwinds across the boundary. Failures return the call's default
//! and leave a message in `kv_last_error`.

#![warn(missing_docs)]

mod accessors;
mod backup;
mod batch;
mod buffer;
mod callback;
mod crypto;
mod error;
mod handles;
mod runtime;
mod store;
mod types;

pub use accessors::*;
pub use backup::*;
pub use batch::*;
pub use buffer::{kv_buffer_array_free, kv_buffer_free, kv_outstanding_buffers, KvBuffer};
pub use callback::{
    kv_set_content_change_callback, kv_set_error_callback, kv_set_log_callback,
    KvContentChangeCallback, KvErrorCallback, KvLogCallback,
};
pub use crypto::*;
pub use error::kv_last_error;
pub use runtime::*;
pub use store::*;
pub use types::{KvErrorType, KvHandle, KvLogLevel, KvMode, KvRecoverStrategy, KvStr};
