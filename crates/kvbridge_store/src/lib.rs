//! # kvbridge store
//!
//! The native key-value store that sits behind the kvbridge boundary.
//!
//! This crate provides:
//! - Memory-mapped append-log storage with CRC-checked meta files
//! - Typed scalar, text and byte values with optional expiration
//! - Optional AES-256-GCM record encryption (`encryption` feature)
//! - Multi-process sharing under an advisory file lock
//! - A process-wide instance registry with idempotent open
//! - Native log, error-policy and content-change handler slots
//! - Backup and restore of single stores or whole directories
//!
//! ## Example
//!
//! ```rust,ignore
//! use kvbridge_store::{open, OpenOptions};
//!
//! let store = open(&OpenOptions::new("settings").root_path("/tmp/kv"))?;
//! store.set("launch_count", 1u32, None)?;
//! assert_eq!(store.get::<u32>("launch_count")?, Some(1));
//! ```

#![warn(missing_docs)]

pub mod log;

mod backup;
mod config;
mod crypto;
mod error;
mod file;
mod handler;
mod meta;
mod registry;
mod store;
mod value;

pub use backup::{backup_all, backup_one, restore_all, restore_one};
pub use config::{Mode, OpenOptions, DEFAULT_MMAP_ID, DEFAULT_MMAP_SIZE, MAX_CRYPT_KEY_LEN};
pub use error::{StoreError, StoreResult};
pub use handler::{
    set_content_change_handler, set_error_handler, set_log_handler, ContentChangeHandler,
    ErrorHandler, ErrorType, LogHandler, RecoverStrategy,
};
pub use log::{LogLevel, LogRecord};
pub use registry::{
    close, data_path, initialize, is_file_valid, lookup, mapped_name, on_exit, open,
    open_default, remove_storage, root_dir,
};
pub use store::Store;
pub use value::{Scalar, ValueType};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
