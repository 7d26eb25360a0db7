//! The store engine.
//!
//! A store is a memory-mapped append log plus an in-memory index:
//!
//! ```text
//! data file: | actual_size (4) | record | record | ... | zero padding |
//! record:    | body_len (4) | body |
//! body:      | key_len (4) | key | encoded value |   (sealed when encrypted)
//! ```
//!
//! An empty encoded value marks a deletion. Writes append a record and
//! fold it into the running CRC kept in the meta file. When the log no
//! longer fits, the live entries are written back compactly and the file
//! doubles until there is room for future writes.
//!
//! In multi-process mode every operation runs under the meta file lock and
//! first compares the on-disk meta with the last one seen. A mismatch means
//! another process wrote; the store reloads and notifies the content
//! change handler once the operation has finished.

use crate::config::{round_to_page, Mode, OpenOptions, DEFAULT_MMAP_SIZE, MAX_CRYPT_KEY_LEN};
use crate::crypto::{generate_salt, RecordCipher, SALT_SIZE};
use crate::error::{StoreError, StoreResult};
use crate::file::MappedFile;
use crate::handler::{self, ErrorType, RecoverStrategy};
use crate::meta::{meta_path, read_u32, Meta, MetaFile};
use crate::value::{
    encode_bytes, encode_scalar, expire_at_from_duration, now_secs, with_expire, EncodedValue,
    Scalar,
};
use crate::{kv_debug, kv_error, kv_info, kv_warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Size of the `actual_size` header at the start of the data file.
const HEADER_SIZE: usize = 4;

/// An open store.
///
/// All operations take `&self`; access is serialized by an internal mutex
/// and, in multi-process mode, by the meta file lock.
#[derive(Debug)]
pub struct Store {
    id: String,
    path: PathBuf,
    mode: Mode,
    closed: AtomicBool,
    inner: Mutex<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    file: MappedFile,
    meta_file: MetaFile,
    meta: Meta,
    crypt_key: Option<Vec<u8>>,
    cipher: Option<RecordCipher>,
    entries: HashMap<String, Vec<u8>>,
    actual_size: usize,
    loaded: bool,
    compare_before_set: bool,
}

impl Store {
    /// Opens the store stored at `path`.
    ///
    /// Prefer [`crate::open`], which returns the shared instance for a path.
    /// Opening the same path twice in one process through this function
    /// behaves like two processes sharing the file.
    pub fn open(id: &str, path: &Path, options: &OpenOptions) -> StoreResult<Self> {
        let file = MappedFile::open(path, options.expected_capacity)?;
        let meta_file = MetaFile::open(path)?;

        let store = Self {
            id: id.to_string(),
            path: path.to_path_buf(),
            mode: options.mode,
            closed: AtomicBool::new(false),
            inner: Mutex::new(StoreInner {
                file,
                meta_file,
                meta: Meta::default(),
                crypt_key: normalize_key(options.crypt_key.as_deref()),
                cipher: None,
                entries: HashMap::new(),
                actual_size: 0,
                loaded: false,
                compare_before_set: false,
            }),
        };

        // Load now so damage is reported when the store is opened.
        store.with_inner(|_| Ok(()))?;
        kv_info!(
            "loaded [{}] with {} values, {} bytes",
            store.id,
            store.count(false),
            store.actual_size()
        );
        Ok(store)
    }

    /// Returns the store identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the data file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the process sharing mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns true if the store is shared between processes.
    pub fn is_multi_process(&self) -> bool {
        self.mode == Mode::MultiProcess
    }

    /// Returns true once the store was closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Runs `f` with the loaded state, taking the process lock when shared.
    fn with_inner<R>(
        &self,
        f: impl FnOnce(&mut StoreInner) -> StoreResult<R>,
    ) -> StoreResult<R> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        let multi = self.is_multi_process();

        let outcome = {
            let mut inner = self.inner.lock();
            if multi {
                inner.meta_file.lock()?;
            }
            let outcome = inner
                .prepare(&self.id, multi)
                .and_then(|changed| Ok((f(&mut *inner)?, changed)));
            if multi {
                if let Err(err) = inner.meta_file.unlock() {
                    kv_error!("[{}] failed to release process lock: {err}", self.id);
                }
            }
            outcome
        };

        let (value, changed) = outcome?;
        if changed {
            kv_info!("[{}] changed by another process", self.id);
            handler::on_content_change(&self.id);
        }
        Ok(value)
    }

    /// Stores a scalar value.
    ///
    /// `expire` is a duration in seconds: `None` applies the store default,
    /// `Some(0)` never expires. A non-zero duration on a store without
    /// auto-expiration turns auto-expiration on with no default duration.
    pub fn set<T: Scalar>(&self, key: &str, value: T, expire: Option<u32>) -> StoreResult<()> {
        check_key(key)?;
        self.with_inner(|inner| {
            let expire_at = inner.expire_at_for(&self.id, expire)?;
            inner.set_encoded(key, encode_scalar(value, expire_at))
        })
    }

    /// Reads a scalar value.
    ///
    /// Returns `Ok(None)` when the key is absent or expired.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TypeMismatch`] if the key holds another type.
    pub fn get<T: Scalar>(&self, key: &str) -> StoreResult<Option<T>> {
        self.with_inner(|inner| match inner.live_value(&self.id, key)? {
            Some(encoded) => EncodedValue::parse(&encoded)?.scalar::<T>().map(Some),
            None => Ok(None),
        })
    }

    /// Stores bytes or UTF-8 text.
    pub fn set_bytes(&self, key: &str, value: &[u8], expire: Option<u32>) -> StoreResult<()> {
        check_key(key)?;
        self.with_inner(|inner| {
            let expire_at = inner.expire_at_for(&self.id, expire)?;
            inner.set_encoded(key, encode_bytes(value, expire_at))
        })
    }

    /// Reads bytes or text.
    pub fn get_bytes(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.with_inner(|inner| match inner.live_value(&self.id, key)? {
            Some(encoded) => EncodedValue::parse(&encoded)?.bytes().map(|b| Some(b.to_vec())),
            None => Ok(None),
        })
    }

    /// Size of a stored value: the payload alone when `actual` is set,
    /// otherwise the full encoding. Absent keys have size 0.
    pub fn value_size(&self, key: &str, actual: bool) -> StoreResult<usize> {
        self.with_inner(|inner| match inner.live_value(&self.id, key)? {
            Some(encoded) if actual => Ok(EncodedValue::parse(&encoded)?.payload.len()),
            Some(encoded) => Ok(encoded.len()),
            None => Ok(0),
        })
    }

    /// Returns true if `key` holds a live value.
    pub fn contains(&self, key: &str) -> bool {
        self.with_inner(|inner| Ok(inner.live_value(&self.id, key)?.is_some()))
            .unwrap_or(false)
    }

    /// Removes one key. Removing an absent key succeeds.
    pub fn remove(&self, key: &str) -> StoreResult<()> {
        self.with_inner(|inner| {
            if inner.entries.remove(key).is_some() {
                inner.append(key, &[])?;
            }
            Ok(())
        })
    }

    /// Removes many keys with a single rewrite. Empty keys are skipped.
    ///
    /// Returns how many keys were present.
    pub fn remove_keys<S: AsRef<str>>(&self, keys: &[S]) -> StoreResult<usize> {
        self.with_inner(|inner| {
            let removed: Vec<&str> = keys
                .iter()
                .map(AsRef::as_ref)
                .filter(|key| !key.is_empty())
                .filter(|key| inner.entries.remove(*key).is_some())
                .collect();
            match removed.as_slice() {
                [] => {}
                [key] => inner.append(key, &[])?,
                _ => inner.full_writeback()?,
            }
            Ok(removed.len())
        })
    }

    /// Removes every key. With `keep_space` the file keeps its size.
    pub fn clear_all(&self, keep_space: bool) -> StoreResult<()> {
        self.with_inner(|inner| inner.clear(keep_space))
    }

    /// Number of keys. With `filter_expire`, expired keys are left out.
    pub fn count(&self, filter_expire: bool) -> usize {
        self.with_inner(|inner| {
            if !filter_expire {
                return Ok(inner.entries.len());
            }
            let now = now_secs();
            Ok(inner
                .entries
                .values()
                .filter(|v| !inner.is_expired(v, now))
                .count())
        })
        .unwrap_or(0)
    }

    /// All keys, sorted. With `filter_expire`, expired keys are left out.
    pub fn all_keys(&self, filter_expire: bool) -> Vec<String> {
        self.with_inner(|inner| {
            let now = now_secs();
            let mut keys: Vec<String> = inner
                .entries
                .iter()
                .filter(|(_, v)| !filter_expire || !inner.is_expired(v, now))
                .map(|(k, _)| k.clone())
                .collect();
            keys.sort_unstable();
            Ok(keys)
        })
        .unwrap_or_default()
    }

    /// Size of the data file.
    pub fn total_size(&self) -> usize {
        self.with_inner(|inner| Ok(inner.file.len())).unwrap_or(0)
    }

    /// Bytes of the data file in use by records.
    pub fn actual_size(&self) -> usize {
        self.with_inner(|inner| Ok(inner.actual_size)).unwrap_or(0)
    }

    /// Flushes to disk, blocking when `sync` is set.
    pub fn sync(&self, sync: bool) -> StoreResult<()> {
        self.with_inner(|inner| {
            inner.file.flush(sync)?;
            if sync {
                inner.meta_file.sync()?;
            }
            Ok(())
        })
    }

    /// Drops the in-memory index. The next operation reloads from disk.
    pub fn clear_memory_cache(&self) {
        if self.is_closed() {
            return;
        }
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.cipher = None;
        inner.loaded = false;
        kv_debug!("[{}] memory cache cleared", self.id);
    }

    /// Compacts the log and shrinks the file to fit.
    pub fn trim(&self) -> StoreResult<()> {
        self.with_inner(|inner| {
            if inner.entries.is_empty() {
                return inner.clear(false);
            }
            inner.full_writeback()?;

            let needed = HEADER_SIZE + inner.actual_size;
            let mut size = inner.file.len();
            while size > DEFAULT_MMAP_SIZE && size / 2 >= needed * 2 {
                size /= 2;
            }
            if size < inner.file.len() {
                let old = inner.file.len();
                inner.file.resize(size as u64)?;
                kv_info!("[{}] trimmed from {old} to {size} bytes", self.id);
            }
            Ok(())
        })
    }

    /// Changes the crypt key, rewriting every record. `None` or an empty
    /// key removes encryption.
    pub fn rekey(&self, key: Option<&[u8]>) -> StoreResult<()> {
        let key = normalize_key(key);
        self.with_inner(|inner| {
            if inner.crypt_key == key {
                return Ok(());
            }
            let salt = if key.is_some() {
                generate_salt()
            } else {
                [0u8; SALT_SIZE]
            };
            inner.cipher = key
                .as_deref()
                .map(|k| RecordCipher::new(k, &salt))
                .transpose()?;
            inner.crypt_key = key;
            inner.meta.salt = salt;
            inner.full_writeback()?;
            kv_info!(
                "[{}] re-keyed, encrypted: {}",
                self.id,
                inner.crypt_key.is_some()
            );
            Ok(())
        })
    }

    /// Adopts a key another process already installed, then reloads.
    /// Nothing is rewritten.
    pub fn check_reset_crypt_key(&self, key: Option<&[u8]>) -> StoreResult<()> {
        let key = normalize_key(key);
        self.with_inner(|inner| {
            if inner.crypt_key == key {
                return Ok(());
            }
            inner.crypt_key = key;
            inner.load(&self.id)
        })
    }

    /// The current crypt key, `None` for a plain store.
    pub fn crypt_key(&self) -> Option<Vec<u8>> {
        self.with_inner(|inner| Ok(inner.crypt_key.clone()))
            .ok()
            .flatten()
    }

    /// Turns on auto-expiration with a default duration, `0` meaning never.
    ///
    /// Compare-before-set is turned off.
    pub fn enable_auto_expire(&self, default_seconds: u32) -> StoreResult<()> {
        self.with_inner(|inner| inner.enable_expire(&self.id, default_seconds))
    }

    /// Turns off auto-expiration. Expired keys are dropped and the rest
    /// lose their expiration.
    pub fn disable_auto_expire(&self) -> StoreResult<()> {
        self.with_inner(|inner| {
            if !inner.meta.expire_enabled() {
                return Ok(());
            }
            let now = now_secs();
            let expired: Vec<String> = inner
                .entries
                .iter()
                .filter(|(_, v)| inner.is_expired(v, now))
                .map(|(k, _)| k.clone())
                .collect();
            for key in &expired {
                inner.entries.remove(key);
            }
            for value in inner.entries.values_mut() {
                *value = with_expire(value, 0);
            }
            inner.meta.flags &= !Meta::EXPIRE_ENABLED;
            inner.meta.default_expire = 0;
            inner.full_writeback()?;
            kv_info!("[{}] auto-expire disabled", self.id);
            Ok(())
        })
    }

    /// Skips writes whose encoding equals the stored one.
    ///
    /// # Errors
    ///
    /// Fails while auto-expiration is on.
    pub fn enable_compare_before_set(&self) -> StoreResult<()> {
        self.with_inner(|inner| {
            if inner.meta.expire_enabled() {
                return Err(StoreError::invalid_operation(
                    "compare-before-set is unavailable while auto-expire is on",
                ));
            }
            inner.compare_before_set = true;
            Ok(())
        })
    }

    /// Writes unconditionally again.
    pub fn disable_compare_before_set(&self) -> StoreResult<()> {
        self.with_inner(|inner| {
            inner.compare_before_set = false;
            Ok(())
        })
    }

    /// Takes the inter-process lock until [`unlock`](Self::unlock).
    /// A no-op for single-process stores.
    pub fn lock(&self) -> StoreResult<()> {
        if !self.is_multi_process() {
            return Ok(());
        }
        self.inner.lock().meta_file.lock()?;
        self.check_content_changed()
    }

    /// Releases a lock taken by [`lock`](Self::lock) or
    /// [`try_lock`](Self::try_lock).
    pub fn unlock(&self) -> StoreResult<()> {
        if !self.is_multi_process() {
            return Ok(());
        }
        self.inner.lock().meta_file.unlock()
    }

    /// Takes the inter-process lock if nobody else holds it.
    pub fn try_lock(&self) -> bool {
        if !self.is_multi_process() {
            return true;
        }
        let taken = self.inner.lock().meta_file.try_lock().is_ok();
        if taken {
            if let Err(err) = self.check_content_changed() {
                kv_warn!("[{}] reload after lock failed: {err}", self.id);
            }
        }
        taken
    }

    /// Reloads if another process changed the files, notifying the content
    /// change handler. Every operation does this implicitly.
    pub fn check_content_changed(&self) -> StoreResult<()> {
        self.with_inner(|_| Ok(()))
    }

    /// Copies the data and meta files to `dst` and `dst.crc`.
    pub fn backup_to(&self, dst: &Path) -> StoreResult<()> {
        self.with_inner(|inner| {
            inner.file.flush(true)?;
            inner.meta_file.sync()?;
            copy_pair(&self.path, dst)
        })
    }

    /// Replaces the files with `src` and `src.crc`, then reloads.
    pub fn restore_from(&self, src: &Path) -> StoreResult<()> {
        if !src.exists() {
            return Err(StoreError::invalid_argument(format!(
                "no backup at {}",
                src.display()
            )));
        }
        self.with_inner(|inner| {
            inner.file.flush(true)?;
            copy_pair(src, &self.path)?;
            inner.file.refresh()?;
            inner.load(&self.id)
        })
    }

    /// Flushes and marks the store closed. Later calls fail with
    /// [`StoreError::Closed`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let inner = self.inner.lock();
        if let Err(err) = inner.file.flush(true) {
            kv_error!("[{}] flush on close failed: {err}", self.id);
        }
        kv_debug!("[{}] closed", self.id);
    }
}

impl StoreInner {
    /// Loads on first use and, when shared, reloads after foreign writes.
    ///
    /// Returns true if another process changed the store.
    fn prepare(&mut self, id: &str, multi: bool) -> StoreResult<bool> {
        if !self.loaded {
            self.load(id)?;
            return Ok(false);
        }
        if !multi {
            return Ok(false);
        }

        let disk = self.meta_file.read()?;
        if disk.sequence == self.meta.sequence
            && disk.crc == self.meta.crc
            && disk.actual_size == self.meta.actual_size
            && disk.flags == self.meta.flags
        {
            return Ok(false);
        }
        self.file.refresh()?;
        self.load(id)?;
        Ok(true)
    }

    /// Rebuilds the index from the mapped file.
    fn load(&mut self, id: &str) -> StoreResult<()> {
        self.entries.clear();
        self.meta = self.meta_file.read().unwrap_or_else(|err| {
            kv_error!("[{id}] unreadable meta file: {err}");
            Meta::default()
        });

        let file_len = self.file.len();
        let claimed = read_u32(&self.file.as_slice()[..HEADER_SIZE]) as usize;

        if self.crypt_key.is_some() && claimed == 0 && self.meta.salt == [0u8; SALT_SIZE] {
            self.meta.salt = generate_salt();
            self.meta_file.write(&self.meta)?;
        }
        self.cipher = self
            .crypt_key
            .as_deref()
            .map(|k| RecordCipher::new(k, &self.meta.salt))
            .transpose()?;

        let (region_end, damage) = if HEADER_SIZE + claimed > file_len {
            kv_error!(
                "[{id}] {}",
                StoreError::FileLength {
                    claimed: claimed as u64,
                    available: (file_len - HEADER_SIZE) as u64,
                }
            );
            (file_len, Some(ErrorType::FileLength))
        } else {
            let end = HEADER_SIZE + claimed;
            let crc = crc32fast::hash(&self.file.as_slice()[HEADER_SIZE..end]);
            if crc == self.meta.crc {
                (end, None)
            } else {
                kv_error!(
                    "[{id}] {}",
                    StoreError::ChecksumMismatch {
                        expected: self.meta.crc,
                        actual: crc,
                    }
                );
                (end, Some(ErrorType::CrcCheckFail))
            }
        };

        let (records, parse_error) = decode_records(
            &self.file.as_slice()[HEADER_SIZE..region_end],
            self.cipher.as_ref(),
        );
        self.loaded = true;

        match damage {
            None => {
                if let Some(err) = parse_error {
                    kv_error!("[{id}] stopped reading at bad record: {err}");
                }
                apply_records(&mut self.entries, records);
                self.actual_size = claimed;
                Ok(())
            }
            Some(error_type) => match handler::on_error(id, error_type) {
                RecoverStrategy::Recover => {
                    apply_records(&mut self.entries, records);
                    kv_warn!(
                        "[{id}] recovered {} values after {error_type:?}",
                        self.entries.len()
                    );
                    self.actual_size = claimed.min(file_len - HEADER_SIZE);
                    self.full_writeback()
                }
                RecoverStrategy::Discard => {
                    kv_warn!("[{id}] discarded data after {error_type:?}");
                    self.actual_size = claimed.min(file_len - HEADER_SIZE);
                    self.clear(true)
                }
            },
        }
    }

    fn is_expired(&self, encoded: &[u8], now: u32) -> bool {
        self.meta.expire_enabled()
            && EncodedValue::parse(encoded)
                .map(|v| v.is_expired(now))
                .unwrap_or(false)
    }

    /// Returns the encoded value for `key`, dropping it if it expired.
    fn live_value(&mut self, id: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let expired = match self.entries.get(key) {
            Some(encoded) => self.is_expired(encoded, now_secs()),
            None => return Ok(None),
        };
        if expired {
            self.entries.remove(key);
            self.append(key, &[])?;
            kv_debug!("[{id}] key [{key}] expired");
            return Ok(None);
        }
        Ok(self.entries.get(key).cloned())
    }

    fn expire_at_for(&mut self, id: &str, expire: Option<u32>) -> StoreResult<u32> {
        match expire {
            None if self.meta.expire_enabled() => {
                Ok(expire_at_from_duration(self.meta.default_expire))
            }
            None | Some(0) => Ok(0),
            Some(seconds) => {
                if !self.meta.expire_enabled() {
                    self.enable_expire(id, 0)?;
                }
                Ok(expire_at_from_duration(seconds))
            }
        }
    }

    fn enable_expire(&mut self, id: &str, default_seconds: u32) -> StoreResult<()> {
        if self.compare_before_set {
            kv_info!("[{id}] compare-before-set turned off by auto-expire");
            self.compare_before_set = false;
        }
        self.meta.flags |= Meta::EXPIRE_ENABLED;
        self.meta.default_expire = default_seconds;
        self.meta_file.write(&self.meta)?;
        kv_info!("[{id}] auto-expire enabled, default {default_seconds}s");
        Ok(())
    }

    fn set_encoded(&mut self, key: &str, encoded: Vec<u8>) -> StoreResult<()> {
        if self.compare_before_set && self.entries.get(key) == Some(&encoded) {
            return Ok(());
        }
        let record_value = encoded.clone();
        self.entries.insert(key.to_string(), encoded);
        self.append(key, &record_value)
    }

    fn encode_record(&self, key: &str, value: &[u8]) -> StoreResult<Vec<u8>> {
        let mut body = Vec::with_capacity(4 + key.len() + value.len());
        body.extend_from_slice(&(key.len() as u32).to_le_bytes());
        body.extend_from_slice(key.as_bytes());
        body.extend_from_slice(value);
        let body = match &self.cipher {
            Some(cipher) => cipher.seal(&body)?,
            None => body,
        };

        let mut record = Vec::with_capacity(4 + body.len());
        record.extend_from_slice(&(body.len() as u32).to_le_bytes());
        record.extend_from_slice(&body);
        Ok(record)
    }

    /// Appends one record, falling back to a full rewrite when full.
    ///
    /// `entries` must already reflect the change.
    fn append(&mut self, key: &str, value: &[u8]) -> StoreResult<()> {
        let record = self.encode_record(key, value)?;
        let offset = HEADER_SIZE + self.actual_size;
        if offset + record.len() > self.file.len() {
            return self.full_writeback();
        }

        self.file.write_at(offset, &record)?;
        self.actual_size += record.len();
        self.file
            .write_at(0, &(self.actual_size as u32).to_le_bytes())?;

        let mut hasher = crc32fast::Hasher::new_with_initial(self.meta.crc);
        hasher.update(&record);
        self.meta.crc = hasher.finalize();
        self.meta.actual_size = self.actual_size as u32;
        self.meta_file.write(&self.meta)
    }

    /// Rewrites all live entries compactly, growing the file if needed.
    fn full_writeback(&mut self) -> StoreResult<()> {
        let mut region = Vec::new();
        for (key, value) in &self.entries {
            region.extend_from_slice(&self.encode_record(key, value)?);
        }

        let needed = HEADER_SIZE + region.len();
        let count = self.entries.len();
        let future = if count == 0 {
            0
        } else {
            region.len() / count * (count + 1).div_ceil(2).max(8)
        };
        let mut size = self.file.len().max(DEFAULT_MMAP_SIZE);
        while needed + future >= size {
            size *= 2;
        }
        if size != self.file.len() {
            self.file.resize(size as u64)?;
        }

        let old_end = HEADER_SIZE + self.actual_size;
        self.file.write_at(HEADER_SIZE, &region)?;
        if old_end > needed {
            let end = old_end.min(self.file.len());
            self.file.as_mut_slice()[needed..end].fill(0);
        }
        self.actual_size = region.len();
        self.file
            .write_at(0, &(self.actual_size as u32).to_le_bytes())?;

        self.meta.crc = crc32fast::hash(&region);
        self.meta.sequence = self.meta.sequence.wrapping_add(1);
        self.meta.actual_size = self.actual_size as u32;
        self.meta_file.write(&self.meta)
    }

    fn clear(&mut self, keep_space: bool) -> StoreResult<()> {
        self.entries.clear();
        let end = (HEADER_SIZE + self.actual_size).min(self.file.len());
        self.file.as_mut_slice()[..end].fill(0);
        if !keep_space {
            self.file.resize(round_to_page(0))?;
        }
        self.actual_size = 0;
        self.meta.crc = 0;
        self.meta.actual_size = 0;
        self.meta.sequence = self.meta.sequence.wrapping_add(1);
        self.meta_file.write(&self.meta)
    }
}

/// Parses records until the region ends or a record is bad.
///
/// Returns the records read so far and the error that stopped parsing.
fn decode_records(
    region: &[u8],
    cipher: Option<&RecordCipher>,
) -> (Vec<(String, Vec<u8>)>, Option<StoreError>) {
    let mut records = Vec::new();
    let mut pos = 0;
    while pos < region.len() {
        match decode_record(&region[pos..], cipher) {
            Ok((key, value, used)) => {
                records.push((key, value));
                pos += used;
            }
            Err(err) => return (records, Some(err)),
        }
    }
    (records, None)
}

fn decode_record(
    bytes: &[u8],
    cipher: Option<&RecordCipher>,
) -> StoreResult<(String, Vec<u8>, usize)> {
    if bytes.len() < 4 {
        return Err(StoreError::corrupted("truncated record length"));
    }
    let body_len = read_u32(bytes) as usize;
    let body = bytes
        .get(4..4 + body_len)
        .ok_or_else(|| StoreError::corrupted(format!("record of {body_len} bytes overruns log")))?;

    let opened;
    let body = match cipher {
        Some(cipher) => {
            opened = cipher.open(body)?;
            &opened[..]
        }
        None => body,
    };

    if body.len() < 4 {
        return Err(StoreError::corrupted("truncated key length"));
    }
    let key_len = read_u32(body) as usize;
    let key = body
        .get(4..4 + key_len)
        .ok_or_else(|| StoreError::corrupted("key overruns record"))?;
    let key = std::str::from_utf8(key)
        .map_err(|_| StoreError::corrupted("key is not UTF-8"))?
        .to_string();
    let value = body[4 + key_len..].to_vec();
    if !value.is_empty() {
        EncodedValue::parse(&value)?;
    }
    Ok((key, value, 4 + body_len))
}

fn apply_records(entries: &mut HashMap<String, Vec<u8>>, records: Vec<(String, Vec<u8>)>) {
    for (key, value) in records {
        if value.is_empty() {
            entries.remove(&key);
        } else {
            entries.insert(key, value);
        }
    }
}

fn check_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::invalid_argument("empty key"));
    }
    Ok(())
}

fn normalize_key(key: Option<&[u8]>) -> Option<Vec<u8>> {
    match key {
        Some(k) if !k.is_empty() => Some(k[..k.len().min(MAX_CRYPT_KEY_LEN)].to_vec()),
        _ => None,
    }
}

/// Copies a data file and its meta file.
pub(crate) fn copy_pair(src: &Path, dst: &Path) -> StoreResult<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    let src_meta = meta_path(src);
    if src_meta.exists() {
        fs::copy(src_meta, meta_path(dst))?;
    }
    Ok(())
}

/// Checks a store's files without opening it.
pub fn validate_files(path: &Path) -> StoreResult<()> {
    let data = fs::read(path)?;
    if data.len() < HEADER_SIZE {
        return Err(StoreError::FileLength {
            claimed: HEADER_SIZE as u64,
            available: data.len() as u64,
        });
    }
    let claimed = read_u32(&data) as usize;
    if HEADER_SIZE + claimed > data.len() {
        return Err(StoreError::FileLength {
            claimed: claimed as u64,
            available: (data.len() - HEADER_SIZE) as u64,
        });
    }
    let meta = match fs::read(meta_path(path)) {
        Ok(bytes) if bytes.len() >= crate::meta::META_SIZE => Meta::decode(&bytes)?,
        Ok(_) => Meta::default(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Meta::default(),
        Err(err) => return Err(err.into()),
    };
    let crc = crc32fast::hash(&data[HEADER_SIZE..HEADER_SIZE + claimed]);
    if crc != meta.crc {
        return Err(StoreError::ChecksumMismatch {
            expected: meta.crc,
            actual: crc,
        });
    }
    Ok(())
}
