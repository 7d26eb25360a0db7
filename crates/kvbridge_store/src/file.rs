//! Memory-mapped data file.

use crate::config::round_to_page;
use crate::error::{StoreError, StoreResult};
use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// A read-write mapping over a whole data file.
///
/// The file length is always a whole number of pages. Resizing drops the
/// mapping, changes the file length and maps it again.
#[derive(Debug)]
pub struct MappedFile {
    file: File,
    mmap: MmapMut,
}

impl MappedFile {
    /// Opens or creates the file, growing it to at least `min_len` bytes.
    pub fn open(path: &Path, min_len: u64) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let len = file.metadata()?.len();
        let want = round_to_page(len.max(min_len));
        if len != want {
            file.set_len(want)?;
        }

        let mmap = map(&file)?;
        Ok(Self {
            file,
            mmap,
        })
    }

    /// Returns the mapped length.
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Returns the mapped bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// Returns the mapped bytes for writing.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    /// Writes `data` at `offset`.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> StoreResult<()> {
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= self.mmap.len())
            .ok_or_else(|| {
                StoreError::invalid_argument(format!(
                    "write of {} bytes at {offset} exceeds mapping of {}",
                    data.len(),
                    self.mmap.len()
                ))
            })?;
        self.mmap[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Changes the file length, rounded to whole pages.
    pub fn resize(&mut self, new_len: u64) -> StoreResult<()> {
        let new_len = round_to_page(new_len);
        if new_len == self.mmap.len() as u64 {
            return Ok(());
        }
        self.mmap.flush()?;
        self.file.set_len(new_len)?;
        self.mmap = map(&self.file)?;
        Ok(())
    }

    /// Maps the file again if another process changed its length.
    ///
    /// Returns true if the mapping changed.
    pub fn refresh(&mut self) -> StoreResult<bool> {
        let len = self.file.metadata()?.len();
        if len == self.mmap.len() as u64 {
            return Ok(false);
        }
        if len == 0 {
            self.file.set_len(round_to_page(0))?;
        }
        self.mmap = map(&self.file)?;
        Ok(true)
    }

    /// Flushes dirty pages, blocking when `sync` is set.
    pub fn flush(&self, sync: bool) -> StoreResult<()> {
        if sync {
            self.mmap.flush()?;
        } else {
            self.mmap.flush_async()?;
        }
        Ok(())
    }
}

fn map(file: &File) -> StoreResult<MmapMut> {
    // SAFETY: Every mapping is owned by one `MappedFile` behind the store
    // mutex. Other processes only write under the shared file lock, and
    // each operation re-checks the length before touching the mapping.
    #[allow(unsafe_code)]
    let mmap = unsafe { MmapMut::map_mut(file) }?;
    Ok(mmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MMAP_SIZE;
    use tempfile::tempdir;

    #[test]
    fn new_file_is_one_page() {
        let dir = tempdir().unwrap();
        let file = MappedFile::open(&dir.path().join("data"), 0).unwrap();
        assert_eq!(file.len(), DEFAULT_MMAP_SIZE);
        assert!(file.as_slice().iter().all(|b| *b == 0));
    }

    #[test]
    fn capacity_hint_rounds_up() {
        let dir = tempdir().unwrap();
        let file = MappedFile::open(&dir.path().join("data"), 10_000).unwrap();
        assert_eq!(file.len(), 3 * DEFAULT_MMAP_SIZE);
    }

    #[test]
    fn write_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data");
        {
            let mut file = MappedFile::open(&path, 0).unwrap();
            file.write_at(8, b"hello").unwrap();
            file.flush(true).unwrap();
        }
        let file = MappedFile::open(&path, 0).unwrap();
        assert_eq!(&file.as_slice()[8..13], b"hello");
    }

    #[test]
    fn write_past_end_fails() {
        let dir = tempdir().unwrap();
        let mut file = MappedFile::open(&dir.path().join("data"), 0).unwrap();
        assert!(file.write_at(DEFAULT_MMAP_SIZE - 2, b"abc").is_err());
    }

    #[test]
    fn resize_keeps_content() {
        let dir = tempdir().unwrap();
        let mut file = MappedFile::open(&dir.path().join("data"), 0).unwrap();
        file.write_at(0, b"keep").unwrap();
        file.resize(3 * DEFAULT_MMAP_SIZE as u64).unwrap();
        assert_eq!(file.len(), 3 * DEFAULT_MMAP_SIZE);
        assert_eq!(&file.as_slice()[..4], b"keep");

        file.resize(1).unwrap();
        assert_eq!(file.len(), DEFAULT_MMAP_SIZE);
        assert_eq!(&file.as_slice()[..4], b"keep");
    }

    #[test]
    fn refresh_sees_external_growth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data");
        let mut a = MappedFile::open(&path, 0).unwrap();
        let mut b = MappedFile::open(&path, 0).unwrap();

        b.resize(2 * DEFAULT_MMAP_SIZE as u64).unwrap();
        assert!(a.refresh().unwrap());
        assert_eq!(a.len(), 2 * DEFAULT_MMAP_SIZE);
        assert!(!a.refresh().unwrap());
    }
}
