//! # Memory-Mapped Column Files
//!
//! This module implements `ColumnFile`, the growable memory-mapped region that
//! backs one stored column. A column file is a flat array of native-endian `i32`
//! values:
//!
//! ```text
//! Offset 0:    value[0]
//! Offset 4:    value[1]
//! ...
//! Offset 4n:   page padding (ignored, tolerated at open)
//! ```
//!
//! The file may be longer than the column's logical length. Growth rounds the
//! mapping up to a whole number of OS pages, and files written by an older run
//! may carry that padding. Only the owner (`schema::Column`) knows the logical
//! element count; this type only guarantees that `capacity()` elements are mapped.
//!
//! ## Growth
//!
//! ```text
//! write_at(&mut self, offset, values)
//!     │
//!     ├─ (offset + len) * 4 <= mapped_len ──> copy in place (no remap)
//!     │
//!     └─ otherwise ──> grow(round_up(bytes, page))
//!                         1. flush old map
//!                         2. file.set_len(new_len)
//!                         3. map new region
//!                         4. swap map, then copy
//! ```
//!
//! The new mapping is only installed once every step succeeded. If mapping the
//! grown file fails, the file length is restored and the old mapping stays in
//! place, so a failed write leaves the column exactly as it was.
//!
//! ## Safety Considerations
//!
//! Remapping invalidates every slice into the old region. `values()` borrows
//! `&self` while `write_at()` and `grow()` take `&mut self`, so the borrow
//! checker rejects any code that holds column data across a growth event.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use eyre::{ensure, eyre, Result, WrapErr};
use memmap2::MmapMut;
use zerocopy::{FromBytes, IntoBytes};

use super::os_page_size;
use crate::config::ELEMENT_SIZE;

#[derive(Debug)]
pub struct ColumnFile {
    path: PathBuf,
    file: File,
    mmap: Option<MmapMut>,
    mapped_len: usize,
}

impl ColumnFile {
    /// Creates an empty backing file. Nothing is mapped until the first write.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .wrap_err_with(|| format!("failed to create column file '{}'", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            mmap: None,
            mapped_len: 0,
        })
    }

    /// Opens an existing column file that must hold at least `num_elements` values.
    pub fn open<P: AsRef<Path>>(path: P, num_elements: usize) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .wrap_err_with(|| format!("failed to open column file '{}'", path.display()))?;

        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to get metadata for '{}'", path.display()))?
            .len() as usize;

        let needed = byte_len(path, num_elements)?;
        ensure!(
            file_size >= needed,
            "column file '{}' holds {} bytes but {} elements need {}",
            path.display(),
            file_size,
            num_elements,
            needed
        );

        let mmap = if file_size == 0 {
            None
        } else {
            // SAFETY: MmapMut::map_mut is unsafe because the file could be changed
            // by another process while mapped. This is safe because:
            // 1. The storage root is held under an exclusive LOCK file
            // 2. The map lives inside ColumnFile and is dropped with it
            // 3. All reads go through values(), which bounds the slice by mapped_len
            Some(unsafe {
                MmapMut::map_mut(&file)
                    .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
            })
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
            mmap,
            mapped_len: file_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mapped_len(&self) -> usize {
        self.mapped_len
    }

    /// Number of whole elements the current mapping can hold.
    pub fn capacity(&self) -> usize {
        self.mapped_len / ELEMENT_SIZE
    }

    /// Base address of the current mapping, or `None` while unmapped.
    ///
    /// Only meaningful for identity comparisons: two equal ids mean no remap
    /// happened in between.
    pub fn region_id(&self) -> Option<usize> {
        self.mmap.as_ref().map(|m| m.as_ptr() as usize)
    }

    /// Returns the first `len` elements of the region.
    pub fn values(&self, len: usize) -> Result<&[i32]> {
        if len == 0 {
            return Ok(&[]);
        }

        ensure!(
            len <= self.capacity(),
            "read of {} elements exceeds mapped capacity {} in '{}'",
            len,
            self.capacity(),
            self.path.display()
        );

        let mmap = self
            .mmap
            .as_ref()
            .ok_or_else(|| eyre!("column file '{}' is not mapped", self.path.display()))?;

        <[i32]>::ref_from_bytes(&mmap[..len * ELEMENT_SIZE])
            .map_err(|_| eyre!("column file '{}' is misaligned", self.path.display()))
    }

    /// Writes `values` starting at element `offset`, growing the mapping first
    /// when the write does not fit.
    pub fn write_at(&mut self, offset: usize, values: &[i32]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }

        let end = offset
            .checked_add(values.len())
            .ok_or_else(|| {
                eyre!(
                    "write past element {} overflows in '{}'",
                    offset,
                    self.path.display()
                )
            })
            .and_then(|elements| byte_len(&self.path, elements))?;
        if end > self.mapped_len {
            self.grow(end)?;
        }

        let mmap = self
            .mmap
            .as_mut()
            .ok_or_else(|| eyre!("column file '{}' is not mapped", self.path.display()))?;

        mmap[offset * ELEMENT_SIZE..end].copy_from_slice(values.as_bytes());
        Ok(())
    }

    /// Grows the mapping to hold at least `min_bytes`, rounded up to the OS page size.
    pub fn grow(&mut self, min_bytes: usize) -> Result<()> {
        if min_bytes <= self.mapped_len {
            return Ok(());
        }

        let page = os_page_size();
        let new_len = min_bytes
            .div_ceil(page)
            .checked_mul(page)
            .ok_or_else(|| {
                eyre!(
                    "cannot grow '{}' past {} bytes",
                    self.path.display(),
                    min_bytes
                )
            })?;
        let old_len = self.mapped_len;

        if let Some(mmap) = &self.mmap {
            mmap.flush()
                .wrap_err_with(|| format!("failed to flush '{}' before grow", self.path.display()))?;
        }

        self.file.set_len(new_len as u64).wrap_err_with(|| {
            format!(
                "failed to extend '{}' to {} bytes",
                self.path.display(),
                new_len
            )
        })?;

        // SAFETY: MmapMut::map_mut is unsafe because the old map becomes stale.
        // This is safe because:
        // 1. grow() takes &mut self, so no slice into the old map can exist
        // 2. The old map was flushed above and is dropped when replaced
        // 3. The file was extended to new_len before mapping
        let mapped = unsafe { MmapMut::map_mut(&self.file) };

        match mapped {
            Ok(new_map) => {
                self.mmap = Some(new_map);
                self.mapped_len = new_len;
                Ok(())
            }
            Err(e) => {
                let _ = self.file.set_len(old_len as u64);
                Err(e).wrap_err_with(|| {
                    format!("failed to remap '{}' after grow", self.path.display())
                })
            }
        }
    }

    /// Shrinks the file to exactly `num_elements` values and makes it durable.
    ///
    /// The current map stays in place until the shrink succeeds, so a failed
    /// truncate leaves the column readable. Afterwards the region is re-mapped
    /// at the shrunk length.
    pub fn truncate_and_sync(&mut self, num_elements: usize) -> Result<()> {
        let logical = byte_len(&self.path, num_elements)?;
        ensure!(
            logical <= self.mapped_len,
            "cannot truncate '{}' to {} bytes beyond its mapped {}",
            self.path.display(),
            logical,
            self.mapped_len
        );

        if let Some(mmap) = &self.mmap {
            mmap.flush()
                .wrap_err_with(|| format!("failed to flush '{}'", self.path.display()))?;
        }

        // Pages of the old map past `logical` are never touched again: &mut self
        // blocks readers until the map is dropped below.
        self.file.set_len(logical as u64).wrap_err_with(|| {
            format!(
                "failed to truncate '{}' to {} bytes",
                self.path.display(),
                logical
            )
        })?;

        self.mmap = None;
        self.mapped_len = 0;
        let remapped = self.remap(logical);
        let synced = self
            .file
            .sync_all()
            .wrap_err_with(|| format!("failed to sync '{}'", self.path.display()));

        remapped.and(synced)
    }

    fn remap(&mut self, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        // SAFETY: same conditions as in open(); the previous map was dropped
        // before this call and the file now has exactly `len` bytes.
        let mmap = unsafe {
            MmapMut::map_mut(&self.file)
                .wrap_err_with(|| format!("failed to remap '{}'", self.path.display()))?
        };
        self.mmap = Some(mmap);
        self.mapped_len = len;
        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        match &self.mmap {
            Some(mmap) => mmap.flush().wrap_err("failed to sync column mmap to disk"),
            None => Ok(()),
        }
    }

    /// Swaps the write handle for a read-only one, so every later resize of
    /// the file fails while the existing map stays readable.
    #[cfg(test)]
    pub(crate) fn reopen_read_only(&mut self) -> Result<()> {
        self.file = File::open(&self.path)
            .wrap_err_with(|| format!("failed to reopen '{}'", self.path.display()))?;
        Ok(())
    }

    /// Hints the kernel that the first `len` elements are about to be scanned.
    pub fn advise_sequential(&self, len: usize) {
        let Some(mmap) = &self.mmap else {
            return;
        };
        let bytes = (len * ELEMENT_SIZE).min(self.mapped_len);
        if bytes == 0 {
            return;
        }

        #[cfg(unix)]
        // SAFETY: madvise is a hint and cannot cause undefined behavior for a
        // valid mapping. The range starts at the map base and `bytes` is clamped
        // to mapped_len, so it never leaves the mapped region.
        unsafe {
            libc::madvise(
                mmap.as_ptr() as *mut libc::c_void,
                bytes,
                libc::MADV_SEQUENTIAL,
            );
        }
    }
}

/// Byte length of `num_elements` values; counts read from disk may be garbage.
fn byte_len(path: &Path, num_elements: usize) -> Result<usize> {
    num_elements.checked_mul(ELEMENT_SIZE).ok_or_else(|| {
        eyre!(
            "{} elements overflow the addressable size of '{}'",
            num_elements,
            path.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_is_unmapped_until_first_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.t.a.col");

        let file = ColumnFile::create(&path).unwrap();

        assert_eq!(file.mapped_len(), 0);
        assert_eq!(file.region_id(), None);
        assert!(file.values(0).unwrap().is_empty());
        assert!(file.values(1).is_err());
    }

    #[test]
    fn write_rounds_mapping_to_page_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.t.a.col");

        let mut file = ColumnFile::create(&path).unwrap();
        file.write_at(0, &[1, 2, 3]).unwrap();

        let page = os_page_size();
        assert_eq!(file.mapped_len(), page);
        assert_eq!(file.capacity(), page / ELEMENT_SIZE);
        assert_eq!(file.values(3).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn write_within_capacity_keeps_region_identity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.t.a.col");

        let mut file = ColumnFile::create(&path).unwrap();
        file.write_at(0, &[7]).unwrap();
        let before = file.region_id();
        let len_before = file.mapped_len();

        file.write_at(1, &[8, 9]).unwrap();
        file.write_at(file.capacity() - 1, &[10]).unwrap();

        assert_eq!(file.region_id(), before);
        assert_eq!(file.mapped_len(), len_before);
    }

    #[test]
    fn write_past_capacity_grows_and_preserves_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.t.a.col");

        let mut file = ColumnFile::create(&path).unwrap();
        file.write_at(0, &[42, -1]).unwrap();
        let cap = file.capacity();

        file.write_at(cap, &[5]).unwrap();

        assert!(file.capacity() > cap);
        assert_eq!(file.mapped_len() % os_page_size(), 0);
        let values = file.values(cap + 1).unwrap();
        assert_eq!(&values[..2], &[42, -1]);
        assert_eq!(values[cap], 5);
    }

    #[test]
    fn grow_to_smaller_size_is_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.t.a.col");

        let mut file = ColumnFile::create(&path).unwrap();
        file.write_at(0, &[1]).unwrap();
        let len = file.mapped_len();

        file.grow(4).unwrap();
        file.grow(len).unwrap();

        assert_eq!(file.mapped_len(), len);
    }

    #[test]
    fn truncate_then_open_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.t.a.col");

        {
            let mut file = ColumnFile::create(&path).unwrap();
            file.write_at(0, &[3, 1, 4, 1, 5]).unwrap();
            file.truncate_and_sync(5).unwrap();
            assert_eq!(file.mapped_len(), 5 * ELEMENT_SIZE);
        }

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 20);
        let file = ColumnFile::open(&path, 5).unwrap();
        assert_eq!(file.values(5).unwrap(), &[3, 1, 4, 1, 5]);
    }

    #[test]
    fn open_tolerates_trailing_padding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.t.a.col");

        {
            let mut file = ColumnFile::create(&path).unwrap();
            file.write_at(0, &[9, 8]).unwrap();
            file.sync().unwrap();
        }

        let file = ColumnFile::open(&path, 2).unwrap();
        assert_eq!(file.values(2).unwrap(), &[9, 8]);
        assert!(file.mapped_len() >= os_page_size());
    }

    #[test]
    fn open_rejects_short_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.t.a.col");
        std::fs::write(&path, [0u8; 6]).unwrap();

        let err = ColumnFile::open(&path, 2).unwrap_err();

        assert!(err.to_string().contains("elements need 8"));
    }

    #[test]
    fn open_fails_for_missing_file() {
        let dir = tempdir().unwrap();

        assert!(ColumnFile::open(dir.path().join("missing.col"), 0).is_err());
    }

    #[test]
    fn open_rejects_overflowing_element_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.t.a.col");
        std::fs::write(&path, [0u8; 8]).unwrap();

        let err = ColumnFile::open(&path, 1 << 62).unwrap_err();

        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn write_at_rejects_overflowing_offset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.t.a.col");
        let mut file = ColumnFile::create(&path).unwrap();

        assert!(file.write_at(usize::MAX, &[1]).is_err());
        assert!(file.write_at(usize::MAX / 2, &[1]).is_err());
        assert_eq!(file.mapped_len(), 0);
    }

    #[test]
    fn failed_truncate_keeps_column_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.t.a.col");
        let mut file = ColumnFile::create(&path).unwrap();
        file.write_at(0, &[6, 2, 8]).unwrap();
        let mapped = file.mapped_len();

        file.reopen_read_only().unwrap();
        assert!(file.truncate_and_sync(3).is_err());

        assert_eq!(file.mapped_len(), mapped);
        assert_eq!(file.values(3).unwrap(), &[6, 2, 8]);
    }
}
