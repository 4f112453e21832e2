//! Disk manager: fixed-size page I/O over a single file, plus monotonic
//! page-id allocation.
//!
//! There is no superblock and no magic bytes: page 0's special meaning (the
//! catalog root) is a convention enforced by the catalog layer, not by the
//! disk manager. All operations are serialized by one internal mutex, file
//! I/O included.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;

use crate::error::{Result, StorageError};
use crate::types::{PageId, PAGE_SIZE};

struct Inner {
    file: File,
    /// Number of pages currently committed to the file. A `read_page` for an
    /// id at or beyond this extent returns zeros rather than erroring.
    num_pages: i64,
    /// Next id `allocate_page` will hand out. Only ever increases.
    next_page_id: i64,
}

/// Owns the single database file and the page-id allocator.
pub struct DiskManager {
    inner: Mutex<Inner>,
    sync_on_write: bool,
}

impl DiskManager {
    /// Open (or create) the database file at `path`. The initial allocator
    /// counter is derived from the file's current size.
    pub fn open(path: &Path, sync_on_write: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let len = file.metadata()?.len();
        let num_pages = (len / PAGE_SIZE as u64) as i64;

        log::info!(
            "opened database file {:?} ({} pages committed)",
            path,
            num_pages
        );

        Ok(Self {
            inner: Mutex::new(Inner {
                file,
                num_pages,
                next_page_id: num_pages,
            }),
            sync_on_write,
        })
    }

    /// Read `id`'s bytes into `dest`. If `id` is beyond the committed
    /// extent, `dest` is zero-filled instead of erroring — the page simply
    /// has not been written yet.
    pub fn read_page(&self, id: PageId, dest: &mut [u8]) -> Result<()> {
        if !id.is_valid() {
            return Err(StorageError::InvalidPageId(id.value() as i64));
        }
        if dest.len() != PAGE_SIZE {
            return Err(StorageError::BadBufferSize {
                expected: PAGE_SIZE,
                actual: dest.len(),
            });
        }

        let mut inner = self.inner.lock();
        if id.value() as i64 >= inner.num_pages {
            dest.fill(0);
            log::debug!("read_page {id}: beyond extent, returning zeros");
            return Ok(());
        }

        let offset = id.file_offset(PAGE_SIZE);
        inner.file.seek(SeekFrom::Start(offset))?;

        dest.fill(0);
        let mut reader = (&inner.file).take(PAGE_SIZE as u64);
        let mut read = 0;
        loop {
            let n = reader.read(&mut dest[read..])?;
            if n == 0 {
                break;
            }
            read += n;
        }
        log::debug!("read_page {id}: {read} bytes read");
        Ok(())
    }

    /// Write `src` at `id`'s offset, growing the committed extent if needed.
    pub fn write_page(&self, id: PageId, src: &[u8]) -> Result<()> {
        if !id.is_valid() {
            return Err(StorageError::InvalidPageId(id.value() as i64));
        }
        if src.len() != PAGE_SIZE {
            return Err(StorageError::BadBufferSize {
                expected: PAGE_SIZE,
                actual: src.len(),
            });
        }

        let mut inner = self.inner.lock();
        let offset = id.file_offset(PAGE_SIZE);
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(src)?;
        if self.sync_on_write {
            inner.file.sync_data()?;
        }

        let id_val = id.value() as i64;
        if id_val >= inner.num_pages {
            inner.num_pages = id_val + 1;
            if inner.next_page_id < inner.num_pages {
                inner.next_page_id = inner.num_pages;
            }
        }
        log::debug!("write_page {id}: {} bytes written", src.len());
        Ok(())
    }

    /// Hand out the next page id. Does not touch the file; the id is only
    /// committed once something is written there.
    pub fn allocate_page(&self) -> PageId {
        let mut inner = self.inner.lock();
        let id = inner.next_page_id;
        inner.next_page_id += 1;
        log::debug!("allocate_page -> {id}");
        PageId::new(id as i32)
    }

    /// No-op: page ids are never returned to a free pool in this core.
    pub fn deallocate_page(&self, _id: PageId) -> Result<()> {
        Ok(())
    }

    /// Number of pages committed to the file so far. Used by callers that
    /// need to tell a brand-new database apart from a reopened one (e.g.
    /// the catalog reserving its root page exactly once).
    pub fn committed_page_count(&self) -> i64 {
        self.inner.lock().num_pages
    }

    /// Flush and close. Safe to call more than once.
    pub fn shutdown(&self) -> Result<()> {
        let inner = self.inner.lock();
        inner.file.sync_all()?;
        Ok(())
    }
}
