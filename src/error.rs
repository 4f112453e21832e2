//! Error types for the storage engine.

use thiserror::Error;
use crate::types::PageId;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors surfaced by the core storage layers (disk, buffer pool, slotted
/// page, table heap, B+tree page format).
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A Disk Manager precondition was violated (negative page id).
    #[error("invalid page id: {0}")]
    InvalidPageId(i64),

    /// A Disk Manager precondition was violated (buffer length != PAGE_SIZE).
    #[error("bad buffer size: expected {expected}, got {actual}")]
    BadBufferSize { expected: usize, actual: usize },

    /// The buffer pool has no frame available for a fetch/new_page call.
    #[error("buffer pool exhausted: no frame available")]
    PoolExhausted,

    /// unpin/flush/delete referenced a page id not currently resident.
    #[error("page {0} is not resident in the buffer pool")]
    NotResident(PageId),

    /// unpin_page called when the frame's pin count was already zero.
    #[error("pin count underflow on page {0}")]
    UnderflowedPin(PageId),

    /// delete_page called while the page is still pinned.
    #[error("cannot delete page {0}: still pinned")]
    PinnedDelete(PageId),

    /// A slotted page insert could not find enough contiguous free space.
    #[error("page {page_id} is full: need {needed} bytes, {available} available")]
    PageFull {
        page_id: PageId,
        needed: usize,
        available: usize,
    },

    /// A slotted page read addressed a slot outside the slot directory.
    #[error("invalid slot {0}")]
    InvalidSlot(u16),

    /// A slotted page read addressed a slot whose record has been deleted.
    #[error("slot {0} is tombstoned")]
    Tombstoned(u16),

    /// A B+tree leaf page insert found no room for another (key, rid) pair.
    #[error("leaf page is full")]
    LeafFull,

    /// A B+tree internal page insert found no room for another (key, ptr) pair.
    #[error("internal page is full")]
    InternalFull,

    /// Data corruption detected (malformed header, bad JSON, etc).
    #[error("corruption detected: {0}")]
    Corruption(String),
}

impl StorageError {
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }
}
