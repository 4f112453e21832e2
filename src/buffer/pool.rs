//! Buffer pool manager: the bounded, pinned, write-back page cache sitting
//! between the disk manager and everything that interprets page bytes.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::replacer::Replacer;
use crate::error::Result;
use crate::page::Page;
use crate::storage::DiskManager;
use crate::types::{FrameId, PageId};

/// A lightweight, cloneable reference to a resident frame.
///
/// Holding a `PageHandle` does not hold the pool's mutex: the pool mutex is
/// only taken for the duration of `fetch_page`/`new_page`/`unpin_page`/etc.
/// Reading or writing the page's bytes takes the frame's own lock, the
/// "frame-level mutex for cache coherence" the core's non-goals call out —
/// it is how a coarse pool-wide mutex can coexist with callers holding a
/// page across other work.
#[derive(Clone)]
pub struct PageHandle {
    frame: Arc<Mutex<Page>>,
    page_id: PageId,
}

impl PageHandle {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Lock the frame for reading or writing its bytes.
    pub fn lock(&self) -> parking_lot::MutexGuard<'_, Page> {
        self.frame.lock()
    }
}

struct PoolState {
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
}

/// Bounded cache of `Page` frames, backed by a `DiskManager` and a pluggable
/// `Replacer` for victim selection.
pub struct BufferPoolManager {
    frames: Vec<Arc<Mutex<Page>>>,
    state: Mutex<PoolState>,
    replacer: Arc<dyn Replacer>,
    disk: Arc<DiskManager>,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, disk: Arc<DiskManager>, replacer: Arc<dyn Replacer>) -> Self {
        let frames = (0..pool_size)
            .map(|_| Arc::new(Mutex::new(Page::new())))
            .collect();
        let free_list = (0..pool_size).collect();
        Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
            }),
            replacer,
            disk,
        }
    }

    /// Number of pages committed to the backing file so far.
    pub fn committed_page_count(&self) -> i64 {
        self.disk.committed_page_count()
    }

    /// Write back a frame's bytes if dirty, and drop its old mapping from
    /// the page table. Called with `state` and the frame already locked by
    /// the caller.
    fn evict_if_needed(&self, state: &mut PoolState, page: &mut Page) -> Result<()> {
        if page.page_id().is_valid() {
            if page.is_dirty() {
                self.disk.write_page(page.page_id(), page.data())?;
                page.mark_clean();
                log::debug!("wrote back dirty page {} on eviction", page.page_id());
            }
            state.page_table.remove(&page.page_id());
        }
        Ok(())
    }

    fn obtain_frame(&self, state: &mut PoolState) -> Option<FrameId> {
        state
            .free_list
            .pop_front()
            .or_else(|| self.replacer.victim())
    }

    /// Fetch `page_id`, pinning it. Returns `None` if the pool has no frame
    /// to give (every frame pinned and the free list empty).
    pub fn fetch_page(&self, page_id: PageId) -> Result<Option<PageHandle>> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = self.frames[frame_id].clone();
            frame.lock().increment_pin();
            self.replacer.pin(frame_id);
            log::debug!("fetch_page {page_id}: cache hit");
            return Ok(Some(PageHandle { frame, page_id }));
        }

        let frame_id = match self.obtain_frame(&mut state) {
            Some(f) => f,
            None => {
                log::warn!("fetch_page {page_id}: pool exhausted");
                return Ok(None);
            }
        };
        let frame = self.frames[frame_id].clone();
        {
            let mut page = frame.lock();
            self.evict_if_needed(&mut state, &mut page)?;
            page.reset_memory();
            page.set_page_id(page_id);
            self.disk.read_page(page_id, page.data_mut())?;
            page.increment_pin();
            page.mark_clean();
        }
        state.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        log::debug!("fetch_page {page_id}: loaded into frame {frame_id}");
        Ok(Some(PageHandle { frame, page_id }))
    }

    /// Allocate a brand-new page and pin it. No disk id is consumed unless a
    /// frame is actually available, so page ids stay monotonic.
    pub fn new_page(&self) -> Result<Option<PageHandle>> {
        let mut state = self.state.lock();

        let frame_id = match self.obtain_frame(&mut state) {
            Some(f) => f,
            None => {
                log::warn!("new_page: pool exhausted");
                return Ok(None);
            }
        };
        let frame = self.frames[frame_id].clone();
        let new_id;
        {
            let mut page = frame.lock();
            self.evict_if_needed(&mut state, &mut page)?;
            new_id = self.disk.allocate_page();
            page.reset_memory();
            page.set_page_id(new_id);
            page.increment_pin();
            // Commit the extent now so the id is durable immediately.
            self.disk.write_page(new_id, page.data())?;
            page.mark_clean();
        }
        state.page_table.insert(new_id, frame_id);
        self.replacer.pin(frame_id);
        log::debug!("new_page -> {new_id} in frame {frame_id}");
        Ok(Some(PageHandle {
            frame,
            page_id: new_id,
        }))
    }

    /// Decrement `page_id`'s pin count, marking it dirty if requested.
    /// Returns `false` if the id is not resident or the pin count was
    /// already zero (both caller bugs, not I/O failures).
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let state = self.state.lock();
        let frame_id = match state.page_table.get(&page_id) {
            Some(&f) => f,
            None => {
                log::warn!("unpin_page {page_id}: not resident");
                return false;
            }
        };
        let frame = self.frames[frame_id].clone();
        let mut page = frame.lock();
        if page.pin_count() == 0 {
            log::warn!("unpin_page {page_id}: pin count already zero");
            return false;
        }
        page.decrement_pin().expect("pin count checked non-zero above");
        if is_dirty {
            page.mark_dirty();
        }
        let now_unpinned = page.pin_count() == 0;
        drop(page);
        if now_unpinned {
            self.replacer.unpin(frame_id);
        }
        true
    }

    /// Write `page_id`'s bytes to disk unconditionally and mark it clean.
    /// Returns `Ok(false)` if the id is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let state = self.state.lock();
        let frame_id = match state.page_table.get(&page_id) {
            Some(&f) => f,
            None => return Ok(false),
        };
        let frame = self.frames[frame_id].clone();
        let mut page = frame.lock();
        self.disk.write_page(page_id, page.data())?;
        page.mark_clean();
        log::debug!("flush_page {page_id}");
        Ok(true)
    }

    /// Flush every currently dirty resident page.
    pub fn flush_all_pages(&self) -> Result<()> {
        let state = self.state.lock();
        let ids: Vec<PageId> = state.page_table.keys().copied().collect();
        drop(state);
        for id in ids {
            let state = self.state.lock();
            if let Some(&frame_id) = state.page_table.get(&id) {
                let frame = self.frames[frame_id].clone();
                drop(state);
                let mut page = frame.lock();
                if page.is_dirty() {
                    self.disk.write_page(id, page.data())?;
                    page.mark_clean();
                }
            }
        }
        log::info!("flush_all_pages complete");
        Ok(())
    }

    /// Evict `page_id` from the pool entirely. Succeeds as a no-op (after
    /// forwarding to the disk manager's no-op deallocation) if the id is not
    /// resident. Fails if the page is still pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut state = self.state.lock();
        let frame_id = match state.page_table.get(&page_id) {
            Some(&f) => f,
            None => {
                self.disk.deallocate_page(page_id)?;
                return Ok(true);
            }
        };
        let frame = self.frames[frame_id].clone();
        {
            let page = frame.lock();
            if page.pin_count() > 0 {
                log::warn!("delete_page {page_id}: still pinned");
                return Ok(false);
            }
        }
        state.page_table.remove(&page_id);
        self.replacer.pin(frame_id); // drop from candidate set
        state.free_list.push_back(frame_id);
        frame.lock().reset_memory();
        self.disk.deallocate_page(page_id)?;
        log::debug!("delete_page {page_id}");
        Ok(true)
    }
}
