//! Table heap: a logical table as an ordered, append-only list of slotted
//! data pages, plus a full-scan iterator that pins at most one page at a
//! time. Grounded on `dbms/storage/table_heap.py` in the source.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::{BufferPoolManager, PageHandle};
use crate::error::Result;
use crate::page::slotted::SlottedPage;
use crate::types::{PageId, Rid};

/// A table as a sequence of slotted data pages. Insertion probes pages in
/// reverse order (most recently allocated first) before growing the heap;
/// a per-heap mutex serializes insertions so the page list and each page's
/// free-space probing stay consistent.
pub struct TableHeap {
    pool: Arc<BufferPoolManager>,
    page_ids: Mutex<Vec<PageId>>,
}

impl TableHeap {
    /// Wrap an existing page list (e.g. loaded from the catalog). The list
    /// must contain at least the table's first page once any insert has
    /// happened; an empty list is legal for a brand-new table about to
    /// receive its first page on the next insert.
    pub fn new(pool: Arc<BufferPoolManager>, page_ids: Vec<PageId>) -> Self {
        Self {
            pool,
            page_ids: Mutex::new(page_ids),
        }
    }

    /// Snapshot of the heap's current page ids, in allocation order.
    pub fn page_ids(&self) -> Vec<PageId> {
        self.page_ids.lock().clone()
    }

    /// Insert `bytes` as a new record, growing the heap with a fresh page if
    /// every existing page is full. Returns `None` if the buffer pool has no
    /// frame to give, even after attempting to allocate a new page.
    pub fn insert_record(&self, bytes: &[u8]) -> Result<Option<Rid>> {
        let mut page_ids = self.page_ids.lock();

        for i in (0..page_ids.len()).rev() {
            let page_id = page_ids[i];
            let handle = match self.pool.fetch_page(page_id)? {
                Some(h) => h,
                None => continue,
            };
            let slot = {
                let mut guard = handle.lock();
                let mut sp = SlottedPage::new(guard.data_mut());
                sp.insert_record(bytes)
            };
            if let Some(slot) = slot {
                self.pool.unpin_page(page_id, true);
                log::debug!("table heap insert -> ({page_id}, {slot})");
                return Ok(Some(Rid::new(page_id, slot as i32)));
            }
            self.pool.unpin_page(page_id, false);
        }

        let handle = match self.pool.new_page()? {
            Some(h) => h,
            None => return Ok(None),
        };
        let new_id = handle.page_id();
        let slot = {
            let mut guard = handle.lock();
            let mut sp = SlottedPage::new(guard.data_mut());
            sp.initialize();
            sp.insert_record(bytes)
        };

        match slot {
            Some(slot) => {
                self.pool.unpin_page(new_id, true);
                page_ids.push(new_id);
                log::debug!("table heap grew to page {new_id}, insert -> ({new_id}, {slot})");
                Ok(Some(Rid::new(new_id, slot as i32)))
            }
            None => {
                self.pool.unpin_page(new_id, true);
                self.pool.delete_page(new_id)?;
                Ok(None)
            }
        }
    }

    pub fn get_record(&self, rid: Rid) -> Result<Option<Vec<u8>>> {
        if !rid.is_valid() {
            return Ok(None);
        }
        let handle = match self.pool.fetch_page(rid.page_id)? {
            Some(h) => h,
            None => return Ok(None),
        };
        let record = {
            let mut guard = handle.lock();
            let sp = SlottedPage::new(guard.data_mut());
            sp.get_record(rid.slot_num as u16).map(|b| b.to_vec())
        };
        self.pool.unpin_page(rid.page_id, false);
        Ok(record)
    }

    pub fn delete_record(&self, rid: Rid) -> Result<bool> {
        if !rid.is_valid() {
            return Ok(false);
        }
        let handle = match self.pool.fetch_page(rid.page_id)? {
            Some(h) => h,
            None => return Ok(false),
        };
        let (ok, dirty) = {
            let mut guard = handle.lock();
            let mut sp = SlottedPage::new(guard.data_mut());
            let ok = sp.delete_record(rid.slot_num as u16);
            (ok, guard.is_dirty() || ok)
        };
        self.pool.unpin_page(rid.page_id, dirty);
        Ok(ok)
    }

    /// A full-scan iterator over a snapshot of the page list taken now:
    /// pages allocated by concurrent inserts after this call are not
    /// observed by the returned iterator.
    pub fn iterator(&self) -> TableIterator {
        let snapshot = self.page_ids.lock().clone();
        TableIterator::new(self.pool.clone(), snapshot)
    }
}

/// Yields every live record across a table heap's pages, pinning at most one
/// page at a time. Constructed from a snapshot page-id list, so it is
/// unaffected by heap growth that happens after construction.
pub struct TableIterator {
    pool: Arc<BufferPoolManager>,
    page_ids: Vec<PageId>,
    next_page_index: usize,
    current: Option<(PageId, PageHandle)>,
    records: Vec<(u16, Vec<u8>)>,
    record_index: usize,
}

impl TableIterator {
    fn new(pool: Arc<BufferPoolManager>, page_ids: Vec<PageId>) -> Self {
        let mut iter = Self {
            pool,
            page_ids,
            next_page_index: 0,
            current: None,
            records: Vec::new(),
            record_index: 0,
        };
        iter.advance_page();
        iter
    }

    /// Unpin the current page (if any) and load the next page that fetches
    /// successfully. Returns `false` once the page list is exhausted.
    fn advance_page(&mut self) -> bool {
        if let Some((page_id, _)) = self.current.take() {
            self.pool.unpin_page(page_id, false);
        }
        self.records.clear();
        self.record_index = 0;

        while self.next_page_index < self.page_ids.len() {
            let page_id = self.page_ids[self.next_page_index];
            self.next_page_index += 1;

            let handle = match self.pool.fetch_page(page_id) {
                Ok(Some(h)) => h,
                _ => continue,
            };
            let records = {
                let mut guard = handle.lock();
                let sp = SlottedPage::new(guard.data_mut());
                sp.scan_valid()
                    .into_iter()
                    .map(|(slot, bytes)| (slot, bytes.to_vec()))
                    .collect::<Vec<_>>()
            };
            self.current = Some((page_id, handle));
            self.records = records;
            return true;
        }
        false
    }

    /// The next `(rid, bytes)` pair, or `None` once every page has been
    /// exhausted.
    pub fn next(&mut self) -> Option<(Rid, Vec<u8>)> {
        loop {
            if self.record_index < self.records.len() {
                let (slot, bytes) = self.records[self.record_index].clone();
                self.record_index += 1;
                let page_id = self.current.as_ref().expect("records imply a current page").0;
                return Some((Rid::new(page_id, slot as i32), bytes));
            }
            if !self.advance_page() {
                return None;
            }
        }
    }

    /// Unpin the current page, if any. Idempotent; also run on drop.
    pub fn close(&mut self) {
        if let Some((page_id, _)) = self.current.take() {
            self.pool.unpin_page(page_id, false);
        }
    }
}

impl Drop for TableIterator {
    fn drop(&mut self) {
        self.close();
    }
}

impl Iterator for TableIterator {
    type Item = (Rid, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        TableIterator::next(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::LruReplacer;
    use crate::storage::DiskManager;
    use tempfile::tempdir;

    fn make_heap(pool_size: usize) -> TableHeap {
        let dir = tempdir().unwrap();
        let disk = Arc::new(DiskManager::open(&dir.path().join("db"), false).unwrap());
        let replacer = Arc::new(LruReplacer::new());
        let pool = Arc::new(BufferPoolManager::new(pool_size, disk, replacer));
        TableHeap::new(pool, Vec::new())
    }

    #[test]
    fn insert_get_delete_roundtrip() {
        let heap = make_heap(4);
        let rid = heap.insert_record(b"hello").unwrap().unwrap();
        assert_eq!(heap.get_record(rid).unwrap(), Some(b"hello".to_vec()));
        assert!(heap.delete_record(rid).unwrap());
        assert_eq!(heap.get_record(rid).unwrap(), None);
        assert!(heap.delete_record(rid).unwrap());
    }

    #[test]
    fn empty_heap_scan_yields_nothing() {
        let heap = make_heap(4);
        let mut iter = heap.iterator();
        assert!(iter.next().is_none());
    }

    #[test]
    fn heap_grows_across_pages_and_iterates_all() {
        let heap = make_heap(2);
        let payload = vec![7u8; 2000];
        let mut rids = Vec::new();
        for _ in 0..5 {
            rids.push(heap.insert_record(&payload).unwrap().unwrap());
        }
        assert!(heap.page_ids().len() >= 2);

        let mut seen = Vec::new();
        let mut iter = heap.iterator();
        while let Some((rid, bytes)) = iter.next() {
            assert_eq!(bytes, payload);
            seen.push(rid);
        }
        assert_eq!(seen.len(), rids.len());
    }

    #[test]
    fn iterator_snapshot_isolation() {
        let heap = make_heap(4);
        let first = heap.insert_record(b"p0-record").unwrap().unwrap();
        let mut iter = heap.iterator();

        // Force a second page to be allocated after the snapshot was taken.
        let huge = vec![9u8; 3000];
        heap.insert_record(&huge).unwrap().unwrap();

        let mut seen = Vec::new();
        while let Some((rid, bytes)) = iter.next() {
            seen.push((rid, bytes));
        }
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, first);
    }

    #[test]
    fn bulk_insert_of_random_sized_records_survives_a_full_scan() {
        use rand::Rng;

        let heap = make_heap(3);
        let mut rng = rand::thread_rng();
        let mut records = Vec::new();
        for _ in 0..200 {
            let len = rng.gen_range(1..=300);
            let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let rid = heap.insert_record(&bytes).unwrap().unwrap();
            records.push((rid, bytes));
        }
        assert!(heap.page_ids().len() > 1);

        for (rid, bytes) in &records {
            assert_eq!(heap.get_record(*rid).unwrap().as_ref(), Some(bytes));
        }

        let mut seen = 0;
        let mut iter = heap.iterator();
        while iter.next().is_some() {
            seen += 1;
        }
        assert_eq!(seen, records.len());
    }
}
