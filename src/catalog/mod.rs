//! Catalog: table metadata (schema, page list) persisted as a single JSON
//! blob on the fixed catalog root page. Grounded on
//! `dbms/catalog/catalog.py` in the source.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::buffer::BufferPoolManager;
use crate::error::{Result, StorageError};
use crate::heap::TableHeap;
use crate::page::slotted::SlottedPage;
use crate::types::{ColumnType, PageId, PAGE_SIZE};

/// A named table schema: an ordered list of `(column name, column type)`.
#[derive(Debug, Clone)]
pub struct Schema {
    pub columns: Vec<(String, ColumnType)>,
}

impl Schema {
    pub fn new(columns: Vec<(String, ColumnType)>) -> Self {
        Self { columns }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }

    pub fn types(&self) -> Vec<ColumnType> {
        self.columns.iter().map(|(_, t)| *t).collect()
    }
}

/// In-memory metadata for one table: its schema and the list of data pages
/// its table heap has allocated.
#[derive(Debug, Clone)]
pub struct TableMetadata {
    pub name: String,
    pub schema: Schema,
    pub page_ids: Vec<PageId>,
}

#[derive(Serialize, Deserialize)]
struct WireColumn {
    name: String,
    #[serde(rename = "type")]
    col_type: ColumnType,
}

#[derive(Serialize, Deserialize)]
struct WireSchema {
    columns: Vec<WireColumn>,
}

#[derive(Serialize, Deserialize)]
struct WireTable {
    schema: WireSchema,
    all_page_ids: Vec<i32>,
}

/// Owns and persists every table's metadata. The catalog's own bookkeeping
/// lives entirely on [`PageId::CATALOG_ROOT`] as one JSON document; a
/// catalog that would not fit on a single page is a fatal error, not a
/// silent truncation.
pub struct Catalog {
    pool: Arc<BufferPoolManager>,
    tables: Mutex<HashMap<String, TableMetadata>>,
}

impl Catalog {
    /// Load catalog state from the root page, starting empty if the page is
    /// blank or its contents fail to parse as catalog JSON.
    ///
    /// On a genuinely empty database file, the first page the allocator
    /// hands out is always id 0 (the Disk Manager has no notion of a
    /// reserved page). This constructor claims that page for the catalog
    /// root before anything else can, so a later `new_page()` call (e.g.
    /// a table's first page) never collides with it. A reopened database
    /// already has page 0 committed from a prior run, so this is skipped.
    pub fn open(pool: Arc<BufferPoolManager>) -> Result<Self> {
        let catalog = Self {
            pool,
            tables: Mutex::new(HashMap::new()),
        };
        if catalog.pool.committed_page_count() == 0 {
            catalog.claim_root_page()?;
        }
        catalog.load_from_disk()?;
        Ok(catalog)
    }

    fn claim_root_page(&self) -> Result<()> {
        let handle = self
            .pool
            .new_page()?
            .ok_or_else(|| StorageError::corruption("buffer pool exhausted claiming catalog root page"))?;
        debug_assert_eq!(handle.page_id(), PageId::CATALOG_ROOT);
        self.pool.unpin_page(handle.page_id(), true);
        Ok(())
    }

    fn load_from_disk(&self) -> Result<()> {
        let handle = match self.pool.fetch_page(PageId::CATALOG_ROOT)? {
            Some(h) => h,
            None => {
                log::warn!("could not fetch catalog root page, starting with an empty catalog");
                return Ok(());
            }
        };

        let raw = {
            let mut guard = handle.lock();
            guard.data_mut().to_vec()
        };
        self.pool.unpin_page(PageId::CATALOG_ROOT, false);

        let trimmed = trim_trailing_nuls(&raw);
        if trimmed.is_empty() {
            return Ok(());
        }

        match serde_json::from_slice::<HashMap<String, WireTable>>(trimmed) {
            Ok(wire) => {
                let mut tables = self.tables.lock();
                for (name, wire_table) in wire {
                    let columns = wire_table
                        .schema
                        .columns
                        .into_iter()
                        .map(|c| (c.name, c.col_type))
                        .collect();
                    let page_ids = wire_table.all_page_ids.into_iter().map(PageId::new).collect();
                    tables.insert(
                        name.clone(),
                        TableMetadata {
                            name,
                            schema: Schema::new(columns),
                            page_ids,
                        },
                    );
                }
                Ok(())
            }
            Err(e) => {
                log::warn!("could not deserialize catalog data ({e}), starting with an empty catalog");
                Ok(())
            }
        }
    }

    fn persist(&self) -> Result<()> {
        let tables = self.tables.lock();
        let wire: HashMap<&str, WireTable> = tables
            .iter()
            .map(|(name, meta)| {
                let columns = meta
                    .schema
                    .columns
                    .iter()
                    .map(|(n, t)| WireColumn {
                        name: n.clone(),
                        col_type: *t,
                    })
                    .collect();
                let all_page_ids = meta.page_ids.iter().map(|p| p.value()).collect();
                (
                    name.as_str(),
                    WireTable {
                        schema: WireSchema { columns },
                        all_page_ids,
                    },
                )
            })
            .collect();

        let bytes = serde_json::to_vec(&wire)
            .map_err(|e| StorageError::corruption(format!("catalog serialization failed: {e}")))?;

        if bytes.len() > PAGE_SIZE {
            return Err(StorageError::corruption(
                "serialized catalog exceeds PAGE_SIZE; multi-page catalogs are not supported",
            ));
        }

        let handle = self
            .pool
            .fetch_page(PageId::CATALOG_ROOT)?
            .ok_or_else(|| StorageError::corruption("could not fetch catalog root page to persist"))?;

        {
            let mut guard = handle.lock();
            let data = guard.data_mut();
            data.fill(0);
            data[..bytes.len()].copy_from_slice(&bytes);
        }
        self.pool.unpin_page(PageId::CATALOG_ROOT, true);
        Ok(())
    }

    /// Create a new table with an empty, freshly allocated first page.
    /// Rolls the in-memory entry and the allocated page back out if
    /// persisting the updated catalog fails.
    pub fn create_table(&self, table_name: &str, columns: Vec<(String, ColumnType)>) -> Result<TableMetadata> {
        {
            let tables = self.tables.lock();
            if tables.contains_key(table_name) {
                return Err(StorageError::corruption(format!("table '{table_name}' already exists")));
            }
        }

        let handle = self
            .pool
            .new_page()?
            .ok_or_else(|| StorageError::corruption("buffer pool exhausted allocating table's first page"))?;
        let first_page_id = handle.page_id();
        {
            let mut guard = handle.lock();
            let mut sp = SlottedPage::new(guard.data_mut());
            sp.initialize();
        }
        self.pool.unpin_page(first_page_id, true);

        let meta = TableMetadata {
            name: table_name.to_string(),
            schema: Schema::new(columns),
            page_ids: vec![first_page_id],
        };

        {
            let mut tables = self.tables.lock();
            tables.insert(table_name.to_string(), meta.clone());
        }

        if let Err(e) = self.persist() {
            log::error!("failed to persist catalog after creating table '{table_name}', rolling back: {e}");
            self.tables.lock().remove(table_name);
            let _ = self.pool.delete_page(first_page_id);
            return Err(e);
        }

        log::info!("created table '{table_name}' with first page {first_page_id}");
        Ok(meta)
    }

    pub fn get_table(&self, table_name: &str) -> Option<TableMetadata> {
        self.tables.lock().get(table_name).cloned()
    }

    pub fn list_tables(&self) -> Vec<String> {
        self.tables.lock().keys().cloned().collect()
    }

    /// Build a [`TableHeap`] handle over a table's current page list. The
    /// returned heap owns a private snapshot of the page-id list; it does
    /// not observe growth recorded by other `TableHeap` handles until
    /// [`Catalog::record_new_page`] is called and a fresh handle is built.
    pub fn table_heap(&self, table_name: &str) -> Option<TableHeap> {
        let meta = self.get_table(table_name)?;
        Some(TableHeap::new(self.pool.clone(), meta.page_ids))
    }

    /// Update a table's recorded page list (e.g. after an insert grew its
    /// heap) and persist the change.
    pub fn record_page_ids(&self, table_name: &str, page_ids: Vec<PageId>) -> Result<()> {
        {
            let mut tables = self.tables.lock();
            let meta = tables
                .get_mut(table_name)
                .ok_or_else(|| StorageError::corruption(format!("unknown table '{table_name}'")))?;
            meta.page_ids = page_ids;
        }
        self.persist()
    }
}

fn trim_trailing_nuls(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map(|i| i + 1).unwrap_or(0);
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::LruReplacer;
    use crate::storage::DiskManager;
    use tempfile::tempdir;

    fn make_catalog() -> (tempfile::TempDir, Catalog) {
        let dir = tempdir().unwrap();
        let disk = Arc::new(DiskManager::open(&dir.path().join("db"), false).unwrap());
        let replacer = Arc::new(LruReplacer::new());
        let pool = Arc::new(BufferPoolManager::new(16, disk, replacer));
        let catalog = Catalog::open(pool).unwrap();
        (dir, catalog)
    }

    #[test]
    fn create_and_fetch_table() {
        let (_dir, catalog) = make_catalog();
        let meta = catalog
            .create_table("users", vec![("id".into(), ColumnType::Integer), ("name".into(), ColumnType::Varchar(32))])
            .unwrap();
        assert_eq!(meta.page_ids.len(), 1);
        assert_eq!(catalog.list_tables(), vec!["users".to_string()]);
        assert!(catalog.get_table("nope").is_none());
    }

    #[test]
    fn duplicate_table_name_rejected() {
        let (_dir, catalog) = make_catalog();
        catalog.create_table("t", vec![("a".into(), ColumnType::Integer)]).unwrap();
        assert!(catalog.create_table("t", vec![("a".into(), ColumnType::Integer)]).is_err());
    }

    #[test]
    fn catalog_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("db");
        {
            let disk = Arc::new(DiskManager::open(&db_path, false).unwrap());
            let replacer = Arc::new(LruReplacer::new());
            let pool = Arc::new(BufferPoolManager::new(16, disk, replacer));
            let catalog = Catalog::open(pool.clone()).unwrap();
            catalog
                .create_table("t", vec![("x".into(), ColumnType::Integer)])
                .unwrap();
            pool.flush_all_pages().unwrap();
        }
        {
            let disk = Arc::new(DiskManager::open(&db_path, false).unwrap());
            let replacer = Arc::new(LruReplacer::new());
            let pool = Arc::new(BufferPoolManager::new(16, disk, replacer));
            let catalog = Catalog::open(pool).unwrap();
            let meta = catalog.get_table("t").unwrap();
            assert_eq!(meta.schema.columns, vec![("x".to_string(), ColumnType::Integer)]);
        }
    }

    #[test]
    fn record_page_ids_updates_and_persists() {
        let (_dir, catalog) = make_catalog();
        catalog.create_table("t", vec![("a".into(), ColumnType::Integer)]).unwrap();
        let new_ids = vec![PageId::new(1), PageId::new(2), PageId::new(3)];
        catalog.record_page_ids("t", new_ids.clone()).unwrap();
        assert_eq!(catalog.get_table("t").unwrap().page_ids, new_ids);
    }

    #[test]
    fn oversized_catalog_write_is_rejected_before_any_partial_write() {
        let dir = tempdir().unwrap();
        let disk = Arc::new(DiskManager::open(&dir.path().join("db"), false).unwrap());
        let replacer = Arc::new(LruReplacer::new());
        let pool = Arc::new(BufferPoolManager::new(16, disk, replacer));
        let catalog = Catalog::open(pool.clone()).unwrap();

        // Enough columns to push the serialized JSON well past PAGE_SIZE.
        let huge_columns: Vec<(String, ColumnType)> =
            (0..200).map(|i| (format!("column_{i}"), ColumnType::Integer)).collect();
        let err = catalog.create_table("big", huge_columns).unwrap_err();
        assert!(matches!(err, StorageError::Corruption(_)));

        // The failed create_table rolled back both the in-memory entry and
        // the page it had allocated; the catalog root page was never
        // touched by the rejected write.
        assert!(catalog.list_tables().is_empty());
        assert!(catalog.get_table("big").is_none());

        let handle = pool.fetch_page(PageId::CATALOG_ROOT).unwrap().unwrap();
        let raw = handle.lock().data().to_vec();
        pool.unpin_page(PageId::CATALOG_ROOT, false);
        assert!(trim_trailing_nuls(&raw).is_empty());
    }
}
