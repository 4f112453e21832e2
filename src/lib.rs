//! # Relational storage core
//!
//! A disk-based storage engine core for a small relational database: fixed-size
//! page I/O, a bounded buffer pool with pluggable eviction, slotted data pages,
//! append-only table heaps with a snapshot-isolated scan, and a B+tree page
//! format. A catalog and a minimal SQL front end sit on top of this substrate.
//!
//! ## Architecture
//!
//! - **Types** (`types`): `PageId`, `Rid`, column types and tuple encoding.
//! - **Page layer** (`page`): slotted page format for heap records.
//! - **Storage layer** (`storage`): fixed-size page I/O over a single file.
//! - **Buffer pool** (`buffer`): bounded page cache with a pluggable `Replacer`.
//! - **B+tree layer** (`btree`): leaf/internal page format and single-node operations.
//! - **Table heap** (`heap`): `TableHeap` and its snapshot-isolated `TableIterator`.
//! - **Catalog** (`catalog`): table schema and page-list metadata persisted to disk.
//! - **Engine** (`engine`): a SQL front end and `Db` facade over the catalog.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relational_storage_core::{Config, engine::Db};
//!
//! let config = Config::new("my_database.db");
//! let db = Db::open(config)?;
//!
//! db.execute("CREATE TABLE t (id INTEGER, name VARCHAR(16))")?;
//! db.execute("INSERT INTO t VALUES (1, 'alice')")?;
//! db.execute("SELECT * FROM t")?;
//! ```

pub mod btree;
pub mod buffer;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod heap;
pub mod page;
pub mod storage;
pub mod types;

pub use config::Config;
pub use engine::{Db, EngineError, EngineResult};
pub use error::{Result, StorageError};
pub use types::{PageId, Rid, PAGE_SIZE};
