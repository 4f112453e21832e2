//! Execution engine: ties the disk manager, buffer pool, and catalog
//! together behind a table-oriented `Db` facade, with a small SQL front end
//! layered on top. Grounded on the source's top-level wiring (catalog +
//! buffer pool manager passed into a per-statement executor) and on the
//! `Db`-facade shape the teacher crate used for its key-value API.

pub mod error;
pub mod operators;
pub mod parser;

use std::path::Path;
use std::sync::Arc;

use crate::buffer::{BufferPoolManager, LruReplacer};
use crate::catalog::{Catalog, Schema};
use crate::config::Config;
use crate::storage::DiskManager;
use crate::types::{encode_tuple, ColumnType, Value};

pub use error::{EngineError, EngineResult};
pub use operators::Tuple;
use parser::{parse_sql, CompareOp, SelectColumns, Statement};

/// Output of executing one SQL statement.
#[derive(Debug, Clone)]
pub enum ExecutionResult {
    /// A `CREATE TABLE` or `INSERT` that touched no rows to return.
    Ok,
    /// Rows produced by a `SELECT`, in scan order.
    Rows(Vec<Tuple>),
}

/// A database: the disk/buffer-pool substrate plus the catalog of tables
/// built on top of it. Owns everything needed to execute SQL statements
/// end to end.
pub struct Db {
    pool: Arc<BufferPoolManager>,
    catalog: Catalog,
}

impl Db {
    /// Open (creating if absent) the database file named in `config`.
    pub fn open(config: Config) -> EngineResult<Self> {
        let disk = Arc::new(DiskManager::open(Path::new(&config.db_path), config.sync_on_write)?);
        let replacer = Arc::new(LruReplacer::new());
        let pool = Arc::new(BufferPoolManager::new(config.buffer_pool_size, disk, replacer));
        let catalog = Catalog::open(pool.clone())?;
        Ok(Self { pool, catalog })
    }

    pub fn create_table(&self, table: &str, columns: Vec<(String, ColumnType)>) -> EngineResult<()> {
        self.catalog.create_table(table, columns)?;
        Ok(())
    }

    pub fn insert(&self, table: &str, values: Vec<Value>) -> EngineResult<()> {
        let meta = self
            .catalog
            .get_table(table)
            .ok_or_else(|| EngineError::UnknownTable(table.to_string()))?;
        let bytes = encode_tuple(&meta.schema.types(), &values)?;

        let heap = self.catalog.table_heap(table).expect("table existed above");
        heap.insert_record(&bytes)?
            .ok_or_else(|| EngineError::Catalog("buffer pool exhausted during insert".to_string()))?;

        self.catalog.record_page_ids(table, heap.page_ids())?;
        Ok(())
    }

    /// Run `SELECT <cols> FROM <table> [WHERE <col> <op> <literal>]` and
    /// collect every matching, projected row.
    pub fn select(&self, table: &str, columns: &SelectColumns, filter: Option<(&str, CompareOp, &Value)>) -> EngineResult<Vec<Tuple>> {
        let meta = self
            .catalog
            .get_table(table)
            .ok_or_else(|| EngineError::UnknownTable(table.to_string()))?;
        let heap = self.catalog.table_heap(table).expect("table existed above");

        let (indices, identity) = resolve_projection(&meta.schema, columns)?;

        let mut scan = operators::SeqScanOperator::open(&heap, &meta.schema);
        let rows = match filter {
            Some((column, op, literal)) => {
                let column_index = meta
                    .schema
                    .column_index(column)
                    .ok_or_else(|| EngineError::UnknownColumn(column.to_string()))?;
                let filter_op = operators::FilterOperator::open(&mut scan, column_index, op, literal.clone());
                let mut proj = operators::ProjectionOperator::open(operators::ScanSource::Filtered(filter_op), indices, identity);
                collect_all(&mut proj)
            }
            None => {
                let mut proj = operators::ProjectionOperator::open(operators::ScanSource::Scan(&mut scan), indices, identity);
                collect_all(&mut proj)
            }
        };
        Ok(rows)
    }

    pub fn list_tables(&self) -> Vec<String> {
        self.catalog.list_tables()
    }

    pub fn flush(&self) -> EngineResult<()> {
        self.pool.flush_all_pages()?;
        Ok(())
    }

    /// Parse and run a single SQL statement.
    pub fn execute(&self, sql: &str) -> EngineResult<ExecutionResult> {
        let stmt = parse_sql(sql)?;
        match stmt {
            Statement::CreateTable { table, columns } => {
                self.create_table(&table, columns)?;
                Ok(ExecutionResult::Ok)
            }
            Statement::Insert { table, values } => {
                self.insert(&table, values)?;
                Ok(ExecutionResult::Ok)
            }
            Statement::Select { table, columns, filter } => {
                let filter_ref = filter.as_ref().map(|f| (f.column.as_str(), f.op, &f.literal));
                let rows = self.select(&table, &columns, filter_ref)?;
                Ok(ExecutionResult::Rows(rows))
            }
        }
    }
}

fn resolve_projection(schema: &Schema, columns: &SelectColumns) -> EngineResult<(Vec<usize>, bool)> {
    match columns {
        SelectColumns::All => Ok((Vec::new(), true)),
        SelectColumns::Named(names) => {
            let indices = names
                .iter()
                .map(|name| schema.column_index(name).ok_or_else(|| EngineError::UnknownColumn(name.clone())))
                .collect::<EngineResult<Vec<_>>>()?;
            Ok((indices, false))
        }
    }
}

fn collect_all(proj: &mut operators::ProjectionOperator<'_>) -> Vec<Tuple> {
    let mut rows = Vec::new();
    while let Some(row) = proj.next() {
        rows.push(row);
    }
    proj.close();
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_db() -> (tempfile::TempDir, Db) {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().join("db"));
        let db = Db::open(config).unwrap();
        (dir, db)
    }

    #[test]
    fn sql_end_to_end() {
        let (_dir, db) = make_db();
        db.execute("CREATE TABLE t (id INTEGER, name VARCHAR(16), active BOOLEAN)").unwrap();
        db.execute("INSERT INTO t VALUES (1, 'alice', TRUE)").unwrap();
        db.execute("INSERT INTO t VALUES (2, 'bob', FALSE)").unwrap();
        db.execute("INSERT INTO t VALUES (3, 'carol', TRUE)").unwrap();

        let result = db.execute("SELECT name FROM t WHERE active = TRUE").unwrap();
        match result {
            ExecutionResult::Rows(rows) => {
                assert_eq!(
                    rows,
                    vec![vec![Value::Varchar("alice".to_string())], vec![Value::Varchar("carol".to_string())]]
                );
            }
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn select_star_returns_every_column() {
        let (_dir, db) = make_db();
        db.execute("CREATE TABLE t (id INTEGER)").unwrap();
        db.execute("INSERT INTO t VALUES (7)").unwrap();
        let result = db.execute("SELECT * FROM t").unwrap();
        match result {
            ExecutionResult::Rows(rows) => assert_eq!(rows, vec![vec![Value::Integer(7)]]),
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn unknown_table_is_an_engine_error() {
        let (_dir, db) = make_db();
        let err = db.execute("SELECT * FROM nope").unwrap_err();
        assert!(matches!(err, EngineError::UnknownTable(_)));
    }

    #[test]
    fn catalog_round_trips_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");
        {
            let db = Db::open(Config::new(&path)).unwrap();
            db.execute("CREATE TABLE t (id INTEGER)").unwrap();
            db.execute("INSERT INTO t VALUES (42)").unwrap();
            db.flush().unwrap();
        }
        {
            let db = Db::open(Config::new(&path)).unwrap();
            assert_eq!(db.list_tables(), vec!["t".to_string()]);
            let result = db.execute("SELECT * FROM t").unwrap();
            match result {
                ExecutionResult::Rows(rows) => assert_eq!(rows, vec![vec![Value::Integer(42)]]),
                _ => panic!("expected rows"),
            }
        }
    }
}
