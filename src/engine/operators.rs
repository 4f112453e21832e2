//! A small demand-driven operator tree over a table scan: `SeqScanOperator`
//! deserializes tuples off a `TableIterator`, an optional `FilterOperator`
//! wraps it with a predicate, and `ProjectionOperator` narrows the column
//! list. Each stage pulls one tuple at a time from its child on `next()`.

use crate::catalog::Schema;
use crate::engine::parser::CompareOp;
use crate::heap::{TableHeap, TableIterator};
use crate::types::{decode_tuple, ColumnType, Value};

pub type Tuple = Vec<Value>;

/// Scans a table heap end to end, decoding each record into a tuple per the
/// table's schema.
pub struct SeqScanOperator {
    iter: TableIterator,
    types: Vec<ColumnType>,
}

impl SeqScanOperator {
    pub fn open(heap: &TableHeap, schema: &Schema) -> Self {
        Self {
            iter: heap.iterator(),
            types: schema.types(),
        }
    }

    pub fn next(&mut self) -> Option<Tuple> {
        let (_, bytes) = self.iter.next()?;
        decode_tuple(&self.types, &bytes).ok()
    }

    pub fn close(&mut self) {
        self.iter.close();
    }
}

/// Wraps a child operator, yielding only the tuples whose value at
/// `column_index` compares true against `literal` under `op`.
pub struct FilterOperator<'a> {
    child: &'a mut SeqScanOperator,
    column_index: usize,
    op: CompareOp,
    literal: Value,
}

impl<'a> FilterOperator<'a> {
    pub fn open(child: &'a mut SeqScanOperator, column_index: usize, op: CompareOp, literal: Value) -> Self {
        Self { child, column_index, op, literal }
    }

    pub fn next(&mut self) -> Option<Tuple> {
        loop {
            let tuple = self.child.next()?;
            if self.op.evaluate(&tuple[self.column_index], &self.literal) {
                return Some(tuple);
            }
        }
    }

    pub fn close(&mut self) {
        self.child.close();
    }
}

/// A source of tuples: either a bare scan or a scan behind a filter. Lets
/// `ProjectionOperator` stay generic over whether a `WHERE` clause was
/// present without resorting to dynamic dispatch.
pub enum ScanSource<'a> {
    Scan(&'a mut SeqScanOperator),
    Filtered(FilterOperator<'a>),
}

impl<'a> ScanSource<'a> {
    fn next(&mut self) -> Option<Tuple> {
        match self {
            ScanSource::Scan(scan) => scan.next(),
            ScanSource::Filtered(filter) => filter.next(),
        }
    }

    fn close(&mut self) {
        match self {
            ScanSource::Scan(scan) => scan.close(),
            ScanSource::Filtered(filter) => filter.close(),
        }
    }
}

/// Projects a (possibly filtered) scan down to the requested column indices.
/// An empty `indices` with `identity = true` passes every column through
/// unchanged, matching `SELECT *`.
pub struct ProjectionOperator<'a> {
    source: ScanSource<'a>,
    indices: Vec<usize>,
    identity: bool,
}

impl<'a> ProjectionOperator<'a> {
    pub fn open(source: ScanSource<'a>, indices: Vec<usize>, identity: bool) -> Self {
        Self { source, indices, identity }
    }

    pub fn next(&mut self) -> Option<Tuple> {
        let tuple = self.source.next()?;
        if self.identity {
            return Some(tuple);
        }
        Some(self.indices.iter().map(|&i| tuple[i].clone()).collect())
    }

    pub fn close(&mut self) {
        self.source.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferPoolManager, LruReplacer};
    use crate::storage::DiskManager;
    use crate::types::encode_tuple;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn make_heap_with_rows(rows: &[Vec<Value>], types: &[ColumnType]) -> TableHeap {
        let dir = tempdir().unwrap();
        let disk = Arc::new(DiskManager::open(&dir.path().join("db"), false).unwrap());
        let replacer = Arc::new(LruReplacer::new());
        let pool = Arc::new(BufferPoolManager::new(8, disk, replacer));
        let heap = TableHeap::new(pool, Vec::new());
        for row in rows {
            let bytes = encode_tuple(types, row).unwrap();
            heap.insert_record(&bytes).unwrap().unwrap();
        }
        heap
    }

    #[test]
    fn seq_scan_yields_every_row() {
        let types = vec![ColumnType::Integer, ColumnType::Boolean];
        let rows = vec![
            vec![Value::Integer(1), Value::Boolean(true)],
            vec![Value::Integer(2), Value::Boolean(false)],
        ];
        let heap = make_heap_with_rows(&rows, &types);
        let schema = Schema::new(vec![("id".into(), ColumnType::Integer), ("active".into(), ColumnType::Boolean)]);
        let mut scan = SeqScanOperator::open(&heap, &schema);
        assert_eq!(scan.next(), Some(rows[0].clone()));
        assert_eq!(scan.next(), Some(rows[1].clone()));
        assert_eq!(scan.next(), None);
    }

    #[test]
    fn filter_and_projection_pipeline() {
        let types = vec![ColumnType::Integer, ColumnType::Varchar(8), ColumnType::Boolean];
        let rows = vec![
            vec![Value::Integer(1), Value::Varchar("a".into()), Value::Boolean(true)],
            vec![Value::Integer(2), Value::Varchar("b".into()), Value::Boolean(false)],
            vec![Value::Integer(3), Value::Varchar("c".into()), Value::Boolean(true)],
        ];
        let heap = make_heap_with_rows(&rows, &types);
        let schema = Schema::new(vec![
            ("id".into(), ColumnType::Integer),
            ("name".into(), ColumnType::Varchar(8)),
            ("active".into(), ColumnType::Boolean),
        ]);
        let mut scan = SeqScanOperator::open(&heap, &schema);
        let filter = FilterOperator::open(&mut scan, 2, CompareOp::Eq, Value::Boolean(true));
        let mut proj = ProjectionOperator::open(ScanSource::Filtered(filter), vec![1], false);

        assert_eq!(proj.next(), Some(vec![Value::Varchar("a".into())]));
        assert_eq!(proj.next(), Some(vec![Value::Varchar("c".into())]));
        assert_eq!(proj.next(), None);
        proj.close();
    }
}
