//! Maps `sqlparser`'s generic SQL AST onto the small statement set this
//! engine executes: `CREATE TABLE`, `INSERT INTO ... VALUES`, and
//! `SELECT ... FROM ... [WHERE ...]`. Grounded on the AST-mapping style in
//! `wcygan-sql-database`'s parser crate, adapted to a single flat
//! `Statement` enum rather than a separate AST module.

use sqlparser::ast as sqlast;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser as SqlParser;

use crate::engine::error::{EngineError, EngineResult};
use crate::types::{ColumnType, Value};

#[derive(Debug, Clone)]
pub enum Statement {
    CreateTable {
        table: String,
        columns: Vec<(String, ColumnType)>,
    },
    Insert {
        table: String,
        values: Vec<Value>,
    },
    Select {
        table: String,
        columns: SelectColumns,
        filter: Option<Filter>,
    },
}

#[derive(Debug, Clone)]
pub enum SelectColumns {
    All,
    Named(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub column: String,
    pub op: CompareOp,
    pub literal: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl CompareOp {
    pub fn evaluate(self, lhs: &Value, rhs: &Value) -> bool {
        use std::cmp::Ordering;
        let ordering = match (lhs, rhs) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Varchar(a), Value::Varchar(b)) => a.cmp(b),
            _ => return false,
        };
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
        }
    }
}

/// Parse a single SQL statement. A statement string containing more than
/// one top-level statement is rejected; this engine runs one at a time.
pub fn parse_sql(sql: &str) -> EngineResult<Statement> {
    let dialect = GenericDialect {};
    let stmts = SqlParser::parse_sql(&dialect, sql)
        .map_err(|e| EngineError::ParseError(e.to_string()))?;

    let mut iter = stmts.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| EngineError::ParseError("empty statement".to_string()))?;
    if iter.next().is_some() {
        return Err(EngineError::ParseError("only one statement at a time is supported".to_string()));
    }
    map_statement(first)
}

fn map_statement(stmt: sqlast::Statement) -> EngineResult<Statement> {
    match stmt {
        sqlast::Statement::CreateTable { name, columns, .. } => {
            let table = name.to_string();
            let columns = columns
                .into_iter()
                .map(|c| {
                    let col_type = map_column_def(&c)?;
                    Ok((c.name.value, col_type))
                })
                .collect::<EngineResult<Vec<_>>>()?;
            Ok(Statement::CreateTable { table, columns })
        }
        sqlast::Statement::Insert {
            table_name, source, ..
        } => {
            let table = table_name.to_string();
            let source = source.ok_or_else(|| EngineError::ParseError("INSERT requires VALUES".to_string()))?;
            let values = extract_values(*source)?;
            Ok(Statement::Insert { table, values })
        }
        sqlast::Statement::Query(query) => map_select(*query),
        other => Err(EngineError::ParseError(format!("unsupported statement: {other}"))),
    }
}

fn map_column_def(col: &sqlast::ColumnDef) -> EngineResult<ColumnType> {
    let type_name = col.data_type.to_string().to_uppercase();
    ColumnType::parse(&type_name).ok_or_else(|| EngineError::ParseError(format!("unsupported column type: {type_name}")))
}

fn extract_values(source: sqlast::Query) -> EngineResult<Vec<Value>> {
    let rows = match *source.body {
        sqlast::SetExpr::Values(values) => values.rows,
        other => return Err(EngineError::ParseError(format!("unsupported INSERT source: {other}"))),
    };
    let mut rows = rows.into_iter();
    let row = rows
        .next()
        .ok_or_else(|| EngineError::ParseError("INSERT VALUES has no rows".to_string()))?;
    if rows.next().is_some() {
        return Err(EngineError::ParseError("multi-row INSERT is not supported".to_string()));
    }
    row.into_iter().map(map_value_expr).collect()
}

fn map_value_expr(expr: sqlast::Expr) -> EngineResult<Value> {
    match expr {
        sqlast::Expr::Value(v) => map_literal(v),
        sqlast::Expr::UnaryOp {
            op: sqlast::UnaryOperator::Minus,
            expr,
        } => match *expr {
            sqlast::Expr::Value(sqlast::Value::Number(n, _)) => n
                .parse::<i32>()
                .map(|i| Value::Integer(-i))
                .map_err(|_| EngineError::ParseError(format!("invalid integer literal: -{n}"))),
            other => Err(EngineError::ParseError(format!("unsupported literal: {other}"))),
        },
        other => Err(EngineError::ParseError(format!("unsupported literal: {other}"))),
    }
}

fn map_literal(value: sqlast::Value) -> EngineResult<Value> {
    match value {
        sqlast::Value::Number(n, _) => n
            .parse::<i32>()
            .map(Value::Integer)
            .map_err(|_| EngineError::ParseError(format!("invalid integer literal: {n}"))),
        sqlast::Value::Boolean(b) => Ok(Value::Boolean(b)),
        sqlast::Value::SingleQuotedString(s) | sqlast::Value::DoubleQuotedString(s) => Ok(Value::Varchar(s)),
        other => Err(EngineError::ParseError(format!("unsupported literal: {other}"))),
    }
}

fn map_select(query: sqlast::Query) -> EngineResult<Statement> {
    let select = match *query.body {
        sqlast::SetExpr::Select(select) => select,
        other => return Err(EngineError::ParseError(format!("unsupported SELECT body: {other}"))),
    };

    if select.from.is_empty() {
        return Err(EngineError::ParseError("SELECT requires FROM".to_string()));
    }
    if select.from.len() > 1 {
        return Err(EngineError::ParseError("joins are not supported".to_string()));
    }
    let table = match &select.from[0].relation {
        sqlast::TableFactor::Table { name, .. } => name.to_string(),
        other => return Err(EngineError::ParseError(format!("unsupported FROM clause: {other}"))),
    };

    let columns = map_projection(select.projection)?;
    let filter = select.selection.map(map_filter).transpose()?;

    Ok(Statement::Select { table, columns, filter })
}

fn map_projection(items: Vec<sqlast::SelectItem>) -> EngineResult<SelectColumns> {
    if items.len() == 1 && matches!(items[0], sqlast::SelectItem::Wildcard(_)) {
        return Ok(SelectColumns::All);
    }
    let names = items
        .into_iter()
        .map(|item| match item {
            sqlast::SelectItem::UnnamedExpr(sqlast::Expr::Identifier(ident)) => Ok(ident.value),
            other => Err(EngineError::ParseError(format!("unsupported select item: {other}"))),
        })
        .collect::<EngineResult<Vec<_>>>()?;
    Ok(SelectColumns::Named(names))
}

fn map_filter(expr: sqlast::Expr) -> EngineResult<Filter> {
    match expr {
        sqlast::Expr::BinaryOp { left, op, right } => {
            let column = match *left {
                sqlast::Expr::Identifier(ident) => ident.value,
                other => return Err(EngineError::ParseError(format!("WHERE left-hand side must be a column: {other}"))),
            };
            let op = map_compare_op(op)?;
            let literal = map_value_expr(*right)?;
            Ok(Filter { column, op, literal })
        }
        other => Err(EngineError::ParseError(format!("unsupported WHERE clause: {other}"))),
    }
}

fn map_compare_op(op: sqlast::BinaryOperator) -> EngineResult<CompareOp> {
    use sqlast::BinaryOperator::*;
    match op {
        Eq => Ok(CompareOp::Eq),
        NotEq => Ok(CompareOp::NotEq),
        Lt => Ok(CompareOp::Lt),
        Gt => Ok(CompareOp::Gt),
        LtEq => Ok(CompareOp::LtEq),
        GtEq => Ok(CompareOp::GtEq),
        other => Err(EngineError::ParseError(format!("unsupported comparison operator: {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_table() {
        let stmt = parse_sql("CREATE TABLE t (id INTEGER, name VARCHAR(16), active BOOLEAN)").unwrap();
        match stmt {
            Statement::CreateTable { table, columns } => {
                assert_eq!(table, "t");
                assert_eq!(columns[0], ("id".to_string(), ColumnType::Integer));
                assert_eq!(columns[1], ("name".to_string(), ColumnType::Varchar(16)));
                assert_eq!(columns[2], ("active".to_string(), ColumnType::Boolean));
            }
            _ => panic!("expected CreateTable"),
        }
    }

    #[test]
    fn parses_insert() {
        let stmt = parse_sql("INSERT INTO t VALUES (1, 'bob', TRUE)").unwrap();
        match stmt {
            Statement::Insert { table, values } => {
                assert_eq!(table, "t");
                assert_eq!(values, vec![Value::Integer(1), Value::Varchar("bob".to_string()), Value::Boolean(true)]);
            }
            _ => panic!("expected Insert"),
        }
    }

    #[test]
    fn parses_select_with_filter() {
        let stmt = parse_sql("SELECT name FROM t WHERE active = TRUE").unwrap();
        match stmt {
            Statement::Select { table, columns, filter } => {
                assert_eq!(table, "t");
                assert!(matches!(columns, SelectColumns::Named(ref v) if v == &["name".to_string()]));
                let filter = filter.unwrap();
                assert_eq!(filter.column, "active");
                assert_eq!(filter.op, CompareOp::Eq);
                assert_eq!(filter.literal, Value::Boolean(true));
            }
            _ => panic!("expected Select"),
        }
    }

    #[test]
    fn parses_select_star_without_filter() {
        let stmt = parse_sql("SELECT * FROM t").unwrap();
        match stmt {
            Statement::Select { table, columns, filter } => {
                assert_eq!(table, "t");
                assert!(matches!(columns, SelectColumns::All));
                assert!(filter.is_none());
            }
            _ => panic!("expected Select"),
        }
    }

    #[test]
    fn rejects_joins() {
        let err = parse_sql("SELECT * FROM a, b").unwrap_err();
        assert!(matches!(err, EngineError::ParseError(_)));
    }
}
