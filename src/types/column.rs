//! Column types and the fixed-width tuple serialization format used above
//! the table heap.

use crate::error::{Result, StorageError};

/// A value held by a tuple field, after deserialization.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i32),
    Boolean(bool),
    Varchar(String),
}

impl Value {
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_varchar(&self) -> Option<&str> {
        match self {
            Value::Varchar(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Varchar(v) => write!(f, "{v}"),
        }
    }
}

/// A column's declared type, as it appears in a table schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Boolean,
    Varchar(u16),
}

/// Catalog JSON stores a type as its canonical name string (`"INTEGER"`,
/// `"VARCHAR(16)"`), not as a serde-derived enum tag, so it matches the
/// catalog root page's external wire format exactly.
impl serde::Serialize for ColumnType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> serde::Deserialize<'de> for ColumnType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        ColumnType::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown column type: {s}")))
    }
}

impl ColumnType {
    /// Parse a type name as it appears in `CREATE TABLE` or the catalog's
    /// JSON (`INTEGER`, `BOOLEAN`, `VARCHAR(N)`).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let upper = s.to_ascii_uppercase();
        if upper == "INTEGER" {
            return Some(ColumnType::Integer);
        }
        if upper == "BOOLEAN" {
            return Some(ColumnType::Boolean);
        }
        if let Some(rest) = upper.strip_prefix("VARCHAR") {
            let rest = rest.trim().trim_start_matches('(').trim_end_matches(')');
            if let Ok(n) = rest.trim().parse::<u16>() {
                return Some(ColumnType::Varchar(n));
            }
        }
        None
    }

    /// Encode this type's canonical name, the inverse of `parse`.
    pub fn name(&self) -> String {
        match self {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Varchar(n) => format!("VARCHAR({n})"),
        }
    }

    /// Append `value`'s wire encoding to `buf`. `value` must match this
    /// column's type (the caller is the tuple serializer, which always
    /// pairs values with their schema's column types).
    pub fn encode(&self, value: &Value, buf: &mut Vec<u8>) -> Result<()> {
        match (self, value) {
            (ColumnType::Integer, Value::Integer(v)) => {
                buf.extend_from_slice(&v.to_le_bytes());
                Ok(())
            }
            (ColumnType::Boolean, Value::Boolean(v)) => {
                buf.push(if *v { 1 } else { 0 });
                Ok(())
            }
            (ColumnType::Varchar(max), Value::Varchar(s)) => {
                let bytes = s.as_bytes();
                if bytes.len() > *max as usize {
                    return Err(StorageError::corruption(format!(
                        "varchar value of {} bytes exceeds declared max {}",
                        bytes.len(),
                        max
                    )));
                }
                buf.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
                buf.extend_from_slice(bytes);
                Ok(())
            }
            _ => Err(StorageError::corruption(
                "value does not match column type".to_string(),
            )),
        }
    }

    /// Decode one value of this type from `buf` starting at `offset`,
    /// returning the value and the offset just past it.
    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<(Value, usize)> {
        match self {
            ColumnType::Integer => {
                let end = offset + 4;
                let bytes: [u8; 4] = buf
                    .get(offset..end)
                    .ok_or_else(|| StorageError::corruption("truncated integer field"))?
                    .try_into()
                    .unwrap();
                Ok((Value::Integer(i32::from_le_bytes(bytes)), end))
            }
            ColumnType::Boolean => {
                let b = *buf
                    .get(offset)
                    .ok_or_else(|| StorageError::corruption("truncated boolean field"))?;
                Ok((Value::Boolean(b != 0), offset + 1))
            }
            ColumnType::Varchar(_) => {
                let len_end = offset + 2;
                let len_bytes: [u8; 2] = buf
                    .get(offset..len_end)
                    .ok_or_else(|| StorageError::corruption("truncated varchar length"))?
                    .try_into()
                    .unwrap();
                let len = u16::from_le_bytes(len_bytes) as usize;
                let data_end = len_end + len;
                let data = buf
                    .get(len_end..data_end)
                    .ok_or_else(|| StorageError::corruption("truncated varchar data"))?;
                let s = String::from_utf8(data.to_vec())
                    .map_err(|e| StorageError::corruption(e.to_string()))?;
                Ok((Value::Varchar(s), data_end))
            }
        }
    }
}

/// Serialize a tuple of values as the concatenation of its fixed-width
/// fields, in column order.
pub fn encode_tuple(types: &[ColumnType], values: &[Value]) -> Result<Vec<u8>> {
    if types.len() != values.len() {
        return Err(StorageError::corruption(format!(
            "expected {} values, got {}",
            types.len(),
            values.len()
        )));
    }
    let mut buf = Vec::new();
    for (ty, val) in types.iter().zip(values.iter()) {
        ty.encode(val, &mut buf)?;
    }
    Ok(buf)
}

/// Deserialize a tuple's bytes into values, in column order.
pub fn decode_tuple(types: &[ColumnType], bytes: &[u8]) -> Result<Vec<Value>> {
    let mut offset = 0;
    let mut values = Vec::with_capacity(types.len());
    for ty in types {
        let (val, next) = ty.decode(bytes, offset)?;
        values.push(val);
        offset = next;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_parse_roundtrip() {
        assert_eq!(ColumnType::parse("INTEGER"), Some(ColumnType::Integer));
        assert_eq!(ColumnType::parse("boolean"), Some(ColumnType::Boolean));
        assert_eq!(
            ColumnType::parse("VARCHAR(32)"),
            Some(ColumnType::Varchar(32))
        );
        assert_eq!(ColumnType::Varchar(32).name(), "VARCHAR(32)");
    }

    #[test]
    fn tuple_roundtrip() {
        let types = vec![
            ColumnType::Integer,
            ColumnType::Varchar(16),
            ColumnType::Boolean,
        ];
        let values = vec![
            Value::Integer(42),
            Value::Varchar("hello".to_string()),
            Value::Boolean(true),
        ];
        let bytes = encode_tuple(&types, &values).unwrap();
        let back = decode_tuple(&types, &bytes).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn varchar_overflow_rejected() {
        let types = vec![ColumnType::Varchar(2)];
        let values = vec![Value::Varchar("abc".to_string())];
        assert!(encode_tuple(&types, &values).is_err());
    }
}
