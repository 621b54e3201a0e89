//! Decoded query rows

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;
use serde::Serialize;

use crate::schema::RowSchema;
use crate::DataError;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Long(i64),
    Num(f64),
    Str(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Num(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One record of a query result, keyed by output column name
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Row {
    values: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Decode a record batch into rows following `schema`.
///
/// Only the schema's columns are read, in schema order. A schema column
/// absent from the batch is an error; extra batch columns are ignored.
pub fn rows_from_batch(batch: &RecordBatch, schema: &RowSchema) -> Result<Vec<Row>, DataError> {
    let mut columns = Vec::with_capacity(schema.len());
    for name in schema.column_names() {
        let array = batch
            .column_by_name(name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))?;
        columns.push((name, array.clone()));
    }

    let rows = (0..batch.num_rows())
        .map(|idx| {
            columns
                .iter()
                .map(|(name, array)| (name.to_string(), cell_value(array, idx)))
                .collect()
        })
        .collect();

    Ok(rows)
}

fn cell_value(array: &ArrayRef, idx: usize) -> Value {
    if array.is_null(idx) {
        return Value::Null;
    }

    if let Some(ints) = array.as_any().downcast_ref::<Int64Array>() {
        Value::Long(ints.value(idx))
    } else if let Some(strings) = array.as_any().downcast_ref::<StringArray>() {
        Value::Str(strings.value(idx).to_string())
    } else if let Some(floats) = array.as_any().downcast_ref::<Float64Array>() {
        Value::Num(floats.value(idx))
    } else {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn interaction_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("ts", DataType::Int64, true),
            Field::new("dur", DataType::Int64, true),
            Field::new("type", DataType::Utf8, true),
            Field::new("extra", DataType::Float64, true),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![1, 2])),
            Arc::new(StringArray::from(vec![Some("load"), None])),
            Arc::new(Int64Array::from(vec![100, 0])),
            Arc::new(Int64Array::from(vec![50, 0])),
            Arc::new(StringArray::from(vec!["chrome_page_loads", "some_future_type"])),
            Arc::new(Float64Array::from(vec![0.5, 1.5])),
        ];
        RecordBatch::try_new(schema, columns).unwrap()
    }

    #[test]
    fn test_rows_follow_schema_order() {
        let schema = RowSchema::named_slice().with_column("type", ColumnType::Str);
        let rows = rows_from_batch(&interaction_batch(), &schema).unwrap();

        assert_eq!(rows.len(), 2);
        let names: Vec<&str> = rows[0].columns().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["id", "name", "ts", "dur", "type"]);
        assert_eq!(rows[0].get_i64("ts"), Some(100));
        assert_eq!(rows[0].get_str("type"), Some("chrome_page_loads"));
    }

    #[test]
    fn test_null_cells_decode_to_null() {
        let rows = rows_from_batch(&interaction_batch(), &RowSchema::named_slice()).unwrap();
        assert_eq!(rows[1].get("name"), Some(&Value::Null));
        assert_eq!(rows[1].get_str("name"), None);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let schema = RowSchema::named_slice().with_column("url", ColumnType::Str);
        let err = rows_from_batch(&interaction_batch(), &schema).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(ref c) if c == "url"));
    }

    #[test]
    fn test_row_builder() {
        let row = Row::new().with("id", 7i64).with("name", "x").with("dur", None::<i64>);
        assert_eq!(row.get_i64("id"), Some(7));
        assert_eq!(row.get_str("name"), Some("x"));
        assert!(row.get("dur").map(Value::is_null).unwrap_or(false));
    }
}
