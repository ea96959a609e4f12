// This file contains the row and value types exchanged with the database.
#![forbid(unsafe_code)]

use std::fmt;

use crate::orm::descriptor::{Descriptor, ID_COLUMN};
use crate::utils::errors::Errors;

// ***************************************************************************
//                                  Value
// ***************************************************************************
/// A single column value as stored in sqlite.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Bool(bool),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Null       => "null",
            Value::Integer(_) => "integer",
            Value::Real(_)    => "real",
            Value::Text(_)    => "text",
            Value::Blob(_)    => "blob",
            Value::Bool(_)    => "bool",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null       => write!(f, "NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Real(v)    => write!(f, "{}", v),
            Value::Text(v)    => write!(f, "{:?}", v),
            Value::Blob(v)    => write!(f, "<{} bytes>", v.len()),
            Value::Bool(v)    => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Integer(v) }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self { Value::Integer(v as i64) }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Real(v) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::Text(v) }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::Text(v.to_string()) }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self { Value::Blob(v) }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Bool(v) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

// ***************************************************************************
//                                FromValue
// ***************************************************************************
/// Typed extraction of a stored value.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, Errors>;
}

fn mismatch(expected: &str, value: &Value) -> Errors {
    Errors::ColumnType(format!("expected {} but found {} value {}", expected, value.type_name(), value))
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, Errors> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, Errors> {
        match value {
            Value::Integer(v) => Ok(v),
            Value::Bool(v) => Ok(v as i64),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, Errors> {
        let v = i64::from_value(value)?;
        i32::try_from(v).map_err(|_| Errors::ColumnType(format!("integer {} does not fit in i32", v)))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, Errors> {
        match value {
            Value::Real(v) => Ok(v),
            Value::Integer(v) => Ok(v as f64),
            other => Err(mismatch("real", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, Errors> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, Errors> {
        match value {
            Value::Blob(v) => Ok(v),
            other => Err(mismatch("blob", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, Errors> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::Integer(v) => Ok(v != 0),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, Errors> {
        match value {
            Value::Null => Ok(None),
            v => Ok(Some(T::from_value(v)?)),
        }
    }
}

// ***************************************************************************
//                                   Row
// ***************************************************************************
/** One table row: the id assigned by the database (None until the row is
 * saved) and the column values by name.
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub id: Option<i64>,
    values: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Row::default()
    }

    pub fn with_id(id: Option<i64>) -> Self {
        Row { id, values: vec!() }
    }

    /// Builder form of set().
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Assign a column value, replacing any previous assignment.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.values.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Remove the named value and convert it.  A column the row never
    /// received converts from NULL.
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T, Errors> {
        let value = match self.values.iter().position(|(k, _)| k == name) {
            Some(i) => self.values.remove(i).1,
            None => Value::Null,
        };
        T::from_value(value)
            .map_err(|e| Errors::ColumnType(format!("column {}: {}", name, e)))
    }

    /// The values to insert, ordered by the descriptor's columns.  Columns
    /// the row does not assign are inserted as NULL.
    pub fn values_for(&self, d: &Descriptor) -> Vec<Value> {
        d.column_names().iter()
            .map(|n| self.get(n).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Rebuild a row by zipping the selected column names with their values.
    pub fn from_columns(names: &[String], values: Vec<Value>) -> Result<Self, Errors> {
        if names.len() != values.len() {
            return Err(Errors::ColumnType(
                format!("{} column names for {} values", names.len(), values.len())));
        }

        let mut row = Row::new();
        for (name, value) in names.iter().zip(values) {
            if name == ID_COLUMN {
                row.id = Option::<i64>::from_value(value)?;
            } else {
                row.set(name, value);
            }
        }
        Ok(row)
    }
}

// ***************************************************************************
//                                  Entity
// ***************************************************************************
/** A plain struct persisted in its own table.  Implementations describe
 * their table once, typically in a lazy_static, and convert themselves to
 * and from rows.
 */
pub trait Entity: Sized {
    fn descriptor() -> &'static Descriptor;
    fn id(&self) -> Option<i64>;
    fn set_id(&mut self, id: i64);
    fn to_row(&self) -> Row;
    fn from_row(row: Row) -> Result<Self, Errors>;
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::descriptor::SqlType;

    #[test]
    fn conversions_into_values() {
        assert_eq!(Value::from(3), Value::Integer(3));
        assert_eq!(Value::from("a"), Value::Text("a".to_string()));
        assert_eq!(Value::from(None::<f64>), Value::Null);
        assert_eq!(Value::from(Some(true)), Value::Bool(true));
    }

    #[test]
    fn bools_read_back_from_integers() {
        assert!(bool::from_value(Value::Integer(1)).unwrap());
        assert!(!bool::from_value(Value::Integer(0)).unwrap());
    }

    #[test]
    fn type_mismatch_is_reported() {
        let err = String::from_value(Value::Integer(4)).unwrap_err();
        assert!(matches!(err, Errors::ColumnType(_)));
        assert!(i32::from_value(Value::Integer(i64::MAX)).is_err());
    }

    #[test]
    fn take_and_missing_columns() {
        let mut row = Row::new().with("name", "Ada").with("age", 36);
        assert_eq!(row.take::<String>("name").unwrap(), "Ada");
        assert_eq!(row.take::<i64>("age").unwrap(), 36);
        assert_eq!(row.take::<Option<String>>("nickname").unwrap(), None);
        assert!(row.take::<String>("nickname").is_err());
    }

    #[test]
    fn set_replaces_existing_value() {
        let mut row = Row::new().with("name", "a");
        row.set("name", "b");
        assert_eq!(row.get("name"), Some(&Value::Text("b".to_string())));
    }

    #[test]
    fn values_follow_descriptor_order() {
        let d = Descriptor::builder("pet")
            .column("name", SqlType::Text)
            .column("legs", SqlType::Integer)
            .foreign_key("owner", "person")
            .build()
            .unwrap();
        let row = Row::new().with("owner_id", 2).with("name", "Rex");
        assert_eq!(row.values_for(&d),
                   vec![Value::Text("Rex".to_string()), Value::Null, Value::Integer(2)]);
    }

    #[test]
    fn from_columns_zips_names_and_values() {
        let names = vec!["id".to_string(), "name".to_string()];
        let row = Row::from_columns(&names, vec![Value::Integer(9), Value::from("x")]).unwrap();
        assert_eq!(row.id, Some(9));
        assert_eq!(row.get("name"), Some(&Value::Text("x".to_string())));

        assert!(Row::from_columns(&names, vec![Value::Integer(1)]).is_err());
    }
}
