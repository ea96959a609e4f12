// This file contains the schema descriptors that stand in for table definitions.
#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::fmt;

use crate::utils::errors::Errors;

// ***************************************************************************
//                                Constants
// ***************************************************************************
/// The primary key column every table carries.
pub const ID_COLUMN: &str = "id";
pub const ID_COLUMN_DEF: &str = "id INTEGER PRIMARY KEY AUTOINCREMENT";

// Suffix appended to a foreign key name to form its column name.
const FOREIGN_KEY_SUFFIX: &str = "_id";

// ***************************************************************************
//                                Enums
// ***************************************************************************
/// The primitive types a declared column can hold.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Blob,
    Bool,
}

impl SqlType {
    /// The sqlite storage type used in CREATE TABLE.  Booleans are stored
    /// as integers.
    pub fn sql_type(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real    => "REAL",
            SqlType::Text    => "TEXT",
            SqlType::Blob    => "BLOB",
            SqlType::Bool    => "INTEGER",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.sql_type())
    }
}

// ***************************************************************************
//                             Descriptor Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// Column:
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Column {
    pub name: String,
    pub sql_type: SqlType,
}

// ---------------------------------------------------------------------------
// ForeignKey:
// ---------------------------------------------------------------------------
/** A reference to another table, stored as a plain `<name>_id INTEGER`
 * column.  No constraint is declared in the database.
 */
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ForeignKey {
    pub name: String,
    pub table: String,
}

impl ForeignKey {
    pub fn column_name(&self) -> String {
        self.name.clone() + FOREIGN_KEY_SUFFIX
    }
}

// ---------------------------------------------------------------------------
// Descriptor:
// ---------------------------------------------------------------------------
/** The description of one entity's table: its name, the implicit id primary
 * key, the declared columns and the foreign keys, all in declaration order.
 * Descriptors are validated once when built and are immutable afterwards.
 */
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Descriptor {
    name: String,
    columns: Vec<Column>,
    foreign_keys: Vec<ForeignKey>,
}

impl Descriptor {
    pub fn builder(name: &str) -> DescriptorBuilder {
        DescriptorBuilder {
            name: name.to_string(),
            columns: vec!(),
            foreign_keys: vec!(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Column definitions for CREATE TABLE, id first.
    pub fn column_defs(&self) -> Vec<String> {
        let mut defs = vec!(ID_COLUMN_DEF.to_string());
        for c in &self.columns {
            defs.push(format!("{} {}", c.name, c.sql_type));
        }
        for fk in &self.foreign_keys {
            defs.push(format!("{} {}", fk.column_name(), SqlType::Integer));
        }
        defs
    }

    /// The writable columns: declared columns followed by foreign key columns.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone())
            .chain(self.foreign_keys.iter().map(|fk| fk.column_name()))
            .collect()
    }

    /// The columns returned by the select statements, id first.
    pub fn select_names(&self) -> Vec<String> {
        let mut names = vec!(ID_COLUMN.to_string());
        names.extend(self.column_names());
        names
    }

    /// The storage type of each writable column, in column_names() order.
    pub fn column_types(&self) -> Vec<SqlType> {
        self.columns.iter().map(|c| c.sql_type)
            .chain(self.foreign_keys.iter().map(|_| SqlType::Integer))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// DescriptorBuilder:
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub struct DescriptorBuilder {
    name: String,
    columns: Vec<Column>,
    foreign_keys: Vec<ForeignKey>,
}

impl DescriptorBuilder {
    pub fn column(mut self, name: &str, sql_type: SqlType) -> Self {
        self.columns.push(Column { name: name.to_string(), sql_type });
        self
    }

    pub fn foreign_key(mut self, name: &str, table: &str) -> Self {
        self.foreign_keys.push(ForeignKey { name: name.to_string(), table: table.to_string() });
        self
    }

    /** Validate and freeze the descriptor.  Table and column names must be
     * plain identifiers since they are interpolated into sql text, column
     * names must be unique and id is reserved for the primary key.
     */
    pub fn build(self) -> Result<Descriptor, Errors> {
        check_identifier(&self.name, "table")?;
        for fk in &self.foreign_keys {
            check_identifier(&fk.table, "referenced table")?;
        }

        let mut seen: HashSet<String> = HashSet::new();
        let names = self.columns.iter().map(|c| c.name.clone())
            .chain(self.foreign_keys.iter().map(|fk| fk.column_name()));
        for name in names {
            check_identifier(&name, "column")?;
            if name.eq_ignore_ascii_case(ID_COLUMN) {
                return Err(Errors::InvalidDescriptor(
                    format!("column name '{}' in table {} is reserved for the primary key", name, self.name)));
            }
            // Sqlite identifiers are case insensitive.
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(Errors::InvalidDescriptor(
                    format!("duplicate column '{}' in table {}", name, self.name)));
            }
        }

        Ok(Descriptor { name: self.name, columns: self.columns, foreign_keys: self.foreign_keys })
    }
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// check_identifier:
// ---------------------------------------------------------------------------
fn check_identifier(name: &str, kind: &str) -> Result<(), Errors> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        },
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Errors::InvalidDescriptor(format!("invalid {} name '{}'", kind, name)))
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> Descriptor {
        Descriptor::builder("post")
            .column("title", SqlType::Text)
            .column("rating", SqlType::Real)
            .column("published", SqlType::Bool)
            .foreign_key("author", "author")
            .build()
            .unwrap()
    }

    #[test]
    fn sql_type_map() {
        assert_eq!(SqlType::Integer.sql_type(), "INTEGER");
        assert_eq!(SqlType::Real.sql_type(), "REAL");
        assert_eq!(SqlType::Text.sql_type(), "TEXT");
        assert_eq!(SqlType::Blob.sql_type(), "BLOB");
        assert_eq!(SqlType::Bool.sql_type(), "INTEGER");
    }

    #[test]
    fn names_keep_declaration_order() {
        let d = post();
        assert_eq!(d.column_names(), vec!["title", "rating", "published", "author_id"]);
        assert_eq!(d.select_names(), vec!["id", "title", "rating", "published", "author_id"]);
        assert_eq!(d.column_types(),
                   vec![SqlType::Text, SqlType::Real, SqlType::Bool, SqlType::Integer]);
    }

    #[test]
    fn column_defs_start_with_primary_key() {
        let d = post();
        assert_eq!(d.column_defs(), vec![
            "id INTEGER PRIMARY KEY AUTOINCREMENT",
            "title TEXT",
            "rating REAL",
            "published INTEGER",
            "author_id INTEGER",
        ]);
    }

    #[test]
    fn id_is_reserved() {
        let r = Descriptor::builder("t").column("id", SqlType::Integer).build();
        assert!(matches!(r, Err(Errors::InvalidDescriptor(_))));
        let r = Descriptor::builder("t").column("ID", SqlType::Text).build();
        assert!(r.is_err());
    }

    #[test]
    fn duplicate_columns_rejected() {
        let r = Descriptor::builder("t")
            .column("name", SqlType::Text)
            .column("name", SqlType::Integer)
            .build();
        assert!(matches!(r, Err(Errors::InvalidDescriptor(_))));

        // A foreign key column collides with a declared column of the same name.
        let r = Descriptor::builder("t")
            .column("owner_id", SqlType::Integer)
            .foreign_key("owner", "person")
            .build();
        assert!(r.is_err());
    }

    #[test]
    fn identifiers_are_checked() {
        assert!(Descriptor::builder("bad name").build().is_err());
        assert!(Descriptor::builder("1table").build().is_err());
        assert!(Descriptor::builder("t").column("x; DROP TABLE t", SqlType::Text).build().is_err());
        assert!(Descriptor::builder("t").foreign_key("a", "b c").build().is_err());
        assert!(Descriptor::builder("_ok").column("col_2", SqlType::Blob).build().is_ok());
    }
}
