// This file contains all SQL statements issued by the mapping layer.
#![forbid(unsafe_code)]

use crate::orm::descriptor::{Descriptor, ID_COLUMN};

// ========================= catalog =========================
pub const SELECT_TABLES: &str = concat!(
    "SELECT name FROM sqlite_master ",
    "WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
);

// ========================= generated statements =========================
// Only identifiers taken from a validated descriptor are interpolated into
// these statements.  Values are always bound to positional placeholders.

// ---------------------------------------------------------------------------
// create_table_sql:
// ---------------------------------------------------------------------------
pub fn create_table_sql(d: &Descriptor) -> String {
    format!("CREATE TABLE {} ({});", d.name(), d.column_defs().join(", "))
}

// ---------------------------------------------------------------------------
// insert_sql:
// ---------------------------------------------------------------------------
pub fn insert_sql(d: &Descriptor) -> String {
    let fields = d.column_names();
    if fields.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES;", d.name());
    }

    let placeholders = vec!["?"; fields.len()];
    format!("INSERT INTO {} ({}) VALUES ({});",
            d.name(), fields.join(", "), placeholders.join(", "))
}

// ---------------------------------------------------------------------------
// select_all_sql:
// ---------------------------------------------------------------------------
pub fn select_all_sql(d: &Descriptor) -> String {
    format!("SELECT {} FROM {} ORDER BY {};", d.select_names().join(", "), d.name(), ID_COLUMN)
}

// ---------------------------------------------------------------------------
// select_by_id_sql:
// ---------------------------------------------------------------------------
pub fn select_by_id_sql(d: &Descriptor) -> String {
    format!("SELECT {} FROM {} WHERE {} = ?;", d.select_names().join(", "), d.name(), ID_COLUMN)
}
