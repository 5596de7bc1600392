//! Read-only views over the catalog schema: which tables exist, how they are
//! laid out, and what they contain.

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub record_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub decl_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRecords {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Resolves `name` against the schema and returns it quoted for use as an
/// identifier. Names not present in `sqlite_master` are refused.
fn schema_table(conn: &Connection, name: &str) -> Result<String> {
    if !table_names(conn)?.iter().any(|t| t == name) {
        return Err(CatalogError::UnknownTable(name.to_string()));
    }
    Ok(quote_ident(name))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn list_tables(conn: &Connection) -> Result<Vec<TableSummary>> {
    let mut summaries = Vec::new();
    for name in table_names(conn)? {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&name));
        let record_count = conn.query_row(&sql, [], |row| row.get(0))?;
        summaries.push(TableSummary { name, record_count });
    }
    Ok(summaries)
}

pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    schema_table(conn, table)?;
    let mut stmt = conn.prepare(
        r#"SELECT name, type, "notnull", pk FROM pragma_table_info(?1) ORDER BY cid"#,
    )?;
    let rows = stmt.query_map(params![table], |row| {
        Ok(ColumnInfo {
            name: row.get(0)?,
            decl_type: row.get(1)?,
            nullable: row.get::<_, i64>(2)? == 0,
            primary_key: row.get::<_, i64>(3)? > 0,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn table_records(conn: &Connection, table: &str) -> Result<TableRecords> {
    let quoted = schema_table(conn, table)?;
    let mut stmt = conn.prepare(&format!("SELECT * FROM {quoted}"))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let rows = stmt.query_map([], |row| {
        (0..width).map(|i| row.get_ref(i).map(render_value)).collect::<rusqlite::Result<Vec<_>>>()
    })?;
    let rows = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(TableRecords { columns, rows })
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
