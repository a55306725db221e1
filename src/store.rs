//! Single-file relational store backed by SQLite.
//!
//! One table per dataset, no implicit primary key. Tables are only ever
//! replaced as a whole, inside a single transaction, so readers observe either
//! the previous table or the complete new one.

use std::path::{Path, PathBuf};

use log::{debug, info};
use rusqlite::{Connection, OpenFlags, params_from_iter};

use crate::{
    data::Cell,
    error::{LocatorError, Result},
    schema::{ColumnMeta, ColumnType, Schema},
};

const ROWID_ALIASES: [&str; 3] = ["rowid", "_rowid_", "oid"];

pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

/// Column labels and rows produced by one statement.
pub(crate) type RowSet = (Vec<String>, Vec<Vec<Cell>>);

impl Store {
    /// Opens (creating if needed) a store file for reading and writing.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|err| LocatorError::store(format!("Opening store {path:?}"), err))?;
        debug!("Opened store {path:?}");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens an existing store file without write access.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| LocatorError::store(format!("Opening store {path:?} read-only"), err))?;
        debug!("Opened store {path:?} read-only");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens an existing store file for reading and writing. A missing file
    /// is an error instead of a new empty store.
    pub fn open_existing(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| LocatorError::store(format!("Opening existing store {path:?}"), err))?;
        debug!("Opened existing store {path:?}");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| LocatorError::store("Opening in-memory store", err))?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .map_err(|err| LocatorError::store(format!("Looking up table '{table}'"), err))?;
        Ok(count > 0)
    }

    /// Lists the declared columns of `table` in definition order.
    pub fn table_columns(&self, table: &str) -> Result<Vec<ColumnMeta>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(|err| LocatorError::store("Preparing column listing", err))?;
        let columns = stmt
            .query_map([table], |row| {
                let name: String = row.get(0)?;
                let declared: String = row.get(1)?;
                Ok(ColumnMeta {
                    name,
                    column_type: ColumnType::from_declared(&declared),
                })
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|err| LocatorError::store(format!("Listing columns of '{table}'"), err))?;
        if columns.is_empty() {
            return Err(LocatorError::Store(format!("no such table: {table}")));
        }
        Ok(columns)
    }

    /// A name that still reaches the implicit row id of `table`, i.e. the
    /// order rows were inserted in. `None` when user columns shadow every
    /// alias.
    pub fn row_order_column(&self, table: &str) -> Result<Option<&'static str>> {
        let columns = self.table_columns(table)?;
        Ok(ROWID_ALIASES.into_iter().find(|alias| {
            !columns
                .iter()
                .any(|column| column.name.eq_ignore_ascii_case(alias))
        }))
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|err| LocatorError::store(format!("Counting rows of '{table}'"), err))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Replaces `table` with `schema` and `rows` in one transaction. On any
    /// failure the transaction is rolled back and the previous table, if any,
    /// is left untouched.
    pub fn replace_table(&mut self, table: &str, schema: &Schema, rows: &[Vec<Cell>]) -> Result<()> {
        ensure_table_name(table)?;
        if schema.columns.is_empty() {
            return Err(LocatorError::Store(format!(
                "cannot create table '{table}' without columns"
            )));
        }
        let quoted = quote_identifier(table);
        let definitions = schema
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.column_type.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; schema.columns.len()].join(", ");

        let tx = self
            .conn
            .transaction()
            .map_err(|err| LocatorError::store("Starting transaction", err))?;
        tx.execute(&format!("DROP TABLE IF EXISTS {quoted}"), [])
            .map_err(|err| LocatorError::store(format!("Dropping table '{table}'"), err))?;
        tx.execute(&format!("CREATE TABLE {quoted} ({definitions})"), [])
            .map_err(|err| LocatorError::store(format!("Creating table '{table}'"), err))?;
        {
            let mut insert = tx
                .prepare(&format!("INSERT INTO {quoted} VALUES ({placeholders})"))
                .map_err(|err| LocatorError::store(format!("Preparing insert into '{table}'"), err))?;
            for (row_idx, row) in rows.iter().enumerate() {
                if row.len() != schema.columns.len() {
                    return Err(LocatorError::Store(format!(
                        "row {row_idx} has {} value(s) but '{table}' has {} column(s)",
                        row.len(),
                        schema.columns.len()
                    )));
                }
                insert
                    .execute(params_from_iter(row.iter()))
                    .map_err(|err| LocatorError::store(format!("Inserting row {row_idx}"), err))?;
            }
        }
        tx.commit()
            .map_err(|err| LocatorError::store(format!("Committing table '{table}'"), err))?;
        info!(
            "Replaced table '{table}' with {} row(s) across {} column(s)",
            rows.len(),
            schema.columns.len()
        );
        Ok(())
    }

    /// Runs one statement and collects every row it produces.
    pub(crate) fn select(&self, sql: &str) -> rusqlite::Result<RowSet> {
        let mut stmt = self.conn.prepare(sql)?;
        collect_rows(&mut stmt)
    }
}

pub(crate) fn collect_rows(stmt: &mut rusqlite::Statement<'_>) -> rusqlite::Result<RowSet> {
    let columns = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let width = columns.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(width);
        for idx in 0..width {
            cells.push(Cell::from(row.get_ref(idx)?));
        }
        rows.push(cells);
    }
    Ok((columns, rows))
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn ensure_table_name(table: &str) -> Result<()> {
    if table.trim().is_empty() {
        return Err(LocatorError::Parse("table name cannot be empty".into()));
    }
    Ok(())
}
