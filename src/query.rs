//! Ad-hoc query execution.
//!
//! Query text is handed to the engine verbatim. The caller is treated as a
//! trusted operator unless [`QueryPolicy::ReadOnly`] is selected, which is
//! required whenever the query surface is reachable by untrusted input.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    data::Cell,
    error::{LocatorError, Result},
    export::Tabular,
    store::{Store, collect_rows},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryPolicy {
    /// Any single statement is executed, including writes and DDL.
    #[default]
    Permissive,
    /// Statements the engine does not report as read-only are rejected
    /// before they run.
    ReadOnly,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

impl Tabular for QueryResult {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn cell_rows(&self) -> Box<dyn Iterator<Item = Vec<Cell>> + '_> {
        Box::new(self.rows.iter().cloned())
    }
}

/// Executes one statement and returns every row it produces. On failure no
/// rows are returned and the engine's message is preserved.
pub fn execute(store: &Store, text: &str, policy: QueryPolicy) -> Result<QueryResult> {
    if text.trim().is_empty() {
        return Err(LocatorError::Query("query text is empty".into()));
    }
    let mut stmt = store
        .connection()
        .prepare(text)
        .map_err(|err| LocatorError::Query(err.to_string()))?;
    if policy == QueryPolicy::ReadOnly && !stmt.readonly() {
        return Err(LocatorError::Query(
            "only read-only statements are allowed by the current query policy".into(),
        ));
    }
    debug!("Executing query under {policy:?} policy");
    let (columns, rows) =
        collect_rows(&mut stmt).map_err(|err| LocatorError::Query(err.to_string()))?;
    info!(
        "Query returned {} row(s) across {} column(s)",
        rows.len(),
        columns.len()
    );
    Ok(QueryResult { columns, rows })
}
