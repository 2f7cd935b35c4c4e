use indexmap::IndexMap;
use serde::Serialize;

use crate::errors::BootstrapError;

/// Terminal state of one table within a single `ensure()` call. No table is
/// revisited after it reaches one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableState {
    Created,
    CreateFailed,
    UpToDate,
    Altered,
    PartiallyAltered,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnAddition {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedOutcome {
    pub table: String,
    pub rows_inserted: u64,
}

/// Everything one `ensure()` call did, returned to the caller and otherwise
/// not persisted. Callers typically only check `is_noop()` and hand the rest
/// to the admin log.
#[derive(Debug, Default, Serialize)]
pub struct ApplyReport {
    pub tables_created: Vec<String>,
    pub columns_added: Vec<ColumnAddition>,
    pub seeds_applied: Vec<SeedOutcome>,
    pub errors: Vec<BootstrapError>,
    pub states: IndexMap<String, TableState>,
}

impl ApplyReport {
    pub fn is_noop(&self) -> bool {
        self.tables_created.is_empty()
            && self.columns_added.is_empty()
            && self.seeds_applied.is_empty()
            && self.errors.is_empty()
    }

    pub fn table_state(&self, table: &str) -> Option<TableState> {
        self.states.get(table).copied()
    }

    pub(crate) fn created(&mut self, table: &str) {
        self.tables_created.push(table.to_string());
        self.states.insert(table.to_string(), TableState::Created);
    }

    pub(crate) fn column_added(&mut self, table: &str, column: &str) {
        self.columns_added.push(ColumnAddition {
            table: table.to_string(),
            column: column.to_string(),
        });
    }

    pub(crate) fn seeded(&mut self, table: &str, rows_inserted: u64) {
        self.seeds_applied.push(SeedOutcome {
            table: table.to_string(),
            rows_inserted,
        });
    }

    pub(crate) fn failed(&mut self, error: BootstrapError) {
        self.errors.push(error);
    }

    pub(crate) fn settle(&mut self, table: &str, state: TableState) {
        self.states.insert(table.to_string(), state);
    }

    /// Emit the report through tracing so page handlers can stay oblivious.
    pub fn log(&self) {
        for table in &self.tables_created {
            tracing::info!("created table {}", table);
        }
        for add in &self.columns_added {
            tracing::info!("added column {}.{}", add.table, add.column);
        }
        for seed in &self.seeds_applied {
            tracing::info!("seeded {} with {} rows", seed.table, seed.rows_inserted);
        }
        for error in &self.errors {
            tracing::warn!("schema bootstrap: {}", error);
        }
        if self.is_noop() {
            tracing::debug!("schema already up to date");
        }
    }
}
