//! In-memory stand-in for a live database, implementing `SchemaSession`
//! directly in domain terms. Lets the apply policy be exercised without a
//! server, including injected privilege failures and simulated
//! concurrent-request races.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::errors::DbError;
use crate::session::SchemaSession;
use crate::spec::{ColumnDefault, ColumnSpec, SeedSpec, SeedValue, TableSpec};

#[derive(Debug, Clone)]
struct MemoryColumn {
    name: String,
    default: Option<ColumnDefault>,
}

impl MemoryColumn {
    fn backfill_value(&self) -> SeedValue {
        match &self.default {
            None | Some(ColumnDefault::Null) => SeedValue::Null,
            Some(ColumnDefault::Int(v)) => SeedValue::Int(*v),
            Some(ColumnDefault::Float(v)) => SeedValue::Float(*v),
            Some(ColumnDefault::Text(v)) => SeedValue::Text(v.clone()),
            Some(ColumnDefault::CurrentTimestamp) => {
                SeedValue::Text("CURRENT_TIMESTAMP".to_string())
            }
        }
    }
}

#[derive(Debug, Default)]
struct MemoryTable {
    columns: Vec<MemoryColumn>,
    rows: Vec<IndexMap<String, SeedValue>>,
}

#[derive(Debug, Default)]
pub struct MemorySession {
    tables: IndexMap<String, MemoryTable>,
    denied_tables: HashSet<String>,
    denied_columns: HashSet<(String, String)>,
    racing_columns: HashSet<(String, String)>,
    denied_seeds: HashSet<String>,
    lost_connections: HashSet<String>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make CREATE TABLE fail for `table` as if the user lacked privileges.
    pub fn deny_table(&mut self, table: &str) {
        self.denied_tables.insert(table.to_string());
    }

    /// Make ADD COLUMN fail for `table.column` as if the user lacked
    /// privileges.
    pub fn deny_column(&mut self, table: &str, column: &str) {
        self.denied_columns
            .insert((table.to_string(), column.to_string()));
    }

    /// Simulate losing the check-then-act race on `table.column`: the column
    /// is absent at probe time, but a concurrent request adds it before our
    /// ALTER lands, which then fails with a duplicate-column error.
    pub fn race_column(&mut self, table: &str, column: &str) {
        self.racing_columns
            .insert((table.to_string(), column.to_string()));
    }

    /// Make seed insertion fail for `table`.
    pub fn deny_seed(&mut self, table: &str) {
        self.denied_seeds.insert(table.to_string());
    }

    /// Simulate the connection dying when `table` is next probed.
    pub fn drop_connection(&mut self, table: &str) {
        self.lost_connections.insert(table.to_string());
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn columns_of(&self, table: &str) -> Vec<String> {
        self.tables
            .get(table)
            .map(|t| t.columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn rows_in(&self, table: &str) -> usize {
        self.tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn value(&self, table: &str, row: usize, column: &str) -> Option<&SeedValue> {
        self.tables
            .get(table)
            .and_then(|t| t.rows.get(row))
            .and_then(|r| r.get(column))
    }

    /// Insert a row outside any seed batch, e.g. to model data an operator
    /// entered by hand before the bootstrapper ever ran.
    pub fn insert_manual_row(&mut self, table: &str, values: &[(&str, SeedValue)]) {
        let entry = self.tables.entry(table.to_string()).or_default();
        let mut row = IndexMap::new();
        for (name, value) in values {
            if !entry.columns.iter().any(|c| c.name == *name) {
                entry.columns.push(MemoryColumn {
                    name: name.to_string(),
                    default: None,
                });
            }
            row.insert(name.to_string(), value.clone());
        }
        entry.rows.push(row);
    }

    fn push_column(table: &mut MemoryTable, column: &ColumnSpec) {
        let col = MemoryColumn {
            name: column.name.clone(),
            default: column.default.clone(),
        };
        let backfill = col.backfill_value();
        for row in &mut table.rows {
            row.insert(col.name.clone(), backfill.clone());
        }
        table.columns.push(col);
    }
}

impl SchemaSession for MemorySession {
    async fn table_exists(&mut self, table: &str) -> Result<bool, DbError> {
        if self.lost_connections.contains(table) {
            return Err(DbError::Connection(sqlx::Error::PoolClosed));
        }
        Ok(self.tables.contains_key(table))
    }

    async fn column_names(&mut self, table: &str) -> Result<Vec<String>, DbError> {
        match self.tables.get(table) {
            Some(t) => Ok(t.columns.iter().map(|c| c.name.clone()).collect()),
            None => Err(DbError::Query {
                message: format!("no such table: {}", table),
            }),
        }
    }

    async fn create_table(&mut self, spec: &TableSpec) -> Result<(), DbError> {
        if self.denied_tables.contains(&spec.name) {
            return Err(DbError::Denied {
                message: format!("CREATE denied on {}", spec.name),
            });
        }
        // IF NOT EXISTS semantics
        if self.tables.contains_key(&spec.name) {
            return Ok(());
        }
        let mut table = MemoryTable::default();
        for column in &spec.columns {
            table.columns.push(MemoryColumn {
                name: column.name.clone(),
                default: column.default.clone(),
            });
        }
        self.tables.insert(spec.name.clone(), table);
        Ok(())
    }

    async fn add_column(&mut self, table: &str, column: &ColumnSpec) -> Result<(), DbError> {
        let key = (table.to_string(), column.name.clone());
        if self.denied_columns.contains(&key) {
            return Err(DbError::Denied {
                message: format!("ALTER denied on {}.{}", table, column.name),
            });
        }
        let entry = self.tables.get_mut(table).ok_or_else(|| DbError::Query {
            message: format!("no such table: {}", table),
        })?;
        let present = entry
            .columns
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(&column.name));
        if present {
            return Err(DbError::Duplicate {
                object: format!("Duplicate column name '{}'", column.name),
            });
        }
        if self.racing_columns.remove(&key) {
            // The concurrent peer's ALTER lands first, ours reports a
            // duplicate.
            Self::push_column(entry, column);
            return Err(DbError::Duplicate {
                object: format!("Duplicate column name '{}'", column.name),
            });
        }
        Self::push_column(entry, column);
        Ok(())
    }

    async fn row_count(&mut self, table: &str) -> Result<i64, DbError> {
        match self.tables.get(table) {
            Some(t) => Ok(t.rows.len() as i64),
            None => Err(DbError::Query {
                message: format!("no such table: {}", table),
            }),
        }
    }

    async fn insert_rows(&mut self, seed: &SeedSpec) -> Result<u64, DbError> {
        if self.denied_seeds.contains(&seed.table) {
            return Err(DbError::Denied {
                message: format!("INSERT denied on {}", seed.table),
            });
        }
        let entry = self
            .tables
            .get_mut(&seed.table)
            .ok_or_else(|| DbError::Query {
                message: format!("no such table: {}", seed.table),
            })?;
        for row in &seed.rows {
            let mut stored = IndexMap::new();
            for column in &entry.columns {
                let value = match seed.columns.iter().position(|c| c == &column.name) {
                    Some(ix) => row[ix].clone(),
                    None => column.backfill_value(),
                };
                stored.insert(column.name.clone(), value);
            }
            entry.rows.push(stored);
        }
        Ok(seed.rows.len() as u64)
    }
}
