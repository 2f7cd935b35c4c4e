use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("table {name} declared more than once")]
    DuplicateTable { name: String },

    #[error("column {column} declared more than once in table {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("table {name} declares no columns")]
    EmptyTable { name: String },

    #[error("seed for {table} targets no declared table")]
    UnknownSeedTable { table: String },

    #[error("seed row {row} for {table} has {got} values, expected {expected}")]
    SeedShapeMismatch {
        table: String,
        row: usize,
        expected: usize,
        got: usize,
    },
}

/// Closed set of column types the bootstrapper knows how to render.
/// Anything the target application needs beyond these belongs in a hand
/// written migration, not here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ColumnType {
    Integer,
    Decimal { precision: u8, scale: u8 },
    VarChar { length: u16 },
    Text,
    Date,
    Timestamp { auto_update: bool },
    Enum { values: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ColumnDefault {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    CurrentTimestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub auto_increment: bool,
    pub default: Option<ColumnDefault>,
}

impl ColumnSpec {
    pub fn new(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            nullable: false,
            auto_increment: false,
            default: None,
        }
    }

    /// Conventional `id INT NOT NULL AUTO_INCREMENT` column.
    pub fn id() -> Self {
        let mut col = Self::new("id", ColumnType::Integer);
        col.auto_increment = true;
        col
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
}

/// Declarative description of one table. Evolution is additive only: the
/// model has no way to express dropping or retyping a column, so a spec can
/// never destroy live data.
#[derive(Debug, Clone, Serialize)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: Vec<String>,
    pub unique: Vec<Vec<String>>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSpec {
    pub fn new(name: &str, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            primary_key: Vec::new(),
            unique: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// `id` auto-increment primary key plus the given columns, the shape
    /// nearly every table in the target applications takes.
    pub fn with_id(name: &str, mut columns: Vec<ColumnSpec>) -> Self {
        columns.insert(0, ColumnSpec::id());
        let mut spec = Self::new(name, columns);
        spec.primary_key = vec!["id".to_string()];
        spec
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.unique
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn foreign_key(mut self, columns: &[&str], ref_table: &str, ref_columns: &[&str]) -> Self {
        self.foreign_keys.push(ForeignKey {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ref_table: ref_table.to_string(),
            ref_columns: ref_columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn validate(&self) -> Result<(), SpecError> {
        if self.columns.is_empty() {
            return Err(SpecError::EmptyTable {
                name: self.name.clone(),
            });
        }
        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name.to_ascii_lowercase()) {
                return Err(SpecError::DuplicateColumn {
                    table: self.name.clone(),
                    column: col.name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SeedValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl From<i64> for SeedValue {
    fn from(v: i64) -> Self {
        SeedValue::Int(v)
    }
}

impl From<f64> for SeedValue {
    fn from(v: f64) -> Self {
        SeedValue::Float(v)
    }
}

impl From<&str> for SeedValue {
    fn from(v: &str) -> Self {
        SeedValue::Text(v.to_string())
    }
}

impl From<NaiveDate> for SeedValue {
    fn from(v: NaiveDate) -> Self {
        SeedValue::Date(v)
    }
}

/// Sample rows inserted only when the target table is completely empty.
/// The gate is `COUNT(*) == 0`, not per-row existence: a table left half
/// seeded by a crash mid-insert is never retried. Batches run inside one
/// transaction so that crash window is zero-or-all rows.
#[derive(Debug, Clone, Serialize)]
pub struct SeedSpec {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SeedValue>>,
}

impl SeedSpec {
    pub fn new(table: &str, columns: &[&str], rows: Vec<Vec<SeedValue>>) -> Self {
        Self {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub(crate) fn validate(&self, tables: &[TableSpec]) -> Result<(), SpecError> {
        if !tables.iter().any(|t| t.name == self.table) {
            return Err(SpecError::UnknownSeedTable {
                table: self.table.clone(),
            });
        }
        for (ix, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(SpecError::SeedShapeMismatch {
                    table: self.table.clone(),
                    row: ix,
                    expected: self.columns.len(),
                    got: row.len(),
                });
            }
        }
        Ok(())
    }
}
