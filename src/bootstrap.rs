use std::collections::HashSet;

use crate::errors::{BootstrapError, DbError};
use crate::report::{ApplyReport, TableState};
use crate::session::SchemaSession;
use crate::spec::{ColumnSpec, SeedSpec, SpecError, TableSpec};

/// Comparison of one declared table against live metadata. Computed fresh on
/// every `ensure()` call and discarded after apply; the database stays the
/// sole source of truth across requests and instances.
#[derive(Debug)]
pub(crate) struct SchemaDiff<'a> {
    pub missing_table: bool,
    pub missing_columns: Vec<&'a ColumnSpec>,
}

impl<'a> SchemaDiff<'a> {
    /// `live` is `None` when the table does not exist at all.
    pub(crate) fn compute(spec: &'a TableSpec, live: Option<&[String]>) -> Self {
        match live {
            None => Self {
                missing_table: true,
                missing_columns: spec.columns.iter().collect(),
            },
            Some(names) => Self {
                missing_table: false,
                missing_columns: spec
                    .columns
                    .iter()
                    .filter(|col| !names.iter().any(|n| n.eq_ignore_ascii_case(&col.name)))
                    .collect(),
            },
        }
    }
}

// Non-fatal errors are data; connection loss propagates.
fn absorb(e: DbError) -> Result<DbError, DbError> {
    if e.is_fatal() { Err(e) } else { Ok(e) }
}

/// Makes the live schema a superset of a declared one, additively and
/// idempotently, and seeds empty tables. Owns no long-lived state: every
/// call re-probes live metadata.
///
/// Apply policy is continue-on-error: a failed column addition is recorded
/// and the remaining columns and tables still run. A partially migrated
/// schema keeps the application serving; queries against whatever stayed
/// missing fail on their own later and surface as ordinary page errors.
pub struct SchemaBootstrapper {
    tables: Vec<TableSpec>,
    seeds: Vec<SeedSpec>,
}

impl SchemaBootstrapper {
    /// Validates the declaration once, up front. Table order is preserved as
    /// given; callers order foreign-key dependencies themselves.
    pub fn new(tables: Vec<TableSpec>) -> Result<Self, SpecError> {
        let mut seen = HashSet::new();
        for table in &tables {
            table.validate()?;
            if !seen.insert(table.name.to_ascii_lowercase()) {
                return Err(SpecError::DuplicateTable {
                    name: table.name.clone(),
                });
            }
        }
        Ok(Self {
            tables,
            seeds: Vec::new(),
        })
    }

    pub fn with_seeds(mut self, seeds: Vec<SeedSpec>) -> Result<Self, SpecError> {
        for seed in &seeds {
            seed.validate(&self.tables)?;
        }
        self.seeds = seeds;
        Ok(self)
    }

    /// Runs the full declaration against the database. Never fails for
    /// schema-level problems; those come back inside the report. The only
    /// `Err` is a dead connection, surfaced as the driver error so callers
    /// handle it like any other database outage.
    pub async fn ensure<S: SchemaSession>(&self, db: &mut S) -> Result<ApplyReport, DbError> {
        let mut report = ApplyReport::default();
        for spec in &self.tables {
            self.ensure_table(db, spec, &mut report).await?;
        }
        for seed in &self.seeds {
            self.ensure_seed(db, seed, &mut report).await?;
        }
        Ok(report)
    }

    async fn ensure_table<S: SchemaSession>(
        &self,
        db: &mut S,
        spec: &TableSpec,
        report: &mut ApplyReport,
    ) -> Result<(), DbError> {
        let live = match db.table_exists(&spec.name).await {
            Ok(true) => match db.column_names(&spec.name).await {
                Ok(names) => Some(names),
                Err(e) => {
                    let e = absorb(e)?;
                    tracing::warn!("could not read columns of {}: {}", spec.name, e);
                    report.failed(BootstrapError::MetadataProbeFailed {
                        table: spec.name.clone(),
                        reason: e.to_string(),
                    });
                    return Ok(());
                }
            },
            Ok(false) => None,
            Err(e) => {
                let e = absorb(e)?;
                tracing::warn!("could not probe table {}: {}", spec.name, e);
                report.failed(BootstrapError::MetadataProbeFailed {
                    table: spec.name.clone(),
                    reason: e.to_string(),
                });
                return Ok(());
            }
        };

        let diff = SchemaDiff::compute(spec, live.as_deref());

        if diff.missing_table {
            match db.create_table(spec).await {
                Ok(()) => {
                    tracing::info!("created table {}", spec.name);
                    report.created(&spec.name);
                    return Ok(());
                }
                Err(e) if e.is_duplicate() => {
                    // A concurrent request won the create race. The statement
                    // is IF NOT EXISTS so this arm is for peers that are not,
                    // and the table is present either way.
                    tracing::debug!("table {} appeared concurrently", spec.name);
                    report.settle(&spec.name, TableState::UpToDate);
                    return Ok(());
                }
                Err(e) => {
                    let e = absorb(e)?;
                    tracing::warn!("create table {} failed: {}", spec.name, e);
                    report.failed(BootstrapError::TableCreateFailed {
                        table: spec.name.clone(),
                        reason: e.to_string(),
                    });
                    report.settle(&spec.name, TableState::CreateFailed);
                    return Ok(());
                }
            }
        }

        if diff.missing_columns.is_empty() {
            report.settle(&spec.name, TableState::UpToDate);
            return Ok(());
        }

        let mut added = 0usize;
        let mut failed = 0usize;
        for column in &diff.missing_columns {
            match db.add_column(&spec.name, column).await {
                Ok(()) => {
                    tracing::info!("added column {}.{}", spec.name, column.name);
                    report.column_added(&spec.name, &column.name);
                    added += 1;
                }
                Err(e) if e.is_duplicate() => {
                    // Lost the check-then-act race: another request added the
                    // column between our probe and this ALTER. Benign.
                    tracing::debug!(
                        "column {}.{} already added elsewhere",
                        spec.name,
                        column.name
                    );
                }
                Err(e) => {
                    let e = absorb(e)?;
                    tracing::warn!("add column {}.{} failed: {}", spec.name, column.name, e);
                    report.failed(BootstrapError::ColumnAddFailed {
                        table: spec.name.clone(),
                        column: column.name.clone(),
                        reason: e.to_string(),
                    });
                    failed += 1;
                }
            }
        }

        let state = if failed > 0 {
            TableState::PartiallyAltered
        } else if added > 0 {
            TableState::Altered
        } else {
            TableState::UpToDate
        };
        report.settle(&spec.name, state);
        Ok(())
    }

    async fn ensure_seed<S: SchemaSession>(
        &self,
        db: &mut S,
        seed: &SeedSpec,
        report: &mut ApplyReport,
    ) -> Result<(), DbError> {
        let count = match db.row_count(&seed.table).await {
            Ok(c) => c,
            Err(e) => {
                let e = absorb(e)?;
                tracing::warn!("could not count rows of {}: {}", seed.table, e);
                report.failed(BootstrapError::SeedInsertFailed {
                    table: seed.table.clone(),
                    reason: e.to_string(),
                });
                return Ok(());
            }
        };
        if count != 0 {
            tracing::debug!("table {} has {} rows, skipping seed", seed.table, count);
            return Ok(());
        }
        match db.insert_rows(seed).await {
            Ok(inserted) => {
                tracing::info!("seeded {} with {} rows", seed.table, inserted);
                report.seeded(&seed.table, inserted);
            }
            Err(e) => {
                let e = absorb(e)?;
                tracing::warn!("seeding {} failed: {}", seed.table, e);
                report.failed(BootstrapError::SeedInsertFailed {
                    table: seed.table.clone(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }
}
