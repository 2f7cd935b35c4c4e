use serde::Serialize;
use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

// MySQL server error numbers the apply layer cares about.
const ER_TABLE_EXISTS: u16 = 1050;
const ER_DUP_FIELDNAME: u16 = 1060;
const ER_DBACCESS_DENIED: u16 = 1044;
const ER_TABLEACCESS_DENIED: u16 = 1142;
const ER_SPECIFIC_ACCESS_DENIED: u16 = 1227;

/// Driver-level failure, classified so the apply layer can decide policy
/// (swallow, record, or propagate) without matching on error messages.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{object} already exists")]
    Duplicate { object: String },

    #[error("permission denied: {message}")]
    Denied { message: String },

    #[error("database connection failure")]
    Connection(#[source] sqlx::Error),

    #[error("query failed: {message}")]
    Query { message: String },
}

impl DbError {
    /// Connection loss is the one failure no bootstrap policy can absorb.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DbError::Connection(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, DbError::Duplicate { .. })
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) => {
                let number = db
                    .try_downcast_ref::<MySqlDatabaseError>()
                    .map(|my| my.number());
                match number {
                    Some(ER_TABLE_EXISTS) | Some(ER_DUP_FIELDNAME) => DbError::Duplicate {
                        object: db.message().to_string(),
                    },
                    Some(ER_DBACCESS_DENIED)
                    | Some(ER_TABLEACCESS_DENIED)
                    | Some(ER_SPECIFIC_ACCESS_DENIED) => DbError::Denied {
                        message: db.message().to_string(),
                    },
                    _ => DbError::Query {
                        message: db.message().to_string(),
                    },
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DbError::Connection(e),
            _ => DbError::Query {
                message: e.to_string(),
            },
        }
    }
}

/// Non-fatal bootstrap failures. These are collected into the report and
/// never thrown: a partially migrated schema keeps the page rendering, and
/// queries against a still-missing table fail on their own later.
#[derive(Debug, Clone, Error, Serialize)]
pub enum BootstrapError {
    #[error("failed to create table {table}: {reason}")]
    TableCreateFailed { table: String, reason: String },

    #[error("failed to add column {table}.{column}: {reason}")]
    ColumnAddFailed {
        table: String,
        column: String,
        reason: String,
    },

    #[error("failed to seed table {table}: {reason}")]
    SeedInsertFailed { table: String, reason: String },

    #[error("failed to read metadata for {table}: {reason}")]
    MetadataProbeFailed { table: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_is_not_fatal() {
        let e = DbError::Duplicate {
            object: "Duplicate column name 'status'".to_string(),
        };
        assert!(e.is_duplicate());
        assert!(!e.is_fatal());
    }

    // The classification match relies on these constants having the exact
    // width the driver reports.
    #[test]
    fn test_error_numbers_use_driver_width() {
        let _: fn(&MySqlDatabaseError) -> u16 = MySqlDatabaseError::number;
        let _: [u16; 5] = [
            ER_TABLE_EXISTS,
            ER_DUP_FIELDNAME,
            ER_DBACCESS_DENIED,
            ER_TABLEACCESS_DENIED,
            ER_SPECIFIC_ACCESS_DENIED,
        ];
    }

    #[test]
    fn test_pool_timeout_maps_to_connection() {
        let e = DbError::from(sqlx::Error::PoolTimedOut);
        assert!(e.is_fatal());
    }

    #[test]
    fn test_row_not_found_maps_to_query() {
        let e = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(e, DbError::Query { .. }));
        assert!(!e.is_fatal());
    }
}
