#![allow(async_fn_in_trait)]

use sqlx::mysql::MySqlArguments;
use sqlx::{MySql, MySqlPool};

use crate::ddl;
use crate::errors::DbError;
use crate::spec::{ColumnSpec, SeedSpec, SeedValue, TableSpec};

/// The bootstrapper's one seam onto a live database. Expressed in domain
/// terms rather than raw SQL so test doubles need no statement parsing; the
/// MySQL implementation renders DDL through `ddl` internally.
pub trait SchemaSession {
    async fn table_exists(&mut self, table: &str) -> Result<bool, DbError>;

    async fn column_names(&mut self, table: &str) -> Result<Vec<String>, DbError>;

    async fn create_table(&mut self, spec: &TableSpec) -> Result<(), DbError>;

    async fn add_column(&mut self, table: &str, column: &ColumnSpec) -> Result<(), DbError>;

    async fn row_count(&mut self, table: &str) -> Result<i64, DbError>;

    /// Insert every seed row as one batch. Implementations must make the
    /// batch atomic so a crash mid-seed leaves zero or all rows.
    async fn insert_rows(&mut self, seed: &SeedSpec) -> Result<u64, DbError>;
}

pub struct MySqlSession<'a> {
    pool: &'a MySqlPool,
}

impl<'a> MySqlSession<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }
}

fn bind_seed_value<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    value: &SeedValue,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match value {
        SeedValue::Null => query.bind(None::<String>),
        SeedValue::Int(v) => query.bind(*v),
        SeedValue::Float(v) => query.bind(*v),
        SeedValue::Text(v) => query.bind(v.clone()),
        SeedValue::Date(v) => query.bind(*v),
    }
}

impl SchemaSession for MySqlSession<'_> {
    async fn table_exists(&mut self, table: &str) -> Result<bool, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name = ?",
        )
        .bind(table)
        .fetch_one(self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(count > 0)
    }

    async fn column_names(&mut self, table: &str) -> Result<Vec<String>, DbError> {
        sqlx::query_scalar(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ? \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(self.pool)
        .await
        .map_err(DbError::from)
    }

    async fn create_table(&mut self, spec: &TableSpec) -> Result<(), DbError> {
        let sql = ddl::create_table(spec);
        sqlx::query(&sql)
            .execute(self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn add_column(&mut self, table: &str, column: &ColumnSpec) -> Result<(), DbError> {
        let sql = ddl::add_column(table, column);
        sqlx::query(&sql)
            .execute(self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn row_count(&mut self, table: &str) -> Result<i64, DbError> {
        // Identifier comes from an in-process declaration, not user input.
        let sql = format!("SELECT COUNT(*) FROM {}", ddl::quote_ident(table));
        sqlx::query_scalar(&sql)
            .fetch_one(self.pool)
            .await
            .map_err(DbError::from)
    }

    async fn insert_rows(&mut self, seed: &SeedSpec) -> Result<u64, DbError> {
        if seed.rows.is_empty() {
            return Ok(0);
        }
        let columns = seed
            .columns
            .iter()
            .map(|c| ddl::quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let row_marks = format!("({})", vec!["?"; seed.columns.len()].join(", "));
        let values = vec![row_marks; seed.rows.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            ddl::quote_ident(&seed.table),
            columns,
            values,
        );

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let mut query = sqlx::query(&sql);
        for row in &seed.rows {
            for value in row {
                query = bind_seed_value(query, value);
            }
        }
        let result = query.execute(&mut *tx).await.map_err(DbError::from)?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SeedValue;
    use sqlx::Execute;

    // The built query borrows from the statement text, never from the seed
    // values, which are dropped as each row is bound.
    #[test]
    fn test_bound_query_outlives_seed_values() {
        let sql = "INSERT INTO `t` (`a`, `b`, `c`) VALUES (?, ?, ?)".to_string();
        let mut query = sqlx::query(&sql);
        for value in [
            SeedValue::Int(1),
            SeedValue::Text("x".to_string()),
            SeedValue::Null,
        ] {
            query = bind_seed_value(query, &value);
        }
        assert_eq!(query.sql(), sql);
    }
}
