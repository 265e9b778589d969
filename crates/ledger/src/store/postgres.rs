//! PostgreSQL ledger store
//!
//! Division orders are stored as JSONB documents next to a `version`
//! column; the compare-and-swap is a single conditional UPDATE.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::Row;

use common::DivisionOrderId;

use crate::error::{LedgerError, Result};
use crate::store::traits::LedgerStore;
use crate::types::DivisionOrder;

/// Schema applied by [`PostgresLedgerStore::ensure_schema`]
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS division_orders (
    division_order_id UUID PRIMARY KEY,
    version BIGINT NOT NULL,
    document JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)
"#;

/// PostgreSQL ledger store
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table if missing
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }
}

fn storage(e: sqlx::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

fn to_version(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|_| LedgerError::Storage(format!("version {} out of range", version)))
}

fn from_version(version: i64) -> Result<u64> {
    u64::try_from(version).map_err(|_| LedgerError::Storage(format!("stored version {} is negative", version)))
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn insert(&self, order: &DivisionOrder) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO division_orders (division_order_id, version, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*order.id.as_uuid())
        .bind(to_version(order.version)?)
        .bind(Json(order))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn get(&self, id: DivisionOrderId) -> Result<Option<DivisionOrder>> {
        let row = sqlx::query("SELECT document FROM division_orders WHERE division_order_id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        match row {
            Some(row) => {
                let Json(order): Json<DivisionOrder> = row.try_get("document").map_err(storage)?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<DivisionOrder>> {
        let rows = sqlx::query("SELECT document FROM division_orders ORDER BY created_at, division_order_id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        rows.iter()
            .map(|row| {
                row.try_get::<Json<DivisionOrder>, _>("document")
                    .map(|Json(order)| order)
                    .map_err(storage)
            })
            .collect()
    }

    async fn compare_and_swap(&self, order: &DivisionOrder, expected_version: u64) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE division_orders
            SET version = $2, document = $3, updated_at = $4
            WHERE division_order_id = $1 AND version = $5
            "#,
        )
        .bind(*order.id.as_uuid())
        .bind(to_version(order.version)?)
        .bind(Json(order))
        .bind(order.updated_at)
        .bind(to_version(expected_version)?)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let row = sqlx::query("SELECT version FROM division_orders WHERE division_order_id = $1")
            .bind(*order.id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        match row {
            Some(row) => {
                let actual: i64 = row.try_get("version").map_err(storage)?;
                Err(LedgerError::Conflict {
                    division_order_id: order.id,
                    expected: expected_version,
                    actual: from_version(actual)?,
                })
            }
            None => Err(LedgerError::NotFound(order.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_version_column_conversions() {
        assert_eq!(to_version(7), Ok(7));
        assert_eq!(from_version(7), Ok(7));
        assert_matches!(to_version(u64::MAX), Err(LedgerError::Storage(_)));
        assert_matches!(from_version(-1), Err(LedgerError::Storage(msg)) if msg.contains("negative"));
    }
}
