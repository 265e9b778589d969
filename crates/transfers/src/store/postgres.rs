//! PostgreSQL transfer store

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::Row;

use common::{DivisionOrderId, TransferId};

use crate::error::{Result, TransferError};
use crate::store::traits::TransferStore;
use crate::types::{OwnershipTransfer, TransferStatus};

/// Schema applied by [`PostgresTransferStore::ensure_schema`]
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ownership_transfers (
    transfer_id UUID PRIMARY KEY,
    division_order_id UUID NOT NULL,
    status TEXT NOT NULL,
    document JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS ownership_transfers_division_order_idx
    ON ownership_transfers (division_order_id, created_at)
"#;

/// PostgreSQL transfer store
pub struct PostgresTransferStore {
    pool: PgPool,
}

impl PostgresTransferStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table if missing
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }
}

fn storage(e: sqlx::Error) -> TransferError {
    TransferError::Storage(e.to_string())
}

fn decode(row: &sqlx::postgres::PgRow) -> Result<OwnershipTransfer> {
    row.try_get::<Json<OwnershipTransfer>, _>("document")
        .map(|Json(transfer)| transfer)
        .map_err(storage)
}

#[async_trait]
impl TransferStore for PostgresTransferStore {
    async fn insert(&self, transfer: &OwnershipTransfer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ownership_transfers (transfer_id, division_order_id, status, document, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*transfer.id.as_uuid())
        .bind(*transfer.division_order_id.as_uuid())
        .bind(transfer.status.as_str())
        .bind(Json(transfer))
        .bind(transfer.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn get(&self, id: TransferId) -> Result<Option<OwnershipTransfer>> {
        let row = sqlx::query("SELECT document FROM ownership_transfers WHERE transfer_id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.as_ref().map(decode).transpose()
    }

    async fn list(
        &self,
        division_order_id: Option<DivisionOrderId>,
        status: Option<TransferStatus>,
    ) -> Result<Vec<OwnershipTransfer>> {
        let rows = sqlx::query(
            r#"
            SELECT document FROM ownership_transfers
            WHERE ($1::uuid IS NULL OR division_order_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at, transfer_id
            "#,
        )
        .bind(division_order_id.map(|id| *id.as_uuid()))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(decode).collect()
    }

    async fn compare_and_set(&self, transfer: &OwnershipTransfer, expected: TransferStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE ownership_transfers
            SET status = $2, document = $3
            WHERE transfer_id = $1 AND status = $4
            "#,
        )
        .bind(*transfer.id.as_uuid())
        .bind(transfer.status.as_str())
        .bind(Json(transfer))
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.get(transfer.id).await? {
            Some(stored) => Err(TransferError::StatusConflict {
                transfer_id: transfer.id,
                expected,
                actual: stored.status,
            }),
            None => Err(TransferError::NotFound(transfer.id)),
        }
    }
}
