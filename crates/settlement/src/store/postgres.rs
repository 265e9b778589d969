//! PostgreSQL settlement stores

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::Row;

use common::TransactionId;

use crate::error::{Result, SettlementError};
use crate::idempotency::IdempotencyRecord;
use crate::store::traits::{IdempotencyStore, TransactionStore};
use crate::types::Transaction;

/// Schema applied by [`PostgresTransactionStore::ensure_schema`]
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS settlement_transactions (
    transaction_id UUID PRIMARY KEY,
    version BIGINT NOT NULL,
    status TEXT NOT NULL,
    document JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);
CREATE TABLE IF NOT EXISTS settlement_idempotency_keys (
    transaction_id UUID NOT NULL,
    idempotency_key TEXT NOT NULL,
    document JSONB NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (transaction_id, idempotency_key)
)
"#;

fn storage(e: sqlx::Error) -> SettlementError {
    SettlementError::Storage(e.to_string())
}

fn to_version(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|_| SettlementError::Storage(format!("version {} out of range", version)))
}

fn decode_transaction(row: &PgRow) -> Result<Transaction> {
    row.try_get::<Json<Transaction>, _>("document")
        .map(|Json(tx)| tx)
        .map_err(storage)
}

/// PostgreSQL deal store
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create both settlement tables if missing
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn insert(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settlement_transactions (transaction_id, version, status, document, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*transaction.id.as_uuid())
        .bind(to_version(transaction.version)?)
        .bind(transaction.status.as_str())
        .bind(Json(transaction))
        .bind(transaction.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query("SELECT document FROM settlement_transactions WHERE transaction_id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.as_ref().map(decode_transaction).transpose()
    }

    async fn list(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query("SELECT document FROM settlement_transactions ORDER BY created_at, transaction_id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        rows.iter().map(decode_transaction).collect()
    }

    async fn compare_and_swap(&self, transaction: &Transaction, expected_version: u64) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE settlement_transactions
            SET version = $2, status = $3, document = $4
            WHERE transaction_id = $1 AND version = $5
            "#,
        )
        .bind(*transaction.id.as_uuid())
        .bind(to_version(transaction.version)?)
        .bind(transaction.status.as_str())
        .bind(Json(transaction))
        .bind(to_version(expected_version)?)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.get(transaction.id).await? {
            Some(stored) => Err(SettlementError::Conflict {
                transaction_id: transaction.id,
                expected: expected_version,
                actual: stored.version,
            }),
            None => Err(SettlementError::NotFound(transaction.id)),
        }
    }
}

/// PostgreSQL idempotency store
pub struct PostgresIdempotencyStore {
    pool: PgPool,
}

impl PostgresIdempotencyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdempotencyStore for PostgresIdempotencyStore {
    async fn get(&self, transaction_id: TransactionId, key: &str) -> Result<Option<IdempotencyRecord>> {
        let row = sqlx::query(
            r#"
            SELECT document FROM settlement_idempotency_keys
            WHERE transaction_id = $1 AND idempotency_key = $2
            "#,
        )
        .bind(*transaction_id.as_uuid())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(row) => {
                let Json(record): Json<IdempotencyRecord> = row.try_get("document").map_err(storage)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn record(&self, record: &IdempotencyRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settlement_idempotency_keys (transaction_id, idempotency_key, document, recorded_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (transaction_id, idempotency_key) DO NOTHING
            "#,
        )
        .bind(*record.transaction_id.as_uuid())
        .bind(&record.key)
        .bind(Json(record))
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }
}
