//! # Batch Repository
//!
//! FIFO purchase lots. Rows are inserted once and afterwards only their
//! `remaining_quantity` goes down; a trigger forbids deletes so exhausted
//! lots stay for audit.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use bodega_core::Batch;

/// Repository for FIFO lots, scoped to one tenant.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool, tenant_id: impl Into<String>) -> Self {
        BatchRepository {
            pool,
            tenant_id: tenant_id.into(),
        }
    }

    /// Lots of a product in consumption order (purchase date, then sequence).
    ///
    /// Exhausted lots are included.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(
            r#"
            SELECT id, product_id, sequence, purchase_date,
                   initial_quantity, remaining_quantity, unit_cost_cents, created_at
            FROM batches
            WHERE product_id = ?1 AND tenant_id = ?2
            ORDER BY purchase_date, sequence, id
            "#,
        )
        .bind(product_id)
        .bind(&self.tenant_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(product_id = %product_id, count = batches.len(), "Loaded lots");
        Ok(batches)
    }

    /// Inserts a new lot.
    pub async fn insert(&self, conn: &mut SqliteConnection, batch: &Batch) -> DbResult<()> {
        debug!(
            id = %batch.id,
            product_id = %batch.product_id,
            sequence = batch.sequence,
            quantity = batch.initial_quantity,
            "Inserting lot"
        );

        sqlx::query(
            r#"
            INSERT INTO batches (
                id, tenant_id, product_id, sequence, purchase_date,
                initial_quantity, remaining_quantity, unit_cost_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&batch.id)
        .bind(&self.tenant_id)
        .bind(&batch.product_id)
        .bind(batch.sequence)
        .bind(batch.purchase_date)
        .bind(batch.initial_quantity)
        .bind(batch.remaining_quantity)
        .bind(batch.unit_cost_cents)
        .bind(batch.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Lowers a lot's remainder if it still holds `expected_remaining`.
    ///
    /// Returns `false` when the lot is missing, changed since it was read,
    /// or `remaining` would increase it.
    pub async fn update_remaining_guarded(
        &self,
        conn: &mut SqliteConnection,
        batch_id: &str,
        product_id: &str,
        remaining: i64,
        expected_remaining: i64,
    ) -> DbResult<bool> {
        debug!(
            id = %batch_id,
            remaining,
            expected_remaining,
            "Updating lot remainder"
        );

        let result = sqlx::query(
            r#"
            UPDATE batches SET remaining_quantity = ?4
            WHERE id = ?1 AND product_id = ?2 AND tenant_id = ?3
              AND remaining_quantity = ?5
              AND ?4 <= remaining_quantity
            "#,
        )
        .bind(batch_id)
        .bind(product_id)
        .bind(&self.tenant_id)
        .bind(remaining)
        .bind(expected_remaining)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
