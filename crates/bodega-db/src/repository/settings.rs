//! # Settings Repository
//!
//! One row per tenant. Missing rows are not an error; the store falls back
//! to its configured defaults.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use bodega_core::Settings;

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool, tenant_id: impl Into<String>) -> Self {
        SettingsRepository {
            pool,
            tenant_id: tenant_id.into(),
        }
    }

    pub async fn get(&self) -> DbResult<Option<Settings>> {
        let settings = sqlx::query_as::<_, Settings>(
            r#"
            SELECT tenant_id, inventory_method, payment_provider, payment_public_key
            FROM settings
            WHERE tenant_id = ?1
            "#,
        )
        .bind(&self.tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings)
    }

    /// The saved settings, read on the caller's transaction.
    pub async fn get_in(&self, conn: &mut SqliteConnection) -> DbResult<Option<Settings>> {
        let settings = sqlx::query_as::<_, Settings>(
            r#"
            SELECT tenant_id, inventory_method, payment_provider, payment_public_key
            FROM settings
            WHERE tenant_id = ?1
            "#,
        )
        .bind(&self.tenant_id)
        .fetch_optional(conn)
        .await?;

        Ok(settings)
    }

    /// Inserts or replaces the tenant's settings.
    pub async fn upsert(&self, conn: &mut SqliteConnection, settings: &Settings) -> DbResult<()> {
        debug!(
            tenant_id = %self.tenant_id,
            inventory_method = %settings.inventory_method,
            "Saving settings"
        );

        sqlx::query(
            r#"
            INSERT INTO settings (tenant_id, inventory_method, payment_provider, payment_public_key)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (tenant_id) DO UPDATE SET
                inventory_method = excluded.inventory_method,
                payment_provider = excluded.payment_provider,
                payment_public_key = excluded.payment_public_key
            "#,
        )
        .bind(&self.tenant_id)
        .bind(settings.inventory_method)
        .bind(&settings.payment_provider)
        .bind(&settings.payment_public_key)
        .execute(conn)
        .await?;

        Ok(())
    }
}
