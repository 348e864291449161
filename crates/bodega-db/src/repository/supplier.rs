//! # Supplier Repository

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use bodega_core::Supplier;

/// Repository for suppliers, scoped to one tenant.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool, tenant_id: impl Into<String>) -> Self {
        SupplierRepository {
            pool,
            tenant_id: tenant_id.into(),
        }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, tenant_id, name, contact_name, email, phone, created_at
            FROM suppliers
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(&self.tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    /// Suppliers sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, tenant_id, name, contact_name, email, phone, created_at
            FROM suppliers
            WHERE tenant_id = ?1
            ORDER BY name, id
            "#,
        )
        .bind(&self.tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, supplier: &Supplier) -> DbResult<()> {
        debug!(id = %supplier.id, name = %supplier.name, "Inserting supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, tenant_id, name, contact_name, email, phone, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&supplier.id)
        .bind(&self.tenant_id)
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(supplier.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }
}
