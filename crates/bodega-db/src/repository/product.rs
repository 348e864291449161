//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Lookups by id and barcode (scanner input)
//! - Catalog listing
//! - Version-guarded updates
//!
//! ## Optimistic Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Guarded Product Write                                │
//! │                                                                         │
//! │  Sale A reads  COFFEE { stock: 5, version: 7 }                         │
//! │  Sale B reads  COFFEE { stock: 5, version: 7 }                         │
//! │                                                                         │
//! │  A commits:  UPDATE ... SET stock = 2, version = 8                     │
//! │              WHERE id = ? AND version = 7        → 1 row  ✓            │
//! │                                                                         │
//! │  B commits:  UPDATE ... SET stock = 2, version = 8                     │
//! │              WHERE id = ? AND version = 7        → 0 rows ✗            │
//! │              → DbError::Conflict, B's whole transaction rolls back     │
//! │                                                                         │
//! │  Final stock is 2, never the lost update 5 - 3 - 3 applied once.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads go through the pool. Writes take a connection so the caller can
//! run them inside its transaction.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use bodega_core::Product;

const PRODUCT_COLUMNS: &str = r#"
    id, tenant_id, sku, barcode, name, description, category,
    sale_price_cents, purchase_price_cents, stock, stock_value_cents,
    min_stock_threshold, max_stock_threshold, expiration_date,
    is_active, created_at, updated_at, version
"#;

/// Repository for product database operations, scoped to one tenant.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, tenant_id: impl Into<String>) -> Self {
        ProductRepository {
            pool,
            tenant_id: tenant_id.into(),
        }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found (or owned by another tenant)
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND tenant_id = ?2"
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(&self.tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets an active product by its barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        debug!(barcode = %barcode, "Looking up product by barcode");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE barcode = ?1 AND tenant_id = ?2 AND is_active = 1
             ORDER BY created_at
             LIMIT 1"
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode.trim())
            .bind(&self.tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists every product of the tenant, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = ?1 ORDER BY name, id"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&self.tenant_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE tenant_id = ?1 AND is_active = 1")
                .bind(&self.tenant_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Inserts a new product.
    ///
    /// The product's `tenant_id` must match this repository's tenant.
    pub async fn insert(&self, conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, barcode, name, description, category,
                sale_price_cents, purchase_price_cents, stock, stock_value_cents,
                min_stock_threshold, max_stock_threshold, expiration_date,
                is_active, created_at, updated_at, version
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11,
                ?12, ?13, ?14,
                ?15, ?16, ?17, ?18
            )
            "#,
        )
        .bind(&product.id)
        .bind(&self.tenant_id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.sale_price_cents)
        .bind(product.purchase_price_cents)
        .bind(product.stock)
        .bind(product.stock_value_cents)
        .bind(product.min_stock_threshold)
        .bind(product.max_stock_threshold)
        .bind(product.expiration_date)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.version)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Writes every mutable column of a product if its stored version is
    /// still `expected_version`, bumping the version by one.
    ///
    /// ## Returns
    /// * `Ok(true)` - Row updated
    /// * `Ok(false)` - Row missing or changed since it was read
    pub async fn update_guarded(
        &self,
        conn: &mut SqliteConnection,
        product: &Product,
        expected_version: i64,
    ) -> DbResult<bool> {
        debug!(id = %product.id, expected_version, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?3,
                barcode = ?4,
                name = ?5,
                description = ?6,
                category = ?7,
                sale_price_cents = ?8,
                purchase_price_cents = ?9,
                stock = ?10,
                stock_value_cents = ?11,
                min_stock_threshold = ?12,
                max_stock_threshold = ?13,
                expiration_date = ?14,
                is_active = ?15,
                updated_at = ?16,
                version = version + 1
            WHERE id = ?1 AND tenant_id = ?2 AND version = ?17
            "#,
        )
        .bind(&product.id)
        .bind(&self.tenant_id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.sale_price_cents)
        .bind(product.purchase_price_cents)
        .bind(product.stock)
        .bind(product.stock_value_cents)
        .bind(product.min_stock_threshold)
        .bind(product.max_stock_threshold)
        .bind(product.expiration_date)
        .bind(product.is_active)
        .bind(product.updated_at)
        .bind(expected_version)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
