//! # Movement Repository
//!
//! The append-only stock ledger. There is no update or delete here, and
//! triggers reject both at the database level.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use bodega_core::Movement;

const MOVEMENT_COLUMNS: &str = r#"
    id, tenant_id, product_id, product_name, occurred_at, movement_type, quantity,
    net_amount_cents, iva_amount_cents, total_amount_cents, cost_of_goods_sold_cents,
    payment_method, reference_id, notes
"#;

/// Repository for ledger movements, scoped to one tenant.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool, tenant_id: impl Into<String>) -> Self {
        MovementRepository {
            pool,
            tenant_id: tenant_id.into(),
        }
    }

    /// Movements with `from <= occurred_at < to`, oldest first.
    pub async fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<Movement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements
             WHERE tenant_id = ?1 AND occurred_at >= ?2 AND occurred_at < ?3
             ORDER BY occurred_at, rowid"
        );

        let movements = sqlx::query_as::<_, Movement>(&sql)
            .bind(&self.tenant_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        debug!(%from, %to, count = movements.len(), "Loaded movements for range");
        Ok(movements)
    }

    /// Every movement of one product, oldest first.
    pub async fn for_product(&self, product_id: &str) -> DbResult<Vec<Movement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements
             WHERE tenant_id = ?1 AND product_id = ?2
             ORDER BY occurred_at, rowid"
        );

        let movements = sqlx::query_as::<_, Movement>(&sql)
            .bind(&self.tenant_id)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Appends a movement.
    pub async fn insert(&self, conn: &mut SqliteConnection, movement: &Movement) -> DbResult<()> {
        debug!(
            id = %movement.id,
            product_id = %movement.product_id,
            movement_type = ?movement.movement_type,
            quantity = movement.quantity,
            "Appending movement"
        );

        sqlx::query(
            r#"
            INSERT INTO movements (
                id, tenant_id, product_id, product_name, occurred_at, movement_type, quantity,
                net_amount_cents, iva_amount_cents, total_amount_cents, cost_of_goods_sold_cents,
                payment_method, reference_id, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&movement.id)
        .bind(&self.tenant_id)
        .bind(&movement.product_id)
        .bind(&movement.product_name)
        .bind(movement.occurred_at)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(movement.net_amount_cents)
        .bind(movement.iva_amount_cents)
        .bind(movement.total_amount_cents)
        .bind(movement.cost_of_goods_sold_cents)
        .bind(movement.payment_method)
        .bind(&movement.reference_id)
        .bind(&movement.notes)
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::ProductRepository;
    use crate::{Database, DbConfig, DbError};
    use bodega_core::{MovementType, PaymentMethod, Product};
    use chrono::TimeZone;

    async fn setup() -> (Database, MovementRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let product = Product {
            id: "p-1".to_string(),
            tenant_id: "t-1".to_string(),
            sku: None,
            barcode: None,
            name: "Bread".to_string(),
            description: None,
            category: None,
            sale_price_cents: 100,
            purchase_price_cents: 60,
            stock: 0,
            stock_value_cents: 0,
            min_stock_threshold: 5,
            max_stock_threshold: 100,
            expiration_date: None,
            is_active: true,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        let mut conn = db.pool().acquire().await.unwrap();
        ProductRepository::new(db.pool().clone(), "t-1")
            .insert(&mut conn, &product)
            .await
            .unwrap();
        drop(conn);
        let repo = MovementRepository::new(db.pool().clone(), "t-1");
        (db, repo)
    }

    fn movement(id: &str, at: DateTime<Utc>, quantity: i64) -> Movement {
        Movement {
            id: id.to_string(),
            tenant_id: "t-1".to_string(),
            product_id: "p-1".to_string(),
            product_name: "Bread".to_string(),
            occurred_at: at,
            movement_type: if quantity < 0 {
                MovementType::Sale
            } else {
                MovementType::PurchaseEntry
            },
            quantity,
            net_amount_cents: Some(1000),
            iva_amount_cents: Some(190),
            total_amount_cents: Some(1190),
            cost_of_goods_sold_cents: (quantity < 0).then_some(600),
            payment_method: (quantity < 0).then_some(PaymentMethod::MercadoPago),
            reference_id: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_between_is_half_open() {
        let (db, repo) = setup().await;
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        repo.insert(&mut conn, &movement("m-before", start - chrono::Duration::seconds(1), 10))
            .await
            .unwrap();
        repo.insert(&mut conn, &movement("m-start", start, 10)).await.unwrap();
        repo.insert(&mut conn, &movement("m-mid", start + chrono::Duration::days(3), -2))
            .await
            .unwrap();
        repo.insert(&mut conn, &movement("m-end", end, 5)).await.unwrap();
        drop(conn);

        let ids: Vec<String> = repo
            .between(start, end)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["m-start", "m-mid"]);
    }

    #[tokio::test]
    async fn test_round_trips_enums_and_options() {
        let (db, repo) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let m = movement("m-1", Utc::now(), -2);
        repo.insert(&mut conn, &m).await.unwrap();
        drop(conn);

        let stored = repo.for_product("p-1").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].movement_type, MovementType::Sale);
        assert_eq!(stored[0].payment_method, Some(PaymentMethod::MercadoPago));
        assert_eq!(stored[0].cost_of_goods_sold_cents, Some(600));
        assert!(stored[0].reference_id.is_none());
    }

    #[tokio::test]
    async fn test_movements_are_append_only() {
        let (db, repo) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        repo.insert(&mut conn, &movement("m-1", Utc::now(), 3)).await.unwrap();

        let update = sqlx::query("UPDATE movements SET quantity = 4 WHERE id = 'm-1'")
            .execute(&mut *conn)
            .await
            .map_err(DbError::from);
        assert!(matches!(update, Err(DbError::QueryFailed(_))));

        let delete = sqlx::query("DELETE FROM movements WHERE id = 'm-1'")
            .execute(&mut *conn)
            .await
            .map_err(DbError::from);
        assert!(matches!(delete, Err(DbError::QueryFailed(_))));
    }
}
