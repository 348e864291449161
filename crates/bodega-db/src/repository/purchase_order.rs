//! # Purchase Order Repository
//!
//! Orders are stored as one row with their lines in a JSON `items` column.
//!
//! ```text
//! ┌──────────────────────────── purchase_orders ─────────────────────────────┐
//! │ id │ supplier_id │ supplier_name │ status  │ items (JSON)         │ ...   │
//! │ po │ s-1         │ Agrícola      │ pending │ [{product_id, name,  │       │
//! │    │             │               │         │   quantity, unit_..}]│       │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `status` only moves from `pending` to `received`, through a guarded
//! update.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bodega_core::{PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus};

/// Stored shape of a purchase order.
#[derive(Debug, sqlx::FromRow)]
struct PurchaseOrderRow {
    id: String,
    tenant_id: String,
    supplier_id: String,
    supplier_name: String,
    status: PurchaseOrderStatus,
    items: String,
    total_amount_cents: i64,
    created_at: DateTime<Utc>,
    received_at: Option<DateTime<Utc>>,
}

impl TryFrom<PurchaseOrderRow> for PurchaseOrder {
    type Error = DbError;

    fn try_from(row: PurchaseOrderRow) -> Result<Self, Self::Error> {
        let items: Vec<PurchaseOrderItem> = serde_json::from_str(&row.items)
            .map_err(|e| DbError::corrupt("PurchaseOrder", &row.id, e))?;

        Ok(PurchaseOrder {
            id: row.id,
            tenant_id: row.tenant_id,
            supplier_id: row.supplier_id,
            supplier_name: row.supplier_name,
            status: row.status,
            items,
            total_amount_cents: row.total_amount_cents,
            created_at: row.created_at,
            received_at: row.received_at,
        })
    }
}

/// Repository for purchase orders, scoped to one tenant.
#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl PurchaseOrderRepository {
    /// Creates a new PurchaseOrderRepository.
    pub fn new(pool: SqlitePool, tenant_id: impl Into<String>) -> Self {
        PurchaseOrderRepository {
            pool,
            tenant_id: tenant_id.into(),
        }
    }

    /// Gets an order by ID.
    ///
    /// ## Returns
    /// * `Ok(None)` - No such order for this tenant
    /// * `Err(DbError::Corrupt)` - Stored items are not valid JSON lines
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PurchaseOrder>> {
        let row = sqlx::query_as::<_, PurchaseOrderRow>(
            r#"
            SELECT id, tenant_id, supplier_id, supplier_name, status, items,
                   total_amount_cents, created_at, received_at
            FROM purchase_orders
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(&self.tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PurchaseOrder::try_from).transpose()
    }

    /// Orders, newest first.
    pub async fn list(&self) -> DbResult<Vec<PurchaseOrder>> {
        let rows = sqlx::query_as::<_, PurchaseOrderRow>(
            r#"
            SELECT id, tenant_id, supplier_id, supplier_name, status, items,
                   total_amount_cents, created_at, received_at
            FROM purchase_orders
            WHERE tenant_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(&self.tenant_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Listed purchase orders");
        rows.into_iter().map(PurchaseOrder::try_from).collect()
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, order: &PurchaseOrder) -> DbResult<()> {
        debug!(
            id = %order.id,
            supplier_id = %order.supplier_id,
            lines = order.items.len(),
            "Inserting purchase order"
        );

        let items = serde_json::to_string(&order.items)
            .map_err(|e| DbError::Internal(format!("encoding purchase order items: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, tenant_id, supplier_id, supplier_name, status, items,
                total_amount_cents, created_at, received_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&order.id)
        .bind(&self.tenant_id)
        .bind(&order.supplier_id)
        .bind(&order.supplier_name)
        .bind(order.status)
        .bind(items)
        .bind(order.total_amount_cents)
        .bind(order.created_at)
        .bind(order.received_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Moves a pending order to received.
    ///
    /// Returns `false` if the order is missing or no longer pending.
    pub async fn mark_received(
        &self,
        conn: &mut SqliteConnection,
        order_id: &str,
        received_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %order_id, "Marking purchase order received");

        let result = sqlx::query(
            r#"
            UPDATE purchase_orders SET status = 'received', received_at = ?3
            WHERE id = ?1 AND tenant_id = ?2 AND status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(&self.tenant_id)
        .bind(received_at)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::supplier::SupplierRepository;
    use crate::{Database, DbConfig};
    use bodega_core::Supplier;

    async fn setup() -> (Database, PurchaseOrderRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let supplier = Supplier {
            id: "s-1".to_string(),
            tenant_id: "t-1".to_string(),
            name: "Agrícola Norte".to_string(),
            contact_name: None,
            email: None,
            phone: None,
            created_at: Utc::now(),
        };
        let mut conn = db.pool().acquire().await.unwrap();
        SupplierRepository::new(db.pool().clone(), "t-1")
            .insert(&mut conn, &supplier)
            .await
            .unwrap();
        drop(conn);
        let repo = PurchaseOrderRepository::new(db.pool().clone(), "t-1");
        (db, repo)
    }

    fn order(id: &str, created_at: DateTime<Utc>) -> PurchaseOrder {
        PurchaseOrder {
            id: id.to_string(),
            tenant_id: "t-1".to_string(),
            supplier_id: "s-1".to_string(),
            supplier_name: "Agrícola Norte".to_string(),
            status: PurchaseOrderStatus::Pending,
            items: vec![PurchaseOrderItem {
                product_id: "p-1".to_string(),
                name: "Apples 1kg".to_string(),
                quantity: 12,
                unit_cost_cents: 250,
            }],
            total_amount_cents: 3000,
            created_at,
            received_at: None,
        }
    }

    #[tokio::test]
    async fn test_items_round_trip_as_json() {
        let (db, repo) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        repo.insert(&mut conn, &order("po-1", Utc::now())).await.unwrap();
        drop(conn);

        let stored = repo.get_by_id("po-1").await.unwrap().unwrap();
        assert!(stored.is_pending());
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].name, "Apples 1kg");
        assert_eq!(stored.items[0].line_total().cents(), 3000);
    }

    #[tokio::test]
    async fn test_mark_received_only_once() {
        let (db, repo) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        repo.insert(&mut conn, &order("po-1", Utc::now())).await.unwrap();

        assert!(repo.mark_received(&mut conn, "po-1", Utc::now()).await.unwrap());
        assert!(!repo.mark_received(&mut conn, "po-1", Utc::now()).await.unwrap());
        drop(conn);

        let stored = repo.get_by_id("po-1").await.unwrap().unwrap();
        assert_eq!(stored.status, PurchaseOrderStatus::Received);
        assert!(stored.received_at.is_some());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (db, repo) = setup().await;
        let earlier = Utc::now() - chrono::Duration::days(2);
        let mut conn = db.pool().acquire().await.unwrap();
        repo.insert(&mut conn, &order("po-old", earlier)).await.unwrap();
        repo.insert(&mut conn, &order("po-new", Utc::now())).await.unwrap();
        drop(conn);

        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec!["po-new", "po-old"]);
    }

    #[tokio::test]
    async fn test_corrupt_items_reported() {
        let (db, repo) = setup().await;
        sqlx::query(
            r#"
            INSERT INTO purchase_orders (id, tenant_id, supplier_id, supplier_name, status,
                                         items, total_amount_cents, created_at)
            VALUES ('po-bad', 't-1', 's-1', 'Agrícola Norte', 'pending', 'not json', 0, ?1)
            "#,
        )
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();

        let err = repo.get_by_id("po-bad").await.unwrap_err();
        assert!(matches!(err, DbError::Corrupt { ref id, .. } if id == "po-bad"));
    }
}
