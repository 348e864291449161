//! # Ledger Store
//!
//! The storage capability the stock mutation service is built on: reads,
//! one all-or-nothing write call, and a stream of committed changes.
//!
//! ## Read, Compute, Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. READ     read_product(id)      → Product { version: 7, .. }        │
//! │              read_batches(id)      → [Batch { remaining: 5, .. }, ..]  │
//! │                                                                         │
//! │  2. COMPUTE  costing engine, movement recorder (no I/O)                │
//! │                                                                         │
//! │  3. COMMIT   run_atomic(vec![                                           │
//! │                UpdateProduct { expected_version: 7, .. },  ← guard     │
//! │                UpdateBatch { expected_remaining: 5, .. },  ← guard     │
//! │                InsertMovement(..),                                      │
//! │              ])                                                         │
//! │              │                                                          │
//! │              ├── every guard matched → COMMIT → ChangeSet published    │
//! │              └── any guard missed    → ROLLBACK → DbError::Conflict    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The version guard on a product also covers its lots: a lot is only ever
//! written in the same transaction as a guarded write of its product.
//! `AssertMethod` guards the costing method the write-set was computed
//! under; `AssertSettings` guards a whole settings row before it is
//! rewritten.
//!
//! A store handle is bound to one tenant. Every query filters on that
//! tenant and writes carrying another tenant's rows are refused.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use bodega_core::{
    Batch, InventoryMethod, Movement, Product, PurchaseOrder, Settings, Supplier,
};

use crate::error::{DbError, DbResult};
use crate::repository::{
    BatchRepository, MovementRepository, ProductRepository, PurchaseOrderRepository,
    SettingsRepository, SupplierRepository,
};

// =============================================================================
// Writes
// =============================================================================

/// One write of an atomic write-set.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerWrite {
    InsertProduct(Product),
    /// Fails the transaction unless the stored version is `expected_version`.
    UpdateProduct {
        product: Product,
        expected_version: i64,
    },
    InsertBatch(Batch),
    /// Fails the transaction unless the lot still holds `expected_remaining`.
    UpdateBatch {
        batch_id: String,
        product_id: String,
        remaining: i64,
        expected_remaining: i64,
    },
    InsertMovement(Movement),
    InsertSupplier(Supplier),
    InsertPurchaseOrder(PurchaseOrder),
    /// Fails the transaction unless the order is still pending.
    MarkPurchaseOrderReceived {
        order_id: String,
        received_at: DateTime<Utc>,
    },
    UpsertSettings(Settings),
    /// Fails the transaction unless the tenant's costing method is still
    /// `expected`. Writes nothing.
    AssertMethod { expected: InventoryMethod },
    /// Fails the transaction unless the tenant's settings are still
    /// exactly `expected`. Writes nothing.
    AssertSettings(Settings),
}

impl LedgerWrite {
    /// Document this write changes. Assertions change none.
    pub fn document(&self) -> Option<DocumentChange> {
        let (collection, id) = match self {
            LedgerWrite::InsertProduct(p) => (Collection::Products, p.id.clone()),
            LedgerWrite::UpdateProduct { product, .. } => (Collection::Products, product.id.clone()),
            LedgerWrite::InsertBatch(b) => (Collection::Batches, b.id.clone()),
            LedgerWrite::UpdateBatch { batch_id, .. } => (Collection::Batches, batch_id.clone()),
            LedgerWrite::InsertMovement(m) => (Collection::Movements, m.id.clone()),
            LedgerWrite::InsertSupplier(s) => (Collection::Suppliers, s.id.clone()),
            LedgerWrite::InsertPurchaseOrder(o) => (Collection::PurchaseOrders, o.id.clone()),
            LedgerWrite::MarkPurchaseOrderReceived { order_id, .. } => {
                (Collection::PurchaseOrders, order_id.clone())
            }
            LedgerWrite::UpsertSettings(s) => (Collection::Settings, s.tenant_id.clone()),
            LedgerWrite::AssertMethod { .. } | LedgerWrite::AssertSettings(_) => return None,
        };
        Some(DocumentChange { collection, id })
    }

    /// Tenant named by the row being written, where the row carries one.
    fn tenant_id(&self) -> Option<&str> {
        match self {
            LedgerWrite::InsertProduct(p) => Some(&p.tenant_id),
            LedgerWrite::UpdateProduct { product, .. } => Some(&product.tenant_id),
            LedgerWrite::InsertMovement(m) => Some(&m.tenant_id),
            LedgerWrite::InsertSupplier(s) => Some(&s.tenant_id),
            LedgerWrite::InsertPurchaseOrder(o) => Some(&o.tenant_id),
            LedgerWrite::UpsertSettings(s) => Some(&s.tenant_id),
            LedgerWrite::InsertBatch(_)
            | LedgerWrite::UpdateBatch { .. }
            | LedgerWrite::MarkPurchaseOrderReceived { .. }
            | LedgerWrite::AssertMethod { .. }
            | LedgerWrite::AssertSettings(_) => None,
        }
    }
}

// =============================================================================
// Change Notifications
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Products,
    Batches,
    Movements,
    Suppliers,
    PurchaseOrders,
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentChange {
    pub collection: Collection,
    pub id: String,
}

/// Documents written by one committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub tenant_id: String,
    pub committed_at: DateTime<Utc>,
    /// In write order.
    pub changes: Vec<DocumentChange>,
}

impl ChangeSet {
    /// Whether any document of `collection` changed.
    pub fn touches(&self, collection: Collection) -> bool {
        self.changes.iter().any(|c| c.collection == collection)
    }

    /// Ids changed in `collection`, in write order.
    pub fn ids_in(&self, collection: Collection) -> impl Iterator<Item = &str> + '_ {
        self.changes
            .iter()
            .filter(move |c| c.collection == collection)
            .map(|c| c.id.as_str())
    }
}

// =============================================================================
// Capability
// =============================================================================

/// Tenant-bound storage for the inventory ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    fn tenant_id(&self) -> &str;

    async fn read_product(&self, id: &str) -> DbResult<Option<Product>>;

    async fn find_product_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>>;

    /// Lots of a product, ordered by purchase date then sequence.
    async fn read_batches(&self, product_id: &str) -> DbResult<Vec<Batch>>;

    async fn read_purchase_order(&self, id: &str) -> DbResult<Option<PurchaseOrder>>;

    async fn read_supplier(&self, id: &str) -> DbResult<Option<Supplier>>;

    /// Saved settings, or defaults when the tenant never saved any.
    async fn read_settings(&self) -> DbResult<Settings>;

    async fn list_products(&self) -> DbResult<Vec<Product>>;

    async fn list_suppliers(&self) -> DbResult<Vec<Supplier>>;

    /// Newest first.
    async fn list_purchase_orders(&self) -> DbResult<Vec<PurchaseOrder>>;

    /// Movements with `from <= occurred_at < to`, oldest first.
    async fn movements_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Movement>>;

    /// Oldest first.
    async fn movements_for_product(&self, product_id: &str) -> DbResult<Vec<Movement>>;

    /// Applies every write in one transaction, or none of them.
    ///
    /// A guarded write that matches no row aborts with
    /// [`DbError::Conflict`].
    async fn run_atomic(&self, writes: Vec<LedgerWrite>) -> DbResult<ChangeSet>;

    /// Stream of committed change-sets for this tenant.
    ///
    /// A receiver that falls behind gets `RecvError::Lagged` and can keep
    /// reading, or subscribe again.
    fn subscribe(&self) -> broadcast::Receiver<ChangeSet>;
}

// =============================================================================
// SQLite Implementation
// =============================================================================

/// [`LedgerStore`] over the SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
    tenant_id: String,
    default_method: InventoryMethod,
    changes: broadcast::Sender<ChangeSet>,
    products: ProductRepository,
    batches: BatchRepository,
    movements: MovementRepository,
    suppliers: SupplierRepository,
    purchase_orders: PurchaseOrderRepository,
    settings: SettingsRepository,
}

impl SqliteLedgerStore {
    /// Store for `tenant_id`, publishing commits on `changes`.
    ///
    /// Usually obtained from [`crate::Database::ledger`], which shares one
    /// channel per tenant.
    pub fn new(pool: SqlitePool, tenant_id: &str, changes: broadcast::Sender<ChangeSet>) -> Self {
        SqliteLedgerStore {
            products: ProductRepository::new(pool.clone(), tenant_id),
            batches: BatchRepository::new(pool.clone(), tenant_id),
            movements: MovementRepository::new(pool.clone(), tenant_id),
            suppliers: SupplierRepository::new(pool.clone(), tenant_id),
            purchase_orders: PurchaseOrderRepository::new(pool.clone(), tenant_id),
            settings: SettingsRepository::new(pool.clone(), tenant_id),
            pool,
            tenant_id: tenant_id.to_string(),
            default_method: InventoryMethod::default(),
            changes,
        }
    }

    /// Method reported for tenants without saved settings.
    pub fn with_default_method(mut self, method: InventoryMethod) -> Self {
        self.default_method = method;
        self
    }

    /// Settings as seen by an open transaction, defaults included.
    async fn settings_in(&self, conn: &mut SqliteConnection) -> DbResult<Settings> {
        Ok(self
            .settings
            .get_in(conn)
            .await?
            .unwrap_or_else(|| Settings::defaults_for(&self.tenant_id, self.default_method)))
    }

    pub(crate) fn change_sender(&self) -> &broadcast::Sender<ChangeSet> {
        &self.changes
    }

    async fn apply(&self, conn: &mut SqliteConnection, write: &LedgerWrite) -> DbResult<()> {
        if let Some(tenant) = write.tenant_id() {
            if tenant != self.tenant_id {
                return Err(DbError::Internal(format!(
                    "write for tenant {tenant} on a store bound to {}",
                    self.tenant_id
                )));
            }
        }

        match write {
            LedgerWrite::InsertProduct(product) => self.products.insert(conn, product).await,
            LedgerWrite::UpdateProduct {
                product,
                expected_version,
            } => {
                if !self
                    .products
                    .update_guarded(conn, product, *expected_version)
                    .await?
                {
                    return Err(DbError::conflict("Product", &product.id));
                }
                Ok(())
            }
            LedgerWrite::InsertBatch(batch) => self.batches.insert(conn, batch).await,
            LedgerWrite::UpdateBatch {
                batch_id,
                product_id,
                remaining,
                expected_remaining,
            } => {
                if !self
                    .batches
                    .update_remaining_guarded(conn, batch_id, product_id, *remaining, *expected_remaining)
                    .await?
                {
                    return Err(DbError::conflict("Batch", batch_id));
                }
                Ok(())
            }
            LedgerWrite::InsertMovement(movement) => self.movements.insert(conn, movement).await,
            LedgerWrite::InsertSupplier(supplier) => self.suppliers.insert(conn, supplier).await,
            LedgerWrite::InsertPurchaseOrder(order) => {
                self.purchase_orders.insert(conn, order).await
            }
            LedgerWrite::MarkPurchaseOrderReceived {
                order_id,
                received_at,
            } => {
                if !self
                    .purchase_orders
                    .mark_received(conn, order_id, *received_at)
                    .await?
                {
                    return Err(DbError::conflict("PurchaseOrder", order_id));
                }
                Ok(())
            }
            LedgerWrite::UpsertSettings(settings) => self.settings.upsert(conn, settings).await,
            LedgerWrite::AssertMethod { expected } => {
                if self.settings_in(conn).await?.inventory_method != *expected {
                    return Err(DbError::conflict("Settings", &self.tenant_id));
                }
                Ok(())
            }
            LedgerWrite::AssertSettings(expected) => {
                if self.settings_in(conn).await? != *expected {
                    return Err(DbError::conflict("Settings", &self.tenant_id));
                }
                Ok(())
            }
        }
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    async fn read_product(&self, id: &str) -> DbResult<Option<Product>> {
        self.products.get_by_id(id).await
    }

    async fn find_product_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        self.products.get_by_barcode(barcode).await
    }

    async fn read_batches(&self, product_id: &str) -> DbResult<Vec<Batch>> {
        self.batches.list_for_product(product_id).await
    }

    async fn read_purchase_order(&self, id: &str) -> DbResult<Option<PurchaseOrder>> {
        self.purchase_orders.get_by_id(id).await
    }

    async fn read_supplier(&self, id: &str) -> DbResult<Option<Supplier>> {
        self.suppliers.get_by_id(id).await
    }

    async fn read_settings(&self) -> DbResult<Settings> {
        Ok(self
            .settings
            .get()
            .await?
            .unwrap_or_else(|| Settings::defaults_for(&self.tenant_id, self.default_method)))
    }

    async fn list_products(&self) -> DbResult<Vec<Product>> {
        self.products.list().await
    }

    async fn list_suppliers(&self) -> DbResult<Vec<Supplier>> {
        self.suppliers.list().await
    }

    async fn list_purchase_orders(&self) -> DbResult<Vec<PurchaseOrder>> {
        self.purchase_orders.list().await
    }

    async fn movements_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Movement>> {
        self.movements.between(from, to).await
    }

    async fn movements_for_product(&self, product_id: &str) -> DbResult<Vec<Movement>> {
        self.movements.for_product(product_id).await
    }

    async fn run_atomic(&self, writes: Vec<LedgerWrite>) -> DbResult<ChangeSet> {
        let changes: Vec<DocumentChange> = writes.iter().filter_map(LedgerWrite::document).collect();

        if writes.is_empty() {
            return Ok(ChangeSet {
                tenant_id: self.tenant_id.clone(),
                committed_at: Utc::now(),
                changes,
            });
        }

        debug!(tenant_id = %self.tenant_id, writes = writes.len(), "Beginning ledger transaction");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for write in &writes {
            if let Err(err) = self.apply(&mut *tx, write).await {
                warn!(
                    tenant_id = %self.tenant_id,
                    error = %err,
                    "Ledger transaction aborted"
                );
                let _ = tx.rollback().await;
                return Err(err);
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let change_set = ChangeSet {
            tenant_id: self.tenant_id.clone(),
            committed_at: Utc::now(),
            changes,
        };

        debug!(
            tenant_id = %self.tenant_id,
            documents = change_set.changes.len(),
            "Ledger transaction committed"
        );

        // No subscribers is fine.
        let _ = self.changes.send(change_set.clone());

        Ok(change_set)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeSet> {
        self.changes.subscribe()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use bodega_core::{MovementType, PurchaseOrderStatus};

    fn product(id: &str, tenant: &str) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            tenant_id: tenant.to_string(),
            sku: Some("RICE-1KG".to_string()),
            barcode: None,
            name: "Rice 1kg".to_string(),
            description: None,
            category: Some("Pantry".to_string()),
            sale_price_cents: 150,
            purchase_price_cents: 100,
            stock: 0,
            stock_value_cents: 0,
            min_stock_threshold: 5,
            max_stock_threshold: 100,
            expiration_date: None,
            is_active: true,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    fn movement(id: &str, product: &Product, quantity: i64) -> Movement {
        Movement {
            id: id.to_string(),
            tenant_id: product.tenant_id.clone(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            occurred_at: Utc::now(),
            movement_type: MovementType::AdjustmentIn,
            quantity,
            net_amount_cents: None,
            iva_amount_cents: None,
            total_amount_cents: None,
            cost_of_goods_sold_cents: None,
            payment_method: None,
            reference_id: None,
            notes: None,
        }
    }

    async fn store() -> (Database, SqliteLedgerStore) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.ledger("t-1");
        (db, store)
    }

    #[tokio::test]
    async fn test_commit_applies_all_writes() {
        let (_db, store) = store().await;
        let p = product("p-1", "t-1");

        store
            .run_atomic(vec![LedgerWrite::InsertProduct(p.clone())])
            .await
            .unwrap();

        let mut updated = p.clone();
        updated.stock = 4;
        updated.stock_value_cents = 400;
        let cs = store
            .run_atomic(vec![
                LedgerWrite::UpdateProduct {
                    product: updated,
                    expected_version: 1,
                },
                LedgerWrite::InsertMovement(movement("m-1", &p, 4)),
            ])
            .await
            .unwrap();

        assert!(cs.touches(Collection::Products));
        assert_eq!(cs.ids_in(Collection::Movements).collect::<Vec<_>>(), vec!["m-1"]);

        let stored = store.read_product("p-1").await.unwrap().unwrap();
        assert_eq!(stored.stock, 4);
        assert_eq!(stored.version, 2);
        assert_eq!(store.movements_for_product("p-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_version_rolls_back_everything() {
        let (_db, store) = store().await;
        let p = product("p-1", "t-1");
        store
            .run_atomic(vec![LedgerWrite::InsertProduct(p.clone())])
            .await
            .unwrap();

        // Movement first, then a product write with a stale version.
        let mut stale = p.clone();
        stale.stock = 9;
        let err = store
            .run_atomic(vec![
                LedgerWrite::InsertMovement(movement("m-1", &p, 9)),
                LedgerWrite::UpdateProduct {
                    product: stale,
                    expected_version: 42,
                },
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Conflict { ref entity, .. } if entity == "Product"));
        assert!(store.movements_for_product("p-1").await.unwrap().is_empty());
        assert_eq!(store.read_product("p-1").await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_subscribers_see_commits_only() {
        let (_db, store) = store().await;
        let mut rx = store.subscribe();
        let p = product("p-1", "t-1");

        store
            .run_atomic(vec![LedgerWrite::InsertProduct(p.clone())])
            .await
            .unwrap();
        let failed = store
            .run_atomic(vec![LedgerWrite::MarkPurchaseOrderReceived {
                order_id: "missing".to_string(),
                received_at: Utc::now(),
            }])
            .await;
        assert!(failed.is_err());

        let cs = rx.recv().await.unwrap();
        assert_eq!(cs.tenant_id, "t-1");
        assert_eq!(cs.ids_in(Collection::Products).collect::<Vec<_>>(), vec!["p-1"]);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_other_tenant_rows_refused() {
        let (_db, store) = store().await;

        let err = store
            .run_atomic(vec![LedgerWrite::InsertProduct(product("p-1", "t-2"))])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Internal(_)));
        assert!(store.read_product("p-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_settings_default_to_configured_method() {
        let (db, _) = store().await;
        let store = db.ledger("t-1").with_default_method(InventoryMethod::Fifo);

        let settings = store.read_settings().await.unwrap();
        assert_eq!(settings.inventory_method, InventoryMethod::Fifo);

        store
            .run_atomic(vec![LedgerWrite::UpsertSettings(Settings::defaults_for(
                "t-1",
                InventoryMethod::Cpp,
            ))])
            .await
            .unwrap();
        assert_eq!(
            store.read_settings().await.unwrap().inventory_method,
            InventoryMethod::Cpp
        );
    }

    #[tokio::test]
    async fn test_receipt_guard() {
        let (_db, store) = store().await;
        let supplier = Supplier {
            id: "s-1".to_string(),
            tenant_id: "t-1".to_string(),
            name: "Molino".to_string(),
            contact_name: None,
            email: None,
            phone: None,
            created_at: Utc::now(),
        };
        let order = PurchaseOrder {
            id: "po-1".to_string(),
            tenant_id: "t-1".to_string(),
            supplier_id: "s-1".to_string(),
            supplier_name: "Molino".to_string(),
            status: PurchaseOrderStatus::Pending,
            items: Vec::new(),
            total_amount_cents: 0,
            created_at: Utc::now(),
            received_at: None,
        };
        store
            .run_atomic(vec![
                LedgerWrite::InsertSupplier(supplier),
                LedgerWrite::InsertPurchaseOrder(order),
            ])
            .await
            .unwrap();

        let mark = || LedgerWrite::MarkPurchaseOrderReceived {
            order_id: "po-1".to_string(),
            received_at: Utc::now(),
        };
        store.run_atomic(vec![mark()]).await.unwrap();
        let err = store.run_atomic(vec![mark()]).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { ref entity, .. } if entity == "PurchaseOrder"));
    }

    #[tokio::test]
    async fn test_settings_assertions() {
        let (db, _) = store().await;
        let store = db.ledger("t-1").with_default_method(InventoryMethod::Fifo);
        let p = product("p-1", "t-1");

        // No saved row: the configured default is what gets asserted.
        let cs = store
            .run_atomic(vec![
                LedgerWrite::AssertMethod {
                    expected: InventoryMethod::Fifo,
                },
                LedgerWrite::InsertProduct(p.clone()),
            ])
            .await
            .unwrap();
        assert_eq!(cs.changes.len(), 1);
        assert!(!cs.touches(Collection::Settings));

        let saved = store.read_settings().await.unwrap();
        let switched = Settings {
            inventory_method: InventoryMethod::Cpp,
            ..saved.clone()
        };
        store
            .run_atomic(vec![
                LedgerWrite::AssertSettings(saved.clone()),
                LedgerWrite::UpsertSettings(switched),
            ])
            .await
            .unwrap();

        let mut updated = p.clone();
        updated.stock = 1;
        let err = store
            .run_atomic(vec![
                LedgerWrite::UpdateProduct {
                    product: updated,
                    expected_version: 1,
                },
                LedgerWrite::AssertMethod {
                    expected: InventoryMethod::Fifo,
                },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { ref entity, .. } if entity == "Settings"));
        assert_eq!(store.read_product("p-1").await.unwrap().unwrap().stock, 0);

        let err = store
            .run_atomic(vec![LedgerWrite::AssertSettings(saved)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }
}
