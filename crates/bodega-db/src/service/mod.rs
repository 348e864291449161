//! # Inventory Service
//!
//! Every stock-changing operation, each as one atomic write-set.
//!
//! ## Flow of One Operation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  sale(cart) / adjust_stock / enter_purchase / receive_purchase_order    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  read_settings() → InventoryMethod → &dyn CostingStrategy (once)       │
//! │       │   (asserted again inside the commit)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  WorkingSet: product copy + lots per touched product                   │
//! │       │   (several cart lines for one product share one copy)          │
//! │       ▼                                                                 │
//! │  strategy.apply_inbound / apply_outbound → CostingOutcome              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  MovementRecorder::record(..) → Movement (one timestamp per call)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  store.run_atomic([method, products.., lots.., movements.., extra..])  │
//! │       │                                                                 │
//! │       ├── Ok   → updated products returned                             │
//! │       └── Err  → nothing written; Conflict is retryable by the caller  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error before the commit leaves storage untouched. The service never
//! retries a conflicted commit on its own.

mod catalog;
mod reports;
mod stock;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::error;
use uuid::Uuid;

use bodega_core::{
    Batch, CoreError, CostingOutcome, InventoryMethod, Movement, Product, StockPosition,
};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{LedgerStore, LedgerWrite};

/// Stock mutations, catalog upkeep and reports over a [`LedgerStore`].
///
/// ## Example
/// ```rust,ignore
/// let db = Database::new(DbConfig::in_memory()).await?;
/// let inventory = db.inventory(DEFAULT_TENANT_ID, InventoryMethod::Cpp);
///
/// let outcome = inventory
///     .sale(&[CartLine::new(&coffee.id, 2)], PaymentMethod::Cash)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct InventoryService<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> InventoryService<S> {
    pub fn new(store: S) -> Self {
        InventoryService { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn method(&self) -> ServiceResult<InventoryMethod> {
        Ok(self.store.read_settings().await?.inventory_method)
    }

    async fn require_product(&self, id: &str) -> ServiceResult<Product> {
        self.store
            .read_product(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    /// Loads a product (and, under FIFO, its lots) into the working set,
    /// or returns the copy already there.
    async fn working<'w>(
        &self,
        set: &'w mut WorkingSet,
        product_id: &str,
        method: InventoryMethod,
    ) -> ServiceResult<&'w mut WorkingProduct> {
        if let Some(idx) = set.index_of(product_id) {
            return Ok(&mut set.items[idx]);
        }

        let product = self.require_product(product_id).await?;
        let lots = match method {
            InventoryMethod::Fifo => self.store.read_batches(product_id).await?,
            InventoryMethod::Cpp => Vec::new(),
        };

        let idx = set.items.len();
        set.items.push(WorkingProduct::existing(product, lots));
        Ok(&mut set.items[idx])
    }

    /// Commits the working set, then `movements`, then `extra`, as one
    /// transaction. Returns the products as stored.
    async fn commit(
        &self,
        set: WorkingSet,
        movements: &[Movement],
        extra: Vec<LedgerWrite>,
    ) -> ServiceResult<Vec<Product>> {
        let mut writes = set.writes();
        writes.extend(movements.iter().cloned().map(LedgerWrite::InsertMovement));
        writes.extend(extra);

        self.store.run_atomic(writes).await?;
        Ok(set.into_products())
    }
}

/// Logs lot inconsistencies before handing the error back.
fn costing_failed(err: CoreError) -> ServiceError {
    match &err {
        CoreError::StockInconsistency {
            product_id,
            recorded_stock,
            lot_total,
        } => error!(
            product_id = %product_id,
            recorded_stock,
            lot_total,
            "FIFO lots do not reconcile with recorded stock"
        ),
        CoreError::ValuationInconsistency {
            product_id,
            stock_value_cents,
            lot_value_cents,
        } => error!(
            product_id = %product_id,
            stock_value_cents,
            lot_value_cents,
            "FIFO lots do not reconcile with recorded stock value"
        ),
        _ => {}
    }
    ServiceError::Core(err)
}

// =============================================================================
// Working Set
// =============================================================================

/// In-memory copy of one product and its lots for the duration of an
/// operation.
#[derive(Debug)]
struct WorkingProduct {
    product: Product,
    /// Version read from storage; the write guard.
    expected_version: i64,
    is_new: bool,
    lots: Vec<Batch>,
    /// Remainders as read, keyed by lot id; the lot write guards.
    read_remaining: HashMap<String, i64>,
}

impl WorkingProduct {
    fn existing(product: Product, lots: Vec<Batch>) -> Self {
        let read_remaining = lots
            .iter()
            .map(|b| (b.id.clone(), b.remaining_quantity))
            .collect();
        WorkingProduct {
            expected_version: product.version,
            product,
            is_new: false,
            lots,
            read_remaining,
        }
    }

    fn created(product: Product) -> Self {
        WorkingProduct {
            expected_version: product.version,
            product,
            is_new: true,
            lots: Vec::new(),
            read_remaining: HashMap::new(),
        }
    }

    fn position(&self) -> StockPosition<'_> {
        StockPosition::of(&self.product, &self.lots)
    }

    /// Applies a costing outcome to the copy. Returns the lot it opened.
    fn absorb(&mut self, outcome: &CostingOutcome, at: DateTime<Utc>) -> Option<Batch> {
        outcome.apply_to(&mut self.product);
        outcome.apply_to_lots(&mut self.lots);
        self.product.updated_at = at;

        let lot = outcome
            .new_lot
            .clone()?
            .into_batch(Uuid::new_v4().to_string(), &self.product.id, at);
        self.lots.push(lot.clone());
        Some(lot)
    }

    fn product_write(&self) -> LedgerWrite {
        if self.is_new {
            LedgerWrite::InsertProduct(self.product.clone())
        } else {
            LedgerWrite::UpdateProduct {
                product: self.product.clone(),
                expected_version: self.expected_version,
            }
        }
    }

    fn lot_writes(&self) -> impl Iterator<Item = LedgerWrite> + '_ {
        self.lots.iter().filter_map(move |lot| match self.read_remaining.get(&lot.id) {
            None => Some(LedgerWrite::InsertBatch(lot.clone())),
            Some(&before) if before != lot.remaining_quantity => Some(LedgerWrite::UpdateBatch {
                batch_id: lot.id.clone(),
                product_id: lot.product_id.clone(),
                remaining: lot.remaining_quantity,
                expected_remaining: before,
            }),
            Some(_) => None,
        })
    }

    /// The product as it reads back after a successful commit.
    fn into_committed(mut self) -> Product {
        if !self.is_new {
            self.product.version = self.expected_version + 1;
        }
        self.product
    }
}

/// Products touched by one operation, in first-touched order.
#[derive(Debug, Default)]
struct WorkingSet {
    /// Costing method the operation was computed under.
    method: Option<InventoryMethod>,
    items: Vec<WorkingProduct>,
}

impl WorkingSet {
    fn under(method: InventoryMethod) -> Self {
        WorkingSet {
            method: Some(method),
            items: Vec::new(),
        }
    }

    fn index_of(&self, product_id: &str) -> Option<usize> {
        self.items.iter().position(|w| w.product.id == product_id)
    }

    fn push(&mut self, item: WorkingProduct) -> &mut WorkingProduct {
        let idx = self.items.len();
        self.items.push(item);
        &mut self.items[idx]
    }

    /// Method assertion, then product writes, then lot writes (lots
    /// reference products).
    fn writes(&self) -> Vec<LedgerWrite> {
        let mut writes: Vec<LedgerWrite> = self
            .method
            .map(|expected| LedgerWrite::AssertMethod { expected })
            .into_iter()
            .collect();
        writes.extend(self.items.iter().map(WorkingProduct::product_write));
        for item in &self.items {
            writes.extend(item.lot_writes());
        }
        writes
    }

    fn into_products(self) -> Vec<Product> {
        self.items.into_iter().map(WorkingProduct::into_committed).collect()
    }
}

// =============================================================================
// Shared Test Fixtures
// =============================================================================
