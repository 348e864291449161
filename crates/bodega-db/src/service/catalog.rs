//! Catalog upkeep: products, suppliers, purchase orders and settings.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use bodega_core::costing::rebase_lots;
use bodega_core::ledger::MovementDetails;
use bodega_core::validation::{
    validate_new_product, validate_new_supplier, validate_product_details,
    validate_purchase_order_lines,
};
use bodega_core::{
    CoreError, InventoryMethod, Money, MovementRecorder, MovementType, NewProduct,
    NewPurchaseOrderLine, NewSupplier, Product, ProductDetails, PurchaseOrder, PurchaseOrderItem,
    PurchaseOrderStatus, Settings, Supplier, ValidationError, DEFAULT_MAX_STOCK_THRESHOLD,
    DEFAULT_MIN_STOCK_THRESHOLD,
};

use super::{costing_failed, InventoryService, WorkingProduct, WorkingSet};
use crate::error::ServiceResult;
use crate::store::{LedgerStore, LedgerWrite};

// =============================================================================
// Products
// =============================================================================

impl<S: LedgerStore> InventoryService<S> {
    /// Adds a product to the catalog.
    ///
    /// A non-zero opening stock enters at the purchase price through the
    /// tenant's costing method and is recorded as an `OpeningBalance`
    /// movement, so the ledger accounts for it from the start.
    pub async fn create_product(&self, input: NewProduct) -> ServiceResult<Product> {
        validate_new_product(&input)?;

        let method = self.method().await?;
        let recorder = MovementRecorder::new(self.store.tenant_id(), Utc::now());
        let now = recorder.occurred_at();

        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: self.store.tenant_id().to_string(),
            sku: input.sku,
            barcode: input.barcode.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()),
            name: input.name.trim().to_string(),
            description: input.description,
            category: input.category,
            sale_price_cents: input.sale_price_cents,
            purchase_price_cents: input.purchase_price_cents,
            stock: 0,
            stock_value_cents: 0,
            min_stock_threshold: input.min_stock_threshold.unwrap_or(DEFAULT_MIN_STOCK_THRESHOLD),
            max_stock_threshold: input.max_stock_threshold.unwrap_or(DEFAULT_MAX_STOCK_THRESHOLD),
            expiration_date: input.expiration_date,
            is_active: true,
            created_at: now,
            updated_at: now,
            version: 1,
        };

        let mut set = WorkingSet::under(method);
        let item = set.push(WorkingProduct::created(product));
        let mut movements = Vec::new();

        if input.opening_stock > 0 {
            let outcome = method
                .strategy()
                .apply_inbound(
                    &item.position(),
                    input.opening_stock,
                    item.product.purchase_price(),
                    now.date_naive(),
                )
                .map_err(costing_failed)?;
            item.absorb(&outcome, now);
            movements.push(recorder.record(
                MovementType::OpeningBalance,
                &item.product,
                input.opening_stock,
                &outcome,
                MovementDetails::default(),
            ));
        }

        let product = self
            .commit(set, &movements, Vec::new())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::ProductNotFound("new product".to_string()))?;

        info!(
            product_id = %product.id,
            name = %product.name,
            opening_stock = product.stock,
            "Product created"
        );

        Ok(product)
    }

    /// Changes catalog fields of a product. Stock and cost basis stay as
    /// they are.
    ///
    /// Fails with a retryable conflict when the product changed since
    /// `expected_version` was read.
    pub async fn update_product(
        &self,
        id: &str,
        details: ProductDetails,
        expected_version: i64,
    ) -> ServiceResult<Product> {
        validate_product_details(&details)?;

        let mut product = self.require_product(id).await?;
        product.name = details.name.trim().to_string();
        product.sku = details.sku;
        product.barcode = details.barcode.map(|b| b.trim().to_string()).filter(|b| !b.is_empty());
        product.description = details.description;
        product.category = details.category;
        product.sale_price_cents = details.sale_price_cents;
        product.min_stock_threshold = details.min_stock_threshold;
        product.max_stock_threshold = details.max_stock_threshold;
        product.expiration_date = details.expiration_date;
        product.is_active = details.is_active;
        product.updated_at = Utc::now();

        self.store
            .run_atomic(vec![LedgerWrite::UpdateProduct {
                product: product.clone(),
                expected_version,
            }])
            .await?;

        product.version = expected_version + 1;
        info!(product_id = %id, version = product.version, "Product updated");
        Ok(product)
    }

    pub async fn get_product(&self, id: &str) -> ServiceResult<Product> {
        self.require_product(id).await
    }

    pub async fn list_products(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.store.list_products().await?)
    }

    /// Scanner lookup. Only active products match.
    pub async fn find_by_barcode(&self, barcode: &str) -> ServiceResult<Option<Product>> {
        Ok(self.store.find_product_by_barcode(barcode).await?)
    }

    // =========================================================================
    // Suppliers
    // =========================================================================

    pub async fn create_supplier(&self, input: NewSupplier) -> ServiceResult<Supplier> {
        validate_new_supplier(&input)?;

        let supplier = Supplier {
            id: Uuid::new_v4().to_string(),
            tenant_id: self.store.tenant_id().to_string(),
            name: input.name.trim().to_string(),
            contact_name: input.contact_name,
            email: input.email,
            phone: input.phone,
            created_at: Utc::now(),
        };

        self.store
            .run_atomic(vec![LedgerWrite::InsertSupplier(supplier.clone())])
            .await?;

        info!(supplier_id = %supplier.id, name = %supplier.name, "Supplier created");
        Ok(supplier)
    }

    pub async fn list_suppliers(&self) -> ServiceResult<Vec<Supplier>> {
        Ok(self.store.list_suppliers().await?)
    }

    // =========================================================================
    // Purchase Orders
    // =========================================================================

    /// Opens a pending purchase order.
    ///
    /// Supplier and product names are copied onto the order so it reads the
    /// same after the catalog changes.
    pub async fn create_purchase_order(
        &self,
        supplier_id: &str,
        lines: &[NewPurchaseOrderLine],
    ) -> ServiceResult<PurchaseOrder> {
        validate_purchase_order_lines(lines)?;

        let supplier = self
            .store
            .read_supplier(supplier_id)
            .await?
            .ok_or_else(|| CoreError::SupplierNotFound(supplier_id.to_string()))?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let product = self.require_product(&line.product_id).await?;
            items.push(PurchaseOrderItem {
                product_id: product.id,
                name: product.name,
                quantity: line.quantity,
                unit_cost_cents: line.unit_cost_cents,
            });
        }
        let total = items
            .iter()
            .map(PurchaseOrderItem::line_total)
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line))
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "items".to_string(),
                reason: "order total is too large".to_string(),
            })?;

        let order = PurchaseOrder {
            id: Uuid::new_v4().to_string(),
            tenant_id: self.store.tenant_id().to_string(),
            supplier_id: supplier.id,
            supplier_name: supplier.name,
            status: PurchaseOrderStatus::Pending,
            items,
            total_amount_cents: total.cents(),
            created_at: Utc::now(),
            received_at: None,
        };

        self.store
            .run_atomic(vec![LedgerWrite::InsertPurchaseOrder(order.clone())])
            .await?;

        info!(
            order_id = %order.id,
            supplier = %order.supplier_name,
            lines = order.items.len(),
            total = %total,
            "Purchase order created"
        );
        Ok(order)
    }

    /// Newest first.
    pub async fn list_purchase_orders(&self) -> ServiceResult<Vec<PurchaseOrder>> {
        Ok(self.store.list_purchase_orders().await?)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub async fn settings(&self) -> ServiceResult<Settings> {
        Ok(self.store.read_settings().await?)
    }

    /// Switches the tenant's costing method.
    ///
    /// Switching to FIFO rebuilds the lots of every product whose lots no
    /// longer match its stock into one lot at the current average cost,
    /// dated today. No movement is recorded since no stock moves.
    ///
    /// A real switch bumps every product's version in the same commit, and
    /// stock mutations assert the method they were costed under, so a
    /// mutation racing the switch fails with a retryable conflict instead
    /// of committing under the old method.
    pub async fn set_inventory_method(&self, method: InventoryMethod) -> ServiceResult<Settings> {
        let read = self.store.read_settings().await?;
        let previous = read.inventory_method;
        let settings = Settings {
            inventory_method: method,
            ..read.clone()
        };

        let now = Utc::now();
        let mut set = WorkingSet::default();
        let mut rebased = 0;

        if method != previous {
            for product in self.store.list_products().await? {
                let lots = match method {
                    InventoryMethod::Fifo => self.store.read_batches(&product.id).await?,
                    InventoryMethod::Cpp => Vec::new(),
                };
                let item = set.push(WorkingProduct::existing(product, lots));
                if method == InventoryMethod::Fifo {
                    if let Some(outcome) = rebase_lots(&item.position(), now.date_naive()) {
                        debug!(
                            product_id = %item.product.id,
                            stock = item.product.stock,
                            "Rebasing lots"
                        );
                        item.absorb(&outcome, now);
                        rebased += 1;
                    }
                }
            }
        }

        self.commit(
            set,
            &[],
            vec![
                LedgerWrite::AssertSettings(read),
                LedgerWrite::UpsertSettings(settings.clone()),
            ],
        )
        .await?;

        info!(
            from = %previous,
            to = %method,
            rebased_products = rebased,
            "Inventory method changed"
        );
        Ok(settings)
    }

    /// Stores payment gateway settings. They are opaque to costing.
    pub async fn set_payment_provider(
        &self,
        provider: Option<String>,
        public_key: Option<String>,
    ) -> ServiceResult<Settings> {
        let read = self.store.read_settings().await?;
        let settings = Settings {
            payment_provider: provider,
            payment_public_key: public_key,
            ..read.clone()
        };

        // The row is rewritten whole; never put back a value changed meanwhile.
        self.store
            .run_atomic(vec![
                LedgerWrite::AssertSettings(read),
                LedgerWrite::UpsertSettings(settings.clone()),
            ])
            .await?;

        info!(provider = ?settings.payment_provider, "Payment provider saved");
        Ok(settings)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
