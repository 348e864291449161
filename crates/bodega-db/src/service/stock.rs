//! Stock mutations: sale, manual adjustment, purchase entry and purchase
//! order receipt.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use bodega_core::ledger::MovementDetails;
use bodega_core::validation::validate_cart;
use bodega_core::{
    AdjustmentReason, CartLine, CoreError, Money, Movement, MovementRecorder, MovementType,
    PaymentMethod, PurchaseEntryOutcome, PurchaseOrderStatus, SaleOutcome, TaxBreakdown,
    ValidationError, VAT_RATE,
};

use super::{costing_failed, InventoryService, WorkingSet};
use crate::error::ServiceResult;
use crate::store::{LedgerStore, LedgerWrite};

impl<S: LedgerStore> InventoryService<S> {
    /// Checks out a cart.
    ///
    /// Each line leaves stock at cost under the tenant's method and is
    /// recorded as one `Sale` movement with its net, IVA and total. Lines
    /// without a price sell at the product's sale price.
    ///
    /// The whole cart commits or nothing does: one line short of stock
    /// rejects the sale and leaves every product untouched.
    pub async fn sale(
        &self,
        cart: &[CartLine],
        payment_method: PaymentMethod,
    ) -> ServiceResult<SaleOutcome> {
        validate_cart(cart)?;

        let method = self.method().await?;
        let strategy = method.strategy();
        let recorder = MovementRecorder::new(self.store.tenant_id(), Utc::now());

        debug!(lines = cart.len(), method = %method, "Processing sale");

        let mut set = WorkingSet::under(method);
        let mut movements = Vec::with_capacity(cart.len());

        for line in cart {
            let item = self.working(&mut set, &line.product_id, method).await?;

            let outcome = strategy
                .apply_outbound(&item.position(), line.quantity)
                .map_err(costing_failed)?;
            item.absorb(&outcome, recorder.occurred_at());

            let unit_price = line
                .sale_price_cents
                .map(Money::from_cents)
                .unwrap_or_else(|| item.product.sale_price());
            let details = MovementDetails::default()
                .with_breakdown(line_breakdown(unit_price, line.quantity)?)
                .with_payment(payment_method);

            movements.push(recorder.record(
                MovementType::Sale,
                &item.product,
                line.quantity,
                &outcome,
                details,
            ));
        }

        let total = movements
            .iter()
            .map(Movement::total)
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line))
            .ok_or_else(|| CoreError::InsufficientDataForCosting {
                reason: "sale total overflows".to_string(),
            })?;

        let products = self.commit(set, &movements, Vec::new()).await?;

        info!(
            lines = movements.len(),
            total = %total,
            payment_method = ?payment_method,
            "Sale committed"
        );

        Ok(SaleOutcome { movements, products })
    }

    /// Corrects stock by hand.
    ///
    /// A positive `signed_quantity` enters at the product's purchase price
    /// (`AdjustmentIn`). A negative one leaves at cost as `AdjustmentOut`
    /// for a count correction or `Shrinkage` for losses.
    pub async fn adjust_stock(
        &self,
        product_id: &str,
        signed_quantity: i64,
        reason: AdjustmentReason,
        notes: Option<String>,
    ) -> ServiceResult<Movement> {
        if signed_quantity == 0 {
            return Err(CoreError::InvalidQuantity { quantity: 0 }.into());
        }
        if signed_quantity > 0 && reason == AdjustmentReason::Shrinkage {
            return Err(ValidationError::InvalidFormat {
                field: "reason".to_string(),
                reason: "shrinkage can only remove stock".to_string(),
            }
            .into());
        }

        let quantity = signed_quantity
            .checked_abs()
            .ok_or(CoreError::InvalidQuantity {
                quantity: signed_quantity,
            })?;

        let method = self.method().await?;
        let strategy = method.strategy();
        let recorder = MovementRecorder::new(self.store.tenant_id(), Utc::now());
        let movement_type = reason.movement_type(signed_quantity);

        let mut set = WorkingSet::under(method);
        let item = self.working(&mut set, product_id, method).await?;

        let costed = if signed_quantity > 0 {
            strategy.apply_inbound(
                &item.position(),
                quantity,
                item.product.purchase_price(),
                recorder.occurred_at().date_naive(),
            )
        } else {
            strategy.apply_outbound(&item.position(), quantity)
        };
        let outcome = costed.map_err(costing_failed)?;
        item.absorb(&outcome, recorder.occurred_at());

        let movement = recorder.record(
            movement_type,
            &item.product,
            quantity,
            &outcome,
            MovementDetails::default().with_notes(notes),
        );

        self.commit(set, std::slice::from_ref(&movement), Vec::new())
            .await?;

        info!(
            product_id = %product_id,
            quantity = movement.quantity,
            movement_type = ?movement_type,
            "Stock adjusted"
        );

        Ok(movement)
    }

    /// Enters purchased stock outside a purchase order.
    ///
    /// Always records a `PurchaseEntry` movement carrying the purchase's
    /// net, IVA and total, and makes `unit_cost_cents` the product's last
    /// known purchase price. Under FIFO the returned outcome holds the new
    /// lot.
    pub async fn enter_purchase(
        &self,
        product_id: &str,
        quantity: i64,
        unit_cost_cents: i64,
        purchase_date: NaiveDate,
    ) -> ServiceResult<PurchaseEntryOutcome> {
        let method = self.method().await?;
        let strategy = method.strategy();
        let recorder = MovementRecorder::new(self.store.tenant_id(), Utc::now());
        let unit_cost = Money::from_cents(unit_cost_cents);

        let mut set = WorkingSet::under(method);
        let item = self.working(&mut set, product_id, method).await?;

        let outcome = strategy
            .apply_inbound(&item.position(), quantity, unit_cost, purchase_date)
            .map_err(costing_failed)?;
        let breakdown = line_breakdown(unit_cost, quantity)?;
        let batch = item.absorb(&outcome, recorder.occurred_at());
        item.product.purchase_price_cents = unit_cost_cents;

        let movement = recorder.record(
            MovementType::PurchaseEntry,
            &item.product,
            quantity,
            &outcome,
            MovementDetails::default().with_breakdown(breakdown),
        );

        let product = self
            .commit(set, std::slice::from_ref(&movement), Vec::new())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        info!(
            product_id = %product_id,
            quantity,
            unit_cost = %unit_cost,
            lot = batch.as_ref().map(|b| b.sequence),
            "Purchase entered"
        );

        Ok(PurchaseEntryOutcome {
            batch,
            movement,
            product,
        })
    }

    /// Receives a pending purchase order.
    ///
    /// Every line enters stock at its unit cost, dated today, as one
    /// `PurchaseOrderReceipt` movement referencing the order. The order
    /// becomes received in the same transaction, so a receipt is never
    /// half applied and never applied twice.
    pub async fn receive_purchase_order(&self, order_id: &str) -> ServiceResult<Vec<Movement>> {
        let order = self
            .store
            .read_purchase_order(order_id)
            .await?
            .ok_or_else(|| CoreError::PurchaseOrderNotFound(order_id.to_string()))?;

        if !order.is_pending() {
            return Err(CoreError::InvalidState {
                order_id: order.id.clone(),
                status: order.status.as_str().to_string(),
                expected: PurchaseOrderStatus::Pending.as_str().to_string(),
            }
            .into());
        }
        if order.items.is_empty() {
            return Err(CoreError::InsufficientDataForCosting {
                reason: format!("purchase order {} has no lines", order.id),
            }
            .into());
        }

        let method = self.method().await?;
        let strategy = method.strategy();
        let recorder = MovementRecorder::new(self.store.tenant_id(), Utc::now());
        let received_on = recorder.occurred_at().date_naive();
        let notes = format!("Purchase order {}", order.id);

        debug!(order_id = %order.id, lines = order.items.len(), "Receiving purchase order");

        let mut set = WorkingSet::under(method);
        let mut movements = Vec::with_capacity(order.items.len());

        for line in &order.items {
            let unit_cost = Money::from_cents(line.unit_cost_cents);
            let item = self.working(&mut set, &line.product_id, method).await?;

            let outcome = strategy
                .apply_inbound(&item.position(), line.quantity, unit_cost, received_on)
                .map_err(costing_failed)?;
            let breakdown = line_breakdown(unit_cost, line.quantity)?;
            item.absorb(&outcome, recorder.occurred_at());
            item.product.purchase_price_cents = line.unit_cost_cents;

            let details = MovementDetails::default()
                .with_breakdown(breakdown)
                .with_reference(order.id.clone())
                .with_notes(Some(notes.clone()));

            movements.push(recorder.record(
                MovementType::PurchaseOrderReceipt,
                &item.product,
                line.quantity,
                &outcome,
                details,
            ));
        }

        let mark_received = LedgerWrite::MarkPurchaseOrderReceived {
            order_id: order.id.clone(),
            received_at: recorder.occurred_at(),
        };
        self.commit(set, &movements, vec![mark_received]).await?;

        info!(
            order_id = %order.id,
            supplier = %order.supplier_name,
            lines = movements.len(),
            "Purchase order received"
        );

        Ok(movements)
    }
}

/// Net, IVA and total of one line, refusing amounts that overflow.
fn line_breakdown(unit_price: Money, quantity: i64) -> ServiceResult<TaxBreakdown> {
    TaxBreakdown::for_line(unit_price, quantity, VAT_RATE).ok_or_else(|| {
        CoreError::InsufficientDataForCosting {
            reason: format!(
                "{quantity} units at {} cents overflow the line amount",
                unit_price.cents()
            ),
        }
        .into()
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
