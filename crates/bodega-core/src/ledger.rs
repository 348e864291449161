//! # Movement Recorder
//!
//! Shapes the immutable ledger entry for each stock event.
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌──────────────────────────────┐
//! │ MovementType │   │ CostingOutcome │   │ MovementDetails              │
//! │ + Product    │ + │ (cogs if out)  │ + │ tax breakdown, payment,      │
//! │ + quantity   │   │                │   │ reference, notes             │
//! └──────┬───────┘   └───────┬────────┘   └──────────────┬───────────────┘
//!        └───────────────────┼───────────────────────────┘
//!                            ▼
//!                MovementRecorder::record(...)
//!                            │
//!                            ▼
//!          Movement { quantity: ±qty, occurred_at: shared, ... }
//! ```
//!
//! A recorder is created once per transaction so every movement of a
//! multi-line sale or receipt carries the same `occurred_at`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::costing::CostingOutcome;
use crate::money::TaxBreakdown;
use crate::types::{Direction, Movement, MovementType, PaymentMethod, Product};

/// Optional attributes of a movement.
#[derive(Debug, Clone, Default)]
pub struct MovementDetails {
    pub breakdown: Option<TaxBreakdown>,
    pub payment_method: Option<PaymentMethod>,
    pub reference_id: Option<String>,
    pub notes: Option<String>,
}

impl MovementDetails {
    pub fn with_breakdown(mut self, breakdown: TaxBreakdown) -> Self {
        self.breakdown = Some(breakdown);
        self
    }

    pub fn with_payment(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn with_reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    /// Blank notes are dropped.
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes.filter(|n| !n.trim().is_empty());
        self
    }
}

/// Builds movements for one transaction.
#[derive(Debug, Clone)]
pub struct MovementRecorder {
    tenant_id: String,
    occurred_at: DateTime<Utc>,
}

impl MovementRecorder {
    pub fn new(tenant_id: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        MovementRecorder {
            tenant_id: tenant_id.into(),
            occurred_at,
        }
    }

    /// Timestamp shared by every movement of this transaction.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Records one stock event.
    ///
    /// `quantity` is the magnitude of the change; the sign comes from the
    /// movement type. Cost of goods sold is taken from `outcome` and kept
    /// only for outbound movements.
    ///
    /// ## Example
    /// ```rust
    /// use bodega_core::costing::{CostingStrategy, StockPosition, WeightedAverageCost};
    /// use bodega_core::ledger::{MovementDetails, MovementRecorder};
    /// use bodega_core::MovementType;
    /// # use bodega_core::Product;
    /// # fn demo(product: &Product) {
    /// let outcome = WeightedAverageCost
    ///     .apply_outbound(&StockPosition::of(product, &[]), 2)
    ///     .unwrap();
    /// let recorder = MovementRecorder::new(&product.tenant_id, chrono::Utc::now());
    /// let movement = recorder.record(MovementType::Sale, product, 2, &outcome, MovementDetails::default());
    /// assert_eq!(movement.quantity, -2);
    /// # }
    /// ```
    pub fn record(
        &self,
        movement_type: MovementType,
        product: &Product,
        quantity: i64,
        outcome: &CostingOutcome,
        details: MovementDetails,
    ) -> Movement {
        let magnitude = quantity.abs();
        let (quantity, cogs) = match movement_type.direction() {
            Direction::Outbound => (-magnitude, outcome.cost_of_goods_sold),
            Direction::Inbound => (magnitude, None),
        };

        Movement {
            id: Uuid::new_v4().to_string(),
            tenant_id: self.tenant_id.clone(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            occurred_at: self.occurred_at,
            movement_type,
            quantity,
            net_amount_cents: details.breakdown.map(|b| b.net.cents()),
            iva_amount_cents: details.breakdown.map(|b| b.iva.cents()),
            total_amount_cents: details.breakdown.map(|b| b.total.cents()),
            cost_of_goods_sold_cents: cogs.map(|c| c.cents()),
            payment_method: details.payment_method,
            reference_id: details.reference_id,
            notes: details.notes,
        }
    }
}

/// Signed sum of movement quantities for one product.
pub fn movement_total<'a>(product_id: &str, movements: impl IntoIterator<Item = &'a Movement>) -> i64 {
    movements
        .into_iter()
        .filter(|m| m.product_id == product_id)
        .map(|m| m.quantity)
        .sum()
}
