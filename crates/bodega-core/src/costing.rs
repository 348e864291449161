//! # Costing Engine
//!
//! Computes what a stock change does to a product's cost basis, without
//! touching storage. The caller reads the product (and its lots), asks a
//! [`CostingStrategy`] for a [`CostingOutcome`], and writes the outcome back
//! atomically.
//!
//! ## Strategies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  WeightedAverageCost (cpp)          FifoCost (fifo)                     │
//! │  ───────────────────────────        ─────────────────────────────────   │
//! │  inbound:                           inbound:                            │
//! │    stock_value += qty × cost          new lot {qty, qty, date, cost}    │
//! │    stock += qty                       stock += qty                      │
//! │                                                                         │
//! │  outbound:                          outbound:                           │
//! │    cogs = value × qty / stock         walk lots by (date, sequence)     │
//! │    stock_value -= cogs                take min(left, remaining) each    │
//! │    stock -= qty                       cogs = Σ taken × lot cost         │
//! │                                       stock -= qty                      │
//! │                                                                         │
//! │  O(1)                               O(lots)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both strategies keep `stock_value` current, so valuation does not depend
//! on the method. Under FIFO it always equals `Σ remaining × unit_cost`.
//!
//! ## Failure Semantics
//! An error leaves nothing half-applied: the outcome is computed in full
//! before it is returned, and the caller writes it in one transaction.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Batch, InventoryMethod, Product};

// =============================================================================
// Inputs
// =============================================================================

/// Costing state of one product at the start of a stock change.
#[derive(Debug, Clone, Copy)]
pub struct StockPosition<'a> {
    pub product_id: &'a str,
    /// Human label for error messages (SKU or name).
    pub label: &'a str,
    pub stock: i64,
    pub stock_value: Money,
    /// The product's lots. Only consulted by FIFO; any order.
    pub lots: &'a [Batch],
}

impl<'a> StockPosition<'a> {
    pub fn new(
        product_id: &'a str,
        label: &'a str,
        stock: i64,
        stock_value: Money,
        lots: &'a [Batch],
    ) -> Self {
        StockPosition {
            product_id,
            label,
            stock,
            stock_value,
            lots,
        }
    }

    /// Position of a stored product and its lots.
    pub fn of(product: &'a Product, lots: &'a [Batch]) -> Self {
        StockPosition::new(
            &product.id,
            product.label(),
            product.stock,
            product.stock_value(),
            lots,
        )
    }

    /// Sum of lot remainders.
    pub fn lot_total(&self) -> i64 {
        self.lots.iter().map(|b| b.remaining_quantity.max(0)).sum()
    }

    /// Sum of `remaining × unit_cost` over the lots.
    pub fn lot_value(&self) -> Money {
        self.lots
            .iter()
            .filter(|b| !b.is_exhausted())
            .map(Batch::remaining_value)
            .sum()
    }

    fn next_sequence(&self) -> i64 {
        self.lots.iter().map(|b| b.sequence).max().unwrap_or(0) + 1
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// Units drawn from one FIFO lot by an outbound change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotConsumption {
    pub batch_id: String,
    pub quantity: i64,
    pub unit_cost: Money,
    /// Lot remainder before this change (the write guard).
    pub remaining_before: i64,
    pub remaining_after: i64,
}

/// A FIFO lot to be created by an inbound change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLot {
    pub sequence: i64,
    pub purchase_date: NaiveDate,
    pub quantity: i64,
    pub unit_cost: Money,
}

impl NewLot {
    /// Materializes the lot as a stored batch.
    pub fn into_batch(
        self,
        id: impl Into<String>,
        product_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Batch {
        Batch {
            id: id.into(),
            product_id: product_id.into(),
            sequence: self.sequence,
            purchase_date: self.purchase_date,
            initial_quantity: self.quantity,
            remaining_quantity: self.quantity,
            unit_cost_cents: self.unit_cost.cents(),
            created_at,
        }
    }
}

/// Everything a stock change does to a product's costing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostingOutcome {
    pub new_stock: i64,
    pub new_stock_value: Money,
    /// Set for outbound changes only.
    pub cost_of_goods_sold: Option<Money>,
    /// FIFO outbound: lots drawn from, oldest first.
    pub consumed: Vec<LotConsumption>,
    /// FIFO inbound: the lot to create.
    pub new_lot: Option<NewLot>,
}

impl CostingOutcome {
    /// Copies the new stock and value onto a product.
    pub fn apply_to(&self, product: &mut Product) {
        product.stock = self.new_stock;
        product.stock_value_cents = self.new_stock_value.cents();
    }

    /// Applies lot consumption to an in-memory copy of the lots.
    pub fn apply_to_lots(&self, lots: &mut [Batch]) {
        for used in &self.consumed {
            if let Some(lot) = lots.iter_mut().find(|b| b.id == used.batch_id) {
                lot.remaining_quantity = used.remaining_after;
            }
        }
    }
}

// =============================================================================
// Strategy Trait
// =============================================================================

/// A costing policy.
///
/// ## Example
/// ```rust
/// use bodega_core::costing::{CostingStrategy, StockPosition};
/// use bodega_core::{InventoryMethod, Money};
/// use chrono::NaiveDate;
///
/// let strategy = InventoryMethod::Cpp.strategy();
/// let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
///
/// let a = strategy
///     .apply_inbound(&StockPosition::new("p", "P", 0, Money::zero(), &[]), 10, Money::from_cents(100), date)
///     .unwrap();
/// let b = strategy
///     .apply_inbound(&StockPosition::new("p", "P", a.new_stock, a.new_stock_value, &[]), 10, Money::from_cents(200), date)
///     .unwrap();
/// let out = strategy
///     .apply_outbound(&StockPosition::new("p", "P", b.new_stock, b.new_stock_value, &[]), 5)
///     .unwrap();
///
/// assert_eq!(out.cost_of_goods_sold, Some(Money::from_cents(750)));
/// assert_eq!(out.new_stock, 15);
/// assert_eq!(out.new_stock_value.cents(), 2250);
/// ```
pub trait CostingStrategy: Send + Sync {
    fn method(&self) -> InventoryMethod;

    /// Stock entering at `unit_cost`, purchased on `purchase_date`.
    fn apply_inbound(
        &self,
        position: &StockPosition<'_>,
        quantity: i64,
        unit_cost: Money,
        purchase_date: NaiveDate,
    ) -> CoreResult<CostingOutcome>;

    /// Stock leaving. Fails with `InsufficientStock` when `quantity > stock`.
    fn apply_outbound(
        &self,
        position: &StockPosition<'_>,
        quantity: i64,
    ) -> CoreResult<CostingOutcome>;
}

impl InventoryMethod {
    /// Strategy implementing this method.
    pub fn strategy(self) -> &'static dyn CostingStrategy {
        match self {
            InventoryMethod::Cpp => &WeightedAverageCost,
            InventoryMethod::Fifo => &FifoCost,
        }
    }
}

fn check_quantity(quantity: i64) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity { quantity });
    }
    Ok(())
}

fn check_inbound(quantity: i64, unit_cost: Money) -> CoreResult<()> {
    check_quantity(quantity)?;
    if unit_cost.is_negative() {
        return Err(CoreError::InsufficientDataForCosting {
            reason: format!("unit cost {} is negative", unit_cost.cents()),
        });
    }
    Ok(())
}

/// Stock and value after `quantity` units enter at `unit_cost`.
fn inbound_totals(
    position: &StockPosition<'_>,
    quantity: i64,
    unit_cost: Money,
) -> CoreResult<(i64, Money)> {
    check_inbound(quantity, unit_cost)?;

    let stock = position
        .stock
        .checked_add(quantity)
        .ok_or(CoreError::InvalidQuantity { quantity })?;
    let value = unit_cost
        .checked_multiply_quantity(quantity)
        .and_then(|entering| position.stock_value.checked_add(entering))
        .ok_or_else(|| CoreError::InsufficientDataForCosting {
            reason: format!(
                "{quantity} units at {} cents overflow the stock value",
                unit_cost.cents()
            ),
        })?;
    Ok((stock, value))
}

fn check_outbound(position: &StockPosition<'_>, quantity: i64) -> CoreResult<()> {
    check_quantity(quantity)?;
    if quantity > position.stock {
        return Err(CoreError::InsufficientStock {
            product: position.label.to_string(),
            available: position.stock,
            requested: quantity,
        });
    }
    Ok(())
}

// =============================================================================
// Weighted Average Cost
// =============================================================================

/// Weighted average cost ("cpp"): one blended unit cost for all stock.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedAverageCost;

impl CostingStrategy for WeightedAverageCost {
    fn method(&self) -> InventoryMethod {
        InventoryMethod::Cpp
    }

    fn apply_inbound(
        &self,
        position: &StockPosition<'_>,
        quantity: i64,
        unit_cost: Money,
        _purchase_date: NaiveDate,
    ) -> CoreResult<CostingOutcome> {
        let (new_stock, new_stock_value) = inbound_totals(position, quantity, unit_cost)?;

        Ok(CostingOutcome {
            new_stock,
            new_stock_value,
            cost_of_goods_sold: None,
            consumed: Vec::new(),
            new_lot: None,
        })
    }

    fn apply_outbound(
        &self,
        position: &StockPosition<'_>,
        quantity: i64,
    ) -> CoreResult<CostingOutcome> {
        check_outbound(position, quantity)?;

        // Prorating the pool (rather than rounding a unit cost first) makes
        // the last unit out carry exactly what is left.
        let cogs = position.stock_value.prorate(quantity, position.stock);

        Ok(CostingOutcome {
            new_stock: position.stock - quantity,
            new_stock_value: position.stock_value - cogs,
            cost_of_goods_sold: Some(cogs),
            consumed: Vec::new(),
            new_lot: None,
        })
    }
}

// =============================================================================
// FIFO
// =============================================================================

/// First-in-first-out lot costing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FifoCost;

/// Lots in consumption order: purchase date, then creation sequence.
pub fn fifo_order(lots: &[Batch]) -> Vec<&Batch> {
    let mut ordered: Vec<&Batch> = lots.iter().collect();
    ordered.sort_by(|a, b| {
        a.purchase_date
            .cmp(&b.purchase_date)
            .then(a.sequence.cmp(&b.sequence))
            .then_with(|| a.id.cmp(&b.id))
    });
    ordered
}

impl CostingStrategy for FifoCost {
    fn method(&self) -> InventoryMethod {
        InventoryMethod::Fifo
    }

    fn apply_inbound(
        &self,
        position: &StockPosition<'_>,
        quantity: i64,
        unit_cost: Money,
        purchase_date: NaiveDate,
    ) -> CoreResult<CostingOutcome> {
        let (new_stock, new_stock_value) = inbound_totals(position, quantity, unit_cost)?;

        Ok(CostingOutcome {
            new_stock,
            new_stock_value,
            cost_of_goods_sold: None,
            consumed: Vec::new(),
            new_lot: Some(NewLot {
                sequence: position.next_sequence(),
                purchase_date,
                quantity,
                unit_cost,
            }),
        })
    }

    fn apply_outbound(
        &self,
        position: &StockPosition<'_>,
        quantity: i64,
    ) -> CoreResult<CostingOutcome> {
        check_outbound(position, quantity)?;

        let mut left = quantity;
        let mut cogs = Money::zero();
        let mut consumed = Vec::new();

        for lot in fifo_order(position.lots) {
            if left == 0 {
                break;
            }
            if lot.is_exhausted() {
                continue;
            }
            let take = left.min(lot.remaining_quantity);
            cogs += lot.unit_cost().multiply_quantity(take);
            left -= take;
            consumed.push(LotConsumption {
                batch_id: lot.id.clone(),
                quantity: take,
                unit_cost: lot.unit_cost(),
                remaining_before: lot.remaining_quantity,
                remaining_after: lot.remaining_quantity - take,
            });
        }

        if left > 0 {
            return Err(CoreError::StockInconsistency {
                product_id: position.product_id.to_string(),
                recorded_stock: position.stock,
                lot_total: position.lot_total(),
            });
        }
        if cogs > position.stock_value {
            return Err(CoreError::ValuationInconsistency {
                product_id: position.product_id.to_string(),
                stock_value_cents: position.stock_value.cents(),
                lot_value_cents: position.lot_value().cents(),
            });
        }

        Ok(CostingOutcome {
            new_stock: position.stock - quantity,
            new_stock_value: position.stock_value - cogs,
            cost_of_goods_sold: Some(cogs),
            consumed,
            new_lot: None,
        })
    }
}

/// Rebuilds the lots of a product whose lots no longer match its stock,
/// e.g. after the tenant switches from weighted average to FIFO.
///
/// Every open lot is closed. When there is stock, one lot holding all of
/// it at the current average cost is opened on `as_of`; a sold-out product
/// is left with no open lot and zero value. Returns `None` when the lots
/// already reconcile (units and value).
pub fn rebase_lots(position: &StockPosition<'_>, as_of: NaiveDate) -> Option<CostingOutcome> {
    let reconciled =
        position.lot_total() == position.stock && position.lot_value() == position.stock_value;
    if reconciled {
        return None;
    }

    let consumed = position
        .lots
        .iter()
        .filter(|b| !b.is_exhausted())
        .map(|b| LotConsumption {
            batch_id: b.id.clone(),
            quantity: b.remaining_quantity,
            unit_cost: b.unit_cost(),
            remaining_before: b.remaining_quantity,
            remaining_after: 0,
        })
        .collect();

    if position.stock <= 0 {
        return Some(CostingOutcome {
            new_stock: position.stock,
            new_stock_value: Money::zero(),
            cost_of_goods_sold: None,
            consumed,
            new_lot: None,
        });
    }

    let unit_cost = position.stock_value.prorate(1, position.stock);
    Some(CostingOutcome {
        new_stock: position.stock,
        new_stock_value: unit_cost.multiply_quantity(position.stock),
        cost_of_goods_sold: None,
        consumed,
        new_lot: Some(NewLot {
            sequence: position.next_sequence(),
            purchase_date: as_of,
            quantity: position.stock,
            unit_cost,
        }),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lot(id: &str, sequence: i64, purchase_date: NaiveDate, remaining: i64, cost: i64) -> Batch {
        Batch {
            id: id.to_string(),
            product_id: "p".to_string(),
            sequence,
            purchase_date,
            initial_quantity: remaining.max(5),
            remaining_quantity: remaining,
            unit_cost_cents: cost,
            created_at: Utc::now(),
        }
    }

    fn empty() -> StockPosition<'static> {
        StockPosition::new("p", "COFFEE", 0, Money::zero(), &[])
    }

    #[test]
    fn test_wac_averaging() {
        let wac = WeightedAverageCost;
        let d = date(2024, 3, 1);

        let first = wac.apply_inbound(&empty(), 10, Money::from_cents(100), d).unwrap();
        assert_eq!(first.new_stock, 10);
        assert_eq!(first.new_stock_value.cents(), 1000);

        let pos = StockPosition::new("p", "COFFEE", first.new_stock, first.new_stock_value, &[]);
        let second = wac.apply_inbound(&pos, 10, Money::from_cents(200), d).unwrap();
        assert_eq!(second.new_stock, 20);
        assert_eq!(second.new_stock_value.cents(), 3000);

        let pos = StockPosition::new("p", "COFFEE", second.new_stock, second.new_stock_value, &[]);
        let out = wac.apply_outbound(&pos, 5).unwrap();
        assert_eq!(out.cost_of_goods_sold, Some(Money::from_cents(750)));
        assert_eq!(out.new_stock, 15);
        assert_eq!(out.new_stock_value.cents(), 2250);
        assert!(out.new_lot.is_none());
    }

    #[test]
    fn test_wac_selling_everything_leaves_zero_value() {
        let wac = WeightedAverageCost;
        let mut stock = 3;
        let mut value = Money::from_cents(1000);

        for _ in 0..3 {
            let out = wac
                .apply_outbound(&StockPosition::new("p", "P", stock, value, &[]), 1)
                .unwrap();
            stock = out.new_stock;
            value = out.new_stock_value;
            assert!(!value.is_negative());
        }
        assert_eq!(stock, 0);
        assert!(value.is_zero());
    }

    #[test]
    fn test_insufficient_stock_rejected() {
        let pos = StockPosition::new("p", "COFFEE", 3, Money::from_cents(300), &[]);
        for strategy in [InventoryMethod::Cpp.strategy(), InventoryMethod::Fifo.strategy()] {
            let err = strategy.apply_outbound(&pos, 5).unwrap_err();
            assert!(matches!(
                err,
                CoreError::InsufficientStock {
                    available: 3,
                    requested: 5,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let d = date(2024, 3, 1);
        for strategy in [InventoryMethod::Cpp.strategy(), InventoryMethod::Fifo.strategy()] {
            assert!(matches!(
                strategy.apply_inbound(&empty(), 0, Money::from_cents(1), d),
                Err(CoreError::InvalidQuantity { quantity: 0 })
            ));
            assert!(matches!(
                strategy.apply_outbound(&empty(), -2),
                Err(CoreError::InvalidQuantity { quantity: -2 })
            ));
        }
    }

    #[test]
    fn test_negative_unit_cost_rejected() {
        let err = FifoCost
            .apply_inbound(&empty(), 1, Money::from_cents(-1), date(2024, 1, 1))
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientDataForCosting { .. }));
    }

    #[test]
    fn test_fifo_inbound_creates_lot() {
        let existing = [lot("a", 1, date(2024, 1, 1), 5, 100)];
        let pos = StockPosition::new("p", "P", 5, Money::from_cents(500), &existing);
        let out = FifoCost
            .apply_inbound(&pos, 4, Money::from_cents(120), date(2024, 2, 1))
            .unwrap();

        assert_eq!(out.new_stock, 9);
        assert_eq!(out.new_stock_value.cents(), 980);
        let new_lot = out.new_lot.unwrap();
        assert_eq!(new_lot.sequence, 2);
        assert_eq!(new_lot.quantity, 4);
        assert_eq!(new_lot.purchase_date, date(2024, 2, 1));
    }

    #[test]
    fn test_fifo_ordering_determinism() {
        // Stored out of order on purpose
        let lots = [
            lot("b3", 3, date(2024, 3, 1), 5, 300),
            lot("b1", 1, date(2024, 1, 1), 5, 100),
            lot("b2", 2, date(2024, 2, 1), 5, 200),
        ];
        let pos = StockPosition::new("p", "P", 15, Money::from_cents(3000), &lots);
        let out = FifoCost.apply_outbound(&pos, 7).unwrap();

        assert_eq!(out.cost_of_goods_sold, Some(Money::from_cents(5 * 100 + 2 * 200)));
        assert_eq!(out.new_stock, 8);
        assert_eq!(out.new_stock_value.cents(), 3000 - 900);

        let mut after = lots.clone();
        out.apply_to_lots(&mut after);
        let remaining: Vec<(String, i64)> = fifo_order(&after)
            .into_iter()
            .map(|b| (b.id.clone(), b.remaining_quantity))
            .collect();
        assert_eq!(
            remaining,
            vec![
                ("b1".to_string(), 0),
                ("b2".to_string(), 3),
                ("b3".to_string(), 5)
            ]
        );
    }

    #[test]
    fn test_fifo_equal_dates_break_ties_by_sequence() {
        let d = date(2024, 5, 5);
        let lots = [lot("late", 2, d, 4, 900), lot("early", 1, d, 4, 100)];
        let pos = StockPosition::new("p", "P", 8, Money::from_cents(4000), &lots);
        let out = FifoCost.apply_outbound(&pos, 4).unwrap();

        assert_eq!(out.consumed.len(), 1);
        assert_eq!(out.consumed[0].batch_id, "early");
        assert_eq!(out.cost_of_goods_sold, Some(Money::from_cents(400)));
    }

    #[test]
    fn test_fifo_skips_exhausted_lots() {
        let lots = [
            lot("gone", 1, date(2024, 1, 1), 0, 50),
            lot("open", 2, date(2024, 2, 1), 5, 200),
        ];
        let pos = StockPosition::new("p", "P", 5, Money::from_cents(1000), &lots);
        let out = FifoCost.apply_outbound(&pos, 2).unwrap();

        assert_eq!(out.consumed.len(), 1);
        assert_eq!(out.consumed[0].batch_id, "open");
        assert_eq!(out.consumed[0].remaining_before, 5);
        assert_eq!(out.consumed[0].remaining_after, 3);
    }

    #[test]
    fn test_fifo_stock_inconsistency() {
        // Recorded stock claims 10, lots only hold 7
        let lots = [
            lot("a", 1, date(2024, 1, 1), 4, 100),
            lot("b", 2, date(2024, 1, 2), 3, 100),
        ];
        let pos = StockPosition::new("p", "P", 10, Money::from_cents(1000), &lots);
        let err = FifoCost.apply_outbound(&pos, 9).unwrap_err();

        assert!(matches!(
            err,
            CoreError::StockInconsistency {
                recorded_stock: 10,
                lot_total: 7,
                ..
            }
        ));
    }

    #[test]
    fn test_rebase_lots_after_method_switch() {
        // Bought under weighted average: no lots at all
        let pos = StockPosition::new("p", "P", 4, Money::from_cents(1000), &[]);
        let out = rebase_lots(&pos, date(2024, 6, 1)).unwrap();

        let new_lot = out.new_lot.unwrap();
        assert_eq!(new_lot.quantity, 4);
        assert_eq!(new_lot.unit_cost.cents(), 250);
        assert_eq!(out.new_stock, 4);
        assert_eq!(out.new_stock_value.cents(), 1000);
    }

    #[test]
    fn test_rebase_lots_noop_when_reconciled() {
        let lots = [lot("a", 1, date(2024, 1, 1), 5, 100)];
        let pos = StockPosition::new("p", "P", 5, Money::from_cents(500), &lots);
        assert!(rebase_lots(&pos, date(2024, 6, 1)).is_none());
    }

    #[test]
    fn test_rebase_lots_closes_lots_of_sold_out_product() {
        // Sold out under weighted average while a FIFO lot stayed open
        let lots = [lot("stale", 1, date(2024, 1, 1), 5, 100)];
        let pos = StockPosition::new("p", "P", 0, Money::zero(), &lots);
        let out = rebase_lots(&pos, date(2024, 6, 1)).unwrap();

        assert_eq!(out.consumed.len(), 1);
        assert_eq!(out.consumed[0].batch_id, "stale");
        assert_eq!(out.consumed[0].remaining_after, 0);
        assert!(out.new_lot.is_none());
        assert_eq!(out.new_stock, 0);
        assert!(out.new_stock_value.is_zero());
    }

    #[test]
    fn test_rebase_lots_noop_when_sold_out_and_closed() {
        let lots = [lot("done", 1, date(2024, 1, 1), 0, 100)];
        let pos = StockPosition::new("p", "P", 0, Money::zero(), &lots);
        assert!(rebase_lots(&pos, date(2024, 6, 1)).is_none());
        assert!(rebase_lots(&empty(), date(2024, 6, 1)).is_none());
    }

    #[test]
    fn test_inbound_overflow_is_rejected() {
        let d = date(2024, 1, 1);
        for strategy in [InventoryMethod::Cpp.strategy(), InventoryMethod::Fifo.strategy()] {
            let err = strategy
                .apply_inbound(&empty(), 10_000_000_000, Money::from_cents(10_000_000_000), d)
                .unwrap_err();
            assert!(matches!(err, CoreError::InsufficientDataForCosting { .. }));

            let full = StockPosition::new("p", "P", i64::MAX, Money::zero(), &[]);
            let err = strategy.apply_inbound(&full, 1, Money::zero(), d).unwrap_err();
            assert!(matches!(err, CoreError::InvalidQuantity { quantity: 1 }));
        }
    }

    #[test]
    fn test_fifo_lots_worth_more_than_stock_value_abort() {
        let lots = [lot("a", 1, date(2024, 1, 1), 5, 100)];
        // Units agree, value does not: lots hold 500
        let pos = StockPosition::new("p", "P", 5, Money::from_cents(200), &lots);
        let err = FifoCost.apply_outbound(&pos, 3).unwrap_err();

        assert!(matches!(
            err,
            CoreError::ValuationInconsistency {
                stock_value_cents: 200,
                lot_value_cents: 500,
                ..
            }
        ));
    }

    #[test]
    fn test_rebase_lots_closes_stale_lots() {
        let lots = [lot("stale", 1, date(2024, 1, 1), 9, 100)];
        let pos = StockPosition::new("p", "P", 3, Money::from_cents(300), &lots);
        let out = rebase_lots(&pos, date(2024, 6, 1)).unwrap();

        assert_eq!(out.consumed.len(), 1);
        assert_eq!(out.consumed[0].remaining_after, 0);
        assert_eq!(out.new_lot.unwrap().sequence, 2);
    }
}
