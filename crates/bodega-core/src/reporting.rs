//! # Reporting Aggregator
//!
//! Read-side summaries over movement and product snapshots. Every function
//! here takes borrowed slices and returns a new value; nothing is mutated.
//!
//! ```text
//! Movement ledger ──┬──► monthly_vat            output IVA − input IVA
//!                   ├──► top_selling            units per product, top N
//!                   └──► sales_vs_purchases     Σ totals per family
//!
//! Product snapshot ─┬──► valuation_by_category  Σ stock value per category
//!                   ├──► stock_alerts           low / overstock
//!                   └──► expiring_within        best-before in window
//!
//! Both + lots ──────────► reconcile             ledger vs stock vs lots
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::ledger::movement_total;
use crate::money::Money;
use crate::types::{Batch, Movement, MovementType, Product};

/// Label for products without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

// =============================================================================
// Periods
// =============================================================================

/// A calendar month in UTC, as the half-open range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthPeriod {
    pub year: i32,
    pub month: u32,
}

impl MonthPeriod {
    pub fn new(year: i32, month: u32) -> CoreResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::OutOfRange {
                field: "month".to_string(),
                min: 1,
                max: 12,
            }
            .into());
        }
        let period = MonthPeriod { year, month };
        if period.bounds().is_none() {
            return Err(ValidationError::OutOfRange {
                field: "year".to_string(),
                min: i64::from(NaiveDate::MIN.year()),
                max: i64::from(NaiveDate::MAX.year()) - 1,
            }
            .into());
        }
        Ok(period)
    }

    /// The month containing `at`.
    pub fn containing(at: DateTime<Utc>) -> Self {
        MonthPeriod {
            year: at.year(),
            month: at.month(),
        }
    }

    /// `[start, end)`, or `None` when either end is outside chrono's range.
    fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = first_instant(self.year, self.month)?;
        let end = if self.month == 12 {
            first_instant(self.year.checked_add(1)?, 1)?
        } else {
            first_instant(self.year, self.month + 1)?
        };
        Some((start, end))
    }

    /// Periods built with [`MonthPeriod::new`] or [`MonthPeriod::containing`]
    /// always have bounds; any other is an empty range at the end of time.
    pub fn start(&self) -> DateTime<Utc> {
        self.bounds().map_or(DateTime::<Utc>::MAX_UTC, |(start, _)| start)
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.bounds().map_or(DateTime::<Utc>::MAX_UTC, |(_, end)| end)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start() && at < self.end()
    }
}

fn first_instant(year: i32, month: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}

// =============================================================================
// VAT
// =============================================================================

/// Monthly IVA position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VatReport {
    pub period: MonthPeriod,
    /// IVA charged on sales.
    pub output_vat_cents: i64,
    /// IVA paid on purchases.
    pub input_vat_cents: i64,
    /// Output minus input. Negative is a credit for the period.
    pub vat_payable_cents: i64,
}

/// Sums IVA of the period's sale and purchase movements.
pub fn monthly_vat(movements: &[Movement], period: MonthPeriod) -> VatReport {
    let in_period = move || movements.iter().filter(move |m| period.contains(m.occurred_at));

    let output: Money = in_period()
        .filter(|m| m.movement_type.is_sale_family())
        .map(Movement::iva)
        .sum();
    let input: Money = in_period()
        .filter(|m| m.movement_type.is_purchase_family())
        .map(Movement::iva)
        .sum();

    VatReport {
        period,
        output_vat_cents: output.cents(),
        input_vat_cents: input.cents(),
        vat_payable_cents: (output - input).cents(),
    }
}

// =============================================================================
// Valuation
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryValuation {
    pub category: String,
    pub units: i64,
    pub value_cents: i64,
}

/// Stock value per category at snapshot time, highest value first.
///
/// A product's value is `stock × average cost`, which is its
/// `stock_value_cents`. Categories worth nothing are omitted.
pub fn valuation_by_category(products: &[Product]) -> Vec<CategoryValuation> {
    let mut groups: HashMap<String, (i64, Money)> = HashMap::new();

    for p in products {
        let category = p
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED);
        let entry = groups
            .entry(category.to_string())
            .or_insert((0, Money::zero()));
        entry.0 += p.stock;
        entry.1 += p.stock_value();
    }

    let mut rows: Vec<CategoryValuation> = groups
        .into_iter()
        .filter(|(_, (_, value))| value.is_positive())
        .map(|(category, (units, value))| CategoryValuation {
            category,
            units,
            value_cents: value.cents(),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.value_cents
            .cmp(&a.value_cents)
            .then_with(|| a.category.cmp(&b.category))
    });
    rows
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TopSeller {
    pub product_id: String,
    pub product_name: String,
    pub units_sold: i64,
    pub revenue_cents: i64,
}

/// Best selling products of the period by units, at most `limit`.
pub fn top_selling(movements: &[Movement], period: MonthPeriod, limit: usize) -> Vec<TopSeller> {
    let mut by_product: HashMap<&str, TopSeller> = HashMap::new();

    for m in movements
        .iter()
        .filter(|m| m.movement_type == MovementType::Sale && period.contains(m.occurred_at))
    {
        let row = by_product.entry(m.product_id.as_str()).or_insert_with(|| TopSeller {
            product_id: m.product_id.clone(),
            product_name: m.product_name.clone(),
            units_sold: 0,
            revenue_cents: 0,
        });
        row.units_sold += -m.quantity;
        row.revenue_cents += m.total_amount_cents.unwrap_or(0);
    }

    let mut rows: Vec<TopSeller> = by_product.into_values().collect();
    rows.sort_by(|a, b| {
        b.units_sold
            .cmp(&a.units_sold)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    rows.truncate(limit);
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesVsPurchases {
    pub period: MonthPeriod,
    pub sales_total_cents: i64,
    pub purchases_total_cents: i64,
}

/// Gross (IVA included) sales and purchases of the period.
pub fn sales_vs_purchases(movements: &[Movement], period: MonthPeriod) -> SalesVsPurchases {
    let mut sales = Money::zero();
    let mut purchases = Money::zero();
    for m in movements.iter().filter(|m| period.contains(m.occurred_at)) {
        if m.movement_type.is_sale_family() {
            sales += m.total();
        } else if m.movement_type.is_purchase_family() {
            purchases += m.total();
        }
    }
    SalesVsPurchases {
        period,
        sales_total_cents: sales.cents(),
        purchases_total_cents: purchases.cents(),
    }
}

// =============================================================================
// Alerts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAlerts {
    /// At or below the minimum, lowest stock first.
    pub low_stock: Vec<Product>,
    /// At or above a non-zero maximum, highest stock first.
    pub overstock: Vec<Product>,
}

/// Threshold alerts over active products.
pub fn stock_alerts(products: &[Product]) -> StockAlerts {
    let active = move || products.iter().filter(|p| p.is_active);

    let mut low_stock: Vec<Product> = active().filter(|p| p.is_low_stock()).cloned().collect();
    low_stock.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));

    let mut overstock: Vec<Product> = active().filter(|p| p.is_overstocked()).cloned().collect();
    overstock.sort_by(|a, b| b.stock.cmp(&a.stock).then_with(|| a.name.cmp(&b.name)));

    StockAlerts {
        low_stock,
        overstock,
    }
}

/// Active products whose best-before date falls in `[today, today + days]`,
/// soonest first. Already expired products are not included.
pub fn expiring_within(products: &[Product], today: NaiveDate, days: i64) -> Vec<Product> {
    let horizon = today + Duration::days(days.max(0));
    let mut rows: Vec<Product> = products
        .iter()
        .filter(|p| p.is_active)
        .filter(|p| matches!(p.expiration_date, Some(d) if d >= today && d <= horizon))
        .cloned()
        .collect();
    rows.sort_by(|a, b| {
        a.expiration_date
            .cmp(&b.expiration_date)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Ledger and lot agreement for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reconciliation {
    pub product_id: String,
    pub product_name: String,
    pub stock: i64,
    /// Signed sum of the product's movements.
    pub movement_total: i64,
    pub stock_value_cents: i64,
    /// Σ remaining over lots, when lots are checked.
    pub lot_total: Option<i64>,
    /// Σ remaining × cost over lots, when lots are checked.
    pub lot_value_cents: Option<i64>,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.movement_total == self.stock
            && self.lot_total.map_or(true, |t| t == self.stock)
            && self
                .lot_value_cents
                .map_or(true, |v| v == self.stock_value_cents)
    }
}

/// Checks a product against its movements and, under FIFO, its lots.
pub fn reconcile(product: &Product, movements: &[Movement], lots: Option<&[Batch]>) -> Reconciliation {
    let open = |lots: &[Batch]| -> (i64, Money) {
        lots.iter()
            .filter(|b| !b.is_exhausted())
            .fold((0, Money::zero()), |(units, value), b| {
                (units + b.remaining_quantity, value + b.remaining_value())
            })
    };
    let lot_summary = lots.map(open);

    Reconciliation {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        stock: product.stock,
        movement_total: movement_total(&product.id, movements),
        stock_value_cents: product.stock_value_cents,
        lot_total: lot_summary.map(|(units, _)| units),
        lot_value_cents: lot_summary.map(|(_, value)| value.cents()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::types::PaymentMethod;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn movement(kind: MovementType, product: &str, qty: i64, iva: i64, total: i64, when: DateTime<Utc>) -> Movement {
        Movement {
            id: format!("{product}-{qty}-{iva}"),
            tenant_id: "t".to_string(),
            product_id: product.to_string(),
            product_name: product.to_uppercase(),
            occurred_at: when,
            movement_type: kind,
            quantity: qty,
            net_amount_cents: Some(total - iva),
            iva_amount_cents: Some(iva),
            total_amount_cents: Some(total),
            cost_of_goods_sold_cents: None,
            payment_method: Some(PaymentMethod::Cash),
            reference_id: None,
            notes: None,
        }
    }

    fn product(id: &str, category: Option<&str>, stock: i64, value: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            tenant_id: "t".to_string(),
            sku: None,
            barcode: None,
            name: id.to_string(),
            description: None,
            category: category.map(str::to_string),
            sale_price_cents: 0,
            purchase_price_cents: 0,
            stock,
            stock_value_cents: value,
            min_stock_threshold: 5,
            max_stock_threshold: 100,
            expiration_date: None,
            is_active: true,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[test]
    fn test_month_period_bounds() {
        let march = MonthPeriod::new(2024, 3).unwrap();
        assert!(march.contains(at(2024, 3, 1)));
        assert!(march.contains(at(2024, 3, 31)));
        assert!(!march.contains(march.end()));
        assert!(!march.contains(at(2024, 2, 29)));

        let december = MonthPeriod::new(2024, 12).unwrap();
        assert_eq!(december.end(), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());

        assert!(MonthPeriod::new(2024, 13).is_err());
        assert!(MonthPeriod::new(2024, 0).is_err());
    }

    #[test]
    fn test_month_period_rejects_unrepresentable_year() {
        for year in [i32::MAX, i32::MIN, NaiveDate::MAX.year()] {
            let err = MonthPeriod::new(year, 12).unwrap_err();
            assert!(matches!(
                err,
                CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "year"
            ));
        }
        assert!(MonthPeriod::new(NaiveDate::MAX.year() - 1, 12).is_ok());
    }

    #[test]
    fn test_vat_round_trip() {
        let period = MonthPeriod::new(2024, 3).unwrap();
        let movements = vec![
            movement(MovementType::Sale, "a", -1, 190, 1190, at(2024, 3, 10)),
            movement(MovementType::PurchaseOrderReceipt, "a", 5, 100, 626, at(2024, 3, 11)),
        ];
        let report = monthly_vat(&movements, period);
        assert_eq!(report.output_vat_cents, 190);
        assert_eq!(report.input_vat_cents, 100);
        assert_eq!(report.vat_payable_cents, 90);
    }

    #[test]
    fn test_vat_ignores_other_months_and_adjustments() {
        let period = MonthPeriod::new(2024, 3).unwrap();
        let movements = vec![
            movement(MovementType::Sale, "a", -1, 190, 1190, at(2024, 4, 1)),
            movement(MovementType::AdjustmentIn, "a", 1, 50, 50, at(2024, 3, 5)),
            movement(MovementType::PurchaseEntry, "a", 3, 400, 2500, at(2024, 3, 5)),
        ];
        let report = monthly_vat(&movements, period);
        assert_eq!(report.output_vat_cents, 0);
        assert_eq!(report.input_vat_cents, 400);
        assert_eq!(report.vat_payable_cents, -400);
    }

    #[test]
    fn test_valuation_by_category() {
        let products = vec![
            product("a", Some("Pantry"), 10, 1000),
            product("b", Some("Pantry"), 5, 500),
            product("c", None, 2, 4000),
            product("d", Some("Drinks"), 0, 0),
        ];
        let rows = valuation_by_category(&products);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, UNCATEGORIZED);
        assert_eq!(rows[0].value_cents, 4000);
        assert_eq!(rows[1].category, "Pantry");
        assert_eq!(rows[1].units, 15);
        assert_eq!(rows[1].value_cents, 1500);
    }

    #[test]
    fn test_top_selling() {
        let period = MonthPeriod::new(2024, 3).unwrap();
        let movements = vec![
            movement(MovementType::Sale, "a", -2, 0, 200, at(2024, 3, 1)),
            movement(MovementType::Sale, "b", -5, 0, 500, at(2024, 3, 2)),
            movement(MovementType::Sale, "a", -1, 0, 100, at(2024, 3, 3)),
            movement(MovementType::Shrinkage, "c", -9, 0, 0, at(2024, 3, 3)),
        ];
        let top = top_selling(&movements, period, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].product_id, "b");
        assert_eq!(top[0].units_sold, 5);

        let all = top_selling(&movements, period, 10);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].units_sold, 3);
        assert_eq!(all[1].revenue_cents, 300);
    }

    #[test]
    fn test_sales_vs_purchases() {
        let period = MonthPeriod::new(2024, 3).unwrap();
        let movements = vec![
            movement(MovementType::Sale, "a", -1, 190, 1190, at(2024, 3, 1)),
            movement(MovementType::PurchaseEntry, "a", 1, 95, 595, at(2024, 3, 1)),
            movement(MovementType::PurchaseOrderReceipt, "a", 1, 95, 595, at(2024, 3, 1)),
        ];
        let totals = sales_vs_purchases(&movements, period);
        assert_eq!(totals.sales_total_cents, 1190);
        assert_eq!(totals.purchases_total_cents, 1190);
    }

    #[test]
    fn test_stock_alerts() {
        let mut inactive = product("gone", None, 0, 0);
        inactive.is_active = false;
        let products = vec![
            product("low2", None, 2, 0),
            product("low0", None, 0, 0),
            product("ok", None, 50, 0),
            product("over", None, 150, 0),
            product("way_over", None, 400, 0),
            inactive,
        ];
        let alerts = stock_alerts(&products);

        let low: Vec<&str> = alerts.low_stock.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(low, vec!["low0", "low2"]);
        let over: Vec<&str> = alerts.overstock.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(over, vec!["way_over", "over"]);
    }

    #[test]
    fn test_overstock_disabled_by_zero_max() {
        let mut p = product("big", None, 1000, 0);
        p.max_stock_threshold = 0;
        assert!(stock_alerts(&[p]).overstock.is_empty());
    }

    #[test]
    fn test_expiring_within() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let mut soon = product("soon", None, 1, 0);
        soon.expiration_date = Some(today + Duration::days(3));
        let mut sooner = product("sooner", None, 1, 0);
        sooner.expiration_date = Some(today);
        let mut expired = product("expired", None, 1, 0);
        expired.expiration_date = Some(today - Duration::days(1));
        let mut later = product("later", None, 1, 0);
        later.expiration_date = Some(today + Duration::days(60));

        let rows = expiring_within(&[soon, sooner, expired, later], today, 30);
        let ids: Vec<&str> = rows.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["sooner", "soon"]);
    }

    #[test]
    fn test_reconcile() {
        let p = product("a", None, 3, 300);
        let movements = vec![
            movement(MovementType::OpeningBalance, "a", 5, 0, 0, at(2024, 3, 1)),
            movement(MovementType::Sale, "a", -2, 0, 0, at(2024, 3, 2)),
            movement(MovementType::Sale, "other", -9, 0, 0, at(2024, 3, 2)),
        ];
        let lots = vec![Batch {
            id: "l".to_string(),
            product_id: "a".to_string(),
            sequence: 1,
            purchase_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            initial_quantity: 5,
            remaining_quantity: 3,
            unit_cost_cents: 100,
            created_at: Utc::now(),
        }];

        let check = reconcile(&p, &movements, Some(lots.as_slice()));
        assert_eq!(check.movement_total, 3);
        assert_eq!(check.lot_total, Some(3));
        assert_eq!(check.lot_value_cents, Some(300));
        assert!(check.is_consistent());

        let drifted = product("a", None, 4, 300);
        assert!(!reconcile(&drifted, &movements, None).is_consistent());
    }
}
