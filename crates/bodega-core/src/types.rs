//! # Domain Types
//!
//! Core domain types used throughout Bodega.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │1 *│     Batch       │   │    Movement     │       │
//! │  │  ─────────────  │──►│  ─────────────  │   │  ─────────────  │       │
//! │  │  stock          │   │  purchase_date  │   │  movement_type  │       │
//! │  │  stock_value    │   │  sequence       │   │  quantity (±)   │       │
//! │  │  purchase_price │   │  remaining      │   │  net/iva/total  │       │
//! │  │  version        │   │  unit_cost      │   │  cogs (out)     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ PurchaseOrder   │   │    Supplier     │   │    Settings     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  status         │──►│  name           │   │ inventory_method│       │
//! │  │  items[]        │   │  contact        │   │  cpp | fifo     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership Rules
//! - A Batch belongs to exactly one Product and only exists under FIFO.
//! - A Movement is append-only and references its Product by id, with the
//!   product name frozen at the time of the event.
//! - A PurchaseOrder moves Pending → Received once and is frozen after.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1900 bps = 19% (IVA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Inventory Method
// =============================================================================

/// Costing policy for a tenant's stock.
///
/// Stored in [`Settings`] as `"cpp"` or `"fifo"` and resolved to a
/// [`crate::costing::CostingStrategy`] once per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InventoryMethod {
    /// Weighted average cost ("costo promedio ponderado").
    Cpp,
    /// First-in-first-out lot costing.
    Fifo,
}

impl InventoryMethod {
    /// Stable string form used in settings and configuration.
    pub const fn as_str(&self) -> &'static str {
        match self {
            InventoryMethod::Cpp => "cpp",
            InventoryMethod::Fifo => "fifo",
        }
    }
}

impl Default for InventoryMethod {
    fn default() -> Self {
        InventoryMethod::Cpp
    }
}

impl fmt::Display for InventoryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpp" | "wac" => Ok(InventoryMethod::Cpp),
            "fifo" => Ok(InventoryMethod::Fifo),
            _ => Err(ValidationError::NotAllowed {
                field: "inventory_method".to_string(),
                allowed: vec!["cpp".to_string(), "fifo".to_string()],
            }),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A stock-keeping unit with its costing state.
///
/// ## Costing State
/// - `stock` and `stock_value_cents` always move together.
/// - Under FIFO, `stock` equals the sum of lot remainders and
///   `stock_value_cents` equals the sum of `remaining × unit_cost`.
/// - `purchase_price_cents` is the last known unit cost. It only seeds
///   inbound adjustments; the average cost is `stock_value / stock`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this product belongs to.
    pub tenant_id: String,

    /// Stock Keeping Unit (unique per tenant by convention only).
    pub sku: Option<String>,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Display name, frozen into each movement.
    pub name: String,

    pub description: Option<String>,

    /// Category used by the valuation report.
    pub category: Option<String>,

    /// Sale price in cents, net of IVA.
    pub sale_price_cents: i64,

    /// Last known unit purchase cost in cents.
    pub purchase_price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Total cost of units on hand, in cents. Never negative.
    pub stock_value_cents: i64,

    /// Low-stock alert threshold.
    pub min_stock_threshold: i64,

    /// Overstock alert threshold (0 disables the alert).
    pub max_stock_threshold: i64,

    /// Best-before date for perishables.
    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency counter, bumped on every write.
    pub version: i64,
}

impl Product {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    #[inline]
    pub fn stock_value(&self) -> Money {
        Money::from_cents(self.stock_value_cents)
    }

    /// Average unit cost, zero when nothing is on hand.
    ///
    /// ## Example
    /// ```rust
    /// # use bodega_core::types::Product;
    /// # fn demo(p: &Product) {
    /// // stock 20, stock_value 3000 → 150
    /// let avg = p.average_cost();
    /// # }
    /// ```
    pub fn average_cost(&self) -> Money {
        self.stock_value().prorate(1, self.stock)
    }

    /// Label used in error messages: SKU when present, else the name.
    pub fn label(&self) -> &str {
        self.sku.as_deref().unwrap_or(&self.name)
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock_threshold
    }

    pub fn is_overstocked(&self) -> bool {
        self.max_stock_threshold > 0 && self.stock >= self.max_stock_threshold
    }
}

// =============================================================================
// Batch
// =============================================================================

/// One FIFO purchase lot of a product.
///
/// `initial_quantity`, `purchase_date` and `unit_cost_cents` are fixed at
/// creation; only `remaining_quantity` decreases. Exhausted lots are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Batch {
    pub id: String,
    pub product_id: String,
    /// Per-product creation ordinal; breaks ties between equal dates.
    pub sequence: i64,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    pub initial_quantity: i64,
    pub remaining_quantity: i64,
    pub unit_cost_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Batch {
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining_quantity <= 0
    }

    /// Cost of the units still in this lot.
    pub fn remaining_value(&self) -> Money {
        self.unit_cost().multiply_quantity(self.remaining_quantity)
    }
}

// =============================================================================
// Movement Type
// =============================================================================

/// Direction of a stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Kind of stock event recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Point-of-sale checkout line.
    Sale,
    /// Manual count correction upwards.
    AdjustmentIn,
    /// Manual count correction downwards.
    AdjustmentOut,
    /// Loss, breakage or spoilage ("merma").
    Shrinkage,
    /// Purchase entered outside a purchase order.
    PurchaseEntry,
    /// Line of a received purchase order.
    PurchaseOrderReceipt,
    /// Stock brought in when the product was created.
    OpeningBalance,
}

impl MovementType {
    pub const fn direction(&self) -> Direction {
        match self {
            MovementType::Sale | MovementType::AdjustmentOut | MovementType::Shrinkage => {
                Direction::Outbound
            }
            MovementType::AdjustmentIn
            | MovementType::PurchaseEntry
            | MovementType::PurchaseOrderReceipt
            | MovementType::OpeningBalance => Direction::Inbound,
        }
    }

    /// Movements whose IVA is output tax.
    pub const fn is_sale_family(&self) -> bool {
        matches!(self, MovementType::Sale)
    }

    /// Movements whose IVA is input tax.
    pub const fn is_purchase_family(&self) -> bool {
        matches!(
            self,
            MovementType::PurchaseEntry | MovementType::PurchaseOrderReceipt
        )
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Mercado Pago checkout.
    MercadoPago,
    /// Transbank Webpay checkout.
    Transbank,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Movement
// =============================================================================

/// Immutable ledger entry for one stock change.
///
/// The signed sum of `quantity` over a product's movements equals its
/// `stock`. Monetary fields are `None` where they do not apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Movement {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    /// Product name at the time of the event (frozen).
    pub product_name: String,
    /// Transaction timestamp, shared by every movement of one operation.
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    pub movement_type: MovementType,
    /// Negative for outbound, positive for inbound.
    pub quantity: i64,
    pub net_amount_cents: Option<i64>,
    pub iva_amount_cents: Option<i64>,
    pub total_amount_cents: Option<i64>,
    /// Present on outbound movements only.
    pub cost_of_goods_sold_cents: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    /// Purchase order id for receipts.
    pub reference_id: Option<String>,
    pub notes: Option<String>,
}

impl Movement {
    pub fn iva(&self) -> Money {
        Money::from_cents(self.iva_amount_cents.unwrap_or(0))
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.total_amount_cents.unwrap_or(0))
    }

    pub fn cost_of_goods_sold(&self) -> Option<Money> {
        self.cost_of_goods_sold_cents.map(Money::from_cents)
    }
}

// =============================================================================
// Suppliers & Purchase Orders
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// The status of a purchase order. Pending → Received is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Pending,
    Received,
}

impl PurchaseOrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Pending => "pending",
            PurchaseOrderStatus::Received => "received",
        }
    }
}

impl Default for PurchaseOrderStatus {
    fn default() -> Self {
        PurchaseOrderStatus::Pending
    }
}

/// A line of a purchase order, with the product name frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseOrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    /// Unit purchase cost in cents, net of IVA.
    pub unit_cost_cents: i64,
}

impl PurchaseOrderItem {
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_cost_cents).multiply_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseOrder {
    pub id: String,
    pub tenant_id: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub status: PurchaseOrderStatus,
    pub items: Vec<PurchaseOrderItem>,
    pub total_amount_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,
}

impl PurchaseOrder {
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == PurchaseOrderStatus::Pending
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Per-tenant settings. Read, never mutated, by stock operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Settings {
    pub tenant_id: String,
    pub inventory_method: InventoryMethod,
    /// Payment gateway name ("mercado_pago", "transbank"); opaque here.
    pub payment_provider: Option<String>,
    /// Public key for the payment gateway; opaque here.
    pub payment_public_key: Option<String>,
}

impl Settings {
    /// Settings used for a tenant that never saved any.
    pub fn defaults_for(tenant_id: impl Into<String>, method: InventoryMethod) -> Self {
        Settings {
            tenant_id: tenant_id.into(),
            inventory_method: method,
            payment_provider: None,
            payment_public_key: None,
        }
    }
}

// =============================================================================
// Operation Inputs
// =============================================================================

/// One line of a checkout cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    /// Net unit sale price; defaults to the product's sale price.
    pub sale_price_cents: Option<i64>,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            product_id: product_id.into(),
            quantity,
            sale_price_cents: None,
        }
    }

    pub fn at_price(mut self, sale_price_cents: i64) -> Self {
        self.sale_price_cents = Some(sale_price_cents);
        self
    }
}

/// Why stock is being corrected by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// Physical count differs from the system.
    Count,
    /// Loss, breakage or spoilage. Outbound only.
    Shrinkage,
}

impl AdjustmentReason {
    /// Movement type for a signed adjustment.
    pub const fn movement_type(&self, signed_quantity: i64) -> MovementType {
        match (self, signed_quantity > 0) {
            (_, true) => MovementType::AdjustmentIn,
            (AdjustmentReason::Count, false) => MovementType::AdjustmentOut,
            (AdjustmentReason::Shrinkage, false) => MovementType::Shrinkage,
        }
    }
}

/// Form input for a new catalog product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub sale_price_cents: i64,
    pub purchase_price_cents: i64,
    /// Stock on hand when the product is created.
    pub opening_stock: i64,
    pub min_stock_threshold: Option<i64>,
    pub max_stock_threshold: Option<i64>,
    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,
}

/// Editable catalog fields. Stock and cost basis are not editable here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductDetails {
    pub name: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub sale_price_cents: i64,
    pub min_stock_threshold: i64,
    pub max_stock_threshold: i64,
    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,
    pub is_active: bool,
}

impl From<&Product> for ProductDetails {
    fn from(p: &Product) -> Self {
        ProductDetails {
            name: p.name.clone(),
            sku: p.sku.clone(),
            barcode: p.barcode.clone(),
            description: p.description.clone(),
            category: p.category.clone(),
            sale_price_cents: p.sale_price_cents,
            min_stock_threshold: p.min_stock_threshold,
            max_stock_threshold: p.max_stock_threshold,
            expiration_date: p.expiration_date,
            is_active: p.is_active,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSupplier {
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// One requested line of a new purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchaseOrderLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

// =============================================================================
// Operation Outcomes
// =============================================================================

/// Result of a committed checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleOutcome {
    /// One Sale movement per cart line, in cart order.
    pub movements: Vec<Movement>,
    /// Every touched product after the sale, in first-seen order.
    pub products: Vec<Product>,
}

/// Result of a committed purchase entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseEntryOutcome {
    /// The lot created under FIFO; `None` under weighted average.
    pub batch: Option<Batch>,
    pub movement: Movement,
    pub product: Product,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(1900);
        assert_eq!(rate.bps(), 1900);
        assert!((rate.percentage() - 19.0).abs() < 0.001);
    }

    #[test]
    fn test_inventory_method_parse() {
        assert_eq!("cpp".parse::<InventoryMethod>().unwrap(), InventoryMethod::Cpp);
        assert_eq!(" FIFO ".parse::<InventoryMethod>().unwrap(), InventoryMethod::Fifo);
        assert!("lifo".parse::<InventoryMethod>().is_err());
        assert_eq!(InventoryMethod::default(), InventoryMethod::Cpp);
    }

    #[test]
    fn test_inventory_method_serde_matches_settings_strings() {
        let json = serde_json::to_string(&InventoryMethod::Fifo).unwrap();
        assert_eq!(json, "\"fifo\"");
        let back: InventoryMethod = serde_json::from_str("\"cpp\"").unwrap();
        assert_eq!(back, InventoryMethod::Cpp);
    }

    #[test]
    fn test_movement_type_direction() {
        assert_eq!(MovementType::Sale.direction(), Direction::Outbound);
        assert_eq!(MovementType::Shrinkage.direction(), Direction::Outbound);
        assert_eq!(MovementType::AdjustmentOut.direction(), Direction::Outbound);
        assert_eq!(MovementType::PurchaseEntry.direction(), Direction::Inbound);
        assert_eq!(MovementType::OpeningBalance.direction(), Direction::Inbound);
    }

    #[test]
    fn test_movement_type_families() {
        assert!(MovementType::Sale.is_sale_family());
        assert!(MovementType::PurchaseOrderReceipt.is_purchase_family());
        assert!(MovementType::PurchaseEntry.is_purchase_family());
        assert!(!MovementType::AdjustmentIn.is_purchase_family());
        assert!(!MovementType::Shrinkage.is_sale_family());
    }

    #[test]
    fn test_adjustment_reason_movement_type() {
        assert_eq!(AdjustmentReason::Count.movement_type(4), MovementType::AdjustmentIn);
        assert_eq!(AdjustmentReason::Count.movement_type(-4), MovementType::AdjustmentOut);
        assert_eq!(AdjustmentReason::Shrinkage.movement_type(-1), MovementType::Shrinkage);
    }

    #[test]
    fn test_purchase_order_status_default() {
        assert_eq!(PurchaseOrderStatus::default(), PurchaseOrderStatus::Pending);
        assert_eq!(PurchaseOrderStatus::Received.as_str(), "received");
    }
}
