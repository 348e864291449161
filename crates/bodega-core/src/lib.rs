//! # bodega-core: Pure Business Logic for Bodega
//!
//! This crate holds the inventory costing rules of Bodega as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Bodega Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  UI / API handlers (out of tree)                │   │
//! │  │      Point of Sale ── Stock Adjustment ── Purchase Orders       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          bodega-db: InventoryService + LedgerStore              │   │
//! │  │     read product/lots ─► cost ─► record ─► atomic commit       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bodega-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  costing  │  │  ledger   │  │ reporting │  │   money   │  │   │
//! │  │   │ WAC, FIFO │  │ Movement  │  │ VAT, value│  │ TaxRate   │  │   │
//! │  │   │           │  │ recorder  │  │  alerts   │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Batch, Movement, PurchaseOrder, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`costing`] - Weighted average and FIFO costing strategies
//! - [`ledger`] - Movement recorder (one immutable entry per stock event)
//! - [`reporting`] - Read-side aggregations over movements and products
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use bodega_core::costing::{StockPosition, WeightedAverageCost, CostingStrategy};
//! use bodega_core::Money;
//! use chrono::NaiveDate;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let empty = StockPosition::new("p-1", "COFFEE", 0, Money::zero(), &[]);
//! let received = WeightedAverageCost
//!     .apply_inbound(&empty, 10, Money::from_cents(100), date)
//!     .unwrap();
//!
//! assert_eq!(received.new_stock, 10);
//! assert_eq!(received.new_stock_value.cents(), 1000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod costing;
pub mod error;
pub mod ledger;
pub mod money;
pub mod reporting;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use costing::{CostingOutcome, CostingStrategy, FifoCost, StockPosition, WeightedAverageCost};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::MovementRecorder;
pub use money::{Money, TaxBreakdown};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tenant ID for single-store installs.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum lines allowed in a single sale.
pub const MAX_CART_ITEMS: usize = 100;

/// Value added tax (IVA) applied to sales and purchases: 19%.
pub const VAT_RATE: TaxRate = TaxRate::from_bps(1900);

/// Default low-stock alert threshold for new products.
pub const DEFAULT_MIN_STOCK_THRESHOLD: i64 = 5;

/// Default overstock alert threshold for new products.
pub const DEFAULT_MAX_STOCK_THRESHOLD: i64 = 100;
