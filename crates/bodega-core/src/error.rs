//! # Error Types
//!
//! Domain-specific error types for bodega-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bodega-core errors (this file)                                        │
//! │  ├── CoreError        - Costing and stock-mutation rule violations     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bodega-db errors (separate crate)                                     │
//! │  ├── DbError          - Database failures, Conflict (aborted commit)   │
//! │  └── ServiceError     - CoreError | DbError, what callers see          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product, order, quantities)
//! 3. Errors are enum variants, never String
//! 4. Nothing here is fatal: every variant is surfaced to the caller

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// A `CoreError` is always raised before any write is submitted, so the
/// stored state is untouched when one is returned.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Non-positive quantity supplied to an inbound or outbound operation.
    #[error("Invalid quantity {quantity}: must be greater than zero")]
    InvalidQuantity { quantity: i64 },

    /// Requested outbound quantity exceeds the recorded stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// Product stock = 3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "COFFEE", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole cart rejected, nothing written
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// FIFO lots do not add up to the recorded stock.
    ///
    /// Indicates an earlier invariant violation rather than a business
    /// condition. The transaction is aborted and operators should inspect
    /// the product's lots.
    #[error(
        "Stock inconsistency for product {product_id}: recorded stock {recorded_stock}, \
         lots hold {lot_total}"
    )]
    StockInconsistency {
        product_id: String,
        recorded_stock: i64,
        lot_total: i64,
    },

    /// FIFO lots drawn by an outbound change are worth more than the
    /// product's recorded stock value. Aborted like `StockInconsistency`.
    #[error(
        "Valuation inconsistency for product {product_id}: recorded value {stock_value_cents}, \
         lots hold {lot_value_cents}"
    )]
    ValuationInconsistency {
        product_id: String,
        stock_value_cents: i64,
        lot_value_cents: i64,
    },

    /// Purchase order is not in a state that allows the operation.
    #[error("Purchase order {order_id} is {status}, expected {expected}")]
    InvalidState {
        order_id: String,
        status: String,
        expected: String,
    },

    /// Not enough information to value an inbound movement.
    #[error("Insufficient data for costing: {reason}")]
    InsufficientDataForCosting { reason: String },

    /// Product cannot be found for this tenant.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Supplier cannot be found for this tenant.
    #[error("Supplier not found: {0}")]
    SupplierNotFound(String),

    /// Purchase order cannot be found for this tenant.
    #[error("Purchase order not found: {0}")]
    PurchaseOrderNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, unknown inventory method).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not allowed in this context.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
