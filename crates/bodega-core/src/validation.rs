//! # Validation Module
//!
//! Input validation for Bodega operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (UI / API handler)                                    │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: InventoryService                                             │
//! │  └── THIS MODULE: business rule validation, before any read            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Costing engine                                               │
//! │  └── InvalidQuantity / InsufficientStock against current state         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  └── CHECK, NOT NULL, UNIQUE and foreign key constraints               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bodega_core::validation::{validate_sku, validate_sale_quantity};
//!
//! validate_sku("COFFEE-250").unwrap();
//! validate_sale_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::{CartLine, NewProduct, NewPurchaseOrderLine, NewSupplier, ProductDetails};
use crate::MAX_CART_ITEMS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use bodega_core::validation::validate_sku;
///
/// assert!(validate_sku("COFFEE-250").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (products, suppliers).
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale line quantity.
///
/// Only the sign is checked here; the upper bound is the product's stock,
/// which the costing engine enforces.
pub fn validate_sale_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates an amount in cents that may be zero but not negative.
///
/// ## Example
/// ```rust
/// use bodega_core::validation::validate_non_negative_cents;
///
/// assert!(validate_non_negative_cents("sale_price", 1099).is_ok());
/// assert!(validate_non_negative_cents("sale_price", 0).is_ok());
/// assert!(validate_non_negative_cents("sale_price", -100).is_err());
/// ```
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a pair of alert thresholds.
///
/// ## Rules
/// - Neither may be negative
/// - A non-zero max must be at least min
pub fn validate_thresholds(min: i64, max: i64) -> ValidationResult<()> {
    if min < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "min_stock_threshold".to_string(),
        });
    }
    if max < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "max_stock_threshold".to_string(),
        });
    }
    if max > 0 && max < min {
        return Err(ValidationError::OutOfRange {
            field: "max_stock_threshold".to_string(),
            min,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates a checkout cart shape.
///
/// ## Rules
/// - At least one line, at most MAX_CART_ITEMS (100)
/// - Every line quantity positive
/// - Explicit sale prices are not negative
pub fn validate_cart(lines: &[CartLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "cart".to_string(),
        });
    }

    if lines.len() > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    for line in lines {
        validate_sale_quantity(line.quantity)?;
        if let Some(price) = line.sale_price_cents {
            validate_non_negative_cents("sale_price", price)?;
        }
    }

    Ok(())
}

// =============================================================================
// Form Validators
// =============================================================================

/// Validates a new product form.
pub fn validate_new_product(input: &NewProduct) -> ValidationResult<()> {
    validate_name("name", &input.name)?;
    if let Some(sku) = &input.sku {
        validate_sku(sku)?;
    }
    validate_non_negative_cents("sale_price", input.sale_price_cents)?;
    validate_non_negative_cents("purchase_price", input.purchase_price_cents)?;
    if input.opening_stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "opening_stock".to_string(),
        });
    }
    validate_thresholds(
        input.min_stock_threshold.unwrap_or(crate::DEFAULT_MIN_STOCK_THRESHOLD),
        input.max_stock_threshold.unwrap_or(crate::DEFAULT_MAX_STOCK_THRESHOLD),
    )
}

/// Validates edited catalog fields.
pub fn validate_product_details(input: &ProductDetails) -> ValidationResult<()> {
    validate_name("name", &input.name)?;
    if let Some(sku) = &input.sku {
        validate_sku(sku)?;
    }
    validate_non_negative_cents("sale_price", input.sale_price_cents)?;
    validate_thresholds(input.min_stock_threshold, input.max_stock_threshold)
}

/// Validates a new supplier form.
pub fn validate_new_supplier(input: &NewSupplier) -> ValidationResult<()> {
    validate_name("supplier name", &input.name)?;
    if let Some(email) = &input.email {
        if !email.contains('@') {
            return Err(ValidationError::InvalidFormat {
                field: "email".to_string(),
                reason: "must contain '@'".to_string(),
            });
        }
    }
    Ok(())
}

/// Validates the requested lines of a new purchase order.
pub fn validate_purchase_order_lines(lines: &[NewPurchaseOrderLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }
        validate_non_negative_cents("unit_cost", line.unit_cost_cents)?;
        if line.unit_cost_cents.checked_mul(line.quantity).is_none() {
            return Err(ValidationError::InvalidFormat {
                field: "items".to_string(),
                reason: "line amount is too large".to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use bodega_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("COFFEE-250").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Café molido 250g").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_sale_quantity() {
        assert!(validate_sale_quantity(1).is_ok());
        assert!(validate_sale_quantity(1000).is_ok());
        assert!(validate_sale_quantity(i64::MAX).is_ok());

        assert!(validate_sale_quantity(0).is_err());
        assert!(validate_sale_quantity(-1).is_err());
    }

    #[test]
    fn test_validate_thresholds() {
        assert!(validate_thresholds(5, 100).is_ok());
        assert!(validate_thresholds(5, 0).is_ok());
        assert!(validate_thresholds(10, 5).is_err());
        assert!(validate_thresholds(-1, 5).is_err());
    }

    #[test]
    fn test_validate_cart() {
        assert!(validate_cart(&[CartLine::new("a", 2)]).is_ok());
        assert!(validate_cart(&[CartLine::new("a", 5000)]).is_ok());
        assert!(validate_cart(&[]).is_err());
        assert!(validate_cart(&[CartLine::new("a", 0)]).is_err());
        assert!(validate_cart(&[CartLine::new("a", 1).at_price(-5)]).is_err());

        let too_many: Vec<CartLine> = (0..=MAX_CART_ITEMS)
            .map(|i| CartLine::new(format!("p-{i}"), 1))
            .collect();
        assert!(validate_cart(&too_many).is_err());
    }

    #[test]
    fn test_validate_new_product() {
        let ok = NewProduct {
            name: "Coffee".to_string(),
            sale_price_cents: 500,
            purchase_price_cents: 300,
            opening_stock: 10,
            ..Default::default()
        };
        assert!(validate_new_product(&ok).is_ok());

        let bad_stock = NewProduct {
            opening_stock: -1,
            ..ok.clone()
        };
        assert!(validate_new_product(&bad_stock).is_err());

        let bad_sku = NewProduct {
            sku: Some("bad sku".to_string()),
            ..ok
        };
        assert!(validate_new_product(&bad_sku).is_err());
    }

    #[test]
    fn test_validate_purchase_order_lines() {
        let line = NewPurchaseOrderLine {
            product_id: "p".to_string(),
            quantity: 3,
            unit_cost_cents: 100,
        };
        assert!(validate_purchase_order_lines(&[line.clone()]).is_ok());
        assert!(validate_purchase_order_lines(&[]).is_err());
        assert!(validate_purchase_order_lines(&[NewPurchaseOrderLine {
            quantity: 10_000_000_000,
            unit_cost_cents: 10_000_000_000,
            ..line.clone()
        }])
        .is_err());
        assert!(validate_purchase_order_lines(&[NewPurchaseOrderLine {
            quantity: 0,
            ..line
        }])
        .is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
