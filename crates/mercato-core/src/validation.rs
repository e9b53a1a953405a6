//! # Validation Module
//!
//! Input validation utilities shared by the stock, sale and product types.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Domain types (THIS MODULE)                                    │
//! │  ├── Quantities strictly positive, line quantities capped               │
//! │  └── Prices, discounts and tax rates in range                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                             │
//! │  ├── CHECK constraints (total = available + reserved, qty > 0)          │
//! │  ├── UNIQUE constraints (sku, sale_number per tenant)                   │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mercato_core::validation::{validate_sku, validate_quantity};
//!
//! assert!(validate_sku("COKE-330").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_SALE_ITEMS, MAX_UNIT_PRICE_CENTS};

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
/// use mercato_core::validation::validate_sku;
///
/// assert!(validate_sku("COKE-330").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
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

/// Validates a product name: non-empty, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a movement reference (sale number, purchase order, ...).
pub fn validate_reference(reference: &str) -> ValidationResult<()> {
    let reference = reference.trim();

    if reference.is_empty() {
        return Err(ValidationError::Required {
            field: "reference".to_string(),
        });
    }

    if reference.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "reference".to_string(),
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a stock operation quantity.
///
/// Stock operations have no upper cap; zero and negatives are rejected.
pub fn validate_positive_qty(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a sale line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ```text
/// validate_quantity(qty)
///      │
///      ├── qty <= 0?   → MustBePositive
///      ├── qty > 999?  → OutOfRange
///      └── OK
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    validate_positive_qty("quantity", qty)?;

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a non-negative amount or level (prices, reorder levels,
/// initial stock).
///
/// ## Example
/// ```rust
/// use mercato_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("price", 1099).is_ok());
/// assert!(validate_non_negative("price", 0).is_ok());
/// assert!(validate_non_negative("price", -100).is_err());
/// ```
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a product price in cents: 0 to MAX_UNIT_PRICE_CENTS.
pub fn validate_price(field: &str, cents: i64) -> ValidationResult<()> {
    validate_non_negative(field, cents)?;

    if cents > MAX_UNIT_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points: 0 to 10000 (0% to 100%).
pub fn validate_tax_rate_bps(bps: i64) -> ValidationResult<()> {
    if !(0..=10000).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Validates a discount against the subtotal it applies to.
pub fn validate_discount(discount_cents: i64, subtotal_cents: i64) -> ValidationResult<()> {
    validate_non_negative("discount", discount_cents)?;

    if discount_cents > subtotal_cents {
        return Err(ValidationError::DiscountExceedsSubtotal {
            discount: discount_cents,
            subtotal: subtotal_cents,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line fits on a sale (at most MAX_SALE_ITEMS).
pub fn validate_sale_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "sale items".to_string(),
            min: 0,
            max: MAX_SALE_ITEMS as i64,
        });
    }

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
        assert!(validate_sku("COKE-330").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Coca-Cola 330ml").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_positive_qty_has_no_cap() {
        assert!(validate_positive_qty("quantity", 50_000).is_ok());
        assert!(matches!(
            validate_positive_qty("quantity", 0),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price("unit price", 0).is_ok());
        assert!(validate_price("unit price", MAX_UNIT_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price("unit price", -1),
            Err(ValidationError::Negative { .. })
        ));
        assert!(matches!(
            validate_price("unit price", i64::MAX / 2),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(10000).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
        assert!(validate_tax_rate_bps(-1).is_err());
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount(1000, 10000).is_ok());
        assert!(validate_discount(10000, 10000).is_ok());
        assert!(validate_discount(-1, 10000).is_err());
        assert!(matches!(
            validate_discount(10001, 10000),
            Err(ValidationError::DiscountExceedsSubtotal { .. })
        ));
    }

    #[test]
    fn test_validate_sale_size() {
        assert!(validate_sale_size(0).is_ok());
        assert!(validate_sale_size(MAX_SALE_ITEMS - 1).is_ok());
        assert!(validate_sale_size(MAX_SALE_ITEMS).is_err());
    }

    #[test]
    fn test_validate_reference() {
        assert!(validate_reference("S-000001").is_ok());
        assert!(validate_reference("  ").is_err());
    }
}
