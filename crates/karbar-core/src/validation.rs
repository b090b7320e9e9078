//! # Validation Module
//!
//! Input validation utilities for Karbar POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                          │
//! │                                                                 │
//! │  Layer 1: Caller (UI / API surface)                             │
//! │  ├── Basic format checks, immediate feedback                    │
//! │           │                                                     │
//! │           ▼                                                     │
//! │  Layer 2: THIS MODULE - business rule validation                │
//! │  ├── Runs before any transaction starts                         │
//! │           │                                                     │
//! │           ▼                                                     │
//! │  Layer 3: Database (SQLite)                                     │
//! │  ├── NOT NULL / UNIQUE / foreign key constraints                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::uom::{ProductKind, Uom};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use karbar_core::validation::validate_sku;
///
/// assert!(validate_sku("GL-24x36-5MM").is_ok());
/// assert!(validate_sku("").is_err());
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

/// Validates a product or customer name.
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

/// Validates a customer phone number.
///
/// Lenient on purpose: local numbers are written many ways. Digits,
/// spaces, `+` and `-` only, up to 20 characters.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    if phone.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 20,
        });
    }

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == ' ')
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces, + and -".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Quantity & Money Validators
// =============================================================================

/// Validates a transacted quantity against its unit.
///
/// ## Rules
/// - Must be strictly positive
/// - Base units (sheet, bar, pipe, piece) must be whole numbers;
///   alternate units (sqft, ft) may be fractional
///
/// ## Example
/// ```rust
/// use karbar_core::quantity::Quantity;
/// use karbar_core::uom::{ProductKind, Uom};
/// use karbar_core::validation::validate_txn_qty;
///
/// assert!(validate_txn_qty(Quantity::from_f64(2.5), Uom::Sqft, ProductKind::Glass).is_ok());
/// assert!(validate_txn_qty(Quantity::from_f64(2.5), Uom::Sheet, ProductKind::Glass).is_err());
/// ```
pub fn validate_txn_qty(qty: Quantity, uom: Uom, kind: ProductKind) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "qty".to_string(),
        });
    }

    if uom == kind.base_uom() && !qty.is_whole() {
        return Err(ValidationError::FractionalBaseUnit {
            uom: uom.as_str().to_string(),
        });
    }

    Ok(())
}

/// Validates a monetary amount that must be non-negative (prices,
/// discounts, paid amounts).
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates an installment amount against the remaining due.
///
/// ## Rules
/// - Must be strictly positive
/// - Must not exceed the remaining due
pub fn validate_installment(amount: Money, remaining_due: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    if amount > remaining_due {
        return Err(ValidationError::ExceedsRemainingDue);
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// A document must carry at least one line and at most
/// [`crate::MAX_INVOICE_LINES`].
pub fn validate_has_lines<T>(field: &str, lines: &[T]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if lines.len() > crate::MAX_INVOICE_LINES {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: crate::MAX_INVOICE_LINES,
        });
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
/// use karbar_core::validation::validate_uuid;
///
/// assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
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
        assert!(validate_sku("GL-24x36-5MM").is_ok());
        assert!(validate_sku("TA_21FT").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+880 1712-345678").is_ok());
        assert!(validate_phone("01712345678").is_ok());

        assert!(validate_phone("").is_err());
        assert!(validate_phone("phone#1").is_err());
        assert!(validate_phone(&"1".repeat(30)).is_err());
    }

    #[test]
    fn test_validate_txn_qty() {
        // Alternate units may be fractional
        assert!(validate_txn_qty(Quantity::from_f64(2.5), Uom::Sqft, ProductKind::Glass).is_ok());
        assert!(validate_txn_qty(Quantity::from_f64(19.98), Uom::Ft, ProductKind::SsPipe).is_ok());

        // Base units must be whole
        assert!(validate_txn_qty(Quantity::from_units(3), Uom::Sheet, ProductKind::Glass).is_ok());
        assert!(validate_txn_qty(Quantity::from_f64(2.5), Uom::Sheet, ProductKind::Glass).is_err());
        assert!(validate_txn_qty(Quantity::from_f64(1.5), Uom::Piece, ProductKind::Others).is_err());

        // Never zero or negative
        assert!(validate_txn_qty(Quantity::zero(), Uom::Sqft, ProductKind::Glass).is_err());
        assert!(validate_txn_qty(Quantity::from_f64(-1.0), Uom::Ft, ProductKind::SsPipe).is_err());
    }

    #[test]
    fn test_validate_installment() {
        let due = Money::from_bdt(300);

        assert!(validate_installment(Money::from_bdt(300), due).is_ok());
        assert!(validate_installment(Money::from_bdt(100), due).is_ok());

        assert!(validate_installment(Money::from_bdt(301), due).is_err());
        assert!(validate_installment(Money::zero(), due).is_err());
        assert!(validate_installment(Money::from_bdt(-5), due).is_err());
    }

    #[test]
    fn test_validate_has_lines() {
        assert!(validate_has_lines("items", &[1, 2]).is_ok());
        assert!(validate_has_lines::<i32>("items", &[]).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("invoice_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("invoice_id", "").is_err());
        assert!(validate_uuid("invoice_id", "not-a-uuid").is_err());
    }
}
