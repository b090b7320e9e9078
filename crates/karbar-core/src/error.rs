//! # Error Types
//!
//! Domain-specific error types for karbar-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Error Types                             │
//! │                                                                 │
//! │  karbar-core errors (this file)                                 │
//! │  ├── CoreError        - Business rule violations                │
//! │  └── ValidationError  - Input validation failures               │
//! │                                                                 │
//! │  karbar-db errors (separate crate)                              │
//! │  └── DbError          - NotFound, unique violations, sqlx       │
//! │                                                                 │
//! │  Flow: ValidationError → CoreError → DbError → transport        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, quantities, IDs)
//! 3. Errors are enum variants, never bare strings
//! 4. Every money- or stock-affecting failure aborts its transaction

use thiserror::Error;

use crate::quantity::Quantity;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the engines.
///
/// Each variant maps to a distinct caller-visible failure: validation
/// problems are fixable by the user, stock/return violations identify
/// the offending line, configuration errors point at catalog data.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A sale line's required base quantity exceeds current on-hand.
    /// The entire invoice is aborted.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: Quantity,
        requested: Quantity,
    },

    /// A return line's base quantity exceeds the invoice item's
    /// remaining returnable allowance. The entire return is aborted.
    ///
    /// The remaining allowance already accounts for every prior return
    /// against the line, including earlier lines of the same batch.
    #[error("Return of {requested} exceeds remaining allowance {remaining} for {sku}")]
    OverReturn {
        sku: String,
        requested: Quantity,
        remaining: Quantity,
    },

    /// Catalog data cannot support the requested operation, e.g. an
    /// alt-unit sale or return on a variant with no alt price.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input validation failure (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any state is touched; always recoverable by the
/// caller fixing the input, never retried automatically.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be strictly positive.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// A base-unit quantity must be a whole number; only alternate
    /// units (sqft, ft) may be fractional.
    #[error("Base unit quantities cannot be fractional for {uom}")]
    FractionalBaseUnit { uom: String },

    /// An installment larger than the remaining due.
    #[error("Amount exceeds remaining due")]
    ExceedsRemainingDue,

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (bad UUID, malformed date, bad characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
