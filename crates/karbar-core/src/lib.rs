//! # karbar-core: Pure Business Logic for Karbar POS
//!
//! This crate is the **heart** of Karbar POS, a point-of-sale and
//! inventory system for a cut-to-order materials shop (glass sheets,
//! aluminum rods, steel pipe, miscellaneous hardware). It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Karbar POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Caller (UI / API surface)                    │   │
//! │  │    sale entry ──► returns ──► due collection ──► reports        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ karbar-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │ quantity │ │   uom   │ │billing │  │   │
//! │  │   │ Invoice │ │  Money  │ │ Quantity │ │ convert │ │ totals │  │   │
//! │  │   │ Variant │ │  paisa  │ │  milli   │ │  pairs  │ │ refund │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └─────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    karbar-db (Database Layer)                   │   │
//! │  │         SQLite transactions, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Variant, Invoice, Return, etc.)
//! - [`money`] - Money in integer paisa (no floating point!)
//! - [`quantity`] - Quantities in integer milliunits (3-decimal policy)
//! - [`uom`] - Unit-of-measure pairs and conversion per product kind
//! - [`billing`] - Totals, discount apportionment, refund computation
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Arithmetic**: Money is paisa (i64), quantities are
//!    milliunits (i64); floats appear only at the conversion formulas
//!    and the JSON boundary
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use karbar_core::money::Money;
//! use karbar_core::quantity::Quantity;
//! use karbar_core::uom::{Uom, UomConfig};
//!
//! // A 24in × 36in glass sheet holds 6 sqft
//! let cfg = UomConfig::Glass { width_in: 24.0, height_in: 36.0 };
//!
//! // Selling 3 sqft consumes half a sheet of stock
//! let sheets = cfg.to_base(Uom::Sqft, Quantity::from_f64(3.0));
//! assert_eq!(sheets, Quantity::from_f64(0.5));
//!
//! // At Tk 22 per sqft that line totals Tk 66
//! let total = Money::from_bdt(22).mul_quantity(Quantity::from_f64(3.0));
//! assert_eq!(total, Money::from_bdt(66));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod money;
pub mod quantity;
pub mod types;
pub mod uom;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use karbar_core::Money` instead of
// `use karbar_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use quantity::Quantity;
pub use types::*;
pub use uom::{normalize_uom, ProductKind, Uom, UomConfig};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Document number prefixes, shared with the sequence generator:
/// `INV-YYYYMMDD-NNNN`, `RET-YYYYMMDD-NNNN`, `REC-YYYYMMDD-NNNN`.
pub const INVOICE_PREFIX: &str = "INV";
pub const RETURN_PREFIX: &str = "RET";
pub const RECEIPT_PREFIX: &str = "REC";

/// Maximum lines allowed on a single invoice.
///
/// ## Business Reason
/// Prevents runaway documents and keeps receipts printable.
pub const MAX_INVOICE_LINES: usize = 100;
