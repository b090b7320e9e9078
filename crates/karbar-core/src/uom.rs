//! # Unit-of-Measure Conversion Module
//!
//! Pure conversion math between a variant's base stocking unit and its
//! alternate selling unit.
//!
//! ## Unit pairs by product kind
//! ```text
//! ┌──────────────┬──────┬──────┬───────────────────────────────────┐
//! │ Kind         │ base │ alt  │ conversion basis                  │
//! ├──────────────┼──────┼──────┼───────────────────────────────────┤
//! │ Glass        │ sheet│ sqft │ area = width_in × height_in / 144 │
//! │ ThaiAluminum │ bar  │ ft   │ rod_length_ft                     │
//! │ SsPipe       │ pipe │ ft   │ pipe_length_ft (convention: 20)   │
//! │ Others       │ piece│  —   │ 1:1, no alternate unit            │
//! └──────────────┴──────┴──────┴───────────────────────────────────┘
//! ```
//!
//! Degenerate-input policy: a zero or missing physical divisor converts
//! to quantity 0 rather than erroring. Upstream validation is expected
//! to keep zero-dimension variants out of alt-unit transactions; the
//! conversion layer stays total.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::quantity::Quantity;

/// Square inches per square foot.
const SQIN_PER_SQFT: f64 = 144.0;

/// Fixed-length convention for SS pipe, in feet.
pub const PIPE_LENGTH_FT: f64 = 20.0;

// =============================================================================
// Product Kind
// =============================================================================

/// The four product families, each with its own UoM pair and
/// physical-attribute schema.
///
/// A closed sum type instead of a string tag: adding a family is a
/// compile-checked change across conversion, pricing and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Cut-to-order glass sheets, sold by sheet or square foot.
    Glass,
    /// Thai aluminum rods, sold by bar or foot.
    ThaiAluminum,
    /// Stainless steel pipe, sold by pipe or foot (20 ft convention).
    SsPipe,
    /// Miscellaneous goods, piece only.
    Others,
}

impl ProductKind {
    /// The indivisible stocking unit for this kind.
    pub const fn base_uom(&self) -> Uom {
        match self {
            ProductKind::Glass => Uom::Sheet,
            ProductKind::ThaiAluminum => Uom::Bar,
            ProductKind::SsPipe => Uom::Pipe,
            ProductKind::Others => Uom::Piece,
        }
    }

    /// The divisible secondary unit, if one exists.
    pub const fn alt_uom(&self) -> Option<Uom> {
        match self {
            ProductKind::Glass => Some(Uom::Sqft),
            ProductKind::ThaiAluminum => Some(Uom::Ft),
            ProductKind::SsPipe => Some(Uom::Ft),
            ProductKind::Others => None,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            ProductKind::Glass => "Glass",
            ProductKind::ThaiAluminum => "Thai Aluminum",
            ProductKind::SsPipe => "SS Pipe",
            ProductKind::Others => "Others",
        }
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Unit of Measure
// =============================================================================

/// Every unit the system transacts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Uom {
    Sheet,
    Sqft,
    Bar,
    Ft,
    Pipe,
    Piece,
}

impl Uom {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Uom::Sheet => "sheet",
            Uom::Sqft => "sqft",
            Uom::Bar => "bar",
            Uom::Ft => "ft",
            Uom::Pipe => "pipe",
            Uom::Piece => "piece",
        }
    }
}

impl fmt::Display for Uom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalizes a submitted UoM token to a canonical unit for a kind.
///
/// Accepts the aliases `"base"` and `"alt"` as well as explicit unit
/// names; anything unrecognized falls back to the kind's base unit
/// (an "alt" request on a kind without an alternate unit does too).
pub fn normalize_uom(token: &str, kind: ProductKind) -> Uom {
    match token.trim().to_ascii_lowercase().as_str() {
        "base" => kind.base_uom(),
        "alt" => kind.alt_uom().unwrap_or_else(|| kind.base_uom()),
        "sheet" => Uom::Sheet,
        "sqft" => Uom::Sqft,
        "bar" => Uom::Bar,
        "ft" => Uom::Ft,
        "pipe" => Uom::Pipe,
        "piece" => Uom::Piece,
        _ => kind.base_uom(),
    }
}

// =============================================================================
// Conversion Configuration
// =============================================================================

/// A variant's physical conversion payload, one arm per product kind.
///
/// Construction happens once, from the variant's stored attributes (see
/// `Variant::uom_config`), so the conversion functions never see raw
/// nullable columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UomConfig {
    Glass { width_in: f64, height_in: f64 },
    ThaiAluminum { rod_length_ft: f64 },
    SsPipe { pipe_length_ft: f64 },
    Others,
}

impl UomConfig {
    pub const fn kind(&self) -> ProductKind {
        match self {
            UomConfig::Glass { .. } => ProductKind::Glass,
            UomConfig::ThaiAluminum { .. } => ProductKind::ThaiAluminum,
            UomConfig::SsPipe { .. } => ProductKind::SsPipe,
            UomConfig::Others => ProductKind::Others,
        }
    }

    /// How many alternate units one base unit contains.
    ///
    /// `None` for kinds with no alternate unit; `Some(0.0)` signals a
    /// degenerate variant (zero dimensions) that cannot convert.
    pub fn alt_per_base(&self) -> Option<f64> {
        match *self {
            UomConfig::Glass { width_in, height_in } => {
                Some(width_in * height_in / SQIN_PER_SQFT)
            }
            UomConfig::ThaiAluminum { rod_length_ft } => Some(rod_length_ft),
            UomConfig::SsPipe { pipe_length_ft } => Some(pipe_length_ft),
            UomConfig::Others => None,
        }
    }

    /// Converts a quantity between two units of this variant's pair.
    ///
    /// Rules, in order:
    /// - zero in, zero out; same unit in, same quantity out
    /// - alt → base divides by `alt_per_base`, base → alt multiplies
    /// - a non-positive divisor converts to 0 (degenerate policy)
    /// - any pairing outside the kind's unit pair passes through
    ///   unchanged, matching the tolerant behavior documents rely on
    ///
    /// The result is quantized to the 3-decimal policy, so
    /// base → alt → base round-trips exactly at that precision.
    pub fn convert(&self, from: Uom, to: Uom, qty: Quantity) -> Quantity {
        if qty.is_zero() || from == to {
            return qty;
        }

        let kind = self.kind();
        let base = kind.base_uom();
        let alt = match kind.alt_uom() {
            Some(alt) => alt,
            // Others: piece only, 1:1
            None => return qty,
        };

        let per_base = self.alt_per_base().unwrap_or(0.0);

        if from == alt && to == base {
            if per_base <= 0.0 {
                return Quantity::zero();
            }
            Quantity::from_f64(qty.as_f64() / per_base)
        } else if from == base && to == alt {
            if per_base <= 0.0 {
                return Quantity::zero();
            }
            Quantity::from_f64(qty.as_f64() * per_base)
        } else {
            qty
        }
    }

    /// Converts a quantity entered in `from` into base units.
    pub fn to_base(&self, from: Uom, qty: Quantity) -> Quantity {
        self.convert(from, self.kind().base_uom(), qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
