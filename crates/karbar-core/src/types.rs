//! # Domain Types
//!
//! Core domain types used throughout Karbar POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Types                             │
//! │                                                                 │
//! │  Catalog:      Product ──< Variant (physical attrs, on_hand)    │
//! │  Sales:        Customer ──< Invoice ──< InvoiceItem             │
//! │  Returns:      Invoice ──< Return ──< ReturnItem                │
//! │  Dues:         Invoice ──< DuePayment                           │
//! │  Stock audit:  Variant ──< Restock                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where documents need one: `invoice_no`, `return_no`,
//!   `receipt_no` (human-readable, unique, date-scoped sequence)
//!
//! ## Snapshot Pattern
//! `InvoiceItem` and `ReturnItem` freeze product name/type/label, the
//! price and the cost at transaction time, so historical documents
//! stay stable under later catalog edits.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::quantity::Quantity;
use crate::uom::{ProductKind, Uom, UomConfig, PIPE_LENGTH_FT};

// =============================================================================
// Invoice Status
// =============================================================================

/// Payment status of an invoice, derived from paid vs grand total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// paid >= grand total
    Paid,
    /// 0 < paid < grand total
    Partial,
    /// paid = 0
    Unpaid,
}

impl InvoiceStatus {
    /// The 3-state derivation rule. Never stored from caller input.
    pub fn derive(paid: Money, grand_total: Money) -> Self {
        if paid >= grand_total {
            InvoiceStatus::Paid
        } else if paid.is_positive() {
            InvoiceStatus::Partial
        } else {
            InvoiceStatus::Unpaid
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A catalog entry. The `kind` decides which UoM pair and which
/// physical attributes apply to its variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub name: String,
    pub kind: ProductKind,
    /// Soft delete; products are never hard-deleted while variants
    /// reference them.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stocked SKU under a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    pub sku: String,
    pub size_label: Option<String>,
    pub color: Option<String>,
    pub thickness_mm: Option<f64>,
    /// Glass only.
    pub width_in: Option<f64>,
    /// Glass only.
    pub height_in: Option<f64>,
    /// Thai aluminum only.
    pub rod_length_ft: Option<f64>,
    /// SS pipe only; 20 ft convention when absent.
    pub pipe_length_ft: Option<f64>,
    /// Price per base unit, in paisa.
    pub price_base_paisa: i64,
    /// Price per alternate unit; always NULL for "others".
    pub price_alt_paisa: Option<i64>,
    /// Unit cost frozen onto invoice items at sale time.
    pub cost_price_paisa: i64,
    /// Current stock in base milliunits - the single source of truth
    /// for availability.
    pub on_hand_milli: i64,
    pub low_stock_threshold_milli: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    #[inline]
    pub fn price_base(&self) -> Money {
        Money::from_paisa(self.price_base_paisa)
    }

    #[inline]
    pub fn price_alt(&self) -> Option<Money> {
        self.price_alt_paisa.map(Money::from_paisa)
    }

    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_paisa(self.cost_price_paisa)
    }

    #[inline]
    pub fn on_hand(&self) -> Quantity {
        Quantity::from_milli(self.on_hand_milli)
    }

    #[inline]
    pub fn low_stock_threshold(&self) -> Quantity {
        Quantity::from_milli(self.low_stock_threshold_milli)
    }

    /// Builds the conversion payload for this variant under a product
    /// kind. Missing dimensions become zero (degenerate, converts to
    /// 0); a missing or non-positive pipe length falls back to the
    /// 20 ft convention.
    pub fn uom_config(&self, kind: ProductKind) -> UomConfig {
        match kind {
            ProductKind::Glass => UomConfig::Glass {
                width_in: self.width_in.unwrap_or(0.0),
                height_in: self.height_in.unwrap_or(0.0),
            },
            ProductKind::ThaiAluminum => UomConfig::ThaiAluminum {
                rod_length_ft: self.rod_length_ft.unwrap_or(0.0),
            },
            ProductKind::SsPipe => UomConfig::SsPipe {
                pipe_length_ft: self
                    .pipe_length_ft
                    .filter(|l| *l > 0.0)
                    .unwrap_or(PIPE_LENGTH_FT),
            },
            ProductKind::Others => UomConfig::Others,
        }
    }
}

// =============================================================================
// Customers
// =============================================================================

/// A customer, keyed naturally by phone for upsert at sale time.
/// Walk-in sales carry no customer at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Invoices
// =============================================================================

/// One sale transaction.
///
/// `grand_total` stays `subtotal - discount` in storage; refunds are
/// never folded in. Reporting computes the revised figure as
/// `grand_total - refund_total` at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    pub invoice_no: String,
    pub customer_id: Option<String>,
    pub subtotal_paisa: i64,
    pub discount_paisa: i64,
    pub grand_total_paisa: i64,
    pub paid_paisa: i64,
    pub status: InvoiceStatus,
    pub shop_name: Option<String>,
    pub shop_address: Option<String>,
    pub shop_phone: Option<String>,
    /// Audit trail; the return engine appends "| Return RET-..." here.
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_paisa(self.subtotal_paisa)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_paisa(self.discount_paisa)
    }

    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_paisa(self.grand_total_paisa)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_paisa(self.paid_paisa)
    }
}

/// One line of a sale. Immutable after creation; returns track their
/// cumulative base quantity against it without altering the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub variant_id: String,
    /// SKU at time of sale (frozen).
    pub sku: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// Product kind at time of sale (frozen); drives all later
    /// conversions for this line.
    pub product_kind: ProductKind,
    pub variant_label: Option<String>,
    /// Unit the sale was transacted in.
    pub uom: Uom,
    /// Quantity in the transacted unit.
    pub qty_milli: i64,
    /// Quantity converted to base units; what was decremented from
    /// stock.
    pub base_qty_milli: i64,
    pub unit_price_paisa: i64,
    pub line_total_paisa: i64,
    /// Variant cost frozen at the moment of sale.
    pub cost_at_sale_paisa: i64,
    pub created_at: DateTime<Utc>,
}

impl InvoiceItem {
    #[inline]
    pub fn qty(&self) -> Quantity {
        Quantity::from_milli(self.qty_milli)
    }

    #[inline]
    pub fn base_qty(&self) -> Quantity {
        Quantity::from_milli(self.base_qty_milli)
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_paisa(self.unit_price_paisa)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_paisa(self.line_total_paisa)
    }

    #[inline]
    pub fn cost_at_sale(&self) -> Money {
        Money::from_paisa(self.cost_at_sale_paisa)
    }
}

// =============================================================================
// Returns
// =============================================================================

/// A return transaction against exactly one invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Return {
    pub id: String,
    pub return_no: String,
    pub invoice_id: String,
    pub subtotal_refund_paisa: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Return {
    #[inline]
    pub fn subtotal_refund(&self) -> Money {
        Money::from_paisa(self.subtotal_refund_paisa)
    }
}

/// One returned line.
///
/// `refund_override_paisa` preserves the discretionary whole-line
/// amount exactly as entered; `effective_rate_paisa` is back-derived
/// from it for audit display and never replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReturnItem {
    pub id: String,
    pub return_id: String,
    pub invoice_item_id: String,
    pub variant_id: String,
    pub product_name: String,
    pub variant_label: Option<String>,
    /// Unit the return was entered in, independent of the sale's uom.
    pub uom: Uom,
    pub qty_milli: i64,
    pub base_qty_milli: i64,
    /// Refund rate per entered unit.
    pub effective_rate_paisa: i64,
    pub refund_amount_paisa: i64,
    pub refund_override_paisa: Option<i64>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReturnItem {
    #[inline]
    pub fn qty(&self) -> Quantity {
        Quantity::from_milli(self.qty_milli)
    }

    #[inline]
    pub fn base_qty(&self) -> Quantity {
        Quantity::from_milli(self.base_qty_milli)
    }

    #[inline]
    pub fn effective_rate(&self) -> Money {
        Money::from_paisa(self.effective_rate_paisa)
    }

    #[inline]
    pub fn refund_amount(&self) -> Money {
        Money::from_paisa(self.refund_amount_paisa)
    }
}

// =============================================================================
// Dues
// =============================================================================

/// An installment against an invoice's remaining due.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DuePayment {
    pub id: String,
    pub invoice_id: String,
    pub receipt_no: String,
    pub amount_paisa: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DuePayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paisa(self.amount_paisa)
    }
}

// =============================================================================
// Restocks
// =============================================================================

/// A direct stock movement not tied to a sale or return: opening
/// stock, corrections, supplier restocking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Restock {
    pub id: String,
    pub variant_id: String,
    /// Signed delta in base milliunits.
    pub qty_base_milli: i64,
    pub cost_per_unit_paisa: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Restock {
    #[inline]
    pub fn qty_base(&self) -> Quantity {
        Quantity::from_milli(self.qty_base_milli)
    }

    #[inline]
    pub fn cost_per_unit(&self) -> Money {
        Money::from_paisa(self.cost_per_unit_paisa)
    }
}

// =============================================================================
// Engine Inputs
// =============================================================================
// Caller-facing payloads. Quantities and amounts arrive as decimal
// JSON numbers and are quantized at the engine boundary (3 decimals
// for quantities, 2 for money).

/// Customer block on a new invoice; phone triggers upsert semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// One submitted sale line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoiceLine {
    pub variant_id: String,
    /// UoM token: "base", "alt", or an explicit unit name. Missing
    /// means base.
    pub uom: Option<String>,
    pub qty: f64,
    pub unit_price: Option<f64>,
    /// Directly editable at the point of sale (discretionary
    /// rounding/haggling); derived as unit_price × qty when absent.
    pub line_total: Option<f64>,
}

/// Payload for the invoice engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    /// Backdates the document; the invoice number sequences under this
    /// calendar day.
    #[serde(default)]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default)]
    pub customer: Option<CustomerInput>,
    pub lines: Vec<NewInvoiceLine>,
    /// Server-trusted when supplied, else derived from line totals.
    #[serde(default)]
    pub subtotal: Option<f64>,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub paid_amount: f64,
    #[serde(default)]
    pub shop_name: Option<String>,
    #[serde(default)]
    pub shop_address: Option<String>,
    #[serde(default)]
    pub shop_phone: Option<String>,
}

/// One submitted return line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReturnLine {
    pub invoice_item_id: String,
    /// Unit the return is entered in; may differ from the sale's uom.
    pub uom: String,
    pub qty: f64,
    /// Whole-line refund amount superseding the rate-derived
    /// computation.
    #[serde(default)]
    pub refund_override: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Payload for the return engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReturn {
    pub invoice_id: String,
    pub lines: Vec<NewReturnLine>,
    #[serde(default)]
    pub note: Option<String>,
    /// Replaces the invoice discount (floored at zero) and recomputes
    /// its grand total.
    #[serde(default)]
    pub new_discount: Option<f64>,
}

/// Payload for a direct stock movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRestock {
    pub variant_id: String,
    /// Signed delta in base units; negative corrects overstatement.
    pub qty_base: f64,
    #[serde(default)]
    pub cost_per_unit: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Payload for creating a variant under a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVariant {
    pub sku: String,
    #[serde(default)]
    pub size_label: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub thickness_mm: Option<f64>,
    #[serde(default)]
    pub width_in: Option<f64>,
    #[serde(default)]
    pub height_in: Option<f64>,
    #[serde(default)]
    pub rod_length_ft: Option<f64>,
    #[serde(default)]
    pub pipe_length_ft: Option<f64>,
    #[serde(default)]
    pub price_base: Option<f64>,
    #[serde(default)]
    pub price_alt: Option<f64>,
    #[serde(default)]
    pub cost_price: Option<f64>,
    #[serde(default)]
    pub low_stock_threshold: Option<f64>,
    /// Lands directly in on_hand.
    #[serde(default)]
    pub opening_stock: Option<f64>,
}

// =============================================================================
// Unit Tests
// =============================================================================
