//! # karbar-db: Database Layer for Karbar POS
//!
//! This crate provides database access for the Karbar POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Karbar POS Data Flow                             │
//! │                                                                         │
//! │  Caller (sale entry, returns, dues, reports)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     karbar-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │ (invoice.rs,  │    │  (embedded)  │   │   │
//! │  │   │               │    │  returns.rs,  │    │              │   │   │
//! │  │   │ SqlitePool    │◄───│  dues.rs, …)  │    │ 001_init.sql │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   business math delegated to karbar-core (pure functions)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (karbar.db, WAL mode)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`sequence`] - Atomic daily document number sequences
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (invoice, returns, dues, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use karbar_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/karbar.db")).await?;
//!
//! let detail = db.invoices().create_invoice(&payload).await?;
//! println!("{}", detail.invoice.invoice_no);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod sequence;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::dues::{DueDetail, DueSummary, DuesRepository};
pub use repository::invoice::{InvoiceDetail, InvoiceRepository, InvoiceSummary};
pub use repository::product::{ProductRepository, VariantWithKind};
pub use repository::report::{
    DailySales, InvoiceProfit, InvoiceProfitDetail, LineProfit, ProductSales, ReportRepository,
    SalesSummary,
};
pub use repository::returns::{ReturnDetail, ReturnRepository, ReturnSummary, ReturnableItem};
pub use repository::stock::StockRepository;

// =============================================================================
// Test Fixtures
// =============================================================================

/// Shared fixtures for the repository test modules: an in-memory
/// database plus a small catalog covering all four product kinds.
#[cfg(test)]
pub(crate) mod testutil {
    use crate::pool::{Database, DbConfig};
    use karbar_core::{NewInvoice, NewInvoiceLine, NewReturnLine, NewVariant, ProductKind, Variant};

    /// One variant of each product kind.
    pub struct Catalog {
        /// 24in × 36in (6 sqft/sheet), Tk 120/sheet, Tk 22/sqft,
        /// cost Tk 80, 10 sheets on hand, low-stock threshold 3.
        pub glass: Variant,
        /// 21 ft rods, Tk 60/bar, Tk 3/ft, cost Tk 40, 20 bars.
        pub thai: Variant,
        /// 20 ft pipes, Tk 900/pipe, Tk 45/ft, cost Tk 700, 5 pipes.
        pub pipe: Variant,
        /// Hinges, Tk 35/piece, cost Tk 20, 50 pieces.
        pub others: Variant,
    }

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn seed_catalog(db: &Database) -> Catalog {
        let products = db.products();

        let glass_product = products
            .create_product("Clear Glass", ProductKind::Glass)
            .await
            .unwrap();
        let glass = products
            .create_variant(
                &glass_product.id,
                &NewVariant {
                    sku: "GL-24x36-5MM".to_string(),
                    thickness_mm: Some(5.0),
                    width_in: Some(24.0),
                    height_in: Some(36.0),
                    price_base: Some(120.0),
                    price_alt: Some(22.0),
                    cost_price: Some(80.0),
                    low_stock_threshold: Some(3.0),
                    opening_stock: Some(10.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let thai_product = products
            .create_product("Thai Aluminum", ProductKind::ThaiAluminum)
            .await
            .unwrap();
        let thai = products
            .create_variant(
                &thai_product.id,
                &NewVariant {
                    sku: "TA-21FT".to_string(),
                    rod_length_ft: Some(21.0),
                    price_base: Some(60.0),
                    price_alt: Some(3.0),
                    cost_price: Some(40.0),
                    opening_stock: Some(20.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let pipe_product = products
            .create_product("SS Pipe", ProductKind::SsPipe)
            .await
            .unwrap();
        let pipe = products
            .create_variant(
                &pipe_product.id,
                &NewVariant {
                    sku: "SS-P-20".to_string(),
                    price_base: Some(900.0),
                    price_alt: Some(45.0),
                    cost_price: Some(700.0),
                    opening_stock: Some(5.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let others_product = products
            .create_product("Hardware", ProductKind::Others)
            .await
            .unwrap();
        let others = products
            .create_variant(
                &others_product.id,
                &NewVariant {
                    sku: "HW-HINGE".to_string(),
                    price_base: Some(35.0),
                    cost_price: Some(20.0),
                    opening_stock: Some(50.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        Catalog {
            glass,
            thai,
            pipe,
            others,
        }
    }

    /// A sale line at catalog prices.
    pub fn line(variant_id: &str, uom: &str, qty: f64) -> NewInvoiceLine {
        NewInvoiceLine {
            variant_id: variant_id.to_string(),
            uom: Some(uom.to_string()),
            qty,
            unit_price: None,
            line_total: None,
        }
    }

    /// A return line at catalog prices, no override.
    pub fn ret_line(invoice_item_id: &str, uom: &str, qty: f64) -> NewReturnLine {
        NewReturnLine {
            invoice_item_id: invoice_item_id.to_string(),
            uom: uom.to_string(),
            qty,
            refund_override: None,
            note: None,
        }
    }

    /// A bare invoice payload to splat line/payment fields onto.
    pub fn empty_invoice() -> NewInvoice {
        NewInvoice {
            invoice_date: None,
            customer: None,
            lines: Vec::new(),
            subtotal: None,
            discount: 0.0,
            paid_amount: 0.0,
            shop_name: None,
            shop_address: None,
            shop_phone: None,
        }
    }
}
