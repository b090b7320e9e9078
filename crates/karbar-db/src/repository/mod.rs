//! # Repository Module
//!
//! Database repository implementations for Karbar POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  The Repository pattern abstracts database access behind a      │
//! │  clean API.                                                     │
//! │                                                                 │
//! │  Caller                                                         │
//! │     │  db.invoices().create_invoice(&payload)                   │
//! │     ▼                                                           │
//! │  InvoiceRepository                                              │
//! │  ├── create_invoice(&self, input)   ← transactional engine      │
//! │  ├── get_detail(&self, id)                                      │
//! │  └── list(&self, limit)                                         │
//! │     │  SQL                                                      │
//! │     ▼                                                           │
//! │  SQLite Database                                                │
//! │                                                                 │
//! │  Document engines (invoice, return, due payment) own their      │
//! │  transactions; cross-repository steps that must be atomic with  │
//! │  a document (stock moves, sequence claims, customer upsert) are │
//! │  pub(crate) functions taking the engine's transaction.          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD (products, variants)
//! - [`customer::CustomerRepository`] - Customer lookup and upsert
//! - [`stock::StockRepository`] - Restocks, corrections, low stock
//! - [`invoice::InvoiceRepository`] - The sale engine
//! - [`returns::ReturnRepository`] - The refund engine
//! - [`dues::DuesRepository`] - Installment collection
//! - [`report::ReportRepository`] - Summaries and profit

pub mod customer;
pub mod dues;
pub mod invoice;
pub mod product;
pub mod report;
pub mod returns;
pub mod stock;
