//! # Document Number Sequences
//!
//! Date-scoped sequential numbers for invoices (`INV-YYYYMMDD-NNNN`),
//! returns (`RET-...`) and payment receipts (`REC-...`).
//!
//! ## Atomicity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  One row per (kind, day) in daily_sequences.                    │
//! │                                                                 │
//! │  INSERT ... ON CONFLICT(kind, day)                              │
//! │    DO UPDATE SET value = value + 1                              │
//! │  RETURNING value                                                │
//! │                                                                 │
//! │  A single statement claims the next number, so two concurrent   │
//! │  transactions can never read the same value. A count-then-      │
//! │  insert scheme would.                                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The UNIQUE indexes on invoice_no / return_no / receipt_no are the
//! backstop: if a number ever collided, the insert would fail and the
//! whole transaction would roll back.
//!
//! Always call this on the transaction that inserts the document, so
//! an aborted document releases its claim with the rollback (gaps are
//! fine; duplicates are not).

use chrono::NaiveDate;
use sqlx::SqliteConnection;

use crate::error::DbResult;

/// Claims the next document number of `prefix` for `day` on the given
/// transaction connection.
///
/// ## Example
/// ```rust,ignore
/// let no = next_document_no(&mut tx, "INV", today).await?;
/// // "INV-20260828-0001"
/// ```
pub async fn next_document_no(
    conn: &mut SqliteConnection,
    prefix: &str,
    day: NaiveDate,
) -> DbResult<String> {
    let day_key = day.format("%Y%m%d").to_string();

    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO daily_sequences (kind, day, value)
        VALUES (?1, ?2, 1)
        ON CONFLICT(kind, day) DO UPDATE SET value = value + 1
        RETURNING value
        "#,
    )
    .bind(prefix)
    .bind(&day_key)
    .fetch_one(conn)
    .await?;

    Ok(format!("{}-{}-{:04}", prefix, day_key, value))
}
