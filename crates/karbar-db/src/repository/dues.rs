//! # Dues Repository
//!
//! Installment collection against invoices with an outstanding due.
//!
//! ## Due Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  due = max(0, grand_total - refund_total - paid)                │
//! │                                                                 │
//! │  grand_total  : stored on the invoice                           │
//! │  refund_total : SUM of returns, joined at read time             │
//! │  paid         : stored, bumped by each installment              │
//! │                                                                 │
//! │  Validation happens against the figure at insertion time: a     │
//! │  return processed after a payment can push the arithmetic       │
//! │  negative, and the clamp absorbs it.                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::sequence::next_document_no;
use karbar_core::validation::validate_installment;
use karbar_core::{billing, DuePayment, InvoiceStatus, Money, RECEIPT_PREFIX};

/// One invoice carrying an outstanding due.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueSummary {
    pub invoice_id: String,
    pub invoice_no: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub grand_total_paisa: i64,
    pub refund_total_paisa: i64,
    pub paid_paisa: i64,
    pub due_paisa: i64,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

/// An invoice's due position with its payment history.
#[derive(Debug, Clone)]
pub struct DueDetail {
    pub summary: DueSummary,
    /// Portion of `paid` taken at the counter when the sale was made.
    pub paid_at_sale_paisa: i64,
    /// Portion of `paid` collected later as installments.
    pub paid_installments_paisa: i64,
    pub payments: Vec<DuePayment>,
}

const DUE_SUMMARY_SQL: &str = r#"
    SELECT
        i.id AS invoice_id, i.invoice_no,
        c.name AS customer_name, c.phone AS customer_phone,
        i.grand_total_paisa,
        COALESCE(r.refund_total, 0) AS refund_total_paisa,
        i.paid_paisa,
        MAX(0, i.grand_total_paisa - COALESCE(r.refund_total, 0) - i.paid_paisa)
            AS due_paisa,
        i.status, i.created_at
    FROM invoices i
    LEFT JOIN customers c ON c.id = i.customer_id
    LEFT JOIN (
        SELECT invoice_id, SUM(subtotal_refund_paisa) AS refund_total
        FROM returns
        GROUP BY invoice_id
    ) r ON r.invoice_id = i.id
"#;

/// Repository for due collection.
#[derive(Debug, Clone)]
pub struct DuesRepository {
    pool: SqlitePool,
}

impl DuesRepository {
    /// Creates a new DuesRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DuesRepository { pool }
    }

    /// Lists invoices with an outstanding due, oldest first (the
    /// collection order).
    pub async fn list(&self) -> DbResult<Vec<DueSummary>> {
        let sql = format!(
            "{DUE_SUMMARY_SQL} \
             WHERE MAX(0, i.grand_total_paisa - COALESCE(r.refund_total, 0) - i.paid_paisa) > 0 \
             ORDER BY i.created_at"
        );

        let dues = sqlx::query_as::<_, DueSummary>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(dues)
    }

    /// Gets an invoice's due position and payment history.
    pub async fn detail(&self, invoice_id: &str) -> DbResult<DueDetail> {
        let sql = format!("{DUE_SUMMARY_SQL} WHERE i.id = ?1");
        let summary = sqlx::query_as::<_, DueSummary>(&sql)
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;

        let payments = self.payments(invoice_id).await?;
        let paid_installments_paisa: i64 = payments.iter().map(|p| p.amount_paisa).sum();

        Ok(DueDetail {
            paid_at_sale_paisa: summary.paid_paisa - paid_installments_paisa,
            paid_installments_paisa,
            summary,
            payments,
        })
    }

    /// Lists an invoice's installments, oldest first.
    pub async fn payments(&self, invoice_id: &str) -> DbResult<Vec<DuePayment>> {
        let payments = sqlx::query_as::<_, DuePayment>(
            r#"
            SELECT id, invoice_id, receipt_no, amount_paisa, note, created_at
            FROM due_payments
            WHERE invoice_id = ?1
            ORDER BY created_at, receipt_no
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Records an installment against an invoice's due.
    ///
    /// ## What This Does, atomically
    /// 1. Recomputes the remaining due (returns-aware) and validates
    ///    the amount against it
    /// 2. Claims a REC-YYYYMMDD-NNNN receipt number
    /// 3. Inserts the payment, bumps the invoice's paid figure and
    ///    re-derives its status
    pub async fn add_payment(
        &self,
        invoice_id: &str,
        amount: f64,
        note: Option<&str>,
    ) -> DbResult<DuePayment> {
        let amount = Money::from_bdt_f64(amount);

        let mut tx = self.pool.begin().await?;

        let invoice: Option<(i64, i64)> = sqlx::query_as(
            "SELECT grand_total_paisa, paid_paisa FROM invoices WHERE id = ?1",
        )
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (grand_total, paid) = invoice
            .map(|(g, p)| (Money::from_paisa(g), Money::from_paisa(p)))
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;

        let refund_total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(subtotal_refund_paisa) FROM returns WHERE invoice_id = ?1",
        )
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await?;
        let refund_total = Money::from_paisa(refund_total.unwrap_or(0));

        let remaining = billing::due(grand_total, refund_total, paid);
        validate_installment(amount, remaining)?;

        let now = Utc::now();
        let receipt_no = next_document_no(&mut tx, RECEIPT_PREFIX, now.date_naive()).await?;

        let payment = DuePayment {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.to_string(),
            receipt_no,
            amount_paisa: amount.paisa(),
            note: note.map(str::to_string),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO due_payments (id, invoice_id, receipt_no, amount_paisa, note, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.invoice_id)
        .bind(&payment.receipt_no)
        .bind(payment.amount_paisa)
        .bind(&payment.note)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        let new_paid = paid + amount;
        let effective = billing::effective_grand_total(grand_total, refund_total);
        let status = InvoiceStatus::derive(new_paid, effective);

        sqlx::query("UPDATE invoices SET paid_paisa = ?2, status = ?3 WHERE id = ?1")
            .bind(invoice_id)
            .bind(new_paid.paisa())
            .bind(status)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            receipt_no = %payment.receipt_no,
            amount = %amount,
            "Recorded due payment"
        );

        Ok(payment)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
