//! # Return Repository
//!
//! The refund engine: processes returns against a single invoice,
//! restores stock and prices refunds, in one transaction.
//!
//! ## Return Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                          │
//! │    claim RET-YYYYMMDD-NNNN                                      │
//! │    insert return header (subtotal filled in after the loop)     │
//! │    for each line:                                               │
//! │      normalize uom (may differ from the sale's uom)             │
//! │      convert to base units via the CURRENT variant attributes   │
//! │      check cumulative returns ≤ sold base qty ── over? ROLLBACK │
//! │      price refund (override wins over rate × qty)               │
//! │      stock increment                                            │
//! │      insert return item                                         │
//! │    finalize header subtotal, annotate invoice remark/status     │
//! │    optionally replace the invoice discount                      │
//! │  COMMIT                                                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The over-return check accumulates within the batch: two lines of
//! the same request against one invoice item are summed before the
//! comparison, so a batch cannot sneak past the allowance line by
//! line.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::sequence::next_document_no;
use karbar_core::validation::{validate_has_lines, validate_txn_qty};
use karbar_core::{
    billing, normalize_uom, CoreError, InvoiceItem, InvoiceStatus, Money, NewReturn, Quantity,
    Return, ReturnItem, RETURN_PREFIX,
};

/// An invoice item with its cumulative returned quantity, for the
/// returns screen.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReturnableItem {
    #[sqlx(flatten)]
    pub item: InvoiceItem,
    /// Base units already returned across all prior returns.
    pub returned_base_milli: i64,
    /// Current catalog rate per base unit, for previewing the refund.
    pub current_price_base_paisa: Option<i64>,
    /// Current catalog rate per alternate unit.
    pub current_price_alt_paisa: Option<i64>,
}

impl ReturnableItem {
    /// Base units still eligible for return.
    pub fn remaining_base(&self) -> Quantity {
        Quantity::from_milli(self.item.base_qty_milli - self.returned_base_milli)
    }
}

/// A return with its lines.
#[derive(Debug, Clone)]
pub struct ReturnDetail {
    pub header: Return,
    pub items: Vec<ReturnItem>,
}

/// One row of the returns list view.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReturnSummary {
    pub id: String,
    pub return_no: String,
    pub invoice_id: String,
    pub invoice_no: String,
    pub subtotal_refund_paisa: i64,
    pub created_at: DateTime<Utc>,
}

/// Repository for return operations.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    /// Creates a new ReturnRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Lists an invoice's items with their remaining returnable
    /// quantities.
    pub async fn returnable_items(&self, invoice_id: &str) -> DbResult<Vec<ReturnableItem>> {
        let items = sqlx::query_as::<_, ReturnableItem>(
            r#"
            SELECT
                ii.id, ii.invoice_id, ii.variant_id,
                ii.sku, ii.product_name, ii.product_kind, ii.variant_label,
                ii.uom, ii.qty_milli, ii.base_qty_milli,
                ii.unit_price_paisa, ii.line_total_paisa, ii.cost_at_sale_paisa,
                ii.created_at,
                COALESCE(SUM(ri.base_qty_milli), 0) AS returned_base_milli,
                v.price_base_paisa AS current_price_base_paisa,
                v.price_alt_paisa AS current_price_alt_paisa
            FROM invoice_items ii
            JOIN variants v ON v.id = ii.variant_id
            LEFT JOIN return_items ri ON ri.invoice_item_id = ii.id
            WHERE ii.invoice_id = ?1
            GROUP BY ii.id
            ORDER BY ii.rowid
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Processes a return against an invoice.
    ///
    /// Conversion uses each line's frozen product kind with the
    /// variant's current physical attributes; refund rates come from
    /// the variant's current prices unless a line carries an override.
    pub async fn create_return(&self, input: &NewReturn) -> DbResult<ReturnDetail> {
        validate_has_lines("items", &input.lines)?;

        let mut tx = self.pool.begin().await?;

        let invoice: Option<(i64, i64, i64, i64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT subtotal_paisa, discount_paisa, grand_total_paisa, paid_paisa, remark
            FROM invoices WHERE id = ?1
            "#,
        )
        .bind(&input.invoice_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (subtotal, _discount, mut grand_total, paid, remark) = invoice
            .map(|(s, d, g, p, r)| {
                (
                    Money::from_paisa(s),
                    Money::from_paisa(d),
                    Money::from_paisa(g),
                    Money::from_paisa(p),
                    r,
                )
            })
            .ok_or_else(|| DbError::not_found("Invoice", &input.invoice_id))?;

        let now = Utc::now();
        let return_no = next_document_no(&mut tx, RETURN_PREFIX, now.date_naive()).await?;
        let return_id = Uuid::new_v4().to_string();

        // Insert the header before any return_items rows so their
        // return_id foreign key has a parent; the accumulated refund
        // subtotal is written after the line loop.
        sqlx::query(
            r#"
            INSERT INTO returns (id, return_no, invoice_id, subtotal_refund_paisa, note, created_at)
            VALUES (?1, ?2, ?3, 0, ?4, ?5)
            "#,
        )
        .bind(&return_id)
        .bind(&return_no)
        .bind(&input.invoice_id)
        .bind(&input.note)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Within-batch accumulation per invoice item
        let mut batch_returned: HashMap<String, i64> = HashMap::new();
        let mut items = Vec::with_capacity(input.lines.len());
        let mut refund_subtotal = Money::zero();

        for line in &input.lines {
            let item = sqlx::query_as::<_, InvoiceItem>(
                r#"
                SELECT id, invoice_id, variant_id,
                       sku, product_name, product_kind, variant_label,
                       uom, qty_milli, base_qty_milli,
                       unit_price_paisa, line_total_paisa, cost_at_sale_paisa,
                       created_at
                FROM invoice_items
                WHERE id = ?1
                "#,
            )
            .bind(&line.invoice_item_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice item", &line.invoice_item_id))?;

            if item.invoice_id != input.invoice_id {
                return Err(DbError::not_found("Invoice item", &line.invoice_item_id));
            }

            let variant =
                crate::repository::product::fetch_variant_with_kind(&mut tx, &item.variant_id)
                    .await?
                    .variant;
            let kind = item.product_kind;

            let uom = normalize_uom(&line.uom, kind);
            let qty = Quantity::from_f64(line.qty);
            validate_txn_qty(qty, uom, kind)?;

            let cfg = variant.uom_config(kind);
            let base_qty = cfg.to_base(uom, qty);
            if !base_qty.is_positive() {
                return Err(CoreError::Configuration(format!(
                    "conversion for {} yields no stock restoration; check its physical attributes",
                    item.sku
                ))
                .into());
            }

            let prior: Option<i64> = sqlx::query_scalar(
                "SELECT SUM(base_qty_milli) FROM return_items WHERE invoice_item_id = ?1",
            )
            .bind(&item.id)
            .fetch_one(&mut *tx)
            .await?;
            let in_batch = batch_returned.get(&item.id).copied().unwrap_or(0);
            let remaining =
                Quantity::from_milli(item.base_qty_milli - prior.unwrap_or(0) - in_batch);

            if base_qty > remaining {
                return Err(CoreError::OverReturn {
                    sku: item.sku.clone(),
                    requested: base_qty,
                    remaining,
                }
                .into());
            }
            *batch_returned.entry(item.id.clone()).or_insert(0) += base_qty.milli();

            let refund = billing::compute_refund(
                qty,
                uom == kind.base_uom(),
                variant.price_base(),
                variant.price_alt(),
                line.refund_override.map(Money::from_bdt_f64),
            )?;

            crate::repository::stock::increment(&mut tx, &variant.id, base_qty).await?;

            let return_item = ReturnItem {
                id: Uuid::new_v4().to_string(),
                return_id: return_id.clone(),
                invoice_item_id: item.id.clone(),
                variant_id: variant.id.clone(),
                product_name: item.product_name.clone(),
                variant_label: item.variant_label.clone(),
                uom,
                qty_milli: qty.milli(),
                base_qty_milli: base_qty.milli(),
                effective_rate_paisa: refund.effective_rate.paisa(),
                refund_amount_paisa: refund.refund_amount.paisa(),
                refund_override_paisa: refund.refund_override.map(|m| m.paisa()),
                note: line.note.clone(),
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO return_items (
                    id, return_id, invoice_item_id, variant_id,
                    product_name, variant_label, uom,
                    qty_milli, base_qty_milli,
                    effective_rate_paisa, refund_amount_paisa, refund_override_paisa,
                    note, created_at
                ) VALUES (
                    ?1, ?2, ?3, ?4,
                    ?5, ?6, ?7,
                    ?8, ?9,
                    ?10, ?11, ?12,
                    ?13, ?14
                )
                "#,
            )
            .bind(&return_item.id)
            .bind(&return_item.return_id)
            .bind(&return_item.invoice_item_id)
            .bind(&return_item.variant_id)
            .bind(&return_item.product_name)
            .bind(&return_item.variant_label)
            .bind(return_item.uom)
            .bind(return_item.qty_milli)
            .bind(return_item.base_qty_milli)
            .bind(return_item.effective_rate_paisa)
            .bind(return_item.refund_amount_paisa)
            .bind(return_item.refund_override_paisa)
            .bind(&return_item.note)
            .bind(return_item.created_at)
            .execute(&mut *tx)
            .await?;

            refund_subtotal += refund.refund_amount;
            items.push(return_item);
        }

        let header = Return {
            id: return_id,
            return_no,
            invoice_id: input.invoice_id.clone(),
            subtotal_refund_paisa: refund_subtotal.paisa(),
            note: input.note.clone(),
            created_at: now,
        };

        sqlx::query("UPDATE returns SET subtotal_refund_paisa = ?2 WHERE id = ?1")
            .bind(&header.id)
            .bind(header.subtotal_refund_paisa)
            .execute(&mut *tx)
            .await?;

        // Optional discount replacement recomputes the stored grand
        // total; the stored subtotal never changes
        if let Some(new_discount) = input.new_discount {
            let discount = Money::from_bdt_f64(new_discount).clamp_non_negative();
            grand_total = billing::grand_total(subtotal, discount);

            sqlx::query(
                "UPDATE invoices SET discount_paisa = ?2, grand_total_paisa = ?3 WHERE id = ?1",
            )
            .bind(&input.invoice_id)
            .bind(discount.paisa())
            .bind(grand_total.paisa())
            .execute(&mut *tx)
            .await?;
        }

        // Refresh status against the returns-adjusted total and leave
        // an audit line on the invoice
        let refund_total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(subtotal_refund_paisa) FROM returns WHERE invoice_id = ?1",
        )
        .bind(&input.invoice_id)
        .fetch_one(&mut *tx)
        .await?;
        let effective =
            billing::effective_grand_total(grand_total, Money::from_paisa(refund_total.unwrap_or(0)));
        let status = InvoiceStatus::derive(paid, effective);

        let annotation = format!("Return {} refunded {}", header.return_no, refund_subtotal);
        let remark = match remark.filter(|r| !r.is_empty()) {
            Some(existing) => format!("{existing} | {annotation}"),
            None => annotation,
        };

        sqlx::query("UPDATE invoices SET status = ?2, remark = ?3 WHERE id = ?1")
            .bind(&input.invoice_id)
            .bind(status)
            .bind(&remark)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            return_no = %header.return_no,
            refund = %refund_subtotal,
            lines = items.len(),
            "Processed return"
        );

        Ok(ReturnDetail { header, items })
    }

    /// Gets a return with its lines.
    pub async fn get_detail(&self, id: &str) -> DbResult<ReturnDetail> {
        let header = sqlx::query_as::<_, Return>(
            r#"
            SELECT id, return_no, invoice_id, subtotal_refund_paisa, note, created_at
            FROM returns
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Return", id))?;

        let items = sqlx::query_as::<_, ReturnItem>(
            r#"
            SELECT id, return_id, invoice_item_id, variant_id,
                   product_name, variant_label, uom,
                   qty_milli, base_qty_milli,
                   effective_rate_paisa, refund_amount_paisa, refund_override_paisa,
                   note, created_at
            FROM return_items
            WHERE return_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ReturnDetail { header, items })
    }

    /// Lists returns newest first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<ReturnSummary>> {
        let summaries = sqlx::query_as::<_, ReturnSummary>(
            r#"
            SELECT r.id, r.return_no, r.invoice_id, i.invoice_no,
                   r.subtotal_refund_paisa, r.created_at
            FROM returns r
            JOIN invoices i ON i.id = r.invoice_id
            ORDER BY r.created_at DESC, r.return_no DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(summaries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{empty_invoice, line, ret_line, seed_catalog, test_db};
    use karbar_core::{NewInvoice, NewReturnLine, Uom};

    async fn glass_sale(db: &crate::Database, catalog: &crate::testutil::Catalog) -> super::super::invoice::InvoiceDetail {
        db.invoices()
            .create_invoice(&NewInvoice {
                lines: vec![line(&catalog.glass.id, "sheet", 2.0)],
                paid_amount: 240.0,
                ..empty_invoice()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_return_in_alt_uom_restores_stock() {
        let db = test_db().await;
        let catalog = seed_catalog(&db).await;
        let sale = glass_sale(&db, &catalog).await;

        // Sold 2 sheets; return 3 sqft (half a sheet) at Tk 22/sqft
        let detail = db
            .returns()
            .create_return(&NewReturn {
                invoice_id: sale.invoice.id.clone(),
                lines: vec![ret_line(&sale.items[0].id, "sqft", 3.0)],
                note: None,
                new_discount: None,
            })
            .await
            .unwrap();

        assert!(detail.header.return_no.starts_with("RET-"));
        assert_eq!(detail.header.subtotal_refund_paisa, 6600);
        let item = &detail.items[0];
        assert_eq!(item.uom, Uom::Sqft);
        assert_eq!(item.base_qty_milli, 500);
        assert_eq!(item.effective_rate_paisa, 2200);
        assert_eq!(item.refund_override_paisa, None);

        // Stock back up by half a sheet: 10 - 2 + 0.5
        let variant = db
            .products()
            .get_variant(&catalog.glass.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(variant.on_hand_milli, 8_500);

        // Invoice remark carries the audit line
        let invoice = db
            .invoices()
            .get_by_id(&sale.invoice.id)
            .await
            .unwrap()
            .unwrap();
        assert!(invoice.remark.unwrap().contains(&detail.header.return_no));
    }

    #[tokio::test]
    async fn test_refund_override_preserved_and_rate_back_derived() {
        let db = test_db().await;
        let catalog = seed_catalog(&db).await;
        let sale = glass_sale(&db, &catalog).await;

        let detail = db
            .returns()
            .create_return(&NewReturn {
                invoice_id: sale.invoice.id.clone(),
                lines: vec![NewReturnLine {
                    invoice_item_id: sale.items[0].id.clone(),
                    uom: "sqft".to_string(),
                    qty: 3.0,
                    refund_override: Some(50.0),
                    note: Some("edge damage".to_string()),
                }],
                note: None,
                new_discount: None,
            })
            .await
            .unwrap();

        let item = &detail.items[0];
        assert_eq!(item.refund_amount_paisa, 5000);
        assert_eq!(item.refund_override_paisa, Some(5000));
        assert_eq!(item.effective_rate_paisa, 1667); // 5000 / 3.000
        assert_eq!(detail.header.subtotal_refund_paisa, 5000);
    }

    #[tokio::test]
    async fn test_over_return_rejected_across_batch() {
        let db = test_db().await;
        let catalog = seed_catalog(&db).await;
        let sale = glass_sale(&db, &catalog).await;

        // Sold 2 sheets = 12 sqft. Two lines of 7 sqft each pass the
        // per-line check but not the batch total.
        let err = db
            .returns()
            .create_return(&NewReturn {
                invoice_id: sale.invoice.id.clone(),
                lines: vec![
                    ret_line(&sale.items[0].id, "sqft", 7.0),
                    ret_line(&sale.items[0].id, "sqft", 7.0),
                ],
                note: None,
                new_discount: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::OverReturn { .. })));

        // First line's stock increment rolled back with the batch
        let variant = db
            .products()
            .get_variant(&catalog.glass.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(variant.on_hand_milli, 8_000);
        assert!(db.returns().list(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_over_return_rejected_across_returns() {
        let db = test_db().await;
        let catalog = seed_catalog(&db).await;
        let sale = glass_sale(&db, &catalog).await;

        // Return both sheets, then try one more sqft
        db.returns()
            .create_return(&NewReturn {
                invoice_id: sale.invoice.id.clone(),
                lines: vec![ret_line(&sale.items[0].id, "sheet", 2.0)],
                note: None,
                new_discount: None,
            })
            .await
            .unwrap();

        let err = db
            .returns()
            .create_return(&NewReturn {
                invoice_id: sale.invoice.id.clone(),
                lines: vec![ret_line(&sale.items[0].id, "sqft", 1.0)],
                note: None,
                new_discount: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::OverReturn { .. })));
    }

    #[tokio::test]
    async fn test_returnable_items_tracks_remaining() {
        let db = test_db().await;
        let catalog = seed_catalog(&db).await;
        let sale = glass_sale(&db, &catalog).await;

        db.returns()
            .create_return(&NewReturn {
                invoice_id: sale.invoice.id.clone(),
                lines: vec![ret_line(&sale.items[0].id, "sqft", 3.0)],
                note: None,
                new_discount: None,
            })
            .await
            .unwrap();

        let returnable = db
            .returns()
            .returnable_items(&sale.invoice.id)
            .await
            .unwrap();
        assert_eq!(returnable.len(), 1);
        assert_eq!(returnable[0].returned_base_milli, 500);
        assert_eq!(returnable[0].remaining_base().milli(), 1_500);
        assert_eq!(returnable[0].current_price_base_paisa, Some(12_000));
        assert_eq!(returnable[0].current_price_alt_paisa, Some(2_200));
    }

    #[tokio::test]
    async fn test_discount_replacement_recomputes_grand_total() {
        let db = test_db().await;
        let catalog = seed_catalog(&db).await;

        // Subtotal 240, discount 40 → grand 200, fully paid
        let sale = db
            .invoices()
            .create_invoice(&NewInvoice {
                lines: vec![line(&catalog.glass.id, "sheet", 2.0)],
                discount: 40.0,
                paid_amount: 200.0,
                ..empty_invoice()
            })
            .await
            .unwrap();

        db.returns()
            .create_return(&NewReturn {
                invoice_id: sale.invoice.id.clone(),
                lines: vec![ret_line(&sale.items[0].id, "sheet", 1.0)],
                note: None,
                new_discount: Some(20.0),
            })
            .await
            .unwrap();

        let invoice = db
            .invoices()
            .get_by_id(&sale.invoice.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invoice.discount_paisa, 2000);
        assert_eq!(invoice.grand_total_paisa, 22000);
    }
}
