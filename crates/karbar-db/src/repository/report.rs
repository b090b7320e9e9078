//! # Report Repository
//!
//! Read-side reporting: sales summaries, daily breakdowns, per-product
//! movement and returns-aware profit.
//!
//! ## Profit Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  per line, quantities in the unit the sale was entered in:      │
//! │    net revenue = line_total - discount share - refunds          │
//! │    cost        = cost_at_sale × (qty - returned qty)            │
//! │    profit      = net revenue - cost                             │
//! │                                                                 │
//! │  Returned base quantity is converted back into the line's sale  │
//! │  unit (frozen kind, current variant attributes) before it       │
//! │  credits the cost. Cost uses the price frozen at sale time, so  │
//! │  later catalog edits never rewrite history.                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//! Money math happens in Rust on the fetched rows; SQL only filters
//! and groups.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::error::{DbError, DbResult};
use karbar_core::uom::PIPE_LENGTH_FT;
use karbar_core::{billing, Money, ProductKind, Quantity, Uom, UomConfig};

/// Aggregate figures for a date range.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SalesSummary {
    pub invoice_count: i64,
    /// Sum of stored grand totals.
    pub gross_paisa: i64,
    pub refund_paisa: i64,
    /// gross - refunds.
    pub net_paisa: i64,
    pub paid_paisa: i64,
    /// Sum of per-invoice clamped dues.
    pub due_paisa: i64,
}

/// One calendar day of sales.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailySales {
    /// `YYYY-MM-DD`.
    pub day: String,
    pub invoice_count: i64,
    pub gross_paisa: i64,
    pub refund_paisa: i64,
    pub net_paisa: i64,
}

/// Movement of one SKU over a date range.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductSales {
    pub sku: String,
    pub product_name: String,
    /// Base units sold (before returns).
    pub qty_base_milli: i64,
    pub revenue_paisa: i64,
    /// Base units given back across returns.
    pub returned_base_milli: i64,
    pub refund_paisa: i64,
}

/// Returns-aware profit of one invoice.
#[derive(Debug, Clone)]
pub struct InvoiceProfit {
    pub invoice_id: String,
    pub invoice_no: String,
    pub created_at: DateTime<Utc>,
    pub revenue_paisa: i64,
    pub cost_paisa: i64,
    pub profit_paisa: i64,
}

/// Per-line profit breakdown of one invoice.
#[derive(Debug, Clone)]
pub struct LineProfit {
    pub sku: String,
    pub product_name: String,
    pub line_total_paisa: i64,
    pub discount_share_paisa: i64,
    pub refund_paisa: i64,
    pub net_revenue_paisa: i64,
    pub cost_paisa: i64,
    pub profit_paisa: i64,
}

/// Profit detail: the invoice's totals plus every line.
#[derive(Debug, Clone)]
pub struct InvoiceProfitDetail {
    pub invoice_no: String,
    pub revenue_paisa: i64,
    pub cost_paisa: i64,
    pub profit_paisa: i64,
    pub lines: Vec<LineProfit>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ProfitItemRow {
    invoice_id: String,
    sku: String,
    product_name: String,
    product_kind: ProductKind,
    uom: Uom,
    qty_milli: i64,
    line_total_paisa: i64,
    cost_at_sale_paisa: i64,
    returned_base_milli: i64,
    refund_paisa: i64,
    width_in: Option<f64>,
    height_in: Option<f64>,
    rod_length_ft: Option<f64>,
    pipe_length_ft: Option<f64>,
}

impl ProfitItemRow {
    fn uom_config(&self) -> UomConfig {
        match self.product_kind {
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

    /// Quantity still on the customer's hands, in the sale's unit:
    /// returned base quantity converted back through the frozen kind.
    fn net_sale_qty(&self) -> Quantity {
        let returned = self.uom_config().convert(
            self.product_kind.base_uom(),
            self.uom,
            Quantity::from_milli(self.returned_base_milli),
        );
        Quantity::from_milli(self.qty_milli) - returned
    }
}

/// Inclusive [from, to] date range as UTC timestamp bounds.
fn range_bounds(from: NaiveDate, to: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = from.and_time(NaiveTime::MIN).and_utc();
    let end = (to + chrono::Days::new(1)).and_time(NaiveTime::MIN).and_utc();
    (start, end)
}

/// Repository for reporting queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Aggregate sales figures for an inclusive date range.
    pub async fn sales_summary(&self, from: NaiveDate, to: NaiveDate) -> DbResult<SalesSummary> {
        let (start, end) = range_bounds(from, to);

        let summary = sqlx::query_as::<_, SalesSummary>(
            r#"
            SELECT
                COUNT(*) AS invoice_count,
                COALESCE(SUM(i.grand_total_paisa), 0) AS gross_paisa,
                COALESCE(SUM(COALESCE(r.refund_total, 0)), 0) AS refund_paisa,
                COALESCE(SUM(i.grand_total_paisa - COALESCE(r.refund_total, 0)), 0) AS net_paisa,
                COALESCE(SUM(i.paid_paisa), 0) AS paid_paisa,
                COALESCE(SUM(MAX(0, i.grand_total_paisa - COALESCE(r.refund_total, 0) - i.paid_paisa)), 0)
                    AS due_paisa
            FROM invoices i
            LEFT JOIN (
                SELECT invoice_id, SUM(subtotal_refund_paisa) AS refund_total
                FROM returns
                GROUP BY invoice_id
            ) r ON r.invoice_id = i.id
            WHERE i.created_at >= ?1 AND i.created_at < ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Daily sales breakdown over an inclusive date range.
    pub async fn sales_daily(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<DailySales>> {
        let (start, end) = range_bounds(from, to);

        let days = sqlx::query_as::<_, DailySales>(
            r#"
            SELECT
                DATE(i.created_at) AS day,
                COUNT(*) AS invoice_count,
                COALESCE(SUM(i.grand_total_paisa), 0) AS gross_paisa,
                COALESCE(SUM(COALESCE(r.refund_total, 0)), 0) AS refund_paisa,
                COALESCE(SUM(i.grand_total_paisa - COALESCE(r.refund_total, 0)), 0) AS net_paisa
            FROM invoices i
            LEFT JOIN (
                SELECT invoice_id, SUM(subtotal_refund_paisa) AS refund_total
                FROM returns
                GROUP BY invoice_id
            ) r ON r.invoice_id = i.id
            WHERE i.created_at >= ?1 AND i.created_at < ?2
            GROUP BY DATE(i.created_at)
            ORDER BY day
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(days)
    }

    /// Per-SKU movement over an inclusive date range, biggest revenue
    /// first.
    pub async fn sales_by_product(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<ProductSales>> {
        let (start, end) = range_bounds(from, to);

        let products = sqlx::query_as::<_, ProductSales>(
            r#"
            SELECT
                ii.sku,
                ii.product_name,
                COALESCE(SUM(ii.base_qty_milli), 0) AS qty_base_milli,
                COALESCE(SUM(ii.line_total_paisa), 0) AS revenue_paisa,
                COALESCE(SUM(COALESCE(ri.returned_base, 0)), 0) AS returned_base_milli,
                COALESCE(SUM(COALESCE(ri.refund_total, 0)), 0) AS refund_paisa
            FROM invoice_items ii
            JOIN invoices i ON i.id = ii.invoice_id
            LEFT JOIN (
                SELECT invoice_item_id,
                       SUM(base_qty_milli) AS returned_base,
                       SUM(refund_amount_paisa) AS refund_total
                FROM return_items
                GROUP BY invoice_item_id
            ) ri ON ri.invoice_item_id = ii.id
            WHERE i.created_at >= ?1 AND i.created_at < ?2
            GROUP BY ii.sku, ii.product_name
            ORDER BY revenue_paisa DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Per-invoice profit over an inclusive date range, newest first.
    pub async fn profit_list(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<InvoiceProfit>> {
        let (start, end) = range_bounds(from, to);

        let invoices: Vec<(String, String, DateTime<Utc>, i64, i64)> = sqlx::query_as(
            r#"
            SELECT i.id, i.invoice_no, i.created_at,
                   i.grand_total_paisa,
                   COALESCE(r.refund_total, 0) AS refund_total
            FROM invoices i
            LEFT JOIN (
                SELECT invoice_id, SUM(subtotal_refund_paisa) AS refund_total
                FROM returns
                GROUP BY invoice_id
            ) r ON r.invoice_id = i.id
            WHERE i.created_at >= ?1 AND i.created_at < ?2
            ORDER BY i.created_at DESC, i.invoice_no DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, ProfitItemRow>(
            r#"
            SELECT
                ii.invoice_id, ii.sku, ii.product_name,
                ii.product_kind, ii.uom, ii.qty_milli,
                ii.line_total_paisa, ii.cost_at_sale_paisa,
                COALESCE(SUM(ri.base_qty_milli), 0) AS returned_base_milli,
                COALESCE(SUM(ri.refund_amount_paisa), 0) AS refund_paisa,
                v.width_in, v.height_in, v.rod_length_ft, v.pipe_length_ft
            FROM invoice_items ii
            JOIN invoices i ON i.id = ii.invoice_id
            JOIN variants v ON v.id = ii.variant_id
            LEFT JOIN return_items ri ON ri.invoice_item_id = ii.id
            WHERE i.created_at >= ?1 AND i.created_at < ?2
            GROUP BY ii.id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        // Cost per invoice, frozen cost × net sale-unit quantity
        let mut cost_by_invoice: HashMap<String, Money> = HashMap::new();
        for row in &items {
            let cost = Money::from_paisa(row.cost_at_sale_paisa).mul_quantity(row.net_sale_qty());
            *cost_by_invoice
                .entry(row.invoice_id.clone())
                .or_insert_with(Money::zero) += cost;
        }

        let profits = invoices
            .into_iter()
            .map(|(id, invoice_no, created_at, grand, refund)| {
                let revenue =
                    billing::effective_grand_total(Money::from_paisa(grand), Money::from_paisa(refund));
                let cost = cost_by_invoice.get(&id).copied().unwrap_or_default();
                InvoiceProfit {
                    invoice_id: id,
                    invoice_no,
                    created_at,
                    revenue_paisa: revenue.paisa(),
                    cost_paisa: cost.paisa(),
                    profit_paisa: (revenue - cost).paisa(),
                }
            })
            .collect();

        Ok(profits)
    }

    /// Per-line profit breakdown of one invoice.
    ///
    /// The invoice-level discount is apportioned across lines by
    /// revenue share; the shares sum to exactly the discount.
    pub async fn profit_detail(&self, invoice_id: &str) -> DbResult<InvoiceProfitDetail> {
        let invoice: Option<(String, i64)> = sqlx::query_as(
            "SELECT invoice_no, discount_paisa FROM invoices WHERE id = ?1",
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?;
        let (invoice_no, discount) = invoice
            .map(|(no, d)| (no, Money::from_paisa(d)))
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;

        let items = sqlx::query_as::<_, ProfitItemRow>(
            r#"
            SELECT
                ii.invoice_id, ii.sku, ii.product_name,
                ii.product_kind, ii.uom, ii.qty_milli,
                ii.line_total_paisa, ii.cost_at_sale_paisa,
                COALESCE(SUM(ri.base_qty_milli), 0) AS returned_base_milli,
                COALESCE(SUM(ri.refund_amount_paisa), 0) AS refund_paisa,
                v.width_in, v.height_in, v.rod_length_ft, v.pipe_length_ft
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

        let line_totals: Vec<Money> = items
            .iter()
            .map(|i| Money::from_paisa(i.line_total_paisa))
            .collect();
        let shares = billing::apportion_discount(&line_totals, discount);

        let mut lines = Vec::with_capacity(items.len());
        let mut revenue_total = Money::zero();
        let mut cost_total = Money::zero();

        for (row, share) in items.iter().zip(shares) {
            let refund = Money::from_paisa(row.refund_paisa);
            let net_revenue = Money::from_paisa(row.line_total_paisa) - share - refund;
            let cost = Money::from_paisa(row.cost_at_sale_paisa).mul_quantity(row.net_sale_qty());

            revenue_total += net_revenue;
            cost_total += cost;

            lines.push(LineProfit {
                sku: row.sku.clone(),
                product_name: row.product_name.clone(),
                line_total_paisa: row.line_total_paisa,
                discount_share_paisa: share.paisa(),
                refund_paisa: refund.paisa(),
                net_revenue_paisa: net_revenue.paisa(),
                cost_paisa: cost.paisa(),
                profit_paisa: (net_revenue - cost).paisa(),
            });
        }

        Ok(InvoiceProfitDetail {
            invoice_no,
            revenue_paisa: revenue_total.paisa(),
            cost_paisa: cost_total.paisa(),
            profit_paisa: (revenue_total - cost_total).paisa(),
            lines,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{empty_invoice, line, ret_line, seed_catalog, test_db};
    use karbar_core::{NewInvoice, NewReturn};

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[tokio::test]
    async fn test_sales_summary_is_returns_aware() {
        let db = test_db().await;
        let catalog = seed_catalog(&db).await;

        // Invoice A: 2 sheets, Tk 240, paid in full
        let a = db
            .invoices()
            .create_invoice(&NewInvoice {
                lines: vec![line(&catalog.glass.id, "sheet", 2.0)],
                paid_amount: 240.0,
                ..empty_invoice()
            })
            .await
            .unwrap();
        // Invoice B: Tk 120, unpaid
        db.invoices()
            .create_invoice(&NewInvoice {
                lines: vec![line(&catalog.glass.id, "sheet", 1.0)],
                ..empty_invoice()
            })
            .await
            .unwrap();

        // Return one sheet from A
        db.returns()
            .create_return(&NewReturn {
                invoice_id: a.invoice.id.clone(),
                lines: vec![ret_line(&a.items[0].id, "sheet", 1.0)],
                note: None,
                new_discount: None,
            })
            .await
            .unwrap();

        let summary = db.reports().sales_summary(today(), today()).await.unwrap();
        assert_eq!(summary.invoice_count, 2);
        assert_eq!(summary.gross_paisa, 36000);
        assert_eq!(summary.refund_paisa, 12000);
        assert_eq!(summary.net_paisa, 24000);
        assert_eq!(summary.paid_paisa, 24000);
        // A's overlap clamps to zero; only B's 120 is due
        assert_eq!(summary.due_paisa, 12000);
    }

    #[tokio::test]
    async fn test_profit_uses_frozen_cost_and_returns() {
        let db = test_db().await;
        let catalog = seed_catalog(&db).await;

        // 2 sheets @ Tk 120, cost Tk 80 → profit Tk 80
        let sale = db
            .invoices()
            .create_invoice(&NewInvoice {
                lines: vec![line(&catalog.glass.id, "sheet", 2.0)],
                ..empty_invoice()
            })
            .await
            .unwrap();

        // Raising the catalog cost afterwards must not rewrite history
        db.products()
            .update_prices(&catalog.glass.id, None, None, Some(500.0))
            .await
            .unwrap();

        let profits = db.reports().profit_list(today(), today()).await.unwrap();
        assert_eq!(profits.len(), 1);
        assert_eq!(profits[0].revenue_paisa, 24000);
        assert_eq!(profits[0].cost_paisa, 16000);
        assert_eq!(profits[0].profit_paisa, 8000);

        // Return one sheet: revenue drops Tk 120, cost drops Tk 80
        db.returns()
            .create_return(&NewReturn {
                invoice_id: sale.invoice.id.clone(),
                lines: vec![ret_line(&sale.items[0].id, "sheet", 1.0)],
                note: None,
                new_discount: None,
            })
            .await
            .unwrap();

        let profits = db.reports().profit_list(today(), today()).await.unwrap();
        assert_eq!(profits[0].revenue_paisa, 12000);
        assert_eq!(profits[0].cost_paisa, 8000);
        assert_eq!(profits[0].profit_paisa, 4000);
    }

    #[tokio::test]
    async fn test_profit_on_alt_uom_sale_costs_in_sale_unit() {
        let db = test_db().await;
        let catalog = seed_catalog(&db).await;

        // 9 sqft @ Tk 22 = 198; cost Tk 80 is charged per sale unit,
        // so the full-line cost basis is 80 × 9
        let sale = db
            .invoices()
            .create_invoice(&NewInvoice {
                lines: vec![line(&catalog.glass.id, "sqft", 9.0)],
                ..empty_invoice()
            })
            .await
            .unwrap();

        let profits = db.reports().profit_list(today(), today()).await.unwrap();
        assert_eq!(profits[0].revenue_paisa, 19800);
        assert_eq!(profits[0].cost_paisa, 8000 * 9);

        // Return 3 sqft: half a sheet in base units, converted back to
        // exactly 3 sqft for the cost credit
        db.returns()
            .create_return(&NewReturn {
                invoice_id: sale.invoice.id.clone(),
                lines: vec![ret_line(&sale.items[0].id, "sqft", 3.0)],
                note: None,
                new_discount: None,
            })
            .await
            .unwrap();

        let profits = db.reports().profit_list(today(), today()).await.unwrap();
        assert_eq!(profits[0].revenue_paisa, 19800 - 6600);
        assert_eq!(profits[0].cost_paisa, 8000 * 6);
        assert_eq!(profits[0].profit_paisa, 13200 - 48000);

        let detail = db.reports().profit_detail(&sale.invoice.id).await.unwrap();
        assert_eq!(detail.lines[0].refund_paisa, 6600);
        assert_eq!(detail.lines[0].cost_paisa, 48000);
        assert_eq!(detail.profit_paisa, 13200 - 48000);
    }

    #[tokio::test]
    async fn test_profit_detail_apportions_discount_exactly() {
        let db = test_db().await;
        let catalog = seed_catalog(&db).await;

        // Lines: Tk 240 glass + Tk 35 hardware; Tk 25 discount
        let sale = db
            .invoices()
            .create_invoice(&NewInvoice {
                lines: vec![
                    line(&catalog.glass.id, "sheet", 2.0),
                    line(&catalog.others.id, "piece", 1.0),
                ],
                discount: 25.0,
                ..empty_invoice()
            })
            .await
            .unwrap();

        let detail = db.reports().profit_detail(&sale.invoice.id).await.unwrap();
        assert_eq!(detail.lines.len(), 2);

        let share_sum: i64 = detail.lines.iter().map(|l| l.discount_share_paisa).sum();
        assert_eq!(share_sum, 2500);

        // Revenue across lines nets to grand total
        let revenue_sum: i64 = detail.lines.iter().map(|l| l.net_revenue_paisa).sum();
        assert_eq!(revenue_sum, 25000); // 275 - 25
        assert_eq!(detail.revenue_paisa, 25000);
    }

    #[tokio::test]
    async fn test_sales_by_product_groups_sku() {
        let db = test_db().await;
        let catalog = seed_catalog(&db).await;

        let sale = db
            .invoices()
            .create_invoice(&NewInvoice {
                lines: vec![
                    line(&catalog.glass.id, "sqft", 3.0),
                    line(&catalog.glass.id, "sheet", 1.0),
                    line(&catalog.thai.id, "ft", 21.0),
                ],
                ..empty_invoice()
            })
            .await
            .unwrap();

        // Give the whole sqft line back
        db.returns()
            .create_return(&NewReturn {
                invoice_id: sale.invoice.id.clone(),
                lines: vec![ret_line(&sale.items[0].id, "sqft", 3.0)],
                note: None,
                new_discount: None,
            })
            .await
            .unwrap();

        let products = db.reports().sales_by_product(today(), today()).await.unwrap();
        assert_eq!(products.len(), 2);

        let glass = products
            .iter()
            .find(|p| p.sku == catalog.glass.sku)
            .unwrap();
        // 0.5 sheet + 1 sheet
        assert_eq!(glass.qty_base_milli, 1500);
        assert_eq!(glass.revenue_paisa, 6600 + 12000);
        assert_eq!(glass.returned_base_milli, 500);
        assert_eq!(glass.refund_paisa, 6600);

        let thai = products.iter().find(|p| p.sku == catalog.thai.sku).unwrap();
        assert_eq!(thai.returned_base_milli, 0);
        assert_eq!(thai.refund_paisa, 0);
    }

    #[tokio::test]
    async fn test_sales_daily_groups_by_day() {
        let db = test_db().await;
        let catalog = seed_catalog(&db).await;

        let yesterday = today() - chrono::Days::new(1);
        db.invoices()
            .create_invoice(&NewInvoice {
                invoice_date: Some(yesterday),
                lines: vec![line(&catalog.others.id, "piece", 1.0)],
                ..empty_invoice()
            })
            .await
            .unwrap();
        db.invoices()
            .create_invoice(&NewInvoice {
                lines: vec![line(&catalog.others.id, "piece", 2.0)],
                ..empty_invoice()
            })
            .await
            .unwrap();

        let days = db.reports().sales_daily(yesterday, today()).await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, yesterday.format("%Y-%m-%d").to_string());
        assert_eq!(days[0].invoice_count, 1);
        assert_eq!(days[1].invoice_count, 1);
    }
}
