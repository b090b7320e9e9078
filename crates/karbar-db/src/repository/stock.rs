//! # Stock Repository
//!
//! Every stock movement in the system funnels through this module:
//! sale decrements, return increments, and direct restocks.
//!
//! ## The Guarded Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  UPDATE variants                                                │
//! │     SET on_hand_milli = on_hand_milli - :qty                    │
//! │   WHERE id = :id AND on_hand_milli >= :qty                      │
//! │                                                                 │
//! │  rows_affected == 0  →  InsufficientStock, transaction aborts   │
//! │                                                                 │
//! │  The availability check and the decrement are ONE statement,    │
//! │  so no interleaving can oversell. A separate SELECT-then-UPDATE │
//! │  could.                                                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::{VariantWithKind, VARIANT_WITH_KIND_SQL};
use karbar_core::billing::weighted_average_cost;
use karbar_core::{CoreError, Money, NewRestock, Quantity, Restock, ValidationError};

/// Repository for stock movements and the restock audit ledger.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Applies a direct stock movement (restock, opening correction).
    ///
    /// ## What This Does, atomically
    /// 1. Adjusts `on_hand` by the signed base-unit delta; corrections
    ///    are unbounded and may push `on_hand` below zero, only sale
    ///    decrements are guarded
    /// 2. Inserts the restock audit row
    /// 3. On a positive delta with a cost, re-weights the variant's
    ///    average cost price
    pub async fn create_restock(&self, input: &NewRestock) -> DbResult<Restock> {
        let qty = Quantity::from_f64(input.qty_base);
        if qty.is_zero() {
            return Err(ValidationError::MustBePositive {
                field: "qty_base".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let before: Option<(i64, i64)> = sqlx::query_as(
            "SELECT on_hand_milli, cost_price_paisa FROM variants WHERE id = ?1",
        )
        .bind(&input.variant_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (on_hand_before, cost_before) =
            before.ok_or_else(|| DbError::not_found("Variant", &input.variant_id))?;

        increment(&mut tx, &input.variant_id, qty).await?;

        let cost = input.cost_per_unit.map(Money::from_bdt_f64);

        // Weighted average cost: only incoming stock with a known cost
        // moves the average
        if let Some(cost) = cost.filter(|_| qty.is_positive()) {
            let weighted = weighted_average_cost(
                Quantity::from_milli(on_hand_before),
                Money::from_paisa(cost_before),
                qty,
                cost,
            );

            sqlx::query(
                "UPDATE variants SET cost_price_paisa = ?2, updated_at = ?3 WHERE id = ?1",
            )
            .bind(&input.variant_id)
            .bind(weighted.paisa())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

            debug!(
                variant_id = %input.variant_id,
                cost_paisa = weighted.paisa(),
                "Re-weighted average cost"
            );
        }

        let restock = Restock {
            id: Uuid::new_v4().to_string(),
            variant_id: input.variant_id.clone(),
            qty_base_milli: qty.milli(),
            cost_per_unit_paisa: cost.unwrap_or_default().paisa(),
            note: input.note.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO restocks (id, variant_id, qty_base_milli, cost_per_unit_paisa, note, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&restock.id)
        .bind(&restock.variant_id)
        .bind(restock.qty_base_milli)
        .bind(restock.cost_per_unit_paisa)
        .bind(&restock.note)
        .bind(restock.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            variant_id = %input.variant_id,
            qty = %qty,
            "Recorded stock movement"
        );

        Ok(restock)
    }

    /// Lists a variant's stock movements, newest first.
    pub async fn list_restocks(&self, variant_id: &str) -> DbResult<Vec<Restock>> {
        let restocks = sqlx::query_as::<_, Restock>(
            r#"
            SELECT id, variant_id, qty_base_milli, cost_per_unit_paisa, note, created_at
            FROM restocks
            WHERE variant_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(variant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(restocks)
    }

    /// Lists active variants at or below their low-stock threshold.
    /// Variants with no threshold configured never appear.
    pub async fn low_stock(&self) -> DbResult<Vec<VariantWithKind>> {
        let sql = format!(
            "{VARIANT_WITH_KIND_SQL} \
             WHERE v.active = 1 \
               AND v.low_stock_threshold_milli > 0 \
               AND v.on_hand_milli <= v.low_stock_threshold_milli \
             ORDER BY v.sku"
        );

        let variants = sqlx::query_as::<_, VariantWithKind>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(variants)
    }
}

/// Decrements a variant's on-hand stock, failing if stock is short.
///
/// Check and decrement are a single guarded UPDATE so concurrent sales
/// can never jointly oversell a variant. Runs on the document's
/// transaction; a failure rolls the whole document back.
pub(crate) async fn decrement_guarded(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    variant_id: &str,
    base_qty: Quantity,
    context: &str,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE variants
        SET on_hand_milli = on_hand_milli - ?2, updated_at = ?3
        WHERE id = ?1 AND on_hand_milli >= ?2
        "#,
    )
    .bind(variant_id)
    .bind(base_qty.milli())
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        // Guard rejected: report the shortfall with current figures
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT sku, on_hand_milli FROM variants WHERE id = ?1")
                .bind(variant_id)
                .fetch_optional(&mut **tx)
                .await?;
        let (sku, available) =
            row.ok_or_else(|| DbError::not_found("Variant", variant_id))?;

        debug!(sku = %sku, context, "Stock guard rejected decrement");

        return Err(CoreError::InsufficientStock {
            sku,
            available: Quantity::from_milli(available),
            requested: base_qty,
        }
        .into());
    }

    Ok(())
}

/// Applies a signed delta to a variant's on-hand stock (returns,
/// restocks). A negative correction may drive the figure below zero.
pub(crate) async fn increment(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    variant_id: &str,
    base_qty: Quantity,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE variants
        SET on_hand_milli = on_hand_milli + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(variant_id)
    .bind(base_qty.milli())
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Variant", variant_id));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
