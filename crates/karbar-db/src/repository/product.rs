//! # Product Repository
//!
//! Catalog operations: products (the four kinds) and their stocked
//! variants.
//!
//! ## Catalog Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Product "Clear Glass" (kind: glass)                            │
//! │  ├── Variant GL-24x36-5MM  24in × 36in, Tk 120/sheet, Tk 22/sqft│
//! │  └── Variant GL-36x48-5MM  36in × 48in, ...                     │
//! │                                                                 │
//! │  Product "Thai Aluminum"  (kind: thai_aluminum)                 │
//! │  └── Variant TA-21FT       21 ft rods, Tk/bar + Tk/ft           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//! The kind lives on the product; variants carry only the physical
//! attributes that kind needs.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use karbar_core::validation::{validate_name, validate_sku};
use karbar_core::{Money, NewVariant, Product, ProductKind, Quantity, Variant};

/// A variant joined with its product's kind and name, the shape the
/// sale and return engines price against.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VariantWithKind {
    #[sqlx(flatten)]
    pub variant: Variant,
    pub kind: ProductKind,
    pub product_name: String,
}

pub(crate) const VARIANT_WITH_KIND_SQL: &str = r#"
    SELECT
        v.id, v.product_id, v.sku, v.size_label, v.color,
        v.thickness_mm, v.width_in, v.height_in, v.rod_length_ft, v.pipe_length_ft,
        v.price_base_paisa, v.price_alt_paisa, v.cost_price_paisa,
        v.on_hand_milli, v.low_stock_threshold_milli, v.active,
        v.created_at, v.updated_at,
        p.kind AS kind, p.name AS product_name
    FROM variants v
    JOIN products p ON p.id = v.product_id
"#;

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product of the given kind.
    pub async fn create_product(&self, name: &str, kind: ProductKind) -> DbResult<Product> {
        validate_name("name", name)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            kind,
            active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, kind = %kind, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (id, name, kind, active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.kind)
        .bind(product.active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, kind, active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products, alphabetically.
    pub async fn list_products(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, kind, active, created_at, updated_at
            FROM products
            WHERE active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Creates a variant under a product.
    ///
    /// Opening stock lands directly in `on_hand` and leaves a restock
    /// audit row. A kind without an alternate unit never stores an
    /// alternate price.
    pub async fn create_variant(&self, product_id: &str, input: &NewVariant) -> DbResult<Variant> {
        validate_sku(&input.sku)?;

        let mut tx = self.pool.begin().await?;

        let kind: Option<ProductKind> =
            sqlx::query_scalar("SELECT kind FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;
        let kind = kind.ok_or_else(|| DbError::not_found("Product", product_id))?;

        let price_alt = match kind.alt_uom() {
            Some(_) => input.price_alt.map(Money::from_bdt_f64),
            None => None,
        };
        let opening = input.opening_stock.map(Quantity::from_f64);

        let now = Utc::now();
        let variant = Variant {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            sku: input.sku.trim().to_string(),
            size_label: input.size_label.clone(),
            color: input.color.clone(),
            thickness_mm: input.thickness_mm,
            width_in: input.width_in,
            height_in: input.height_in,
            rod_length_ft: input.rod_length_ft,
            pipe_length_ft: input.pipe_length_ft,
            price_base_paisa: input
                .price_base
                .map(Money::from_bdt_f64)
                .unwrap_or_default()
                .paisa(),
            price_alt_paisa: price_alt.map(|m| m.paisa()),
            cost_price_paisa: input
                .cost_price
                .map(Money::from_bdt_f64)
                .unwrap_or_default()
                .paisa(),
            on_hand_milli: opening.unwrap_or_default().milli(),
            low_stock_threshold_milli: input
                .low_stock_threshold
                .map(Quantity::from_f64)
                .unwrap_or_default()
                .milli(),
            active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %variant.id, sku = %variant.sku, "Creating variant");

        sqlx::query(
            r#"
            INSERT INTO variants (
                id, product_id, sku, size_label, color,
                thickness_mm, width_in, height_in, rod_length_ft, pipe_length_ft,
                price_base_paisa, price_alt_paisa, cost_price_paisa,
                on_hand_milli, low_stock_threshold_milli, active,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16,
                ?17, ?18
            )
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.sku)
        .bind(&variant.size_label)
        .bind(&variant.color)
        .bind(variant.thickness_mm)
        .bind(variant.width_in)
        .bind(variant.height_in)
        .bind(variant.rod_length_ft)
        .bind(variant.pipe_length_ft)
        .bind(variant.price_base_paisa)
        .bind(variant.price_alt_paisa)
        .bind(variant.cost_price_paisa)
        .bind(variant.on_hand_milli)
        .bind(variant.low_stock_threshold_milli)
        .bind(variant.active)
        .bind(variant.created_at)
        .bind(variant.updated_at)
        .execute(&mut *tx)
        .await?;

        // Opening stock leaves the same audit trail a restock would
        if let Some(opening) = opening.filter(|q| q.is_positive()) {
            sqlx::query(
                r#"
                INSERT INTO restocks (id, variant_id, qty_base_milli, cost_per_unit_paisa, note, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&variant.id)
            .bind(opening.milli())
            .bind(variant.cost_price_paisa)
            .bind("opening stock")
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(variant)
    }

    /// Gets a variant by ID.
    pub async fn get_variant(&self, id: &str) -> DbResult<Option<Variant>> {
        let variant = sqlx::query_as::<_, Variant>(
            r#"
            SELECT id, product_id, sku, size_label, color,
                   thickness_mm, width_in, height_in, rod_length_ft, pipe_length_ft,
                   price_base_paisa, price_alt_paisa, cost_price_paisa,
                   on_hand_milli, low_stock_threshold_milli, active,
                   created_at, updated_at
            FROM variants
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(variant)
    }

    /// Gets a variant by SKU, joined with its product kind.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<VariantWithKind>> {
        let sql = format!("{VARIANT_WITH_KIND_SQL} WHERE v.sku = ?1");
        let variant = sqlx::query_as::<_, VariantWithKind>(&sql)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(variant)
    }

    /// Searches active variants by SKU or product name.
    pub async fn search_variants(&self, query: &str, limit: i64) -> DbResult<Vec<VariantWithKind>> {
        let pattern = format!("%{}%", query.trim());
        let sql = format!(
            "{VARIANT_WITH_KIND_SQL} WHERE v.active = 1 AND (v.sku LIKE ?1 OR p.name LIKE ?1) \
             ORDER BY v.sku LIMIT ?2"
        );

        let variants = sqlx::query_as::<_, VariantWithKind>(&sql)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(variants)
    }

    /// Lists a product's active variants.
    pub async fn list_variants(&self, product_id: &str) -> DbResult<Vec<Variant>> {
        let variants = sqlx::query_as::<_, Variant>(
            r#"
            SELECT id, product_id, sku, size_label, color,
                   thickness_mm, width_in, height_in, rod_length_ft, pipe_length_ft,
                   price_base_paisa, price_alt_paisa, cost_price_paisa,
                   on_hand_milli, low_stock_threshold_milli, active,
                   created_at, updated_at
            FROM variants
            WHERE product_id = ?1 AND active = 1
            ORDER BY sku
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(variants)
    }

    /// Updates a variant's prices. `price_alt` of `None` leaves the
    /// stored alternate price untouched; pass `Some(0.0)` to zero it.
    pub async fn update_prices(
        &self,
        variant_id: &str,
        price_base: Option<f64>,
        price_alt: Option<f64>,
        cost_price: Option<f64>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE variants SET
                price_base_paisa = COALESCE(?2, price_base_paisa),
                price_alt_paisa = COALESCE(?3, price_alt_paisa),
                cost_price_paisa = COALESCE(?4, cost_price_paisa),
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(variant_id)
        .bind(price_base.map(|p| Money::from_bdt_f64(p).paisa()))
        .bind(price_alt.map(|p| Money::from_bdt_f64(p).paisa()))
        .bind(cost_price.map(|p| Money::from_bdt_f64(p).paisa()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Variant", variant_id));
        }

        Ok(())
    }

    /// Soft-deletes a variant. Historical documents keep referencing it.
    pub async fn deactivate_variant(&self, variant_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE variants SET active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(variant_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Variant", variant_id));
        }

        Ok(())
    }
}

/// Fetches a variant with its product kind on a transaction
/// connection. The engines call this for every document line.
pub(crate) async fn fetch_variant_with_kind(
    conn: &mut SqliteConnection,
    variant_id: &str,
) -> DbResult<VariantWithKind> {
    let sql = format!("{VARIANT_WITH_KIND_SQL} WHERE v.id = ?1");
    sqlx::query_as::<_, VariantWithKind>(&sql)
        .bind(variant_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("Variant", variant_id))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_db;

    #[tokio::test]
    async fn test_create_product_and_variant() {
        let db = test_db().await;
        let products = db.products();

        let product = products
            .create_product("Clear Glass", ProductKind::Glass)
            .await
            .unwrap();

        let variant = products
            .create_variant(
                &product.id,
                &NewVariant {
                    sku: "GL-24x36-5MM".to_string(),
                    width_in: Some(24.0),
                    height_in: Some(36.0),
                    price_base: Some(120.0),
                    price_alt: Some(22.0),
                    cost_price: Some(80.0),
                    opening_stock: Some(10.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(variant.price_base_paisa, 12000);
        assert_eq!(variant.price_alt_paisa, Some(2200));
        assert_eq!(variant.on_hand_milli, 10_000);

        let found = products.get_by_sku("GL-24x36-5MM").await.unwrap().unwrap();
        assert_eq!(found.kind, ProductKind::Glass);
        assert_eq!(found.product_name, "Clear Glass");

        // Opening stock left an audit row
        let restocks = db.stock().list_restocks(&variant.id).await.unwrap();
        assert_eq!(restocks.len(), 1);
        assert_eq!(restocks[0].qty_base_milli, 10_000);
    }

    #[tokio::test]
    async fn test_others_variant_never_stores_alt_price() {
        let db = test_db().await;
        let products = db.products();

        let product = products
            .create_product("Hardware", ProductKind::Others)
            .await
            .unwrap();

        let variant = products
            .create_variant(
                &product.id,
                &NewVariant {
                    sku: "HW-HINGE".to_string(),
                    price_base: Some(35.0),
                    price_alt: Some(5.0), // ignored: no alternate unit
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(variant.price_alt_paisa, None);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = test_db().await;
        let products = db.products();

        let product = products
            .create_product("Thai Aluminum", ProductKind::ThaiAluminum)
            .await
            .unwrap();

        let input = NewVariant {
            sku: "TA-21FT".to_string(),
            rod_length_ft: Some(21.0),
            ..Default::default()
        };
        products.create_variant(&product.id, &input).await.unwrap();

        let err = products.create_variant(&product.id, &input).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_prices() {
        let db = test_db().await;
        let products = db.products();

        let product = products
            .create_product("SS Pipe", ProductKind::SsPipe)
            .await
            .unwrap();
        let variant = products
            .create_variant(
                &product.id,
                &NewVariant {
                    sku: "SS-P-20".to_string(),
                    price_base: Some(900.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        products
            .update_prices(&variant.id, Some(950.0), Some(47.5), None)
            .await
            .unwrap();

        let updated = products.get_variant(&variant.id).await.unwrap().unwrap();
        assert_eq!(updated.price_base_paisa, 95000);
        assert_eq!(updated.price_alt_paisa, Some(4750));
        assert_eq!(updated.cost_price_paisa, 0);
    }
}
