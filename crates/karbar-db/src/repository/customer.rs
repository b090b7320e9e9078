//! # Customer Repository
//!
//! Customer lookup and the phone-keyed upsert the sale engine uses.
//!
//! ## Upsert Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Invoice submitted with a customer block                        │
//! │                                                                 │
//! │  phone present?                                                 │
//! │  ├── yes: find by phone                                         │
//! │  │        ├── found  → refresh name/address if provided         │
//! │  │        └── absent → insert new customer                      │
//! │  ├── no, but name present → insert new customer                 │
//! │  └── neither → walk-in sale, no customer row                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use karbar_core::validation::{validate_name, validate_phone};
use karbar_core::{Customer, CustomerInput};

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, address, created_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by phone number.
    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, address, created_at
            FROM customers
            WHERE phone = ?1
            "#,
        )
        .bind(phone.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists customers matching a name or phone fragment, newest first.
    pub async fn search(&self, query: &str, limit: i64) -> DbResult<Vec<Customer>> {
        let pattern = format!("%{}%", query.trim());

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, address, created_at
            FROM customers
            WHERE name LIKE ?1 OR phone LIKE ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Lists all customers, newest first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, address, created_at
            FROM customers
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }
}

/// Resolves a submitted customer block to a customer ID, inside the
/// sale transaction.
///
/// Returns `None` for a walk-in (no phone and no name). Phone matches
/// an existing customer; name and address refresh on match when
/// provided, so the latest sale wins.
pub(crate) async fn upsert_on_sale(
    conn: &mut SqliteConnection,
    input: &CustomerInput,
) -> DbResult<Option<String>> {
    let phone = input
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let Some(phone) = phone else {
        // No phone: a bare name still gets a row (repeat walk-ins by
        // the same name stay separate people).
        let Some(name) = name else {
            return Ok(None);
        };
        validate_name("customer name", name)?;
        let id = insert(conn, Some(name), None, input.address.as_deref()).await?;
        return Ok(Some(id));
    };

    validate_phone(phone)?;
    if let Some(name) = name {
        validate_name("customer name", name)?;
    }

    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM customers WHERE phone = ?1")
        .bind(phone)
        .fetch_optional(&mut *conn)
        .await?;

    match existing {
        Some(id) => {
            sqlx::query(
                r#"
                UPDATE customers SET
                    name = COALESCE(?2, name),
                    address = COALESCE(?3, address)
                WHERE id = ?1
                "#,
            )
            .bind(&id)
            .bind(name)
            .bind(input.address.as_deref().map(str::trim))
            .execute(&mut *conn)
            .await?;

            debug!(customer_id = %id, "Matched existing customer by phone");
            Ok(Some(id))
        }
        None => {
            let id = insert(conn, name, Some(phone), input.address.as_deref()).await?;
            Ok(Some(id))
        }
    }
}

async fn insert(
    conn: &mut SqliteConnection,
    name: Option<&str>,
    phone: Option<&str>,
    address: Option<&str>,
) -> DbResult<String> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO customers (id, name, phone, address, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&id)
    .bind(name)
    .bind(phone)
    .bind(address.map(str::trim))
    .bind(now)
    .execute(conn)
    .await?;

    debug!(customer_id = %id, "Created customer");
    Ok(id)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_db;

    #[tokio::test]
    async fn test_upsert_matches_by_phone() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let first = upsert_on_sale(
            &mut conn,
            &CustomerInput {
                name: Some("Rahim".to_string()),
                phone: Some("01712345678".to_string()),
                address: None,
            },
        )
        .await
        .unwrap()
        .unwrap();

        // Same phone, updated name and address: same customer
        let second = upsert_on_sale(
            &mut conn,
            &CustomerInput {
                name: Some("Rahim Uddin".to_string()),
                phone: Some("01712345678".to_string()),
                address: Some("Mirpur".to_string()),
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(first, second);

        // Single-connection test pool: release before the repo acquires
        drop(conn);
        let customer = db.customers().get_by_id(&first).await.unwrap().unwrap();
        assert_eq!(customer.name.as_deref(), Some("Rahim Uddin"));
        assert_eq!(customer.address.as_deref(), Some("Mirpur"));
    }

    #[tokio::test]
    async fn test_walk_in_creates_no_customer() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let id = upsert_on_sale(&mut conn, &CustomerInput::default())
            .await
            .unwrap();
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn test_name_only_customers_stay_separate() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let input = CustomerInput {
            name: Some("Karim".to_string()),
            phone: None,
            address: None,
        };
        let a = upsert_on_sale(&mut conn, &input).await.unwrap().unwrap();
        let b = upsert_on_sale(&mut conn, &input).await.unwrap().unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_invalid_phone_rejected() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let err = upsert_on_sale(
            &mut conn,
            &CustomerInput {
                name: None,
                phone: Some("phone#1".to_string()),
                address: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, crate::error::DbError::Core(_)));
    }
}
