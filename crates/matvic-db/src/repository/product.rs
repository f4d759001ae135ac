//! # Product Repository
//!
//! Database operations for the shared product catalogue.
//!
//! ## Key Operations
//! - CRUD with validation on every write
//! - Low-stock alerts
//! - Guarded stock decrement, usable inside the sale transaction
//!
//! ## Guarded Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read-modify-write                                           │
//! │     SELECT stock ...; UPDATE products SET stock = 2 WHERE id = ?       │
//! │     (two writers both read 5 and both write 2)                         │
//! │                                                                         │
//! │  ✅ CORRECT: conditional delta                                         │
//! │     UPDATE products SET stock = stock - ?q                             │
//! │     WHERE id = ?id AND stock >= ?q                                     │
//! │                                                                         │
//! │  0 rows affected → product missing OR not enough stock                 │
//! │  CHECK (stock >= 0) in the schema backs this up                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use matvic_core::validation;
use matvic_core::{CoreError, Product, ProductFilter, ProductInput};

const PRODUCT_COLUMNS: &str =
    "id, name, description, category, unit_price, stock, min_stock, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let cable = repo.create(input).await?;
/// let fundas = repo.list(&ProductFilter { category: Some("Fundas".into()), ..Default::default() }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products ordered by name, narrowed by `filter`.
    ///
    /// Filtering runs in Rust so case folding covers non-ASCII names
    /// ("Cargador Inalámbrico"), which SQLite's `lower()` does not.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        debug!(q = ?filter.q, category = ?filter.category, "Listing products");

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, id");
        let products: Vec<Product> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        let products: Vec<Product> = products
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Products at or below their alert threshold, lowest stock first.
    pub async fn low_stock_alerts(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE stock <= min_stock ORDER BY stock, name"
        );
        let products = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Gets a product by its ID, or `NotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Creates a product with a fresh UUID.
    ///
    /// ## Errors
    /// * `DbError::Domain(Validation)` - negative price/stock, blank name, ...
    pub async fn create(&self, input: ProductInput) -> DbResult<Product> {
        let input = input.validate()?;
        let now = Utc::now();

        let product = Product {
            id: generate_product_id(),
            name: input.name,
            description: input.description,
            category: input.category,
            unit_price: input.unit_price,
            stock: input.stock,
            min_stock: input.min_stock,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, category,
                unit_price, stock, min_stock,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.unit_price)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Replaces every writable field of a product.
    ///
    /// Past sale lines are untouched: they carry their own snapshots.
    pub async fn update(&self, id: &str, input: ProductInput) -> DbResult<Product> {
        let input = input.validate()?;

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                category = ?4,
                unit_price = ?5,
                stock = ?6,
                min_stock = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.unit_price)
        .bind(input.stock)
        .bind(input.min_stock)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get(id).await
    }

    /// Hard-deletes a product.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Takes `quantity` units out of stock, outside any sale.
    pub async fn decrement_stock(&self, id: &str, quantity: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        decrement_stock(&mut conn, id, quantity, Utc::now()).await
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================
// These take a bare connection so they run unchanged on a pooled connection
// or inside `&mut *tx`.

/// Reads one product on the given connection.
pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

/// Guarded decrement: `stock = stock - quantity` only if enough stock remains.
///
/// ## Errors
/// * `ProductNotFound` - no product with this id
/// * `InsufficientStock` - fewer than `quantity` units on hand
pub(crate) async fn decrement_stock(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    validation::validate_quantity(quantity)?;

    debug!(id = %id, quantity, "Decrementing stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    // Nothing changed: tell the two failure causes apart.
    match fetch_product(conn, id).await? {
        None => Err(CoreError::ProductNotFound(id.to_string()).into()),
        Some(product) => Err(CoreError::InsufficientStock {
            product_id: product.id,
            name: product.name,
            available: product.stock,
            requested: quantity,
        }
        .into()),
    }
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use matvic_core::Money;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn input(name: &str, category: &str, price: i64, stock: i64, min_stock: i64) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            description: None,
            category: category.to_string(),
            unit_price: Money::from_pesos(price),
            stock,
            min_stock,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = db().await;
        let repo = db.products();

        let created = repo
            .create(input("Cable USB-C", "Cables", 15, 5, 2))
            .await
            .unwrap();
        assert!(Uuid::parse_str(&created.id).is_ok());

        let fetched = repo.get(&created.id).await.unwrap();
        assert_eq!(fetched.name, "Cable USB-C");
        assert_eq!(fetched.unit_price, Money::from_pesos(15));
        assert_eq!(fetched.stock, 5);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let db = db().await;

        let err = db
            .products()
            .create(input("Funda", "Fundas", -1, 5, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = db().await;
        let repo = db.products();
        repo.create(input("Funda iPhone 15", "Fundas", 25, 10, 2)).await.unwrap();
        repo.create(input("Cargador Inalámbrico", "Cargadores", 30, 2, 3)).await.unwrap();
        repo.create(input("Cable USB-C", "Cables", 15, 5, 1)).await.unwrap();

        let all = repo.list(&ProductFilter::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Cable USB-C", "Cargador Inalámbrico", "Funda iPhone 15"]);

        let filtered = repo
            .list(&ProductFilter {
                q: Some("INALÁMBRICO".to_string()),
                category: None,
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);

        let by_category = repo
            .list(&ProductFilter {
                q: None,
                category: Some("fundas".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].name, "Funda iPhone 15");
    }

    #[tokio::test]
    async fn test_low_stock_alerts() {
        let db = db().await;
        let repo = db.products();
        repo.create(input("Funda", "Fundas", 25, 10, 2)).await.unwrap();
        repo.create(input("Cargador", "Cargadores", 30, 2, 3)).await.unwrap();
        repo.create(input("Protector", "Protectores", 10, 0, 0)).await.unwrap();

        let alerts = repo.low_stock_alerts().await.unwrap();
        let names: Vec<_> = alerts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Protector", "Cargador"]);
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let db = db().await;
        let repo = db.products();
        let p = repo.create(input("Cable", "Cables", 15, 5, 1)).await.unwrap();

        let updated = repo
            .update(&p.id, input("Cable USB-C 2m", "Cables", 18, 7, 2))
            .await
            .unwrap();

        assert_eq!(updated.name, "Cable USB-C 2m");
        assert_eq!(updated.unit_price, Money::from_pesos(18));
        assert_eq!(updated.stock, 7);
        assert_eq!(updated.created_at, p.created_at);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_product() {
        let db = db().await;
        let repo = db.products();

        let err = repo.update("nope", input("X", "", 1, 1, 0)).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = repo.delete("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_hard() {
        let db = db().await;
        let repo = db.products();
        let p = repo.create(input("Cable", "Cables", 15, 5, 1)).await.unwrap();

        repo.delete(&p.id).await.unwrap();
        assert!(repo.get_by_id(&p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decrement_stock_guards() {
        let db = db().await;
        let repo = db.products();
        let p = repo.create(input("Cargador", "Cargadores", 30, 2, 0)).await.unwrap();

        let err = repo.decrement_stock(&p.id, 5).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 2, requested: 5, .. })
        ));
        assert_eq!(repo.get(&p.id).await.unwrap().stock, 2);

        repo.decrement_stock(&p.id, 2).await.unwrap();
        assert_eq!(repo.get(&p.id).await.unwrap().stock, 0);

        let err = repo.decrement_stock("ghost", 1).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));

        let err = repo.decrement_stock(&p.id, 0).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }
}
