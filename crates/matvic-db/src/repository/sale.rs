//! # Sale Repository
//!
//! The atomic sale commit and the read-only sale queries behind the
//! dashboard.
//!
//! ## Commit Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Commit                                       │
//! │                                                                         │
//! │  SaleRequest ──validate()──► ValidatedSale   (no I/O, never retried)   │
//! │                                   │                                     │
//! │        ┌──────────────────────────▼─────────────────────────┐          │
//! │        │  BEGIN                                              │          │
//! │        │   1. store exists?                 → NotFound       │          │
//! │        │   2. read every product                             │          │
//! │        │   3. plan_sale()   → ProductNotFound / Insufficient │          │
//! │        │   4. guarded decrement per line    → Insufficient   │          │
//! │        │   5. INSERT sale + items                            │          │
//! │        │  COMMIT                                             │          │
//! │        └──────────────────────────┬─────────────────────────┘          │
//! │                                   │                                     │
//! │        any error: transaction dropped → ROLLBACK                        │
//! │        DbError::Busy: re-run the whole block (max 5 attempts)          │
//! │                                   ▼                                     │
//! │                        SaleReceipt { sale_id, total }                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Committed sales are immutable: there is no update or void.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::{decrement_stock, fetch_product};
use matvic_core::sale::plan_sale;
use matvic_core::{
    Money, MonthlyTotal, PaymentMethod, RecentSale, Sale, SaleDetail, SaleLineItem, SaleReceipt,
    SaleRequest, StoreTotal, ValidatedSale,
};

/// Attempts per commit before a lock conflict is surfaced to the caller.
pub const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Base delay between attempts; attempt `n` waits `n × RETRY_BACKOFF`.
const RETRY_BACKOFF: Duration = Duration::from_millis(15);

/// Months covered by [`SaleRepository::monthly_history`].
pub const HISTORY_MONTHS: u32 = 6;

/// Default and maximum size of the recent-sales feed.
pub const DEFAULT_RECENT_LIMIT: i64 = 10;
pub const MAX_RECENT_LIMIT: i64 = 100;

const SALE_COLUMNS: &str = "id, store_id, employee_id, payment_method, customer_name, \
                            customer_id, total, created_at";

#[derive(sqlx::FromRow)]
struct RecentRow {
    id: String,
    store_id: i64,
    store_name: String,
    payment_method: PaymentMethod,
    total: Money,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MonthRow {
    month: String,
    sale_count: i64,
    revenue: i64,
}

#[derive(sqlx::FromRow)]
struct StoreRow {
    store_id: i64,
    store_name: String,
    sale_count: i64,
    revenue: i64,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Commits a sale atomically, stamped with the current time.
    ///
    /// ## Errors
    /// * `Domain(EmptyCart | InvalidPaymentMethod | Validation | ...)` - bad request
    /// * `Domain(ProductNotFound)` - a line references an unknown product
    /// * `Domain(InsufficientStock)` - a line asks for more than is on hand
    /// * `NotFound` - the target store does not exist
    /// * `Busy` - still conflicting after [`MAX_COMMIT_ATTEMPTS`]
    ///
    /// On any error, no stock has changed and no sale row exists.
    pub async fn commit(&self, request: SaleRequest) -> DbResult<SaleReceipt> {
        self.commit_at(request, Utc::now()).await
    }

    /// Commits a sale with an explicit timestamp (imports, demo data).
    pub async fn commit_at(
        &self,
        request: SaleRequest,
        created_at: DateTime<Utc>,
    ) -> DbResult<SaleReceipt> {
        let sale = request.validate()?;

        let mut attempt = 1;
        loop {
            match self.try_commit(&sale, created_at).await {
                Err(err) if err.is_retryable() && attempt < MAX_COMMIT_ATTEMPTS => {
                    warn!(attempt, error = %err, "Sale commit conflicted, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(attempt, error = %err, "Sale commit rejected");
                    return Err(err);
                }
                Ok(receipt) => return Ok(receipt),
            }
        }
    }

    /// One attempt. Returning early drops `tx`, which rolls it back.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock before the first read, so
    /// concurrent commits queue on `busy_timeout` instead of failing when a
    /// deferred read transaction tries to upgrade.
    async fn try_commit(
        &self,
        sale: &ValidatedSale,
        created_at: DateTime<Utc>,
    ) -> DbResult<SaleReceipt> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let store: Option<i64> = sqlx::query_scalar("SELECT id FROM stores WHERE id = ?1")
            .bind(sale.store_id)
            .fetch_optional(&mut *tx)
            .await?;
        if store.is_none() {
            return Err(DbError::not_found("Store", sale.store_id.to_string()));
        }

        let mut products = HashMap::with_capacity(sale.lines.len());
        for id in sale.product_ids() {
            if let Some(product) = fetch_product(&mut *tx, id).await? {
                products.insert(product.id.clone(), product);
            }
        }

        let plan = plan_sale(&sale.lines, &products)?;

        for line in &plan.lines {
            decrement_stock(&mut *tx, &line.product_id, line.quantity, created_at).await?;
        }

        let sale_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, store_id, employee_id, payment_method,
                customer_name, customer_id, total, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(sale_id.to_string())
        .bind(sale.store_id)
        .bind(sale.employee_id)
        .bind(sale.payment_method)
        .bind(&sale.customer_name)
        .bind(sale.customer_id)
        .bind(plan.total)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        for (position, line) in plan.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, name_snapshot,
                    unit_price, quantity, line_total, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(sale_id.to_string())
            .bind(&line.product_id)
            .bind(&line.name_snapshot)
            .bind(line.unit_price)
            .bind(line.quantity)
            .bind(line.line_total)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            store_id = sale.store_id,
            employee_id = sale.employee_id,
            lines = plan.lines.len(),
            total = %plan.total,
            "Sale committed"
        );

        Ok(SaleReceipt {
            sale_id,
            total: plan.total,
        })
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    /// Line items of a sale, in cart order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleLineItem>> {
        let items = sqlx::query_as(
            r#"
            SELECT id, sale_id, product_id, name_snapshot, unit_price, quantity, line_total
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY position
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// A sale with its line items, or `NotFound`.
    pub async fn get_detail(&self, id: &str) -> DbResult<SaleDetail> {
        let sale = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))?;
        let items = self.get_items(id).await?;
        Ok(SaleDetail { sale, items })
    }

    // =========================================================================
    // Period queries
    // =========================================================================

    /// Sales on one UTC day, newest first.
    pub async fn by_day(&self, day: NaiveDate, store_id: Option<i64>) -> DbResult<Vec<Sale>> {
        debug!(%day, ?store_id, "Listing sales by day");

        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE date(created_at) = ?1 AND (?2 IS NULL OR store_id = ?2) \
             ORDER BY created_at DESC, rowid DESC"
        );
        let sales = sqlx::query_as(&sql)
            .bind(day.format("%Y-%m-%d").to_string())
            .bind(store_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(sales)
    }

    /// Sales in one UTC month (`YYYY-MM`), newest first.
    pub async fn by_month(&self, month: &str, store_id: Option<i64>) -> DbResult<Vec<Sale>> {
        debug!(month, ?store_id, "Listing sales by month");

        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE strftime('%Y-%m', created_at) = ?1 AND (?2 IS NULL OR store_id = ?2) \
             ORDER BY created_at DESC, rowid DESC"
        );
        let sales = sqlx::query_as(&sql)
            .bind(month)
            .bind(store_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(sales)
    }

    /// The newest sales with store name and product names, for the feed.
    ///
    /// `limit` is clamped to `1..=MAX_RECENT_LIMIT`.
    pub async fn recent(&self, limit: i64, store_id: Option<i64>) -> DbResult<Vec<RecentSale>> {
        let limit = limit.clamp(1, MAX_RECENT_LIMIT);

        let rows: Vec<RecentRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.store_id, st.name AS store_name, s.payment_method,
                   s.total, s.created_at
            FROM sales s
            JOIN stores st ON st.id = s.store_id
            WHERE (?1 IS NULL OR s.store_id = ?1)
            ORDER BY s.created_at DESC, s.rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(store_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut recent = Vec::with_capacity(rows.len());
        for row in rows {
            let products: Vec<String> = sqlx::query_scalar(
                "SELECT name_snapshot FROM sale_items WHERE sale_id = ?1 ORDER BY position",
            )
            .bind(&row.id)
            .fetch_all(&self.pool)
            .await?;

            recent.push(RecentSale {
                id: row.id,
                store_id: row.store_id,
                store_name: row.store_name,
                payment_method: row.payment_method,
                total: row.total,
                created_at: row.created_at,
                products,
            });
        }

        Ok(recent)
    }

    /// Sale count and revenue for the last [`HISTORY_MONTHS`] months up to
    /// the current one, oldest first.
    pub async fn monthly_history(&self, store_id: Option<i64>) -> DbResult<Vec<MonthlyTotal>> {
        self.monthly_history_until(Utc::now().date_naive(), store_id)
            .await
    }

    /// [`Self::monthly_history`] anchored at `today`. Months without sales
    /// are reported with zero count and revenue.
    pub async fn monthly_history_until(
        &self,
        today: NaiveDate,
        store_id: Option<i64>,
    ) -> DbResult<Vec<MonthlyTotal>> {
        let months = trailing_months(today, HISTORY_MONTHS);
        let Some(first) = months.first() else {
            return Ok(Vec::new());
        };

        let rows: Vec<MonthRow> = sqlx::query_as(
            r#"
            SELECT strftime('%Y-%m', created_at) AS month,
                   COUNT(*) AS sale_count,
                   COALESCE(SUM(total), 0) AS revenue
            FROM sales
            WHERE strftime('%Y-%m', created_at) >= ?1
              AND (?2 IS NULL OR store_id = ?2)
            GROUP BY month
            "#,
        )
        .bind(first)
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        let by_month: HashMap<String, MonthRow> =
            rows.into_iter().map(|r| (r.month.clone(), r)).collect();

        Ok(months
            .into_iter()
            .map(|month| match by_month.get(&month) {
                Some(row) => MonthlyTotal {
                    month,
                    sale_count: row.sale_count,
                    revenue: Money::from_pesos(row.revenue),
                },
                None => MonthlyTotal {
                    month,
                    sale_count: 0,
                    revenue: Money::zero(),
                },
            })
            .collect())
    }

    /// Per-store count and revenue for one month (`YYYY-MM`). Every store is
    /// listed, including those without sales.
    pub async fn store_comparison(&self, month: &str) -> DbResult<Vec<StoreTotal>> {
        let rows: Vec<StoreRow> = sqlx::query_as(
            r#"
            SELECT st.id AS store_id,
                   st.name AS store_name,
                   COUNT(s.id) AS sale_count,
                   COALESCE(SUM(s.total), 0) AS revenue
            FROM stores st
            LEFT JOIN sales s
              ON s.store_id = st.id AND strftime('%Y-%m', s.created_at) = ?1
            GROUP BY st.id, st.name
            ORDER BY st.id
            "#,
        )
        .bind(month)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StoreTotal {
                store_id: r.store_id,
                store_name: r.store_name,
                sale_count: r.sale_count,
                revenue: Money::from_pesos(r.revenue),
            })
            .collect())
    }

    /// Counts committed sales (for diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// The `n` calendar months ending with `today`'s month, oldest first, as
/// `YYYY-MM`.
pub fn trailing_months(today: NaiveDate, n: u32) -> Vec<String> {
    let first_of_month = today.with_day(1).unwrap_or(today);
    (0..n)
        .rev()
        .filter_map(|back| first_of_month.checked_sub_months(Months::new(back)))
        .map(|d| d.format("%Y-%m").to_string())
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
