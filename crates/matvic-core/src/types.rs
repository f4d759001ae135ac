//! # Domain Types
//!
//! Core domain types used throughout the MatVic back office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │  SaleLineItem   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  sale_id (FK)   │       │
//! │  │  name, category │   │  store_id       │   │  product_id     │       │
//! │  │  unit_price     │   │  payment_method │   │  name_snapshot  │       │
//! │  │  stock          │   │  total          │   │  unit_price     │       │
//! │  │  min_stock      │   │  employee_id    │   │  quantity       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │     Store       │   │ PaymentMethod   │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  1 Local N° 22  │   │  Cash           │                             │
//! │  │  2 Local N° 106 │   │  Card           │                             │
//! │  └─────────────────┘   │  Transfer       │                             │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! A sale owns its line items. A line item only holds a product *id*; the
//! name and price it shows are snapshots taken at commit time, so editing or
//! deleting the product later never rewrites history.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::money::Money;
use crate::validation;

// =============================================================================
// Product
// =============================================================================

/// A product in the shared catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown in the dashboard and snapshotted on sale lines.
    pub name: String,

    /// Optional description, searched by the text filter.
    pub description: Option<String>,

    /// Free-text category tag ("Fundas", "Cables", ...).
    pub category: String,

    /// Current unit price.
    pub unit_price: Money,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Alert threshold: the product shows up in alerts when `stock <= min_stock`.
    pub min_stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks whether `quantity` units can be taken from stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }

    /// Case-insensitive substring match on name or description.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

/// Writable product fields, used by both create and update.
///
/// Update has full-replace semantics: every field is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: String,
    pub unit_price: Money,
    pub stock: i64,
    #[serde(default)]
    pub min_stock: i64,
}

impl ProductInput {
    /// Validates the input and returns a normalised copy (trimmed strings,
    /// blank description dropped).
    pub fn validate(self) -> Result<ProductInput, ValidationError> {
        validation::validate_product_name(&self.name)?;
        validation::validate_category(&self.category)?;
        validation::validate_price(self.unit_price)?;
        validation::validate_stock_level("stock", self.stock)?;
        validation::validate_stock_level("min_stock", self.min_stock)?;

        let description = match self.description {
            Some(d) => {
                validation::validate_description(&d)?;
                let d = d.trim().to_string();
                (!d.is_empty()).then_some(d)
            }
            None => None,
        };

        Ok(ProductInput {
            name: self.name.trim().to_string(),
            description,
            category: self.category.trim().to_string(),
            unit_price: self.unit_price,
            stock: self.stock,
            min_stock: self.min_stock,
        })
    }
}

/// Optional filters for listing products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring on name or description.
    pub q: Option<String>,
    /// Case-insensitive exact category match.
    pub category: Option<String>,
}

impl ProductFilter {
    /// Whether `product` passes every filter that is set. Blank filters are
    /// ignored.
    pub fn matches(&self, product: &Product) -> bool {
        let category_ok = match self.category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => product.category.to_lowercase() == c.to_lowercase(),
            _ => true,
        };
        let text_ok = match self.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => product.matches_text(q),
            _ => true,
        };
        category_ok && text_ok
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid.
///
/// Parsing accepts the English names and the Spanish labels the dashboard
/// sends ("Efectivo", "Tarjeta", "Transferencia"), case-insensitively.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

impl PaymentMethod {
    /// Canonical lowercase name, as stored and serialized.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Ok(PaymentMethod::Cash),
            "card" | "tarjeta" | "credit" | "debit" | "débito" | "debito" | "crédito"
            | "credito" => Ok(PaymentMethod::Card),
            "transfer" | "transferencia" => Ok(PaymentMethod::Transfer),
            _ => Err(CoreError::InvalidPaymentMethod(s.to_string())),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// One of the retail locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Store {
    pub id: i64,
    pub name: String,
    pub manager: Option<String>,
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub store_id: i64,
    pub employee_id: i64,
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
    pub customer_id: Option<i64>,
    /// Sum of the line totals.
    pub total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A line of a committed sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLineItem {
    pub id: String,
    pub sale_id: String,
    /// Non-owning reference; the product may since have been edited or deleted.
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit price at time of sale (frozen).
    pub unit_price: Money,
    pub quantity: i64,
    /// `unit_price × quantity`.
    pub line_total: Money,
}

/// A sale together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleLineItem>,
}

/// What a successful commit returns to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleReceipt {
    #[ts(as = "String")]
    pub sale_id: uuid::Uuid,
    pub total: Money,
}

// =============================================================================
// Dashboard Aggregates
// =============================================================================

/// A recent sale as listed on the dashboard feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecentSale {
    pub id: String,
    pub store_id: i64,
    pub store_name: String,
    pub payment_method: PaymentMethod,
    pub total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Snapshotted product names, in line order.
    pub products: Vec<String>,
}

/// Sale count and revenue for one calendar month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlyTotal {
    pub month: String,
    pub sale_count: i64,
    pub revenue: Money,
}

/// Sale count and revenue for one store over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StoreTotal {
    pub store_id: i64,
    pub store_name: String,
    pub sale_count: i64,
    pub revenue: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================
