//! # Sale Planning
//!
//! Pure half of the sale commit: request validation, cart coalescing and the
//! snapshot/total computation. The database crate runs these inside its
//! transaction; nothing here touches storage.
//!
//! ## Commit Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleRequest (untrusted)                                                │
//! │       │                                                                 │
//! │       ▼  SaleRequest::validate()          ← THIS MODULE                 │
//! │  ValidatedSale                                                          │
//! │   ├── EmptyCart / InvalidPaymentMethod / Validation                    │
//! │   └── lines coalesced by product id (first-seen order)                 │
//! │       │                                                                 │
//! │       ▼  products read inside the transaction (matvic-db)              │
//! │       │                                                                 │
//! │       ▼  plan_sale()                      ← THIS MODULE                 │
//! │  SalePlan                                                               │
//! │   ├── ProductNotFound   (any line, checked first)                      │
//! │   ├── InsufficientStock (any line, checked before any write)           │
//! │   └── name/price snapshots + checked total                             │
//! │       │                                                                 │
//! │       ▼  guarded decrements + inserts + COMMIT (matvic-db)             │
//! │  SaleReceipt { sale_id, total }                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, Product};
use crate::validation;

// =============================================================================
// Request
// =============================================================================

/// One requested line: a product id and how many units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: i64,
}

/// A sale as proposed by the caller, before any check has run.
///
/// `employee_id` comes from the verified bearer token, never from the body
/// alone; `store_id` is already resolved (body or token claim).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRequest {
    pub lines: Vec<SaleLine>,
    pub payment_method: String,
    pub employee_id: i64,
    pub store_id: i64,
    pub customer_name: Option<String>,
    pub customer_id: Option<i64>,
}

/// A request that passed every check that does not need the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSale {
    /// Coalesced lines, unique by product id, in first-seen order.
    pub lines: Vec<SaleLine>,
    pub payment_method: PaymentMethod,
    pub employee_id: i64,
    pub store_id: i64,
    pub customer_name: Option<String>,
    pub customer_id: Option<i64>,
}

impl ValidatedSale {
    /// Product ids referenced by the sale, in line order.
    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.product_id.as_str())
    }
}

impl SaleRequest {
    /// Runs the storage-independent preconditions.
    ///
    /// ## Errors
    /// - [`CoreError::EmptyCart`] when there are no lines
    /// - [`CoreError::InvalidPaymentMethod`] for an unknown method
    /// - [`CoreError::Validation`] for a blank product id, a quantity < 1 or a
    ///   bad customer name
    /// - [`CoreError::AmountOverflow`] when merged quantities overflow
    pub fn validate(self) -> CoreResult<ValidatedSale> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let payment_method: PaymentMethod = self.payment_method.parse()?;

        for line in &self.lines {
            if line.product_id.trim().is_empty() {
                return Err(ValidationError::required("product_id").into());
            }
            validation::validate_quantity(line.quantity)?;
        }

        let lines = coalesce_lines(self.lines)?;

        let customer_name = match self.customer_name {
            Some(name) => {
                validation::validate_customer_name(&name)?;
                let name = name.trim().to_string();
                (!name.is_empty()).then_some(name)
            }
            None => None,
        };

        Ok(ValidatedSale {
            lines,
            payment_method,
            employee_id: self.employee_id,
            store_id: self.store_id,
            customer_name,
            customer_id: self.customer_id,
        })
    }
}

/// Merges lines that share a product id, summing quantities and keeping the
/// position of the first occurrence.
///
/// ```text
/// [A×1, B×2, A×3]  →  [A×4, B×2]
/// ```
pub fn coalesce_lines(lines: Vec<SaleLine>) -> CoreResult<Vec<SaleLine>> {
    let mut merged: Vec<SaleLine> = Vec::with_capacity(lines.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(lines.len());

    for line in lines {
        let product_id = line.product_id.trim().to_string();
        match index.get(&product_id) {
            Some(&i) => {
                let entry = &mut merged[i];
                entry.quantity = entry
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or(CoreError::AmountOverflow)?;
            }
            None => {
                index.insert(product_id.clone(), merged.len());
                merged.push(SaleLine {
                    product_id,
                    quantity: line.quantity,
                });
            }
        }
    }

    Ok(merged)
}

// =============================================================================
// Plan
// =============================================================================

/// A line with its frozen name and price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: String,
    pub name_snapshot: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

/// Everything the commit needs to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalePlan {
    pub lines: Vec<PlannedLine>,
    pub total: Money,
}

/// Checks the lines against current product state and freezes prices.
///
/// Every line is resolved before any stock check, and every stock check runs
/// before the caller writes anything, so the reported error is the same
/// regardless of how far a partial write would have got.
pub fn plan_sale(lines: &[SaleLine], products: &HashMap<String, Product>) -> CoreResult<SalePlan> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let resolved = lines
        .iter()
        .map(|line| {
            products
                .get(&line.product_id)
                .map(|p| (line, p))
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))
        })
        .collect::<CoreResult<Vec<_>>>()?;

    for (line, product) in &resolved {
        if !product.can_sell(line.quantity) {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                name: product.name.clone(),
                available: product.stock,
                requested: line.quantity,
            });
        }
    }

    let mut total = Money::zero();
    let mut planned = Vec::with_capacity(resolved.len());

    for (line, product) in resolved {
        let line_total = product
            .unit_price
            .checked_mul_quantity(line.quantity)
            .ok_or(CoreError::AmountOverflow)?;
        total = total
            .checked_add(line_total)
            .ok_or(CoreError::AmountOverflow)?;

        planned.push(PlannedLine {
            product_id: product.id.clone(),
            name_snapshot: product.name.clone(),
            unit_price: product.unit_price,
            quantity: line.quantity,
            line_total,
        });
    }

    Ok(SalePlan {
        lines: planned,
        total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
