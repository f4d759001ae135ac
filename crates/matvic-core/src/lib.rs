//! # matvic-core: Pure Business Logic for the MatVic Back Office
//!
//! Domain types and rules for a two-location phone accessory shop, with no
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     MatVic Back Office Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Dashboard (browser)                          │   │
//! │  │    Inventory ──► Sale entry ──► Reports                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    matvic-api (axum)                            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ matvic-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   sale    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ coalesce  │  │   rules   │  │   │
//! │  │   │   Sale    │  │           │  │ plan_sale │  │  periods  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    matvic-db (Database Layer)                   │   │
//! │  │          SQLite queries, migrations, atomic sale commit         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, Store, PaymentMethod, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`sale`] - Sale request validation and planning
//! - [`error`] - Domain error types
//! - [`validation`] - Field and period validators
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::HashMap;
//! use matvic_core::sale::{plan_sale, SaleLine};
//! use matvic_core::{Money, Product};
//!
//! let now = chrono::Utc::now();
//! let cable = Product {
//!     id: "cable".into(),
//!     name: "Cable USB-C".into(),
//!     description: None,
//!     category: "Cables".into(),
//!     unit_price: Money::from_pesos(15),
//!     stock: 5,
//!     min_stock: 1,
//!     created_at: now,
//!     updated_at: now,
//! };
//! let products = HashMap::from([(cable.id.clone(), cable)]);
//!
//! let plan = plan_sale(&[SaleLine { product_id: "cable".into(), quantity: 3 }], &products).unwrap();
//! assert_eq!(plan.total, Money::from_pesos(45));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use sale::{plan_sale, SaleLine, SalePlan, SaleRequest, ValidatedSale};
pub use types::*;
