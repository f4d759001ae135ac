//! # Repository Module
//!
//! Database repository implementations for the MatVic back office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler                                                           │
//! │       │                                                                 │
//! │       │  state.db.sales().commit(request)                              │
//! │       ▼                                                                 │
//! │  SaleRepository ──uses──► product::decrement_stock (same transaction)  │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD, alerts, stock
//! - [`SaleRepository`](sale::SaleRepository) - Atomic commit and sale queries
//! - [`StoreRepository`](store::StoreRepository) - Store lookups

pub mod product;
pub mod sale;
pub mod store;
