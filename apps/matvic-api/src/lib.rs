//! # MatVic API
//!
//! HTTP back office for the MatVic phone accessory stores: catalogue and
//! inventory, the atomic sale commit, and dashboard aggregates.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         MatVic API                                      │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │   products     │  │     sales      │  │  stores / health           ││
//! │  │                │  │                │  │                            ││
//! │  │ • list/search  │  │ • commit       │  │ • list stores              ││
//! │  │ • alerts       │  │ • by day/month │  │ • database check           ││
//! │  │ • CRUD         │  │ • recent/stats │  │                            ││
//! │  └───────┬────────┘  └───────┬────────┘  └─────────────┬──────────────┘│
//! │          └───────────────────┼─────────────────────────┘               │
//! │                              ▼                                          │
//! │             AppState { Database, JwtManager, ApiConfig }                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `MATVIC_HTTP_PORT` - HTTP port (default: 3001)
//! - `MATVIC_BIND_ADDR` - bind address (default: 0.0.0.0)
//! - `MATVIC_DB_PATH` - SQLite file or `:memory:` (default: ./matvic.db)
//! - `MATVIC_DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `MATVIC_JWT_SECRET` - HS256 secret (development default with a warning)

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use matvic_db::Database;

pub use auth::{AuthenticatedEmployee, JwtManager};
pub use config::ApiConfig;
pub use error::ApiError;

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        AppState {
            db,
            jwt: JwtManager::new(&config.jwt_secret),
            config,
        }
    }
}

/// Builds the full router over `state`.
pub fn build_router(state: Arc<AppState>) -> Router {
    use routes::{products, sales, stores};

    Router::new()
        .route("/health", get(routes::health))
        .route("/stores", get(stores::list))
        .route("/products", get(products::list).post(products::create))
        .route("/products/alerts", get(products::alerts))
        .route(
            "/products/{id}",
            get(products::get)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/sales", axum::routing::post(sales::create))
        .route("/sales/recent", get(sales::recent))
        .route("/sales/byday/{date}", get(sales::by_day))
        .route("/sales/bymonth/{month}", get(sales::by_month))
        .route("/sales/stats/monthly-history", get(sales::monthly_history))
        .route("/sales/stats/comparison", get(sales::comparison))
        .route("/sales/{id}", get(sales::get))
        .with_state(state)
}
