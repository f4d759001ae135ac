//! HTTP routes.
//!
//! ```text
//! GET    /health                         -
//! GET    /stores                         -
//! GET    /products?q=&category=          -
//! GET    /products/alerts                -
//! GET    /products/{id}                  -
//! POST   /products                       bearer
//! PUT    /products/{id}                  bearer
//! DELETE /products/{id}                  bearer
//! POST   /sales                          bearer
//! GET    /sales/{id}                     -
//! GET    /sales/byday/{date}?local=      -
//! GET    /sales/bymonth/{month}?local=   -
//! GET    /sales/recent?limit=&local=     -
//! GET    /sales/stats/monthly-history    -
//! GET    /sales/stats/comparison?month=  -
//! ```

pub mod products;
pub mod sales;
pub mod stores;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub database: &'static str,
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Health>) {
    if state.db.health_check().await {
        (
            StatusCode::OK,
            Json(Health {
                status: "ok",
                database: "connected",
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Health {
                status: "degraded",
                database: "unavailable",
            }),
        )
    }
}
