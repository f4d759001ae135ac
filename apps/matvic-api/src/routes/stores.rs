//! Store listing.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use matvic_core::Store;

use crate::error::ApiError;
use crate::AppState;

/// `GET /stores`
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Store>>, ApiError> {
    Ok(Json(state.db.stores().list().await?))
}
