//! Product catalogue and inventory routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use matvic_core::validation::validate_search_query;
use matvic_core::{Product, ProductFilter, ProductInput};
use serde::Serialize;
use tracing::info;

use crate::auth::AuthenticatedEmployee;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

/// `GET /products?q=&category=`
pub async fn list(
    State(state): State<Arc<AppState>>,
    ApiQuery(mut filter): ApiQuery<ProductFilter>,
) -> ApiResult<Json<Vec<Product>>> {
    if let Some(q) = filter.q.as_deref() {
        filter.q = Some(validate_search_query(q)?);
    }
    Ok(Json(state.db.products().list(&filter).await?))
}

/// `GET /products/alerts`
pub async fn alerts(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().low_stock_alerts().await?))
}

/// `GET /products/{id}`
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.products().get(&id).await?))
}

/// `POST /products`
pub async fn create(
    State(state): State<Arc<AppState>>,
    employee: AuthenticatedEmployee,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.db.products().create(input).await?;
    info!(
        employee_id = employee.employee_id,
        product_id = %product.id,
        "Product created"
    );
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /products/{id}` (full replace)
pub async fn update(
    State(state): State<Arc<AppState>>,
    employee: AuthenticatedEmployee,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<Json<Product>> {
    let product = state.db.products().update(&id, input).await?;
    info!(employee_id = employee.employee_id, product_id = %id, "Product updated");
    Ok(Json(product))
}

/// `DELETE /products/{id}`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    employee: AuthenticatedEmployee,
    Path(id): Path<String>,
) -> ApiResult<Json<Deleted>> {
    state.db.products().delete(&id).await?;
    info!(employee_id = employee.employee_id, product_id = %id, "Product deleted");
    Ok(Json(Deleted { deleted: true }))
}
