//! Sale commit and dashboard routes.
//!
//! `POST /sales` is the only write. Everything else reads committed sales,
//! optionally narrowed to one store via `?local=<store id>`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use matvic_core::validation::{validate_day, validate_month, validate_uuid};
use matvic_core::{
    Money, MonthlyTotal, RecentSale, Sale, SaleDetail, SaleLine, SaleReceipt, SaleRequest,
    StoreTotal,
};
use matvic_db::repository::sale::DEFAULT_RECENT_LIMIT;
use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::AuthenticatedEmployee;
use crate::error::ApiError;
use crate::extract::{optional_i64, ApiJson, ApiQuery};
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Request Bodies
// =============================================================================

/// One cart line as the dashboard sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleItemBody {
    pub product_id: String,
    pub quantity: i64,
    /// Shown price in the dashboard. Ignored: the stored price at commit
    /// time is what the customer pays.
    #[serde(default)]
    pub unit_price: Option<Money>,
}

/// `POST /sales` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSaleBody {
    pub payment_method: String,
    #[serde(default)]
    pub employee_id: Option<i64>,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub store_id: Option<i64>,
    #[serde(default)]
    pub items: Vec<SaleItemBody>,
}

impl CreateSaleBody {
    /// Binds the body to the authenticated employee.
    ///
    /// The store falls back to the token's store claim. A body that names a
    /// different employee than the token is refused.
    pub fn into_request(self, employee: AuthenticatedEmployee) -> ApiResult<SaleRequest> {
        if let Some(claimed) = self.employee_id {
            if claimed != employee.employee_id {
                return Err(ApiError::Unauthorized(format!(
                    "Token belongs to employee {}, not {}",
                    employee.employee_id, claimed
                )));
            }
        }

        let store_id = self
            .store_id
            .or(employee.store_id)
            .ok_or_else(|| ApiError::Validation("store_id is required".to_string()))?;

        let lines = self
            .items
            .into_iter()
            .map(|item| SaleLine {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect();

        Ok(SaleRequest {
            lines,
            payment_method: self.payment_method,
            employee_id: employee.employee_id,
            store_id,
            customer_name: self.customer_name,
            customer_id: self.customer_id,
        })
    }
}

// =============================================================================
// Query Strings
// =============================================================================

/// `?local=<store id>`; blank means every store.
#[derive(Debug, Default, Deserialize)]
pub struct StoreQuery {
    pub local: Option<String>,
}

impl StoreQuery {
    fn store_id(&self) -> ApiResult<Option<i64>> {
        optional_i64("local", self.local.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<String>,
    pub local: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ComparisonQuery {
    pub month: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /sales`
pub async fn create(
    State(state): State<Arc<AppState>>,
    employee: AuthenticatedEmployee,
    ApiJson(body): ApiJson<CreateSaleBody>,
) -> ApiResult<(StatusCode, Json<SaleReceipt>)> {
    let advisory = body.items.iter().filter(|i| i.unit_price.is_some()).count();
    if advisory > 0 {
        debug!(lines = advisory, "Ignoring client-side unit prices");
    }

    let request = body.into_request(employee)?;
    let store_id = request.store_id;
    let receipt = state.db.sales().commit(request).await?;

    info!(
        sale_id = %receipt.sale_id,
        employee_id = employee.employee_id,
        store_id,
        total = receipt.total.pesos(),
        "Sale recorded"
    );
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// `GET /sales/{id}`
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDetail>> {
    validate_uuid(&id)?;
    Ok(Json(state.db.sales().get_detail(&id).await?))
}

/// `GET /sales/byday/{date}?local=`
pub async fn by_day(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    ApiQuery(query): ApiQuery<StoreQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    let day = validate_day(&date)?;
    Ok(Json(state.db.sales().by_day(day, query.store_id()?).await?))
}

/// `GET /sales/bymonth/{month}?local=`
pub async fn by_month(
    State(state): State<Arc<AppState>>,
    Path(month): Path<String>,
    ApiQuery(query): ApiQuery<StoreQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    let month = validate_month(&month)?;
    Ok(Json(
        state.db.sales().by_month(&month, query.store_id()?).await?,
    ))
}

/// `GET /sales/recent?limit=&local=`
pub async fn recent(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> ApiResult<Json<Vec<RecentSale>>> {
    let limit = optional_i64("limit", query.limit.as_deref())?.unwrap_or(DEFAULT_RECENT_LIMIT);
    let store_id = optional_i64("local", query.local.as_deref())?;
    Ok(Json(state.db.sales().recent(limit, store_id).await?))
}

/// `GET /sales/stats/monthly-history?local=`
pub async fn monthly_history(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<StoreQuery>,
) -> ApiResult<Json<Vec<MonthlyTotal>>> {
    Ok(Json(
        state
            .db
            .sales()
            .monthly_history(query.store_id()?)
            .await?,
    ))
}

/// `GET /sales/stats/comparison?month=` (default: current month)
pub async fn comparison(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ComparisonQuery>,
) -> ApiResult<Json<Vec<StoreTotal>>> {
    let month = match query.month.as_deref().map(str::trim) {
        None | Some("") => Utc::now().format("%Y-%m").to_string(),
        Some(month) => validate_month(month)?,
    };
    Ok(Json(state.db.sales().store_comparison(&month).await?))
}
