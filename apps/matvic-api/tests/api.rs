//! Router tests: requests go through the full axum stack against an
//! in-memory database.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use matvic_api::{build_router, ApiConfig, AppState, JwtManager};
use matvic_db::Database;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    db: Database,
    token: String,
}

async fn app() -> TestApp {
    let config = ApiConfig::from_lookup(|key| match key {
        "MATVIC_DB_PATH" => Some(":memory:".to_string()),
        "MATVIC_JWT_SECRET" => Some(SECRET.to_string()),
        _ => None,
    })
    .unwrap();

    let db = Database::new(config.db_config()).await.unwrap();
    let token = JwtManager::new(SECRET).generate(3, Some(1), 600).unwrap();
    let router = build_router(Arc::new(AppState::new(db.clone(), config)));

    TestApp { router, db, token }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(&self.token), Some(body)).await
    }

    async fn add_product(
        &self,
        name: &str,
        unit_price: i64,
        stock: i64,
        min_stock: i64,
    ) -> String {
        let (status, body) = self
            .post(
                "/products",
                json!({
                    "name": name,
                    "category": "Accesorios",
                    "unit_price": unit_price,
                    "stock": stock,
                    "min_stock": min_stock,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn product_crud_round_trip() {
    let app = app().await;
    let id = app.add_product("Funda iPhone 15", 2500, 10, 2).await;

    let (status, body) = app.get(&format!("/products/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Funda iPhone 15");
    assert_eq!(body["unit_price"], 2500);

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/products/{id}"),
            Some(&app.token),
            Some(json!({
                "name": "Funda iPhone 15 Pro",
                "category": "Fundas",
                "unit_price": 3000,
                "stock": 4,
                "min_stock": 5,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unit_price"], 3000);

    let (_, alerts) = app.get("/products/alerts").await;
    assert_eq!(alerts.as_array().unwrap().len(), 1);

    let (status, body) = app
        .send(Method::DELETE, &format!("/products/{id}"), Some(&app.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "deleted": true }));

    let (status, body) = app.get(&format!("/products/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn product_search_filters_by_text_and_category() {
    let app = app().await;
    app.add_product("Cable USB-C", 1500, 5, 0).await;
    app.add_product("Protector Samsung S24", 1200, 5, 0).await;

    let (_, body) = app.get("/products?q=usb").await;
    let names: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Cable USB-C"]);

    let (_, body) = app.get("/products?category=accesorios").await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_product_input_is_a_validation_error() {
    let app = app().await;

    let (status, body) = app
        .post(
            "/products",
            json!({ "name": "  ", "unit_price": 100, "stock": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app.post("/products", json!({ "name": "Cable" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn mutating_routes_require_a_valid_token() {
    let app = app().await;
    let body = json!({ "name": "Cable", "unit_price": 100, "stock": 1 });

    let (status, err) = app
        .send(Method::POST, "/products", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["code"], "UNAUTHORIZED");

    let forged = JwtManager::new("other-secret").generate(3, Some(1), 600).unwrap();
    let (status, _) = app
        .send(Method::POST, "/products", Some(&forged), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = JwtManager::new(SECRET).generate(3, Some(1), -60).unwrap();
    let (status, _) = app
        .send(Method::POST, "/products", Some(&expired), Some(body))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Reads stay open.
    let (status, _) = app.get("/products").await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Sales
// =============================================================================

#[tokio::test]
async fn cable_sale_returns_receipt_and_decrements_stock() {
    let app = app().await;
    let cable = app.add_product("Cable USB-C", 15, 5, 0).await;

    let (status, receipt) = app
        .post(
            "/sales",
            json!({
                "payment_method": "Efectivo",
                "items": [{ "product_id": cable, "quantity": 3, "unit_price": 1 }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    // The client price is ignored.
    assert_eq!(receipt["total"], 45);

    let sale_id = receipt["sale_id"].as_str().unwrap();
    let (status, detail) = app.get(&format!("/sales/{sale_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["store_id"], 1);
    assert_eq!(detail["employee_id"], 3);
    assert_eq!(detail["payment_method"], "cash");
    assert_eq!(detail["items"][0]["quantity"], 3);

    let (_, product) = app.get(&format!("/products/{cable}")).await;
    assert_eq!(product["stock"], 2);
}

#[tokio::test]
async fn bulk_line_is_limited_by_stock_only() {
    let app = app().await;
    let mica = app.add_product("Mica Hidrogel", 2990, 5000, 0).await;

    let (status, receipt) = app
        .post(
            "/sales",
            json!({
                "payment_method": "Transferencia",
                "items": [
                    { "product_id": mica, "quantity": 600 },
                    { "product_id": mica, "quantity": 400 },
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    assert_eq!(receipt["total"], 2_990_000);

    let (_, product) = app.get(&format!("/products/{mica}")).await;
    assert_eq!(product["stock"], 4000);
}

#[tokio::test]
async fn sale_errors_map_to_codes() {
    let app = app().await;
    let charger = app.add_product("Cargador Inalámbrico", 3000, 2, 0).await;

    let cases = [
        (
            json!({ "payment_method": "Tarjeta", "items": [{ "product_id": charger, "quantity": 5 }] }),
            StatusCode::CONFLICT,
            "INSUFFICIENT_STOCK",
        ),
        (
            json!({ "payment_method": "Tarjeta", "items": [] }),
            StatusCode::BAD_REQUEST,
            "EMPTY_CART",
        ),
        (
            json!({ "payment_method": "Bitcoin", "items": [{ "product_id": charger, "quantity": 1 }] }),
            StatusCode::BAD_REQUEST,
            "INVALID_PAYMENT_METHOD",
        ),
        (
            json!({ "payment_method": "Tarjeta", "items": [{ "product_id": "ghost", "quantity": 1 }] }),
            StatusCode::NOT_FOUND,
            "PRODUCT_NOT_FOUND",
        ),
        (
            json!({ "payment_method": "Tarjeta", "store_id": 99, "items": [{ "product_id": charger, "quantity": 1 }] }),
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
        ),
        (
            json!({ "payment_method": "Tarjeta", "employee_id": 4, "items": [{ "product_id": charger, "quantity": 1 }] }),
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
        ),
    ];

    for (body, status, code) in cases {
        let (actual, err) = app.post("/sales", body.clone()).await;
        assert_eq!(actual, status, "{body} -> {err}");
        assert_eq!(err["code"], code, "{body}");
        assert!(err["message"].is_string());
    }

    let (_, product) = app.get(&format!("/products/{charger}")).await;
    assert_eq!(product["stock"], 2);
    assert_eq!(app.db.sales().count().await.unwrap(), 0);
}

#[tokio::test]
async fn dashboard_reads_see_committed_sales() {
    let app = app().await;
    let funda = app.add_product("Funda iPhone 15", 2500, 10, 0).await;

    for store_id in [1, 1, 2] {
        let (status, _) = app
            .post(
                "/sales",
                json!({
                    "payment_method": "transfer",
                    "store_id": store_id,
                    "items": [{ "product_id": funda, "quantity": 1 }],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let month = chrono::Utc::now().format("%Y-%m").to_string();

    let (_, body) = app.get(&format!("/sales/byday/{today}")).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
    let (_, body) = app.get(&format!("/sales/byday/{today}?local=2")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = app.get(&format!("/sales/bymonth/{month}?local=1")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = app.get("/sales/recent?limit=2").await;
    let recent = body.as_array().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0]["products"], json!(["Funda iPhone 15"]));

    let (_, body) = app.get("/sales/stats/comparison").await;
    let stores = body.as_array().unwrap();
    assert_eq!(stores.len(), 2);
    assert_eq!(stores[0]["revenue"], 5000);
    assert_eq!(stores[1]["sale_count"], 1);

    let (_, body) = app.get("/sales/stats/monthly-history").await;
    let history = body.as_array().unwrap();
    assert_eq!(history.len(), 6);
    assert_eq!(history[5]["month"], month.as_str());
    assert_eq!(history[5]["revenue"], 7500);
}

#[tokio::test]
async fn malformed_periods_are_rejected() {
    let app = app().await;

    for uri in [
        "/sales/byday/2024-02-30",
        "/sales/bymonth/2024-13",
        "/sales/recent?local=dos",
        "/sales/stats/comparison?month=enero",
        "/sales/not-a-uuid",
    ] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["code"], "VALIDATION_ERROR", "{uri}");
    }
}

// =============================================================================
// Misc
// =============================================================================

#[tokio::test]
async fn health_and_stores() {
    let app = app().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "database": "connected" }));

    let (_, body) = app.get("/stores").await;
    assert_eq!(body[0]["name"], "Local N° 22");
    assert_eq!(body[1]["id"], 2);
}
