mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;

use common::{decimal_field, response_json, TestApp};

#[tokio::test]
async fn create_and_fetch_product() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": "Azúcar 1kg",
                "description": "Refinada",
                "unit_of_measure": "kg",
                "unit_price": "4.25"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let id = body["data"]["id"].as_i64().expect("product id");
    assert_eq!(decimal_field(&body["data"]["unit_price"]), dec!(4.25));

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/products/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["name"], "Azúcar 1kg");
    assert_eq!(body["data"]["description"], "Refinada");
    assert_eq!(body["data"]["unit_of_measure"], "kg");
}

#[tokio::test]
async fn create_product_requires_a_name() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": "",
                "unit_price": "1.00"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn product_list_paginates_in_id_order() {
    let app = TestApp::new().await;
    app.seed_product("A", dec!(1)).await;
    app.seed_product("B", dec!(2)).await;
    app.seed_product("C", dec!(3)).await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/products?page=1&limit=2", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let data = &body["data"];
    assert_eq!(data["total"], 3);
    assert_eq!(data["total_pages"], 2);
    let names: Vec<&str> = data["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["A", "B"]);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/products?page=2&limit=2", None)
        .await;
    let body = response_json(response).await;
    let names: Vec<&str> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["C"]);
}

#[tokio::test]
async fn update_product_replaces_every_field() {
    let app = TestApp::new().await;
    let product = app.seed_product("Fideos", dec!(2.00)).await;

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/products/{}", product.id),
            Some(json!({
                "name": "Fideos tirabuzón",
                "description": "500g",
                "unit_of_measure": "paquete",
                "stock": "40",
                "unit_price": "2.75"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["name"], "Fideos tirabuzón");
    assert_eq!(decimal_field(&body["data"]["unit_price"]), dec!(2.75));
    assert_eq!(decimal_field(&body["data"]["stock"]), dec!(40));
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/products/4242", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn price_lists_are_seeded() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/price-lists", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["standard", "premium"]);
}

#[tokio::test]
async fn categories_endpoint_lists_empty_catalog() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/categories", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(|a| a.len()), Some(0));
}
