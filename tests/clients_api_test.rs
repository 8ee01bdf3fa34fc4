mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use serde_json::json;

use common::{decimal_field, response_json, TestApp};
use pedidos_api::entities::client::Entity as ClientEntity;

#[tokio::test]
async fn create_client_resolves_type_by_name() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/clients",
            Some(json!({
                "name": "Ana García",
                "type": "Premium",
                "phone": "555-0101",
                "address": "Av. Siempre Viva 742",
                "business_name": "Almacén Ana",
                "neighborhood": "Centro"
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let data = &body["data"];
    assert_eq!(data["name"], "Ana García");
    assert_eq!(data["type_id"], 2);
    assert_eq!(data["type_name"], "Premium");
    assert_eq!(data["business_name"], "Almacén Ana");

    let stored = ClientEntity::find()
        .all(&*app.state.db)
        .await
        .expect("query clients");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].client_type_id, 2);
}

#[tokio::test]
async fn create_client_rejects_unknown_type() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/clients",
            Some(json!({
                "name": "Bruno",
                "type": "Platinum",
                "phone": "555-0102",
                "address": "Calle 9"
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_clients_includes_type_names() {
    let app = TestApp::new().await;
    app.seed_client("Carla", 1).await;
    app.seed_client("Diego", 2).await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/clients", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let items = body["data"].as_array().expect("client array");
    assert_eq!(items.len(), 2);
    let types: Vec<&str> = items
        .iter()
        .map(|c| c["type"].as_str().unwrap())
        .collect();
    assert!(types.contains(&"Normal"));
    assert!(types.contains(&"Premium"));
}

#[tokio::test]
async fn client_types_are_listed_name_ordered() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/client-types", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .expect("type array")
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Normal", "Premium"]);
}

#[tokio::test]
async fn update_client_requires_mandatory_fields() {
    let app = TestApp::new().await;
    let client = app.seed_client("Elena", 1).await;

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/clients/{}", client.id),
            Some(json!({
                "name": "Elena Actualizada",
                "address": "Nueva 1"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/clients/{}", client.id),
            Some(json!({
                "name": "  Elena Actualizada  ",
                "phone": "555-0200",
                "address": "Nueva 1",
                "type": "Premium"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["data"]["name"], "Elena Actualizada");
    assert_eq!(body["data"]["type_id"], 2);
}

#[tokio::test]
async fn update_client_accepts_type_by_numeric_id() {
    let app = TestApp::new().await;
    let client = app.seed_client("Facu", 2).await;

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/clients/{}", client.id),
            Some(json!({
                "name": "Facu",
                "phone": "555-0300",
                "address": "Mitre 55",
                "type": 1
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["type_id"], 1);
}

#[tokio::test]
async fn update_client_keeps_type_when_unresolvable() {
    let app = TestApp::new().await;
    let client = app.seed_client("Gabi", 2).await;

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/clients/{}", client.id),
            Some(json!({
                "name": "Gabi",
                "phone": "555-0400",
                "address": "Urquiza 12",
                "type": "NoSuchTier"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["type_id"], 2);
}

#[tokio::test]
async fn update_unknown_client_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::PUT,
            "/api/v1/clients/999",
            Some(json!({
                "name": "Nadie",
                "phone": "555",
                "address": "Ninguna"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_client_with_orders_requires_cascade() {
    let app = TestApp::new().await;
    let client = app.seed_client("Hilda", 1).await;
    let product = app.seed_product("Yerba 1kg", dec!(10.00)).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "client_id": client.id,
                "items": [{ "product_id": product.id, "quantity": "2" }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Refused without cascade
    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/v1/clients/{}", client.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Cascade removes orders and the client
    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/v1/clients/{}?cascade=true", client.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["cascaded_orders"], 1);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/orders", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(|a| a.len()), Some(0));
}

#[tokio::test]
async fn client_orders_carry_lines_and_totals() {
    let app = TestApp::new().await;
    let client = app.seed_client("Irene", 2).await;
    let product = app.seed_product("Harina", dec!(3.50)).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "client_id": client.id,
                "items": [{ "product_id": product.id, "quantity": "4" }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/clients/{}/orders", client.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let orders = body["data"].as_array().expect("order array");
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order["status"], "Pendiente");
    assert!(order["order_number"]
        .as_str()
        .unwrap()
        .starts_with("PED-"));
    assert_eq!(decimal_field(&order["total"]), dec!(14.00));

    let items = order["items"].as_array().expect("item array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product_name"], "Harina");
    assert_eq!(items[0]["price_list"], "standard");
}

#[tokio::test]
async fn frequent_clients_returns_at_most_ten() {
    let app = TestApp::new().await;
    for i in 0..12 {
        app.seed_client(&format!("Cliente {i:02}"), 1).await;
    }

    let response = app
        .request_authenticated(Method::GET, "/api/v1/clients/frequent", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let items = body["data"].as_array().expect("client array");
    assert_eq!(items.len(), 10);
}

#[tokio::test]
async fn client_name_endpoint_returns_only_id_and_name() {
    let app = TestApp::new().await;
    let client = app.seed_client("Juana", 1).await;

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/clients/{}/name", client.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["id"], client.id);
    assert_eq!(body["data"]["name"], "Juana");
    assert!(body["data"].get("phone").is_none());
}
