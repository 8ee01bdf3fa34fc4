use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, patch, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::orders::{
    CreateOrderRequest, OrderDetail, OrderSummary, PrintableOrder, ReceiptResponse,
    ReviseOrderRequest, StatusResponse, TodayOrder,
};
use crate::{ApiResponse, AppState, NamedRef};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status_id: i32,
}

/// List every order, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    tag = "Orders",
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<Vec<OrderSummary>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<OrderSummary>>>, ServiceError> {
    let orders = state.services.orders.list_orders().await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// Create an order with its lines in one transaction
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "Orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created"),
        (status = 400, description = "Invalid client or empty item list", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Value>>), ServiceError> {
    let order_id = state.services.orders.create_order(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(json!({ "order_id": order_id }))),
    ))
}

/// Orders placed during the current business day
#[utoipa::path(
    get,
    path = "/api/v1/orders/today",
    tag = "Orders",
    responses(
        (status = 200, description = "Today's orders retrieved", body = ApiResponse<Vec<TodayOrder>>),
    ),
    security(("Bearer" = []))
)]
pub async fn list_today_orders(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<TodayOrder>>>, ServiceError> {
    let orders = state.services.orders.list_today_orders().await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// Order summary
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderSummary>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<OrderSummary>>, ServiceError> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Full edit payload with lines
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/detail",
    tag = "Orders",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order detail retrieved", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order_detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<OrderDetail>>, ServiceError> {
    let detail = state.services.orders.get_order_detail(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// Move an order to another status
#[utoipa::path(
    patch,
    path = "/api/v1/orders/{id}/status",
    tag = "Orders",
    params(("id" = i32, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<StatusResponse>),
        (status = 400, description = "Unknown status id", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<StatusResponse>>, ServiceError> {
    let status = state
        .services
        .orders
        .update_order_status(id, request.status_id)
        .await?;
    Ok(Json(ApiResponse::success(status)))
}

/// Reconcile an order's lines against an incoming revision: matched lines
/// update, missing lines delete, new lines insert; subtotals recompute
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    params(("id" = i32, Path, description = "Order id")),
    request_body = ReviseOrderRequest,
    responses(
        (status = 200, description = "Order revised", body = ApiResponse<OrderDetail>),
        (status = 400, description = "Line does not belong to this order, or invalid line data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn revise_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
    Json(request): Json<ReviseOrderRequest>,
) -> Result<Json<ApiResponse<OrderDetail>>, ServiceError> {
    let detail = state.services.orders.revise_order(id, request).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// Delete an order; refused while a delivery receipt exists
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "A delivery receipt was issued for this order", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
) -> Result<StatusCode, ServiceError> {
    state.services.orders.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Printable remito payload
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/print",
    tag = "Orders",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Printable payload retrieved", body = ApiResponse<PrintableOrder>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn print_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<PrintableOrder>>, ServiceError> {
    let printable = state.services.orders.get_printable_order(id).await?;
    Ok(Json(ApiResponse::success(printable)))
}

/// Issue the delivery receipt for an order (one per order)
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/receipt",
    tag = "Orders",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 201, description = "Receipt issued", body = ApiResponse<ReceiptResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Receipt already issued", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn issue_receipt(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<ReceiptResponse>>), ServiceError> {
    let receipt = state.services.orders.issue_receipt(id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(receipt))))
}

/// Fetch the issued delivery receipt
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<ReceiptResponse>>, ServiceError> {
    let receipt = state.services.orders.get_receipt(id).await?;
    Ok(Json(ApiResponse::success(receipt)))
}

/// Seeded order statuses
pub async fn list_order_statuses(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<NamedRef>>>, ServiceError> {
    let statuses = state.services.orders.list_statuses().await?;
    Ok(Json(ApiResponse::success(
        statuses
            .into_iter()
            .map(|s| NamedRef {
                id: s.id,
                name: s.name,
            })
            .collect(),
    )))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders", post(create_order))
        .route("/orders/today", get(list_today_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id", put(revise_order))
        .route("/orders/:id", delete(delete_order))
        .route("/orders/:id/detail", get(get_order_detail))
        .route("/orders/:id/status", patch(update_order_status))
        .route("/orders/:id/print", get(print_order))
        .route("/orders/:id/receipt", post(issue_receipt))
        .route("/orders/:id/receipt", get(get_receipt))
        .route("/order-statuses", get(list_order_statuses))
}
