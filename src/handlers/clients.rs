use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::clients::{
    ClientNameResponse, ClientResponse, ClientSummary, CreateClientRequest, UpdateClientRequest,
};
use crate::services::orders::ClientOrder;
use crate::{ApiResponse, AppState, NamedRef};

#[derive(Debug, Deserialize)]
pub struct DeleteClientParams {
    #[serde(default)]
    pub cascade: bool,
}

/// List every client with its tier name
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    tag = "Clients",
    responses(
        (status = 200, description = "Clients retrieved", body = ApiResponse<Vec<ClientSummary>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_clients(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<ClientSummary>>>, ServiceError> {
    let clients = state.services.clients.list_clients().await?;
    Ok(Json(ApiResponse::success(clients)))
}

/// Create a client
#[utoipa::path(
    post,
    path = "/api/v1/clients",
    tag = "Clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = ApiResponse<ClientResponse>),
        (status = 400, description = "Unknown client type or invalid payload", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_client(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ClientResponse>>), ServiceError> {
    let client = state.services.clients.create_client(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(client))))
}

/// Random sample of up to ten clients for the quick-pick list
#[utoipa::path(
    get,
    path = "/api/v1/clients/frequent",
    tag = "Clients",
    responses(
        (status = 200, description = "Sample retrieved", body = ApiResponse<Vec<ClientSummary>>),
    ),
    security(("Bearer" = []))
)]
pub async fn list_frequent_clients(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<ClientSummary>>>, ServiceError> {
    let clients = state.services.clients.list_frequent_clients().await?;
    Ok(Json(ApiResponse::success(clients)))
}

/// Available client types
#[utoipa::path(
    get,
    path = "/api/v1/client-types",
    tag = "Clients",
    responses(
        (status = 200, description = "Client types retrieved", body = ApiResponse<Vec<NamedRef>>),
    ),
    security(("Bearer" = []))
)]
pub async fn list_client_types(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<NamedRef>>>, ServiceError> {
    let types = state.services.clients.list_client_types().await?;
    Ok(Json(ApiResponse::success(
        types
            .into_iter()
            .map(|t| NamedRef {
                id: t.id,
                name: t.name,
            })
            .collect(),
    )))
}

/// Full client record for the edit form
#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    tag = "Clients",
    params(("id" = i32, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client retrieved", body = ApiResponse<ClientResponse>),
        (status = 404, description = "Client not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<ClientResponse>>, ServiceError> {
    let client = state.services.clients.get_client(id).await?;
    Ok(Json(ApiResponse::success(client)))
}

/// Only the client's id and name (order header lookups)
pub async fn get_client_name(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<ClientNameResponse>>, ServiceError> {
    let name = state.services.clients.get_client_name(id).await?;
    Ok(Json(ApiResponse::success(name)))
}

/// The client's order history, newest first
#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}/orders",
    tag = "Clients",
    params(("id" = i32, Path, description = "Client id")),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<Vec<ClientOrder>>),
    ),
    security(("Bearer" = []))
)]
pub async fn get_client_orders(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<ClientOrder>>>, ServiceError> {
    let orders = state.services.orders.list_client_orders(id).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// Update a client; name, phone and address are mandatory
#[utoipa::path(
    put,
    path = "/api/v1/clients/{id}",
    tag = "Clients",
    params(("id" = i32, Path, description = "Client id")),
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Client updated", body = ApiResponse<ClientResponse>),
        (status = 400, description = "Missing mandatory field", body = crate::errors::ErrorResponse),
        (status = 404, description = "Client not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<ApiResponse<ClientResponse>>, ServiceError> {
    let client = state.services.clients.update_client(id, request).await?;
    Ok(Json(ApiResponse::success(client)))
}

/// Delete a client; requires `cascade=true` when the client has orders
#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}",
    tag = "Clients",
    params(
        ("id" = i32, Path, description = "Client id"),
        ("cascade" = Option<bool>, Query, description = "Also delete the client's orders"),
    ),
    responses(
        (status = 200, description = "Client deleted"),
        (status = 400, description = "Client has orders and cascade was not requested", body = crate::errors::ErrorResponse),
        (status = 404, description = "Client not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(params): Query<DeleteClientParams>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    let cascaded = state
        .services
        .clients
        .delete_client(id, params.cascade)
        .await?;

    let message = if cascaded > 0 {
        "Client and associated orders deleted"
    } else {
        "Client deleted"
    };
    Ok(Json(ApiResponse::success(json!({
        "message": message,
        "cascaded_orders": cascaded,
    }))))
}

pub fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/clients", get(list_clients))
        .route("/clients", post(create_client))
        .route("/clients/frequent", get(list_frequent_clients))
        .route("/clients/:id", get(get_client))
        .route("/clients/:id", put(update_client))
        .route("/clients/:id", delete(delete_client))
        .route("/clients/:id/name", get(get_client_name))
        .route("/clients/:id/orders", get(get_client_orders))
        .route("/client-types", get(list_client_types))
}
