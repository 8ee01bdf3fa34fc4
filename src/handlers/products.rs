use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::products::{ProductPayload, ProductResponse, ProductSummary};
use crate::{ApiResponse, AppState, ListQuery, NamedRef, PaginatedResponse};

/// Paginated product catalog, id-ordered
#[utoipa::path(
    get,
    path = "/api/v1/products",
    tag = "Products",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Products retrieved", body = ApiResponse<PaginatedResponse<ProductSummary>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<ProductSummary>>>, ServiceError> {
    let limit = query
        .limit
        .unwrap_or(state.config.api_default_page_size)
        .min(state.config.api_max_page_size);
    let page = state.services.products.list_products(query.page, limit).await?;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: page.items,
        total: page.total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages,
    })))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    tag = "Products",
    request_body = ProductPayload,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductResponse>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), ServiceError> {
    let product = state.services.products.create_product(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

/// Product record for the edit form
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    tag = "Products",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product retrieved", body = ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    let product = state.services.products.get_product(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// Full update of a product
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    tag = "Products",
    params(("id" = i32, Path, description = "Product id")),
    request_body = ProductPayload,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    let product = state.services.products.update_product(id, payload).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// Product categories, name-ordered
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "Products",
    responses(
        (status = 200, description = "Categories retrieved", body = ApiResponse<Vec<NamedRef>>),
    ),
    security(("Bearer" = []))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<NamedRef>>>, ServiceError> {
    let categories = state.services.products.list_categories().await?;
    Ok(Json(ApiResponse::success(
        categories
            .into_iter()
            .map(|c| NamedRef {
                id: c.id,
                name: c.name,
            })
            .collect(),
    )))
}

/// Pricing tiers selectable per order line
#[utoipa::path(
    get,
    path = "/api/v1/price-lists",
    tag = "Products",
    responses(
        (status = 200, description = "Price lists retrieved", body = ApiResponse<Vec<NamedRef>>),
    ),
    security(("Bearer" = []))
)]
pub async fn list_price_lists(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<NamedRef>>>, ServiceError> {
    let lists = state.services.products.list_price_lists().await?;
    Ok(Json(ApiResponse::success(
        lists
            .into_iter()
            .map(|l| NamedRef {
                id: l.id,
                name: l.name,
            })
            .collect(),
    )))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products", post(create_product))
        .route("/products/:id", get(get_product))
        .route("/products/:id", put(update_product))
        .route("/categories", get(list_categories))
        .route("/price-lists", get(list_price_lists))
}
