use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pedidos API",
        version = "0.3.0",
        description = r#"
Backend for a small distribution business: client records, product catalog,
and order entry with printable delivery receipts (remitos).

## Authentication

Log in with the operator credential at `POST /auth/login` and send the token
on every `/api/v1` request:

```
Authorization: Bearer <access-token>
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Auth", description = "Operator login"),
        (name = "Clients", description = "Client records"),
        (name = "Products", description = "Product catalog and reference tables"),
        (name = "Orders", description = "Order entry, fulfillment and receipts")
    ),
    paths(
        // Auth
        crate::auth::login_handler,

        // Clients
        crate::handlers::clients::list_clients,
        crate::handlers::clients::create_client,
        crate::handlers::clients::list_frequent_clients,
        crate::handlers::clients::list_client_types,
        crate::handlers::clients::get_client,
        crate::handlers::clients::get_client_orders,
        crate::handlers::clients::update_client,
        crate::handlers::clients::delete_client,

        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::list_categories,
        crate::handlers::products::list_price_lists,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_today_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_order_detail,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::revise_order,
        crate::handlers::orders::delete_order,
        crate::handlers::orders::print_order,
        crate::handlers::orders::issue_receipt,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::ListQuery,
            crate::NamedRef,

            // Auth types
            crate::auth::LoginCredentials,
            crate::auth::TokenResponse,

            // Client types
            crate::services::clients::CreateClientRequest,
            crate::services::clients::UpdateClientRequest,
            crate::services::clients::ClientTypeRef,
            crate::services::clients::ClientSummary,
            crate::services::clients::ClientResponse,
            crate::services::clients::ClientNameResponse,

            // Product types
            crate::services::products::ProductPayload,
            crate::services::products::ProductSummary,
            crate::services::products::ProductResponse,

            // Order types
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::CreateOrderItem,
            crate::services::orders::ReviseOrderRequest,
            crate::services::orders::ReviseOrderLine,
            crate::services::orders::OrderSummary,
            crate::services::orders::OrderDetail,
            crate::services::orders::OrderDetailLine,
            crate::services::orders::ClientOrder,
            crate::services::orders::ClientOrderItem,
            crate::services::orders::TodayOrder,
            crate::services::orders::TodayOrderItem,
            crate::services::orders::StatusResponse,
            crate::services::orders::PrintableOrder,
            crate::services::orders::PrintableClient,
            crate::services::orders::PrintableItem,
            crate::services::orders::ReceiptResponse,
            crate::handlers::orders::UpdateOrderStatusRequest,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_the_api_surface() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Pedidos API"));
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/auth/login"));
    }
}
