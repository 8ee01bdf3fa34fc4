#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    routing::get,
    Router,
};
use pedidos_api::{
    auth::AuthService,
    config::AppConfig,
    db,
    entities::{client, product},
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Helper harness for spinning up an application backed by a scratch SQLite
/// database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = TempDir::new().expect("create scratch directory");
        let db_file = db_dir.path().join("pedidos_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            "integration_testing_secret_key_with_sixty_four_plus_characters_0123456789".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "development".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let db_pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("establish test database connection");
        db::run_migrations(&db_pool)
            .await
            .expect("run test migrations");
        let db_arc = Arc::new(db_pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::from_config(&cfg));
        let token = auth_service
            .authenticate(&cfg.admin_email, &cfg.admin_password)
            .expect("authenticate with configured credential")
            .access_token;

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()), &cfg);
        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::<AppState>::new()
            .route("/", get(|| async { "pedidos-api up" }))
            .nest("/api/v1", pedidos_api::api_v1_routes())
            .nest(
                "/auth",
                pedidos_api::auth::auth_routes().with_state(auth_service.clone()),
            )
            .layer(axum::middleware::from_fn_with_state(
                auth_service,
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: axum::extract::Request,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .layer(axum::middleware::from_fn(
                pedidos_api::middleware::request_id::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            token,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Issue a request without credentials.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("dispatch request")
    }

    /// Issue a request carrying an arbitrary bearer token.
    pub async fn request_with_token(
        &self,
        method: Method,
        uri: &str,
        token: &str,
    ) -> Response<Body> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("dispatch request")
    }

    /// Issue a request carrying the operator's bearer token.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("dispatch request")
    }

    /// Insert a client directly, bypassing the API.
    pub async fn seed_client(&self, name: &str, client_type_id: i32) -> client::Model {
        client::ActiveModel {
            full_name: Set(name.to_string()),
            phone: Set("555-0100".to_string()),
            address: Set("Calle Falsa 123".to_string()),
            business_name: Set(None),
            neighborhood: Set(None),
            client_type_id: Set(client_type_id),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed client")
    }

    /// Insert a product directly, bypassing the API.
    pub async fn seed_product(&self, name: &str, unit_price: Decimal) -> product::Model {
        product::ActiveModel {
            name: Set(name.to_string()),
            description: Set(None),
            unit_of_measure: Set(Some("unit".to_string())),
            category_id: Set(None),
            stock: Set(None),
            unit_price: Set(unit_price),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }
}

/// Read a response body as parsed JSON.
pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}

/// Decimal fields serialize as JSON strings; accept numbers too so asserts
/// don't depend on the database backend's scale handling.
pub fn decimal_field(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("parse decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("parse decimal number"),
        other => panic!("expected decimal-bearing JSON value, got {other:?}"),
    }
}
