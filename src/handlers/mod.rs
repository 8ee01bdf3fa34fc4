pub mod clients;
pub mod orders;
pub mod products;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub clients: Arc<crate::services::clients::ClientService>,
    pub products: Arc<crate::services::products::ProductService>,
    pub orders: Arc<crate::services::orders::OrderService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let clients = Arc::new(crate::services::clients::ClientService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let products = Arc::new(crate::services::products::ProductService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let orders = Arc::new(crate::services::orders::OrderService::new(
            db_pool,
            Some(event_sender),
            config.business_day_utc_offset_hours,
        ));

        Self {
            clients,
            products,
            orders,
        }
    }
}
