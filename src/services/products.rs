use crate::{
    db::DbPool,
    entities::price_list::{self, Entity as PriceListEntity},
    entities::product::{
        self, ActiveModel as ProductActiveModel, Entity as ProductEntity, Model as ProductModel,
    },
    entities::product_category::{self, Entity as CategoryEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProductPayload {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub unit_of_measure: Option<String>,
    pub category_id: Option<i32>,
    pub stock: Option<Decimal>,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSummary {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category: String,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub unit_of_measure: String,
    pub category_id: Option<i32>,
    pub stock: Option<Decimal>,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ProductListPage {
    pub items: Vec<ProductSummary>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Service for the product catalog and its reference tables
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send product event");
            }
        }
    }

    /// Lists products id-ordered with pagination and category names.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<ProductListPage, ServiceError> {
        let db = &*self.db_pool;
        let page = page.max(1);
        let limit = limit.max(1);

        let paginator = ProductEntity::find()
            .find_also_related(CategoryEntity)
            .order_by_asc(product::Column::Id)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count products");
            ServiceError::DatabaseError(e)
        })?;

        let rows = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page, limit, "Failed to fetch products page");
            ServiceError::DatabaseError(e)
        })?;

        let items = rows
            .into_iter()
            .map(|(product, category)| ProductSummary {
                id: product.id,
                name: product.name,
                description: product.description.unwrap_or_default(),
                category: category.map(|c| c.name).unwrap_or_default(),
                unit_price: product.unit_price,
            })
            .collect();

        Ok(ProductListPage {
            items,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        })
    }

    /// Creates a product.
    #[instrument(skip(self, payload), fields(name = %payload.name))]
    pub async fn create_product(
        &self,
        payload: ProductPayload,
    ) -> Result<ProductResponse, ServiceError> {
        payload
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let active = ProductActiveModel {
            name: Set(payload.name),
            description: Set(payload.description.filter(|s| !s.is_empty())),
            unit_of_measure: Set(payload.unit_of_measure.filter(|s| !s.is_empty())),
            category_id: Set(payload.category_id.filter(|id| *id > 0)),
            stock: Set(payload.stock),
            unit_price: Set(payload.unit_price),
            ..Default::default()
        };

        let model = active.insert(&*self.db_pool).await.map_err(|e| {
            error!(error = %e, "Failed to create product");
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id = model.id, "Product created");
        self.emit(Event::ProductCreated(model.id)).await;

        Ok(model_to_response(model))
    }

    /// Retrieves a product for the edit form.
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: i32) -> Result<ProductResponse, ServiceError> {
        let product = ProductEntity::find_by_id(product_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        Ok(model_to_response(product))
    }

    /// Full update of a product record.
    #[instrument(skip(self, payload), fields(product_id = product_id))]
    pub async fn update_product(
        &self,
        product_id: i32,
        payload: ProductPayload,
    ) -> Result<ProductResponse, ServiceError> {
        payload
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;

        let product = ProductEntity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let mut active: ProductActiveModel = product.into();
        active.name = Set(payload.name);
        active.description = Set(payload.description.filter(|s| !s.is_empty()));
        active.unit_of_measure = Set(payload.unit_of_measure.filter(|s| !s.is_empty()));
        active.category_id = Set(payload.category_id.filter(|id| *id > 0));
        active.stock = Set(payload.stock);
        active.unit_price = Set(payload.unit_price);

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, product_id, "Failed to update product");
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id, "Product updated");
        self.emit(Event::ProductUpdated(product_id)).await;

        Ok(model_to_response(updated))
    }

    /// Lists product categories, name-ordered.
    pub async fn list_categories(&self) -> Result<Vec<product_category::Model>, ServiceError> {
        CategoryEntity::find()
            .order_by_asc(product_category::Column::Name)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Lists the pricing tiers selectable per order line.
    pub async fn list_price_lists(&self) -> Result<Vec<price_list::Model>, ServiceError> {
        PriceListEntity::find()
            .order_by_asc(price_list::Column::Id)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)
    }
}

fn model_to_response(model: ProductModel) -> ProductResponse {
    ProductResponse {
        id: model.id,
        name: model.name,
        description: model.description.unwrap_or_default(),
        unit_of_measure: model.unit_of_measure.unwrap_or_default(),
        category_id: model.category_id,
        stock: model.stock,
        unit_price: model.unit_price,
    }
}
