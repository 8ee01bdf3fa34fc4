use crate::{
    db::DbPool,
    entities::client::{
        self, ActiveModel as ClientActiveModel, Entity as ClientEntity, Model as ClientModel,
    },
    entities::client_type::{self, Entity as ClientTypeEntity},
    entities::delivery_receipt::{self, Entity as DeliveryReceiptEntity},
    entities::order::{self, Entity as OrderEntity},
    entities::order_line::{self, Entity as OrderLineEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use rand::seq::SliceRandom;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

/// How many clients the "frequent" picker returns at most.
const FREQUENT_SAMPLE_SIZE: usize = 10;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    /// Client type referenced by name ("Normal" or "Premium")
    #[serde(rename = "type")]
    pub client_type: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    pub business_name: Option<String>,
    pub neighborhood: Option<String>,
}

/// Client type reference accepted in updates: a numeric id or a name.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ClientTypeRef {
    Id(i32),
    Name(String),
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub client_type: Option<ClientTypeRef>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub business_name: Option<String>,
    pub neighborhood: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientSummary {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub client_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientResponse {
    pub id: i32,
    pub name: String,
    pub type_id: i32,
    pub type_name: Option<String>,
    pub phone: String,
    pub address: String,
    pub business_name: Option<String>,
    pub neighborhood: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientNameResponse {
    pub id: i32,
    pub name: String,
}

/// Service for managing client records
#[derive(Clone)]
pub struct ClientService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ClientService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send client event");
            }
        }
    }

    /// Lists every client with its tier name.
    #[instrument(skip(self))]
    pub async fn list_clients(&self) -> Result<Vec<ClientSummary>, ServiceError> {
        let db = &*self.db_pool;

        let rows = ClientEntity::find()
            .find_also_related(ClientTypeEntity)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch clients");
                ServiceError::DatabaseError(e)
            })?;

        Ok(rows
            .into_iter()
            .map(|(client, client_type)| ClientSummary {
                id: client.id,
                name: client.full_name,
                client_type: client_type
                    .map(|t| t.name)
                    .unwrap_or_else(|| "Normal".to_string()),
            })
            .collect())
    }

    /// Returns a random sample of up to ten clients, name-ordered.
    #[instrument(skip(self))]
    pub async fn list_frequent_clients(&self) -> Result<Vec<ClientSummary>, ServiceError> {
        let db = &*self.db_pool;

        let mut ids: Vec<i32> = ClientEntity::find()
            .select_only()
            .column(client::Column::Id)
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        ids.shuffle(&mut rand::thread_rng());
        ids.truncate(FREQUENT_SAMPLE_SIZE);

        let rows = ClientEntity::find()
            .filter(client::Column::Id.is_in(ids))
            .find_also_related(ClientTypeEntity)
            .order_by_asc(client::Column::FullName)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(rows
            .into_iter()
            .map(|(client, client_type)| ClientSummary {
                id: client.id,
                name: client.full_name,
                client_type: client_type
                    .map(|t| t.name)
                    .unwrap_or_else(|| "Normal".to_string()),
            })
            .collect())
    }

    /// Lists the available client types, name-ordered.
    pub async fn list_client_types(&self) -> Result<Vec<client_type::Model>, ServiceError> {
        ClientTypeEntity::find()
            .order_by_asc(client_type::Column::Name)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Creates a client. The type is referenced by name; an unknown name is a
    /// validation error.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_client(
        &self,
        request: CreateClientRequest,
    ) -> Result<ClientResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;

        let client_type = ClientTypeEntity::find()
            .filter(client_type::Column::Name.eq(request.client_type.as_str()))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Unknown client type: {}",
                    request.client_type
                ))
            })?;

        let active = ClientActiveModel {
            full_name: Set(request.name),
            phone: Set(request.phone),
            address: Set(request.address),
            business_name: Set(request.business_name.filter(|s| !s.is_empty())),
            neighborhood: Set(request.neighborhood.filter(|s| !s.is_empty())),
            client_type_id: Set(client_type.id),
            ..Default::default()
        };

        let model = active.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create client");
            ServiceError::DatabaseError(e)
        })?;

        info!(client_id = model.id, "Client created");
        self.emit(Event::ClientCreated(model.id)).await;

        Ok(self.model_to_response(model, Some(client_type.name)))
    }

    /// Retrieves the full client record for the edit form.
    #[instrument(skip(self))]
    pub async fn get_client(&self, client_id: i32) -> Result<ClientResponse, ServiceError> {
        let db = &*self.db_pool;

        let (client, client_type) = ClientEntity::find_by_id(client_id)
            .find_also_related(ClientTypeEntity)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Client {} not found", client_id)))?;

        Ok(self.model_to_response(client, client_type.map(|t| t.name)))
    }

    /// Retrieves only the client's id and name (order header lookups).
    pub async fn get_client_name(&self, client_id: i32) -> Result<ClientNameResponse, ServiceError> {
        let client = ClientEntity::find_by_id(client_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Client {} not found", client_id)))?;

        Ok(ClientNameResponse {
            id: client.id,
            name: client.full_name,
        })
    }

    /// Updates a client. Name, phone and address are mandatory; the type may
    /// be referenced by id or name and is kept unchanged when unresolvable.
    #[instrument(skip(self, request), fields(client_id = client_id))]
    pub async fn update_client(
        &self,
        client_id: i32,
        request: UpdateClientRequest,
    ) -> Result<ClientResponse, ServiceError> {
        let name = required_trimmed(request.name.as_deref(), "name")?;
        let phone = required_trimmed(request.phone.as_deref(), "phone")?;
        let address = required_trimmed(request.address.as_deref(), "address")?;

        let db = &*self.db_pool;

        let client = ClientEntity::find_by_id(client_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Client {} not found", client_id)))?;

        let type_id = match &request.client_type {
            Some(type_ref) => self.resolve_client_type(type_ref).await?,
            None => None,
        };

        let mut active: ClientActiveModel = client.into();
        active.full_name = Set(name);
        active.phone = Set(phone);
        active.address = Set(address);
        active.business_name = Set(request
            .business_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()));
        active.neighborhood = Set(request
            .neighborhood
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()));
        if let Some(type_id) = type_id {
            active.client_type_id = Set(type_id);
        }

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, client_id, "Failed to update client");
            ServiceError::DatabaseError(e)
        })?;

        info!(client_id, "Client updated");
        self.emit(Event::ClientUpdated(client_id)).await;

        self.get_client(updated.id).await
    }

    async fn resolve_client_type(
        &self,
        type_ref: &ClientTypeRef,
    ) -> Result<Option<i32>, ServiceError> {
        let db = &*self.db_pool;

        match type_ref {
            ClientTypeRef::Id(id) if *id > 0 => {
                let found = ClientTypeEntity::find_by_id(*id)
                    .one(db)
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                Ok(found.map(|t| t.id))
            }
            ClientTypeRef::Id(_) => Ok(None),
            ClientTypeRef::Name(name) => {
                // Numeric strings resolve by id first, then by name
                if let Ok(id) = name.parse::<i32>() {
                    if id > 0 {
                        if let Some(found) = ClientTypeEntity::find_by_id(id)
                            .one(db)
                            .await
                            .map_err(ServiceError::DatabaseError)?
                        {
                            return Ok(Some(found.id));
                        }
                    }
                }
                let found = ClientTypeEntity::find()
                    .filter(client_type::Column::Name.eq(name.as_str()))
                    .one(db)
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                Ok(found.map(|t| t.id))
            }
        }
    }

    /// Deletes a client. When the client has orders, the caller must opt into
    /// a cascade that removes receipts, lines and orders in one transaction.
    #[instrument(skip(self), fields(client_id = client_id, cascade = cascade))]
    pub async fn delete_client(&self, client_id: i32, cascade: bool) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;

        ClientEntity::find_by_id(client_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Client {} not found", client_id)))?;

        let order_ids: Vec<i32> = OrderEntity::find()
            .filter(order::Column::ClientId.eq(client_id))
            .select_only()
            .column(order::Column::Id)
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if !order_ids.is_empty() && !cascade {
            return Err(ServiceError::InvalidOperation(
                "Client has associated orders; retry with cascade=true to delete them as well"
                    .to_string(),
            ));
        }

        let cascaded = order_ids.len() as u64;

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        if !order_ids.is_empty() {
            DeliveryReceiptEntity::delete_many()
                .filter(delivery_receipt::Column::OrderId.is_in(order_ids.clone()))
                .exec(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;
            OrderLineEntity::delete_many()
                .filter(order_line::Column::OrderId.is_in(order_ids.clone()))
                .exec(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;
            OrderEntity::delete_many()
                .filter(order::Column::Id.is_in(order_ids))
                .exec(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;
        }

        ClientEntity::delete_by_id(client_id)
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, client_id, "Failed to commit client deletion");
            ServiceError::DatabaseError(e)
        })?;

        info!(client_id, cascaded_orders = cascaded, "Client deleted");
        self.emit(Event::ClientDeleted {
            client_id,
            cascaded_orders: cascaded,
        })
        .await;

        Ok(cascaded)
    }

    fn model_to_response(&self, model: ClientModel, type_name: Option<String>) -> ClientResponse {
        ClientResponse {
            id: model.id,
            name: model.full_name,
            type_id: model.client_type_id,
            type_name,
            phone: model.phone,
            address: model.address,
            business_name: model.business_name,
            neighborhood: model.neighborhood,
        }
    }
}

fn required_trimmed(value: Option<&str>, field: &str) -> Result<String, ServiceError> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "The '{}' field is required",
            field
        )));
    }
    Ok(trimmed.to_string())
}
