use crate::{
    db::DbPool,
    entities::client::Entity as ClientEntity,
    entities::delivery_receipt::{
        self, ActiveModel as ReceiptActiveModel, Entity as ReceiptEntity,
    },
    entities::order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity},
    entities::order_line::{
        self, ActiveModel as OrderLineActiveModel, Entity as OrderLineEntity,
    },
    entities::order_status::{self, Entity as OrderStatusEntity},
    entities::price_list::Entity as PriceListEntity,
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

/// Status id assigned to freshly created orders (seeded "Pendiente").
const DEFAULT_STATUS_ID: i32 = 1;
/// Price list used when a line does not name one (seeded "standard").
const DEFAULT_PRICE_LIST_ID: i32 = 1;

// ---------------------------------------------------------------------------
// Request/Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub client_id: i32,
    pub items: Vec<CreateOrderItem>,
    /// Optional precomputed subtotals, index-aligned with `items`
    pub subtotal_items: Option<Vec<Decimal>>,
    /// ISO 8601; an unparseable value falls back to "now"
    pub date_created: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderItem {
    pub product_id: i32,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub price_list_id: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviseOrderRequest {
    pub notes: Option<String>,
    pub order_date: Option<DateTime<Utc>>,
    pub status_id: Option<i32>,
    pub lines: Vec<ReviseOrderLine>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviseOrderLine {
    /// Present for stored lines; absent for new ones
    pub id: Option<i32>,
    pub product_id: i32,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub price_list_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummary {
    pub id: i32,
    pub client_id: i32,
    pub date_created: DateTime<Utc>,
    pub total: Decimal,
    pub status_id: i32,
    pub status_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub id: i32,
    pub client_id: i32,
    pub order_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub status_id: i32,
    pub status_name: Option<String>,
    pub lines: Vec<OrderDetailLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetailLine {
    pub id: i32,
    pub product_id: i32,
    pub product_name: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub price_list_id: i32,
    pub price_list_name: Option<String>,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientOrder {
    pub id: i32,
    pub client_id: i32,
    pub order_number: String,
    pub date_created: DateTime<Utc>,
    pub items: Vec<ClientOrderItem>,
    pub total: Decimal,
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientOrderItem {
    pub id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub price_list: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayOrder {
    pub id: i32,
    pub client_id: i32,
    pub date_created: DateTime<Utc>,
    pub items: Vec<TodayOrderItem>,
    pub subtotal_items: Vec<Decimal>,
    pub total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayOrderItem {
    pub product_id: i32,
    pub quantity: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status_id: i32,
    pub status_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PrintableOrder {
    pub id: i32,
    pub order_number: String,
    /// Business-local date, dd/mm/yyyy
    pub date: String,
    pub client: PrintableClient,
    pub items: Vec<PrintableItem>,
    pub total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PrintableClient {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PrintableItem {
    pub name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiptResponse {
    pub id: i32,
    pub order_id: i32,
    pub receipt_number: String,
    pub issued_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Service for order entry and fulfillment
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    /// Fixed UTC offset defining the business day for "today" queries
    business_day_offset_hours: i32,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        business_day_offset_hours: i32,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            business_day_offset_hours,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send order event");
            }
        }
    }

    fn business_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.business_day_offset_hours * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
    }

    /// Lists every order, newest first, with a total computed from its lines.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderSummary>, ServiceError> {
        let db = &*self.db_pool;

        let rows = OrderEntity::find()
            .find_also_related(OrderStatusEntity)
            .order_by_desc(order::Column::OrderDate)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch orders");
                ServiceError::DatabaseError(e)
            })?;

        let totals = self
            .line_totals(db, rows.iter().map(|(o, _)| o.id).collect())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(order, status)| OrderSummary {
                id: order.id,
                client_id: order.client_id,
                date_created: order.order_date,
                total: totals.get(&order.id).copied().unwrap_or(Decimal::ZERO),
                status_id: order.status_id,
                status_name: status
                    .map(|s| s.name)
                    .unwrap_or_else(|| "Pendiente".to_string()),
            })
            .collect())
    }

    /// Creates an order with its lines in one transaction.
    ///
    /// Unknown products and non-positive quantities are skipped with a
    /// warning rather than failing the whole order, matching the entry form's
    /// forgiving behavior. Unit price resolution order: explicit item price,
    /// then the aligned precomputed subtotal divided by quantity, then the
    /// product's base price.
    #[instrument(skip(self, request), fields(client_id = request.client_id))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<i32, ServiceError> {
        if request.client_id <= 0 {
            return Err(ServiceError::ValidationError(
                "client_id must be a positive id".to_string(),
            ));
        }
        if request.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "An order needs at least one item".to_string(),
            ));
        }

        let db = &*self.db_pool;

        ClientEntity::find_by_id(request.client_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("Client {} not found", request.client_id))
            })?;

        let order_date = match request.date_created.as_deref() {
            Some(raw) if !raw.trim().is_empty() => match DateTime::parse_from_rfc3339(raw.trim()) {
                Ok(parsed) => parsed.with_timezone(&Utc),
                Err(_) => {
                    warn!("Unparseable order date in request; falling back to now");
                    Utc::now()
                }
            },
            _ => Utc::now(),
        };

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order_model = OrderActiveModel {
            client_id: Set(request.client_id),
            order_date: Set(order_date),
            status_id: Set(DEFAULT_STATUS_ID),
            notes: Set(request.notes.filter(|s| !s.trim().is_empty())),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create order");
            ServiceError::DatabaseError(e)
        })?;

        let mut inserted = 0usize;
        for (index, item) in request.items.iter().enumerate() {
            if item.product_id <= 0 {
                warn!(index, "Skipping order item with invalid product id");
                continue;
            }
            if item.quantity <= Decimal::ZERO {
                warn!(index, "Skipping order item with non-positive quantity");
                continue;
            }

            let Some(product) = ProductEntity::find_by_id(item.product_id)
                .one(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?
            else {
                warn!(index, product_id = item.product_id, "Skipping unknown product");
                continue;
            };

            let aligned_subtotal = request
                .subtotal_items
                .as_ref()
                .and_then(|subtotals| subtotals.get(index))
                .copied();
            let unit_price = resolve_unit_price(
                item.unit_price,
                aligned_subtotal,
                item.quantity,
                product.unit_price,
            );

            let price_list_id = item
                .price_list_id
                .filter(|id| *id > 0)
                .unwrap_or(DEFAULT_PRICE_LIST_ID);

            OrderLineActiveModel {
                order_id: Set(order_model.id),
                product_id: Set(product.id),
                quantity: Set(item.quantity),
                unit_price: Set(unit_price),
                price_list_id: Set(price_list_id),
                subtotal: Set(item.quantity * unit_price),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;
            inserted += 1;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = order_model.id, "Failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = order_model.id, lines = inserted, "Order created");
        self.emit(Event::OrderCreated(order_model.id)).await;

        Ok(order_model.id)
    }

    /// Retrieves an order summary.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i32) -> Result<OrderSummary, ServiceError> {
        let db = &*self.db_pool;

        let (order, status) = OrderEntity::find_by_id(order_id)
            .find_also_related(OrderStatusEntity)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let totals = self.line_totals(db, vec![order.id]).await?;

        Ok(OrderSummary {
            id: order.id,
            client_id: order.client_id,
            date_created: order.order_date,
            total: totals.get(&order.id).copied().unwrap_or(Decimal::ZERO),
            status_id: order.status_id,
            status_name: status.map(|s| s.name).unwrap_or_else(|| "—".to_string()),
        })
    }

    /// Retrieves the full edit payload for an order.
    #[instrument(skip(self))]
    pub async fn get_order_detail(&self, order_id: i32) -> Result<OrderDetail, ServiceError> {
        let db = &*self.db_pool;

        let (order, status) = OrderEntity::find_by_id(order_id)
            .find_also_related(OrderStatusEntity)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let lines = OrderLineEntity::find()
            .filter(order_line::Column::OrderId.eq(order_id))
            .order_by_asc(order_line::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let product_names = self
            .product_names(db, lines.iter().map(|l| l.product_id).collect())
            .await?;
        let price_list_names = self.price_list_names(db).await?;

        Ok(OrderDetail {
            id: order.id,
            client_id: order.client_id,
            order_date: order.order_date,
            notes: order.notes,
            status_id: order.status_id,
            status_name: status.map(|s| s.name),
            lines: lines
                .into_iter()
                .map(|line| OrderDetailLine {
                    id: line.id,
                    product_id: line.product_id,
                    product_name: product_names.get(&line.product_id).cloned(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    price_list_id: line.price_list_id,
                    price_list_name: price_list_names.get(&line.price_list_id).cloned(),
                    subtotal: line.subtotal,
                })
                .collect(),
        })
    }

    /// Orders recorded for a client, newest first, with line details.
    #[instrument(skip(self))]
    pub async fn list_client_orders(&self, client_id: i32) -> Result<Vec<ClientOrder>, ServiceError> {
        let db = &*self.db_pool;

        let rows = OrderEntity::find()
            .filter(order::Column::ClientId.eq(client_id))
            .find_also_related(OrderStatusEntity)
            .order_by_desc(order::Column::OrderDate)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let order_ids: Vec<i32> = rows.iter().map(|(o, _)| o.id).collect();
        let mut lines_by_order: HashMap<i32, Vec<order_line::Model>> = HashMap::new();
        let lines = OrderLineEntity::find()
            .filter(order_line::Column::OrderId.is_in(order_ids))
            .order_by_asc(order_line::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        let product_names = self
            .product_names(db, lines.iter().map(|l| l.product_id).collect())
            .await?;
        let price_list_names = self.price_list_names(db).await?;
        for line in lines {
            lines_by_order.entry(line.order_id).or_default().push(line);
        }

        Ok(rows
            .into_iter()
            .map(|(order, status)| {
                let lines = lines_by_order.remove(&order.id).unwrap_or_default();
                let total = lines.iter().map(|l| l.subtotal).sum();
                ClientOrder {
                    id: order.id,
                    client_id: order.client_id,
                    order_number: order.order_number(),
                    date_created: order.order_date,
                    items: lines
                        .into_iter()
                        .map(|line| ClientOrderItem {
                            id: line.id,
                            product_id: line.product_id,
                            product_name: product_names
                                .get(&line.product_id)
                                .cloned()
                                .unwrap_or_else(|| "Unnamed product".to_string()),
                            quantity: line.quantity,
                            unit_price: line.unit_price,
                            subtotal: line.subtotal,
                            price_list: price_list_names
                                .get(&line.price_list_id)
                                .cloned()
                                .unwrap_or_else(|| "unknown".to_string()),
                        })
                        .collect(),
                    total,
                    status: status
                        .map(|s| s.name)
                        .unwrap_or_else(|| "unknown".to_string()),
                }
            })
            .collect())
    }

    /// Orders placed during the current business day, oldest first.
    #[instrument(skip(self))]
    pub async fn list_today_orders(&self) -> Result<Vec<TodayOrder>, ServiceError> {
        let db = &*self.db_pool;

        let offset = self.business_offset();
        let local_now = Utc::now().with_timezone(&offset);
        let start_local = local_now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time");
        let start = start_local
            .and_local_timezone(offset)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let end = start + Duration::days(1);

        let orders = OrderEntity::find()
            .filter(order::Column::OrderDate.gte(start))
            .filter(order::Column::OrderDate.lt(end))
            .order_by_asc(order::Column::OrderDate)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let order_ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
        let mut lines_by_order: HashMap<i32, Vec<order_line::Model>> = HashMap::new();
        let lines = OrderLineEntity::find()
            .filter(order_line::Column::OrderId.is_in(order_ids))
            .order_by_asc(order_line::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        for line in lines {
            lines_by_order.entry(line.order_id).or_default().push(line);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let lines = lines_by_order.remove(&order.id).unwrap_or_default();
                let subtotal_items: Vec<Decimal> = lines.iter().map(|l| l.subtotal).collect();
                TodayOrder {
                    id: order.id,
                    client_id: order.client_id,
                    date_created: order.order_date,
                    items: lines
                        .into_iter()
                        .map(|line| TodayOrderItem {
                            product_id: line.product_id,
                            quantity: line.quantity,
                        })
                        .collect(),
                    total: subtotal_items.iter().copied().sum(),
                    subtotal_items,
                }
            })
            .collect())
    }

    /// Moves an order to another status. The target must be a seeded status.
    #[instrument(skip(self), fields(order_id = order_id, status_id = status_id))]
    pub async fn update_order_status(
        &self,
        order_id: i32,
        status_id: i32,
    ) -> Result<StatusResponse, ServiceError> {
        let db = &*self.db_pool;

        let status = OrderStatusEntity::find_by_id(status_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::InvalidStatus(format!("Unknown order status id: {}", status_id))
            })?;

        let (order, old_status) = OrderEntity::find_by_id(order_id)
            .find_also_related(OrderStatusEntity)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status_name = old_status.map(|s| s.name).unwrap_or_default();

        let mut active: OrderActiveModel = order.into();
        active.status_id = Set(status.id);
        active.update(db).await.map_err(|e| {
            error!(error = %e, order_id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id, old_status = %old_status_name, new_status = %status.name, "Order status updated");
        self.emit(Event::OrderStatusChanged {
            order_id,
            old_status: old_status_name,
            new_status: status.name.clone(),
        })
        .await;

        Ok(StatusResponse {
            status_id: status.id,
            status_name: status.name,
        })
    }

    /// Reconciles an order's lines against an incoming revision in one
    /// transaction: lines carrying a known id are updated in place, stored
    /// lines missing from the payload are deleted, and lines without an id
    /// are inserted. Subtotals are recomputed on every touched line.
    #[instrument(skip(self, request), fields(order_id = order_id))]
    pub async fn revise_order(
        &self,
        order_id: i32,
        request: ReviseOrderRequest,
    ) -> Result<OrderDetail, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id, "Failed to start transaction for order revision");
            ServiceError::DatabaseError(e)
        })?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if let Some(status_id) = request.status_id {
            OrderStatusEntity::find_by_id(status_id)
                .one(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| {
                    ServiceError::InvalidStatus(format!("Unknown order status id: {}", status_id))
                })?;
        }

        let existing = OrderLineEntity::find()
            .filter(order_line::Column::OrderId.eq(order_id))
            .all(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        let existing_by_id: HashMap<i32, order_line::Model> =
            existing.into_iter().map(|line| (line.id, line)).collect();

        let mut seen: HashSet<i32> = HashSet::new();
        let mut inserted = 0usize;
        let mut updated = 0usize;

        for line in &request.lines {
            if line.quantity <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Line quantity must be positive".to_string(),
                ));
            }
            if let Some(price) = line.unit_price {
                if price < Decimal::ZERO {
                    return Err(ServiceError::ValidationError(
                        "Line unit price cannot be negative".to_string(),
                    ));
                }
            }

            match line.id {
                Some(line_id) => {
                    // Updating a line that belongs to another order would break
                    // the order/line ownership invariant
                    let current = existing_by_id.get(&line_id).cloned().ok_or_else(|| {
                        ServiceError::ValidationError(format!(
                            "Line {} does not belong to order {}",
                            line_id, order_id
                        ))
                    })?;
                    seen.insert(line_id);

                    let product_id = if line.product_id != current.product_id {
                        self.require_product(&txn, line.product_id).await?.id
                    } else {
                        current.product_id
                    };

                    let unit_price = line.unit_price.unwrap_or(current.unit_price);
                    let price_list_id = line
                        .price_list_id
                        .filter(|id| *id > 0)
                        .unwrap_or(current.price_list_id);

                    let mut active: OrderLineActiveModel = current.into();
                    active.product_id = Set(product_id);
                    active.quantity = Set(line.quantity);
                    active.unit_price = Set(unit_price);
                    active.price_list_id = Set(price_list_id);
                    active.subtotal = Set(line.quantity * unit_price);
                    active
                        .update(&txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?;
                    updated += 1;
                }
                None => {
                    let product = self.require_product(&txn, line.product_id).await?;
                    let unit_price = line.unit_price.unwrap_or(product.unit_price);
                    let price_list_id = line
                        .price_list_id
                        .filter(|id| *id > 0)
                        .unwrap_or(DEFAULT_PRICE_LIST_ID);

                    OrderLineActiveModel {
                        order_id: Set(order_id),
                        product_id: Set(product.id),
                        quantity: Set(line.quantity),
                        unit_price: Set(unit_price),
                        price_list_id: Set(price_list_id),
                        subtotal: Set(line.quantity * unit_price),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                    inserted += 1;
                }
            }
        }

        let to_remove: Vec<i32> = existing_by_id
            .keys()
            .filter(|id| !seen.contains(*id))
            .copied()
            .collect();
        let removed = to_remove.len();
        if !to_remove.is_empty() {
            OrderLineEntity::delete_many()
                .filter(order_line::Column::Id.is_in(to_remove))
                .exec(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;
        }

        let mut active: OrderActiveModel = order.into();
        if let Some(notes) = request.notes {
            let trimmed = notes.trim().to_string();
            active.notes = Set(if trimmed.is_empty() { None } else { Some(trimmed) });
        }
        if let Some(order_date) = request.order_date {
            active.order_date = Set(order_date);
        }
        if let Some(status_id) = request.status_id {
            active.status_id = Set(status_id);
        }
        active.updated_at = Set(Some(Utc::now()));
        active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id, "Failed to commit order revision");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id, inserted, updated, removed, "Order revised");
        self.emit(Event::OrderRevised {
            order_id,
            inserted,
            updated,
            removed,
        })
        .await;

        self.get_order_detail(order_id).await
    }

    /// Deletes an order and its lines. Refused while a delivery receipt for
    /// the order exists.
    #[instrument(skip(self), fields(order_id = order_id))]
    pub async fn delete_order(&self, order_id: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let receipt = ReceiptEntity::find()
            .filter(delivery_receipt::Column::OrderId.eq(order_id))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if receipt.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Order {} has an issued delivery receipt and cannot be deleted",
                order_id
            )));
        }

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        OrderLineEntity::delete_many()
            .filter(order_line::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        OrderEntity::delete_by_id(order_id)
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id, "Failed to commit order deletion");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id, "Order deleted");
        self.emit(Event::OrderDeleted(order_id)).await;

        Ok(())
    }

    /// Builds the printable remito payload.
    #[instrument(skip(self))]
    pub async fn get_printable_order(&self, order_id: i32) -> Result<PrintableOrder, ServiceError> {
        let db = &*self.db_pool;

        let (order, client) = OrderEntity::find_by_id(order_id)
            .find_also_related(ClientEntity)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let client = client.ok_or_else(|| {
            ServiceError::InternalError(format!("Order {} has no client record", order_id))
        })?;

        let lines = OrderLineEntity::find()
            .filter(order_line::Column::OrderId.eq(order_id))
            .order_by_asc(order_line::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let product_names = self
            .product_names(db, lines.iter().map(|l| l.product_id).collect())
            .await?;

        let total = lines.iter().map(|l| l.subtotal).sum();
        let local_date = order.order_date.with_timezone(&self.business_offset());

        Ok(PrintableOrder {
            id: order.id,
            order_number: order.order_number(),
            date: local_date.format("%d/%m/%Y").to_string(),
            client: PrintableClient {
                name: client.full_name,
                address: client.address,
            },
            items: lines
                .into_iter()
                .map(|line| PrintableItem {
                    name: product_names
                        .get(&line.product_id)
                        .cloned()
                        .unwrap_or_else(|| "Unnamed product".to_string()),
                    quantity: line.quantity,
                    price: line.unit_price,
                    subtotal: line.subtotal,
                })
                .collect(),
            total,
        })
    }

    /// Issues the delivery receipt for an order. One receipt per order.
    #[instrument(skip(self), fields(order_id = order_id))]
    pub async fn issue_receipt(&self, order_id: i32) -> Result<ReceiptResponse, ServiceError> {
        let db = &*self.db_pool;

        OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let existing = ReceiptEntity::find()
            .filter(delivery_receipt::Column::OrderId.eq(order_id))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if let Some(receipt) = existing {
            return Err(ServiceError::Conflict(format!(
                "Receipt {} already issued for order {}",
                receipt.receipt_number, order_id
            )));
        }

        let receipt_number = format!("REM-{:06}", order_id);
        let model = ReceiptActiveModel {
            order_id: Set(order_id),
            receipt_number: Set(receipt_number.clone()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, order_id, "Failed to issue delivery receipt");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id, receipt_number = %model.receipt_number, "Delivery receipt issued");
        self.emit(Event::ReceiptIssued {
            order_id,
            receipt_number,
        })
        .await;

        Ok(ReceiptResponse {
            id: model.id,
            order_id: model.order_id,
            receipt_number: model.receipt_number,
            issued_at: model.issued_at,
        })
    }

    /// Fetches the issued receipt for an order.
    pub async fn get_receipt(&self, order_id: i32) -> Result<ReceiptResponse, ServiceError> {
        let receipt = ReceiptEntity::find()
            .filter(delivery_receipt::Column::OrderId.eq(order_id))
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No receipt issued for order {}", order_id))
            })?;

        Ok(ReceiptResponse {
            id: receipt.id,
            order_id: receipt.order_id,
            receipt_number: receipt.receipt_number,
            issued_at: receipt.issued_at,
        })
    }

    /// Lists the seeded order statuses.
    pub async fn list_statuses(&self) -> Result<Vec<order_status::Model>, ServiceError> {
        OrderStatusEntity::find()
            .order_by_asc(order_status::Column::Id)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    async fn require_product<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: i32,
    ) -> Result<product::Model, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(conn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("Product {} not found", product_id))
            })
    }

    async fn line_totals<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_ids: Vec<i32>,
    ) -> Result<HashMap<i32, Decimal>, ServiceError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let lines = OrderLineEntity::find()
            .filter(order_line::Column::OrderId.is_in(order_ids))
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut totals: HashMap<i32, Decimal> = HashMap::new();
        for line in lines {
            *totals.entry(line.order_id).or_insert(Decimal::ZERO) += line.subtotal;
        }
        Ok(totals)
    }

    async fn product_names<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_ids: Vec<i32>,
    ) -> Result<HashMap<i32, String>, ServiceError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let products = ProductEntity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(products.into_iter().map(|p| (p.id, p.name)).collect())
    }

    async fn price_list_names<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<HashMap<i32, String>, ServiceError> {
        let lists = PriceListEntity::find()
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(lists.into_iter().map(|l| (l.id, l.name)).collect())
    }
}

/// Unit price for a new line: explicit price when valid, otherwise the
/// aligned precomputed subtotal divided by quantity, otherwise the product's
/// base price.
fn resolve_unit_price(
    item_price: Option<Decimal>,
    aligned_subtotal: Option<Decimal>,
    quantity: Decimal,
    base_price: Decimal,
) -> Decimal {
    if let Some(price) = item_price {
        if price >= Decimal::ZERO {
            return price;
        }
    }
    if let Some(subtotal) = aligned_subtotal {
        if let Some(derived) = subtotal.checked_div(quantity) {
            return derived;
        }
    }
    base_price
}
