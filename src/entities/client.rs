use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub full_name: String,

    pub phone: String,
    pub address: String,
    pub business_name: Option<String>,
    pub neighborhood: Option<String>,
    pub client_type_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client_type::Entity",
        from = "Column::ClientTypeId",
        to = "super::client_type::Column::Id"
    )]
    ClientType,
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::client_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClientType.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
        }

        Ok(active_model)
    }
}
