//! SeaORM Entity for memoized per-fetch price statistics

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "offer_summaries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub fetch_id: Uuid,
    pub min_price: f64,
    pub max_price: f64,
    pub avg_price: f64,
    pub median_price: f64,
    pub offer_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::fetches::Entity",
        from = "Column::FetchId",
        to = "super::fetches::Column::Id"
    )]
    Fetches,
}

impl Related<super::fetches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fetches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
