//! SeaORM Entity for the offer-to-fetch link table
//!
//! The auto-increment link id preserves the order offers were attached to a
//! fetch, which the unsorted "median" statistic depends on.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "offer_fetch")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub offer_id: Uuid,
    pub fetch_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::offers::Entity",
        from = "Column::OfferId",
        to = "super::offers::Column::Id"
    )]
    Offers,
    #[sea_orm(
        belongs_to = "super::fetches::Entity",
        from = "Column::FetchId",
        to = "super::fetches::Column::Id"
    )]
    Fetches,
}

impl Related<super::offers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offers.def()
    }
}

impl Related<super::fetches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fetches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
