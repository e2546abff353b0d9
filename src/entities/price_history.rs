//! `SeaORM` Entity for price_history table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "price_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Closing day (UTC). Unique together with `asset`.
    pub date: Date,
    /// Asset identifier, e.g. "btc"
    pub asset: String,
    #[sea_orm(column_type = "Double")]
    pub usd: f64,
    #[sea_orm(column_type = "Double")]
    pub inr: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
