//! `SeaORM` Entity, @generated manually

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// A simulated position. Snapshots, orders, details and stats are stored as
/// JSON documents in the shape the engine serializes them.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "positions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub pair: String,
    pub frequency: String,
    pub strategy: String,
    pub status: String, // "OPEN", "CLOSED"
    pub start_time: DateTimeUtc,
    pub end_time: Option<DateTimeUtc>,
    pub duration_secs: Option<i64>,
    #[sea_orm(column_type = "Double")]
    pub stop_loss_pct: f64,
    #[sea_orm(column_type = "Decimal(Some((20, 8)))", nullable)]
    pub pct_gain: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((20, 8)))", nullable)]
    pub pct_net_gain: Option<Decimal>,
    #[sea_orm(column_type = "Json")]
    pub snapshots: Json,
    #[sea_orm(column_type = "Json")]
    pub orders: Json,
    #[sea_orm(column_type = "Json")]
    pub details: Json,
    #[sea_orm(column_type = "Json", nullable)]
    pub stats: Option<Json>,
    pub created_at: Option<DateTimeUtc>,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
