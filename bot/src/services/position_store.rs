//! MySQL position store over the `positions` entity

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine::data::Frequency;
use engine::error::EngineError;
use engine::portfolio::{Position, PositionId, PositionStatus};
use engine::store::{
    summarize_earnings, PositionFilter, PositionStore, PositionUpdate, StrategyEarnings,
};
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::de::DeserializeOwned;
use shared::entity::positions;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

fn store_err(err: impl Display) -> EngineError {
    EngineError::Store(err.to_string())
}

fn decode<T: DeserializeOwned>(value: serde_json::Value, field: &str) -> engine::Result<T> {
    serde_json::from_value(value)
        .map_err(|e| EngineError::Parse(format!("positions.{}: {}", field, e)))
}

fn encode<T: serde::Serialize>(value: &T) -> engine::Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

/// Row to engine record
pub fn position_from_model(model: positions::Model) -> engine::Result<Position> {
    Ok(Position {
        id: PositionId::from_str(&model.id).map_err(store_err)?,
        frequency: Frequency::from_str(&model.frequency)?,
        status: PositionStatus::from_str(&model.status).map_err(store_err)?,
        pair: model.pair,
        strategy: model.strategy,
        start_time: model.start_time,
        end_time: model.end_time,
        duration_secs: model.duration_secs,
        stop_loss_pct: model.stop_loss_pct,
        snapshots: decode(model.snapshots, "snapshots")?,
        orders: decode(model.orders, "orders")?,
        details: decode(model.details, "details")?,
        stats: model.stats.map(|s| decode(s, "stats")).transpose()?,
        pct_gain: model.pct_gain,
        pct_net_gain: model.pct_net_gain,
    })
}

/// Engine record to a fully set row
pub fn active_model(position: &Position) -> engine::Result<positions::ActiveModel> {
    Ok(positions::ActiveModel {
        id: ActiveValue::Set(position.id.to_string()),
        pair: ActiveValue::Set(position.pair.clone()),
        frequency: ActiveValue::Set(position.frequency.as_str().to_string()),
        strategy: ActiveValue::Set(position.strategy.clone()),
        status: ActiveValue::Set(position.status.as_str().to_string()),
        start_time: ActiveValue::Set(position.start_time),
        end_time: ActiveValue::Set(position.end_time),
        duration_secs: ActiveValue::Set(position.duration_secs),
        stop_loss_pct: ActiveValue::Set(position.stop_loss_pct),
        pct_gain: ActiveValue::Set(position.pct_gain),
        pct_net_gain: ActiveValue::Set(position.pct_net_gain),
        snapshots: ActiveValue::Set(encode(&position.snapshots)?),
        orders: ActiveValue::Set(encode(&position.orders)?),
        details: ActiveValue::Set(encode(&position.details)?),
        stats: ActiveValue::Set(position.stats.as_ref().map(encode).transpose()?),
        created_at: ActiveValue::NotSet,
        updated_at: ActiveValue::Set(Some(Utc::now())),
    })
}

pub struct SeaOrmPositionStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmPositionStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn decode_rows(rows: Vec<positions::Model>) -> Vec<Position> {
        rows.into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                match position_from_model(row) {
                    Ok(position) => Some(position),
                    Err(err) => {
                        warn!(position_id = %id, "Skipping undecodable position: {}", err);
                        None
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl PositionStore for SeaOrmPositionStore {
    async fn insert_one(&self, position: &Position) -> engine::Result<PositionId> {
        let mut model = active_model(position)?;
        model.created_at = ActiveValue::Set(Some(Utc::now()));
        positions::Entity::insert(model)
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(store_err)?;
        Ok(position.id)
    }

    async fn find_one(&self, id: &PositionId) -> engine::Result<Option<Position>> {
        positions::Entity::find_by_id(id.to_string())
            .one(self.db.as_ref())
            .await
            .map_err(store_err)?
            .map(position_from_model)
            .transpose()
    }

    async fn find_many(&self, filter: &PositionFilter) -> engine::Result<Vec<Position>> {
        let mut query = positions::Entity::find();
        if let Some(pair) = &filter.pair {
            query = query.filter(positions::Column::Pair.eq(pair.as_str()));
        }
        if let Some(frequency) = filter.frequency {
            query = query.filter(positions::Column::Frequency.eq(frequency.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(positions::Column::Status.eq(status.as_str()));
        }
        if let Some(strategy) = &filter.strategy {
            query = query.filter(positions::Column::Strategy.eq(strategy.as_str()));
        }

        let rows = query
            .order_by_asc(positions::Column::StartTime)
            .all(self.db.as_ref())
            .await
            .map_err(store_err)?;
        Ok(Self::decode_rows(rows))
    }

    async fn update_one(&self, id: &PositionId, update: PositionUpdate) -> engine::Result<bool> {
        let txn = self.db.begin().await.map_err(store_err)?;

        let Some(row) = positions::Entity::find_by_id(id.to_string())
            .one(&txn)
            .await
            .map_err(store_err)?
        else {
            return Ok(false);
        };
        let mut position = position_from_model(row)?;
        let stored_status = position.status;
        if !update.apply(&mut position) {
            return Ok(false);
        }

        // Guarded on the status read above so a concurrent close cannot be overwritten.
        let result = positions::Entity::update_many()
            .set(active_model(&position)?)
            .filter(positions::Column::Id.eq(id.to_string()))
            .filter(positions::Column::Status.eq(stored_status.as_str()))
            .exec(&txn)
            .await
            .map_err(store_err)?;
        if result.rows_affected != 1 {
            return Ok(false);
        }

        txn.commit().await.map_err(store_err)?;
        Ok(true)
    }

    async fn aggregate_earnings(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> engine::Result<Vec<StrategyEarnings>> {
        let rows = positions::Entity::find()
            .filter(positions::Column::Status.eq(PositionStatus::Closed.as_str()))
            .filter(positions::Column::EndTime.gte(from))
            .filter(positions::Column::EndTime.lt(to))
            .all(self.db.as_ref())
            .await
            .map_err(store_err)?;
        let closed = Self::decode_rows(rows);
        Ok(summarize_earnings(&closed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use engine::data::Candle;
    use engine::indicators::IndicatorParams;
    use engine::portfolio::{
        DetailSection, Order, OrderAction, PositionStats, TradeDetail,
    };
    use engine::prelude::{OrderBookTicker, Snapshot};
    use rust_decimal_macros::dec;

    fn position() -> Position {
        let open_time = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
        let candle = Candle {
            pair: "ETHBTC".to_string(),
            frequency: Frequency::FiveMinutes,
            open: 0.05,
            high: 0.051,
            low: 0.049,
            close: 0.0505,
            volume: 120.0,
            buy_volume: 70.0,
            open_time,
            close_time: open_time + Frequency::FiveMinutes.duration(),
            closed: true,
        };
        let book = OrderBookTicker {
            bid_price: 0.0504,
            bid_qty: 3.0,
            ask_price: 0.0506,
            ask_qty: 2.0,
        };
        let snapshot = Snapshot::capture(
            &[candle.clone()],
            &[],
            &IndicatorParams::for_frequency(Frequency::FiveMinutes),
            Some(book),
            open_time,
        )
        .unwrap();

        Position {
            id: PositionId::new(),
            pair: "ETHBTC".to_string(),
            frequency: Frequency::FiveMinutes,
            strategy: "macd_5m_max".to_string(),
            status: PositionStatus::Open,
            start_time: open_time,
            end_time: None,
            duration_secs: None,
            stop_loss_pct: -0.75,
            stats: PositionStats::from_snapshots([&snapshot]),
            snapshots: vec![snapshot],
            orders: vec![Order {
                action: OrderAction::Buy,
                time: open_time,
                price: dec!(0.0506),
                volume: dec!(0.98814229),
                quote: dec!(0.05),
                fee: dec!(0.000025),
                spread_pct: book.spread_pct(),
                slippage_pct: -0.2,
                book,
                candle,
            }],
            details: vec![TradeDetail {
                strategy: "macd_5m_max".to_string(),
                section: DetailSection::Entry,
                description: vec!["macd.value > 0".to_string()],
            }],
            pct_gain: None,
            pct_net_gain: None,
        }
    }

    fn model_of(position: &Position) -> positions::Model {
        let active = active_model(position).unwrap();
        positions::Model {
            id: active.id.unwrap(),
            pair: active.pair.unwrap(),
            frequency: active.frequency.unwrap(),
            strategy: active.strategy.unwrap(),
            status: active.status.unwrap(),
            start_time: active.start_time.unwrap(),
            end_time: active.end_time.unwrap(),
            duration_secs: active.duration_secs.unwrap(),
            stop_loss_pct: active.stop_loss_pct.unwrap(),
            pct_gain: active.pct_gain.unwrap(),
            pct_net_gain: active.pct_net_gain.unwrap(),
            snapshots: active.snapshots.unwrap(),
            orders: active.orders.unwrap(),
            details: active.details.unwrap(),
            stats: active.stats.unwrap(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_row_keeps_documents() {
        let position = position();
        let model = model_of(&position);
        assert_eq!(model.status, "OPEN");
        assert_eq!(model.frequency, "5m");
        assert!(model.orders.is_array());

        let decoded = position_from_model(model).unwrap();
        assert_eq!(decoded.id, position.id);
        assert_eq!(decoded.orders[0].price, dec!(0.0506));
        assert_eq!(decoded.details, position.details);
        assert_eq!(decoded.snapshots.len(), 1);
    }

    #[test]
    fn test_bad_status_is_rejected() {
        let mut model = model_of(&position());
        model.status = "PENDING".to_string();
        assert!(matches!(position_from_model(model), Err(EngineError::Store(_))));
    }
}
