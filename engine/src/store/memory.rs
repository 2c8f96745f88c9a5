//! In-memory position store

use crate::error::EngineError;
use crate::portfolio::{Position, PositionId, PositionStatus};
use crate::store::{summarize_earnings, PositionFilter, PositionStore, PositionUpdate, StrategyEarnings};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Position store held in process memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryPositionStore {
    positions: RwLock<HashMap<PositionId, Position>>,
}

impl InMemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PositionStore for InMemoryPositionStore {
    async fn insert_one(&self, position: &Position) -> Result<PositionId> {
        let mut positions = self.positions.write().await;
        if positions.contains_key(&position.id) {
            return Err(EngineError::Store(format!("Duplicate position id {}", position.id)));
        }
        positions.insert(position.id, position.clone());
        Ok(position.id)
    }

    async fn find_one(&self, id: &PositionId) -> Result<Option<Position>> {
        Ok(self.positions.read().await.get(id).cloned())
    }

    async fn find_many(&self, filter: &PositionFilter) -> Result<Vec<Position>> {
        let positions = self.positions.read().await;
        let mut found: Vec<Position> = positions
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        found.sort_by_key(|p| p.start_time);
        Ok(found)
    }

    async fn update_one(&self, id: &PositionId, update: PositionUpdate) -> Result<bool> {
        let mut positions = self.positions.write().await;
        match positions.get_mut(id) {
            Some(position) => Ok(update.apply(position)),
            None => Ok(false),
        }
    }

    async fn aggregate_earnings(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StrategyEarnings>> {
        let positions = self.positions.read().await;
        let closed = positions.values().filter(|p| {
            p.status == PositionStatus::Closed
                && p.end_time.map_or(false, |t| t >= from && t < to)
        });
        Ok(summarize_earnings(closed))
    }
}
