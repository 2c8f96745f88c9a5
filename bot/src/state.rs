use crate::services::SeaOrmPositionStore;
use engine::context::TradingContext;
use engine::exchange::BinanceClient;
use sea_orm::DatabaseConnection;
use shared::{get_db_connection, Config};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub context: Arc<TradingContext>,
}

impl AppState {
    /// Connect the database and build the trading context
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let db = Arc::new(get_db_connection(&config.database_url).await?);
        tracing::info!("Connected to database successfully");

        let exchange = Arc::new(BinanceClient::new(
            &config.binance_api_url,
            config.trading.retry.timeout(),
        )?);
        let store = Arc::new(SeaOrmPositionStore::new(Arc::clone(&db)));
        let context = Arc::new(TradingContext::new(config.trading, exchange, store)?);

        Ok(AppState {
            db,
            context,
        })
    }
}
