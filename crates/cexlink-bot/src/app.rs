//! Connector wiring.
//!
//! Coordinates all components:
//! - REST gateway, contract catalog and order lifecycle
//! - Shared price cache and strategy registry
//! - Streaming session running on its own task

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use cexlink_core::{Channel, Contract};
use cexlink_feed::{MarketDispatcher, PriceCache, SharedStrategy, StrategyHandle, StrategyNotifier};
use cexlink_rest::{ContractCatalog, OrderManager, RestGateway, SignatureEngine};
use cexlink_ws::StreamingSession;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Exchange connector.
pub struct Connector {
    config: AppConfig,
    gateway: Arc<RestGateway>,
    catalog: Arc<ContractCatalog>,
    orders: Arc<OrderManager>,
    prices: Arc<PriceCache>,
    strategies: Arc<StrategyNotifier>,
    session: Arc<StreamingSession>,
    session_task: Option<JoinHandle<()>>,
}

impl Connector {
    /// Build every component. Nothing touches the network until `start()`.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let signer = SignatureEngine::new(config.api_secret()?)?;
        let gateway = Arc::new(RestGateway::new(
            config.rest_base_url(),
            config.api_key.clone(),
            Some(signer),
            config.request_timeout(),
        )?);

        let prices = Arc::new(PriceCache::new());
        let strategies = Arc::new(StrategyNotifier::new());
        let catalog = Arc::new(ContractCatalog::new(gateway.clone(), config.variant));
        let orders = Arc::new(OrderManager::new(gateway.clone(), config.variant, prices.clone()));
        let session = Arc::new(StreamingSession::new(
            config.session_config(),
            MarketDispatcher::new(prices.clone(), strategies.clone()),
        ));

        Ok(Self {
            config,
            gateway,
            catalog,
            orders,
            prices,
            strategies,
            session,
            session_task: None,
        })
    }

    /// Load the catalog and balances, subscribe the configured streams and
    /// start the streaming session.
    pub async fn start(&mut self) -> AppResult<()> {
        if self.session_task.is_some() {
            return Err(AppError::Config("Connector already started".to_string()));
        }

        info!(
            variant = %self.config.variant,
            testnet = self.config.testnet,
            rest_url = %self.gateway.base_url(),
            "Starting connector"
        );

        let contracts = self.catalog.refresh().await;
        if contracts.is_empty() {
            warn!("Starting without a contract catalog");
        }

        match self.orders.get_balances().await {
            Some(balances) => {
                let held: Vec<&String> = balances
                    .iter()
                    .filter(|(_, b)| !b.total.is_zero())
                    .map(|(asset, _)| asset)
                    .collect();
                info!(assets = balances.len(), ?held, "Balances loaded");
            }
            None => error!("Balance query failed at startup"),
        }

        let stream = &self.config.stream;
        if !stream.book_symbols.is_empty() {
            self.session
                .subscribe(stream.book_symbols.iter().cloned(), Channel::BookTicker)?;
        }
        if !stream.trade_symbols.is_empty() {
            self.session
                .subscribe(stream.trade_symbols.iter().cloned(), Channel::AggTrade)?;
        }

        self.session_task = Some(self.session.spawn());
        info!(url = %self.session.config().url, "Streaming session started");
        Ok(())
    }

    /// Start, then run until Ctrl-C.
    pub async fn run(&mut self) -> AppResult<()> {
        self.start().await?;
        tokio::signal::ctrl_c().await?;
        info!("Ctrl-C received");
        self.shutdown().await;
        Ok(())
    }

    /// Stop the streaming session and wait for its task.
    pub async fn shutdown(&mut self) {
        self.session.shutdown();
        if let Some(task) = self.session_task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Streaming session task failed");
            }
        }
        info!("Connector stopped");
    }

    pub fn register_strategy(&self, strategy: SharedStrategy) -> StrategyHandle {
        let handle = self.strategies.register(strategy);
        info!(%handle, "Strategy registered");
        handle
    }

    pub fn remove_strategy(&self, handle: StrategyHandle) -> Option<SharedStrategy> {
        self.strategies.remove(handle)
    }

    pub fn contract(&self, symbol: &str) -> Option<Contract> {
        self.catalog.get(symbol)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<ContractCatalog> {
        &self.catalog
    }

    pub fn orders(&self) -> &Arc<OrderManager> {
        &self.orders
    }

    pub fn prices(&self) -> &Arc<PriceCache> {
        &self.prices
    }

    pub fn strategies(&self) -> &Arc<StrategyNotifier> {
        &self.strategies
    }

    pub fn session(&self) -> &Arc<StreamingSession> {
        &self.session
    }
}
