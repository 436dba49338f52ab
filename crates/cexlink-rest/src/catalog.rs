//! Contract catalog.

use crate::gateway::RestGateway;
use cexlink_core::{Contract, ExchangeVariant};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Instrument list keyed by symbol, sorted lexicographically.
pub type Contracts = BTreeMap<String, Contract>;

/// Builds and holds the tradable instrument list.
pub struct ContractCatalog {
    gateway: Arc<RestGateway>,
    variant: ExchangeVariant,
    contracts: RwLock<Contracts>,
}

impl ContractCatalog {
    pub fn new(gateway: Arc<RestGateway>, variant: ExchangeVariant) -> Self {
        Self {
            gateway,
            variant,
            contracts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Fetch the instrument list and rebuild all contracts.
    ///
    /// Returns an empty map if the exchange call fails or yields nothing;
    /// the previously held catalog is kept in that case.
    pub async fn refresh(&self) -> Contracts {
        let endpoint = self.variant.endpoints().instruments;
        let Some(body) = self.gateway.execute_opt(endpoint, Vec::new(), false).await else {
            error!(variant = %self.variant, "Instrument query failed, catalog unavailable");
            return BTreeMap::new();
        };

        let contracts: Contracts = self
            .variant
            .parse_contracts(&body)
            .into_iter()
            .map(|c| (c.symbol().to_string(), c))
            .collect();

        if contracts.is_empty() {
            warn!(variant = %self.variant, "Instrument query returned no usable contracts");
            return contracts;
        }

        info!(variant = %self.variant, count = contracts.len(), "Contract catalog refreshed");
        *self.contracts.write() = contracts.clone();
        contracts
    }

    pub fn get(&self, symbol: &str) -> Option<Contract> {
        self.contracts.read().get(symbol).cloned()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.contracts.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.contracts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.read().is_empty()
    }
}
