//! Periodic read-only price display for the selected asset.

use crate::core::error::ConvertError;
use crate::core::rate::RateProvider;
use crate::core::registry::TokenRegistry;
use crate::core::token::FiatCode;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub const DEFAULT_FEED_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedSnapshot {
    pub symbol: String,
    pub prices: BTreeMap<FiatCode, f64>,
    pub error: Option<ConvertError>,
    pub loading: bool,
    pub updated_at: Option<DateTime<Utc>>,
    /// Completed polling cycles for the current symbol.
    pub cycles: u64,
    generation: u64,
}

impl FeedSnapshot {
    /// Short message shown in place of prices.
    pub fn error_message(&self) -> Option<&'static str> {
        self.error.as_ref().map(|e| match e {
            ConvertError::TokenNotFound(_) => "Token not found",
            ConvertError::RateUnavailable(_) => "Price data not available",
            _ => "Failed to fetch prices",
        })
    }
}

/// Polls all supported fiat prices of one asset on a fixed interval.
pub struct PriceFeed {
    state: Arc<watch::Sender<FeedSnapshot>>,
    registry: Arc<TokenRegistry>,
    rates: Arc<dyn RateProvider>,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl PriceFeed {
    pub fn new(registry: Arc<TokenRegistry>, rates: Arc<dyn RateProvider>) -> Self {
        let (state, _) = watch::channel(FeedSnapshot::default());
        Self {
            state: Arc::new(state),
            registry,
            rates,
            interval: DEFAULT_FEED_INTERVAL,
            task: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.state.borrow().clone()
    }

    /// Starts polling `symbol`, replacing any running poll loop.
    pub fn start(&mut self, symbol: &str) {
        self.stop();
        let symbol = symbol.trim().to_uppercase();

        let mut generation = 0;
        self.state.send_modify(|s| {
            s.generation += 1;
            generation = s.generation;
            s.symbol = symbol.clone();
            s.prices.clear();
            s.error = None;
            s.loading = true;
            s.updated_at = None;
            s.cycles = 0;
        });

        debug!(%symbol, generation, "Starting price feed");
        self.task = Some(tokio::spawn(poll(
            Arc::clone(&self.state),
            Arc::clone(&self.registry),
            Arc::clone(&self.rates),
            self.interval,
            generation,
            symbol,
        )));
    }

    /// Restarts polling for the current symbol, e.g. after the custom token
    /// list changed.
    pub fn refresh(&mut self) {
        let symbol = self.state.borrow().symbol.clone();
        if !symbol.is_empty() {
            self.start(&symbol);
        }
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state.send_modify(|s| {
            s.generation += 1;
            s.loading = false;
        });
    }
}

impl Drop for PriceFeed {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn poll(
    state: Arc<watch::Sender<FeedSnapshot>>,
    registry: Arc<TokenRegistry>,
    rates: Arc<dyn RateProvider>,
    interval: Duration,
    generation: u64,
    symbol: String,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let current = state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            s.loading = true;
            true
        });
        if !current {
            return;
        }

        let outcome = match registry.resolve_id(&symbol).await {
            Ok(asset_id) => rates.get_rates(&asset_id, &FiatCode::ALL).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            warn!(error = %e, %symbol, "Price feed cycle failed");
        }

        state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            s.loading = false;
            s.cycles += 1;
            match &outcome {
                Ok(prices) => {
                    s.prices = prices.clone();
                    s.error = None;
                    s.updated_at = Some(Utc::now());
                }
                Err(e) => {
                    s.prices.clear();
                    s.error = Some(e.clone());
                }
            }
            true
        });
    }
}
