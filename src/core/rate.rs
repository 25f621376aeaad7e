//! Remote pricing and catalog abstractions

use crate::core::error::ConvertError;
use crate::core::token::{FiatCode, Token};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Looks up the current price of a crypto asset in fiat currencies.
///
/// Implementations have no state beyond the outstanding request and never
/// retry on their own.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Prices for every requested fiat code the provider knows about.
    ///
    /// Fails with `RateUnavailable` if the asset is absent from the response.
    /// Fiat codes the provider omitted are absent from the returned map.
    async fn get_rates(&self, asset_id: &str, fiats: &[FiatCode])
    -> Result<BTreeMap<FiatCode, f64>>;

    async fn get_rate(&self, asset_id: &str, fiat: FiatCode) -> Result<f64> {
        let rates = self.get_rates(asset_id, &[fiat]).await?;
        rates
            .get(&fiat)
            .copied()
            .ok_or_else(|| ConvertError::RateUnavailable(format!("{asset_id} in {fiat}")))
    }
}

/// Free-text search over the remote asset catalog.
#[async_trait]
pub trait TokenCatalog: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Token>>;
}
