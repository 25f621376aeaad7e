use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

use crate::core::error::ConvertError;
use crate::core::rate::{RateProvider, Result, TokenCatalog};
use crate::core::token::{FiatCode, Token};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Query parameter carrying the static API credential.
const API_KEY_PARAM: &str = "x_cg_demo_api_key";

/// CoinGecko-backed price lookup and catalog search.
pub struct CoinGeckoProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("coinverter/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|e| ConvertError::Network(format!("Invalid URL for {path}: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            if let Some(key) = &self.api_key {
                query.append_pair(API_KEY_PARAM, key);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("Requesting {}", url.path());
        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConvertError::Network(format!("HTTP error: {status}")));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| ConvertError::Network(format!("Failed to parse JSON response: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<SearchCoin>,
}

#[derive(Debug, Deserialize)]
struct SearchCoin {
    id: String,
    symbol: String,
    name: String,
    #[serde(default)]
    thumb: Option<String>,
}

/// `{ "bitcoin": { "usd": 50000.0, "eur": 46000.0 } }`
type SimplePriceResponse = HashMap<String, HashMap<String, f64>>;

#[async_trait]
impl RateProvider for CoinGeckoProvider {
    #[instrument(name = "CoinGeckoPrice", skip(self, fiats), fields(asset = %asset_id))]
    async fn get_rates(
        &self,
        asset_id: &str,
        fiats: &[FiatCode],
    ) -> Result<BTreeMap<FiatCode, f64>> {
        let vs_currencies = fiats
            .iter()
            .map(FiatCode::query_code)
            .collect::<Vec<_>>()
            .join(",");
        let url = self.endpoint(
            "simple/price",
            &[("ids", asset_id), ("vs_currencies", &vs_currencies)],
        )?;

        let mut data: SimplePriceResponse = self.get_json(url).await?;
        let quotes = data
            .remove(asset_id)
            .ok_or_else(|| ConvertError::RateUnavailable(asset_id.to_string()))?;

        let rates = fiats
            .iter()
            .filter_map(|fiat| quotes.get(&fiat.query_code()).map(|price| (*fiat, *price)))
            .collect::<BTreeMap<_, _>>();
        debug!(count = rates.len(), "Received prices");
        Ok(rates)
    }
}

#[async_trait]
impl TokenCatalog for CoinGeckoProvider {
    #[instrument(name = "CoinGeckoSearch", skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<Token>> {
        let url = self.endpoint("search", &[("query", query)])?;
        let data: SearchResponse = self.get_json(url).await?;

        Ok(data
            .coins
            .into_iter()
            .map(|coin| {
                Token::new(
                    &coin.id,
                    &coin.symbol,
                    &coin.name,
                    coin.thumb.as_deref().unwrap_or_default(),
                )
            })
            .collect())
    }
}
