pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::convert::ConvertArgs;
use crate::cli::tokens::TokensCommand;
use crate::core::config::AppConfig;
use crate::core::{RateProvider, TokenRegistry};
use crate::providers::CoinGeckoProvider;
use crate::store::KeyValueStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Collection holding the custom-token sequence.
pub const TOKENS_COLLECTION: &str = "tokens";

pub enum AppCommand {
    Convert(ConvertArgs),
    Interactive,
    Feed {
        symbol: Option<String>,
        ticks: Option<u64>,
    },
    Tokens(TokensCommand),
}

/// Shared collaborators for every command.
pub struct AppContext {
    pub config: AppConfig,
    pub registry: Arc<TokenRegistry>,
    pub rates: Arc<dyn RateProvider>,
}

impl AppContext {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let coingecko = config.coingecko();
        let provider = Arc::new(CoinGeckoProvider::new(
            &coingecko.base_url,
            config.api_key(),
        )?);

        let store = KeyValueStore::open_or_memory(&config.default_data_path()?);
        let registry = TokenRegistry::load(store.collection(TOKENS_COLLECTION)?, provider.clone())
            .with_lenient_ids(config.converter.lenient_token_ids);

        Ok(Self {
            config,
            registry: Arc::new(registry),
            rates: provider,
        })
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Coinverter starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        base_url = %config.coingecko().base_url,
        crypto = %config.converter.crypto,
        fiat = %config.converter.fiat,
        "Loaded config"
    );

    let ctx = AppContext::from_config(config)?;

    match command {
        AppCommand::Convert(args) => cli::convert::run(&ctx, &args).await,
        AppCommand::Interactive => cli::convert::run_interactive(&ctx).await,
        AppCommand::Feed { symbol, ticks } => cli::feed::run(&ctx, symbol.as_deref(), ticks).await,
        AppCommand::Tokens(cmd) => cli::tokens::run(&ctx, cmd).await,
    }
}
