//! Default and user-added tokens, persisted as a single ordered sequence.

use crate::core::error::ConvertError;
use crate::core::kv::KeyValueCollection;
use crate::core::rate::{Result, TokenCatalog};
use crate::core::token::{Token, default_token_id, default_tokens};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Key holding the serialized custom-token sequence.
pub const CUSTOM_TOKENS_KEY: &str = "custom_tokens";

pub struct TokenRegistry {
    defaults: Vec<Token>,
    custom: RwLock<Vec<Token>>,
    store: Arc<dyn KeyValueCollection>,
    catalog: Arc<dyn TokenCatalog>,
    lenient_ids: bool,
}

impl TokenRegistry {
    /// Loads custom tokens from `store`.
    ///
    /// A missing or unreadable entry yields an empty custom set.
    pub fn load(store: Arc<dyn KeyValueCollection>, catalog: Arc<dyn TokenCatalog>) -> Self {
        let defaults = default_tokens();
        let custom = match read_custom_tokens(store.as_ref()) {
            Ok(tokens) => dedup_against(&defaults, tokens),
            Err(e) => {
                warn!(error = %e, "Ignoring stored custom tokens");
                Vec::new()
            }
        };
        debug!(count = custom.len(), "Loaded custom tokens");

        Self {
            defaults,
            custom: RwLock::new(custom),
            store,
            catalog,
            lenient_ids: false,
        }
    }

    /// Treat unknown symbols as lower-cased provider ids instead of failing.
    pub fn with_lenient_ids(mut self, lenient: bool) -> Self {
        self.lenient_ids = lenient;
        self
    }

    pub fn defaults(&self) -> &[Token] {
        &self.defaults
    }

    pub async fn custom_tokens(&self) -> Vec<Token> {
        self.custom.read().await.clone()
    }

    /// Defaults followed by custom tokens, in display order.
    pub async fn active_tokens(&self) -> Vec<Token> {
        let custom = self.custom.read().await;
        self.defaults.iter().chain(custom.iter()).cloned().collect()
    }

    pub async fn contains_symbol(&self, symbol: &str) -> bool {
        let custom = self.custom.read().await;
        self.defaults
            .iter()
            .chain(custom.iter())
            .any(|t| t.has_symbol(symbol))
    }

    /// Resolves a display symbol to a provider asset id.
    ///
    /// Custom tokens win over defaults.
    pub async fn resolve_id(&self, symbol: &str) -> Result<String> {
        if let Some(token) = self
            .custom
            .read()
            .await
            .iter()
            .find(|t| t.has_symbol(symbol))
        {
            return Ok(token.id.clone());
        }
        if let Some(id) = default_token_id(symbol) {
            return Ok(id.to_string());
        }
        if self.lenient_ids && !symbol.trim().is_empty() {
            debug!(symbol, "Using lower-cased symbol as asset id");
            return Ok(symbol.trim().to_lowercase());
        }
        Err(ConvertError::TokenNotFound(symbol.to_string()))
    }

    /// Searches the remote catalog, leaving out tokens already in the active set.
    #[instrument(name = "TokenSearch", skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<Token>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.catalog.search(query.trim()).await?;
        let custom = self.custom.read().await;
        let results: Vec<Token> = candidates
            .into_iter()
            .filter(|c| {
                !self
                    .defaults
                    .iter()
                    .chain(custom.iter())
                    .any(|t| t.has_symbol(&c.symbol))
            })
            .collect();
        debug!(count = results.len(), "Search results after exclusion");
        Ok(results)
    }

    /// Appends tokens whose symbol is not yet active and persists the result.
    ///
    /// Returns the number of tokens actually added.
    pub async fn add(&self, tokens: Vec<Token>) -> Result<usize> {
        let mut custom = self.custom.write().await;
        let mut updated = custom.clone();
        let mut added = 0;
        for token in tokens {
            let taken = self
                .defaults
                .iter()
                .chain(updated.iter())
                .any(|t| t.has_symbol(&token.symbol));
            if taken {
                debug!(symbol = %token.symbol, "Skipping token with existing symbol");
                continue;
            }
            updated.push(token);
            added += 1;
        }

        if added > 0 {
            write_custom_tokens(self.store.as_ref(), &updated)?;
            *custom = updated;
        }
        Ok(added)
    }

    /// Removes a custom token by id. Returns whether anything was removed.
    pub async fn delete(&self, token_id: &str) -> Result<bool> {
        let mut custom = self.custom.write().await;
        let updated: Vec<Token> = custom
            .iter()
            .filter(|t| t.id != token_id)
            .cloned()
            .collect();
        if updated.len() == custom.len() {
            return Ok(false);
        }
        write_custom_tokens(self.store.as_ref(), &updated)?;
        *custom = updated;
        Ok(true)
    }
}

fn read_custom_tokens(store: &dyn KeyValueCollection) -> Result<Vec<Token>> {
    let raw = store
        .get(CUSTOM_TOKENS_KEY)
        .map_err(|e| ConvertError::PersistenceCorrupt(e.to_string()))?;
    match raw {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| ConvertError::PersistenceCorrupt(e.to_string())),
        None => Ok(Vec::new()),
    }
}

/// Writes the sequence, dropping the key once no custom tokens remain.
fn write_custom_tokens(store: &dyn KeyValueCollection, tokens: &[Token]) -> Result<()> {
    if tokens.is_empty() {
        return store
            .remove(CUSTOM_TOKENS_KEY)
            .map_err(|e| ConvertError::Storage(e.to_string()));
    }
    let json = serde_json::to_string(tokens).map_err(|e| ConvertError::Storage(e.to_string()))?;
    store
        .put(CUSTOM_TOKENS_KEY, &json)
        .map_err(|e| ConvertError::Storage(e.to_string()))
}

/// Drops stored tokens whose symbol collides with a default or an earlier entry.
fn dedup_against(defaults: &[Token], stored: Vec<Token>) -> Vec<Token> {
    let mut kept: Vec<Token> = Vec::with_capacity(stored.len());
    for token in stored {
        let taken = defaults
            .iter()
            .chain(kept.iter())
            .any(|t| t.has_symbol(&token.symbol));
        if !taken {
            kept.push(token);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCollection;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockCatalog {
        results: Vec<Token>,
        call_count: AtomicUsize,
    }

    impl MockCatalog {
        fn new(results: Vec<Token>) -> Arc<Self> {
            Arc::new(Self {
                results,
                call_count: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TokenCatalog for MockCatalog {
        async fn search(&self, _query: &str) -> Result<Vec<Token>> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(self.results.clone())
        }
    }

    fn pepe() -> Token {
        Token::new("pepe", "PEPE", "Pepe", "https://img/pepe.png")
    }

    fn wif() -> Token {
        Token::new("dogwifcoin", "WIF", "dogwifhat", "")
    }

    fn registry_with(catalog: Arc<MockCatalog>) -> (TokenRegistry, Arc<MemoryCollection>) {
        let store = Arc::new(MemoryCollection::new());
        let registry = TokenRegistry::load(store.clone(), catalog);
        (registry, store)
    }

    #[tokio::test]
    async fn test_resolve_id_prefers_custom_then_defaults() {
        let (registry, _) = registry_with(MockCatalog::new(vec![]));
        assert_eq!(registry.resolve_id("BTC").await.unwrap(), "bitcoin");
        assert_eq!(registry.resolve_id("usdc").await.unwrap(), "usd-coin");

        registry.add(vec![pepe()]).await.unwrap();
        assert_eq!(registry.resolve_id("PEPE").await.unwrap(), "pepe");

        let err = registry.resolve_id("DOGE").await.unwrap_err();
        assert_eq!(err, ConvertError::TokenNotFound("DOGE".to_string()));
    }

    #[tokio::test]
    async fn test_lenient_resolution_falls_back_to_symbol() {
        let store = Arc::new(MemoryCollection::new());
        let registry =
            TokenRegistry::load(store, MockCatalog::new(vec![])).with_lenient_ids(true);
        assert_eq!(registry.resolve_id("DOGE").await.unwrap(), "doge");
        assert!(registry.resolve_id("  ").await.is_err());
    }

    #[tokio::test]
    async fn test_search_excludes_active_symbols() {
        let catalog = MockCatalog::new(vec![
            Token::new("bitcoin", "btc", "Bitcoin", ""),
            Token::new("wrapped-bitcoin", "WBTC", "Wrapped Bitcoin", ""),
            pepe(),
        ]);
        let (registry, _) = registry_with(catalog);
        registry.add(vec![pepe()]).await.unwrap();

        let results = registry.search("bitcoin").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol, "WBTC");
    }

    #[tokio::test]
    async fn test_blank_search_skips_catalog() {
        let catalog = MockCatalog::new(vec![pepe()]);
        let (registry, _) = registry_with(catalog.clone());

        assert!(registry.search("").await.unwrap().is_empty());
        assert!(registry.search("   ").await.unwrap().is_empty());
        assert_eq!(catalog.call_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_deduplicates_and_persists_in_order() {
        let (registry, store) = registry_with(MockCatalog::new(vec![]));

        let added = registry
            .add(vec![
                wif(),
                Token::new("fake-btc", "BTC", "Fake", ""),
                pepe(),
                pepe(),
            ])
            .await
            .unwrap();
        assert_eq!(added, 2);

        let symbols: Vec<String> = registry
            .custom_tokens()
            .await
            .into_iter()
            .map(|t| t.symbol)
            .collect();
        assert_eq!(symbols, vec!["WIF", "PEPE"]);

        let stored = store.get(CUSTOM_TOKENS_KEY).unwrap().unwrap();
        let persisted: Vec<Token> = serde_json::from_str(&stored).unwrap();
        assert_eq!(persisted, vec![wif(), pepe()]);

        // Adding nothing new is a no-op
        assert_eq!(registry.add(vec![wif()]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_by_id() {
        let (registry, store) = registry_with(MockCatalog::new(vec![]));
        registry.add(vec![wif(), pepe()]).await.unwrap();

        assert!(registry.delete("pepe").await.unwrap());
        assert!(!registry.delete("pepe").await.unwrap());
        assert!(!registry.contains_symbol("PEPE").await);
        assert!(registry.resolve_id("PEPE").await.is_err());

        let stored: Vec<Token> =
            serde_json::from_str(&store.get(CUSTOM_TOKENS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, vec![wif()]);

        assert!(registry.delete("dogwifcoin").await.unwrap());
        assert!(registry.custom_tokens().await.is_empty());
        assert!(store.get(CUSTOM_TOKENS_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_round_trip_through_store() {
        let store = Arc::new(MemoryCollection::new());
        {
            let registry = TokenRegistry::load(store.clone(), MockCatalog::new(vec![]));
            registry.add(vec![pepe(), wif()]).await.unwrap();
        }

        let reloaded = TokenRegistry::load(store, MockCatalog::new(vec![]));
        assert_eq!(reloaded.custom_tokens().await, vec![pepe(), wif()]);
        assert_eq!(reloaded.active_tokens().await.len(), 8);
    }

    #[tokio::test]
    async fn test_corrupt_store_degrades_to_empty() {
        let store = Arc::new(MemoryCollection::new());
        store.put(CUSTOM_TOKENS_KEY, "{not json").unwrap();

        let registry = TokenRegistry::load(store, MockCatalog::new(vec![]));
        assert!(registry.custom_tokens().await.is_empty());
        assert_eq!(registry.resolve_id("ETH").await.unwrap(), "ethereum");
    }

    #[tokio::test]
    async fn test_load_drops_colliding_symbols() {
        let store = Arc::new(MemoryCollection::new());
        let stored = vec![
            Token::new("evil-eth", "ETH", "Not Ether", ""),
            pepe(),
            Token::new("pepe-2", "PEPE", "Pepe Two", ""),
        ];
        store
            .put(CUSTOM_TOKENS_KEY, &serde_json::to_string(&stored).unwrap())
            .unwrap();

        let registry = TokenRegistry::load(store, MockCatalog::new(vec![]));
        assert_eq!(registry.custom_tokens().await, vec![pepe()]);
    }
}
