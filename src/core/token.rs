//! Crypto assets and the fiat currencies they convert into

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A tradable crypto asset.
///
/// `id` is the provider-specific identifier used for price lookups, `symbol`
/// is the display code and is unique within the active token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default, alias = "image")]
    pub icon: String,
}

impl Token {
    pub fn new(id: &str, symbol: &str, name: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            symbol: symbol.to_uppercase(),
            name: name.to_string(),
            icon: icon.to_string(),
        }
    }

    /// Case-insensitive symbol comparison.
    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.symbol.eq_ignore_ascii_case(symbol)
    }
}

/// Built-in tokens as `(symbol, id, name)`.
const DEFAULT_TOKENS: [(&str, &str, &str); 6] = [
    ("BTC", "bitcoin", "Bitcoin"),
    ("ETH", "ethereum", "Ethereum"),
    ("SOL", "solana", "Solana"),
    ("USDC", "usd-coin", "USDC"),
    ("BONK", "bonk", "Bonk"),
    ("JUP", "jupiter-exchange-solana", "Jupiter"),
];

/// Returns the immutable default token set in display order.
pub fn default_tokens() -> Vec<Token> {
    DEFAULT_TOKENS
        .iter()
        .map(|(symbol, id, name)| Token::new(id, symbol, name, ""))
        .collect()
}

/// Looks up the provider id of a default token.
pub fn default_token_id(symbol: &str) -> Option<&'static str> {
    DEFAULT_TOKENS
        .iter()
        .find(|(s, _, _)| s.eq_ignore_ascii_case(symbol))
        .map(|(_, id, _)| *id)
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum FiatCode {
    #[default]
    Usd,
    Cad,
    Eur,
    Php,
}

impl FiatCode {
    pub const ALL: [FiatCode; 4] = [FiatCode::Usd, FiatCode::Cad, FiatCode::Eur, FiatCode::Php];

    pub fn code(&self) -> &'static str {
        match self {
            FiatCode::Usd => "USD",
            FiatCode::Cad => "CAD",
            FiatCode::Eur => "EUR",
            FiatCode::Php => "PHP",
        }
    }

    /// Lower-case code as used in provider requests and responses.
    pub fn query_code(&self) -> String {
        self.code().to_lowercase()
    }
}

impl Display for FiatCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for FiatCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(FiatCode::Usd),
            "CAD" => Ok(FiatCode::Cad),
            "EUR" => Ok(FiatCode::Eur),
            "PHP" => Ok(FiatCode::Php),
            _ => Err(anyhow!("Unsupported fiat currency: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiat_code_parsing() {
        assert_eq!("usd".parse::<FiatCode>().unwrap(), FiatCode::Usd);
        assert_eq!(" EUR ".parse::<FiatCode>().unwrap(), FiatCode::Eur);
        assert_eq!(FiatCode::Php.query_code(), "php");

        let err = "GBP".parse::<FiatCode>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported fiat currency: GBP");
    }

    #[test]
    fn test_default_tokens_have_unique_symbols() {
        let tokens = default_tokens();
        for (i, token) in tokens.iter().enumerate() {
            assert!(
                tokens[i + 1..].iter().all(|t| !t.has_symbol(&token.symbol)),
                "duplicate symbol {}",
                token.symbol
            );
        }
        assert_eq!(default_token_id("jup"), Some("jupiter-exchange-solana"));
        assert_eq!(default_token_id("DOGE"), None);
    }

    #[test]
    fn test_token_deserializes_provider_image_field() {
        let json = r#"{"id":"pepe","symbol":"PEPE","name":"Pepe","image":"https://img/pepe.png"}"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.icon, "https://img/pepe.png");
    }
}
