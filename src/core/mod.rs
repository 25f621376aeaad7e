//! Core conversion logic and abstractions

pub mod clipboard;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod format;
pub mod kv;
pub mod log;
pub mod rate;
pub mod registry;
pub mod token;

// Re-export main types for cleaner imports
pub use engine::{Amount, ConversionEngine, ConversionState, Field, Phase};
pub use error::ConvertError;
pub use feed::{FeedSnapshot, PriceFeed};
pub use rate::{RateProvider, TokenCatalog};
pub use registry::TokenRegistry;
pub use token::{FiatCode, Token};
