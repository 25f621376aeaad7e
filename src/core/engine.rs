//! Bidirectional crypto/fiat conversion.
//!
//! The engine owns a [`ConversionState`] published through a `watch`
//! channel. Every edit or currency change bumps a request sequence number
//! inside the state; a debounced recompute only applies its result if the
//! sequence it captured is still the latest one. In-flight requests are
//! never aborted, their results are ignored once superseded.

use crate::core::clipboard::ClipboardSink;
use crate::core::error::ConvertError;
use crate::core::format::{format_crypto, format_fiat, parse_amount};
use crate::core::rate::RateProvider;
use crate::core::registry::TokenRegistry;
use crate::core::token::FiatCode;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_CRYPTO: &str = "BTC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Crypto,
    Fiat,
}

impl Field {
    pub fn other(self) -> Field {
        match self {
            Field::Crypto => Field::Fiat,
            Field::Fiat => Field::Crypto,
        }
    }
}

/// User-visible replacement for a number that could not be derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMarker {
    InvalidToken,
    PriceNotAvailable,
    FetchFailed,
}

impl Display for ErrorMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ErrorMarker::InvalidToken => "Invalid token",
                ErrorMarker::PriceNotAvailable => "Price not available",
                ErrorMarker::FetchFailed => "Error",
            }
        )
    }
}

impl From<&ConvertError> for ErrorMarker {
    fn from(err: &ConvertError) -> Self {
        match err {
            ConvertError::TokenNotFound(_) => ErrorMarker::InvalidToken,
            ConvertError::RateUnavailable(_) => ErrorMarker::PriceNotAvailable,
            _ => ErrorMarker::FetchFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Amount {
    #[default]
    Empty,
    /// Raw text typed by the user, or formatted text derived by the engine.
    Value(String),
    Marker(ErrorMarker),
}

impl Amount {
    pub fn is_empty(&self) -> bool {
        matches!(self, Amount::Empty)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Amount::Value(text) => Some(text),
            _ => None,
        }
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Amount::Empty => Ok(()),
            Amount::Value(text) => write!(f, "{text}"),
            Amount::Marker(marker) => write!(f, "{marker}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing to derive.
    Idle,
    /// Waiting for the debounce quiet period.
    PendingFetch,
    /// Rate request in flight.
    Fetching,
    Settled,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Idle | Phase::Settled | Phase::Failed)
    }
}

/// What to do with existing amounts when a currency selection changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyChangePolicy {
    /// Clear both amounts.
    #[default]
    Clear,
    /// Keep the last edited amount and derive the other one again.
    Rederive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionState {
    pub crypto_amount: Amount,
    pub fiat_amount: Amount,
    pub crypto_currency: String,
    pub fiat_currency: FiatCode,
    pub last_edited: Field,
    pub phase: Phase,
    pub loading: bool,
    sequence: u64,
}

impl ConversionState {
    pub(crate) fn new(crypto_currency: &str, fiat_currency: FiatCode) -> Self {
        Self {
            crypto_amount: Amount::Empty,
            fiat_amount: Amount::Empty,
            crypto_currency: crypto_currency.to_uppercase(),
            fiat_currency,
            last_edited: Field::Crypto,
            phase: Phase::Idle,
            loading: false,
            sequence: 0,
        }
    }

    pub fn amount(&self, field: Field) -> &Amount {
        match field {
            Field::Crypto => &self.crypto_amount,
            Field::Fiat => &self.fiat_amount,
        }
    }

    fn amount_mut(&mut self, field: Field) -> &mut Amount {
        match field {
            Field::Crypto => &mut self.crypto_amount,
            Field::Fiat => &mut self.fiat_amount,
        }
    }

    /// Sequence number of the latest issued request.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Invalidates every outstanding request.
    fn supersede(&mut self) -> u64 {
        self.sequence += 1;
        self.loading = false;
        self.sequence
    }

    fn clear(&mut self) {
        self.crypto_amount = Amount::Empty;
        self.fiat_amount = Amount::Empty;
        self.phase = Phase::Idle;
    }
}

/// Everything a debounced recompute needs, captured when it was scheduled.
#[derive(Debug, Clone)]
struct Ticket {
    sequence: u64,
    source: Field,
    amount: f64,
    crypto_currency: String,
    fiat_currency: FiatCode,
}

/// Derives the other field from `amount` typed into `source`.
pub fn convert(amount: f64, rate: f64, source: Field) -> Option<f64> {
    if !rate.is_finite() || rate <= 0.0 {
        return None;
    }
    let derived = match source {
        Field::Crypto => amount * rate,
        Field::Fiat => amount / rate,
    };
    // Overflow would otherwise be formatted as "inf"
    Some(derived).filter(|v| v.is_finite())
}

pub struct ConversionEngine {
    state: Arc<watch::Sender<ConversionState>>,
    registry: Arc<TokenRegistry>,
    rates: Arc<dyn RateProvider>,
    debounce: Duration,
    policy: CurrencyChangePolicy,
    timer: Option<JoinHandle<()>>,
}

impl ConversionEngine {
    pub fn new(registry: Arc<TokenRegistry>, rates: Arc<dyn RateProvider>) -> Self {
        let (state, _) = watch::channel(ConversionState::new(DEFAULT_CRYPTO, FiatCode::default()));
        Self {
            state: Arc::new(state),
            registry,
            rates,
            debounce: DEFAULT_DEBOUNCE,
            policy: CurrencyChangePolicy::default(),
            timer: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_policy(mut self, policy: CurrencyChangePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Initial currency pair, replacing the `BTC`/`USD` default.
    pub fn with_selection(self, crypto_currency: &str, fiat_currency: FiatCode) -> Self {
        self.state.send_modify(|s| {
            s.crypto_currency = crypto_currency.to_uppercase();
            s.fiat_currency = fiat_currency;
        });
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ConversionState {
        self.state.borrow().clone()
    }

    pub fn set_crypto_amount(&mut self, text: &str) {
        self.set_amount(Field::Crypto, text);
    }

    pub fn set_fiat_amount(&mut self, text: &str) {
        self.set_amount(Field::Fiat, text);
    }

    /// Records `text` as typed into `field` and schedules the other field.
    pub fn set_amount(&mut self, field: Field, text: &str) {
        self.state.send_modify(|s| {
            s.last_edited = field;
            *s.amount_mut(field) = if text.trim().is_empty() {
                Amount::Empty
            } else {
                Amount::Value(text.to_string())
            };
        });
        self.schedule(field);
    }

    pub fn set_crypto_currency(&mut self, symbol: &str) {
        let symbol = symbol.trim().to_uppercase();
        self.change_currency(|s| s.crypto_currency = symbol);
    }

    pub fn set_fiat_currency(&mut self, fiat: FiatCode) {
        self.change_currency(|s| s.fiat_currency = fiat);
    }

    fn change_currency(&mut self, apply: impl FnOnce(&mut ConversionState)) {
        self.cancel_timer();
        match self.policy {
            CurrencyChangePolicy::Clear => self.state.send_modify(|s| {
                apply(s);
                s.supersede();
                s.clear();
            }),
            CurrencyChangePolicy::Rederive => {
                let mut source = Field::Crypto;
                self.state.send_modify(|s| {
                    apply(s);
                    source = s.last_edited;
                });
                self.schedule(source);
            }
        }
    }

    /// Invalidates outstanding work and, if `source` holds a number, starts
    /// a debounced recompute of the other field.
    fn schedule(&mut self, source: Field) {
        self.cancel_timer();

        let mut ticket = None;
        self.state.send_modify(|s| {
            let sequence = s.supersede();
            let target = source.other();
            let parsed = s.amount(source).text().and_then(parse_amount);
            match parsed {
                Some(amount) => {
                    s.phase = Phase::PendingFetch;
                    ticket = Some(Ticket {
                        sequence,
                        source,
                        amount,
                        crypto_currency: s.crypto_currency.clone(),
                        fiat_currency: s.fiat_currency,
                    });
                }
                None => {
                    // Empty or unparseable source: nothing to derive
                    *s.amount_mut(target) = Amount::Empty;
                    s.phase = Phase::Idle;
                }
            }
        });

        if let Some(ticket) = ticket {
            debug!(sequence = ticket.sequence, source = ?ticket.source, "Scheduling recompute");
            self.timer = Some(tokio::spawn(recompute(
                Arc::clone(&self.state),
                Arc::clone(&self.registry),
                Arc::clone(&self.rates),
                self.debounce,
                ticket,
            )));
        }
    }

    /// Text of the derived (non-authoritative) field, if it holds a number.
    pub fn derived_text(&self) -> Option<String> {
        let state = self.state.borrow();
        state
            .amount(state.last_edited.other())
            .text()
            .map(str::to_string)
    }

    /// Copies the derived field to `sink`. Returns false when there was
    /// nothing to copy.
    pub fn copy_derived(&self, sink: &dyn ClipboardSink) -> Result<bool> {
        match self.derived_text() {
            Some(text) => {
                sink.write_text(&text)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Cancels pending timers and marks in-flight results as discardable.
    pub fn teardown(&mut self) {
        self.cancel_timer();
        self.state.send_modify(|s| {
            s.supersede();
            s.phase = Phase::Idle;
        });
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for ConversionEngine {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// Applies `update` only if `sequence` is still the latest request.
fn apply_if_current(
    state: &watch::Sender<ConversionState>,
    sequence: u64,
    update: impl FnOnce(&mut ConversionState),
) -> bool {
    state.send_if_modified(|s| {
        if s.sequence != sequence {
            return false;
        }
        update(s);
        true
    })
}

async fn recompute(
    state: Arc<watch::Sender<ConversionState>>,
    registry: Arc<TokenRegistry>,
    rates: Arc<dyn RateProvider>,
    debounce: Duration,
    ticket: Ticket,
) {
    tokio::time::sleep(debounce).await;
    let target = ticket.source.other();

    let asset_id = match registry.resolve_id(&ticket.crypto_currency).await {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "Cannot resolve asset id");
            apply_if_current(&state, ticket.sequence, |s| {
                *s.amount_mut(target) = Amount::Marker(ErrorMarker::from(&e));
                s.phase = Phase::Failed;
            });
            return;
        }
    };

    let issued = apply_if_current(&state, ticket.sequence, |s| {
        s.phase = Phase::Fetching;
        s.loading = true;
    });
    if !issued {
        return;
    }

    let outcome = rates.get_rate(&asset_id, ticket.fiat_currency).await;

    let applied = apply_if_current(&state, ticket.sequence, |s| {
        s.loading = false;
        let derived = outcome.as_ref().map_err(ErrorMarker::from).and_then(|rate| {
            convert(ticket.amount, *rate, ticket.source).ok_or(ErrorMarker::PriceNotAvailable)
        });
        match derived {
            Ok(value) => {
                let text = match target {
                    Field::Fiat => format_fiat(value),
                    Field::Crypto => format_crypto(value),
                };
                *s.amount_mut(target) = Amount::Value(text);
                s.phase = Phase::Settled;
            }
            Err(marker) => {
                *s.amount_mut(target) = Amount::Marker(marker);
                s.phase = Phase::Failed;
            }
        }
    });

    if !applied {
        debug!(sequence = ticket.sequence, "Discarding stale rate result");
    } else if let Err(e) = &outcome {
        warn!(error = %e, asset = %asset_id, fiat = %ticket.fiat_currency, "Rate lookup failed");
    }
}
