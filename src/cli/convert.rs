use super::ui;
use crate::AppContext;
use crate::core::clipboard::ClipboardSink;
use crate::core::engine::{Amount, ConversionEngine, ConversionState, Field, Phase};
use crate::core::token::FiatCode;
use anyhow::{Context, Result, anyhow, bail};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone)]
pub struct ConvertArgs {
    pub amount: String,
    pub crypto: Option<String>,
    pub fiat: Option<FiatCode>,
    /// Treat `amount` as fiat and derive the crypto amount.
    pub from_fiat: bool,
}

/// Clipboard stand-in for terminals: echoes what would be copied.
pub struct TerminalClipboard;

impl ClipboardSink for TerminalClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        println!("Copied: {}", ui::style_text(text, ui::StyleType::Value));
        Ok(())
    }
}

fn amount_text(amount: &Amount) -> String {
    match amount {
        Amount::Empty => ui::style_text("-", ui::StyleType::Subtle),
        Amount::Value(text) => text.clone(),
        Amount::Marker(marker) => ui::style_text(&marker.to_string(), ui::StyleType::Error),
    }
}

/// One-line summary of both fields.
pub fn render_line(state: &ConversionState) -> String {
    let mut line = format!(
        "{} {} = {} {}",
        amount_text(&state.crypto_amount),
        ui::style_text(&state.crypto_currency, ui::StyleType::Label),
        amount_text(&state.fiat_amount),
        ui::style_text(state.fiat_currency.code(), ui::StyleType::Label),
    );
    if state.loading {
        line.push_str(&ui::style_text(" (converting...)", ui::StyleType::Subtle));
    }
    line
}

fn render_table(state: &ConversionState) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Amount"),
        ui::header_cell(""),
    ]);
    for field in [Field::Crypto, Field::Fiat] {
        let currency = match field {
            Field::Crypto => state.crypto_currency.clone(),
            Field::Fiat => state.fiat_currency.to_string(),
        };
        let role = if field == state.last_edited {
            "entered"
        } else {
            "converted"
        };
        table.add_row(vec![
            comfy_table::Cell::new(currency),
            ui::amount_cell(&amount_text(state.amount(field))),
            comfy_table::Cell::new(ui::style_text(role, ui::StyleType::Subtle)),
        ]);
    }
    table.to_string()
}

pub async fn run(ctx: &AppContext, args: &ConvertArgs) -> Result<()> {
    let crypto = args
        .crypto
        .clone()
        .unwrap_or_else(|| ctx.config.converter.crypto.clone());
    let fiat = args.fiat.unwrap_or(ctx.config.converter.fiat);

    // A single edit has nothing to debounce
    let mut engine = ConversionEngine::new(Arc::clone(&ctx.registry), Arc::clone(&ctx.rates))
        .with_debounce(Duration::ZERO)
        .with_selection(&crypto, fiat);
    let mut rx = engine.subscribe();

    let source = if args.from_fiat {
        Field::Fiat
    } else {
        Field::Crypto
    };
    engine.set_amount(source, &args.amount);
    if engine.snapshot().phase == Phase::Idle {
        bail!("Invalid amount: {:?}", args.amount);
    }

    let spinner = ui::new_spinner("Fetching rate...");
    let state = rx
        .wait_for(|s| s.phase.is_terminal())
        .await
        .context("Conversion stopped before completing")?
        .clone();
    spinner.finish_and_clear();

    println!("{}", render_table(&state));
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractiveCommand {
    Amount(Field, String),
    Coin(String),
    Currency(FiatCode),
    Copy,
    Show,
    Help,
    Quit,
}

impl FromStr for InteractiveCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        match verb.to_lowercase().as_str() {
            "crypto" | "c" => Ok(InteractiveCommand::Amount(Field::Crypto, rest.to_string())),
            "fiat" | "f" => Ok(InteractiveCommand::Amount(Field::Fiat, rest.to_string())),
            "coin" | "token" if !rest.is_empty() => Ok(InteractiveCommand::Coin(rest.to_uppercase())),
            "currency" | "cur" => Ok(InteractiveCommand::Currency(rest.parse()?)),
            "copy" => Ok(InteractiveCommand::Copy),
            "show" => Ok(InteractiveCommand::Show),
            "help" | "?" => Ok(InteractiveCommand::Help),
            "quit" | "exit" | "q" => Ok(InteractiveCommand::Quit),
            _ => Err(anyhow!("Unknown command: {line}")),
        }
    }
}

fn print_help() {
    println!("{}", ui::style_text("Commands", ui::StyleType::Title));
    println!("  crypto <amount>    enter a crypto amount (empty clears)");
    println!("  fiat <amount>      enter a fiat amount (empty clears)");
    println!("  coin <SYMBOL>      select the crypto asset");
    println!("  currency <CODE>    select the fiat currency (USD, CAD, EUR, PHP)");
    println!("  copy               copy the converted amount");
    println!("  show               print the current amounts");
    println!("  quit               leave");
}

/// Line-driven conversion surface reading commands from stdin.
pub async fn run_interactive(ctx: &AppContext) -> Result<()> {
    let converter = &ctx.config.converter;
    let mut engine = ConversionEngine::new(Arc::clone(&ctx.registry), Arc::clone(&ctx.rates))
        .with_debounce(converter.debounce())
        .with_policy(converter.on_currency_change)
        .with_selection(&converter.crypto, converter.fiat);

    let mut rx = engine.subscribe();
    let printer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            if matches!(state.phase, Phase::Settled | Phase::Failed) {
                println!("{}", render_line(&state));
            }
        }
    });

    print_help();
    println!("{}", render_line(&engine.snapshot()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<InteractiveCommand>() {
            Ok(InteractiveCommand::Quit) => break,
            Ok(InteractiveCommand::Amount(field, text)) => engine.set_amount(field, &text),
            Ok(InteractiveCommand::Coin(symbol)) => {
                if !ctx.registry.contains_symbol(&symbol).await {
                    println!(
                        "{}",
                        ui::style_text(
                            &format!("{symbol} is not a known token"),
                            ui::StyleType::Error
                        )
                    );
                }
                engine.set_crypto_currency(&symbol);
                println!("{}", render_line(&engine.snapshot()));
            }
            Ok(InteractiveCommand::Currency(fiat)) => {
                engine.set_fiat_currency(fiat);
                println!("{}", render_line(&engine.snapshot()));
            }
            Ok(InteractiveCommand::Copy) => match engine.copy_derived(&TerminalClipboard) {
                Ok(true) => {}
                Ok(false) => println!("Nothing to copy"),
                Err(e) => println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
            },
            Ok(InteractiveCommand::Show) => println!("{}", render_table(&engine.snapshot())),
            Ok(InteractiveCommand::Help) => print_help(),
            Err(e) => println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
        }
    }

    engine.teardown();
    printer.abort();
    Ok(())
}
