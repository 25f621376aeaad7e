use super::ui;
use crate::AppContext;
use crate::core::feed::{FeedSnapshot, PriceFeed};
use crate::core::format::format_price;
use crate::core::token::FiatCode;
use anyhow::Result;
use comfy_table::Cell;
use std::sync::Arc;
use tracing::debug;

fn render_snapshot(snapshot: &FeedSnapshot) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Price")]);

    for fiat in FiatCode::ALL {
        let price_cell = match snapshot.prices.get(&fiat) {
            Some(price) => ui::amount_cell(&format_price(*price)),
            None => ui::na_cell(snapshot.error.is_some()),
        };
        table.add_row(vec![Cell::new(fiat.code()), price_cell]);
    }

    let mut output = format!(
        "{}\n{}",
        ui::style_text(&format!("{} prices", snapshot.symbol), ui::StyleType::Title),
        table
    );
    if let Some(message) = snapshot.error_message() {
        output.push('\n');
        output.push_str(&ui::style_text(message, ui::StyleType::Error));
    }
    if let Some(updated_at) = snapshot.updated_at {
        output.push('\n');
        output.push_str(&ui::style_text(
            &format!("Updated {}", updated_at.format("%Y-%m-%d %H:%M:%S UTC")),
            ui::StyleType::Subtle,
        ));
    }
    output
}

/// Prints a price table after every polling cycle until `ticks` cycles
/// have completed or the user interrupts.
pub async fn run(ctx: &AppContext, symbol: Option<&str>, ticks: Option<u64>) -> Result<()> {
    let symbol = symbol.unwrap_or(&ctx.config.converter.crypto);
    let mut feed = PriceFeed::new(Arc::clone(&ctx.registry), Arc::clone(&ctx.rates))
        .with_interval(ctx.config.feed.interval());
    let mut rx = feed.subscribe();
    feed.start(symbol);

    let mut printed = 0;
    loop {
        let seen = printed;
        tokio::select! {
            changed = rx.wait_for(move |s| s.cycles > seen && !s.loading) => {
                let snapshot = changed?.clone();
                printed = snapshot.cycles;
                ui::print_separator();
                println!("{}", render_snapshot(&snapshot));
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted, stopping feed");
                break;
            }
        }
        if ticks.is_some_and(|limit| printed >= limit) {
            break;
        }
    }

    feed.stop();
    Ok(())
}
