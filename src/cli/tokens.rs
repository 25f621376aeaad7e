use super::ui;
use crate::AppContext;
use crate::core::token::Token;
use anyhow::{Result, bail};
use comfy_table::Cell;
use tracing::info;

#[derive(Debug, Clone)]
pub enum TokensCommand {
    List,
    Search { query: String },
    /// Search the catalog and add the results whose ids are listed.
    Add { query: String, ids: Vec<String> },
    Delete { id: String },
}

fn render_tokens(tokens: &[Token], custom: &[Token]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Id"),
        ui::header_cell("Source"),
    ]);
    for token in tokens {
        let source = if custom.contains(token) {
            "custom"
        } else {
            "default"
        };
        table.add_row(vec![
            Cell::new(&token.symbol),
            Cell::new(&token.name),
            Cell::new(ui::style_text(&token.id, ui::StyleType::Subtle)),
            Cell::new(source),
        ]);
    }
    table.to_string()
}

fn render_results(tokens: &[Token]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Id"),
    ]);
    for token in tokens {
        table.add_row(vec![
            Cell::new(&token.symbol),
            Cell::new(&token.name),
            Cell::new(&token.id),
        ]);
    }
    table.to_string()
}

pub async fn run(ctx: &AppContext, command: TokensCommand) -> Result<()> {
    let registry = &ctx.registry;
    match command {
        TokensCommand::List => {
            let custom = registry.custom_tokens().await;
            println!("{}", ui::style_text("Tokens", ui::StyleType::Title));
            println!("{}", render_tokens(&registry.active_tokens().await, &custom));
        }
        TokensCommand::Search { query } => {
            let spinner = ui::new_spinner(&format!("Searching for {query}..."));
            let results = registry.search(&query).await;
            spinner.finish_and_clear();

            let results = results?;
            if results.is_empty() {
                println!("No new tokens match {query:?}");
            } else {
                println!("{}", render_results(&results));
            }
        }
        TokensCommand::Add { query, ids } => {
            let spinner = ui::new_spinner(&format!("Searching for {query}..."));
            let results = registry.search(&query).await;
            spinner.finish_and_clear();

            let selected: Vec<Token> = results?
                .into_iter()
                .filter(|token| ids.iter().any(|id| id.eq_ignore_ascii_case(&token.id)))
                .collect();
            if selected.is_empty() {
                bail!("None of {ids:?} found in results for {query:?}");
            }

            let added = registry.add(selected).await?;
            info!(added, "Added custom tokens");
            println!(
                "{}",
                ui::style_text(&format!("Added {added} token(s)"), ui::StyleType::Value)
            );
        }
        TokensCommand::Delete { id } => {
            if registry.delete(&id).await? {
                println!(
                    "{}",
                    ui::style_text(&format!("Deleted {id}"), ui::StyleType::Value)
                );
            } else {
                println!("No custom token with id {id}");
            }
        }
    }
    Ok(())
}
