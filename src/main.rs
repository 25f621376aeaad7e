use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use coinverter::cli::convert::ConvertArgs;
use coinverter::cli::tokens::TokensCommand;
use coinverter::core::log::init_logging;
use coinverter::core::token::FiatCode;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for coinverter::AppCommand {
    fn from(cmd: Commands) -> coinverter::AppCommand {
        match cmd {
            Commands::Convert {
                amount,
                crypto,
                fiat,
                from_fiat,
            } => coinverter::AppCommand::Convert(ConvertArgs {
                amount,
                crypto,
                fiat,
                from_fiat,
            }),
            Commands::Interactive => coinverter::AppCommand::Interactive,
            Commands::Feed { symbol, ticks } => coinverter::AppCommand::Feed { symbol, ticks },
            Commands::Tokens { command } => coinverter::AppCommand::Tokens(command.into()),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount once and print both sides
    Convert {
        /// Amount to convert, e.g. 1.5 or 1,000
        amount: String,
        /// Crypto symbol, e.g. BTC
        #[arg(long)]
        crypto: Option<String>,
        /// Fiat currency: USD, CAD, EUR or PHP
        #[arg(long)]
        fiat: Option<FiatCode>,
        /// Treat the amount as fiat and derive the crypto amount
        #[arg(long)]
        from_fiat: bool,
    },
    /// Convert interactively, reading commands from stdin
    Interactive,
    /// Poll and display all fiat prices of a token
    Feed {
        /// Crypto symbol, defaults to the configured one
        symbol: Option<String>,
        /// Stop after this many refreshes
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Manage custom tokens
    Tokens {
        #[command(subcommand)]
        command: TokensSubcommand,
    },
}

#[derive(Subcommand)]
enum TokensSubcommand {
    /// List default and custom tokens
    List,
    /// Search the catalog for tokens not yet added
    Search { query: String },
    /// Add tokens found by a search, selected by id
    Add {
        query: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete a custom token by id
    Delete { id: String },
}

impl From<TokensSubcommand> for TokensCommand {
    fn from(cmd: TokensSubcommand) -> TokensCommand {
        match cmd {
            TokensSubcommand::List => TokensCommand::List,
            TokensSubcommand::Search { query } => TokensCommand::Search { query },
            TokensSubcommand::Add { query, ids } => TokensCommand::Add { query, ids },
            TokensSubcommand::Delete { id } => TokensCommand::Delete { id },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => coinverter::cli::setup::setup(),
        Some(cmd) => coinverter::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
