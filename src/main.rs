use clap::{Parser, Subcommand};

mod calendar;
mod cmd;
mod consolidate;
mod events;
mod ledger;
mod normalize;
mod prices;
mod resolver;

use crate::cmd::consolidate::ConsolidateCommand;
use crate::cmd::resolve::ResolveCommand;
use crate::cmd::schema::SchemaCommand;
use crate::cmd::validate::ValidateCommand;

/// Reconcile vesting, option exercises and sales into a USD/GBP transaction ledger
#[derive(Parser, Debug)]
#[command(name = "vestledger", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the consolidated buy/sell ledger CSV
    Consolidate(ConsolidateCommand),
    /// Resolve vest dates against the business-day calendar and price data
    Resolve(ResolveCommand),
    /// Report data-quality issues without writing a ledger
    Validate(ValidateCommand),
    /// Print expected input file formats
    Schema(SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    init_logger();
    let cli = Cli::parse();
    match &cli.command {
        Command::Consolidate(cmd) => cmd.exec(),
        Command::Resolve(cmd) => cmd.exec(),
        Command::Validate(cmd) => cmd.exec(),
        Command::Schema(cmd) => cmd.exec(),
    }
}

/// Default to info-level logging so validation warnings are visible without
/// RUST_LOG; the env var still overrides.
fn init_logger() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}
