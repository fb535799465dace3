//! Consolidate command - build the full buy/sell ledger CSV

use std::fs::File;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use rust_decimal::Decimal;

use crate::cmd::{write_csv, EventFileArgs, MarketDataArgs};
use crate::consolidate::DEFAULT_PRICE_TOLERANCE;
use crate::ledger;
use crate::normalize;
use crate::resolver::VestPriceResolver;

#[derive(Args, Debug)]
pub struct ConsolidateCommand {
    #[command(flatten)]
    market: MarketDataArgs,

    #[command(flatten)]
    events: EventFileArgs,

    /// Relative price tolerance for merging same-day sell lots
    #[arg(long, default_value_t = DEFAULT_PRICE_TOLERANCE)]
    tolerance: Decimal,

    /// Write the ledger CSV here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl ConsolidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let (calendar, prices) = self.market.load()?;
        let (vests, sales) = self.events.load()?;
        let resolver = VestPriceResolver::new(&calendar, &prices);

        log::info!(
            "Converting {} vest lots and {} sales to ledger records",
            vests.len(),
            sales.len()
        );
        let buys = normalize::vests_to_buys(&resolver, &vests);
        let sells = normalize::sales_to_sells(&resolver, &sales);
        let ledger = ledger::assemble(buys, sells, self.tolerance);

        match &self.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("creating {}", path.display()))?;
                write_csv(&ledger.records, file)?;
                log::info!(
                    "Wrote {} ledger records to {}",
                    ledger.records.len(),
                    path.display()
                );
            }
            None => write_csv(&ledger.records, io::stdout())?,
        }

        log::info!("{}", ledger.stats);
        Ok(())
    }
}
