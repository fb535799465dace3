//! Validate command - surface data quality issues without writing a ledger

use clap::Args;

use crate::cmd::{EventFileArgs, MarketDataArgs};
use crate::normalize;
use crate::resolver::VestPriceResolver;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    market: MarketDataArgs,

    #[command(flatten)]
    events: EventFileArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let (calendar, prices) = self.market.load()?;
        let (vests, sales) = self.events.load()?;
        let resolver = VestPriceResolver::new(&calendar, &prices);

        let buys = normalize::vests_to_buys(&resolver, &vests);
        let sells = normalize::sales_to_sells(&resolver, &sales);
        let mut stats = buys.stats;
        stats.absorb(sells.stats);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("{}", stats);
        }

        // Exit with code 1 if issues found
        if stats.has_issues() {
            std::process::exit(1);
        }
        Ok(())
    }
}
