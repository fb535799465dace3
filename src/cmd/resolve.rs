//! Resolve command - inspect vest-price resolution for given dates

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::cmd::MarketDataArgs;
use crate::resolver::VestPriceResolver;

#[derive(Args, Debug)]
pub struct ResolveCommand {
    #[command(flatten)]
    market: MarketDataArgs,

    /// Nominal vest dates to resolve (YYYY-MM-DD), repeatable
    #[arg(short = 'd', long = "date", value_name = "DATE", required = true)]
    dates: Vec<NaiveDate>,
}

#[derive(Tabled)]
struct ResolutionRow {
    #[tabled(rename = "Vest Date")]
    vest_date: String,
    #[tabled(rename = "Actual Date")]
    actual_date: String,
    #[tabled(rename = "USD Price")]
    usd_price: String,
    #[tabled(rename = "GBP/USD")]
    fx_rate: String,
    #[tabled(rename = "GBP Price")]
    gbp_price: String,
}

impl ResolveCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let (calendar, prices) = self.market.load()?;
        let resolver = VestPriceResolver::new(&calendar, &prices);

        let rows: Vec<ResolutionRow> = self
            .dates
            .iter()
            .map(|&date| {
                let resolved = resolver.resolve(date);
                ResolutionRow {
                    vest_date: date.to_string(),
                    actual_date: resolved.actual_date.to_string(),
                    usd_price: display_opt(resolved.usd_price),
                    fx_rate: display_opt(resolved.fx_rate),
                    gbp_price: display_opt(resolved.gbp_price),
                }
            })
            .collect();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        Ok(())
    }
}

fn display_opt(value: Option<Decimal>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}
