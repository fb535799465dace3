pub mod consolidate;
pub mod resolve;
pub mod schema;
pub mod validate;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use crate::calendar::TradingCalendar;
use crate::events::{self, SaleEvent, VestEvent};
use crate::prices::PriceIndex;

/// Pre-fetched market data shared by every command.
#[derive(Args, Debug)]
pub struct MarketDataArgs {
    /// CSV file with daily stock closing prices (date,close)
    #[arg(long, value_name = "FILE")]
    stock_prices: PathBuf,

    /// CSV file with daily USD/GBP exchange rates (date,rate)
    #[arg(long, value_name = "FILE")]
    fx_rates: PathBuf,

    /// JSON file with market holidays
    #[arg(long, value_name = "FILE")]
    holidays: PathBuf,
}

impl MarketDataArgs {
    pub fn load(&self) -> anyhow::Result<(TradingCalendar, PriceIndex)> {
        let calendar = TradingCalendar::from_json(open(&self.holidays)?)
            .with_context(|| format!("loading holidays from {}", self.holidays.display()))?;
        let prices = PriceIndex::from_csv(open(&self.stock_prices)?, open(&self.fx_rates)?)
            .context("loading price series")?;
        Ok((calendar, prices))
    }
}

/// Event input files shared by the ledger-building commands.
#[derive(Args, Debug)]
pub struct EventFileArgs {
    /// CSV file with sale records (gains/losses export)
    #[arg(long, value_name = "FILE")]
    sales: PathBuf,

    /// CSV file with vesting events (benefits export)
    #[arg(long, value_name = "FILE")]
    vests: PathBuf,

    /// Optional CSV file with option exercises
    #[arg(long, value_name = "FILE")]
    exercises: Option<PathBuf>,
}

impl EventFileArgs {
    /// Load all event inputs, attaching known FMVs from the sales file to
    /// the vesting events.
    pub fn load(&self) -> anyhow::Result<(Vec<VestEvent>, Vec<SaleEvent>)> {
        let (sales, fmv_map) = events::read_sales(open(&self.sales)?)
            .with_context(|| format!("reading sales from {}", self.sales.display()))?;
        let vests = events::read_vests(open(&self.vests)?)
            .with_context(|| format!("reading vests from {}", self.vests.display()))?;
        let mut vests = events::attach_known_fmv(vests, &fmv_map);
        if let Some(path) = &self.exercises {
            let exercises = events::read_exercises(open(path)?)
                .with_context(|| format!("reading exercises from {}", path.display()))?;
            vests.extend(exercises);
        }
        Ok((vests, sales))
    }
}

pub fn write_csv<I, R, W>(records: I, writer: W) -> anyhow::Result<()>
where
    I: IntoIterator<Item = R>,
    R: serde::Serialize,
    W: std::io::Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn open(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(file))
}
