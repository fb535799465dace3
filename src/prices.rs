use std::collections::HashMap;
use std::io::Read;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum MarketDataError {
    #[error("stock price series is empty")]
    EmptyStockSeries,
    #[error("exchange rate series is empty")]
    EmptyFxSeries,
    #[error("duplicate {series} entry for {date}")]
    DuplicateDate {
        series: &'static str,
        date: NaiveDate,
    },
    #[error("invalid {series} series: {source}")]
    Parse {
        series: &'static str,
        #[source]
        source: csv::Error,
    },
}

/// Daily closing price row (`date,close`).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StockPriceRow {
    date: NaiveDate,
    close: Decimal,
}

/// Daily USD/GBP rate row (`date,rate`). GBP price = USD price / rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FxRateRow {
    date: NaiveDate,
    rate: Decimal,
}

/// Date-indexed USD closing prices and USD/GBP exchange rates.
///
/// Built once from pre-fetched series and never refetched or mutated. A
/// lookup miss is a legitimate outcome (no trading data for that date), not
/// an error, and no interpolation is performed.
#[derive(Debug, Clone)]
pub struct PriceIndex {
    usd_close: HashMap<NaiveDate, Decimal>,
    usd_gbp: HashMap<NaiveDate, Decimal>,
}

impl PriceIndex {
    pub fn from_series(
        stock: impl IntoIterator<Item = (NaiveDate, Decimal)>,
        fx: impl IntoIterator<Item = (NaiveDate, Decimal)>,
    ) -> Result<Self, MarketDataError> {
        let usd_close = unique_by_date(stock, "stock price")?;
        let usd_gbp = unique_by_date(fx, "exchange rate")?;
        if usd_close.is_empty() {
            return Err(MarketDataError::EmptyStockSeries);
        }
        if usd_gbp.is_empty() {
            return Err(MarketDataError::EmptyFxSeries);
        }
        log_range("stock prices", &usd_close);
        log_range("exchange rates", &usd_gbp);
        Ok(PriceIndex { usd_close, usd_gbp })
    }

    pub fn from_csv<R: Read, S: Read>(stock: R, fx: S) -> Result<Self, MarketDataError> {
        let stock_rows: Vec<StockPriceRow> = read_rows(stock, "stock price")?;
        let fx_rows: Vec<FxRateRow> = read_rows(fx, "exchange rate")?;
        PriceIndex::from_series(
            stock_rows.into_iter().map(|row| (row.date, row.close)),
            fx_rows.into_iter().map(|row| (row.date, row.rate)),
        )
    }

    /// USD closing price for `date`, if the market traded that day.
    pub fn usd_price(&self, date: NaiveDate) -> Option<Decimal> {
        self.usd_close.get(&date).copied()
    }

    /// USD/GBP exchange rate for `date`, if published that day.
    pub fn fx_rate(&self, date: NaiveDate) -> Option<Decimal> {
        self.usd_gbp.get(&date).copied()
    }
}

fn unique_by_date(
    series: impl IntoIterator<Item = (NaiveDate, Decimal)>,
    name: &'static str,
) -> Result<HashMap<NaiveDate, Decimal>, MarketDataError> {
    let mut map = HashMap::new();
    for (date, value) in series {
        if map.insert(date, value).is_some() {
            return Err(MarketDataError::DuplicateDate { series: name, date });
        }
    }
    Ok(map)
}

fn read_rows<T, R>(reader: R, series: &'static str) -> Result<Vec<T>, MarketDataError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = csv::Reader::from_reader(reader);
    rdr.deserialize()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| MarketDataError::Parse { series, source })
}

fn log_range(name: &str, map: &HashMap<NaiveDate, Decimal>) {
    if let (Some(first), Some(last)) = (map.keys().min(), map.keys().max()) {
        log::info!("Loaded {} {} ({} to {})", map.len(), name, first, last);
    }
}
