use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::calendar::TradingCalendar;
use crate::ledger::PRICE_DP;
use crate::prices::PriceIndex;

/// Outcome of resolving a nominal vest date against market data.
///
/// The actual date is always present. The price fields degrade in order: no
/// USD close means no rate and no GBP price is reported; a USD close without
/// a published rate leaves only the USD price; the GBP price exists only when
/// both inputs do. Callers branch on which fields are present to decide
/// whether a record is priced, partially priced or unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub actual_date: NaiveDate,
    pub usd_price: Option<Decimal>,
    pub fx_rate: Option<Decimal>,
    pub gbp_price: Option<Decimal>,
}

/// Resolves nominal event dates to trading dates and prices them.
///
/// Shares the calendar and price index read-only; resolution has no side
/// effects beyond warning logs for data gaps.
pub struct VestPriceResolver<'a> {
    calendar: &'a TradingCalendar,
    prices: &'a PriceIndex,
}

impl<'a> VestPriceResolver<'a> {
    pub fn new(calendar: &'a TradingCalendar, prices: &'a PriceIndex) -> Self {
        VestPriceResolver { calendar, prices }
    }

    /// Resolve `nominal` to the next business day and look up prices there.
    ///
    /// Missing data is a warnable condition, never a failure.
    pub fn resolve(&self, nominal: NaiveDate) -> ResolvedPrice {
        let actual_date = self.calendar.next_business_day(nominal);

        let usd_price = match self.prices.usd_price(actual_date) {
            Some(price) => price,
            None => {
                log::warn!("No stock price found for {}", actual_date);
                return ResolvedPrice {
                    actual_date,
                    usd_price: None,
                    fx_rate: None,
                    gbp_price: None,
                };
            }
        };

        let fx_rate = match self.prices.fx_rate(actual_date) {
            Some(rate) => rate,
            None => {
                log::warn!("No exchange rate found for {}", actual_date);
                return ResolvedPrice {
                    actual_date,
                    usd_price: Some(usd_price),
                    fx_rate: None,
                    gbp_price: None,
                };
            }
        };

        let gbp_price = (usd_price / fx_rate).round_dp(PRICE_DP);
        ResolvedPrice {
            actual_date,
            usd_price: Some(usd_price),
            fx_rate: Some(fx_rate),
            gbp_price: Some(gbp_price),
        }
    }
}
