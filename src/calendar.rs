use std::collections::BTreeSet;
use std::io::Read;

use chrono::{Datelike, NaiveDate, Weekday};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("holiday calendar is empty after filtering optional holidays")]
    EmptyCalendar,
    #[error("invalid holiday calendar: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One holiday entry as downloaded from the public-holiday API.
///
/// Only `date`, `global` and `types` matter here; other fields in the source
/// JSON (local name, counties, launch year) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HolidayRecord {
    #[schemars(with = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub types: Vec<String>,
}

impl HolidayRecord {
    /// A holiday counts as a market closure unless the source marks it as an
    /// optional observance that only some regions take.
    pub fn is_observed(&self) -> bool {
        self.global || !self.types.iter().any(|t| t == "Optional")
    }
}

/// Weekend + holiday calendar. Immutable once built.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl TradingCalendar {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        TradingCalendar {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Parse a holiday JSON array and keep only observed market closures.
    ///
    /// An empty result means a misconfigured environment, not a data gap, so
    /// it fails the run instead of silently treating every weekday as open.
    pub fn from_json<R: Read>(reader: R) -> Result<Self, CalendarError> {
        let records: Vec<HolidayRecord> = serde_json::from_reader(reader)?;
        let total = records.len();
        let calendar = TradingCalendar::new(
            records
                .iter()
                .filter(|holiday| holiday.is_observed())
                .map(|holiday| holiday.date),
        );
        if calendar.holidays.is_empty() {
            return Err(CalendarError::EmptyCalendar);
        }
        log::info!(
            "Loaded {} market holidays ({} entries in source)",
            calendar.holidays.len(),
            total
        );
        Ok(calendar)
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        !self.holidays.contains(&date)
    }

    /// Smallest business day on or after `date`, by linear forward scan.
    /// Terminates because weekdays recur every seven days and the holiday set
    /// is finite.
    pub fn next_business_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date;
        while !self.is_business_day(day) {
            day = day.succ_opt().expect("date out of range");
        }
        day
    }

    pub fn holiday_count(&self) -> usize {
        self.holidays.len()
    }
}
