use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::consolidate;
use crate::normalize::Normalized;

/// Decimal places carried by derived per-share prices in the ledger.
pub const PRICE_DP: u32 = 6;

/// Side of the ledger a record sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    Buy,
    Sell,
}

/// Canonical ledger record. Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub record_type: RecordType,
    pub date: NaiveDate,
    pub quantity: i64,
    pub price_per_share_usd: Decimal,
    pub price_per_share_gbp: Option<Decimal>,
    pub exchange_rate: Option<Decimal>,
    pub order_type: String,
    pub security_type: String,
    pub grant_number: String,
}

/// Counters for data-quality conditions observed while building the ledger.
///
/// Each stage returns its own deltas; the assembler merges them. Nothing here
/// is process-global.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub unmatched_vests: usize,
    pub missing_fmv: usize,
    pub negative_quantities: usize,
    pub zero_or_negative_prices: usize,
    pub calculated_prices: usize,
}

impl ValidationStats {
    pub fn absorb(&mut self, other: ValidationStats) {
        self.unmatched_vests += other.unmatched_vests;
        self.missing_fmv += other.missing_fmv;
        self.negative_quantities += other.negative_quantities;
        self.zero_or_negative_prices += other.zero_or_negative_prices;
        self.calculated_prices += other.calculated_prices;
    }

    /// True when any counter other than the informational `calculated_prices`
    /// is non-zero.
    pub fn has_issues(&self) -> bool {
        self.unmatched_vests > 0
            || self.missing_fmv > 0
            || self.negative_quantities > 0
            || self.zero_or_negative_prices > 0
    }

    /// Count quantity and price anomalies for a record that is still emitted.
    pub fn record_emitted(&mut self, tx: &Transaction) {
        if tx.quantity < 0 {
            self.negative_quantities += 1;
        }
        if tx.price_per_share_usd <= Decimal::ZERO {
            self.zero_or_negative_prices += 1;
        }
    }
}

impl fmt::Display for ValidationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation report:")?;
        writeln!(f, "- Unmatched vests: {}", self.unmatched_vests)?;
        writeln!(f, "- Records with missing FMV: {}", self.missing_fmv)?;
        writeln!(
            f,
            "- Records with negative quantities: {}",
            self.negative_quantities
        )?;
        writeln!(
            f,
            "- Records with zero/negative prices: {}",
            self.zero_or_negative_prices
        )?;
        write!(f, "- Calculated vest prices: {}", self.calculated_prices)
    }
}

/// Final ordered ledger plus the merged validation counters.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub records: Vec<Transaction>,
    pub stats: ValidationStats,
}

/// Concatenate the normalized outputs, merge near-duplicate sell lots and
/// order the ledger by date.
///
/// The sort is stable, so same-day records keep the consolidator's output
/// order (buys before sells, groups in key order).
pub fn assemble(buys: Normalized, sells: Normalized, tolerance: Decimal) -> Ledger {
    let mut stats = buys.stats;
    stats.absorb(sells.stats);

    let mut records = buys.records;
    records.extend(sells.records);
    let mut records = consolidate::consolidate(records, tolerance);
    records.sort_by_key(|tx| tx.date);

    Ledger { records, stats }
}
