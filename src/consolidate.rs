use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::ledger::{RecordType, Transaction, PRICE_DP};

/// Maximum relative distance from a bucket's pivot price for two same-day
/// sell lots to be merged (1%).
pub const DEFAULT_PRICE_TOLERANCE: Decimal = dec!(0.01);

#[derive(Debug, Clone, Copy, Default)]
struct ConsolidationStats {
    merged_records: usize,
    merged_groups: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    date: NaiveDate,
    record_type: RecordType,
    order_type: String,
    security_type: String,
}

impl GroupKey {
    fn of(tx: &Transaction) -> Self {
        GroupKey {
            date: tx.date,
            record_type: tx.record_type,
            order_type: tx.order_type.clone(),
            security_type: tx.security_type.clone(),
        }
    }
}

/// Merge sell lots that represent effectively the same trade split across
/// multiple lots.
///
/// Records are grouped by (date, record type, order type, security type).
/// Buy records pass through untouched: vesting lots are never merged, even
/// when priced identically. Within each sell group, the first remaining
/// record's price is the pivot; every remaining record within `tolerance` of
/// it joins the bucket. Which record pivots each bucket is fixed by input
/// order, so the procedure is reproducible.
pub fn consolidate(records: Vec<Transaction>, tolerance: Decimal) -> Vec<Transaction> {
    let mut groups: BTreeMap<GroupKey, Vec<Transaction>> = BTreeMap::new();
    for tx in records {
        groups.entry(GroupKey::of(&tx)).or_default().push(tx);
    }

    let mut stats = ConsolidationStats::default();
    let mut out = Vec::new();
    for (key, group) in groups {
        if key.record_type == RecordType::Buy {
            out.extend(group);
            continue;
        }
        consolidate_group(group, tolerance, &mut out, &mut stats);
    }
    log::info!(
        "Price consolidation: {} records merged across {} groups",
        stats.merged_records,
        stats.merged_groups
    );
    out
}

fn consolidate_group(
    mut pool: Vec<Transaction>,
    tolerance: Decimal,
    out: &mut Vec<Transaction>,
    stats: &mut ConsolidationStats,
) {
    while !pool.is_empty() {
        let pivot = pool[0].price_per_share_usd;
        let lo = pivot * (Decimal::ONE - tolerance);
        let hi = pivot * (Decimal::ONE + tolerance);
        let matched: Vec<usize> = pool
            .iter()
            .enumerate()
            .filter(|(_, tx)| tx.price_per_share_usd >= lo && tx.price_per_share_usd <= hi)
            .map(|(i, _)| i)
            .collect();

        if matched.len() > 1 {
            stats.merged_records += matched.len();
            stats.merged_groups += 1;
            let mut bucket = Vec::with_capacity(matched.len());
            for &i in matched.iter().rev() {
                bucket.push(pool.remove(i));
            }
            bucket.reverse();
            out.push(merge_bucket(&bucket));
        } else {
            out.push(pool.remove(0));
        }
    }
}

fn merge_bucket(bucket: &[Transaction]) -> Transaction {
    let first = &bucket[0];
    let quantity: i64 = bucket.iter().map(|tx| tx.quantity).sum();
    let price_usd = weighted_average(
        bucket
            .iter()
            .map(|tx| (tx.price_per_share_usd, tx.quantity)),
    );

    // GBP average only over lots that have one; absent if none do.
    let gbp_members: Vec<(Decimal, i64)> = bucket
        .iter()
        .filter_map(|tx| tx.price_per_share_gbp.map(|price| (price, tx.quantity)))
        .collect();
    let (price_gbp, exchange_rate) = if gbp_members.is_empty() {
        (None, None)
    } else {
        (
            Some(weighted_average(gbp_members.into_iter())),
            most_frequent_rate(bucket.iter().filter_map(|tx| tx.exchange_rate)),
        )
    };

    Transaction {
        record_type: first.record_type,
        date: first.date,
        quantity,
        price_per_share_usd: price_usd,
        price_per_share_gbp: price_gbp,
        exchange_rate,
        order_type: first.order_type.clone(),
        security_type: first.security_type.clone(),
        grant_number: merge_grant_numbers(bucket.iter().map(|tx| tx.grant_number.as_str())),
    }
}

/// Quantity-weighted average price, rounded for the ledger. A zero total
/// quantity would divide by zero; it is defined as zero and flagged.
fn weighted_average(members: impl Iterator<Item = (Decimal, i64)>) -> Decimal {
    let mut total_value = Decimal::ZERO;
    let mut total_quantity = Decimal::ZERO;
    for (price, quantity) in members {
        let quantity = Decimal::from(quantity);
        total_value += price * quantity;
        total_quantity += quantity;
    }
    if total_quantity.is_zero() {
        log::warn!("Weighted average over zero total quantity, using 0");
        return Decimal::ZERO;
    }
    (total_value / total_quantity).round_dp(PRICE_DP)
}

/// Most frequent rate among the lots; ties keep the earliest occurrence.
fn most_frequent_rate(rates: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    let mut counts: Vec<(Decimal, usize)> = Vec::new();
    for rate in rates {
        match counts.iter_mut().find(|(seen, _)| *seen == rate) {
            Some((_, count)) => *count += 1,
            None => counts.push((rate, 1)),
        }
    }
    let mut best: Option<(Decimal, usize)> = None;
    for (rate, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((rate, count));
        }
    }
    best.map(|(rate, _)| rate)
}

/// Union of the hyphen-separated grant tokens across lots, deduplicated and
/// sorted so the merged identifier is stable.
fn merge_grant_numbers<'a>(grants: impl Iterator<Item = &'a str>) -> String {
    let mut tokens: Vec<&str> = grants
        .flat_map(|grant| grant.split('-'))
        .filter(|token| !token.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens.join("-")
}
