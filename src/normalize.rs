use crate::events::{SaleEvent, VestEvent};
use crate::ledger::{RecordType, Transaction, ValidationStats, PRICE_DP};
use crate::resolver::VestPriceResolver;

/// Output of a normalization stage: canonical records plus the counters
/// observed while producing them.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<Transaction>,
    pub stats: ValidationStats,
}

/// Convert vesting and exercise lots into Buy records.
///
/// Lots with a known FMV keep it as the USD price and only pick up the FX
/// rate for the resolved date. Lots without one take USD price, rate and GBP
/// price from the resolver; when no USD price exists for the resolved date
/// the lot is excluded and counted, not failed. Emitted records always carry
/// the resolved business date, never the nominal one.
pub fn vests_to_buys(resolver: &VestPriceResolver, events: &[VestEvent]) -> Normalized {
    let mut out = Normalized::default();
    for event in events {
        let resolved = resolver.resolve(event.date);
        let (price_usd, price_gbp, rate) = match event.fmv {
            Some(fmv) => {
                let gbp = resolved.fx_rate.map(|rate| (fmv / rate).round_dp(PRICE_DP));
                if resolved.fx_rate.is_none() {
                    log::warn!(
                        "No exchange rate for vest on {} (grant {}), GBP price left blank",
                        resolved.actual_date,
                        event.grant_id
                    );
                }
                (fmv, gbp, resolved.fx_rate)
            }
            None => match resolved.usd_price {
                Some(usd) => {
                    out.stats.calculated_prices += 1;
                    (usd, resolved.gbp_price, resolved.fx_rate)
                }
                None => {
                    log::warn!(
                        "Could not calculate price for vest on {} (grant {})",
                        event.date,
                        event.grant_id
                    );
                    out.stats.missing_fmv += 1;
                    out.stats.unmatched_vests += 1;
                    continue;
                }
            },
        };

        if resolved.actual_date != event.date {
            log::info!(
                "Grant {}: vest date {} adjusted to {}",
                event.grant_id,
                event.date,
                resolved.actual_date
            );
        }

        let tx = Transaction {
            record_type: RecordType::Buy,
            date: resolved.actual_date,
            quantity: event.quantity,
            price_per_share_usd: price_usd,
            price_per_share_gbp: price_gbp,
            exchange_rate: rate,
            order_type: event.kind.order_type().to_string(),
            security_type: event.kind.security_type().to_string(),
            grant_number: event.grant_id.clone(),
        };
        out.stats.record_emitted(&tx);
        out.records.push(tx);
    }
    out
}

/// Convert sales into Sell records.
///
/// Sales already sit on a real trading day, so the date is kept as given;
/// resolution is only used to find the FX rate. The USD price is the sale's
/// own proceeds per share, not a market lookup.
pub fn sales_to_sells(resolver: &VestPriceResolver, sales: &[SaleEvent]) -> Normalized {
    let mut out = Normalized::default();
    for sale in sales {
        let resolved = resolver.resolve(sale.date);
        let price_gbp = resolved
            .fx_rate
            .map(|rate| (sale.proceeds_per_share / rate).round_dp(PRICE_DP));
        if resolved.fx_rate.is_none() {
            log::warn!("Could not find exchange rate for sale on {}", sale.date);
        }

        let tx = Transaction {
            record_type: RecordType::Sell,
            date: sale.date,
            quantity: sale.quantity,
            price_per_share_usd: sale.proceeds_per_share,
            price_per_share_gbp: price_gbp,
            exchange_rate: resolved.fx_rate,
            order_type: sale.order_type.clone(),
            security_type: sale.security_type.clone(),
            grant_number: sale.grant_id.clone(),
        };
        out.stats.record_emitted(&tx);
        out.records.push(tx);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::TradingCalendar;
    use crate::events::VestKind;
    use crate::prices::PriceIndex;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> TradingCalendar {
        TradingCalendar::new([date(2024, 1, 1), date(2024, 1, 15)])
    }

    fn prices() -> PriceIndex {
        PriceIndex::from_series(
            [
                (date(2024, 1, 2), dec!(92.50)),
                (date(2024, 1, 16), dec!(95.00)),
                (date(2024, 1, 17), dec!(96.25)),
            ],
            [
                (date(2024, 1, 2), dec!(1.27)),
                (date(2024, 1, 16), dec!(1.25)),
                (date(2024, 1, 17), dec!(1.26)),
            ],
        )
        .unwrap()
    }

    fn release(grant: &str, nominal: NaiveDate, quantity: i64, fmv: Option<Decimal>) -> VestEvent {
        VestEvent {
            grant_id: grant.to_string(),
            date: nominal,
            quantity,
            fmv,
            kind: VestKind::Release,
        }
    }

    fn sale(grant: &str, day: NaiveDate, quantity: i64, proceeds: Decimal) -> SaleEvent {
        SaleEvent {
            grant_id: grant.to_string(),
            date: day,
            quantity,
            proceeds_per_share: proceeds,
            order_type: "Market".to_string(),
            security_type: "Restricted Stock Unit".to_string(),
        }
    }

    #[test]
    fn vest_without_fmv_is_priced_from_market_data() {
        let calendar = calendar();
        let prices = prices();
        let resolver = VestPriceResolver::new(&calendar, &prices);

        // Saturday nominal date lands on Tuesday the 16th past the holiday.
        let out = vests_to_buys(&resolver, &[release("R1234", date(2024, 1, 13), 100, None)]);
        assert_eq!(out.records.len(), 1);
        let tx = &out.records[0];
        assert_eq!(tx.record_type, RecordType::Buy);
        assert_eq!(tx.date, date(2024, 1, 16));
        assert_eq!(tx.price_per_share_usd, dec!(95.00));
        assert_eq!(tx.price_per_share_gbp, Some(dec!(76)));
        assert_eq!(tx.exchange_rate, Some(dec!(1.25)));
        assert_eq!(tx.order_type, "Vest");
        assert_eq!(tx.security_type, "Restricted Stock Unit");
        assert_eq!(out.stats.calculated_prices, 1);
        assert_eq!(out.stats.missing_fmv, 0);
    }

    #[test]
    fn vest_with_known_fmv_keeps_it_and_converts() {
        let calendar = calendar();
        let prices = prices();
        let resolver = VestPriceResolver::new(&calendar, &prices);

        let out = vests_to_buys(
            &resolver,
            &[release("R1234", date(2024, 1, 16), 100, Some(dec!(94.50)))],
        );
        let tx = &out.records[0];
        assert_eq!(tx.price_per_share_usd, dec!(94.50));
        // 94.50 / 1.25 = 75.6
        assert_eq!(tx.price_per_share_gbp, Some(dec!(75.6)));
        assert_eq!(tx.exchange_rate, Some(dec!(1.25)));
        // Supplied, not calculated.
        assert_eq!(out.stats.calculated_prices, 0);
    }

    #[test]
    fn vest_without_fmv_or_price_is_excluded_and_counted() {
        let calendar = calendar();
        let prices = PriceIndex::from_series(
            [(date(2024, 1, 2), dec!(92.50))],
            [(date(2024, 1, 2), dec!(1.27))],
        )
        .unwrap();
        let resolver = VestPriceResolver::new(&calendar, &prices);

        let out = vests_to_buys(&resolver, &[release("R1234", date(2024, 1, 13), 100, None)]);
        assert!(out.records.is_empty());
        assert_eq!(out.stats.missing_fmv, 1);
        assert_eq!(out.stats.unmatched_vests, 1);
    }

    #[test]
    fn vest_with_fmv_but_no_market_data_emits_partial_record() {
        let calendar = calendar();
        // No stock close on the 16th, so the resolver reports no rate either.
        let prices = PriceIndex::from_series(
            [(date(2024, 1, 2), dec!(92.50))],
            [(date(2024, 1, 16), dec!(1.25))],
        )
        .unwrap();
        let resolver = VestPriceResolver::new(&calendar, &prices);

        let out = vests_to_buys(
            &resolver,
            &[release("R1234", date(2024, 1, 13), 100, Some(dec!(94.50)))],
        );
        let tx = &out.records[0];
        assert_eq!(tx.date, date(2024, 1, 16));
        assert_eq!(tx.price_per_share_usd, dec!(94.50));
        assert_eq!(tx.price_per_share_gbp, None);
        assert_eq!(tx.exchange_rate, None);
        assert_eq!(out.stats.missing_fmv, 0);
    }

    #[test]
    fn exercise_lots_carry_option_labels() {
        let calendar = calendar();
        let prices = prices();
        let resolver = VestPriceResolver::new(&calendar, &prices);

        let event = VestEvent {
            grant_id: "N0001".to_string(),
            date: date(2024, 1, 2),
            quantity: 200,
            fmv: Some(dec!(10.00)),
            kind: VestKind::Exercise,
        };
        let out = vests_to_buys(&resolver, &[event]);
        let tx = &out.records[0];
        assert_eq!(tx.order_type, "Exercise");
        assert_eq!(tx.security_type, "Non-Qualified Stock Option");
        // 10.00 / 1.27 = 7.874015748...
        assert_eq!(tx.price_per_share_gbp, Some(dec!(7.874016)));
    }

    #[test]
    fn sales_keep_their_own_date_and_price() {
        let calendar = calendar();
        let prices = prices();
        let resolver = VestPriceResolver::new(&calendar, &prices);

        let out = sales_to_sells(&resolver, &[sale("R1234", date(2024, 1, 17), 60, dec!(100.00))]);
        let tx = &out.records[0];
        assert_eq!(tx.record_type, RecordType::Sell);
        assert_eq!(tx.date, date(2024, 1, 17));
        assert_eq!(tx.price_per_share_usd, dec!(100.00));
        // 100.00 / 1.26 = 79.36507936...
        assert_eq!(tx.price_per_share_gbp, Some(dec!(79.365079)));
        assert_eq!(tx.exchange_rate, Some(dec!(1.26)));
    }

    #[test]
    fn sale_without_rate_stays_usd_only() {
        let calendar = calendar();
        let prices = PriceIndex::from_series(
            [(date(2024, 1, 17), dec!(96.25))],
            [(date(2024, 1, 2), dec!(1.27))],
        )
        .unwrap();
        let resolver = VestPriceResolver::new(&calendar, &prices);

        let out = sales_to_sells(&resolver, &[sale("R1234", date(2024, 1, 17), 60, dec!(100.00))]);
        let tx = &out.records[0];
        assert_eq!(tx.price_per_share_gbp, None);
        assert_eq!(tx.exchange_rate, None);
    }

    #[test]
    fn negative_and_non_positive_values_are_counted_but_emitted() {
        let calendar = calendar();
        let prices = prices();
        let resolver = VestPriceResolver::new(&calendar, &prices);

        let out = sales_to_sells(
            &resolver,
            &[
                sale("R1234", date(2024, 1, 17), -60, dec!(100.00)),
                sale("R5678", date(2024, 1, 17), 40, dec!(0)),
            ],
        );
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].quantity, -60);
        assert_eq!(out.stats.negative_quantities, 1);
        assert_eq!(out.stats.zero_or_negative_prices, 1);
    }
}
