use std::collections::HashMap;
use std::io::Read;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Benefits rows with this event type deliver shares to the account; other
/// event types (dividends, deferrals) do not create lots.
pub const RELEASE_EVENT_TYPE: &str = "Shares released";

/// How a buy-side lot came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VestKind {
    Release,
    Exercise,
}

impl VestKind {
    pub fn order_type(self) -> &'static str {
        match self {
            VestKind::Release => "Vest",
            VestKind::Exercise => "Exercise",
        }
    }

    pub fn security_type(self) -> &'static str {
        match self {
            VestKind::Release => "Restricted Stock Unit",
            VestKind::Exercise => "Non-Qualified Stock Option",
        }
    }
}

/// One vesting or option-exercise lot, dated by its nominal schedule date.
///
/// `fmv` is the known fair-market value per share, if the broker supplied
/// one; exercises always carry their exercise price here.
#[derive(Debug, Clone, PartialEq)]
pub struct VestEvent {
    pub grant_id: String,
    pub date: NaiveDate,
    pub quantity: i64,
    pub fmv: Option<Decimal>,
    pub kind: VestKind,
}

/// One sale lot, dated by its trade date.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleEvent {
    pub grant_id: String,
    pub date: NaiveDate,
    pub quantity: i64,
    pub proceeds_per_share: Decimal,
    pub order_type: String,
    pub security_type: String,
}

/// Known fair-market values keyed by grant and nominal vest date, extracted
/// from the sales file.
pub type FmvMap = HashMap<(String, NaiveDate), Decimal>;

/// Row of the sales (gains/losses) export.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SaleRow {
    record_type: String,
    #[serde(default)]
    date_acquired: Option<NaiveDate>,
    date_sold: NaiveDate,
    quantity: i64,
    proceeds_per_share: Decimal,
    #[serde(default)]
    vest_date: Option<NaiveDate>,
    #[serde(default)]
    vest_date_fmv: Option<Decimal>,
    #[serde(default)]
    grant_date_fmv: Option<Decimal>,
    grant_number: String,
    order_type: String,
    security_type: String,
}

/// Row of the vesting (benefits) export.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BenefitRow {
    grant_number: String,
    date: NaiveDate,
    event_type: String,
    quantity: i64,
}

/// Row of the option-exercises file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExerciseRow {
    grant_number: String,
    date: NaiveDate,
    quantity: i64,
    exercise_price: Decimal,
}

/// Read the sales file, returning sale events in file order plus the FMV
/// values the broker reported for each (grant, vest date).
///
/// Conflicting FMV values for the same key are warned about; the first one
/// wins.
pub fn read_sales<R: Read>(reader: R) -> anyhow::Result<(Vec<SaleEvent>, FmvMap)> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut sales = Vec::new();
    let mut fmv_map = FmvMap::new();
    for row in rdr.deserialize::<SaleRow>() {
        let row = row?;
        if row.record_type != "Sell" {
            log::warn!(
                "Unexpected record type '{}' in sales file, treating as Sell",
                row.record_type
            );
        }
        if let (Some(vest_date), Some(fmv)) = (row.vest_date, row.vest_date_fmv) {
            let key = (row.grant_number.clone(), vest_date);
            match fmv_map.get(&key) {
                Some(existing) if *existing != fmv => log::warn!(
                    "Multiple FMV values for grant {} vest date {}: keeping {}, ignoring {}",
                    key.0,
                    vest_date,
                    existing,
                    fmv
                ),
                Some(_) => {}
                None => {
                    fmv_map.insert(key, fmv);
                }
            }
        }
        sales.push(SaleEvent {
            grant_id: row.grant_number,
            date: row.date_sold,
            quantity: row.quantity,
            proceeds_per_share: row.proceeds_per_share,
            order_type: row.order_type,
            security_type: row.security_type,
        });
    }
    log::info!("Loaded {} sale records", sales.len());
    Ok((sales, fmv_map))
}

/// Read the benefits file, keeping only share-release rows.
pub fn read_vests<R: Read>(reader: R) -> anyhow::Result<Vec<VestEvent>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut vests = Vec::new();
    for row in rdr.deserialize::<BenefitRow>() {
        let row = row?;
        if row.event_type != RELEASE_EVENT_TYPE {
            continue;
        }
        vests.push(VestEvent {
            grant_id: row.grant_number,
            date: row.date,
            quantity: row.quantity,
            fmv: None,
            kind: VestKind::Release,
        });
    }
    if vests.is_empty() {
        log::warn!("No '{}' events found in benefits file", RELEASE_EVENT_TYPE);
    } else {
        log::info!("Loaded {} vesting events", vests.len());
    }
    Ok(vests)
}

/// Read the option-exercises file. The exercise price is the known FMV.
pub fn read_exercises<R: Read>(reader: R) -> anyhow::Result<Vec<VestEvent>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut exercises = Vec::new();
    for row in rdr.deserialize::<ExerciseRow>() {
        let row = row?;
        exercises.push(VestEvent {
            grant_id: row.grant_number,
            date: row.date,
            quantity: row.quantity,
            fmv: Some(row.exercise_price),
            kind: VestKind::Exercise,
        });
    }
    log::info!("Loaded {} option exercises", exercises.len());
    Ok(exercises)
}

/// Fill in known FMVs on release events from the sales-file mapping.
/// Events that already carry a value keep it.
pub fn attach_known_fmv(vests: Vec<VestEvent>, fmv_map: &FmvMap) -> Vec<VestEvent> {
    vests
        .into_iter()
        .map(|event| {
            if event.fmv.is_some() {
                return event;
            }
            let fmv = fmv_map
                .get(&(event.grant_id.clone(), event.date))
                .copied();
            VestEvent { fmv, ..event }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const SALES_CSV: &str = "\
record_type,date_acquired,date_sold,quantity,proceeds_per_share,vest_date,vest_date_fmv,grant_date_fmv,grant_number,order_type,security_type
Sell,2023-06-15,2024-01-17,60,100.00,2023-06-15,80.00,75.00,R1234,Market,Restricted Stock Unit
Sell,,2024-01-17,40,100.50,2023-06-15,81.00,,R1234,Market,Restricted Stock Unit
Sell,2023-09-15,2024-01-17,25,120.00,2023-09-15,85.00,75.00,R5678,Market,Restricted Stock Unit
";

    #[test]
    fn reads_sales_and_fmv_mapping() {
        let (sales, fmv_map) = read_sales(SALES_CSV.as_bytes()).unwrap();
        assert_eq!(sales.len(), 3);
        assert_eq!(sales[0].date, date(2024, 1, 17));
        assert_eq!(sales[0].proceeds_per_share, dec!(100.00));
        assert_eq!(sales[2].grant_id, "R5678");

        // First FMV wins for the conflicting (R1234, 2023-06-15) key.
        assert_eq!(
            fmv_map.get(&("R1234".to_string(), date(2023, 6, 15))),
            Some(&dec!(80.00))
        );
        assert_eq!(
            fmv_map.get(&("R5678".to_string(), date(2023, 9, 15))),
            Some(&dec!(85.00))
        );
    }

    #[test]
    fn reads_vests_filtering_non_release_rows() {
        let csv = "\
grant_number,date,event_type,quantity
R1234,2024-01-13,Shares released,100
R1234,2024-01-13,Cash dividend,10
R5678,2024-01-17,Shares released,50
";
        let vests = read_vests(csv.as_bytes()).unwrap();
        assert_eq!(vests.len(), 2);
        assert_eq!(vests[0].quantity, 100);
        assert_eq!(vests[0].kind, VestKind::Release);
        assert_eq!(vests[0].fmv, None);
        assert_eq!(vests[1].grant_id, "R5678");
    }

    #[test]
    fn reads_exercises_with_known_price() {
        let csv = "\
grant_number,date,quantity,exercise_price
N0001,2024-01-02,200,10.00
";
        let exercises = read_exercises(csv.as_bytes()).unwrap();
        assert_eq!(exercises.len(), 1);
        assert_eq!(exercises[0].kind, VestKind::Exercise);
        assert_eq!(exercises[0].fmv, Some(dec!(10.00)));
        assert_eq!(exercises[0].kind.order_type(), "Exercise");
        assert_eq!(
            exercises[0].kind.security_type(),
            "Non-Qualified Stock Option"
        );
    }

    #[test]
    fn attaches_known_fmv_to_matching_vests() {
        let mut fmv_map = FmvMap::new();
        fmv_map.insert(("R1234".to_string(), date(2024, 1, 13)), dec!(94.50));

        let vests = vec![
            VestEvent {
                grant_id: "R1234".to_string(),
                date: date(2024, 1, 13),
                quantity: 100,
                fmv: None,
                kind: VestKind::Release,
            },
            VestEvent {
                grant_id: "R5678".to_string(),
                date: date(2024, 1, 17),
                quantity: 50,
                fmv: None,
                kind: VestKind::Release,
            },
            VestEvent {
                grant_id: "N0001".to_string(),
                date: date(2024, 1, 13),
                quantity: 200,
                fmv: Some(dec!(10.00)),
                kind: VestKind::Exercise,
            },
        ];

        let vests = attach_known_fmv(vests, &fmv_map);
        assert_eq!(vests[0].fmv, Some(dec!(94.50)));
        assert_eq!(vests[1].fmv, None);
        // Exercises keep their own price even if a mapping entry exists.
        assert_eq!(vests[2].fmv, Some(dec!(10.00)));
    }
}
