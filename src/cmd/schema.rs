//! Schema command - print expected input file formats

use clap::Args;
use schemars::schema_for;

use crate::calendar::HolidayRecord;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format
    #[arg(value_enum, default_value = "csv-fields")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// CSV column descriptions for every tabular input
    CsvFields,
    /// CSV header rows only
    CsvHeaders,
    /// JSON Schema for the holiday calendar file
    HolidaysJsonSchema,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::CsvFields => self.print_csv_fields(),
            SchemaFormat::CsvHeaders => self.print_csv_headers(),
            SchemaFormat::HolidaysJsonSchema => self.print_holidays_schema(),
        }
    }

    fn print_csv_headers(&self) -> anyhow::Result<()> {
        for (file, fields) in INPUT_FILES {
            let names: Vec<&str> = fields.iter().map(|(name, _, _)| *name).collect();
            println!("{}: {}", file, names.join(","));
        }
        Ok(())
    }

    fn print_csv_fields(&self) -> anyhow::Result<()> {
        println!("CSV Input Formats");
        println!("=================");
        for (file, fields) in INPUT_FILES {
            println!();
            println!("{}", file);
            for (name, required, description) in *fields {
                let req = if *required { "required" } else { "optional" };
                println!("  {:22} ({:8})  {}", name, req, description);
            }
        }
        println!();
        println!("All dates are YYYY-MM-DD. GBP price = USD price / exchange rate.");
        Ok(())
    }

    fn print_holidays_schema(&self) -> anyhow::Result<()> {
        let schema = schema_for!(Vec<HolidayRecord>);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }
}

type FieldSpec = (&'static str, bool, &'static str);

const INPUT_FILES: &[(&str, &[FieldSpec])] = &[
    (
        "sales (--sales)",
        &[
            ("record_type", true, "always 'Sell'"),
            ("date_acquired", false, "date the sold lot was acquired"),
            ("date_sold", true, "trade date of the sale"),
            ("quantity", true, "shares sold (integer)"),
            ("proceeds_per_share", true, "per-share proceeds in USD"),
            ("vest_date", false, "vest date of the sold lot"),
            ("vest_date_fmv", false, "broker-reported FMV at vest"),
            ("grant_date_fmv", false, "broker-reported FMV at grant"),
            ("grant_number", true, "grant identifier"),
            ("order_type", true, "e.g. 'Market'"),
            ("security_type", true, "e.g. 'Restricted Stock Unit'"),
        ],
    ),
    (
        "vests (--vests)",
        &[
            ("grant_number", true, "grant identifier"),
            ("date", true, "nominal vest date"),
            ("event_type", true, "only 'Shares released' rows create lots"),
            ("quantity", true, "shares released (integer)"),
        ],
    ),
    (
        "exercises (--exercises)",
        &[
            ("grant_number", true, "grant identifier"),
            ("date", true, "exercise date"),
            ("quantity", true, "options exercised, net (integer)"),
            ("exercise_price", true, "per-share exercise price in USD"),
        ],
    ),
    (
        "stock prices (--stock-prices)",
        &[
            ("date", true, "trading date"),
            ("close", true, "USD closing price"),
        ],
    ),
    (
        "fx rates (--fx-rates)",
        &[
            ("date", true, "publication date"),
            ("rate", true, "USD/GBP exchange rate"),
        ],
    ),
];
