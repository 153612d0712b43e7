//! Row writers
//!
//! CSV is the primary output: three identity columns followed by
//! `<Concept>_start_date`, `<Concept>_end_date` and `<Concept>_value` for each
//! concept. JSON Lines carries the same fields as one object per filing.

use crate::model::{AccountsRow, GAAP_CONCEPTS};
use crate::{Error, Result};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Csv,
    Jsonl,
}

pub fn csv_header() -> Vec<String> {
    let mut header = vec![
        "company_number".to_string(),
        "balance_sheet_date".to_string(),
        "registered_name".to_string(),
    ];
    for concept in GAAP_CONCEPTS {
        header.push(format!("{}_start_date", concept));
        header.push(format!("{}_end_date", concept));
        header.push(format!("{}_value", concept));
    }
    header
}

/// Absent names and figures become empty fields.
pub fn csv_record(row: &AccountsRow) -> Vec<String> {
    let mut record = Vec::with_capacity(3 + 3 * row.figures.len());
    record.push(row.company_number.clone());
    record.push(row.balance_sheet_date.clone());
    record.push(row.registered_name.clone().unwrap_or_default());

    for figure in &row.figures {
        match &figure.selected {
            Some(selected) => {
                record.push(selected.period.start.format("%Y-%m-%d").to_string());
                record.push(selected.period.end.format("%Y-%m-%d").to_string());
                record.push(format_value(selected.value));
            }
            None => record.extend(std::iter::repeat(String::new()).take(3)),
        }
    }
    record
}

/// Shortest round-trip form with a decimal point, e.g. `1234000.0`.
/// Exponents carry an explicit sign (`1e+16`, `1e-05`).
pub fn format_value(value: f64) -> String {
    let formatted = format!("{:?}", value);
    match formatted.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => formatted,
    }
}

enum Sink<W: Write> {
    Csv(csv::Writer<W>),
    Jsonl(W),
}

pub struct RowWriter<W: Write> {
    sink: Sink<W>,
    rows: usize,
}

impl<W: Write> RowWriter<W> {
    /// Creates a writer; CSV output gets its header row immediately.
    pub fn new(writer: W, format: OutputFormat) -> Result<Self> {
        let sink = match format {
            OutputFormat::Csv => {
                let mut csv = csv::Writer::from_writer(writer);
                csv.write_record(csv_header())?;
                Sink::Csv(csv)
            }
            OutputFormat::Jsonl => Sink::Jsonl(writer),
        };
        Ok(Self { sink, rows: 0 })
    }

    pub fn write_row(&mut self, row: &AccountsRow) -> Result<()> {
        match &mut self.sink {
            Sink::Csv(csv) => csv.write_record(csv_record(row))?,
            Sink::Jsonl(out) => {
                serde_json::to_writer(&mut *out, row)?;
                out.write_all(b"\n")?;
            }
        }
        self.rows += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        match &mut self.sink {
            Sink::Csv(csv) => csv.flush()?,
            Sink::Jsonl(out) => out.flush()?,
        }
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        match self.sink {
            Sink::Csv(csv) => csv
                .into_inner()
                .map_err(|e| Error::Io(e.into_error())),
            Sink::Jsonl(mut out) => {
                out.flush()?;
                Ok(out)
            }
        }
    }
}
