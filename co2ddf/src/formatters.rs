use std::io::{Cursor, Write};

use anyhow::Result;
use enum_dispatch::enum_dispatch;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ids::format_float_sigfig;

/// Replace every float column with its formatted string rendering
fn format_float_columns(df: &DataFrame, sigfig: usize) -> PolarsResult<DataFrame> {
    let mut out = df.clone();
    for series in df.get_columns() {
        if series.dtype() != &DataType::Float64 {
            continue;
        }
        let formatted: Vec<Option<String>> = series
            .f64()?
            .into_iter()
            .map(|v| v.map(|v| format_float_sigfig(v, sigfig)))
            .collect();
        out.with_column(Series::new(series.name(), formatted))?;
    }
    Ok(out)
}

/// Trait to define different output generators. Defines two
/// functions, format which generates a serialized string of the
/// `DataFrame` and save which writes it to a writer
#[enum_dispatch]
pub trait OutputGenerator {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()>;
    fn format(&self, df: &mut DataFrame) -> Result<String> {
        // Just creating an empty vec to store the buffered output
        let mut data: Vec<u8> = vec![];
        let mut buff = Cursor::new(&mut data);
        self.save(&mut buff, df)?;

        Ok(String::from_utf8(data)?)
    }
}

/// Enum of OutputFormatters, one per kind of DDF table
#[enum_dispatch(OutputGenerator)]
#[derive(Serialize, Deserialize, Debug)]
pub enum OutputFormatter {
    Csv(CSVFormatter),
    Datapoints(DatapointsFormatter),
}

/// Plain CSV with a header, used for concept and entity tables
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CSVFormatter;

impl OutputGenerator for CSVFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        CsvWriter::new(writer).include_header(true).finish(df)?;
        Ok(())
    }
}

/// CSV with float values rounded to `sigfig` significant digits
#[derive(Serialize, Deserialize, Debug)]
pub struct DatapointsFormatter {
    pub sigfig: usize,
}

impl Default for DatapointsFormatter {
    fn default() -> Self {
        Self { sigfig: 5 }
    }
}

impl OutputGenerator for DatapointsFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        let mut df = format_float_columns(df, self.sigfig)?;
        CsvWriter::new(writer).include_header(true).finish(&mut df)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_df() -> DataFrame {
        df!(
             "nation" => &["afghanistan", "afghanistan", "albania"],
             "year" => &[1950i64, 1951, 1950],
             "total_carbon_emissions" => &[23.0, 25.123456, 1234567.0]
        )
        .unwrap()
    }

    #[test]
    fn csv_formatter_should_work() {
        let mut df = df!(
            "concept" => &["year", "nation"],
            "concept_type" => &["time", "entity_domain"]
        )
        .unwrap();
        let output = CSVFormatter.format(&mut df);
        let correct_str = [
            "concept,concept_type",
            "year,time",
            "nation,entity_domain",
            "",
        ]
        .join("\n");
        assert!(output.is_ok(), "Output should not error");
        assert_eq!(output.unwrap(), correct_str, "Output should be correct");
    }

    #[test]
    fn datapoints_formatter_should_round() {
        let formatter = DatapointsFormatter { sigfig: 5 };
        let mut df = test_df();
        let output = formatter.format(&mut df);
        let correct_str = [
            "nation,year,total_carbon_emissions",
            "afghanistan,1950,23",
            "afghanistan,1951,25.123",
            "albania,1950,1234600",
            "",
        ]
        .join("\n");
        assert!(output.is_ok(), "Output should not error");
        assert_eq!(output.unwrap(), correct_str, "Output should be correct");
    }

    #[test]
    fn formatter_enum_should_dispatch() {
        let formatter: OutputFormatter = DatapointsFormatter { sigfig: 2 }.into();
        let output = formatter.format(&mut test_df()).unwrap();
        assert!(output.contains("afghanistan,1951,25\n"));
    }
}
