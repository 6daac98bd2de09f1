use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the downloaded `global.*.csv` and `nation.*.csv` files
    pub source_dir: PathBuf,
    /// Directory the DDF files are written to
    pub out_dir: PathBuf,
    /// Location the source files are fetched from, joined as `{base_url}/{file}`
    pub base_url: String,
    pub source_files: Vec<String>,
    /// Date of the source release the current output was built from
    pub last_update: NaiveDate,
    /// Factor applied to global measures to bring them to the units of the nation data
    pub global_scale: f64,
    pub clamp_negative: bool,
    /// Significant figures kept when writing datapoints
    pub sigfig: usize,
    pub write_index: bool,
    pub write_manifest: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_dir: "source".into(),
            out_dir: ".".into(),
            base_url: "https://cdiac.ess-dive.lbl.gov/ftp/ndp030/CSV-FILES".into(),
            source_files: vec![
                "global.1751_2014.csv".into(),
                "nation.1751_2014.csv".into(),
            ],
            last_update: NaiveDate::from_ymd_opt(2018, 2, 1).unwrap_or_default(),
            global_scale: 1000.0,
            clamp_negative: true,
            sigfig: 5,
            write_index: true,
            write_manifest: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_should_fill_defaults() {
        let config: Config = serde_json::from_str(r#"{"out_dir": "out", "sigfig": 3}"#).unwrap();
        assert_eq!(config.out_dir, PathBuf::from("out"));
        assert_eq!(config.sigfig, 3);
        assert_eq!(config.source_dir, Config::default().source_dir);
        assert_eq!(
            config.last_update,
            NaiveDate::from_ymd_opt(2018, 2, 1).unwrap()
        );
    }
}
