//! Normalization of source headers and values into DDF identifiers.

use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;

use crate::COL;

pub const TOTAL_CARBON_EMISSIONS: &str = "total_carbon_emissions";
pub const MEASURE_PREFIX: &str = "carbon_emissions_";

/// Phrases that identify the total emissions column. The global and nation files
/// word this differently.
const TOTAL_PATTERNS: [&str; 3] = [
    "total emissions",
    "total carbon emissions",
    "total co2 emissions",
];

/// Checked in order, the first match wins.
const SUBTYPES: [&str; 7] = [
    "gas fuel consumption",
    "liquid fuel consumption",
    "solid fuel consumption",
    "cement production",
    "gas flaring",
    "bunker fuels",
    "per capita",
];

fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Space through '.' covers !"#$%&'()*+,-
    RE.get_or_init(|| Regex::new(r#"[/ -.*";]+"#).expect("valid separator regex"))
}

/// Lowercase a header, turn newlines and repeated whitespace into single spaces
/// and trim it. The stray quote in `Year"` is dropped.
pub fn normalize_column_name(name: &str) -> String {
    let normalized = name.split_whitespace().join(" ").to_lowercase();
    if normalized == COL::MALFORMED_YEAR {
        COL::YEAR.to_string()
    } else {
        normalized
    }
}

/// Convert a string to a lowercase alphanumeric + underscore identifier.
/// Newlines are dropped rather than treated as separators.
pub fn to_concept_id(name: &str) -> String {
    separator_regex()
        .replace_all(&name.replace(|c: char| c == '\n' || c == '\r', "").to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

/// Classify an indicator header into a concept id. Headers that are not
/// emission measures fall through to a plain identifier.
pub fn concept_id_for_column(name: &str) -> String {
    let name = normalize_column_name(name);
    if TOTAL_PATTERNS.iter().any(|p| name.contains(p)) {
        return TOTAL_CARBON_EMISSIONS.to_string();
    }
    SUBTYPES
        .iter()
        .find(|subtype| name.contains(*subtype))
        .map(|subtype| format!("{MEASURE_PREFIX}{}", to_concept_id(subtype)))
        .unwrap_or_else(|| to_concept_id(&name))
}

pub fn is_per_capita(concept: &str) -> bool {
    concept.contains("per_capita")
}

/// `nation` -> `Nation`, `total_carbon_emissions` -> `Total Carbon Emissions`
pub fn title_case(s: &str) -> String {
    s.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .join(" ")
}

/// Render `x` with at most `sigfig` significant digits, without trailing zeros
/// and without scientific notation.
pub fn format_float_sigfig(x: f64, sigfig: usize) -> String {
    if !x.is_finite() {
        return String::new();
    }
    if x == 0.0 {
        return "0".to_string();
    }
    let sigfig = sigfig.max(1) as i32;
    let magnitude = x.abs().log10().floor() as i32;
    let decimals = sigfig - 1 - magnitude;
    let formatted = if decimals >= 0 {
        let s = format!("{:.*}", decimals as usize, x);
        if s.contains('.') {
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            s
        }
    } else {
        let factor = 10f64.powi(-decimals);
        format!("{:.0}", (x / factor).round() * factor)
    };
    if formatted == "-0" {
        "0".to_string()
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_column_name_is_idempotent() {
        let raw = "  Total carbon emissions\nfrom fossil fuels  (million metric tons of C) ";
        let once = normalize_column_name(raw);
        assert_eq!(
            once,
            "total carbon emissions from fossil fuels (million metric tons of c)"
        );
        assert_eq!(normalize_column_name(&once), once);
    }

    #[test]
    fn normalize_column_name_ignores_case_and_whitespace() {
        assert_eq!(
            normalize_column_name("Gas Flaring"),
            normalize_column_name(" gas\t\tFLARING\n")
        );
    }

    #[test]
    fn malformed_year_header_should_be_fixed() {
        assert_eq!(normalize_column_name("Year\""), "year");
        assert_eq!(normalize_column_name("Year"), "year");
    }

    #[test]
    fn to_concept_id_should_replace_separators() {
        assert_eq!(to_concept_id("Gas Fuel Consumption"), "gas_fuel_consumption");
        assert_eq!(
            to_concept_id("Per capita (metric tons of carbon)"),
            "per_capita_metric_tons_of_carbon"
        );
        assert_eq!(to_concept_id("CÔTE D'IVOIRE"), "côte_d_ivoire");
        assert_eq!(to_concept_id("BONAIRE, SAINT EUSTATIUS, AND SABA"), "bonaire_saint_eustatius_and_saba");
        assert_eq!(to_concept_id("a/b;c*d\"e"), "a_b_c_d_e");
    }

    #[test]
    fn to_concept_id_should_drop_newlines() {
        assert_eq!(to_concept_id("per\ncapita"), "percapita");
        assert_eq!(to_concept_id("gas\r\nflaring (kt)"), "gasflaring_kt");
        // Headers are normalized before classification, so their line breaks act as spaces
        assert_eq!(
            concept_id_for_column("Per\ncapita CO2 emissions"),
            "carbon_emissions_per_capita"
        );
    }

    #[test]
    fn to_concept_id_is_idempotent() {
        for s in ["Year", " United Kingdom ", "bunker fuels (not in total)", "x--y"] {
            let once = to_concept_id(s);
            assert_eq!(to_concept_id(&once), once);
        }
    }

    #[test]
    fn classifier_should_map_known_subtypes() {
        assert_eq!(
            concept_id_for_column("Carbon emissions from cement production"),
            "carbon_emissions_cement_production"
        );
        assert_eq!(
            concept_id_for_column("Emissions from gas flaring"),
            "carbon_emissions_gas_flaring"
        );
        assert_eq!(
            concept_id_for_column("Per capita CO2 emissions (metric tons of carbon)"),
            "carbon_emissions_per_capita"
        );
        assert_eq!(
            concept_id_for_column("Emissions from bunker fuels (not included in the totals)"),
            "carbon_emissions_bunker_fuels"
        );
    }

    #[test]
    fn classifier_should_prefer_total() {
        assert_eq!(
            concept_id_for_column(
                "Total CO2 emissions from fossil-fuels and cement production (thousand metric tons of C)"
            ),
            TOTAL_CARBON_EMISSIONS
        );
        assert_eq!(
            concept_id_for_column("Total carbon emissions from fossil fuels (million metric tons of C)"),
            TOTAL_CARBON_EMISSIONS
        );
    }

    #[test]
    fn classifier_should_fall_back_to_id() {
        assert_eq!(concept_id_for_column("Nation"), "nation");
        assert_eq!(concept_id_for_column("Year\""), "year");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("year"), "Year");
        assert_eq!(title_case("total_carbon_emissions"), "Total Carbon Emissions");
    }

    #[test]
    fn test_format_float_sigfig() {
        assert_eq!(format_float_sigfig(1234.5678, 5), "1234.6");
        assert_eq!(format_float_sigfig(0.000123456, 5), "0.00012346");
        assert_eq!(format_float_sigfig(123456789.0, 5), "123460000");
        assert_eq!(format_float_sigfig(2.0, 5), "2");
        assert_eq!(format_float_sigfig(9.99999, 5), "10");
        assert_eq!(format_float_sigfig(-42.125, 3), "-42.1");
        assert_eq!(format_float_sigfig(0.0, 5), "0");
        assert_eq!(format_float_sigfig(f64::NAN, 5), "");
    }
}
