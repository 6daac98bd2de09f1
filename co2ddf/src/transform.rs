use enum_dispatch::enum_dispatch;
use itertools::Itertools;
use log::debug;
use polars::error::PolarsResult;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::ids::is_per_capita;
use crate::source::{Domain, SourceTable};

/// A rule applied to the measure columns of a source table.
#[enum_dispatch]
pub trait Transform {
    fn transform(&self, data: DataFrame, measures: &[String]) -> PolarsResult<DataFrame>;
}

#[enum_dispatch(Transform)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueTransform {
    Scale(ScaleTransform),
    ClampNegative(ClampNegativeTransform),
}

/// Multiplies measures by `factor`. Global totals are published in million
/// tonnes while nation data uses thousand tonnes; per-capita values share a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleTransform {
    pub factor: f64,
    pub skip_per_capita: bool,
}

/// Replaces negative measures with zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClampNegativeTransform;

impl Transform for ScaleTransform {
    fn transform(&self, data: DataFrame, measures: &[String]) -> PolarsResult<DataFrame> {
        let exprs = measures
            .iter()
            .filter(|m| !(self.skip_per_capita && is_per_capita(m)))
            .map(|m| (col(m) * lit(self.factor)).alias(m))
            .collect_vec();
        if exprs.is_empty() {
            return Ok(data);
        }
        data.lazy().with_columns(exprs).collect()
    }
}

impl Transform for ClampNegativeTransform {
    fn transform(&self, data: DataFrame, measures: &[String]) -> PolarsResult<DataFrame> {
        let exprs = measures
            .iter()
            .map(|m| {
                when(col(m).lt(lit(0.0)))
                    .then(lit(0.0))
                    .otherwise(col(m))
                    .alias(m)
            })
            .collect_vec();
        if exprs.is_empty() {
            return Ok(data);
        }
        data.lazy().with_columns(exprs).collect()
    }
}

/// The transforms configured for a domain, in application order
pub fn transforms_for(domain: Domain, config: &Config) -> Vec<ValueTransform> {
    let mut transforms = vec![];
    if domain == Domain::Global && config.global_scale != 1.0 {
        transforms.push(ValueTransform::Scale(ScaleTransform {
            factor: config.global_scale,
            skip_per_capita: true,
        }));
    }
    if config.clamp_negative {
        transforms.push(ValueTransform::ClampNegative(ClampNegativeTransform));
    }
    transforms
}

/// Run `transforms` over the measures of `table`
pub fn apply(table: SourceTable, transforms: &[ValueTransform]) -> PolarsResult<SourceTable> {
    let measures = table.measures();
    let mut data = table.data;
    for t in transforms {
        debug!("Applying {t:?} to {} table", table.domain);
        data = t.transform(data, &measures)?;
    }
    Ok(SourceTable { data, ..table })
}
