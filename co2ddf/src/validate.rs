//! Consistency checks over an extracted dataset: unique identifiers and datapoint keys
//! that resolve to entities.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;

use itertools::{izip, Itertools};
use log::warn;

use crate::ddf::DdfDataset;
use crate::error::Co2DdfResult;
use crate::COL;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    DuplicateConcept(String),
    DuplicateEntity { domain: String, id: String },
    UnknownEntity {
        concept: String,
        domain: String,
        id: String,
    },
    DuplicateDatapoint { concept: String, key: String },
}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateConcept(id) => write!(f, "concept '{id}' is defined more than once"),
            Self::DuplicateEntity { domain, id } => {
                write!(f, "entity '{id}' appears more than once in domain '{domain}'")
            }
            Self::UnknownEntity {
                concept,
                domain,
                id,
            } => write!(
                f,
                "datapoints of '{concept}' reference '{id}' which is not in domain '{domain}'"
            ),
            Self::DuplicateDatapoint { concept, key } => {
                write!(f, "datapoints of '{concept}' repeat the key ({key})")
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Emit every issue as a warning
    pub fn log(&self) {
        for issue in &self.issues {
            warn!("DDF validation: {issue}");
        }
    }
}

pub fn validate(dataset: &DdfDataset) -> Co2DdfResult<ValidationReport> {
    let mut issues = vec![];

    let concept_ids = dataset
        .discrete_concepts
        .iter()
        .chain(dataset.continuous_concepts.iter())
        .map(|c| c.concept.as_str())
        .collect_vec();
    issues.extend(
        concept_ids
            .iter()
            .duplicates()
            .map(|id| ValidationIssue::DuplicateConcept(id.to_string())),
    );

    let mut domains: HashMap<&str, HashSet<&str>> = HashMap::new();
    for set in &dataset.entities {
        let ids = set.entities.iter().map(|e| e.id.as_str()).collect_vec();
        issues.extend(ids.iter().duplicates().map(|id| ValidationIssue::DuplicateEntity {
            domain: set.domain.clone(),
            id: id.to_string(),
        }));
        domains.insert(set.domain.as_str(), ids.into_iter().collect());
    }

    for series in &dataset.datapoints {
        let domain = series.domain.key();
        let mut unknown: HashSet<String> = HashSet::new();
        let mut seen: HashSet<(String, String, i64)> = HashSet::new();
        for (entity, version, year) in izip!(
            series.data.column(domain)?.str()?,
            series.data.column(COL::VERSION)?.str()?,
            series.data.column(COL::YEAR)?.i64()?
        ) {
            let (Some(entity), Some(version), Some(year)) = (entity, version, year) else {
                continue;
            };
            for (d, id) in [(domain, entity), (COL::VERSION, version)] {
                let found = domains.get(d).map_or(false, |ids| ids.contains(id));
                if !found && unknown.insert(format!("{d}/{id}")) {
                    issues.push(ValidationIssue::UnknownEntity {
                        concept: series.concept.clone(),
                        domain: d.to_string(),
                        id: id.to_string(),
                    });
                }
            }
            if !seen.insert((entity.to_string(), version.to_string(), year)) {
                issues.push(ValidationIssue::DuplicateDatapoint {
                    concept: series.concept.clone(),
                    key: format!("{entity}, {version}, {year}"),
                });
            }
        }
    }

    Ok(ValidationReport { issues })
}
