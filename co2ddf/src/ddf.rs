//! The DDF model: concepts, entities and datapoint series extracted from the source tables.

use std::collections::BTreeMap;

use itertools::{izip, Itertools};
use log::{debug, info};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::Co2DdfResult;
use crate::ids::title_case;
use crate::source::{Domain, SourceTable};
use crate::COL;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConceptType {
    Measure,
    EntityDomain,
    Time,
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Concept {
    pub concept: String,
    pub name: String,
    pub concept_type: ConceptType,
}

impl Concept {
    fn discrete(concept: &str, concept_type: ConceptType) -> Self {
        Self {
            concept: concept.to_string(),
            name: title_case(concept),
            concept_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: String,
    pub name: String,
}

/// All entities of one domain
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySet {
    pub domain: String,
    pub entities: Vec<Entity>,
}

/// The values of one concept, keyed by entity, version and year
#[derive(Debug, Clone)]
pub struct DatapointSeries {
    pub concept: String,
    pub domain: Domain,
    pub data: DataFrame,
}

impl DatapointSeries {
    pub fn primary_key(&self) -> Vec<&'static str> {
        vec![self.domain.key(), COL::VERSION, COL::YEAR]
    }

    pub fn file_name(&self) -> String {
        format!(
            "ddf--datapoints--{}--by--{}.csv",
            self.concept,
            self.primary_key().join("--")
        )
    }
}

#[derive(Debug, Clone)]
pub struct DdfDataset {
    pub discrete_concepts: Vec<Concept>,
    pub continuous_concepts: Vec<Concept>,
    pub entities: Vec<EntitySet>,
    pub datapoints: Vec<DatapointSeries>,
}

impl DdfDataset {
    pub fn from_tables(global: &SourceTable, nation: &SourceTable) -> Co2DdfResult<Self> {
        let (discrete_concepts, continuous_concepts) = extract_concepts(global, nation);
        let entities = extract_entities(global, nation)?;
        let mut datapoints = extract_datapoints(global)?;
        datapoints.extend(extract_datapoints(nation)?);
        info!(
            "Extracted {} concepts, {} entity domains and {} datapoint series",
            discrete_concepts.len() + continuous_concepts.len(),
            entities.len(),
            datapoints.len()
        );
        Ok(Self {
            discrete_concepts,
            continuous_concepts,
            entities,
            datapoints,
        })
    }
}

/// Extract both discrete and continuous concepts. Measures are deduplicated by id,
/// keeping the first header seen (global before nation).
pub fn extract_concepts(global: &SourceTable, nation: &SourceTable) -> (Vec<Concept>, Vec<Concept>) {
    let discrete = vec![
        Concept::discrete(COL::YEAR, ConceptType::Time),
        Concept::discrete(COL::NATION, ConceptType::EntityDomain),
        Concept::discrete(COL::GLOBAL, ConceptType::EntityDomain),
        Concept::discrete(COL::VERSION, ConceptType::EntityDomain),
        Concept::discrete(COL::NAME, ConceptType::String),
    ];

    let continuous = global
        .concept_names
        .iter()
        .chain(nation.concept_names.iter())
        .unique_by(|(id, _)| id.clone())
        .map(|(id, name)| Concept {
            concept: id.clone(),
            name: name.clone(),
            concept_type: ConceptType::Measure,
        })
        .collect_vec();
    debug!("Continuous concepts: {:?}", continuous);

    (discrete, continuous)
}

fn nation_entities(nation: &SourceTable) -> Co2DdfResult<Vec<Entity>> {
    let mut entities: BTreeMap<String, String> = BTreeMap::new();
    for (id, name) in izip!(
        nation.data.column(COL::NATION)?.str()?,
        nation.data.column(COL::NATION_NAME)?.str()?
    ) {
        if let (Some(id), Some(name)) = (id, name) {
            entities
                .entry(id.to_string())
                .or_insert_with(|| name.trim().to_string());
        }
    }
    Ok(entities
        .into_iter()
        .map(|(id, name)| Entity { id, name })
        .collect())
}

fn version_entities(tables: &[&SourceTable]) -> Co2DdfResult<Vec<Entity>> {
    let mut versions: Vec<String> = vec![];
    for table in tables {
        for v in table.data.column(COL::VERSION)?.str()?.into_iter().flatten() {
            versions.push(v.to_string());
        }
    }
    Ok(versions
        .into_iter()
        .sorted()
        .dedup()
        .map(|id| Entity {
            name: id.replace('_', "-"),
            id,
        })
        .collect())
}

/// Entity tables for every domain, ids unique and sorted within a domain.
pub fn extract_entities(global: &SourceTable, nation: &SourceTable) -> Co2DdfResult<Vec<EntitySet>> {
    let mut sets = vec![];
    for domain in Domain::iter() {
        let entities = match domain {
            Domain::Global => vec![Entity {
                id: COL::WORLD_ID.into(),
                name: COL::WORLD_NAME.into(),
            }],
            Domain::Nation => nation_entities(nation)?,
        };
        sets.push(EntitySet {
            domain: domain.to_string(),
            entities,
        });
    }
    sets.push(EntitySet {
        domain: COL::VERSION.into(),
        entities: version_entities(&[global, nation])?,
    });
    Ok(sets)
}

/// Reshape a wide source table into one long series per measure. Rows with a missing
/// value or entity are dropped, rows are sorted by key.
pub fn extract_datapoints(table: &SourceTable) -> Co2DdfResult<Vec<DatapointSeries>> {
    let key = table.domain.key();
    let mut series = vec![];
    for measure in table.measures() {
        let data = table
            .data
            .select([key, COL::VERSION, COL::YEAR, measure.as_str()])?
            .drop_nulls(Some(&[key, measure.as_str()][..]))?
            .sort([key, COL::VERSION, COL::YEAR], SortMultipleOptions::default())?;
        if data.height() == 0 {
            debug!("No {} datapoints for {measure}, skipping", table.domain);
            continue;
        }
        series.push(DatapointSeries {
            concept: measure,
            domain: table.domain,
            data,
        });
    }
    Ok(series)
}

pub fn concepts_to_df(concepts: &[Concept]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Series::new(
            COL::CONCEPT,
            concepts.iter().map(|c| c.concept.as_str()).collect_vec(),
        ),
        Series::new(
            COL::NAME,
            concepts.iter().map(|c| c.name.as_str()).collect_vec(),
        ),
        Series::new(
            COL::CONCEPT_TYPE,
            concepts.iter().map(|c| c.concept_type.as_ref()).collect_vec(),
        ),
    ])
}

pub fn entities_to_df(set: &EntitySet) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Series::new(
            &set.domain,
            set.entities.iter().map(|e| e.id.as_str()).collect_vec(),
        ),
        Series::new(
            COL::NAME,
            set.entities.iter().map(|e| e.name.as_str()).collect_vec(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{load_domain, tests::source_dir};

    fn tables() -> (SourceTable, SourceTable) {
        let dir = source_dir();
        (
            load_domain(dir.path(), Domain::Global).unwrap(),
            load_domain(dir.path(), Domain::Nation).unwrap(),
        )
    }

    #[test]
    fn concept_types_should_serialize_snake_case() {
        assert_eq!(ConceptType::EntityDomain.to_string(), "entity_domain");
        assert_eq!(ConceptType::Measure.as_ref(), "measure");
        assert_eq!(
            "time".parse::<ConceptType>().unwrap(),
            ConceptType::Time,
            "concept types should parse from their DDF name"
        );
    }

    #[test]
    fn concepts_should_be_deduplicated() {
        let (global, nation) = tables();
        let (discrete, continuous) = extract_concepts(&global, &nation);
        assert_eq!(discrete.len(), 5);
        assert_eq!(discrete[0].name, "Year");
        assert_eq!(discrete[0].concept_type, ConceptType::Time);

        let ids = continuous.iter().map(|c| c.concept.as_str()).collect_vec();
        assert_eq!(
            ids,
            vec![
                "total_carbon_emissions",
                "carbon_emissions_gas_fuel_consumption",
                "carbon_emissions_cement_production",
                "carbon_emissions_per_capita",
                "carbon_emissions_bunker_fuels",
            ]
        );
        assert!(continuous
            .iter()
            .all(|c| c.concept_type == ConceptType::Measure));
        // The global header is seen first
        assert!(continuous[0].name.contains("million metric tons"));
    }

    #[test]
    fn entities_should_cover_all_domains() {
        let (global, nation) = tables();
        let sets = extract_entities(&global, &nation).unwrap();
        let domains = sets.iter().map(|s| s.domain.as_str()).collect_vec();
        assert_eq!(domains, vec!["global", "nation", "version"]);

        let nations = &sets[1].entities;
        assert_eq!(nations.len(), 2);
        assert_eq!(nations[0].id, "afghanistan");
        assert_eq!(nations[0].name, "AFGHANISTAN");
        assert_eq!(nations[1].name, "BONAIRE, SAINT EUSTATIUS, AND SABA");

        assert_eq!(
            sets[2].entities,
            vec![Entity {
                id: "1751_2014".into(),
                name: "1751-2014".into()
            }]
        );
    }

    #[test]
    fn datapoints_should_drop_missing_values() {
        let (_, nation) = tables();
        let series = extract_datapoints(&nation).unwrap();
        let gas = series
            .iter()
            .find(|s| s.concept == "carbon_emissions_gas_fuel_consumption")
            .unwrap();
        assert_eq!(gas.data.height(), 1);
        assert_eq!(
            gas.data.get_column_names(),
            vec![COL::NATION, COL::VERSION, COL::YEAR, gas.concept.as_str()]
        );
        assert_eq!(
            gas.file_name(),
            "ddf--datapoints--carbon_emissions_gas_fuel_consumption--by--nation--version--year.csv"
        );
        let total = series
            .iter()
            .find(|s| s.concept == "total_carbon_emissions")
            .unwrap();
        assert_eq!(total.data.height(), 3);
    }

    #[test]
    fn test_concepts_to_df() {
        let df = concepts_to_df(&[Concept::discrete(COL::YEAR, ConceptType::Time)]).unwrap();
        assert_eq!(
            df.get_column_names(),
            vec![COL::CONCEPT, COL::NAME, COL::CONCEPT_TYPE]
        );
        assert_eq!(
            df.column(COL::CONCEPT_TYPE).unwrap().str().unwrap().get(0),
            Some("time")
        );
    }
}
