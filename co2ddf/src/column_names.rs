//! This module stores the column names used across the source tables and the DDF output tables.
//! Source headers are normalized (see `ids::normalize_column_name`) before being compared
//! against these names.

// Keys shared by source and output tables
pub const YEAR: &str = "year";
pub const NATION: &str = "nation";
pub const GLOBAL: &str = "global";
pub const VERSION: &str = "version";
pub const NAME: &str = "name";

/// Added to the nation table to keep the source spelling next to the normalized id
pub const NATION_NAME: &str = "nation_name";

// Concept tables
pub const CONCEPT: &str = "concept";
pub const CONCEPT_TYPE: &str = "concept_type";

// Index file
pub const INDEX_KEY: &str = "key";
pub const INDEX_VALUE: &str = "value";
pub const INDEX_FILE: &str = "file";

/// Malformed header found in some downloads of the global file
pub const MALFORMED_YEAR: &str = "year\"";

/// Singleton entity of the `global` domain
pub const WORLD_ID: &str = "world";
pub const WORLD_NAME: &str = "World";
