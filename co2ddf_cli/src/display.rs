use comfy_table::{presets::NOTHING, *};
use itertools::izip;

use co2ddf::{RunSummary, COL};
use polars::frame::DataFrame;

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_style(comfy_table::TableComponent::BottomBorder, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─')
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::BottomBorderIntersections, '─')
        .set_style(comfy_table::TableComponent::TopBorder, '─')
        .set_style(comfy_table::TableComponent::TopBorderIntersections, '─');
    table
}

/// Print a concepts frame (`concept`, `name`, `concept_type`) as a table
pub fn display_concepts(concepts: &DataFrame) -> anyhow::Result<()> {
    let mut table = base_table();
    table.set_header(vec![
        Cell::new("Concept").add_attribute(Attribute::Bold),
        Cell::new("Type").add_attribute(Attribute::Bold),
        Cell::new("Name").add_attribute(Attribute::Bold),
    ]);
    for (concept, concept_type, name) in izip!(
        concepts.column(COL::CONCEPT)?.str()?,
        concepts.column(COL::CONCEPT_TYPE)?.str()?,
        concepts.column(COL::NAME)?.str()?,
    ) {
        table.add_row(vec![
            concept.unwrap_or_default(),
            concept_type.unwrap_or_default(),
            name.unwrap_or_default(),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_summary(summary: &RunSummary) {
    let mut table = base_table();
    table
        .add_row(vec![
            Cell::new("Files written").add_attribute(Attribute::Bold),
            summary.files.len().into(),
        ])
        .add_row(vec![
            Cell::new("Index").add_attribute(Attribute::Bold),
            summary
                .index
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".into())
                .into(),
        ])
        .add_row(vec![
            Cell::new("Manifest").add_attribute(Attribute::Bold),
            summary
                .manifest
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".into())
                .into(),
        ])
        .add_row(vec![
            Cell::new("Validation issues").add_attribute(Attribute::Bold),
            summary.validation.issues.len().into(),
        ]);
    if let Some(column) = table.column_mut(0) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    println!("\n{}", table);
    for issue in &summary.validation.issues {
        println!("  - {issue}");
    }
}
