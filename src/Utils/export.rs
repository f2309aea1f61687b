//! # Export of weighing recipes
//!
//! Renders the recipes of a session into a report of four sections:
//! 1. precursor reference table (compound, molar mass, multiplicity, effective molar mass)
//! 2. notes: advisories and corrections per sample
//! 3. weighing table: one row per sample, one column per precursor plus the total
//!    mass and, when any sample uses the nitrate route, EDTA, citric acid,
//!    ammonia volume and target pH
//! 4. composition table: one row per sample, one column per element index
//!
//! Each section is a plain header + rows table. It is printed with prettytable
//! and written as one CSV file per section. The weighing table can be read back
//! from its CSV file.
use crate::Stoichiometry::recipe_calc::RecipeRecord;
use log::info;
use prettytable::{Cell, Row, Table};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SECTION_FILES: [&str; 4] = [
    "1_precursors.csv",
    "2_notes.csv",
    "3_weighing.csv",
    "4_composition.csv",
];

const SAMPLE: &str = "Sample";
const ROUTE: &str = "Route";
const TOTAL: &str = "Total (g)";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed weighing table: {0}")]
    Malformed(String),
}

/// One titled table of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportSection {
    fn new(title: &str, header: Vec<String>) -> Self {
        Self {
            title: title.to_string(),
            header,
            rows: Vec::new(),
        }
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(Row::new(self.header.iter().map(|h| Cell::new(h)).collect()));
        for row in &self.rows {
            table.add_row(Row::new(row.iter().map(|c| Cell::new(c)).collect()));
        }
        table
    }

    pub fn to_csv_string(&self) -> Result<String, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| ExportError::Malformed(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub sections: Vec<ReportSection>,
}

fn fixed(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

fn trimmed(value: f64, decimals: usize) -> String {
    let text = fixed(value, decimals);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

impl ExportReport {
    /// Builds the four sections from `records`, masses with `decimals` decimals.
    pub fn from_records(records: &[RecipeRecord], decimals: usize) -> Self {
        // union of precursors in order of first appearance, keyed by name and molar mass
        let mut precursors: Vec<(&str, &str, f64, u32)> = Vec::new();
        for line in records.iter().flat_map(|r| r.lines.iter()) {
            let known = precursors
                .iter()
                .any(|(name, _, mw, _)| *name == line.precursor_name && *mw == line.molar_mass);
            if !known {
                precursors.push((
                    line.precursor_name.as_str(),
                    line.element.as_str(),
                    line.molar_mass,
                    line.multiplicity,
                ));
            }
        }

        let mut reference = ReportSection::new(
            "Precursors",
            vec![
                "Precursor".to_string(),
                "Element".to_string(),
                "Molar mass (g/mol)".to_string(),
                "n".to_string(),
                "Effective molar mass (g/mol)".to_string(),
            ],
        );
        for (name, element, mw, n) in &precursors {
            reference.rows.push(vec![
                name.to_string(),
                element.to_string(),
                trimmed(*mw, 4),
                n.to_string(),
                fixed(mw / *n as f64, 4),
            ]);
        }

        let mut notes = ReportSection::new("Notes", vec![SAMPLE.to_string(), "Note".to_string()]);
        for record in records {
            for warning in &record.warnings {
                notes.rows.push(vec![record.name.clone(), warning.to_string()]);
            }
            if record.scale_factor != 1.0 {
                notes.rows.push(vec![
                    record.name.clone(),
                    format!(
                        "rescaled x{:.6} after over-weighing correction",
                        record.scale_factor
                    ),
                ]);
            }
        }

        let mut precursor_columns: Vec<&str> = Vec::new();
        for (name, ..) in &precursors {
            if !precursor_columns.contains(name) {
                precursor_columns.push(name);
            }
        }
        let with_additives = records.iter().any(|r| r.additives.is_some());
        let mut header = vec![SAMPLE.to_string(), ROUTE.to_string()];
        header.extend(precursor_columns.iter().map(|c| c.to_string()));
        header.push(TOTAL.to_string());
        if with_additives {
            header.extend(
                ["EDTA (g)", "Citric acid (g)", "NH3 (mL, est.)", "Target pH"]
                    .iter()
                    .map(|c| c.to_string()),
            );
        }
        let mut weighing = ReportSection::new("Weighing", header);
        for record in records {
            let mut row = vec![record.name.clone(), record.route.to_string()];
            for column in &precursor_columns {
                let cell = record
                    .lines
                    .iter()
                    .find(|line| line.precursor_name == *column)
                    .map(|line| fixed(line.weight, decimals))
                    .unwrap_or_default();
                row.push(cell);
            }
            row.push(fixed(record.target_mass, decimals));
            if with_additives {
                match &record.additives {
                    Some(a) => row.extend([
                        fixed(a.edta_mass, decimals),
                        fixed(a.citric_acid_mass, decimals),
                        fixed(a.ammonia_volume_ml, 2),
                        fixed(a.target_ph, 1),
                    ]),
                    None => row.extend(std::iter::repeat_n(String::new(), 4)),
                }
            }
            weighing.rows.push(row);
        }

        let mut elements: Vec<&str> = Vec::new();
        for record in records {
            for element in record.composition.elements() {
                if !elements.contains(&element) {
                    elements.push(element);
                }
            }
        }
        let mut header = vec![SAMPLE.to_string()];
        header.extend(elements.iter().map(|e| e.to_string()));
        let mut composition = ReportSection::new("Composition", header);
        for record in records {
            let mut row = vec![record.name.clone()];
            for element in &elements {
                let present = record.composition.elements().contains(element);
                row.push(if present {
                    trimmed(record.composition.get(element), 4)
                } else {
                    String::new()
                });
            }
            composition.rows.push(row);
        }

        Self {
            sections: vec![reference, notes, weighing, composition],
        }
    }

    pub fn precursors(&self) -> &ReportSection {
        &self.sections[0]
    }

    pub fn notes(&self) -> &ReportSection {
        &self.sections[1]
    }

    pub fn weighing(&self) -> &ReportSection {
        &self.sections[2]
    }

    pub fn composition(&self) -> &ReportSection {
        &self.sections[3]
    }

    pub fn print(&self) {
        for section in &self.sections {
            println!(
                "___________________{}________________________",
                section.title.to_uppercase()
            );
            if section.rows.is_empty() {
                println!("(empty)");
            } else {
                section.to_table().printstd();
            }
        }
        println!("_____________________________________________________________");
    }

    /// Writes one CSV file per section into `dir` and returns their paths.
    pub fn write_csv(&self, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.sections.len());
        for (section, file_name) in self.sections.iter().zip(SECTION_FILES) {
            let path = dir.join(file_name);
            fs::write(&path, section.to_csv_string()?)?;
            written.push(path);
        }
        info!("report written to {}", dir.display());
        Ok(written)
    }
}

/// One sample of the weighing table as read back from CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct WeighingRow {
    pub sample: String,
    /// (precursor, g), only the precursors the sample uses
    pub masses: Vec<(String, f64)>,
    pub total_mass: f64,
}

impl WeighingRow {
    pub fn mass_of(&self, precursor: &str) -> Option<f64> {
        self.masses
            .iter()
            .find(|(name, _)| name == precursor)
            .map(|(_, mass)| *mass)
    }
}

pub fn read_weighing_csv(path: &Path) -> Result<Vec<WeighingRow>, ExportError> {
    let file = fs::File::open(path)?;
    parse_weighing_csv(file)
}

pub fn parse_weighing_csv<R: Read>(reader: R) -> Result<Vec<WeighingRow>, ExportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);
    let header = reader.headers()?.clone();
    let column = |name: &str| {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ExportError::Malformed(format!("no '{}' column", name)))
    };
    let sample_col = column(SAMPLE)?;
    let route_col = column(ROUTE)?;
    let total_col = column(TOTAL)?;
    if total_col <= route_col {
        return Err(ExportError::Malformed(
            "precursor columns must sit between route and total".to_string(),
        ));
    }

    let parse = |text: &str, what: &str| {
        text.trim()
            .parse::<f64>()
            .map_err(|_| ExportError::Malformed(format!("'{}' is not a number ({})", text, what)))
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let sample = record.get(sample_col).unwrap_or_default().to_string();
        let mut masses = Vec::new();
        for j in route_col + 1..total_col {
            let cell = record.get(j).unwrap_or_default();
            if cell.trim().is_empty() {
                continue;
            }
            masses.push((header[j].to_string(), parse(cell, &header[j])?));
        }
        let total_mass = parse(record.get(total_col).unwrap_or_default(), TOTAL)?;
        rows.push(WeighingRow {
            sample,
            masses,
            total_mass,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stoichiometry::additives::{AdditiveConfig, attach_additives};
    use crate::Stoichiometry::correction::{CorrectionOutcome, apply_correction};
    use crate::Stoichiometry::precursors::PrecursorRegistry;
    use crate::Stoichiometry::recipe_calc::{CompositionInput, compute_recipe};

    fn records() -> Vec<RecipeRecord> {
        let oxide = PrecursorRegistry::oxide();
        let nitrate = PrecursorRegistry::nitrate();
        let bzy = CompositionInput::new()
            .with("Ba", 1.0)
            .with("Zr", 0.8)
            .with("Y", 0.2);
        let bcfzy = CompositionInput::new()
            .with("Ba", 1.0)
            .with("Co", 0.4)
            .with("Fe", 0.4)
            .with("Zr", 0.1)
            .with("Y", 0.1);
        let first = compute_recipe(&bzy, 5.0, &oxide).unwrap();
        let mut second = compute_recipe(&bcfzy, 3.0, &nitrate).unwrap();
        attach_additives(&mut second, &AdditiveConfig::default());
        vec![first, second]
    }

    #[test]
    fn test_four_sections() {
        let report = ExportReport::from_records(&records(), 4);
        assert_eq!(report.sections.len(), 4);
        // BaCO3 ZrO2 Y2O3 + five nitrate precursors
        assert_eq!(report.precursors().rows.len(), 8);
        assert!(report.weighing().header.contains(&"EDTA (g)".to_string()));
        assert_eq!(report.weighing().rows.len(), 2);
        // oxide row has empty additive cells
        assert_eq!(report.weighing().rows[0].last().unwrap(), "");
        assert_eq!(
            report.composition().header,
            vec!["Sample", "Ba", "Zr", "Y", "Co", "Fe"]
        );
        assert_eq!(report.composition().rows[0][1], "1");
        assert_eq!(report.composition().rows[0][2], "0.8");
        assert_eq!(report.composition().rows[0][4], "");
        assert_eq!(report.notes().rows.len(), 1);
    }

    #[test]
    fn test_oxide_only_has_no_additive_columns() {
        let only_oxide = vec![records().remove(0)];
        let report = ExportReport::from_records(&only_oxide, 4);
        assert_eq!(
            report.weighing().header,
            vec!["Sample", "Route", "BaCO3", "ZrO2", "Y2O3", "Total (g)"]
        );
    }

    #[test]
    fn test_csv_round_trip() {
        let mut records = records();
        let original = records[0].line("ZrO2").unwrap().weight;
        if let CorrectionOutcome::Corrected(report) =
            apply_correction(&records[0], "ZrO2", original + 0.05).unwrap()
        {
            records[0] = report.record;
        }
        let report = ExportReport::from_records(&records, 4);
        let dir = tempfile::tempdir().unwrap();
        let written = report.write_csv(dir.path()).unwrap();
        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|p| p.exists()));

        let rows = read_weighing_csv(&dir.path().join(SECTION_FILES[2])).unwrap();
        assert_eq!(rows.len(), records.len());
        for (row, record) in rows.iter().zip(&records) {
            assert_eq!(row.sample, record.name);
            assert_eq!(row.masses.len(), record.lines.len());
            for line in &record.lines {
                let mass = row.mass_of(&line.precursor_name).unwrap();
                assert!((mass - line.weight).abs() <= 0.5e-4 + 1e-12);
            }
            assert!((row.total_mass - record.target_mass).abs() <= 0.5e-4 + 1e-12);
        }
    }

    #[test]
    fn test_malformed_weighing_csv() {
        let text = "Sample,Route,BaCO3,Total (g)\nBZY,oxide,abc,5.0\n";
        assert!(matches!(
            parse_weighing_csv(text.as_bytes()),
            Err(ExportError::Malformed(_))
        ));
        let text = "Sample,BaCO3\nBZY,5.0\n";
        assert!(parse_weighing_csv(text.as_bytes()).is_err());
    }

    #[test]
    fn test_csv_quotes_names_with_commas() {
        let mut section =
            ReportSection::new("Notes", vec!["Sample".to_string(), "Note".to_string()]);
        section.rows.push(vec!["BZY".to_string(), "a, b".to_string()]);
        let text = section.to_csv_string().unwrap();
        assert_eq!(text, "Sample,Note\nBZY,\"a, b\"\n");
    }
}
