//! Ordered collection of the recipes of one session.
//!
//! Records are appended or removed; the only in-place change is the
//! replacement of a record by its rescaled version after a correction.
use crate::Stoichiometry::correction::{CorrectionOutcome, apply_correction_with_tolerance};
use crate::Stoichiometry::errors::RecipeError;
use crate::Stoichiometry::recipe_calc::RecipeRecord;
use log::info;

#[derive(Debug, Clone, Default)]
pub struct RecipeStore {
    records: Vec<RecipeRecord>,
}

impl RecipeStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Appends a record and returns its position.
    pub fn add(&mut self, record: RecipeRecord) -> usize {
        info!("recipe {} added to the list", record.name);
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> Result<RecipeRecord, RecipeError> {
        if index >= self.records.len() {
            return Err(RecipeError::RecordNotFound(index));
        }
        let record = self.records.remove(index);
        info!("recipe {} removed from the list", record.name);
        Ok(record)
    }

    pub fn get(&self, index: usize) -> Option<&RecipeRecord> {
        self.records.get(index)
    }

    /// Position of the first record called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|r| r.name == name)
    }

    pub fn records(&self) -> &[RecipeRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecipeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Applies a correction to the record at `index`. The stored record is
    /// replaced only when the correction actually rescales it.
    pub fn apply_correction(
        &mut self,
        index: usize,
        observed: &str,
        actual_weight: f64,
        tolerance: f64,
    ) -> Result<CorrectionOutcome, RecipeError> {
        let record = self
            .records
            .get(index)
            .ok_or(RecipeError::RecordNotFound(index))?;
        let outcome = apply_correction_with_tolerance(record, observed, actual_weight, tolerance)?;
        if let CorrectionOutcome::Corrected(report) = &outcome {
            self.records[index] = report.record.clone();
            info!(
                "recipe {} rescaled to {:.4} g",
                report.record.name, report.record.target_mass
            );
        }
        Ok(outcome)
    }
}
