//! # Over-weighing correction
//!
//! A precursor weighed in excess cannot be taken back out of the batch. The only
//! remedy is to scale every other precursor up by `ratio = actual / original`
//! so the stoichiometric ratios stay exactly as designed. The observed line keeps
//! the mass actually weighed (nothing more to add), every other line gets
//! `weight * (ratio - 1)` more, and the batch target mass grows by the same ratio.
//!
//! Under-weighing or exact weighing needs no rescaling: the missing amount is
//! simply added later.
use crate::Stoichiometry::errors::RecipeError;
use crate::Stoichiometry::recipe_calc::RecipeRecord;
use log::{info, warn};
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};

/// Relative band around the original weight treated as exact weighing.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// One weighing observation for a component of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionObservation {
    /// precursor name or element symbol
    pub observed: String,
    /// g
    pub actual_weight: f64,
}

impl CorrectionObservation {
    pub fn new(observed: &str, actual_weight: f64) -> Self {
        Self {
            observed: observed.to_string(),
            actual_weight,
        }
    }

    pub fn apply_to(&self, record: &RecipeRecord) -> Result<CorrectionOutcome, RecipeError> {
        apply_correction(record, &self.observed, self.actual_weight)
    }
}

/// What has to happen with one precursor after the correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAdjustment {
    pub element: String,
    pub precursor_name: String,
    pub original_weight: f64,
    pub new_weight: f64,
    /// g still to add on top of what the original recipe asked for
    pub add_more: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionReport {
    /// the rescaled recipe
    pub record: RecipeRecord,
    pub ratio: f64,
    pub observed_precursor: String,
    /// g weighed above the original
    pub excess: f64,
    pub adjustments: Vec<LineAdjustment>,
}

impl CorrectionReport {
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["precursor", "original, g", "new total, g", "add more, g"]);
        for adj in &self.adjustments {
            table.add_row(row![
                adj.precursor_name,
                format!("{:.5}", adj.original_weight),
                format!("{:.5}", adj.new_weight),
                format!("{:.5}", adj.add_more)
            ]);
        }
        table
    }

    pub fn pretty_print(&self) {
        println!(
            "__________{}: {} over-weighed by {:.5} g, scale x{:.4}__________",
            self.record.name, self.observed_precursor, self.excess, self.ratio
        );
        self.to_table().printstd();
        println!("new total mass: {:.4} g", self.record.target_mass);
        if let Some(additives) = &self.record.additives {
            additives.pretty_print();
        }
        println!("_____________________________________________________________");
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CorrectionOutcome {
    /// actual <= original: the record stays as it is
    NoCorrectionNeeded {
        original_weight: f64,
        actual_weight: f64,
    },
    Corrected(CorrectionReport),
}

impl CorrectionOutcome {
    pub fn is_corrected(&self) -> bool {
        matches!(self, CorrectionOutcome::Corrected(_))
    }
}

/// Rescales `record` after `observed` was weighed at `actual_weight` grams.
pub fn apply_correction(
    record: &RecipeRecord,
    observed: &str,
    actual_weight: f64,
) -> Result<CorrectionOutcome, RecipeError> {
    apply_correction_with_tolerance(record, observed, actual_weight, WEIGHT_TOLERANCE)
}

pub fn apply_correction_with_tolerance(
    record: &RecipeRecord,
    observed: &str,
    actual_weight: f64,
    tolerance: f64,
) -> Result<CorrectionOutcome, RecipeError> {
    if !(actual_weight.is_finite() && actual_weight >= 0.0) {
        return Err(RecipeError::InvalidWeight(actual_weight));
    }
    let position = record
        .line_position(observed)
        .ok_or_else(|| RecipeError::ComponentNotFound(observed.to_string()))?;
    let observed_line = &record.lines[position];
    let original = observed_line.weight;
    if !(original > 0.0) {
        return Err(RecipeError::ZeroOriginalWeight(
            observed_line.precursor_name.clone(),
        ));
    }

    if actual_weight <= original * (1.0 + tolerance) {
        info!(
            "{}: {} weighed {} g against {} g, no rescaling needed",
            record.name, observed_line.precursor_name, actual_weight, original
        );
        return Ok(CorrectionOutcome::NoCorrectionNeeded {
            original_weight: original,
            actual_weight,
        });
    }

    let ratio = actual_weight / original;
    warn!(
        "{}: {} over-weighed by {:.5} g, scaling the batch by {:.6}",
        record.name,
        observed_line.precursor_name,
        actual_weight - original,
        ratio
    );

    let mut corrected = record.clone();
    let mut adjustments = Vec::with_capacity(record.lines.len());
    for (i, line) in corrected.lines.iter_mut().enumerate() {
        let original_weight = line.weight;
        if i == position {
            line.weight = actual_weight;
        } else {
            line.weight = original_weight * ratio;
        }
        adjustments.push(LineAdjustment {
            element: line.element.clone(),
            precursor_name: line.precursor_name.clone(),
            original_weight,
            new_weight: line.weight,
            add_more: if i == position {
                0.0
            } else {
                original_weight * (ratio - 1.0)
            },
        });
    }
    corrected.target_mass = record.target_mass * ratio;
    corrected.scale_factor = record.scale_factor * ratio;
    corrected.additives = record.additives.as_ref().map(|a| a.scaled(ratio));

    Ok(CorrectionOutcome::Corrected(CorrectionReport {
        record: corrected,
        ratio,
        observed_precursor: observed_line.precursor_name.clone(),
        excess: actual_weight - original,
        adjustments,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stoichiometry::additives::{AdditiveConfig, attach_additives};
    use crate::Stoichiometry::precursors::PrecursorRegistry;
    use crate::Stoichiometry::recipe_calc::{CompositionInput, compute_recipe};
    use approx::assert_relative_eq;

    fn bzy() -> RecipeRecord {
        let composition = CompositionInput::new()
            .with("Ba", 1.0)
            .with("Zr", 0.8)
            .with("Y", 0.2);
        compute_recipe(&composition, 5.0, &PrecursorRegistry::oxide()).unwrap()
    }

    #[test]
    fn test_single_line_scale_up() {
        let record = compute_recipe(
            &CompositionInput::new().with("Ba", 1.0),
            5.0,
            &PrecursorRegistry::oxide(),
        )
        .unwrap();
        let outcome = apply_correction(&record, "BaCO3", 5.5).unwrap();
        let CorrectionOutcome::Corrected(report) = outcome else {
            panic!("expected a correction");
        };
        assert_relative_eq!(report.ratio, 1.1, max_relative = 1e-12);
        assert_relative_eq!(report.record.target_mass, 5.5, max_relative = 1e-12);
        assert_eq!(report.adjustments.len(), 1);
        assert_eq!(report.adjustments[0].add_more, 0.0);
        assert_eq!(report.record.lines[0].weight, 5.5);
    }

    #[test]
    fn test_equal_weight_is_no_op() {
        let record = bzy();
        let original = record.line("ZrO2").unwrap().weight;
        let outcome = apply_correction(&record, "ZrO2", original).unwrap();
        assert!(matches!(
            outcome,
            CorrectionOutcome::NoCorrectionNeeded { .. }
        ));
        let outcome = apply_correction(&record, "ZrO2", original * 0.5).unwrap();
        assert!(!outcome.is_corrected());
    }

    #[test]
    fn test_monotonic_scale_up() {
        let record = bzy();
        let original = record.line("Y2O3").unwrap().weight;
        let actual = original + 0.01;
        let CorrectionOutcome::Corrected(report) =
            apply_correction(&record, "Y2O3", actual).unwrap()
        else {
            panic!("expected a correction");
        };
        for (old, new) in record.lines.iter().zip(report.record.lines.iter()) {
            if old.precursor_name == "Y2O3" {
                assert_eq!(new.weight, actual);
            } else {
                assert!(new.weight > old.weight);
                assert_relative_eq!(new.weight / old.weight, report.ratio, max_relative = 1e-12);
            }
        }
        assert_relative_eq!(
            report.record.total_weight(),
            report.record.target_mass,
            max_relative = 1e-9
        );
        let added: f64 = report.adjustments.iter().map(|a| a.add_more).sum();
        assert_relative_eq!(
            added + report.excess,
            report.record.target_mass - record.target_mass,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_observed_by_element_symbol() {
        let record = bzy();
        let original = record.line("Ba").unwrap().weight;
        let outcome = apply_correction(&record, "Ba", original * 1.02).unwrap();
        let CorrectionOutcome::Corrected(report) = outcome else {
            panic!("expected a correction");
        };
        assert_eq!(report.observed_precursor, "BaCO3");
    }

    #[test]
    fn test_unknown_component() {
        let record = bzy();
        let snapshot = record.clone();
        let result = apply_correction(&record, "CeO2", 1.0);
        assert_eq!(
            result,
            Err(RecipeError::ComponentNotFound("CeO2".to_string()))
        );
        assert_eq!(record, snapshot);
    }

    #[test]
    fn test_zero_original_weight() {
        let mut record = bzy();
        record.lines[1].weight = 0.0;
        let result = apply_correction(&record, "ZrO2", 1.0);
        assert!(matches!(result, Err(RecipeError::ZeroOriginalWeight(_))));
    }

    #[test]
    fn test_invalid_weight() {
        let record = bzy();
        assert!(matches!(
            apply_correction(&record, "ZrO2", f64::NAN),
            Err(RecipeError::InvalidWeight(_))
        ));
        assert!(matches!(
            apply_correction(&record, "ZrO2", -0.1),
            Err(RecipeError::InvalidWeight(_))
        ));
    }

    #[test]
    fn test_additives_follow_ratio() {
        let composition = CompositionInput::new().with("La", 0.6).with("Sr", 0.4).with("Co", 1.0);
        let mut record = compute_recipe(&composition, 4.0, &PrecursorRegistry::nitrate()).unwrap();
        attach_additives(&mut record, &AdditiveConfig::default());
        let before = record.additives.clone().unwrap();
        let original = record.line("Co").unwrap().weight;
        let CorrectionOutcome::Corrected(report) =
            apply_correction(&record, "Co", original * 1.25).unwrap()
        else {
            panic!("expected a correction");
        };
        let after = report.record.additives.unwrap();
        assert_relative_eq!(after.edta_mass, before.edta_mass * 1.25, max_relative = 1e-12);
        assert_relative_eq!(report.record.scale_factor, 1.25, max_relative = 1e-12);
        assert_relative_eq!(
            report.record.total_formula_weight,
            record.total_formula_weight
        );
    }
}
