//! Error and advisory types shared by the calculator, the additive estimator
//! and the correction engine.
use crate::Stoichiometry::precursors::SynthesisRoute;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that block a calculation or a correction.
///
/// None of them is fatal: every failure is scoped to one calculation attempt and
/// the recipe store is never touched when one is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecipeError {
    /// Requested symbol is absent from the registry of the chosen route.
    #[error("unknown element '{symbol}' for the {route} route")]
    UnknownElement {
        symbol: String,
        route: SynthesisRoute,
    },

    /// Zero or negative total formula weight.
    #[error("degenerate composition: total formula weight is {total_formula_weight}")]
    DegenerateComposition { total_formula_weight: f64 },

    /// A substitution precursor supplies more of a secondary element than the
    /// target composition allows.
    #[error(
        "{precursor} supplies {supplied:.6} of {secondary} but the target index is {target:.6} (excess {excess:.6})"
    )]
    OverSuppliedElement {
        secondary: String,
        precursor: String,
        supplied: f64,
        target: f64,
        excess: f64,
    },

    /// Correction target matches no line of the record.
    #[error("component '{0}' is not part of this recipe")]
    ComponentNotFound(String),

    /// Correction target has a zero original weight, so no ratio exists.
    #[error("original weight of '{0}' is zero, the recipe cannot be rescaled from it")]
    ZeroOriginalWeight(String),

    #[error("invalid index {index} for element '{element}': indices must be finite and non-negative")]
    InvalidIndex { element: String, index: f64 },

    #[error("target mass must be a positive number of grams, got {0}")]
    InvalidTargetMass(f64),

    #[error("invalid molar mass {molar_mass} for '{symbol}': must be positive")]
    InvalidMolarMass { symbol: String, molar_mass: f64 },

    #[error("multiplicity of '{symbol}' must be at least 1")]
    InvalidMultiplicity { symbol: String },

    #[error("weighed mass must be a finite, non-negative number of grams, got {0}")]
    InvalidWeight(f64),

    #[error("invalid substitution rule: {0}")]
    InvalidSubstitutionRule(String),

    #[error("no recipe at position {0}")]
    RecordNotFound(usize),
}

/// Advisory conditions. The calculation proceeds, the caller shows them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecipeWarning {
    /// Sum of the composition indices is not an integer.
    NonIntegerCompositionSum { sum: f64 },
    /// Ammonia volume is a fixed stoichiometric estimate, not a titration result.
    AmmoniaVolumeEstimate,
}

impl fmt::Display for RecipeWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecipeWarning::NonIntegerCompositionSum { sum } => {
                write!(f, "sum of composition indices is {}, not an integer", sum)
            }
            RecipeWarning::AmmoniaVolumeEstimate => write!(
                f,
                "ammonia volume is a theoretical estimate, verify the pH by direct measurement"
            ),
        }
    }
}
