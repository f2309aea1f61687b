//! Chelating agents and pH adjustment for the nitrate sol-gel route.
//!
//! All quantities follow from the total moles of metal ions in the batch:
//! `n_metal = (target_mass / FW) * Σ index_i`. EDTA is dosed 1:1 and citric acid
//! 2:1 per mole of metal. The ammonia volume counts the acidic protons of both
//! chelators that have to be neutralised by concentrated aqueous ammonia; it is a
//! fixed theoretical estimate and the pH still has to be checked by measurement.
use crate::Stoichiometry::errors::{RecipeError, RecipeWarning};
use crate::Stoichiometry::precursors::PrecursorRegistry;
use crate::Stoichiometry::recipe_calc::{CompositionInput, RecipeCalculator, RecipeRecord};
use log::warn;
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};

/// Constants of the additive estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditiveConfig {
    /// g/mol
    pub edta_molar_mass: f64,
    /// mol EDTA per mol metal
    pub edta_per_metal: f64,
    /// g/mol
    pub citric_acid_molar_mass: f64,
    /// mol citric acid per mol metal
    pub citric_acid_per_metal: f64,
    /// acidic protons neutralised per mol EDTA (partial neutralisation, not 4)
    pub edta_proton_equivalents: f64,
    /// acidic protons neutralised per mol citric acid
    pub citric_acid_proton_equivalents: f64,
    /// mol/L
    pub ammonia_molarity: f64,
    pub target_ph: f64,
}

impl Default for AdditiveConfig {
    fn default() -> Self {
        Self {
            edta_molar_mass: 292.24,
            edta_per_metal: 1.0,
            citric_acid_molar_mass: 210.14,
            citric_acid_per_metal: 2.0,
            edta_proton_equivalents: 3.0,
            citric_acid_proton_equivalents: 3.0,
            ammonia_molarity: 15.0,
            target_ph: 7.0,
        }
    }
}

impl AdditiveConfig {
    /// Protons to neutralise per mole of metal ions.
    pub fn proton_equivalents_per_metal(&self) -> f64 {
        self.edta_per_metal * self.edta_proton_equivalents
            + self.citric_acid_per_metal * self.citric_acid_proton_equivalents
    }

    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("edta_molar_mass", self.edta_molar_mass),
            ("citric_acid_molar_mass", self.citric_acid_molar_mass),
            ("ammonia_molarity", self.ammonia_molarity),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("{} must be positive, got {}", name, value));
            }
        }
        let non_negative = [
            ("edta_per_metal", self.edta_per_metal),
            ("citric_acid_per_metal", self.citric_acid_per_metal),
            ("edta_proton_equivalents", self.edta_proton_equivalents),
            (
                "citric_acid_proton_equivalents",
                self.citric_acid_proton_equivalents,
            ),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("{} must not be negative, got {}", name, value));
            }
        }
        if !(0.0..=14.0).contains(&self.target_ph) {
            return Err(format!("target_ph {} is outside 0..14", self.target_ph));
        }
        Ok(())
    }
}

/// Additive quantities for one nitrate batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditiveEstimate {
    pub total_metal_moles: f64,
    /// g
    pub edta_mass: f64,
    /// g
    pub citric_acid_mass: f64,
    /// mL of concentrated ammonia, advisory
    pub ammonia_volume_ml: f64,
    pub target_ph: f64,
}

impl AdditiveEstimate {
    /// Estimate from an already computed recipe. Every line counts towards the
    /// metal moles, including residual lines left by substitutions.
    pub fn from_record(record: &RecipeRecord, config: &AdditiveConfig) -> Self {
        let index_sum: f64 = record.lines.iter().map(|line| line.index).sum();
        let total_metal_moles = record.molar_scale() * index_sum;
        Self::from_metal_moles(total_metal_moles, config)
    }

    pub fn from_metal_moles(total_metal_moles: f64, config: &AdditiveConfig) -> Self {
        let protons = total_metal_moles * config.proton_equivalents_per_metal();
        Self {
            total_metal_moles,
            edta_mass: total_metal_moles * config.edta_per_metal * config.edta_molar_mass,
            citric_acid_mass: total_metal_moles
                * config.citric_acid_per_metal
                * config.citric_acid_molar_mass,
            ammonia_volume_ml: protons / config.ammonia_molarity * 1000.0,
            target_ph: config.target_ph,
        }
    }

    /// Same batch scaled by `ratio`, used after an over-weighing correction.
    pub fn scaled(&self, ratio: f64) -> Self {
        Self {
            total_metal_moles: self.total_metal_moles * ratio,
            edta_mass: self.edta_mass * ratio,
            citric_acid_mass: self.citric_acid_mass * ratio,
            ammonia_volume_ml: self.ammonia_volume_ml * ratio,
            target_ph: self.target_ph,
        }
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["metal ions, mol", format!("{:.6}", self.total_metal_moles)]);
        table.add_row(row!["EDTA, g", format!("{:.4}", self.edta_mass)]);
        table.add_row(row!["citric acid, g", format!("{:.4}", self.citric_acid_mass)]);
        table.add_row(row!["NH3 (aq), mL (est.)", format!("{:.2}", self.ammonia_volume_ml)]);
        table.add_row(row!["target pH", format!("{:.1}", self.target_ph)]);
        table
    }

    pub fn pretty_print(&self) {
        println!("__________sol-gel additives__________");
        self.to_table().printstd();
        println!("{}", RecipeWarning::AmmoniaVolumeEstimate);
    }
}

/// Attaches the additive estimate to a nitrate recipe and flags the ammonia
/// volume as advisory.
pub fn attach_additives(record: &mut RecipeRecord, config: &AdditiveConfig) {
    let estimate = AdditiveEstimate::from_record(record, config);
    warn!(
        "{}: ammonia volume {:.2} mL is a theoretical estimate, verify pH {} by measurement",
        record.name, estimate.ammonia_volume_ml, estimate.target_ph
    );
    record.additives = Some(estimate);
    if !record.warnings.contains(&RecipeWarning::AmmoniaVolumeEstimate) {
        record.warnings.push(RecipeWarning::AmmoniaVolumeEstimate);
    }
}

/// Additive quantities for `composition` weighed to `target_mass`.
pub fn estimate_additives(
    composition: &CompositionInput,
    target_mass: f64,
    registry: &PrecursorRegistry,
    config: &AdditiveConfig,
) -> Result<AdditiveEstimate, RecipeError> {
    let record = RecipeCalculator::new(registry).compute(composition, target_mass)?;
    Ok(AdditiveEstimate::from_record(&record, config))
}
