//! # Recipe Calculator
//!
//! Converts a set of (element, index) pairs and a target product mass into the
//! masses of precursors to weigh.
//!
//! For every element with index > 0 the precursor is resolved from the route's
//! registry and its effective molar mass `M/n` is taken. The formula weight is
//! `FW = Σ index_i * M_i/n_i` and every precursor receives
//! `weight_i = (index_i * M_i/n_i / FW) * target_mass`, so the weights always add
//! up to the target mass.
//!
//! Before the formula weight is formed, the registry's substitution rules are
//! evaluated: a precursor that co-supplies another target element (BaF2 brings
//! barium along with fluorine) reduces that element's index to the residual that
//! still has to come from its standard precursor.
use crate::Stoichiometry::additives::AdditiveEstimate;
use crate::Stoichiometry::errors::{RecipeError, RecipeWarning};
use crate::Stoichiometry::precursors::{PrecursorEntry, PrecursorRegistry, SynthesisRoute};
use log::{debug, info, warn};
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distance from the nearest integer above which the index sum is reported.
pub const INTEGER_SUM_TOLERANCE: f64 = 1e-6;
/// Residuals of substituted elements inside this band count as zero.
pub const SUBSTITUTION_EPSILON: f64 = 1e-9;

/// Element order used for auto-generated sample names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NameOrdering {
    /// order in which the elements were entered
    #[default]
    InputOrder,
    Lexicographic,
}

/// Ordered element -> index mapping of the target compound.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompositionInput {
    pairs: Vec<(String, f64)>,
}

impl CompositionInput {
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    pub fn with(mut self, element: &str, index: f64) -> Self {
        self.insert(element, index);
        self
    }

    /// Sets the index of `element`. An element already present keeps its position.
    pub fn insert(&mut self, element: &str, index: f64) {
        match self.pairs.iter_mut().find(|(el, _)| el == element) {
            Some(pair) => pair.1 = index,
            None => self.pairs.push((element.to_string(), index)),
        }
    }

    /// Index of `element`, 0 when absent.
    pub fn get(&self, element: &str) -> f64 {
        self.pairs
            .iter()
            .find(|(el, _)| el == element)
            .map(|(_, index)| *index)
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.pairs.iter().map(|(el, index)| (el.as_str(), *index))
    }

    /// Pairs with index > 0, i.e. the elements that are actually weighed.
    pub fn included(&self) -> impl Iterator<Item = (&str, f64)> {
        self.iter().filter(|(_, index)| *index > 0.0)
    }

    pub fn elements(&self) -> Vec<&str> {
        self.pairs.iter().map(|(el, _)| el.as_str()).collect()
    }

    pub fn index_sum(&self) -> f64 {
        self.included().map(|(_, index)| index).sum()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for CompositionInput {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut composition = CompositionInput::new();
        for (element, index) in iter {
            let element: String = element.into();
            composition.insert(&element, index);
        }
        composition
    }
}

/// One precursor to weigh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub element: String,
    pub precursor_name: String,
    pub molar_mass: f64,
    pub multiplicity: u32,
    pub index: f64,
    /// g
    pub weight: f64,
}

impl RecipeLine {
    pub fn effective_molar_mass(&self) -> f64 {
        self.molar_mass / self.multiplicity as f64
    }
}

/// A complete weighing recipe for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub name: String,
    pub route: SynthesisRoute,
    /// g
    pub target_mass: f64,
    pub lines: Vec<RecipeLine>,
    pub total_formula_weight: f64,
    /// nominal composition as entered, zero indices included
    pub composition: CompositionInput,
    /// product of all correction ratios applied so far
    pub scale_factor: f64,
    /// nitrate route only
    pub additives: Option<AdditiveEstimate>,
    pub warnings: Vec<RecipeWarning>,
}

impl RecipeRecord {
    pub fn total_weight(&self) -> f64 {
        self.lines.iter().map(|line| line.weight).sum()
    }

    /// Line whose precursor name matches `id`, otherwise whose element does.
    pub fn line_position(&self, id: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.precursor_name == id)
            .or_else(|| self.lines.iter().position(|line| line.element == id))
    }

    pub fn line(&self, id: &str) -> Option<&RecipeLine> {
        self.line_position(id).map(|i| &self.lines[i])
    }

    /// Moles of formula units in the target mass.
    pub fn molar_scale(&self) -> f64 {
        self.target_mass / self.total_formula_weight
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["element", "precursor", "index", "M/n", "weight, g"]);
        for line in &self.lines {
            table.add_row(row![
                line.element,
                line.precursor_name,
                format!("{:.4}", line.index),
                format!("{:.4}", line.effective_molar_mass()),
                format!("{:.5}", line.weight)
            ]);
        }
        table.add_row(row!["", "total", "", "", format!("{:.5}", self.total_weight())]);
        table
    }

    pub fn pretty_print(&self) {
        println!(
            "__________{} ({} route, target {:.4} g)__________",
            self.name, self.route, self.target_mass
        );
        self.to_table().printstd();
        println!("formula weight: {:.4} g/mol", self.total_formula_weight);
        if let Some(additives) = &self.additives {
            additives.pretty_print();
        }
        for warning in &self.warnings {
            println!("warning: {}", warning);
        }
        println!("_____________________________________________________________");
    }
}

struct PendingLine {
    entry: PrecursorEntry,
    index: f64,
}

/// Recipe calculator bound to one registry.
///
/// ```
/// use CeraStoich::Stoichiometry::precursors::PrecursorRegistry;
/// use CeraStoich::Stoichiometry::recipe_calc::{CompositionInput, RecipeCalculator};
/// let registry = PrecursorRegistry::oxide();
/// let composition = CompositionInput::new()
///     .with("Ba", 1.0)
///     .with("Zr", 0.8)
///     .with("Y", 0.2);
/// let record = RecipeCalculator::new(&registry)
///     .compute(&composition, 5.0)
///     .unwrap();
/// assert_eq!(record.name, "BaZr0.8Y0.2");
/// assert!((record.total_weight() - 5.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct RecipeCalculator<'a> {
    registry: &'a PrecursorRegistry,
    overrides: HashMap<String, f64>,
    name: Option<String>,
    naming: NameOrdering,
    integer_sum_tolerance: f64,
    substitution_epsilon: f64,
}

impl<'a> RecipeCalculator<'a> {
    pub fn new(registry: &'a PrecursorRegistry) -> Self {
        Self {
            registry,
            overrides: HashMap::new(),
            name: None,
            naming: NameOrdering::default(),
            integer_sum_tolerance: INTEGER_SUM_TOLERANCE,
            substitution_epsilon: SUBSTITUTION_EPSILON,
        }
    }

    /// Per-call molar mass overrides, keyed by element symbol.
    pub fn with_overrides(mut self, overrides: HashMap<String, f64>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Explicit sample name. Empty or blank names fall back to auto-naming.
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_naming(mut self, naming: NameOrdering) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_tolerances(mut self, integer_sum_tolerance: f64, substitution_epsilon: f64) -> Self {
        self.integer_sum_tolerance = integer_sum_tolerance;
        self.substitution_epsilon = substitution_epsilon;
        self
    }

    pub fn compute(
        &self,
        composition: &CompositionInput,
        target_mass: f64,
    ) -> Result<RecipeRecord, RecipeError> {
        if !(target_mass.is_finite() && target_mass > 0.0) {
            return Err(RecipeError::InvalidTargetMass(target_mass));
        }
        for (element, index) in composition.iter() {
            if !(index.is_finite() && index >= 0.0) {
                return Err(RecipeError::InvalidIndex {
                    element: element.to_string(),
                    index,
                });
            }
        }

        let mut pending = Vec::new();
        for (element, index) in composition.included() {
            let entry = self
                .registry
                .lookup_with_override(element, self.overrides.get(element).copied())?;
            pending.push(PendingLine { entry, index });
        }
        if pending.is_empty() {
            return Err(RecipeError::DegenerateComposition {
                total_formula_weight: 0.0,
            });
        }

        self.apply_substitutions(composition, &mut pending)?;

        let total_formula_weight: f64 = pending
            .iter()
            .map(|p| p.index * p.entry.effective_molar_mass())
            .sum();
        if !(total_formula_weight > 0.0) {
            return Err(RecipeError::DegenerateComposition {
                total_formula_weight,
            });
        }

        let lines: Vec<RecipeLine> = pending
            .into_iter()
            .map(|p| {
                let effective = p.entry.effective_molar_mass();
                RecipeLine {
                    weight: (p.index * effective / total_formula_weight) * target_mass,
                    element: p.entry.symbol,
                    precursor_name: p.entry.compound_name,
                    molar_mass: p.entry.molar_mass,
                    multiplicity: p.entry.multiplicity,
                    index: p.index,
                }
            })
            .collect();

        let mut warnings = Vec::new();
        let sum = composition.index_sum();
        if (sum - sum.round()).abs() > self.integer_sum_tolerance {
            warn!("composition index sum {} is not an integer", sum);
            warnings.push(RecipeWarning::NonIntegerCompositionSum { sum });
        }

        let name = match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => auto_name(composition, self.naming),
        };
        info!(
            "recipe {} ({} route): {} precursors, FW = {:.4} g/mol, target {} g",
            name,
            self.registry.route(),
            lines.len(),
            total_formula_weight,
            target_mass
        );

        Ok(RecipeRecord {
            name,
            route: self.registry.route(),
            target_mass,
            lines,
            total_formula_weight,
            composition: composition.clone(),
            scale_factor: 1.0,
            additives: None,
            warnings,
        })
    }

    /// Reduces the index of every co-supplied element to its residual.
    fn apply_substitutions(
        &self,
        composition: &CompositionInput,
        pending: &mut Vec<PendingLine>,
    ) -> Result<(), RecipeError> {
        // secondary element -> (amount supplied, supplying precursors)
        let mut supplied: Vec<(String, f64, Vec<String>)> = Vec::new();
        for rule in self.registry.rules() {
            let supplied_index = composition.get(&rule.supplied_element);
            if supplied_index <= 0.0 {
                continue;
            }
            let amount = rule.secondary_supplied(supplied_index);
            let precursor = pending
                .iter()
                .find(|p| p.entry.symbol == rule.supplied_element)
                .map(|p| p.entry.compound_name.clone())
                .unwrap_or_else(|| rule.supplied_element.clone());
            match supplied
                .iter_mut()
                .find(|(secondary, ..)| *secondary == rule.secondary_element)
            {
                Some(slot) => {
                    slot.1 += amount;
                    slot.2.push(precursor);
                }
                None => supplied.push((rule.secondary_element.clone(), amount, vec![precursor])),
            }
        }

        for (secondary, amount, precursors) in supplied {
            let target = composition.get(&secondary);
            let residual = target - amount;
            if residual < -self.substitution_epsilon {
                let precursor = precursors.join(" + ");
                warn!(
                    "{} over-supplies {}: {} against a target of {}",
                    precursor, secondary, amount, target
                );
                return Err(RecipeError::OverSuppliedElement {
                    secondary,
                    precursor,
                    supplied: amount,
                    target,
                    excess: -residual,
                });
            }
            if residual > self.substitution_epsilon {
                if let Some(line) = pending.iter_mut().find(|p| p.entry.symbol == secondary) {
                    line.index = residual;
                }
                debug!("{} residual index after substitution: {}", secondary, residual);
            } else {
                pending.retain(|p| p.entry.symbol != secondary);
                debug!("{} fully supplied by {}", secondary, precursors.join(" + "));
            }
        }
        Ok(())
    }
}

/// Computes a recipe with default options.
pub fn compute_recipe(
    composition: &CompositionInput,
    target_mass: f64,
    registry: &PrecursorRegistry,
) -> Result<RecipeRecord, RecipeError> {
    RecipeCalculator::new(registry).compute(composition, target_mass)
}

/// Compact index text: exactly 1 renders as nothing, otherwise up to 4
/// decimals with trailing zeros trimmed. Indices too small for 4 decimals
/// keep their full representation so they never read as 0.
pub fn format_index(index: f64) -> String {
    if (index - 1.0).abs() < 1e-12 {
        return String::new();
    }
    let text = format!("{:.4}", index);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "0" && index > 0.0 {
        return format!("{}", index);
    }
    text.to_string()
}

/// Sample name from the included elements, e.g. `BaZr0.8Y0.2`.
pub fn auto_name(composition: &CompositionInput, ordering: NameOrdering) -> String {
    let mut included: Vec<(&str, f64)> = composition.included().collect();
    if ordering == NameOrdering::Lexicographic {
        included.sort_by(|a, b| a.0.cmp(b.0));
    }
    included
        .into_iter()
        .map(|(element, index)| format!("{}{}", element, format_index(index)))
        .collect()
}
