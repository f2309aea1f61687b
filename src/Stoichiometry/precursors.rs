//! Precursor registries for the two synthesis routes.
//!
//! The same element maps to a different compound depending on the route, e.g.
//! `Ba` is weighed as BaCO3 for solid-state reaction and as Ba(NO3)2 for the
//! nitrate sol-gel route. A registry also carries a table of substitution rules
//! for precursors that co-supply a second target element (BaF2 supplies fluorine
//! and part of the barium).
use crate::Stoichiometry::errors::RecipeError;
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Synthesis route: solid-state oxide reaction or nitrate sol-gel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisRoute {
    Oxide,
    Nitrate,
}

impl SynthesisRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisRoute::Oxide => "oxide",
            SynthesisRoute::Nitrate => "nitrate",
        }
    }
}

impl fmt::Display for SynthesisRoute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One precursor compound supplying a target element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecursorEntry {
    pub symbol: String,
    pub compound_name: String,
    /// g/mol
    pub molar_mass: f64,
    /// atoms of the target element per formula unit of the compound
    pub multiplicity: u32,
}

impl PrecursorEntry {
    pub fn new(
        symbol: &str,
        compound_name: &str,
        molar_mass: f64,
        multiplicity: u32,
    ) -> Result<Self, RecipeError> {
        let entry = Self {
            symbol: symbol.to_string(),
            compound_name: compound_name.to_string(),
            molar_mass,
            multiplicity,
        };
        entry.validate()?;
        Ok(entry)
    }

    pub fn validate(&self) -> Result<(), RecipeError> {
        if !(self.molar_mass.is_finite() && self.molar_mass > 0.0) {
            return Err(RecipeError::InvalidMolarMass {
                symbol: self.symbol.clone(),
                molar_mass: self.molar_mass,
            });
        }
        if self.multiplicity < 1 {
            return Err(RecipeError::InvalidMultiplicity {
                symbol: self.symbol.clone(),
            });
        }
        Ok(())
    }

    /// Mass contributed per unit of target-element index.
    pub fn effective_molar_mass(&self) -> f64 {
        self.molar_mass / self.multiplicity as f64
    }
}

/// A precursor that supplies `supplied_element` also brings
/// `secondary_ratio` atoms of `secondary_element` per supplied atom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionRule {
    pub supplied_element: String,
    pub secondary_element: String,
    pub secondary_ratio: f64,
}

impl SubstitutionRule {
    pub fn new(supplied_element: &str, secondary_element: &str, secondary_ratio: f64) -> Self {
        Self {
            supplied_element: supplied_element.to_string(),
            secondary_element: secondary_element.to_string(),
            secondary_ratio,
        }
    }

    /// Amount of the secondary element brought in with `supplied_index` of the supplied one.
    pub fn secondary_supplied(&self, supplied_index: f64) -> f64 {
        supplied_index * self.secondary_ratio
    }
}

struct PrecursorData {
    symbol: &'static str,
    name: &'static str,
    mw: f64,
    n: u32,
}

const OXIDE_PRECURSORS: &[PrecursorData] = &[
    PrecursorData { symbol: "Ba", name: "BaCO3", mw: 197.34, n: 1 },
    PrecursorData { symbol: "Ca", name: "CaCO3", mw: 100.09, n: 1 },
    PrecursorData { symbol: "Ce", name: "CeO2", mw: 172.11, n: 1 },
    PrecursorData { symbol: "Co", name: "Co3O4", mw: 240.8, n: 3 },
    PrecursorData { symbol: "Cu", name: "CuO", mw: 79.55, n: 1 },
    PrecursorData { symbol: "F", name: "BaF2", mw: 175.32, n: 2 },
    PrecursorData { symbol: "Fe", name: "Fe2O3", mw: 159.69, n: 2 },
    PrecursorData { symbol: "Gd", name: "Gd2O3", mw: 362.5, n: 2 },
    PrecursorData { symbol: "Hf", name: "HfO2", mw: 210.49, n: 1 },
    PrecursorData { symbol: "La", name: "La2O3", mw: 325.81, n: 2 },
    PrecursorData { symbol: "Mn", name: "MnO2", mw: 86.94, n: 1 },
    PrecursorData { symbol: "Mo", name: "MoO2", mw: 127.94, n: 1 },
    PrecursorData { symbol: "Nb", name: "Nb2O5", mw: 265.81, n: 2 },
    PrecursorData { symbol: "Ni", name: "NiO", mw: 74.69, n: 1 },
    PrecursorData { symbol: "Sc", name: "Sc2O3", mw: 137.91, n: 2 },
    PrecursorData { symbol: "Sr", name: "SrCO3", mw: 147.63, n: 1 },
    PrecursorData { symbol: "Ta", name: "Ta2O5", mw: 441.89, n: 2 },
    PrecursorData { symbol: "Ti", name: "TiO2", mw: 79.9, n: 1 },
    PrecursorData { symbol: "W", name: "WO3", mw: 231.84, n: 1 },
    PrecursorData { symbol: "Y", name: "Y2O3", mw: 225.81, n: 2 },
    PrecursorData { symbol: "Yb", name: "Yb2O3", mw: 394.08, n: 2 },
    PrecursorData { symbol: "Zn", name: "ZnO", mw: 81.38, n: 1 },
    PrecursorData { symbol: "Zr", name: "ZrO2", mw: 123.22, n: 1 },
];

const NITRATE_PRECURSORS: &[PrecursorData] = &[
    PrecursorData { symbol: "Al", name: "Al(NO3)3·9H2O", mw: 375.13, n: 1 },
    PrecursorData { symbol: "Ba", name: "Ba(NO3)2", mw: 261.34, n: 1 },
    PrecursorData { symbol: "Ca", name: "Ca(NO3)2·4H2O", mw: 236.15, n: 1 },
    PrecursorData { symbol: "Ce", name: "Ce(NO3)3·6H2O", mw: 434.22, n: 1 },
    PrecursorData { symbol: "Co", name: "Co(NO3)2·6H2O", mw: 291.03, n: 1 },
    PrecursorData { symbol: "Cu", name: "Cu(NO3)2·3H2O", mw: 241.6, n: 1 },
    PrecursorData { symbol: "F", name: "BaF2", mw: 175.32, n: 2 },
    PrecursorData { symbol: "Fe", name: "Fe(NO3)3·9H2O", mw: 404.0, n: 1 },
    PrecursorData { symbol: "Gd", name: "Gd(NO3)3·6H2O", mw: 451.36, n: 1 },
    PrecursorData { symbol: "La", name: "La(NO3)3·6H2O", mw: 433.01, n: 1 },
    PrecursorData { symbol: "Mg", name: "Mg(NO3)2·6H2O", mw: 256.41, n: 1 },
    PrecursorData { symbol: "Mn", name: "Mn(NO3)2·4H2O", mw: 251.01, n: 1 },
    PrecursorData { symbol: "Ni", name: "Ni(NO3)2·6H2O", mw: 290.79, n: 1 },
    PrecursorData { symbol: "Pr", name: "Pr(NO3)3·6H2O", mw: 435.01, n: 1 },
    PrecursorData { symbol: "Sm", name: "Sm(NO3)3·6H2O", mw: 444.47, n: 1 },
    PrecursorData { symbol: "Sr", name: "Sr(NO3)2", mw: 211.63, n: 1 },
    PrecursorData { symbol: "Y", name: "Y(NO3)3·6H2O", mw: 383.01, n: 1 },
    PrecursorData { symbol: "Yb", name: "Yb(NO3)3·5H2O", mw: 449.13, n: 1 },
    PrecursorData { symbol: "Zn", name: "Zn(NO3)2·6H2O", mw: 297.49, n: 1 },
    PrecursorData { symbol: "Zr", name: "ZrO(NO3)2·xH2O", mw: 231.23, n: 1 },
];

/// Symbol -> precursor lookup for one route, plus its substitution rules.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecursorRegistry {
    route: SynthesisRoute,
    entries: BTreeMap<String, PrecursorEntry>,
    rules: Vec<SubstitutionRule>,
}

impl PrecursorRegistry {
    /// Empty registry for `route`.
    pub fn new(route: SynthesisRoute) -> Self {
        Self {
            route,
            entries: BTreeMap::new(),
            rules: Vec::new(),
        }
    }

    /// Built-in solid-state (carbonates and oxides) registry.
    pub fn oxide() -> Self {
        Self::from_table(SynthesisRoute::Oxide, OXIDE_PRECURSORS)
    }

    /// Built-in sol-gel (nitrates) registry.
    pub fn nitrate() -> Self {
        Self::from_table(SynthesisRoute::Nitrate, NITRATE_PRECURSORS)
    }

    pub fn for_route(route: SynthesisRoute) -> Self {
        match route {
            SynthesisRoute::Oxide => Self::oxide(),
            SynthesisRoute::Nitrate => Self::nitrate(),
        }
    }

    fn from_table(route: SynthesisRoute, table: &[PrecursorData]) -> Self {
        let entries = table
            .iter()
            .map(|p| {
                (
                    p.symbol.to_string(),
                    PrecursorEntry {
                        symbol: p.symbol.to_string(),
                        compound_name: p.name.to_string(),
                        molar_mass: p.mw,
                        multiplicity: p.n,
                    },
                )
            })
            .collect();
        Self {
            route,
            entries,
            // BaF2: one Ba for every two F
            rules: vec![SubstitutionRule::new("F", "Ba", 0.5)],
        }
    }

    pub fn route(&self) -> SynthesisRoute {
        self.route
    }

    pub fn lookup(&self, symbol: &str) -> Result<&PrecursorEntry, RecipeError> {
        self.entries
            .get(symbol)
            .ok_or_else(|| RecipeError::UnknownElement {
                symbol: symbol.to_string(),
                route: self.route,
            })
    }

    /// Looks up `symbol` and replaces its molar mass for this call only.
    /// The multiplicity stays the one fixed by the chemical formula.
    pub fn lookup_with_override(
        &self,
        symbol: &str,
        molar_mass: Option<f64>,
    ) -> Result<PrecursorEntry, RecipeError> {
        let mut entry = self.lookup(symbol)?.clone();
        if let Some(molar_mass) = molar_mass {
            if !(molar_mass.is_finite() && molar_mass > 0.0) {
                return Err(RecipeError::InvalidMolarMass {
                    symbol: symbol.to_string(),
                    molar_mass,
                });
            }
            entry.molar_mass = molar_mass;
        }
        Ok(entry)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    /// Symbols in alphabetical order.
    pub fn symbols(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &PrecursorEntry> {
        self.entries.values()
    }

    pub fn rules(&self) -> &[SubstitutionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds or replaces the entry for `entry.symbol`.
    pub fn insert(&mut self, entry: PrecursorEntry) -> Result<(), RecipeError> {
        entry.validate()?;
        self.entries.insert(entry.symbol.clone(), entry);
        Ok(())
    }

    /// Adds a substitution rule. Both elements must already be registered.
    pub fn add_rule(&mut self, rule: SubstitutionRule) -> Result<(), RecipeError> {
        if !(rule.secondary_ratio.is_finite() && rule.secondary_ratio > 0.0) {
            return Err(RecipeError::InvalidSubstitutionRule(format!(
                "ratio {} of {} -> {} must be positive",
                rule.secondary_ratio, rule.supplied_element, rule.secondary_element
            )));
        }
        if rule.supplied_element == rule.secondary_element {
            return Err(RecipeError::InvalidSubstitutionRule(format!(
                "{} cannot supply itself",
                rule.supplied_element
            )));
        }
        for symbol in [&rule.supplied_element, &rule.secondary_element] {
            self.lookup(symbol)?;
        }
        self.rules.retain(|r| {
            r.supplied_element != rule.supplied_element
                || r.secondary_element != rule.secondary_element
        });
        self.rules.push(rule);
        Ok(())
    }

    pub fn clear_rules(&mut self) {
        self.rules.clear();
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["element", "precursor", "M, g/mol", "n", "M/n"]);
        for entry in self.entries.values() {
            table.add_row(row![
                entry.symbol,
                entry.compound_name,
                format!("{:.2}", entry.molar_mass),
                entry.multiplicity,
                format!("{:.4}", entry.effective_molar_mass())
            ]);
        }
        table
    }

    pub fn pretty_print(&self) {
        println!("__________{} route precursors__________", self.route);
        self.to_table().printstd();
        for rule in &self.rules {
            println!(
                "substitution: the {} precursor also supplies {} {} per {}",
                rule.supplied_element,
                rule.secondary_ratio,
                rule.secondary_element,
                rule.supplied_element
            );
        }
        println!("_____________________________________________________________");
    }
}
