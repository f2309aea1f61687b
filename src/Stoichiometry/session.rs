//! Per-user controller: owns the settings, one registry per route and the
//! recipe list of the session. Every recipe is computed and corrected through
//! here so that the settings (naming, tolerances, additive constants) apply
//! consistently.
use crate::Stoichiometry::additives::attach_additives;
use crate::Stoichiometry::correction::CorrectionOutcome;
use crate::Stoichiometry::errors::RecipeError;
use crate::Stoichiometry::precursors::{PrecursorRegistry, SynthesisRoute};
use crate::Stoichiometry::recipe_calc::{CompositionInput, RecipeCalculator, RecipeRecord};
use crate::Stoichiometry::recipe_store::RecipeStore;
use crate::Utils::export::ExportReport;
use crate::Utils::load_from_file::load_registry_from_file;
use crate::settings::{Settings, SettingsManager};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything needed to compute one recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRequest {
    /// auto-generated from the composition when `None` or blank
    pub name: Option<String>,
    pub route: SynthesisRoute,
    pub composition: CompositionInput,
    /// g
    pub target_mass: f64,
    /// element -> g/mol, this recipe only
    #[serde(default)]
    pub molar_mass_overrides: HashMap<String, f64>,
}

impl RecipeRequest {
    pub fn new(route: SynthesisRoute, composition: CompositionInput, target_mass: f64) -> Self {
        Self {
            name: None,
            route,
            composition,
            target_mass,
            molar_mass_overrides: HashMap::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_override(mut self, element: &str, molar_mass: f64) -> Self {
        self.molar_mass_overrides
            .insert(element.to_string(), molar_mass);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisSession {
    settings: Settings,
    oxide: PrecursorRegistry,
    nitrate: PrecursorRegistry,
    store: RecipeStore,
}

fn registry_for(settings: &Settings, route: SynthesisRoute) -> Result<PrecursorRegistry, String> {
    let Some(file) = settings.registry_file(route) else {
        return Ok(PrecursorRegistry::for_route(route));
    };
    let registry = load_registry_from_file(file)?;
    if registry.route() != route {
        return Err(format!(
            "'{}' holds a {} registry, expected {}",
            file,
            registry.route(),
            route
        ));
    }
    Ok(registry)
}

impl SynthesisSession {
    /// New empty session. Custom registry files named in the settings replace
    /// the built-in registries.
    pub fn new(settings: Settings) -> Result<Self, String> {
        settings.validate()?;
        let oxide = registry_for(&settings, SynthesisRoute::Oxide)?;
        let nitrate = registry_for(&settings, SynthesisRoute::Nitrate)?;
        Ok(Self {
            settings,
            oxide,
            nitrate,
            store: RecipeStore::new(),
        })
    }

    pub fn from_manager(manager: &SettingsManager) -> Result<Self, String> {
        Self::new(manager.settings().clone())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Switches to new settings and reloads the registries. The recipe list
    /// is kept; recipes already computed are not recalculated. On error the
    /// session is left as it was.
    pub fn apply_settings(&mut self, settings: Settings) -> Result<(), String> {
        settings.validate()?;
        let oxide = registry_for(&settings, SynthesisRoute::Oxide)?;
        let nitrate = registry_for(&settings, SynthesisRoute::Nitrate)?;
        self.settings = settings;
        self.oxide = oxide;
        self.nitrate = nitrate;
        info!("session settings updated");
        Ok(())
    }

    pub fn registry(&self, route: SynthesisRoute) -> &PrecursorRegistry {
        match route {
            SynthesisRoute::Oxide => &self.oxide,
            SynthesisRoute::Nitrate => &self.nitrate,
        }
    }

    pub fn store(&self) -> &RecipeStore {
        &self.store
    }

    /// Computes the recipe, attaches the additive estimate on the nitrate
    /// route and appends it to the list. Nothing is stored on error.
    pub fn add_recipe(&mut self, request: RecipeRequest) -> Result<usize, RecipeError> {
        let mut record = self.compute(&request)?;
        if request.route == SynthesisRoute::Nitrate {
            attach_additives(&mut record, &self.settings.additives);
        }
        Ok(self.store.add(record))
    }

    /// Computes without storing.
    pub fn compute(&self, request: &RecipeRequest) -> Result<RecipeRecord, RecipeError> {
        RecipeCalculator::new(self.registry(request.route))
            .with_overrides(request.molar_mass_overrides.clone())
            .with_name(request.name.clone())
            .with_naming(self.settings.name_ordering)
            .with_tolerances(
                self.settings.integer_sum_tolerance,
                self.settings.substitution_epsilon,
            )
            .compute(&request.composition, request.target_mass)
    }

    pub fn correct(
        &mut self,
        index: usize,
        observed: &str,
        actual_weight: f64,
    ) -> Result<CorrectionOutcome, RecipeError> {
        self.store
            .apply_correction(index, observed, actual_weight, self.settings.weight_tolerance)
    }

    pub fn remove(&mut self, index: usize) -> Result<RecipeRecord, RecipeError> {
        self.store.remove(index)
    }

    pub fn export_report(&self) -> ExportReport {
        info!("exporting {} recipes", self.store.len());
        ExportReport::from_records(self.store.records(), self.settings.export_decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stoichiometry::errors::RecipeWarning;
    use crate::Stoichiometry::precursors::PrecursorEntry;
    use crate::Stoichiometry::recipe_calc::NameOrdering;
    use crate::Utils::load_from_file::save_registry_to_file;
    use approx::assert_relative_eq;

    fn bzy() -> CompositionInput {
        CompositionInput::new()
            .with("Ba", 1.0)
            .with("Zr", 0.8)
            .with("Y", 0.2)
    }

    #[test]
    fn test_nitrate_recipe_gets_additives() {
        let mut session = SynthesisSession::new(Settings::default()).unwrap();
        let oxide = session
            .add_recipe(RecipeRequest::new(SynthesisRoute::Oxide, bzy(), 5.0))
            .unwrap();
        let nitrate = session
            .add_recipe(RecipeRequest::new(SynthesisRoute::Nitrate, bzy(), 5.0))
            .unwrap();
        let store = session.store();
        assert!(store.get(oxide).unwrap().additives.is_none());
        let record = store.get(nitrate).unwrap();
        assert!(record.additives.is_some());
        assert!(record.warnings.contains(&RecipeWarning::AmmoniaVolumeEstimate));
    }

    #[test]
    fn test_failed_request_stores_nothing() {
        let mut session = SynthesisSession::new(Settings::default()).unwrap();
        let composition = CompositionInput::new().with("Ba", 1.0).with("Xx", 0.5);
        let result = session.add_recipe(RecipeRequest::new(SynthesisRoute::Oxide, composition, 5.0));
        assert!(matches!(result, Err(RecipeError::UnknownElement { .. })));
        assert!(session.store().is_empty());
    }

    #[test]
    fn test_settings_drive_naming() {
        let settings = Settings {
            name_ordering: NameOrdering::Lexicographic,
            ..Settings::default()
        };
        let mut session = SynthesisSession::new(settings).unwrap();
        let index = session
            .add_recipe(RecipeRequest::new(SynthesisRoute::Oxide, bzy(), 5.0))
            .unwrap();
        assert_eq!(session.store().get(index).unwrap().name, "BaY0.2Zr0.8");
        let index = session
            .add_recipe(RecipeRequest::new(SynthesisRoute::Oxide, bzy(), 5.0).named("batch 7"))
            .unwrap();
        assert_eq!(session.store().get(index).unwrap().name, "batch 7");
    }

    #[test]
    fn test_override_applies_to_one_request() {
        let mut session = SynthesisSession::new(Settings::default()).unwrap();
        let plain = session
            .add_recipe(RecipeRequest::new(SynthesisRoute::Oxide, bzy(), 5.0))
            .unwrap();
        let heavy = session
            .add_recipe(
                RecipeRequest::new(SynthesisRoute::Oxide, bzy(), 5.0).with_override("Zr", 150.0),
            )
            .unwrap();
        let store = session.store();
        assert_relative_eq!(store.get(heavy).unwrap().line("Zr").unwrap().molar_mass, 150.0);
        assert_relative_eq!(
            store.get(plain).unwrap().line("Zr").unwrap().molar_mass,
            123.22
        );
        assert_relative_eq!(
            session.registry(SynthesisRoute::Oxide).lookup("Zr").unwrap().molar_mass,
            123.22
        );
    }

    #[test]
    fn test_correct_and_remove() {
        let mut session = SynthesisSession::new(Settings::default()).unwrap();
        session
            .add_recipe(RecipeRequest::new(SynthesisRoute::Nitrate, bzy(), 2.0))
            .unwrap();
        let weight = session.store().get(0).unwrap().line("Y").unwrap().weight;
        let outcome = session.correct(0, "Y", weight * 1.1).unwrap();
        assert!(outcome.is_corrected());
        assert_relative_eq!(
            session.store().get(0).unwrap().target_mass,
            2.2,
            max_relative = 1e-12
        );
        assert_eq!(session.export_report().weighing().rows.len(), 1);
        session.remove(0).unwrap();
        assert!(matches!(
            session.correct(0, "Y", 1.0),
            Err(RecipeError::RecordNotFound(0))
        ));
    }

    #[test]
    fn test_custom_registry_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oxide.json");
        let mut registry = PrecursorRegistry::oxide();
        registry
            .insert(PrecursorEntry::new("Tb", "Tb4O7", 747.7, 4).unwrap())
            .unwrap();
        save_registry_to_file(&registry, path.to_str().unwrap()).unwrap();

        let settings = Settings {
            oxide_registry_file: Some(path.to_str().unwrap().to_string()),
            ..Settings::default()
        };
        let session = SynthesisSession::new(settings).unwrap();
        assert!(session.registry(SynthesisRoute::Oxide).contains("Tb"));
        assert!(!session.registry(SynthesisRoute::Nitrate).contains("Tb"));

        let wrong_route = Settings {
            nitrate_registry_file: Some(path.to_str().unwrap().to_string()),
            ..Settings::default()
        };
        assert!(SynthesisSession::new(wrong_route).is_err());
    }

    #[test]
    fn test_apply_settings_keeps_recipes() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SynthesisSession::new(Settings::default()).unwrap();
        session
            .add_recipe(RecipeRequest::new(SynthesisRoute::Oxide, bzy(), 5.0))
            .unwrap();

        let missing = Settings {
            nitrate_registry_file: Some(dir.path().join("absent.json").to_str().unwrap().to_string()),
            ..Settings::default()
        };
        assert!(session.apply_settings(missing).is_err());
        assert_eq!(session.settings(), &Settings::default());

        let lexicographic = Settings {
            name_ordering: NameOrdering::Lexicographic,
            ..Settings::default()
        };
        session.apply_settings(lexicographic).unwrap();
        assert_eq!(session.store().len(), 1);
        assert_eq!(session.store().get(0).unwrap().name, "BaZr0.8Y0.2");
        let index = session
            .add_recipe(RecipeRequest::new(SynthesisRoute::Oxide, bzy(), 5.0))
            .unwrap();
        assert_eq!(session.store().get(index).unwrap().name, "BaY0.2Zr0.8");
    }
}
