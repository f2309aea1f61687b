//! # Settings Module
//!
//! ## Purpose
//! Keeps the tunable constants of the calculation in one JSON file
//! (`cerastoich_settings.json`) so they can be changed without recompiling:
//! additive constants, tolerances, the naming policy for samples, export
//! precision and optional custom precursor registries.
//!
//! ## Configuration Format
//! ```json
//! {
//!   "additives": {
//!     "edta_molar_mass": 292.24,
//!     "edta_per_metal": 1.0,
//!     "citric_acid_molar_mass": 210.14,
//!     "citric_acid_per_metal": 2.0,
//!     "edta_proton_equivalents": 3.0,
//!     "citric_acid_proton_equivalents": 3.0,
//!     "ammonia_molarity": 15.0,
//!     "target_ph": 7.0
//!   },
//!   "name_ordering": "InputOrder",
//!   "integer_sum_tolerance": 1e-6,
//!   "weight_tolerance": 1e-9,
//!   "substitution_epsilon": 1e-9,
//!   "export_decimals": 4,
//!   "oxide_registry_file": null,
//!   "nitrate_registry_file": "my_nitrates.json",
//!   "log_level": "info"
//! }
//! ```
//! Missing keys take their default values.
//!
//! ## Usage
//! ```rust, ignore
//! let mut manager = SettingsManager::new();
//! manager.set_export_decimals(5)?;
//! let settings = manager.settings().clone();
//! ```

use crate::Stoichiometry::additives::AdditiveConfig;
use crate::Stoichiometry::correction::WEIGHT_TOLERANCE;
use crate::Stoichiometry::precursors::SynthesisRoute;
use crate::Stoichiometry::recipe_calc::{INTEGER_SUM_TOLERANCE, NameOrdering, SUBSTITUTION_EPSILON};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_SETTINGS_FILE: &str = "cerastoich_settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub additives: AdditiveConfig,
    pub name_ordering: NameOrdering,
    pub integer_sum_tolerance: f64,
    /// relative, boundary between "no correction" and "rescale"
    pub weight_tolerance: f64,
    pub substitution_epsilon: f64,
    /// decimals of masses in exported tables
    pub export_decimals: usize,
    pub oxide_registry_file: Option<String>,
    pub nitrate_registry_file: Option<String>,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            additives: AdditiveConfig::default(),
            name_ordering: NameOrdering::InputOrder,
            integer_sum_tolerance: INTEGER_SUM_TOLERANCE,
            weight_tolerance: WEIGHT_TOLERANCE,
            substitution_epsilon: SUBSTITUTION_EPSILON,
            export_decimals: 4,
            oxide_registry_file: None,
            nitrate_registry_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        self.additives.validate()?;
        let tolerances = [
            ("integer_sum_tolerance", self.integer_sum_tolerance),
            ("weight_tolerance", self.weight_tolerance),
            ("substitution_epsilon", self.substitution_epsilon),
        ];
        for (name, value) in tolerances {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("{} must be a non-negative number, got {}", name, value));
            }
        }
        if self.export_decimals > 10 {
            return Err(format!(
                "export_decimals {} is more than 10",
                self.export_decimals
            ));
        }
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| format!("unknown log level '{}'", self.log_level))?;
        Ok(())
    }

    /// Log level for the terminal logger, `Info` when the setting is unreadable.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }

    pub fn registry_file(&self, route: SynthesisRoute) -> Option<&str> {
        match route {
            SynthesisRoute::Oxide => self.oxide_registry_file.as_deref(),
            SynthesisRoute::Nitrate => self.nitrate_registry_file.as_deref(),
        }
    }
}

/// Loads, validates and persists [`Settings`].
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings: Settings,
    config_file: String,
}

impl SettingsManager {
    /// Loads `cerastoich_settings.json` from the working directory, or defaults.
    pub fn new() -> Self {
        Self::with_config_file(DEFAULT_SETTINGS_FILE)
    }

    pub fn with_config_file(config_file: &str) -> Self {
        let settings = match Self::load_config(config_file) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!(
                    "settings file '{}' could not be used ({}), falling back to defaults",
                    config_file,
                    e
                );
                Settings::default()
            }
        };
        Self {
            settings,
            config_file: config_file.to_string(),
        }
    }

    fn load_config(config_file: &str) -> Result<Settings, Box<dyn std::error::Error>> {
        if Path::new(config_file).exists() {
            let content = fs::read_to_string(config_file)?;
            let settings: Settings = serde_json::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    pub fn save_config(&self) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.config_file, content)?;
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Replaces all settings after validation and saves them.
    pub fn update(&mut self, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
        settings.validate()?;
        self.settings = settings;
        self.save_config()
    }

    pub fn set_additives(&mut self, additives: AdditiveConfig) -> Result<(), Box<dyn std::error::Error>> {
        additives.validate()?;
        self.settings.additives = additives;
        self.save_config()
    }

    pub fn set_name_ordering(&mut self, ordering: NameOrdering) -> Result<(), Box<dyn std::error::Error>> {
        self.settings.name_ordering = ordering;
        self.save_config()
    }

    pub fn set_export_decimals(&mut self, decimals: usize) -> Result<(), Box<dyn std::error::Error>> {
        let mut settings = self.settings.clone();
        settings.export_decimals = decimals;
        self.update(settings)
    }

    /// Points a route at a custom registry file. `None` restores the built-in one.
    pub fn set_registry_file(
        &mut self,
        route: SynthesisRoute,
        path: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(path) = path {
            if !Path::new(path).exists() {
                return Err(format!("File does not exist: {}", path).into());
            }
        }
        let path = path.map(str::to_string);
        match route {
            SynthesisRoute::Oxide => self.settings.oxide_registry_file = path,
            SynthesisRoute::Nitrate => self.settings.nitrate_registry_file = path,
        }
        self.save_config()
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.settings = Settings::default();
        self.save_config()
    }
}

impl Default for SettingsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let manager = SettingsManager::with_config_file(path.to_str().unwrap());
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"export_decimals": 6, "additives": {"ammonia_molarity": 14.8}}"#)
            .unwrap();
        let manager = SettingsManager::with_config_file(file.path().to_str().unwrap());
        let settings = manager.settings();
        assert_eq!(settings.export_decimals, 6);
        assert_eq!(settings.additives.ammonia_molarity, 14.8);
        assert_eq!(settings.additives.edta_molar_mass, 292.24);
        assert_eq!(settings.name_ordering, NameOrdering::InputOrder);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"additives": {"ammonia_molarity": -1.0}}"#)
            .unwrap();
        let manager = SettingsManager::with_config_file(file.path().to_str().unwrap());
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let path = path.to_str().unwrap();
        let mut manager = SettingsManager::with_config_file(path);
        manager.set_name_ordering(NameOrdering::Lexicographic).unwrap();
        manager.set_export_decimals(5).unwrap();

        let reloaded = SettingsManager::with_config_file(path);
        assert_eq!(reloaded.settings().name_ordering, NameOrdering::Lexicographic);
        assert_eq!(reloaded.settings().export_decimals, 5);

        assert!(manager.set_export_decimals(42).is_err());
        assert_eq!(manager.settings().export_decimals, 5);
    }

    #[test]
    fn test_registry_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut manager = SettingsManager::with_config_file(path.to_str().unwrap());
        assert!(
            manager
                .set_registry_file(SynthesisRoute::Nitrate, Some("no_such_registry.json"))
                .is_err()
        );
        let registry = NamedTempFile::new().unwrap();
        let registry_path = registry.path().to_str().unwrap();
        manager
            .set_registry_file(SynthesisRoute::Nitrate, Some(registry_path))
            .unwrap();
        assert_eq!(
            manager.settings().registry_file(SynthesisRoute::Nitrate),
            Some(registry_path)
        );
        assert_eq!(manager.settings().registry_file(SynthesisRoute::Oxide), None);
    }

    #[test]
    fn test_level_filter() {
        let mut settings = Settings::default();
        assert_eq!(settings.level_filter(), LevelFilter::Info);
        settings.log_level = "debug".to_string();
        assert_eq!(settings.level_filter(), LevelFilter::Debug);
        settings.log_level = "loud".to_string();
        assert!(settings.validate().is_err());
    }
}
