use crate::Stoichiometry::precursors::{
    PrecursorEntry, PrecursorRegistry, SubstitutionRule, SynthesisRoute,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// On-disk form of a precursor registry.
///
/// ```json
/// {
///   "route": "nitrate",
///   "precursors": [
///     {"symbol": "Ba", "compound_name": "Ba(NO3)2", "molar_mass": 261.34, "multiplicity": 1},
///     {"symbol": "F", "compound_name": "BaF2", "molar_mass": 175.32, "multiplicity": 2}
///   ],
///   "substitutions": [
///     {"supplied_element": "F", "secondary_element": "Ba", "secondary_ratio": 0.5}
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryFile {
    pub route: SynthesisRoute,
    pub precursors: Vec<PrecursorEntry>,
    #[serde(default)]
    pub substitutions: Vec<SubstitutionRule>,
}

impl From<&PrecursorRegistry> for RegistryFile {
    fn from(registry: &PrecursorRegistry) -> Self {
        Self {
            route: registry.route(),
            precursors: registry.entries().cloned().collect(),
            substitutions: registry.rules().to_vec(),
        }
    }
}

pub struct LoadData {
    pub file_name: String,
}

impl LoadData {
    pub fn new(file_name: String) -> Self {
        LoadData { file_name }
    }
    pub fn load_registry(&self) -> Result<PrecursorRegistry, String> {
        load_registry_from_file(&self.file_name)
    }
}

/// Reads a registry JSON file and validates every entry and rule.
pub fn load_registry_from_file(file_name: &str) -> Result<PrecursorRegistry, String> {
    let path = Path::new(file_name);
    if !path.exists() {
        return Err(format!("File '{}' does not exist", file_name));
    }
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => return Err(format!("Failed to open file '{}': {}", file_name, e)),
    };
    let registry = parse_registry(&content).map_err(|e| format!("{}: {}", file_name, e))?;
    info!(
        "Loaded {} {} precursors and {} substitution rules from '{}'",
        registry.len(),
        registry.route(),
        registry.rules().len(),
        file_name
    );
    Ok(registry)
}

pub fn parse_registry(content: &str) -> Result<PrecursorRegistry, String> {
    let file: RegistryFile = match serde_json::from_str(content) {
        Ok(file) => file,
        Err(e) => {
            let error_msg = format!(
                "Error parsing registry at line {}, column {}: {}",
                e.line(),
                e.column(),
                e
            );
            error!("{}", error_msg);
            if let Some(problem_line) = content.lines().nth(e.line().saturating_sub(1)) {
                error!("Problematic line: {}", problem_line);
                if e.column() >= 1 && e.column() <= problem_line.len() + 1 {
                    error!("{}", " ".repeat(e.column() - 1) + "^");
                }
            }
            return Err(error_msg);
        }
    };

    if file.precursors.is_empty() {
        warn!("Loaded registry is empty");
        return Err("Registry contains no precursors".to_string());
    }

    let mut registry = PrecursorRegistry::new(file.route);
    for entry in file.precursors {
        if registry.contains(&entry.symbol) {
            warn!(
                "Element '{}' is listed twice, the later entry ({}) wins",
                entry.symbol, entry.compound_name
            );
        }
        registry.insert(entry).map_err(|e| e.to_string())?;
    }
    for rule in file.substitutions {
        registry.add_rule(rule).map_err(|e| e.to_string())?;
    }
    Ok(registry)
}

pub fn save_registry_to_file(registry: &PrecursorRegistry, file_name: &str) -> Result<(), String> {
    let file = RegistryFile::from(registry);
    let content = serde_json::to_string_pretty(&file)
        .map_err(|e| format!("Failed to serialize registry: {}", e))?;
    fs::write(file_name, content).map_err(|e| format!("Failed to write '{}': {}", file_name, e))?;
    info!("Registry saved to '{}'", file_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_custom_registry() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"{
                "route": "oxide",
                "precursors": [
                    {"symbol": "Ba", "compound_name": "BaCO3", "molar_mass": 197.34, "multiplicity": 1},
                    {"symbol": "Sr", "compound_name": "SrF2", "molar_mass": 125.62, "multiplicity": 2},
                    {"symbol": "Sr", "compound_name": "SrCO3", "molar_mass": 147.63, "multiplicity": 1}
                ],
                "substitutions": []
            }"#,
        )
        .unwrap();
        let data = LoadData::new(file.path().to_str().unwrap().to_string());
        let registry = data.load_registry().unwrap();
        assert_eq!(registry.route(), SynthesisRoute::Oxide);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("Sr").unwrap().compound_name, "SrCO3");
        assert!(registry.rules().is_empty());
    }

    #[test]
    fn test_rejects_bad_entries() {
        let zero_n = r#"{"route": "oxide", "precursors": [
            {"symbol": "Y", "compound_name": "Y2O3", "molar_mass": 225.81, "multiplicity": 0}]}"#;
        assert!(parse_registry(zero_n).is_err());

        let orphan_rule = r#"{"route": "nitrate", "precursors": [
            {"symbol": "F", "compound_name": "BaF2", "molar_mass": 175.32, "multiplicity": 2}],
            "substitutions": [{"supplied_element": "F", "secondary_element": "Ba", "secondary_ratio": 0.5}]}"#;
        assert!(parse_registry(orphan_rule).is_err());

        assert!(parse_registry(r#"{"route": "oxide", "precursors": []}"#).is_err());
        assert!(parse_registry("{ not json").is_err());
        assert!(load_registry_from_file("definitely_missing_registry.json").is_err());
    }

    #[test]
    fn test_save_then_load_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nitrate.json");
        let path = path.to_str().unwrap();
        let builtin = PrecursorRegistry::nitrate();
        save_registry_to_file(&builtin, path).unwrap();
        let loaded = load_registry_from_file(path).unwrap();
        assert_eq!(loaded.route(), builtin.route());
        assert_eq!(loaded.symbols(), builtin.symbols());
        assert_eq!(loaded.rules().len(), builtin.rules().len());
        for (a, b) in loaded.entries().zip(builtin.entries()) {
            assert_eq!(a.compound_name, b.compound_name);
            assert_eq!(a.multiplicity, b.multiplicity);
            assert_relative_eq!(a.molar_mass, b.molar_mass, max_relative = 1e-12);
        }
    }
}
