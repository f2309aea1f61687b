use super::cli_recipe::{parse_route, read_line};
use crate::Stoichiometry::additives::AdditiveConfig;
use crate::Stoichiometry::recipe_calc::NameOrdering;
use crate::Stoichiometry::session::SynthesisSession;
use crate::Utils::load_from_file::LoadData;
use crate::settings::SettingsManager;

pub fn settings_menu(manager: &mut SettingsManager, session: &mut SynthesisSession) {
    loop {
        println!("\n=== Settings ({}) ===", manager.config_file());
        println!("1. Show current settings");
        println!("2. Switch sample naming order");
        println!("3. Export decimals");
        println!("4. Additive constants");
        println!("5. Custom precursor registry");
        println!("6. Reset to defaults");
        println!("0. Back");
        let choice = match read_line("Choose option: ") {
            Ok(choice) => choice,
            Err(e) => {
                println!("Error: {}", e);
                break;
            }
        };

        let result = match choice.as_str() {
            "1" => show_settings(manager),
            "2" => switch_naming(manager),
            "3" => set_export_decimals(manager),
            "4" => set_additives(manager),
            "5" => set_registry(manager),
            "6" => manager.reset_to_defaults().map_err(|e| e.to_string()),
            "0" => break,
            _ => {
                println!("Invalid option");
                Ok(())
            }
        };
        // the session always follows the saved settings
        let result = result.and_then(|_| session.apply_settings(manager.settings().clone()));
        if let Err(e) = result {
            println!("\x1b[31mError: {}\x1b[0m", e);
        }
    }
}

fn show_settings(manager: &SettingsManager) -> Result<(), String> {
    let text = serde_json::to_string_pretty(manager.settings()).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

fn switch_naming(manager: &mut SettingsManager) -> Result<(), String> {
    let ordering = match manager.settings().name_ordering {
        NameOrdering::InputOrder => NameOrdering::Lexicographic,
        NameOrdering::Lexicographic => NameOrdering::InputOrder,
    };
    manager
        .set_name_ordering(ordering)
        .map_err(|e| e.to_string())?;
    println!("Samples are now named in {:?} order", ordering);
    Ok(())
}

fn set_export_decimals(manager: &mut SettingsManager) -> Result<(), String> {
    let current = manager.settings().export_decimals;
    let text = read_line(&format!("Decimals (0-10, now {}): ", current))?;
    let decimals = parse_or_keep(&text, current as f64)?;
    if decimals < 0.0 || decimals.fract() != 0.0 {
        return Err("Decimals must be a whole number".to_string());
    }
    manager
        .set_export_decimals(decimals as usize)
        .map_err(|e| e.to_string())
}

fn set_additives(manager: &mut SettingsManager) -> Result<(), String> {
    println!("Enter a new value or press Enter to keep the current one");
    let mut config: AdditiveConfig = manager.settings().additives.clone();
    let fields: [(&str, &mut f64); 8] = [
        ("EDTA molar mass, g/mol", &mut config.edta_molar_mass),
        ("EDTA per metal, mol/mol", &mut config.edta_per_metal),
        ("citric acid molar mass, g/mol", &mut config.citric_acid_molar_mass),
        ("citric acid per metal, mol/mol", &mut config.citric_acid_per_metal),
        ("EDTA proton equivalents", &mut config.edta_proton_equivalents),
        (
            "citric acid proton equivalents",
            &mut config.citric_acid_proton_equivalents,
        ),
        ("ammonia molarity, mol/L", &mut config.ammonia_molarity),
        ("target pH", &mut config.target_ph),
    ];
    for (label, value) in fields {
        let text = read_line(&format!("{} [{}]: ", label, value))?;
        *value = parse_or_keep(&text, *value)?;
    }
    manager.set_additives(config).map_err(|e| e.to_string())
}

fn set_registry(manager: &mut SettingsManager) -> Result<(), String> {
    let route = parse_route(&read_line("Route (1 oxide, 2 nitrate): ")?)?;
    let path = read_line("Registry JSON file (Enter for the built-in one): ")?;
    if path.is_empty() {
        return manager
            .set_registry_file(route, None)
            .map_err(|e| e.to_string());
    }
    let registry = LoadData::new(path.clone()).load_registry()?;
    if registry.route() != route {
        return Err(format!(
            "'{}' holds a {} registry, expected {}",
            path,
            registry.route(),
            route
        ));
    }
    registry.pretty_print();
    manager
        .set_registry_file(route, Some(&path))
        .map_err(|e| e.to_string())
}

/// Empty input keeps `current`.
pub fn parse_or_keep(text: &str, current: f64) -> Result<f64, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(current);
    }
    text.parse()
        .map_err(|_| format!("Invalid number format: '{}'", text))
}
