use super::cli_recipe::{prompt_correction, prompt_recipe_request, prompt_record, read_line};
use super::cli_settings::settings_menu;
use crate::Stoichiometry::correction::CorrectionOutcome;
use crate::Stoichiometry::precursors::SynthesisRoute;
use crate::Stoichiometry::session::SynthesisSession;
use crate::settings::SettingsManager;
use prettytable::{Table, row};
use std::path::Path;

const DEFAULT_REPORT_DIR: &str = "cerastoich_report";

pub fn run_interactive_menu(session: &mut SynthesisSession, manager: &mut SettingsManager) {
    loop {
        show_main_menu();
        let choice = match read_line("\x1b[36mEnter your choice: \x1b[0m") {
            Ok(choice) => choice,
            Err(e) => {
                println!("Error: {}", e);
                break;
            }
        };

        let result = match choice.as_str() {
            "1" => add_recipe(session),
            "2" => {
                list_recipes(session);
                Ok(())
            }
            "3" => correct_recipe(session),
            "4" => remove_recipe(session),
            "5" => export_report(session),
            "6" => {
                show_registries(session);
                Ok(())
            }
            "7" => {
                settings_menu(manager, session);
                Ok(())
            }
            "0" => {
                println!("Goodbye!");
                break;
            }
            _ => {
                println!("Invalid choice. Please try again.");
                Ok(())
            }
        };
        if let Err(e) = result {
            println!("\x1b[31mError: {}\x1b[0m", e);
        }
    }
}

/* colors
Blue (\x1b[34m) - header
Yellow (\x1b[33m) - menu options
Cyan (\x1b[36m) - prompt
Red (\x1b[31m) - errors
*/
fn show_main_menu() {
    println!("\x1b[34m\n CeraStoich: weighing recipes for ceramic precursors \n\x1b[0m");
    println!("\x1b[33m1. Add recipe\x1b[0m");
    println!("\x1b[33m2. List recipes\x1b[0m");
    println!("\x1b[33m3. Correct over-weighing\x1b[0m");
    println!("\x1b[33m4. Remove recipe\x1b[0m");
    println!("\x1b[33m5. Export report (CSV)\x1b[0m");
    println!("\x1b[33m6. Show precursor registries\x1b[0m");
    println!("\x1b[33m7. Settings\x1b[0m");
    println!("\x1b[33m0. Exit\x1b[0m");
}

fn add_recipe(session: &mut SynthesisSession) -> Result<(), String> {
    let request = prompt_recipe_request()?;
    let index = session.add_recipe(request).map_err(|e| e.to_string())?;
    if let Some(record) = session.store().get(index) {
        record.pretty_print();
    }
    Ok(())
}

fn list_recipes(session: &SynthesisSession) {
    if session.store().is_empty() {
        println!("No recipes yet");
        return;
    }
    let mut table = Table::new();
    table.add_row(row!["#", "sample", "route", "total, g", "scale"]);
    for (i, record) in session.store().iter().enumerate() {
        table.add_row(row![
            i + 1,
            record.name,
            record.route,
            format!("{:.4}", record.target_mass),
            format!("{:.4}", record.scale_factor)
        ]);
    }
    table.printstd();
    for record in session.store().iter() {
        record.pretty_print();
    }
}

fn correct_recipe(session: &mut SynthesisSession) -> Result<(), String> {
    list_recipes(session);
    let index = prompt_record(session.store())?;
    let (observed, actual) = prompt_correction()?;
    let outcome = session
        .correct(index, &observed, actual)
        .map_err(|e| e.to_string())?;
    match outcome {
        CorrectionOutcome::NoCorrectionNeeded {
            original_weight,
            actual_weight,
        } => println!(
            "No rescaling needed: add {:.5} g more to reach {:.5} g",
            original_weight - actual_weight,
            original_weight
        ),
        CorrectionOutcome::Corrected(report) => report.pretty_print(),
    }
    Ok(())
}

fn remove_recipe(session: &mut SynthesisSession) -> Result<(), String> {
    let index = prompt_record(session.store())?;
    let removed = session.remove(index).map_err(|e| e.to_string())?;
    println!("Removed {}", removed.name);
    Ok(())
}

fn export_report(session: &SynthesisSession) -> Result<(), String> {
    if session.store().is_empty() {
        return Err("Nothing to export".to_string());
    }
    let report = session.export_report();
    report.print();
    let dir = read_line(&format!("Output directory (Enter for {}): ", DEFAULT_REPORT_DIR))?;
    let dir = if dir.is_empty() {
        DEFAULT_REPORT_DIR.to_string()
    } else {
        dir
    };
    let written = report
        .write_csv(Path::new(&dir))
        .map_err(|e| e.to_string())?;
    for path in written {
        println!("written {}", path.display());
    }
    Ok(())
}

fn show_registries(session: &SynthesisSession) {
    for route in [SynthesisRoute::Oxide, SynthesisRoute::Nitrate] {
        session.registry(route).pretty_print();
    }
}
