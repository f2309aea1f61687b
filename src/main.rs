use CeraStoich::Stoichiometry::session::SynthesisSession;
use CeraStoich::cli::cli_main::run_interactive_menu;
use CeraStoich::settings::SettingsManager;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

pub fn main() {
    let mut manager = SettingsManager::new();
    let level = manager.settings().level_filter();
    if let Err(e) = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto) {
        eprintln!("logger not initialised: {}", e);
    }
    match SynthesisSession::from_manager(&manager) {
        Ok(mut session) => run_interactive_menu(&mut session, &mut manager),
        Err(e) => {
            log::error!("cannot start the session: {}", e);
            std::process::exit(1);
        }
    }
}
