/// main menu loop
pub mod cli_main;
/// prompts and parsing of Element=value input
pub mod cli_recipe;
/// settings submenu
pub mod cli_settings;
