/// Four-section weighing report: terminal tables, CSV files and CSV read-back
pub mod export;
/// loading and saving precursor registries as JSON
pub mod load_from_file;
