use crate::Stoichiometry::precursors::SynthesisRoute;
use crate::Stoichiometry::recipe_calc::CompositionInput;
use crate::Stoichiometry::recipe_store::RecipeStore;
use crate::Stoichiometry::session::RecipeRequest;
use regex::Regex;
use std::collections::HashMap;
use std::io::{self, Write};

/// Prints `prompt` and reads one trimmed line from stdin.
pub fn read_line(prompt: &str) -> Result<String, String> {
    print!("{}", prompt);
    io::stdout().flush().map_err(|e| e.to_string())?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| format!("Failed to read input: {}", e))?;
    Ok(input.trim().to_string())
}

/// Parses `Ba=1 Zr=0.8, Y=0.2` into (symbol, value) pairs.
/// Pairs are separated by whitespace, commas or semicolons.
pub fn parse_pairs(text: &str) -> Result<Vec<(String, f64)>, String> {
    let around_eq = Regex::new(r"\s*=\s*").map_err(|e| e.to_string())?;
    let pair = Regex::new(r"^([A-Z][a-z]?)=([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)$")
        .map_err(|e| e.to_string())?;
    let separators = Regex::new(r"[\s,;]+").map_err(|e| e.to_string())?;

    let normalized = around_eq.replace_all(text.trim(), "=");
    let mut pairs: Vec<(String, f64)> = Vec::new();
    for token in separators.split(&normalized).filter(|t| !t.is_empty()) {
        let caps = pair
            .captures(token)
            .ok_or_else(|| format!("'{}' is not an Element=number pair", token))?;
        let symbol = caps[1].to_string();
        let value: f64 = caps[2]
            .parse()
            .map_err(|_| format!("Invalid number in '{}'", token))?;
        if pairs.iter().any(|(s, _)| *s == symbol) {
            return Err(format!("Element {} is given twice", symbol));
        }
        pairs.push((symbol, value));
    }
    Ok(pairs)
}

pub fn parse_composition(text: &str) -> Result<CompositionInput, String> {
    let pairs = parse_pairs(text)?;
    if pairs.is_empty() {
        return Err("Composition is empty".to_string());
    }
    Ok(pairs.into_iter().collect())
}

/// Empty input means no overrides.
pub fn parse_overrides(text: &str) -> Result<HashMap<String, f64>, String> {
    Ok(parse_pairs(text)?.into_iter().collect())
}

pub fn parse_route(text: &str) -> Result<SynthesisRoute, String> {
    match text.trim().to_lowercase().as_str() {
        "1" | "oxide" | "o" => Ok(SynthesisRoute::Oxide),
        "2" | "nitrate" | "n" => Ok(SynthesisRoute::Nitrate),
        other => Err(format!("Unknown synthesis route '{}'", other)),
    }
}

fn parse_positive(text: &str, what: &str) -> Result<f64, String> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| format!("Invalid {} format", what))?;
    if !(value.is_finite() && value > 0.0) {
        return Err(format!("{} must be positive", what));
    }
    Ok(value)
}

pub fn prompt_recipe_request() -> Result<RecipeRequest, String> {
    println!("\nSynthesis route:");
    println!("1. Oxide (solid state)");
    println!("2. Nitrate (sol-gel)");
    let route = parse_route(&read_line("Enter choice (1-2): ")?)?;

    println!("Composition as Element=index pairs, e.g. Ba=1 Zr=0.8 Y=0.2");
    let composition = parse_composition(&read_line("Composition: ")?)?;

    let target_mass = parse_positive(&read_line("Target mass, g: ")?, "target mass")?;

    println!("Molar mass overrides as Element=g/mol pairs (Enter to skip)");
    let overrides = parse_overrides(&read_line("Overrides: ")?)?;

    let name = read_line("Sample name (Enter for automatic): ")?;

    let mut request = RecipeRequest::new(route, composition, target_mass);
    request.molar_mass_overrides = overrides;
    if !name.is_empty() {
        request = request.named(&name);
    }
    Ok(request)
}

/// Asks for a recipe by its number in the list (1-based) or by its name.
pub fn prompt_record(store: &RecipeStore) -> Result<usize, String> {
    if store.is_empty() {
        return Err("The recipe list is empty".to_string());
    }
    let input = read_line("Recipe number or name: ")?;
    if let Ok(number) = input.parse::<usize>() {
        if number >= 1 && number <= store.len() {
            return Ok(number - 1);
        }
        return Err(format!("No recipe number {}", number));
    }
    store
        .position(&input)
        .ok_or_else(|| format!("No recipe called '{}'", input))
}

pub fn prompt_correction() -> Result<(String, f64), String> {
    let observed = read_line("Over-weighed precursor or element: ")?;
    if observed.is_empty() {
        return Err("No precursor given".to_string());
    }
    let actual: f64 = read_line("Actually weighed, g: ")?
        .parse()
        .map_err(|_| "Invalid weight format".to_string())?;
    Ok((observed, actual))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs("Ba=1 Zr = 0.8,Y=.2; Ce=1e-1").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("Ba".to_string(), 1.0),
                ("Zr".to_string(), 0.8),
                ("Y".to_string(), 0.2),
                ("Ce".to_string(), 0.1),
            ]
        );
        assert!(parse_pairs("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_pairs_rejects_garbage() {
        assert!(parse_pairs("Ba1 Zr=0.8").is_err());
        assert!(parse_pairs("ba=1").is_err());
        assert!(parse_pairs("Ba=one").is_err());
        assert!(parse_pairs("Ba=1 Ba=0.5").is_err());
    }

    #[test]
    fn test_parse_composition_keeps_order() {
        let composition = parse_composition("Y=0.2 Ba=1 Zr=0.8").unwrap();
        assert_eq!(composition.elements(), vec!["Y", "Ba", "Zr"]);
        assert!(parse_composition("   ").is_err());
        // sign is parsed, the calculator rejects the negative index later
        assert_eq!(parse_composition("Ba=-1").unwrap().get("Ba"), -1.0);
    }

    #[test]
    fn test_parse_overrides_and_route() {
        let overrides = parse_overrides("Zr=123.5").unwrap();
        assert_eq!(overrides.get("Zr"), Some(&123.5));
        assert!(parse_overrides("").unwrap().is_empty());
        assert_eq!(parse_route("2").unwrap(), SynthesisRoute::Nitrate);
        assert_eq!(parse_route(" Oxide ").unwrap(), SynthesisRoute::Oxide);
        assert!(parse_route("3").is_err());
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive("5", "target mass").unwrap(), 5.0);
        assert!(parse_positive("0", "target mass").is_err());
        assert!(parse_positive("five", "target mass").is_err());
    }
}
