/// Error type of the stoichiometric core and the advisories attached to recipes
pub mod errors;
/// Precursor registries for the solid-state (oxide/carbonate) and the sol-gel
/// (nitrate) routes. Every target element maps to exactly one precursor compound
/// with its molar mass and the number of target-element atoms per formula unit
/// (e.g. Y2O3 carries 2 Y, so 1 mol of Y needs 1/2 mol of Y2O3).
/// A registry also holds substitution rules for precursors that bring a second
/// target element along (BaF2 supplies Ba together with F).
/// # Examples
/// ```
/// use CeraStoich::Stoichiometry::precursors::PrecursorRegistry;
/// let registry = PrecursorRegistry::oxide();
/// let y = registry.lookup("Y").unwrap();
/// assert_eq!(y.compound_name, "Y2O3");
/// assert!((y.effective_molar_mass() - 112.905).abs() < 1e-9);
/// ```
pub mod precursors;
/// Converts element -> index pairs and a target mass into precursor masses
pub mod recipe_calc;
/// EDTA, citric acid and ammonia for nitrate sol-gel batches
pub mod additives;
/// Rescaling of a recipe after one precursor was over-weighed
pub mod correction;
pub mod recipe_store;
/// Session controller: settings, registries and the recipe list of one user
/// # Examples
/// ```
/// use CeraStoich::Stoichiometry::precursors::SynthesisRoute;
/// use CeraStoich::Stoichiometry::recipe_calc::CompositionInput;
/// use CeraStoich::Stoichiometry::session::{RecipeRequest, SynthesisSession};
/// use CeraStoich::settings::Settings;
/// let mut session = SynthesisSession::new(Settings::default()).unwrap();
/// let composition = CompositionInput::new().with("La", 0.6).with("Sr", 0.4).with("Co", 1.0);
/// let index = session
///     .add_recipe(RecipeRequest::new(SynthesisRoute::Nitrate, composition, 4.0))
///     .unwrap();
/// let record = session.store().get(index).unwrap();
/// assert!(record.additives.is_some());
/// ```
pub mod session;
