pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, Format};
pub use schema::{
    Scenario, ScenarioBuild, ScenarioFile, ScenarioRun, load_config, load_scenario, load_scenarios,
};
