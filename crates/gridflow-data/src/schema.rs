//! Serde structs for scenario files and their conversion to and from a
//! [`GridModel`].
//!
//! A scenario file holds a list of named scenarios. Each scenario lists its
//! buildings (by position in the list, which becomes the node id) and its
//! lines (referencing buildings by that index).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use gridflow_core::config::SimConfig;
use gridflow_core::demand::DemandPattern;
use gridflow_core::engine::GridSimulation;
use gridflow_core::error::GridError;
use gridflow_core::grid::{
    Battery, BuildingKind, GeneratorKind, GridModel, HydrogenTank, NodeRole, NodeSpec, StorageKind,
};
use gridflow_core::id::{EdgeId, NodeId};

use crate::loader::{DataLoadError, deserialize_file, write_file};

fn default_budget() -> f64 {
    30.0
}

fn default_money() -> f64 {
    50.0
}

// ===========================================================================
// Records
// ===========================================================================

/// A building entry. Only `base_supply` and position are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    /// Positive for generation, negative for demand.
    pub base_supply: f64,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub removed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_type: Option<BuildingKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_type: Option<GeneratorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<StorageKind>,
    #[serde(default)]
    pub solar_capacity: f64,
    #[serde(default)]
    pub wind_capacity: f64,
    #[serde(default)]
    pub hydro_capacity: f64,
    #[serde(default)]
    pub battery_capacity: f64,
    #[serde(default)]
    pub battery_charge: f64,
    #[serde(default)]
    pub hydrogen_capacity: f64,
    #[serde(default)]
    pub hydrogen_level: f64,
    #[serde(default)]
    pub is_prosumer: bool,
    #[serde(default)]
    pub smart_grid: bool,
}

impl BuildingRecord {
    pub fn new(base_supply: f64, x: f64, y: f64) -> Self {
        Self {
            base_supply,
            x,
            y,
            removed: false,
            building_type: None,
            generator_type: None,
            storage_type: None,
            solar_capacity: 0.0,
            wind_capacity: 0.0,
            hydro_capacity: 0.0,
            battery_capacity: 0.0,
            battery_charge: 0.0,
            hydrogen_capacity: 0.0,
            hydrogen_level: 0.0,
            is_prosumer: false,
            smart_grid: false,
        }
    }

    fn to_spec(&self) -> NodeSpec {
        let mut spec = NodeSpec::new(self.base_supply).at(self.x, self.y);
        spec.role = match (self.generator_type, self.building_type, self.storage_type) {
            (Some(kind), _, _) => NodeRole::Generator { kind },
            (None, Some(building), _) => NodeRole::Consumer { building },
            (None, None, Some(kind)) => NodeRole::Storage { kind },
            (None, None, None) if self.hydrogen_capacity > 0.0 && self.base_supply == 0.0 => {
                NodeRole::Storage {
                    kind: StorageKind::Hydrogen,
                }
            }
            (None, None, None) => spec.role,
        };
        if self.solar_capacity > 0.0 {
            spec = spec.with_solar(self.solar_capacity);
        }
        if self.wind_capacity > 0.0 {
            spec = spec.with_wind(self.wind_capacity);
        }
        if self.hydro_capacity > 0.0 {
            spec = spec.with_hydro(self.hydro_capacity);
        }
        if self.battery_capacity > 0.0 {
            spec = spec.with_battery(self.battery_capacity, self.battery_charge);
        }
        if self.hydrogen_capacity > 0.0 {
            let mut tank = HydrogenTank::new(self.hydrogen_capacity);
            if self.hydrogen_level > 0.0 {
                tank.level = self.hydrogen_level.min(tank.capacity);
            }
            spec.hydrogen = Some(tank);
        }
        spec.prosumer = self.is_prosumer;
        spec.smart_grid = self.smart_grid;
        spec
    }
}

/// A line entry. `u` and `v` index the scenario's building list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub u: u32,
    pub v: u32,
    pub capacity: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub removed: bool,
}

// ===========================================================================
// Scenario
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default, alias = "desc")]
    pub description: String,
    #[serde(default = "default_budget")]
    pub budget: f64,
    #[serde(default = "default_money")]
    pub money: f64,
    pub buildings: Vec<BuildingRecord>,
    #[serde(default)]
    pub lines: Vec<LineRecord>,
    /// Replaces the configured demand pattern when the scenario is started
    /// with [`Scenario::start`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<DemandPattern>,
}

/// A line the grid refused, by its index in the scenario's line list.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedLine {
    pub index: usize,
    pub error: GridError,
}

/// The grid built from a scenario plus any lines that could not be added.
#[derive(Debug, Clone)]
pub struct ScenarioBuild {
    pub model: GridModel,
    pub rejected: Vec<RejectedLine>,
}

/// A running simulation started from a scenario.
#[derive(Debug)]
pub struct ScenarioRun {
    pub simulation: GridSimulation,
    pub rejected: Vec<RejectedLine>,
}

impl Scenario {
    /// Build a grid. Lines with bad endpoints are skipped and reported;
    /// removal flags are applied after every line is in place so removed
    /// buildings keep their lines.
    pub fn into_model(&self) -> ScenarioBuild {
        let mut model = GridModel::new();
        for building in &self.buildings {
            model.add_node(building.to_spec());
        }

        let mut rejected = Vec::new();
        let mut removed_lines = Vec::new();
        for (index, line) in self.lines.iter().enumerate() {
            match model.add_edge(NodeId(line.u), NodeId(line.v), line.capacity, line.cost) {
                Ok(edge) if line.removed => removed_lines.push(edge),
                Ok(_) => {}
                Err(error) => {
                    warn!(scenario = %self.name, index, %error, "skipped scenario line");
                    rejected.push(RejectedLine { index, error });
                }
            }
        }

        for (i, building) in self.buildings.iter().enumerate() {
            if !building.removed {
                continue;
            }
            if let Err(error) = model.remove_node(NodeId(i as u32)) {
                warn!(scenario = %self.name, index = i, %error, "could not remove building");
            }
        }
        for edge in removed_lines {
            if let Err(error) = model.remove_edge(edge) {
                warn!(scenario = %self.name, %edge, %error, "could not remove line");
            }
        }

        ScenarioBuild { model, rejected }
    }

    /// `config` with this scenario's demand pattern in place of the
    /// configured one, when the scenario carries a pattern.
    pub fn configure(&self, mut config: SimConfig) -> SimConfig {
        if let Some(pattern) = &self.pattern {
            config.demand = pattern.clone();
        }
        config
    }

    /// Build the grid and start a simulation on it under
    /// [`Scenario::configure`]d settings.
    pub fn start(&self, config: SimConfig) -> ScenarioRun {
        let ScenarioBuild { model, rejected } = self.into_model();
        ScenarioRun {
            simulation: GridSimulation::new(self.configure(config), model),
            rejected,
        }
    }

    /// Capture a running simulation, keeping its demand pattern.
    pub fn from_simulation(name: impl Into<String>, simulation: &GridSimulation) -> Self {
        Self {
            pattern: Some(simulation.config().demand.clone()),
            ..Self::from_model(name, simulation.grid())
        }
    }

    /// Capture a grid as a scenario for saving. Budget and money take their
    /// defaults; set them on the result if the host tracks them.
    pub fn from_model(name: impl Into<String>, model: &GridModel) -> Self {
        let buildings = model
            .nodes()
            .iter()
            .map(|n| {
                let mut record = BuildingRecord::new(n.base_supply, n.x, n.y);
                record.removed = n.removed;
                match n.role {
                    NodeRole::Generator { kind } => record.generator_type = Some(kind),
                    NodeRole::Consumer { building } => record.building_type = Some(building),
                    NodeRole::Storage { kind } => record.storage_type = Some(kind),
                    NodeRole::Neutral => {}
                }
                record.solar_capacity = n.renewables.solar.map_or(0.0, |s| s.capacity);
                record.wind_capacity = n.renewables.wind.map_or(0.0, |w| w.capacity);
                record.hydro_capacity = n.renewables.hydro.map_or(0.0, |h| h.capacity);
                if let Some(Battery { capacity, charge }) = n.battery {
                    record.battery_capacity = capacity;
                    record.battery_charge = charge;
                }
                if let Some(tank) = n.hydrogen {
                    record.hydrogen_capacity = tank.capacity;
                    record.hydrogen_level = tank.level;
                }
                record.is_prosumer = n.prosumer;
                record.smart_grid = n.smart_grid;
                record
            })
            .collect();

        let lines = model
            .edges()
            .iter()
            .map(|e| LineRecord {
                u: e.u.0,
                v: e.v.0,
                capacity: e.capacity,
                cost: e.cost,
                removed: e.removed,
            })
            .collect();

        Self {
            name: name.into(),
            description: String::new(),
            budget: default_budget(),
            money: default_money(),
            buildings,
            lines,
            pattern: None,
        }
    }

    /// Edge id of the `index`-th line once built, if it was accepted.
    pub fn edge_for_line(build: &ScenarioBuild, index: usize) -> Option<EdgeId> {
        let skipped = build.rejected.iter().filter(|r| r.index < index).count();
        if build.rejected.iter().any(|r| r.index == index) {
            None
        } else {
            Some(EdgeId((index - skipped) as u32))
        }
    }
}

// ===========================================================================
// Files
// ===========================================================================

/// Top level of a scenario file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub scenarios: Vec<Scenario>,
}

impl ScenarioFile {
    /// Look up a scenario by name.
    pub fn find(&self, name: &str, file: &Path) -> Result<&Scenario, DataLoadError> {
        self.scenarios
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| DataLoadError::UnresolvedRef {
                file: file.to_path_buf(),
                name: name.to_string(),
                expected_kind: "scenario",
            })
    }

    fn check_unique(&self, file: &Path) -> Result<(), DataLoadError> {
        for (i, scenario) in self.scenarios.iter().enumerate() {
            if self.scenarios[..i].iter().any(|s| s.name == scenario.name) {
                return Err(DataLoadError::DuplicateName {
                    file: file.to_path_buf(),
                    name: scenario.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Load every scenario in a file, rejecting duplicate names.
pub fn load_scenarios(path: &Path) -> Result<ScenarioFile, DataLoadError> {
    let file: ScenarioFile = deserialize_file(path)?;
    file.check_unique(path)?;
    Ok(file)
}

/// Load one named scenario from a file.
pub fn load_scenario(path: &Path, name: &str) -> Result<Scenario, DataLoadError> {
    let file = load_scenarios(path)?;
    file.find(name, path).cloned()
}

pub fn save_scenarios(path: &Path, file: &ScenarioFile) -> Result<(), DataLoadError> {
    write_file(path, file)
}

pub fn load_config(path: &Path) -> Result<SimConfig, DataLoadError> {
    deserialize_file(path)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{Format, deserialize_str};
    use gridflow_core::test_utils::*;
    use std::fs;
    use std::path::PathBuf;

    const CITY_JSON: &str = r#"{
        "scenarios": [
            {
                "name": "harbour",
                "desc": "Two plants feeding the old town",
                "budget": 40.0,
                "buildings": [
                    {"base_supply": 30.0, "x": 0.0, "y": 0.0, "generator_type": "thermal"},
                    {"base_supply": -8.0, "x": 50.0, "y": 0.0, "building_type": "hospital"},
                    {"base_supply": -5.0, "x": 100.0, "y": 0.0, "solar_capacity": 4.0,
                     "battery_capacity": 10.0, "battery_charge": 3.0, "is_prosumer": true},
                    {"base_supply": 0.0, "x": 50.0, "y": 50.0, "removed": true}
                ],
                "lines": [
                    {"u": 0, "v": 1, "capacity": 20.0, "cost": 1.5},
                    {"u": 1, "v": 2, "capacity": 10.0, "cost": 1.0},
                    {"u": 1, "v": 9, "capacity": 10.0, "cost": 1.0},
                    {"u": 3, "v": 2, "capacity": 5.0, "cost": 1.0, "removed": true}
                ]
            },
            {
                "name": "empty",
                "buildings": []
            }
        ]
    }"#;

    fn label() -> PathBuf {
        PathBuf::from("scenarios.json")
    }

    fn city() -> ScenarioFile {
        deserialize_str(CITY_JSON, Format::Json, &label()).unwrap()
    }

    #[test]
    fn parses_with_defaults_and_alias() {
        let file = city();
        let harbour = file.find("harbour", &label()).unwrap();
        assert_eq!(harbour.description, "Two plants feeding the old town");
        assert_eq!(harbour.budget, 40.0);
        assert_eq!(harbour.money, 50.0);
        assert_eq!(harbour.buildings[1].building_type, Some(BuildingKind::Hospital));

        let empty = file.find("empty", &label()).unwrap();
        assert_eq!(empty.budget, 30.0);
        assert!(empty.lines.is_empty());
    }

    #[test]
    fn unknown_scenario_is_unresolved() {
        let err = city().find("inland", &label()).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::UnresolvedRef { expected_kind: "scenario", .. }
        ));
    }

    #[test]
    fn into_model_reports_bad_lines() {
        let file = city();
        let build = file.find("harbour", &label()).unwrap().into_model();
        let model = &build.model;

        assert_eq!(model.node_count(), 4);
        assert_eq!(model.edge_count(), 3);
        assert_eq!(build.rejected.len(), 1);
        assert_eq!(build.rejected[0].index, 2);
        assert!(matches!(
            build.rejected[0].error,
            GridError::EndpointOutOfRange { node: NodeId(9), .. }
        ));

        // The removed building keeps its line; both are flagged.
        assert!(model.nodes()[3].removed);
        assert!(model.edges()[2].removed);
        assert_eq!(model.edges()[2].u, NodeId(3));

        let prosumer = &model.nodes()[2];
        assert!(prosumer.prosumer);
        assert_eq!(prosumer.battery.map(|b| b.charge), Some(3.0));
        assert_eq!(prosumer.renewables.solar_capacity(), 4.0);
        assert_eq!(
            model.nodes()[1].role,
            NodeRole::Consumer {
                building: BuildingKind::Hospital
            }
        );

        let scenario = file.find("harbour", &label()).unwrap();
        assert_eq!(Scenario::edge_for_line(&build, 1), Some(EdgeId(1)));
        assert_eq!(Scenario::edge_for_line(&build, 2), None);
        assert_eq!(Scenario::edge_for_line(&build, 3), Some(EdgeId(2)));
        assert_eq!(scenario.lines.len(), 4);
    }

    #[test]
    fn from_model_preserves_the_grid() {
        let mut grid = scenario_c().grid;
        grid.add_node(NodeSpec::hydrogen_storage(50.0).at(10.0, 20.0));
        grid.remove_edge(EdgeId(1)).unwrap();

        let scenario = Scenario::from_model("saved", &grid);
        let rebuilt = scenario.into_model();
        assert!(rebuilt.rejected.is_empty());
        assert_eq!(rebuilt.model.state_hash(), grid.state_hash());
    }

    #[test]
    fn storage_roles_survive_a_round_trip() {
        let mut grid = GridModel::new();
        let mut spec = NodeSpec::new(0.0).with_battery(20.0, 5.0);
        spec.role = NodeRole::Storage {
            kind: StorageKind::Battery,
        };
        let bank = grid.add_node(spec);
        let tank = grid.add_node(NodeSpec::hydrogen_storage(40.0));

        let scenario = Scenario::from_model("storage", &grid);
        assert_eq!(scenario.buildings[0].storage_type, Some(StorageKind::Battery));

        let ron =
            crate::loader::serialize_string(&scenario, Format::Ron, Path::new("storage.ron"))
                .unwrap();
        let parsed: Scenario = deserialize_str(&ron, Format::Ron, Path::new("storage.ron")).unwrap();
        let rebuilt = parsed.into_model().model;
        assert_eq!(rebuilt.node(bank).unwrap().role, grid.node(bank).unwrap().role);
        assert_eq!(
            rebuilt.node(tank).unwrap().role,
            NodeRole::Storage {
                kind: StorageKind::Hydrogen
            }
        );
    }

    #[test]
    fn scenario_pattern_drives_the_simulation() {
        let mut doubled = DemandPattern::flat();
        doubled.daily = vec![2.0; 24];
        let mut scenario = Scenario::from_model("peak", &scenario_b().grid);

        let plain = scenario.start(SimConfig::deterministic());
        assert_eq!(plain.simulation.config().demand, DemandPattern::flat());

        scenario.pattern = Some(doubled.clone());
        let run = scenario.start(SimConfig::deterministic());
        assert!(run.rejected.is_empty());
        assert_eq!(run.simulation.config().demand, doubled);

        let (mut plain, mut peak) = (plain.simulation, run.simulation);
        plain.step(&neutral_weather(1));
        peak.step(&neutral_weather(1));
        assert_close(
            peak.orchestrator().stats().total_demanded,
            2.0 * plain.orchestrator().stats().total_demanded,
        );

        let saved = Scenario::from_simulation("peak", &peak);
        assert_eq!(saved.pattern, Some(doubled));
    }

    #[test]
    fn save_and_load_ron() {
        let dir = std::env::temp_dir().join(format!(
            "gridflow_data_test_scenario_ron_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scenarios.ron");

        save_scenarios(&path, &city()).unwrap();
        let loaded = load_scenario(&path, "harbour").unwrap();
        assert_eq!(&loaded, city().find("harbour", &label()).unwrap());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let dir = std::env::temp_dir().join(format!(
            "gridflow_data_test_dup_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scenarios.toml");
        fs::write(
            &path,
            r#"
[[scenarios]]
name = "twin"
buildings = []

[[scenarios]]
name = "twin"
buildings = []
"#,
        )
        .unwrap();

        let err = load_scenarios(&path).unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateName { ref name, .. } if name == "twin"));

        let _ = fs::remove_dir_all(&dir);
    }
}
