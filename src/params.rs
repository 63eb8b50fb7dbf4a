/*
 * Epidemic Simulation Using Census Data (ESUCD)
 * Copyright (c)  2021. Sam Ralph
 *
 * This file is part of ESUCD.
 *
 * ESUCD is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, version 3 of the License.
 *
 * ESUCD is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with ESUCD.  If not, see <https://www.gnu.org/licenses/>.
 *
 */

//! Core B-0: parameter file schema and loading (§6, §7).
//!
//! A fixed-schema deserialisation of the JSON parameter file. Unknown keys
//! are rejected at parse time (`deny_unknown_fields`) rather than tolerated
//! as free-form dictionaries, per Design Note: "Attribute-on-the-fly
//! dictionaries."

use std::collections::HashMap;
use std::path::Path;

use enum_map::EnumMap;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::event::{InfectionStatus, InitiatedThrough};
use crate::fear::FearFactorParams;
use crate::sampler::DistributionSpec;
use crate::severity::Severity;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiseaseProgressionParams {
    #[serde(rename = "T0")]
    pub t0: DistributionSpec,
    #[serde(rename = "T1")]
    pub t1: DistributionSpec,
    #[serde(rename = "T2")]
    pub t2: DistributionSpec,
    #[serde(rename = "TDEATH")]
    pub t_death: DistributionSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum ImportFunction {
    NoImport,
    Polynomial,
    Exponential,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportIntensityParams {
    pub function: ImportFunction,
    #[serde(default)]
    pub multiplier: f64,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub cap: u32,
    #[serde(default)]
    pub infectious: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InitialConditionEntry {
    pub time: f64,
    pub person_id: u32,
    pub status: InfectionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum SelectionAlgorithm {
    RandomSelection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionInitialConditions {
    pub selection_algorithm: SelectionAlgorithm,
    pub cardinalities: HashMap<InfectionStatus, u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum InitialConditions {
    List(Vec<InitialConditionEntry>),
    Selection(SelectionInitialConditions),
}

/// `random_seed` may be a single integer or a string encoding a list, e.g.
/// `"[1, 2, 3]"`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SeedSpec {
    Single(u64),
    Encoded(String),
}

impl SeedSpec {
    pub fn resolve(&self) -> Result<Vec<u64>, SimError> {
        match self {
            SeedSpec::Single(seed) => Ok(vec![*seed]),
            SeedSpec::Encoded(text) => {
                let trimmed = text.trim().trim_start_matches('[').trim_end_matches(']');
                trimmed
                    .split(',')
                    .map(|part| {
                        part.trim()
                            .parse::<u64>()
                            .map_err(|e| SimError::invalid_parameter(format!("cannot parse seed entry {:?}: {}", part, e)))
                    })
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Params {
    pub output_root_dir: String,
    pub experiment_id: String,
    pub epidemic_status: String,
    pub stop_simulation_threshold: u32,
    pub case_severity_distribution: HashMap<Severity, f64>,
    pub death_probability: HashMap<Severity, f64>,
    pub disease_progression: DiseaseProgressionParams,
    pub transmission_probabilities: HashMap<InitiatedThrough, f64>,
    pub fear_factors: HashMap<InitiatedThrough, FearFactorParams>,
    pub initial_conditions: InitialConditions,
    pub import_intensity: ImportIntensityParams,
    pub start_time: f64,
    pub max_time: f64,
    pub random_seed: SeedSpec,
    pub save_input_data: bool,
    pub log_outputs: bool,
    #[serde(default)]
    pub comment: String,
}

impl Params {
    /// Loads and validates a parameter file from `path`.
    ///
    /// Validation beyond `serde`'s schema check: severity/death-probability
    /// maps must sum/cover all four [`Severity`] variants as required by the
    /// case-severity-distribution invariant (§8.4).
    pub fn load(path: &Path) -> Result<Params, SimError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimError::invalid_parameter(format!("cannot read {}: {}", path.display(), e)))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Params, SimError> {
        let params: Params = serde_json::from_str(text)
            .map_err(|e| SimError::invalid_parameter(format!("malformed parameter file: {}", e)))?;
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<(), SimError> {
        let sum: f64 = self.case_severity_distribution.values().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(SimError::invalid_parameter(format!(
                "case_severity_distribution must sum to 1, got {}",
                sum
            )));
        }
        for severity in [Severity::Asymptomatic, Severity::Mild, Severity::Severe, Severity::Critical] {
            if !self.case_severity_distribution.contains_key(&severity) {
                return Err(SimError::invalid_parameter(format!("case_severity_distribution missing {:?}", severity)));
            }
            if !self.death_probability.contains_key(&severity) {
                return Err(SimError::invalid_parameter(format!("death_probability missing {:?}", severity)));
            }
        }
        Ok(())
    }

    pub fn case_severity_distribution_map(&self) -> EnumMap<Severity, f64> {
        let mut map = EnumMap::default();
        for (severity, value) in &self.case_severity_distribution {
            map[*severity] = *value;
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "output_root_dir": "out",
            "experiment_id": "s1",
            "epidemic_status": "active",
            "stop_simulation_threshold": 100,
            "case_severity_distribution": {"Asymptomatic": 0.4, "Mild": 0.4, "Severe": 0.15, "Critical": 0.05},
            "death_probability": {"Asymptomatic": 0.0, "Mild": 0.0, "Severe": 0.05, "Critical": 0.5},
            "disease_progression": {
                "T0": {"distribution": "Constant", "loc": 3.0, "scale": 0.0},
                "T1": {"distribution": "Constant", "loc": 5.0, "scale": 0.0},
                "T2": {"distribution": "Constant", "loc": 8.0, "scale": 0.0},
                "TDEATH": {"distribution": "Constant", "loc": 12.0, "scale": 0.0}
            },
            "transmission_probabilities": {"Household": 0.5, "Constant": 0.0},
            "fear_factors": {"Household": {"fear_function": "Disabled", "limit_value": 1.0, "scale_factor": 0.0, "deaths_multiplier": 0.0, "detected_multiplier": 0.0}},
            "initial_conditions": [{"time": 0.0, "person_id": 0, "status": "Infectious"}],
            "import_intensity": {"function": "NoImport", "multiplier": 0.0, "rate": 0.0, "cap": 0, "infectious": 0.0},
            "start_time": 0.0,
            "max_time": 30.0,
            "random_seed": 1,
            "save_input_data": false,
            "log_outputs": false,
            "comment": "test"
        }"#
    }

    #[test]
    fn parses_full_schema() {
        let params = Params::parse(sample_json()).unwrap();
        assert_eq!(params.max_time, 30.0);
        assert!(matches!(params.initial_conditions, InitialConditions::List(_)));
    }

    #[test]
    fn rejects_unknown_fields() {
        let mut value: serde_json::Value = serde_json::from_str(sample_json()).unwrap();
        value.as_object_mut().unwrap().insert("bogus_key".into(), serde_json::json!(true));
        let text = serde_json::to_string(&value).unwrap();
        assert!(Params::parse(&text).is_err());
    }

    #[test]
    fn rejects_non_normalised_severity_distribution() {
        let mut value: serde_json::Value = serde_json::from_str(sample_json()).unwrap();
        value["case_severity_distribution"]["Mild"] = serde_json::json!(0.9);
        let text = serde_json::to_string(&value).unwrap();
        assert!(Params::parse(&text).is_err());
    }

    #[test]
    fn seed_spec_resolves_encoded_list() {
        let spec = SeedSpec::Encoded("[1, 2, 3]".to_string());
        assert_eq!(spec.resolve().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn seed_spec_resolves_single() {
        let spec = SeedSpec::Single(42);
        assert_eq!(spec.resolve().unwrap(), vec![42]);
    }
}
