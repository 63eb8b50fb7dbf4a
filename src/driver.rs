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

//! Core: Simulation Driver (4.10).
//!
//! The multi-seed outer loop: each seed gets a fresh RNG and a fresh
//! [`Engine`], is seeded from initial conditions and import intensity, run
//! to a terminal condition, and folded into a [`DriverSummary`].

use std::collections::HashMap;

use enum_map::EnumMap;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config;
use crate::error::SimError;
use crate::event::{Event, EventType, InfectionRecord, InfectionStatus, InitiatedThrough, ProgressionRecord};
use crate::params::{ImportFunction, InitialConditionEntry, InitialConditions, Params};
use crate::population::person::Person;
use crate::severity::{self, CohortFatalityRates, Severity, SeverityParameters};
use crate::state_machine::Engine;

/// Per-seed output retained for downstream reporting (§6 event log output).
pub struct SeedOutput {
    pub seed: u64,
    pub infection_log: Vec<InfectionRecord>,
    pub progression_log: HashMap<u32, ProgressionRecord>,
    pub affected: u32,
    pub deaths: u32,
    pub outbreak: bool,
}

/// Accumulated multi-seed statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct DriverSummary {
    pub total_seeds: u32,
    pub outbreak_count: u32,
    pub outbreak_time_sum: f64,
    pub non_outbreak_affected_sum: u64,
    pub non_outbreak_count: u32,
}

impl DriverSummary {
    pub fn outbreak_probability(&self) -> f64 {
        if self.total_seeds == 0 {
            0.0
        } else {
            self.outbreak_count as f64 / self.total_seeds as f64
        }
    }

    pub fn mean_outbreak_time(&self) -> f64 {
        if self.outbreak_count == 0 {
            0.0
        } else {
            self.outbreak_time_sum / self.outbreak_count as f64
        }
    }

    pub fn mean_affected_on_no_outbreak(&self) -> f64 {
        if self.non_outbreak_count == 0 {
            0.0
        } else {
            self.non_outbreak_affected_sum as f64 / self.non_outbreak_count as f64
        }
    }
}

fn import_intensity_value(function: ImportFunction, t: f64, rate: f64, multiplier: f64) -> f64 {
    match function {
        ImportFunction::NoImport => 0.0,
        ImportFunction::Polynomial => multiplier * t.powf(rate),
        ImportFunction::Exponential => multiplier * ((rate * t).exp() - 1.0),
    }
}

/// Finds `t` such that `F(t) = target` by bisection, expanding the search
/// bracket geometrically until it contains a root. Fails with
/// `InvalidParameter` if no root is bracketed within the configured buffer.
fn bisect_import_time(function: ImportFunction, rate: f64, multiplier: f64, target: f64) -> Result<f64, SimError> {
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    let mut expansions = 0;
    while import_intensity_value(function, hi, rate, multiplier) < target {
        hi *= 2.0;
        expansions += 1;
        if expansions > config::IMPORT_INTENSITY_ROOT_BUFFER {
            return Err(SimError::invalid_parameter(format!(
                "import_intensity root for target {} could not be bracketed",
                target
            )));
        }
    }

    let mut iterations = 0;
    while hi - lo > config::IMPORT_INTENSITY_ROOT_TOLERANCE {
        let mid = (lo + hi) / 2.0;
        if import_intensity_value(function, mid, rate, multiplier) < target {
            lo = mid;
        } else {
            hi = mid;
        }
        iterations += 1;
        if iterations > config::IMPORT_INTENSITY_ROOT_BUFFER {
            return Err(SimError::invalid_parameter(format!(
                "import_intensity bisection for target {} did not converge",
                target
            )));
        }
    }
    Ok((lo + hi) / 2.0)
}

/// Schedules the event(s) that move `person_id` into `status` at `time`,
/// originating from `origin`. Only `Contraction` and `Infectious` are
/// supported as seeding statuses (they are the only two the begin-infection
/// subroutine can draw a progression timeline from); any other status is
/// logged and skipped.
fn seed_status(engine: &mut Engine, person_id: u32, status: InfectionStatus, time: f64, origin: InitiatedThrough) {
    match status {
        InfectionStatus::Contraction => {
            engine.schedule(Event::new(time, person_id, EventType::TMinus1, None, origin, time, InfectionStatus::Contraction));
        }
        InfectionStatus::Infectious => {
            engine.schedule(Event::new(time, person_id, EventType::T0, None, origin, time, InfectionStatus::Infectious));
        }
        other => {
            log::warn!("seeding status {:?} directly is not supported; skipping person {}", other, person_id);
        }
    }
}

fn seed_initial_conditions(engine: &mut Engine, initial_conditions: &InitialConditions, rng: &mut impl Rng) {
    match initial_conditions {
        InitialConditions::List(entries) => {
            for InitialConditionEntry { time, person_id, status } in entries {
                seed_status(engine, *person_id, *status, *time, InitiatedThrough::InitialConditions);
            }
        }
        InitialConditions::Selection(selection) => {
            let total: u32 = selection.cardinalities.values().sum();
            let population_size = engine.population_len() as u32;
            let sampled = rand::seq::index::sample(rng, population_size as usize, total.min(population_size) as usize);
            let mut ids = sampled.into_iter().map(|i| i as u32);
            // iterate in a fixed status order, not HashMap order, so that two
            // runs over identical cardinalities partition the sampled ids the
            // same way.
            for status in [
                InfectionStatus::Healthy,
                InfectionStatus::Contraction,
                InfectionStatus::Infectious,
                InfectionStatus::StayHome,
                InfectionStatus::Hospital,
                InfectionStatus::Death,
            ] {
                let count = selection.cardinalities.get(&status).copied().unwrap_or(0);
                for _ in 0..count {
                    if let Some(person_id) = ids.next() {
                        seed_status(engine, person_id, status, 0.0, InitiatedThrough::InitialConditions);
                    }
                }
            }
        }
    }
}

fn seed_import_intensity(engine: &mut Engine, params: &Params, rng: &mut impl Rng) -> Result<(), SimError> {
    let import = &params.import_intensity;
    if import.function == ImportFunction::NoImport || import.cap == 0 {
        return Ok(());
    }

    let population_size = engine.population_len() as u32;
    for i in 1..=import.cap {
        let time = bisect_import_time(import.function, import.rate, import.multiplier, i as f64)?;
        if population_size == 0 {
            continue;
        }
        let person_id = rng.gen_range(0..population_size);
        let becomes_infectious = rng.gen_range(0.0..1.0) < import.infectious;
        let status = if becomes_infectious { InfectionStatus::Infectious } else { InfectionStatus::Contraction };
        seed_status(engine, person_id, status, time, InitiatedThrough::ImportIntensity);
    }
    Ok(())
}

fn severity_parameters(params: &Params) -> SeverityParameters {
    let global_proportions = params.case_severity_distribution_map();
    let p_death_given_critical = *params.death_probability.get(&Severity::Critical).unwrap_or(&0.0);
    SeverityParameters { global_proportions, p_death_given_critical }
}

fn p_death_map(params: &Params) -> EnumMap<Severity, f64> {
    let mut map = EnumMap::default();
    for (severity, value) in &params.death_probability {
        map[*severity] = *value;
    }
    map
}

/// Runs every seed named by `params.random_seed` over `population`, and
/// folds the results into a [`DriverSummary`] plus one [`SeedOutput`] per seed.
pub fn run_all_seeds(
    params: &Params,
    population: &[Person],
    cohort_fatality_rates: &CohortFatalityRates,
) -> Result<(DriverSummary, Vec<SeedOutput>), SimError> {
    let seeds = params.random_seed.resolve()?;
    let severity_params = severity_parameters(params);
    let cohort_table = severity::build_cohort_table(&severity_params, cohort_fatality_rates)?;
    let ages: Vec<u32> = population.iter().map(|p| p.age).collect();
    let p_death = p_death_map(params);

    let mut summary = DriverSummary::default();
    let mut outputs = Vec::with_capacity(seeds.len());

    for seed in seeds {
        info!("running seed {}", seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let severities = severity::assign_severities(&ages, &cohort_table, &mut rng);

        let mut engine = Engine::new(
            population,
            severities,
            p_death,
            params.disease_progression.clone(),
            params.transmission_probabilities.clone(),
            crate::fear::FearCache::new(params.fear_factors.clone()),
            params.max_time,
            params.start_time,
        );

        seed_initial_conditions(&mut engine, &params.initial_conditions, &mut rng);
        seed_import_intensity(&mut engine, params, &mut rng)?;

        engine.run(params.stop_simulation_threshold, &mut rng)?;

        let outbreak = engine.outbreak(params.stop_simulation_threshold);
        summary.total_seeds += 1;
        if outbreak {
            summary.outbreak_count += 1;
            summary.outbreak_time_sum += engine.current_time;
        } else {
            summary.non_outbreak_count += 1;
            summary.non_outbreak_affected_sum += engine.affected as u64;
        }

        outputs.push(SeedOutput {
            seed,
            infection_log: engine.infection_log().to_vec(),
            progression_log: engine.progression_log().clone(),
            affected: engine.affected,
            deaths: engine.deaths,
            outbreak,
        });
    }

    Ok((summary, outputs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bisection_produces_strictly_increasing_times() {
        let mut times = Vec::new();
        for i in 1..=5 {
            times.push(bisect_import_time(ImportFunction::Polynomial, 1.0, 1.0, i as f64).unwrap());
        }
        for window in times.windows(2) {
            assert!(window[1] > window[0]);
        }
    }

    #[test]
    fn outbreak_probability_is_zero_with_no_seeds() {
        let summary = DriverSummary::default();
        assert_eq!(summary.outbreak_probability(), 0.0);
    }
}
