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

//! Severity Assignment (4.5): age-cohort-conditioned expected case severity.

use std::collections::HashMap;

use enum_map::{Enum, EnumMap};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Deserialize, Serialize)]
pub enum Severity {
    Asymptomatic,
    Mild,
    Severe,
    Critical,
}

/// Global severity proportions and the critical-conditional fatality rate,
/// as read from `case_severity_distribution` and `death_probability` in the
/// parameter file.
#[derive(Debug, Clone)]
pub struct SeverityParameters {
    pub global_proportions: EnumMap<Severity, f64>,
    pub p_death_given_critical: f64,
}

/// Per-cohort case-fatality rates (CFR), one per entry of
/// [`config::SEVERITY_COHORT_CUTPOINTS`], in the same order.
#[derive(Debug, Clone)]
pub struct CohortFatalityRates(pub Vec<f64>);

/// Resolves an age to its cohort index within [`config::SEVERITY_COHORT_CUTPOINTS`].
pub fn cohort_index(age: u32) -> usize {
    let cutpoints = &config::SEVERITY_COHORT_CUTPOINTS;
    let mut index = 0;
    for (i, cutpoint) in cutpoints.iter().enumerate() {
        if age >= *cutpoint {
            index = i;
        }
    }
    index
}

/// Builds the cohort-conditional severity vector: `P(Critical | cohort) =
/// CFR(cohort) / p_death_given_critical`, with the remaining probability mass
/// spread across Asymptomatic/Mild/Severe in proportion to their global
/// shares. Fails with `InvalidParameter` if `p_death_given_critical` is zero,
/// or if a cohort's implied critical probability exceeds 1.
pub fn cohort_severity_distribution(
    params: &SeverityParameters,
    cfr: f64,
) -> Result<EnumMap<Severity, f64>, SimError> {
    if params.p_death_given_critical <= 0.0 {
        return Err(SimError::invalid_parameter("death_probability.Critical must be > 0".into()));
    }

    let p_critical = cfr / params.p_death_given_critical;
    if !(0.0..=1.0).contains(&p_critical) {
        return Err(SimError::invalid_parameter(format!(
            "implied P(Critical|cohort) = {} is outside [0, 1] (cfr={}, p_death|critical={})",
            p_critical, cfr, params.p_death_given_critical
        )));
    }

    let remaining = 1.0 - p_critical;
    let noncritical_sum: f64 = [Severity::Asymptomatic, Severity::Mild, Severity::Severe]
        .iter()
        .map(|s| params.global_proportions[*s])
        .sum();

    let mut distribution = EnumMap::default();
    distribution[Severity::Critical] = p_critical;
    if noncritical_sum <= 0.0 {
        distribution[Severity::Asymptomatic] = remaining;
    } else {
        for severity in [Severity::Asymptomatic, Severity::Mild, Severity::Severe] {
            distribution[severity] = params.global_proportions[severity] / noncritical_sum * remaining;
        }
    }

    Ok(distribution)
}

/// Precomputes a cohort-conditional severity vector per cohort.
pub fn build_cohort_table(
    params: &SeverityParameters,
    cfr: &CohortFatalityRates,
) -> Result<Vec<EnumMap<Severity, f64>>, SimError> {
    cfr.0.iter().map(|c| cohort_severity_distribution(params, *c)).collect()
}

/// Draws one severity by a single multinomial realisation over `distribution`.
pub fn draw_severity(distribution: &EnumMap<Severity, f64>, rng: &mut impl Rng) -> Severity {
    let roll: f64 = rng.gen_range(0.0..1.0);
    let mut cumulative = 0.0;
    let mut last = Severity::Critical;
    for severity in [Severity::Asymptomatic, Severity::Mild, Severity::Severe, Severity::Critical] {
        cumulative += distribution[severity];
        last = severity;
        if roll < cumulative {
            return severity;
        }
    }
    last
}

/// Assigns a severity to every person id in `0..population_len`, keyed by
/// the person's age cohort, using `cohort_table` built by [`build_cohort_table`].
pub fn assign_severities(
    ages: &[u32],
    cohort_table: &[EnumMap<Severity, f64>],
    rng: &mut impl Rng,
) -> HashMap<u32, Severity> {
    ages.iter()
        .enumerate()
        .map(|(id, age)| {
            let distribution = &cohort_table[cohort_index(*age)];
            (id as u32, draw_severity(distribution, rng))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn params() -> SeverityParameters {
        let mut global = EnumMap::default();
        global[Severity::Asymptomatic] = 0.4;
        global[Severity::Mild] = 0.4;
        global[Severity::Severe] = 0.15;
        global[Severity::Critical] = 0.05;
        SeverityParameters { global_proportions: global, p_death_given_critical: 0.5 }
    }

    #[test]
    fn cohort_distribution_sums_to_one() {
        let distribution = cohort_severity_distribution(&params(), 0.1).unwrap();
        let sum: f64 = distribution.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn critical_probability_matches_cfr() {
        let p = params();
        let distribution = cohort_severity_distribution(&p, 0.1).unwrap();
        assert!((distribution[Severity::Critical] * p.p_death_given_critical - 0.1).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_cfr_is_invalid_parameter() {
        let p = params();
        // cfr / p_death_given_critical > 1
        assert!(cohort_severity_distribution(&p, 10.0).is_err());
    }

    #[test]
    fn cohort_index_buckets_correctly() {
        assert_eq!(cohort_index(0), 0);
        assert_eq!(cohort_index(19), 0);
        assert_eq!(cohort_index(20), 1);
        assert_eq!(cohort_index(79), 5);
        assert_eq!(cohort_index(80), 6);
        assert_eq!(cohort_index(120), 6);
    }

    #[test]
    fn draw_severity_is_deterministic_given_seed() {
        let mut rng1 = StdRng::seed_from_u64(9);
        let mut rng2 = StdRng::seed_from_u64(9);
        let distribution = cohort_severity_distribution(&params(), 0.1).unwrap();
        let a = draw_severity(&distribution, &mut rng1);
        let b = draw_severity(&distribution, &mut rng2);
        assert_eq!(a, b);
    }
}
