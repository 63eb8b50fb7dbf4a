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

//! Attribute Decorators (4.4): social competence, public-transport usage and
//! duration, and employment, applied to an already-lodged population.

use std::collections::HashMap;

use rand::prelude::*;

use crate::config;
use crate::error::SimError;
use crate::population::person::{EmploymentStatus, Gender, Person};
use crate::sampler::{self, Distribution, DistributionParams};

/// Draws social competence for every person from Normal(loc, scale) and
/// min-max rescales the sample into `[0, 1]`.
pub fn decorate_social_competence(
    population: &mut [Person],
    loc: f64,
    scale: f64,
    rng: &mut impl Rng,
) -> Result<(), SimError> {
    let mut values = sampler::sample(Distribution::Normal, population.len(), DistributionParams::new(loc, scale), rng)?;
    sampler::rescale_min_max(&mut values);
    for (person, value) in population.iter_mut().zip(values) {
        person.social_competence = value;
    }
    Ok(())
}

/// Draws public-transport usage (Bernoulli, p = [`config::PUBLIC_TRANSPORT_USAGE_PROBABILITY`])
/// for every person, then draws a duration for the users only: a Normal(0,1)
/// sample rescaled linearly into `[0, 2 * mu]`, where `mu` spreads the
/// population-wide average transport minutes across the actual users.
/// Non-users keep a duration of `0.0`.
pub fn decorate_public_transport(population: &mut [Person], rng: &mut impl Rng) -> Result<(), SimError> {
    let usage = sampler::sample(
        Distribution::Bernoulli,
        population.len(),
        DistributionParams::new(config::PUBLIC_TRANSPORT_USAGE_PROBABILITY, 0.0),
        rng,
    )?;

    let mut user_indices = Vec::new();
    for (idx, (person, used)) in population.iter_mut().zip(usage.iter()).enumerate() {
        person.uses_public_transport = *used != 0.0;
        person.public_transport_duration = 0.0;
        if person.uses_public_transport {
            user_indices.push(idx);
        }
    }

    if user_indices.is_empty() {
        return Ok(());
    }

    let n = population.len() as f64;
    let n_users = user_indices.len() as f64;
    let mu = config::PUBLIC_TRANSPORT_AVERAGE_MINUTES * n / n_users;

    let mut durations = sampler::sample(Distribution::Normal, user_indices.len(), DistributionParams::new(0.0, 1.0), rng)?;
    sampler::rescale_min_max(&mut durations);
    for duration in durations.iter_mut() {
        *duration *= 2.0 * mu;
    }

    for (idx, duration) in user_indices.into_iter().zip(durations) {
        population[idx].public_transport_duration = duration;
    }

    Ok(())
}

/// Maps (age, gender) to an economic group label; only `"production"` is
/// eligible for employment.
pub type EconomicGroupTable = HashMap<(u32, Gender), String>;

/// Merges the population with `economic_groups`, restricts to the
/// production-age subpopulation, then marks `target_employment_count`
/// distinct persons (sampled without replacement) as employed; the rest of
/// the production-age subpopulation is marked not employed. Persons outside
/// the production-age group are left `NotSet`.
pub fn decorate_employment(
    population: &mut [Person],
    economic_groups: &EconomicGroupTable,
    target_employment_count: usize,
    rng: &mut impl Rng,
) -> Result<(), SimError> {
    let production_indices: Vec<usize> = population
        .iter()
        .enumerate()
        .filter(|(_, p)| economic_groups.get(&(p.age, p.gender)).map(|g| g == "production").unwrap_or(false))
        .map(|(idx, _)| idx)
        .collect();

    let target = target_employment_count.min(production_indices.len());
    let employed: Vec<usize> = production_indices
        .choose_multiple(rng, target)
        .copied()
        .collect();
    let employed_set: std::collections::HashSet<usize> = employed.into_iter().collect();

    for idx in &production_indices {
        population[*idx].employment_status = if employed_set.contains(idx) {
            EmploymentStatus::Employed
        } else {
            EmploymentStatus::NotEmployed
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::person::Generation;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn population(n: usize) -> Vec<Person> {
        (0..n as u32).map(|id| Person::new(id, 30, Gender::Male, Generation::Middle)).collect()
    }

    #[test]
    fn social_competence_is_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pop = population(200);
        decorate_social_competence(&mut pop, 0.5, 0.2, &mut rng).unwrap();
        assert!(pop.iter().all(|p| (0.0..=1.0).contains(&p.social_competence)));
    }

    #[test]
    fn non_users_have_zero_duration() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut pop = population(500);
        decorate_public_transport(&mut pop, &mut rng).unwrap();
        for p in &pop {
            if !p.uses_public_transport {
                assert_eq!(p.public_transport_duration, 0.0);
            } else {
                assert!(p.public_transport_duration >= 0.0);
            }
        }
    }

    #[test]
    fn employment_respects_target_count() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut pop = population(100);
        let mut economic_groups = EconomicGroupTable::new();
        economic_groups.insert((30, Gender::Male), "production".to_string());

        decorate_employment(&mut pop, &economic_groups, 40, &mut rng).unwrap();

        let employed = pop.iter().filter(|p| p.employment_status == EmploymentStatus::Employed).count();
        assert_eq!(employed, 40);
        let not_employed = pop.iter().filter(|p| p.employment_status == EmploymentStatus::NotEmployed).count();
        assert_eq!(not_employed, 60);
    }
}
