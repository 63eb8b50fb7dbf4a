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

//! Core A-1: Population Builder.
//!
//! Expands an age x gender marginal table into one [`Person`] per unit of
//! `total`, in deterministic row order.

use std::collections::HashMap;

use log::warn;
use serde::Deserialize;

use crate::population::person::{Gender, Generation, Person};

/// One row of the age x gender marginal input table.
#[derive(Debug, Clone, Deserialize)]
pub struct AgeGenderRow {
    pub age: u32,
    pub males: u32,
    pub females: u32,
    pub total: u32,
}

/// Expands `rows` into a population, one [`Person`] per unit of `total`.
///
/// `generation_lookup`, if supplied, overrides the coarse
/// [`Generation::from_age`] mapping with an externally-supplied age -> bucket
/// table (as the source data occasionally encodes bucket boundaries that
/// don't match the builder's defaults).
///
/// Ids are assigned in row order, males first then females within a row, so
/// that two runs over the same input produce an identical id assignment.
pub fn build_population(
    rows: &[AgeGenderRow],
    generation_lookup: Option<&HashMap<u32, Generation>>,
) -> Vec<Person> {
    let mut population = Vec::with_capacity(rows.iter().map(|r| r.total as usize).sum());
    let mut next_id: u32 = 0;

    for row in rows {
        if row.males + row.females != row.total {
            warn!(
                "age {} marginal mismatch: males ({}) + females ({}) != total ({}); generating by males/females split",
                row.age, row.males, row.females, row.total
            );
        }

        let generation = generation_lookup
            .and_then(|lookup| lookup.get(&row.age).copied())
            .unwrap_or_else(|| Generation::from_age(row.age));

        for _ in 0..row.males {
            population.push(Person::new(next_id, row.age, Gender::Male, generation));
            next_id += 1;
        }
        for _ in 0..row.females {
            population.push(Person::new(next_id, row.age, Gender::Female, generation));
            next_id += 1;
        }
    }

    population
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_conservation() {
        let rows = vec![
            AgeGenderRow { age: 0, males: 3, females: 2, total: 5 },
            AgeGenderRow { age: 30, males: 10, females: 12, total: 22 },
            AgeGenderRow { age: 80, males: 1, females: 4, total: 5 },
        ];
        let population = build_population(&rows, None);
        let expected_total: u32 = rows.iter().map(|r| r.total).sum();
        assert_eq!(population.len(), expected_total as usize);

        for row in &rows {
            let males = population.iter().filter(|p| p.age == row.age && p.gender == Gender::Male).count();
            let females = population.iter().filter(|p| p.age == row.age && p.gender == Gender::Female).count();
            assert_eq!(males, row.males as usize);
            assert_eq!(females, row.females as usize);
        }
    }

    #[test]
    fn ids_are_unique_and_sequential() {
        let rows = vec![AgeGenderRow { age: 10, males: 2, females: 2, total: 4 }];
        let population = build_population(&rows, None);
        let ids: Vec<u32> = population.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn generation_lookup_override_wins() {
        let rows = vec![AgeGenderRow { age: 5, males: 1, females: 0, total: 1 }];
        let mut lookup = HashMap::new();
        lookup.insert(5, Generation::Elderly);
        let population = build_population(&rows, Some(&lookup));
        assert_eq!(population[0].generation, Generation::Elderly);
    }
}
