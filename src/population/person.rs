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

use serde::{Deserialize, Serialize};

use crate::config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum EmploymentStatus {
    NotSet,
    NotEmployed,
    Employed,
}

/// Coarse three-bucket age label used for household composition constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Generation {
    Young,
    Middle,
    Elderly,
}

impl Generation {
    /// Coarse young/middle/elderly mapping used when the caller does not
    /// supply an explicit age->generation table. See `config` for cut-points.
    pub fn from_age(age: u32) -> Generation {
        if age < config::GENERATION_YOUNG_CUTOFF {
            Generation::Young
        } else if age < config::GENERATION_MIDDLE_CUTOFF {
            Generation::Middle
        } else {
            Generation::Elderly
        }
    }
}

/// A single simulated individual.
///
/// Persons are created once during population assembly and are immutable
/// thereafter except for `household_id` and `employment_status`, which are
/// filled in by the household builder and attribute decorators respectively.
/// Infection status and progression timestamps are tracked externally by the
/// state machine, not on this struct, so that the immutable population table
/// can be shared read-only across every simulated seed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Person {
    pub id: u32,
    pub age: u32,
    pub gender: Gender,
    pub generation: Generation,
    pub employment_status: EmploymentStatus,
    pub social_competence: f64,
    pub uses_public_transport: bool,
    pub public_transport_duration: f64,
    pub household_id: i64,
    pub profession_index: i64,
}

impl Person {
    pub fn new(id: u32, age: u32, gender: Gender, generation: Generation) -> Person {
        Person {
            id,
            age,
            gender,
            generation,
            employment_status: EmploymentStatus::NotSet,
            social_competence: 0.0,
            uses_public_transport: false,
            public_transport_duration: 0.0,
            household_id: config::UNLODGED_HOUSEHOLD_ID,
            profession_index: config::UNSET_PROFESSION_INDEX,
        }
    }

    pub fn is_lodged(&self) -> bool {
        self.household_id != config::UNLODGED_HOUSEHOLD_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_from_age_buckets() {
        assert_eq!(Generation::from_age(0), Generation::Young);
        assert_eq!(Generation::from_age(19), Generation::Young);
        assert_eq!(Generation::from_age(20), Generation::Middle);
        assert_eq!(Generation::from_age(44), Generation::Middle);
        assert_eq!(Generation::from_age(45), Generation::Elderly);
        assert_eq!(Generation::from_age(90), Generation::Elderly);
    }

    #[test]
    fn new_person_is_unlodged_and_unemployed() {
        let p = Person::new(0, 30, Gender::Male, Generation::Middle);
        assert!(!p.is_lodged());
        assert_eq!(p.employment_status, EmploymentStatus::NotSet);
        assert_eq!(p.profession_index, config::UNSET_PROFESSION_INDEX);
    }
}
