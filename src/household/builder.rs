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

//! Core A-2: Household Builder.
//!
//! House-master selection (4.3.1) narrows a lookup table to a demographic
//! slot for each household, then member lodging (4.3.2) assigns real people
//! to the master slot and to the remaining seats, respecting per-generation
//! presence constraints.

use std::collections::HashMap;

use log::warn;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::Deserialize;

use crate::error::SimError;
use crate::household::household::{AgeBucket, FamilyType, GenerationPresence, Household, MasterArchetype};
use crate::population::person::{Gender, Generation, Person};

/// Raw household input row, one per household, before master selection.
#[derive(Debug, Clone, Deserialize)]
pub struct HouseholdInputRow {
    pub headcount: u32,
    pub family_type: u8,
    pub young: bool,
    pub middle: bool,
    pub elderly: bool,
    pub relationship: String,
    pub house_master: String,
    #[serde(default)]
    pub family1: Option<String>,
    #[serde(default)]
    pub family2: Option<String>,
    #[serde(default)]
    pub family3: Option<String>,
}

impl HouseholdInputRow {
    pub fn into_household(self, id: u32) -> Result<Household, SimError> {
        let family_type = FamilyType::from_u8(self.family_type).ok_or_else(|| {
            SimError::invalid_parameter(format!("household {} has unknown family_type {}", id, self.family_type))
        })?;
        let presence = GenerationPresence { young: self.young, middle: self.middle, elderly: self.elderly };
        let structure = [self.family1, self.family2, self.family3]
            .into_iter()
            .flatten()
            .collect();
        Ok(Household::new(
            id,
            self.headcount,
            family_type,
            presence,
            self.relationship,
            MasterArchetype(self.house_master),
            structure,
        ))
    }
}

/// One row of the house-master demographic lookup table.
#[derive(Debug, Clone, Deserialize)]
pub struct MasterLookupRow {
    pub age_bucket: String,
    pub gender: Gender,
    pub headcount: u32,
    pub count: f64,
    #[serde(default)]
    pub probability: f64,
    pub young: bool,
    pub middle: bool,
    pub elderly: bool,
}

/// A lookup row after its age-bucket label has been canonicalised and its
/// generation flags collapsed to a single [`Generation`] tag.
#[derive(Debug, Clone)]
pub struct CanonicalMasterRow {
    pub age_bucket: AgeBucket,
    pub gender: Gender,
    pub headcount: u32,
    pub count: f64,
    pub generation: Generation,
}

/// Canonicalises raw lookup rows once at load time (open question iii): bucket
/// labels are parsed into [`AgeBucket`] here and never string-matched again.
pub fn canonicalize_lookup(rows: &[MasterLookupRow]) -> Result<Vec<CanonicalMasterRow>, SimError> {
    rows.iter()
        .map(|row| {
            let age_bucket = AgeBucket::parse(&row.age_bucket).ok_or_else(|| {
                SimError::invalid_parameter(format!("cannot parse age bucket label {:?}", row.age_bucket))
            })?;
            let generation = match (row.young, row.middle, row.elderly) {
                (true, false, false) => Generation::Young,
                (false, true, false) => Generation::Middle,
                (false, false, true) => Generation::Elderly,
                _ => {
                    return Err(SimError::invalid_parameter(format!(
                        "master lookup row for bucket {:?} must set exactly one generation flag",
                        row.age_bucket
                    )))
                }
            };
            Ok(CanonicalMasterRow { age_bucket, gender: row.gender, headcount: row.headcount, count: row.count, generation })
        })
        .collect()
}

/// Narrows the acceptable master generation(s) for `household` per the
/// priority table in 4.3.1. Any combination not named there is a hard error.
fn narrow_master_generations(household: &Household) -> Result<Vec<Generation>, SimError> {
    if let Some(generation) = household.presence.only_one_set() {
        return Ok(vec![generation]);
    }

    let presence = &household.presence;
    match household.family_type {
        FamilyType::NonFamily | FamilyType::ThreeFamilies => Ok(presence.present_generations()),
        FamilyType::OneFamily if household.headcount == 2 => {
            Ok(vec![if presence.elderly { Generation::Elderly } else { Generation::Middle }])
        }
        FamilyType::OneFamily if household.headcount >= 3 => match household.relationship.as_str() {
            "no persons outside family" => match (presence.elderly, presence.middle, presence.young) {
                (true, true, true) => Ok(vec![Generation::Elderly, Generation::Middle]),
                (true, true, false) => Ok(vec![Generation::Elderly]),
                (false, true, true) => Ok(vec![Generation::Middle]),
                (true, false, true) => Ok(vec![Generation::Elderly]),
                _ => Err(SimError::unreachable_selection(
                    household.id,
                    "no persons outside family: generation presence combination not covered".into(),
                )),
            },
            "with other persons" => {
                let adults: Vec<Generation> = presence
                    .present_generations()
                    .into_iter()
                    .filter(|g| *g != Generation::Young)
                    .collect();
                if adults.is_empty() {
                    Err(SimError::unreachable_selection(household.id, "with other persons: no adult generation present".into()))
                } else {
                    Ok(adults)
                }
            }
            "with direct-line elder" => match household.archetype.as_str() {
                "family member" => {
                    if presence.middle && presence.elderly {
                        Ok(vec![Generation::Middle])
                    } else {
                        Ok(vec![Generation::Young])
                    }
                }
                "elder-generation relative" => {
                    Ok(vec![if presence.elderly { Generation::Elderly } else { Generation::Middle }])
                }
                "other person" => Ok(presence.present_generations()),
                other => Err(SimError::unreachable_selection(
                    household.id,
                    format!("with direct-line elder: unhandled archetype {:?}", other),
                )),
            },
            other => Err(SimError::unreachable_selection(
                household.id,
                format!("family_type=1, headcount>=3: unhandled relationship {:?}", other),
            )),
        },
        FamilyType::TwoFamilies if household.headcount >= 4 => match household.relationship.as_str() {
            "direct-line related" => match household.archetype.as_str() {
                "younger-generation family member" => {
                    if presence.elderly && presence.middle {
                        Ok(vec![Generation::Middle])
                    } else {
                        Ok(vec![Generation::Young])
                    }
                }
                "elder-generation family member" => {
                    Ok(vec![if presence.elderly { Generation::Elderly } else { Generation::Middle }])
                }
                "other person" => Ok(presence.present_generations()),
                other => Err(SimError::unreachable_selection(
                    household.id,
                    format!("direct-line related: unhandled archetype {:?}", other),
                )),
            },
            "not direct-line related" => Ok(presence.present_generations()),
            other => Err(SimError::unreachable_selection(
                household.id,
                format!("family_type=2, headcount>=4: unhandled relationship {:?}", other),
            )),
        },
        _ => Err(SimError::unreachable_selection(
            household.id,
            format!("family_type={:?}, headcount={} not covered by the selection table", household.family_type, household.headcount),
        )),
    }
}

/// Selects a (age bucket, gender) master slot for every household by
/// narrowing the lookup table and drawing one row weighted by `count`.
pub fn select_house_masters(
    households: &mut [Household],
    lookup: &[CanonicalMasterRow],
    rng: &mut impl Rng,
) -> Result<(), SimError> {
    for household in households.iter_mut() {
        let acceptable = narrow_master_generations(household)?;
        let candidates: Vec<&CanonicalMasterRow> = lookup
            .iter()
            .filter(|row| row.headcount == household.headcount && acceptable.contains(&row.generation))
            .collect();

        if candidates.is_empty() {
            return Err(SimError::unreachable_selection(
                household.id,
                "no lookup row survives headcount and generation narrowing".into(),
            ));
        }

        let weights: Vec<f64> = candidates.iter().map(|row| row.count.max(0.0)).collect();
        let total_weight: f64 = weights.iter().sum();
        let chosen = if total_weight <= 0.0 {
            candidates[0]
        } else {
            let dist = WeightedIndex::new(&weights).map_err(|e| {
                SimError::invalid_parameter(format!("invalid master lookup weights for household {}: {}", household.id, e))
            })?;
            candidates[dist.sample(rng)]
        };

        household.master_age_bucket = Some(chosen.age_bucket);
        household.master_gender = Some(chosen.gender);
    }
    Ok(())
}

fn candidate_ids_for_slot(population: &[Person], bucket: AgeBucket, gender: Gender, unlodged: &[bool]) -> Vec<u32> {
    population
        .iter()
        .filter(|p| unlodged[p.id as usize] && p.gender == gender && bucket.contains(p.age))
        .map(|p| p.id)
        .collect()
}

/// Pass 1 of member lodging (4.3.2): groups households by (master age
/// bucket, master gender), samples that many distinct persons per group, and
/// assigns them as house-masters. When a group has fewer candidates than
/// households demanding them, every candidate becomes a master and an equal
/// number of households are randomly chosen to receive one (the rest are
/// left without a master and logged as `InsufficientCandidates`).
pub fn lodge_masters(households: &mut [Household], population: &mut [Person], rng: &mut impl Rng) {
    let mut unlodged = vec![true; population.len()];

    let mut groups: HashMap<(u32, u32, Gender), Vec<usize>> = HashMap::new();
    for (idx, household) in households.iter().enumerate() {
        let bucket = household.master_age_bucket.expect("master slot must be selected before lodging");
        let gender = household.master_gender.expect("master slot must be selected before lodging");
        groups.entry((bucket.min, bucket.max, gender)).or_default().push(idx);
    }

    let mut keys: Vec<(u32, u32, Gender)> = groups.keys().copied().collect();
    keys.sort_by_key(|(min, max, gender)| (*min, *max, format!("{:?}", gender)));

    for key in keys {
        let mut household_indices = groups.remove(&key).unwrap();
        let (min, max, gender) = key;
        let bucket = AgeBucket::new(min, max);
        let mut candidates = candidate_ids_for_slot(population, bucket, gender, &unlodged);

        household_indices.shuffle(rng);

        if candidates.len() < household_indices.len() {
            warn!(
                "master slot ({:?}, {:?}) has {} candidates but {} households demand one; clamping",
                bucket, gender, candidates.len(), household_indices.len()
            );
            household_indices.truncate(candidates.len());
        }

        let chosen: Vec<u32> = candidates.partial_shuffle(rng, household_indices.len()).0.to_vec();

        for (household_idx, person_id) in household_indices.into_iter().zip(chosen.into_iter()) {
            population[person_id as usize].household_id = households[household_idx].id as i64;
            households[household_idx].house_master_person_id = Some(person_id);
            unlodged[person_id as usize] = false;
        }
    }
}

/// Pass 2 of member lodging (4.3.2): for every household with a master,
/// first guarantees one member from each presence-flagged generation, then
/// fills remaining seats by repeatedly drawing from the household's present
/// generations until `headcount` is reached or the unlodged pool for this
/// household is exhausted (logged and left under-filled).
pub fn lodge_rest(households: &mut [Household], population: &mut [Person], rng: &mut impl Rng) {
    let mut pools: HashMap<Generation, Vec<u32>> = HashMap::new();
    for person in population.iter() {
        if !person.is_lodged() {
            pools.entry(person.generation).or_default().push(person.id);
        }
    }
    // shuffle in a fixed generation order, not HashMap order, so that two
    // runs over identical input draw the same RNG sequence.
    for generation in [Generation::Young, Generation::Middle, Generation::Elderly] {
        if let Some(ids) = pools.get_mut(&generation) {
            ids.shuffle(rng);
        }
    }

    let mut draw_one = |generation: Generation, pools: &mut HashMap<Generation, Vec<u32>>| -> Option<u32> {
        pools.get_mut(&generation).and_then(|ids| ids.pop())
    };

    for household in households.iter_mut() {
        if !household.has_master() {
            continue;
        }

        let master_id = household.house_master_person_id.unwrap();
        let master_generation = population[master_id as usize].generation;

        let mut lodged_count = 1u32;
        let mut represented: Vec<Generation> = vec![master_generation];

        for generation in household.presence.present_generations() {
            if lodged_count >= household.headcount {
                break;
            }
            if represented.contains(&generation) {
                continue;
            }
            match draw_one(generation, &mut pools) {
                Some(person_id) => {
                    population[person_id as usize].household_id = household.id as i64;
                    lodged_count += 1;
                    represented.push(generation);
                }
                None => {
                    warn!(
                        "household {} requires generation {:?} to be present but no unlodged person remains",
                        household.id, generation
                    );
                }
            }
        }

        let mut remaining_generations = household.presence.present_generations();
        while lodged_count < household.headcount && !remaining_generations.is_empty() {
            let idx = rng.gen_range(0..remaining_generations.len());
            let generation = remaining_generations[idx];
            match draw_one(generation, &mut pools) {
                Some(person_id) => {
                    population[person_id as usize].household_id = household.id as i64;
                    lodged_count += 1;
                }
                None => {
                    remaining_generations.remove(idx);
                }
            }
        }

        if lodged_count < household.headcount {
            warn!(
                "household {} under-filled: lodged {} of {} (unlodged pool exhausted)",
                household.id, lodged_count, household.headcount
            );
        }
    }
}

/// Runs the full household-assembly pipeline: canonicalises the lookup
/// table, selects a master demographic slot per household, lodges masters,
/// then lodges the remaining members.
pub fn build_households(
    rows: Vec<HouseholdInputRow>,
    lookup: &[MasterLookupRow],
    population: &mut [Person],
    rng: &mut impl Rng,
) -> Result<Vec<Household>, SimError> {
    let mut households: Vec<Household> = rows
        .into_iter()
        .enumerate()
        .map(|(id, row)| row.into_household(id as u32))
        .collect::<Result<_, _>>()?;

    let canonical_lookup = canonicalize_lookup(lookup)?;
    select_house_masters(&mut households, &canonical_lookup, rng)?;
    lodge_masters(&mut households, population, rng);
    lodge_rest(&mut households, population, rng);

    Ok(households)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use crate::population::person::Person;

    fn sample_household(family_type: u8, headcount: u32, presence: (bool, bool, bool), relationship: &str, archetype: &str) -> Household {
        HouseholdInputRow {
            headcount,
            family_type,
            young: presence.0,
            middle: presence.1,
            elderly: presence.2,
            relationship: relationship.to_string(),
            house_master: archetype.to_string(),
            family1: None,
            family2: None,
            family3: None,
        }
        .into_household(0)
        .unwrap()
    }

    #[test]
    fn single_generation_flag_restricts_masters() {
        let household = sample_household(0, 1, (false, true, false), "", "");
        let generations = narrow_master_generations(&household).unwrap();
        assert_eq!(generations, vec![Generation::Middle]);
    }

    #[test]
    fn family_type_one_headcount_two_picks_oldest() {
        let household = sample_household(1, 2, (false, true, true), "", "");
        assert_eq!(narrow_master_generations(&household).unwrap(), vec![Generation::Elderly]);

        let household = sample_household(1, 2, (true, true, false), "", "");
        assert_eq!(narrow_master_generations(&household).unwrap(), vec![Generation::Middle]);
    }

    #[test]
    fn no_persons_outside_family_drops_young_when_all_present() {
        let household = sample_household(1, 3, (true, true, true), "no persons outside family", "");
        let mut generations = narrow_master_generations(&household).unwrap();
        generations.sort_by_key(|g| format!("{:?}", g));
        assert!(generations.contains(&Generation::Elderly));
        assert!(generations.contains(&Generation::Middle));
        assert!(!generations.contains(&Generation::Young));
    }

    #[test]
    fn unhandled_relationship_is_unreachable_selection() {
        let household = sample_household(1, 3, (true, true, true), "nonsense", "");
        assert!(matches!(
            narrow_master_generations(&household),
            Err(SimError::UnreachableSelection { .. })
        ));
    }

    #[test]
    fn lodge_masters_assigns_household_id() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut household = sample_household(0, 1, (false, true, false), "", "");
        household.master_age_bucket = Some(AgeBucket::new(20, 44));
        household.master_gender = Some(Gender::Male);
        let mut households = vec![household];

        let mut population = vec![
            Person::new(0, 30, Gender::Male, Generation::Middle),
            Person::new(1, 30, Gender::Female, Generation::Middle),
        ];

        lodge_masters(&mut households, &mut population, &mut rng);

        assert!(households[0].has_master());
        let master_id = households[0].house_master_person_id.unwrap();
        assert_eq!(population[master_id as usize].household_id, 0);
        assert_eq!(population[master_id as usize].gender, Gender::Male);
    }

    #[test]
    fn lodge_rest_respects_headcount() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut household = sample_household(0, 3, (false, true, true), "", "");
        household.master_age_bucket = Some(AgeBucket::new(20, 44));
        household.master_gender = Some(Gender::Male);
        household.house_master_person_id = Some(0);

        let mut population = vec![
            Person::new(0, 30, Gender::Male, Generation::Middle),
            Person::new(1, 30, Gender::Female, Generation::Middle),
            Person::new(2, 70, Gender::Female, Generation::Elderly),
            Person::new(3, 70, Gender::Male, Generation::Elderly),
        ];
        population[0].household_id = 0;

        let mut households = vec![household];
        lodge_rest(&mut households, &mut population, &mut rng);

        let lodged: Vec<&Person> = population.iter().filter(|p| p.household_id == 0).collect();
        assert_eq!(lodged.len(), 3);
        assert!(lodged.iter().any(|p| p.generation == Generation::Elderly));
    }
}
