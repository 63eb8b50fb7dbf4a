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

//! Thin, generic-over-`Write` table serialisers for the interfaces named in
//! §6. This module owns no file paths or directory layout — that's the
//! external collaborator's job (§1 Non-goals).

use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;

use crate::error::SimError;
use crate::event::{InfectionRecord, InfectionStatus, ProgressionRecord};
use crate::household::Household;
use crate::population::person::Person;
use crate::severity::Severity;

#[derive(Serialize)]
struct HouseholdRow<'a> {
    household_index: u32,
    household_headcount: u32,
    family_type: u8,
    relationship: &'a str,
    house_master_archetype: &'a str,
    young: bool,
    middle: bool,
    elderly: bool,
    master_age: Option<String>,
    master_gender: Option<String>,
    house_master: Option<u32>,
    family1: Option<&'a str>,
    family2: Option<&'a str>,
    family3: Option<&'a str>,
}

/// Serialises the households table (§6 "Households output").
pub fn write_households<W: Write>(writer: W, households: &[Household]) -> Result<(), SimError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for household in households {
        let row = HouseholdRow {
            household_index: household.id,
            household_headcount: household.headcount,
            family_type: household.family_type as u8,
            relationship: &household.relationship,
            house_master_archetype: household.archetype.as_str(),
            young: household.presence.young,
            middle: household.presence.middle,
            elderly: household.presence.elderly,
            master_age: household.master_age_bucket.map(|b| format!("{}-{}", b.min, b.max)),
            master_gender: household.master_gender.map(|g| format!("{:?}", g)),
            house_master: household.house_master_person_id,
            family1: household.family_structure.get(0).map(|s| s.as_str()),
            family2: household.family_structure.get(1).map(|s| s.as_str()),
            family3: household.family_structure.get(2).map(|s| s.as_str()),
        };
        csv_writer
            .serialize(row)
            .map_err(|e| SimError::invalid_parameter(format!("failed to write household row: {}", e)))?;
    }
    csv_writer.flush().map_err(|e| SimError::invalid_parameter(format!("failed to flush households output: {}", e)))
}

#[derive(Serialize)]
struct PopulationRow<'a> {
    id: u32,
    age: u32,
    gender: String,
    household_id: i64,
    profession_index: i64,
    employment_status: String,
    social_competence: f64,
    uses_public_transport: bool,
    public_transport_duration: f64,
    infection_status: &'a str,
    expected_severity: &'a str,
}

/// Serialises the population table (§6 "Population output"): all person
/// attributes plus the final infection status and expected severity.
pub fn write_population<W: Write>(
    writer: W,
    population: &[Person],
    final_status: &HashMap<u32, InfectionStatus>,
    severities: &HashMap<u32, Severity>,
) -> Result<(), SimError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for person in population {
        let status = final_status.get(&person.id).copied().unwrap_or(InfectionStatus::Healthy);
        let severity = severities.get(&person.id).copied();
        let row = PopulationRow {
            id: person.id,
            age: person.age,
            gender: format!("{:?}", person.gender),
            household_id: person.household_id,
            profession_index: person.profession_index,
            employment_status: format!("{:?}", person.employment_status),
            social_competence: person.social_competence,
            uses_public_transport: person.uses_public_transport,
            public_transport_duration: person.public_transport_duration,
            infection_status: status_label(status),
            expected_severity: severity.map(severity_label).unwrap_or("Unknown"),
        };
        csv_writer
            .serialize(row)
            .map_err(|e| SimError::invalid_parameter(format!("failed to write population row: {}", e)))?;
    }
    csv_writer.flush().map_err(|e| SimError::invalid_parameter(format!("failed to flush population output: {}", e)))
}

fn status_label(status: InfectionStatus) -> &'static str {
    match status {
        InfectionStatus::Healthy => "Healthy",
        InfectionStatus::Contraction => "Contraction",
        InfectionStatus::Infectious => "Infectious",
        InfectionStatus::StayHome => "StayHome",
        InfectionStatus::Hospital => "Hospital",
        InfectionStatus::Death => "Death",
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Asymptomatic => "Asymptomatic",
        Severity::Mild => "Mild",
        Severity::Severe => "Severe",
        Severity::Critical => "Critical",
    }
}

/// Serialises the infection-record half of the event log output (§6).
pub fn write_infection_log<W: Write>(writer: W, records: &[InfectionRecord]) -> Result<(), SimError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer
            .serialize(record)
            .map_err(|e| SimError::invalid_parameter(format!("failed to write infection record: {}", e)))?;
    }
    csv_writer.flush().map_err(|e| SimError::invalid_parameter(format!("failed to flush infection log: {}", e)))
}

/// Serialises the progression-record half of the event log output (§6).
pub fn write_progression_log<W: Write>(writer: W, records: &HashMap<u32, ProgressionRecord>) -> Result<(), SimError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut ordered: Vec<&ProgressionRecord> = records.values().collect();
    ordered.sort_by_key(|r| r.person_id);
    for record in ordered {
        csv_writer
            .serialize(record)
            .map_err(|e| SimError::invalid_parameter(format!("failed to write progression record: {}", e)))?;
    }
    csv_writer.flush().map_err(|e| SimError::invalid_parameter(format!("failed to flush progression log: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::household::{FamilyType, GenerationPresence, MasterArchetype};
    use crate::population::person::{Gender, Generation};

    #[test]
    fn write_population_round_trips_through_csv() {
        let population = vec![Person::new(0, 40, Gender::Male, Generation::Middle)];
        let mut status = HashMap::new();
        status.insert(0, InfectionStatus::Infectious);
        let mut severities = HashMap::new();
        severities.insert(0, Severity::Mild);

        let mut buffer = Vec::new();
        write_population(&mut buffer, &population, &status, &severities).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Infectious"));
        assert!(text.contains("Mild"));
    }

    #[test]
    fn write_households_includes_headcount() {
        let household = Household::new(
            0,
            3,
            FamilyType::OneFamily,
            GenerationPresence { young: false, middle: true, elderly: true },
            "no persons outside family".to_string(),
            MasterArchetype("".to_string()),
            vec![],
        );
        let mut buffer = Vec::new();
        write_households(&mut buffer, &[household]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains('3'));
    }
}
