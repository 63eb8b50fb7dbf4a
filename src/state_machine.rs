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

//! Core B-3: the per-seed simulation engine and state machine (4.8).
//!
//! `Engine` owns everything that must be fresh per seed: the event queue,
//! the status/progression maps, the infection log, and the fear cache. The
//! population and household tables are borrowed read-only and are the only
//! state shared across seeds.

use std::collections::HashMap;

use enum_map::EnumMap;
use log::{debug, warn};
use rand::Rng;

use crate::error::SimError;
use crate::event::{Event, EventType, InfectionRecord, InfectionStatus, InitiatedThrough, ProgressionRecord};
use crate::fear::FearCache;
use crate::kernels::{self, DispatchContext, OnsetContext};
use crate::params::DiseaseProgressionParams;
use crate::population::person::{EmploymentStatus, Person};
use crate::queue::EventQueue;
use crate::sampler::{self};
use crate::severity::Severity;

fn household_membership(population: &[Person]) -> HashMap<i64, Vec<u32>> {
    let mut members: HashMap<i64, Vec<u32>> = HashMap::new();
    for person in population {
        if person.is_lodged() {
            members.entry(person.household_id).or_default().push(person.id);
        }
    }
    members
}

/// A single run's mutable simulation state; discarded at the end of its seed.
pub struct Engine<'a> {
    population: &'a [Person],
    household_members: HashMap<i64, Vec<u32>>,
    severities: HashMap<u32, Severity>,
    p_death: EnumMap<Severity, f64>,
    disease_progression: DiseaseProgressionParams,
    transmission_rates: HashMap<InitiatedThrough, f64>,
    fear_cache: FearCache,
    queue: EventQueue,
    status: Vec<InfectionStatus>,
    progression: HashMap<u32, ProgressionRecord>,
    infection_log: Vec<InfectionRecord>,
    pub affected: u32,
    pub deaths: u32,
    max_time: f64,
    pub current_time: f64,
}

impl<'a> Engine<'a> {
    pub fn new(
        population: &'a [Person],
        severities: HashMap<u32, Severity>,
        p_death: EnumMap<Severity, f64>,
        disease_progression: DiseaseProgressionParams,
        transmission_rates: HashMap<InitiatedThrough, f64>,
        fear_cache: FearCache,
        max_time: f64,
        start_time: f64,
    ) -> Engine<'a> {
        Engine {
            population,
            household_members: household_membership(population),
            severities,
            p_death,
            disease_progression,
            transmission_rates,
            fear_cache,
            queue: EventQueue::new(),
            status: vec![InfectionStatus::Healthy; population.len()],
            progression: HashMap::new(),
            infection_log: Vec::new(),
            affected: 0,
            deaths: 0,
            max_time,
            current_time: start_time,
        }
    }

    pub fn status_of(&self, person_id: u32) -> InfectionStatus {
        self.status[person_id as usize]
    }

    pub fn population_len(&self) -> usize {
        self.population.len()
    }

    pub fn schedule(&mut self, event: Event) {
        self.queue.push(event);
    }

    pub fn infection_log(&self) -> &[InfectionRecord] {
        &self.infection_log
    }

    pub fn progression_log(&self) -> &HashMap<u32, ProgressionRecord> {
        &self.progression
    }

    fn person(&self, person_id: u32) -> &Person {
        &self.population[person_id as usize]
    }

    fn onset_context(&self, person_id: u32, t0: f64) -> OnsetContext {
        let person = self.person(person_id);
        let progression = self.progression.get(&person_id);
        OnsetContext {
            person_id,
            household_id: person.household_id,
            t0,
            t1: progression.and_then(|p| p.t_1),
            t2: progression.and_then(|p| p.t_2),
            uses_public_transport: person.uses_public_transport,
            is_employed: person.employment_status == EmploymentStatus::Employed,
        }
    }

    fn dispatch_kernels(&mut self, person_id: u32, t0: f64, rng: &mut impl Rng) {
        let onset = self.onset_context(person_id, t0);
        let mut ctx = DispatchContext {
            household_members: &self.household_members,
            population_size: self.population.len() as u32,
            transmission_rates: &self.transmission_rates,
            fear_cache: &mut self.fear_cache,
            // the original tracks no separate "detected" counter; it feeds
            // the running affected-count straight into the fear function.
            detected: self.affected,
            deaths: self.deaths,
        };
        kernels::dispatch(&onset, &mut ctx, &mut self.queue, rng);
    }

    /// Begin-infection subroutine (4.8): records the infection, draws the
    /// full progression timeline, and schedules its downstream events.
    fn begin_infection(
        &mut self,
        person_id: u32,
        event_time: f64,
        entering_as: InfectionStatus,
        source_person_id: Option<u32>,
        kernel: InitiatedThrough,
        rng: &mut impl Rng,
    ) -> Result<(), SimError> {
        self.infection_log.push(InfectionRecord {
            source_person_id,
            target_person_id: person_id,
            contraction_time: event_time,
            kernel,
        });
        self.affected += 1;
        self.fear_cache.invalidate();

        let severity = self.severities.get(&person_id).copied().unwrap_or(Severity::Asymptomatic);

        let (t_minus_1, t0) = match entering_as {
            InfectionStatus::Contraction => {
                let t0 = event_time + sampler::sample_one(
                    self.disease_progression.t0.distribution,
                    self.disease_progression.t0.params,
                    rng,
                )?;
                self.status[person_id as usize] = InfectionStatus::Contraction;
                self.schedule(Event::new(
                    t0,
                    person_id,
                    EventType::T0,
                    None,
                    InitiatedThrough::DiseaseProgression,
                    event_time,
                    InfectionStatus::Infectious,
                ));
                (event_time, t0)
            }
            InfectionStatus::Infectious => {
                self.status[person_id as usize] = InfectionStatus::Infectious;
                (event_time, event_time)
            }
            other => {
                return Err(SimError::state_machine_anomaly(
                    person_id,
                    format!("begin_infection called with unsupported entering status {:?}", other),
                ))
            }
        };

        let mut record = ProgressionRecord { person_id, t_minus_1, t_0: t0, t_1: None, t_2: None, t_death: None };

        if matches!(severity, Severity::Severe | Severity::Critical) {
            let t2 = t0 + sampler::sample_one(
                self.disease_progression.t2.distribution,
                self.disease_progression.t2.params,
                rng,
            )?;
            record.t_2 = Some(t2);
            self.schedule(Event::new(t2, person_id, EventType::T2, None, InitiatedThrough::DiseaseProgression, t0, InfectionStatus::Hospital));
        }

        let t1 = t0 + sampler::sample_one(
            self.disease_progression.t1.distribution,
            self.disease_progression.t1.params,
            rng,
        )?;
        if record.t_2.map(|t2| t1 < t2).unwrap_or(true) {
            record.t_1 = Some(t1);
            self.schedule(Event::new(t1, person_id, EventType::T1, None, InitiatedThrough::DiseaseProgression, t0, InfectionStatus::StayHome));
        }

        let p_death = self.p_death[severity];
        if rng.gen_range(0.0..1.0) < p_death {
            let t_death = t0 + sampler::sample_one(
                self.disease_progression.t_death.distribution,
                self.disease_progression.t_death.params,
                rng,
            )?;
            record.t_death = Some(t_death);
            self.schedule(Event::new(t_death, person_id, EventType::TDeath, None, InitiatedThrough::DiseaseProgression, t0, InfectionStatus::Death));
        }

        self.progression.insert(person_id, record);

        if entering_as == InfectionStatus::Infectious {
            self.dispatch_kernels(person_id, t0, rng);
        }

        Ok(())
    }

    fn handle_tminus1(&mut self, event: &Event, rng: &mut impl Rng) -> Result<(), SimError> {
        let target_status = self.status_of(event.person_id);

        let guard_passes = match event.initiated_by {
            None if event.initiated_through != InitiatedThrough::DiseaseProgression => true,
            None => false,
            Some(source_id) => {
                let source_status = self.status_of(source_id);
                if !source_status.is_active() {
                    false
                } else if event.initiated_through != InitiatedThrough::Household && source_status == InfectionStatus::StayHome {
                    false
                } else {
                    true
                }
            }
        };

        if guard_passes && target_status == InfectionStatus::Healthy {
            self.begin_infection(event.person_id, event.time, InfectionStatus::Contraction, event.initiated_by, event.initiated_through, rng)?;
        }
        Ok(())
    }

    fn handle_t0(&mut self, event: &Event, rng: &mut impl Rng) -> Result<(), SimError> {
        let status = self.status_of(event.person_id);
        match status {
            InfectionStatus::Healthy => {
                self.begin_infection(event.person_id, event.time, InfectionStatus::Infectious, None, InitiatedThrough::DiseaseProgression, rng)?;
            }
            InfectionStatus::Contraction => {
                self.status[event.person_id as usize] = InfectionStatus::Infectious;
                self.dispatch_kernels(event.person_id, event.time, rng);
            }
            other => {
                debug!("dropping T0 for person {} in status {:?} (state machine anomaly)", event.person_id, other);
            }
        }
        Ok(())
    }

    fn handle_t1(&mut self, event: &Event) {
        if self.status_of(event.person_id) == InfectionStatus::Infectious {
            self.status[event.person_id as usize] = InfectionStatus::StayHome;
        }
    }

    fn handle_t2(&mut self, event: &Event) {
        let status = self.status_of(event.person_id);
        if status == InfectionStatus::Infectious || status == InfectionStatus::StayHome {
            self.status[event.person_id as usize] = InfectionStatus::Hospital;
        }
    }

    fn handle_tdeath(&mut self, event: &Event) {
        if self.status_of(event.person_id) != InfectionStatus::Death {
            self.status[event.person_id as usize] = InfectionStatus::Death;
            self.deaths += 1;
            self.fear_cache.invalidate();
        }
    }

    /// Pops and applies the next event. Returns `Ok(false)` once the queue
    /// is empty or the popped event's time exceeds `max_time` (both normal
    /// terminal conditions, not errors).
    pub fn step(&mut self, rng: &mut impl Rng) -> Result<bool, SimError> {
        let event = match self.queue.pop_min() {
            Some(event) => event,
            None => return Ok(false),
        };
        if event.time > self.max_time {
            return Ok(false);
        }
        self.current_time = event.time;

        match event.event_type {
            EventType::TMinus1 => self.handle_tminus1(&event, rng)?,
            EventType::T0 => self.handle_t0(&event, rng)?,
            EventType::T1 => self.handle_t1(&event),
            EventType::T2 => self.handle_t2(&event),
            EventType::TDeath => self.handle_tdeath(&event),
        }

        Ok(true)
    }

    /// Runs until the queue empties, `max_time` is exceeded, or `affected`
    /// reaches `stop_threshold`.
    pub fn run(&mut self, stop_threshold: u32, rng: &mut impl Rng) -> Result<(), SimError> {
        while self.affected < stop_threshold {
            if !self.step(rng)? {
                break;
            }
        }
        Ok(())
    }

    pub fn outbreak(&self, stop_threshold: u32) -> bool {
        self.affected >= stop_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::person::{Gender, Generation};
    use crate::sampler::{Distribution, DistributionParams, DistributionSpec};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn progression_params() -> DiseaseProgressionParams {
        DiseaseProgressionParams {
            t0: DistributionSpec { distribution: Distribution::Constant, params: DistributionParams::new(2.0, 0.0) },
            t1: DistributionSpec { distribution: Distribution::Constant, params: DistributionParams::new(5.0, 0.0) },
            t2: DistributionSpec { distribution: Distribution::Constant, params: DistributionParams::new(8.0, 0.0) },
            t_death: DistributionSpec { distribution: Distribution::Constant, params: DistributionParams::new(20.0, 0.0) },
        }
    }

    fn population(n: usize) -> Vec<Person> {
        (0..n as u32)
            .map(|id| {
                let mut p = Person::new(id, 30, Gender::Male, Generation::Middle);
                p.household_id = 0;
                p
            })
            .collect()
    }

    fn engine<'a>(population: &'a [Person], max_time: f64) -> Engine<'a> {
        let mut severities = HashMap::new();
        for p in population {
            severities.insert(p.id, Severity::Mild);
        }
        let mut p_death = EnumMap::default();
        p_death[Severity::Mild] = 0.0;
        p_death[Severity::Asymptomatic] = 0.0;
        p_death[Severity::Severe] = 0.0;
        p_death[Severity::Critical] = 0.0;

        let mut rates = HashMap::new();
        rates.insert(InitiatedThrough::Household, 0.5);
        rates.insert(InitiatedThrough::Constant, 0.0);

        Engine::new(
            population,
            severities,
            p_death,
            progression_params(),
            rates,
            FearCache::new(HashMap::new()),
            max_time,
            0.0,
        )
    }

    #[test]
    fn events_are_popped_in_nondecreasing_time_order() {
        let pop = population(10);
        let mut eng = engine(&pop, 30.0);
        let mut rng = StdRng::seed_from_u64(1);
        eng.schedule(Event::new(0.0, 0, EventType::T0, None, InitiatedThrough::InitialConditions, 0.0, InfectionStatus::Infectious));

        let mut last_time = f64::NEG_INFINITY;
        while eng.step(&mut rng).unwrap() {
            assert!(eng.current_time >= last_time);
            last_time = eng.current_time;
        }
    }

    #[test]
    fn death_is_terminal() {
        let pop = population(2);
        let mut eng = engine(&pop, 100.0);
        let mut rng = StdRng::seed_from_u64(1);
        eng.schedule(Event::new(1.0, 0, EventType::TDeath, None, InitiatedThrough::DiseaseProgression, 0.0, InfectionStatus::Death));
        eng.schedule(Event::new(2.0, 0, EventType::T1, None, InitiatedThrough::DiseaseProgression, 0.0, InfectionStatus::StayHome));
        while eng.step(&mut rng).unwrap() {}
        assert_eq!(eng.status_of(0), InfectionStatus::Death);
        assert_eq!(eng.deaths, 1);
    }

    #[test]
    fn t0_for_already_infectious_person_is_dropped() {
        let pop = population(2);
        let mut eng = engine(&pop, 100.0);
        let mut rng = StdRng::seed_from_u64(1);
        eng.schedule(Event::new(0.0, 0, EventType::T0, None, InitiatedThrough::InitialConditions, 0.0, InfectionStatus::Infectious));
        eng.schedule(Event::new(1.0, 0, EventType::T0, None, InitiatedThrough::InitialConditions, 0.0, InfectionStatus::Infectious));
        while eng.step(&mut rng).unwrap() {}
        assert_eq!(eng.affected, 1);
    }
}
