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

//! Event and status types shared by the queue, kernel dispatcher and state
//! machine (Core B data model, §3).

use serde::{Deserialize, Serialize};

/// The five transition types a scheduled [`Event`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum EventType {
    TMinus1,
    T0,
    T1,
    T2,
    TDeath,
}

/// Identifies what originated an event, for diagnostics and for the
/// TMINUS1 source-status guard in the state machine (4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum InitiatedThrough {
    DiseaseProgression,
    InitialConditions,
    ImportIntensity,
    Household,
    Constant,
    Transport,
    Employment,
    Friendship,
    Sporadic,
}

impl InitiatedThrough {
    pub fn is_kernel(&self) -> bool {
        !matches!(
            self,
            InitiatedThrough::DiseaseProgression | InitiatedThrough::InitialConditions | InitiatedThrough::ImportIntensity
        )
    }
}

/// A person's infection status. Forms a DAG: Healthy -> Contraction ->
/// Infectious -> {StayHome, Hospital, Death}; Death is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum InfectionStatus {
    Healthy,
    Contraction,
    Infectious,
    StayHome,
    Hospital,
    Death,
}

impl InfectionStatus {
    /// "Active states" per §3: statuses a person can transmit from.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            InfectionStatus::Contraction | InfectionStatus::Infectious | InfectionStatus::StayHome | InfectionStatus::Hospital
        )
    }
}

/// A scheduled transition. Time ordering is total: ties are broken by
/// insertion sequence (assigned by the queue, not here).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub time: f64,
    pub person_id: u32,
    pub event_type: EventType,
    pub initiated_by: Option<u32>,
    pub initiated_through: InitiatedThrough,
    pub issued_time: f64,
    pub epidemic_status: InfectionStatus,
}

impl Event {
    pub fn new(
        time: f64,
        person_id: u32,
        event_type: EventType,
        initiated_by: Option<u32>,
        initiated_through: InitiatedThrough,
        issued_time: f64,
        epidemic_status: InfectionStatus,
    ) -> Event {
        Event { time, person_id, event_type, initiated_by, initiated_through, issued_time, epidemic_status }
    }
}

/// An append-only log entry recording who infected whom, when, and through
/// which kernel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfectionRecord {
    pub source_person_id: Option<u32>,
    pub target_person_id: u32,
    pub contraction_time: f64,
    pub kernel: InitiatedThrough,
}

/// The progression timeline of a single infected person. Any optional
/// timestamp may be `None`, meaning that branch did not occur. `t_detection`
/// and `t_recovery` are intentionally absent: declared in the original model
/// but never populated there either (Design Note §9(iv)).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionRecord {
    pub person_id: u32,
    pub t_minus_1: f64,
    pub t_0: f64,
    pub t_1: Option<f64>,
    pub t_2: Option<f64>,
    pub t_death: Option<f64>,
}
