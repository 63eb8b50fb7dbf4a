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

use std::fmt::{Debug, Display, Formatter};

pub enum SimError {
    /// A parameter file value could not be understood: unknown distribution name,
    /// unknown selection algorithm, malformed initial conditions, unrecognised status.
    InvalidParameter { message: String },
    /// A demographic cluster had fewer candidates than demanded; recovered locally.
    InsufficientCandidates { message: String },
    /// No house-master row survived narrowing for a household row.
    UnreachableSelection { message: String, household_id: u32 },
    /// An event was popped for a person in a status the event type cannot act on.
    StateMachineAnomaly { message: String, person_id: u32 },
    OptionRetrievalFailure { message: String, key: String },
}

impl SimError {
    pub fn invalid_parameter(message: String) -> SimError {
        SimError::InvalidParameter { message }
    }

    pub fn insufficient_candidates(message: String) -> SimError {
        SimError::InsufficientCandidates { message }
    }

    pub fn unreachable_selection(household_id: u32, message: String) -> SimError {
        SimError::UnreachableSelection { message, household_id }
    }

    pub fn state_machine_anomaly(person_id: u32, message: String) -> SimError {
        SimError::StateMachineAnomaly { message, person_id }
    }

    pub fn from_option<T: Display, U>(value: Option<U>, key: T, message: String) -> Result<U, SimError> {
        if let Some(value) = value {
            Ok(value)
        } else {
            Err(SimError::OptionRetrievalFailure { message, key: key.to_string() })
        }
    }
}

impl Debug for SimError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::InvalidParameter { message } => {
                write!(f, "Invalid parameter: {}", message)
            }
            SimError::InsufficientCandidates { message } => {
                write!(f, "Insufficient candidates: {}", message)
            }
            SimError::UnreachableSelection { message, household_id } => {
                write!(f, "No house-master row reachable for household {}: {}", household_id, message)
            }
            SimError::StateMachineAnomaly { message, person_id } => {
                write!(f, "State machine anomaly for person {}: {}", person_id, message)
            }
            SimError::OptionRetrievalFailure { message, key } => {
                write!(f, "Failed to retrieve value with key ({}), context: {}", key, message)
            }
        }
    }
}

impl Display for SimError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for SimError {}
