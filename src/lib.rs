/*
 * Epidemic Simulation Using Census Data (ESUCD)
 * Copyright (c)  2022. Sam Ralph
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
#![allow(dead_code)]

extern crate log;
extern crate pretty_env_logger;

pub mod config;
pub mod decorators;
pub mod driver;
pub mod error;
pub mod event;
pub mod fear;
pub mod household;
pub mod kernels;
pub mod output;
pub mod params;
pub mod population;
pub mod queue;
pub mod sampler;
pub mod severity;
pub mod state_machine;
