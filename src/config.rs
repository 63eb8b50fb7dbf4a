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

//! Named constants shared across the population, household and epidemic modules.

/// Coarse generation cut-points used to derive a Person's young/middle/elderly label
/// when the caller has not supplied an explicit age->generation mapping.
pub const GENERATION_YOUNG_CUTOFF: u32 = 20;
pub const GENERATION_MIDDLE_CUTOFF: u32 = 45;

/// Age cohort cut-points for severity assignment (0,20,40,50,60,70,80,inf).
pub const SEVERITY_COHORT_CUTPOINTS: [u32; 7] = [0, 20, 40, 50, 60, 70, 80];

/// Probability that a given person uses public transport.
pub const PUBLIC_TRANSPORT_USAGE_PROBABILITY: f64 = 0.28;

/// Average daily public-transport minutes, spread across the whole population,
/// used to derive the per-user rescaling ceiling in the duration decorator.
pub const PUBLIC_TRANSPORT_AVERAGE_MINUTES: f64 = 1.7 * 32.0;

/// Fallback household-kernel window end, in days, when a person has no scheduled
/// hospitalisation (t_2). The source marks this as a TODO "recovery time"; kept
/// literal per the open question recorded in DESIGN.md.
pub const HOUSEHOLD_KERNEL_DEFAULT_WINDOW_DAYS: f64 = 14.0;

/// Sentinel household id meaning "not yet lodged".
pub const UNLODGED_HOUSEHOLD_ID: i64 = -1;

/// Sentinel profession index meaning "not assigned".
pub const UNSET_PROFESSION_INDEX: i64 = -1;

/// Maximum number of bisection iterations permitted when solving the
/// import-intensity root-finding equation before failing with InvalidParameter.
pub const IMPORT_INTENSITY_ROOT_BUFFER: u32 = 200;
pub const IMPORT_INTENSITY_ROOT_TOLERANCE: f64 = 1e-6;
