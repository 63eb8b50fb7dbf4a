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

//! The Fear Modulator (4.9): scales a kernel's transmission rate by a
//! monotone non-increasing function of the current detected/death counters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::event::InitiatedThrough;

/// The finite set of fear functions. `Disabled` is the identity (f = 1.0);
/// the others combine weighted counters and are bounded below by `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum FearFunctionKind {
    Disabled,
    /// f = max(limit, 1 - scale * (w_d * detected + w_k * deaths))
    Linear,
    /// f = max(limit, exp(-scale * (w_d * detected + w_k * deaths)))
    Exponential,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct FearFactorParams {
    pub fear_function: FearFunctionKind,
    pub limit_value: f64,
    pub scale_factor: f64,
    pub deaths_multiplier: f64,
    pub detected_multiplier: f64,
}

impl FearFactorParams {
    pub fn disabled() -> FearFactorParams {
        FearFactorParams {
            fear_function: FearFunctionKind::Disabled,
            limit_value: 1.0,
            scale_factor: 0.0,
            deaths_multiplier: 0.0,
            detected_multiplier: 0.0,
        }
    }

    /// Evaluates the fear factor for the current detected/death counters.
    /// Always within `[limit_value, 1.0]` unless disabled, in which case it
    /// is exactly `1.0`.
    pub fn evaluate(&self, detected: u32, deaths: u32) -> f64 {
        match self.fear_function {
            FearFunctionKind::Disabled => 1.0,
            FearFunctionKind::Linear => {
                let weighted = self.detected_multiplier * detected as f64 + self.deaths_multiplier * deaths as f64;
                (1.0 - self.scale_factor * weighted).max(self.limit_value).min(1.0)
            }
            FearFunctionKind::Exponential => {
                let weighted = self.detected_multiplier * detected as f64 + self.deaths_multiplier * deaths as f64;
                (-self.scale_factor * weighted).exp().max(self.limit_value).min(1.0)
            }
        }
    }
}

/// Caches the evaluated fear factor per kernel tag, so that repeated lookups
/// within a tick don't re-evaluate the function. Call [`FearCache::invalidate`]
/// once the detected/death counters change.
#[derive(Debug, Default)]
pub struct FearCache {
    params: HashMap<InitiatedThrough, FearFactorParams>,
    cached: HashMap<InitiatedThrough, f64>,
}

impl FearCache {
    pub fn new(params: HashMap<InitiatedThrough, FearFactorParams>) -> FearCache {
        FearCache { params, cached: HashMap::new() }
    }

    pub fn fear(&mut self, kernel: InitiatedThrough, detected: u32, deaths: u32) -> f64 {
        if let Some(value) = self.cached.get(&kernel) {
            return *value;
        }
        let params = self.params.get(&kernel).copied().unwrap_or_else(FearFactorParams::disabled);
        let value = params.evaluate(detected, deaths);
        self.cached.insert(kernel, value);
        value
    }

    pub fn invalidate(&mut self) {
        self.cached.clear();
    }
}

/// Applies the fear factor to a kernel's baseline transmission rate.
pub fn effective_rate(gamma0: f64, fear_factor: f64) -> f64 {
    gamma0 * fear_factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_fear_is_identity() {
        let params = FearFactorParams::disabled();
        assert_eq!(params.evaluate(1000, 1000), 1.0);
    }

    #[test]
    fn linear_fear_is_bounded() {
        let params = FearFactorParams {
            fear_function: FearFunctionKind::Linear,
            limit_value: 0.1,
            scale_factor: 0.01,
            deaths_multiplier: 1.0,
            detected_multiplier: 1.0,
        };
        for (detected, deaths) in [(0, 0), (10, 10), (10_000, 10_000)] {
            let value = params.evaluate(detected, deaths);
            assert!((0.0..=1.0).contains(&value));
            assert!(value >= params.limit_value - 1e-9);
        }
    }

    #[test]
    fn exponential_fear_is_bounded() {
        let params = FearFactorParams {
            fear_function: FearFunctionKind::Exponential,
            limit_value: 0.05,
            scale_factor: 0.05,
            deaths_multiplier: 1.0,
            detected_multiplier: 1.0,
        };
        let value = params.evaluate(500, 500);
        assert!((0.0..=1.0).contains(&value));
        assert!(value >= params.limit_value - 1e-9);
    }

    #[test]
    fn cache_reuses_value_until_invalidated() {
        let mut map = HashMap::new();
        map.insert(InitiatedThrough::Household, FearFactorParams {
            fear_function: FearFunctionKind::Linear,
            limit_value: 0.0,
            scale_factor: 1.0,
            deaths_multiplier: 1.0,
            detected_multiplier: 0.0,
        });
        let mut cache = FearCache::new(map);
        let first = cache.fear(InitiatedThrough::Household, 0, 0);
        let second = cache.fear(InitiatedThrough::Household, 0, 1000);
        assert_eq!(first, second, "cached value should not change without invalidation");

        cache.invalidate();
        let third = cache.fear(InitiatedThrough::Household, 0, 1000);
        assert_ne!(second, third);
    }
}
