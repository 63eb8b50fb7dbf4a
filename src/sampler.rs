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

//! Thin façade over named probability distributions.
//!
//! Mirrors the shape of a `scipy.stats`-style dispatch table, but with a finite,
//! declared enum instead of a string lookup: `sample` takes a [`Distribution`]
//! tag plus a [`DistributionParams`] pair and draws `size` values from it.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rand::Rng;
use rand_distr::{Bernoulli as RandBernoulli, Distribution as RandDistribution, Gamma as RandGamma,
                  LogNormal as RandLogNormal, Normal as RandNormal, Poisson as RandPoisson,
                  Uniform as RandUniform};
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// The finite set of distributions this crate knows how to sample. Dispatch on
/// this tag never falls back to reflective name lookup past the initial parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum Distribution {
    Normal,
    LogNormal,
    Gamma,
    Poisson,
    Bernoulli,
    Uniform,
    /// Always returns `loc`; used for degenerate / fixed-delay progressions.
    Constant,
}

/// Parameters bound to a [`Distribution`]. Continuous distributions use both
/// `loc` and `scale`; discrete distributions (Poisson, Bernoulli) use `loc` only.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DistributionParams {
    pub loc: f64,
    #[serde(default)]
    pub scale: f64,
}

impl DistributionParams {
    pub fn new(loc: f64, scale: f64) -> DistributionParams {
        DistributionParams { loc, scale }
    }
}

/// A distribution tag bundled with its parameters, as it appears inline in the
/// parameter file (e.g. `disease_progression.T0`).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DistributionSpec {
    pub distribution: Distribution,
    #[serde(flatten)]
    pub params: DistributionParams,
}

/// Draws `size` values from the named distribution using `rng`.
///
/// Returns `InvalidParameter` if `name` is not one of the declared variants
/// reachable through [`Distribution`] (this can only happen for distributions
/// constructed programmatically with out-of-range parameters, e.g. negative
/// scale on a Normal).
pub fn sample<R: Rng + ?Sized>(
    name: Distribution,
    size: usize,
    params: DistributionParams,
    rng: &mut R,
) -> Result<Vec<f64>, SimError> {
    match name {
        Distribution::Normal => {
            let dist = RandNormal::new(params.loc, params.scale).map_err(|e| {
                SimError::invalid_parameter(format!("invalid Normal parameters: {}", e))
            })?;
            Ok((0..size).map(|_| dist.sample(rng)).collect())
        }
        Distribution::LogNormal => {
            let dist = RandLogNormal::new(params.loc, params.scale).map_err(|e| {
                SimError::invalid_parameter(format!("invalid LogNormal parameters: {}", e))
            })?;
            Ok((0..size).map(|_| dist.sample(rng)).collect())
        }
        Distribution::Gamma => {
            let dist = RandGamma::new(params.loc, params.scale).map_err(|e| {
                SimError::invalid_parameter(format!("invalid Gamma parameters: {}", e))
            })?;
            Ok((0..size).map(|_| dist.sample(rng)).collect())
        }
        Distribution::Poisson => {
            let dist = RandPoisson::new(params.loc).map_err(|e| {
                SimError::invalid_parameter(format!("invalid Poisson parameters: {}", e))
            })?;
            Ok((0..size).map(|_| dist.sample(rng)).collect())
        }
        Distribution::Bernoulli => {
            let dist = RandBernoulli::new(params.loc).map_err(|e| {
                SimError::invalid_parameter(format!("invalid Bernoulli parameters: {}", e))
            })?;
            Ok((0..size)
                .map(|_| if dist.sample(rng) { 1.0 } else { 0.0 })
                .collect())
        }
        Distribution::Uniform => {
            let dist = RandUniform::new(params.loc, params.loc + params.scale);
            Ok((0..size).map(|_| dist.sample(rng)).collect())
        }
        Distribution::Constant => Ok(vec![params.loc; size]),
    }
}

/// Draws a single value; convenience wrapper over [`sample`].
pub fn sample_one<R: Rng + ?Sized>(
    name: Distribution,
    params: DistributionParams,
    rng: &mut R,
) -> Result<f64, SimError> {
    Ok(sample(name, 1, params, rng)?.remove(0))
}

/// A two-parameter family that can be fit to an empirical sample with `floc=0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FittableFamily {
    LogNormal,
    Gamma,
}

/// A distribution bound to parameters fit from an empirical sample.
pub struct FittedDistribution {
    pub family: FittableFamily,
    pub params: DistributionParams,
}

impl FittedDistribution {
    pub fn sample<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Result<Vec<f64>, SimError> {
        let tag = match self.family {
            FittableFamily::LogNormal => Distribution::LogNormal,
            FittableFamily::Gamma => Distribution::Gamma,
        };
        sample(tag, size, self.params, rng)
    }
}

/// Reads a single-column numeric CSV at `path` and fits `approx` to it with
/// `floc=0`, by method of moments over the sample mean/variance.
///
/// Fails with `InvalidParameter` if the file cannot be read/parsed or the
/// sample is degenerate (fewer than two points, or zero variance).
pub fn sample_from_file(path: &Path, approx: FittableFamily) -> Result<FittedDistribution, SimError> {
    let file = File::open(path)
        .map_err(|e| SimError::invalid_parameter(format!("cannot open {}: {}", path.display(), e)))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(BufReader::new(file));

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| SimError::invalid_parameter(format!("malformed row in {}: {}", path.display(), e)))?;
        if let Some(field) = record.get(0) {
            let value: f64 = field.trim().parse().map_err(|e| {
                SimError::invalid_parameter(format!("non-numeric value in {}: {}", path.display(), e))
            })?;
            values.push(value);
        }
    }

    if values.len() < 2 {
        return Err(SimError::invalid_parameter(format!(
            "{} has fewer than two samples, cannot fit a distribution",
            path.display()
        )));
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if variance <= 0.0 {
        return Err(SimError::invalid_parameter(format!(
            "{} has zero variance, cannot fit a distribution",
            path.display()
        )));
    }

    let params = match approx {
        FittableFamily::LogNormal => {
            // Method of moments for a log-normal with floc=0: fit the mu/sigma of
            // the underlying normal from the mean/variance of log(x).
            let logs: Vec<f64> = values.iter().map(|v| v.ln()).collect();
            let log_n = logs.len() as f64;
            let log_mean = logs.iter().sum::<f64>() / log_n;
            let log_var = logs.iter().map(|v| (v - log_mean).powi(2)).sum::<f64>() / log_n;
            DistributionParams::new(log_mean, log_var.sqrt())
        }
        FittableFamily::Gamma => {
            // Method of moments: shape = mean^2 / variance, scale = variance / mean.
            let shape = mean * mean / variance;
            let scale = variance / mean;
            DistributionParams::new(shape, scale)
        }
    };

    Ok(FittedDistribution { family: approx, params })
}

/// Rescales `values` linearly into `[0, 1]` using the sample's own min/max.
/// A degenerate (constant) sample maps every value to `0.0`.
pub fn rescale_min_max(values: &mut [f64]) {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if span <= 0.0 {
        for v in values.iter_mut() {
            *v = 0.0;
        }
        return;
    }
    for v in values.iter_mut() {
        *v = (*v - min) / span;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn sample_returns_requested_length() {
        let mut rng = rng();
        for name in [
            Distribution::Normal,
            Distribution::LogNormal,
            Distribution::Gamma,
            Distribution::Poisson,
            Distribution::Bernoulli,
            Distribution::Uniform,
            Distribution::Constant,
        ] {
            let params = DistributionParams::new(1.0, 1.0);
            let values = sample(name, 50, params, &mut rng).unwrap();
            assert_eq!(values.len(), 50, "{:?} did not return requested length", name);
        }
    }

    #[test]
    fn normal_mean_converges() {
        let mut rng = rng();
        let n = 20_000;
        let values = sample(Distribution::Normal, n, DistributionParams::new(5.0, 2.0), &mut rng).unwrap();
        let mean = values.iter().sum::<f64>() / n as f64;
        let tolerance = 3.0 * 2.0 / (n as f64).sqrt();
        assert!((mean - 5.0).abs() < tolerance, "mean {} not within tolerance", mean);
    }

    #[test]
    fn constant_distribution_is_constant() {
        let mut rng = rng();
        let values = sample(Distribution::Constant, 10, DistributionParams::new(7.0, 0.0), &mut rng).unwrap();
        assert!(values.iter().all(|v| *v == 7.0));
    }

    #[test]
    fn rescale_min_max_bounds_output() {
        let mut values = vec![2.0, 4.0, 6.0, 8.0];
        rescale_min_max(&mut values);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[3], 1.0);
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn rescale_min_max_degenerate_sample() {
        let mut values = vec![3.0, 3.0, 3.0];
        rescale_min_max(&mut values);
        assert!(values.iter().all(|v| *v == 0.0));
    }
}
