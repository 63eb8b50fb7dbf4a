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

//! Core B-2: Kernel Dispatcher (4.7).
//!
//! Invoked on a person's T0 transition. Each active kernel computes an
//! expected contact count, draws a Poisson realisation, samples that many
//! distinct peers, and schedules a TMINUS1 contraction attempt on each.
//!
//! Contraction attempts never pre-filter by target status here: the guard
//! (is the target Healthy? is the source still able to infect?) is applied
//! uniformly at pop time by the state machine (§4.8), not at schedule time.
//! An earlier draft of this dispatcher special-cased "only schedule against
//! Healthy peers" for the household kernel; that's inconsistent with the
//! pop-time guard note and was dropped.

use std::collections::HashMap;

use rand::prelude::*;
use rand_distr::{Distribution as RandDistribution, Poisson};

use crate::config;
use crate::event::{Event, EventType, InfectionStatus, InitiatedThrough};
use crate::fear::FearCache;
use crate::queue::EventQueue;

/// A newly-infectious person's timeline, as needed by the dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct OnsetContext {
    pub person_id: u32,
    pub household_id: i64,
    pub t0: f64,
    pub t1: Option<f64>,
    pub t2: Option<f64>,
    pub uses_public_transport: bool,
    pub is_employed: bool,
}

/// Shared context the dispatcher needs but does not own.
pub struct DispatchContext<'a> {
    pub household_members: &'a HashMap<i64, Vec<u32>>,
    pub population_size: u32,
    pub transmission_rates: &'a HashMap<InitiatedThrough, f64>,
    pub fear_cache: &'a mut FearCache,
    pub detected: u32,
    pub deaths: u32,
}

fn poisson_draw(lambda: f64, rng: &mut impl Rng) -> u32 {
    if lambda <= 0.0 {
        return 0;
    }
    let dist = Poisson::new(lambda).expect("lambda must be finite and positive");
    dist.sample(rng).round() as u32
}

fn schedule_attempt(
    queue: &mut EventQueue,
    target: u32,
    window_start: f64,
    window_end: f64,
    initiated_by: u32,
    kernel: InitiatedThrough,
    rng: &mut impl Rng,
) {
    let time = if window_end > window_start {
        rng.gen_range(window_start..window_end)
    } else {
        window_start
    };
    queue.push(Event::new(time, target, EventType::TMinus1, Some(initiated_by), kernel, window_start, InfectionStatus::Healthy));
}

/// Household kernel (4.7): contacts scoped to the person's household peers.
fn household_kernel(onset: &OnsetContext, ctx: &mut DispatchContext, queue: &mut EventQueue, rng: &mut impl Rng) {
    let gamma0 = match ctx.transmission_rates.get(&InitiatedThrough::Household) {
        Some(g) => *g,
        None => return,
    };

    let peers: Vec<u32> = ctx
        .household_members
        .get(&onset.household_id)
        .map(|members| members.iter().copied().filter(|id| *id != onset.person_id).collect())
        .unwrap_or_default();
    if peers.is_empty() || gamma0 <= 0.0 {
        return;
    }

    let window_end = onset.t2.unwrap_or(onset.t0 + config::HOUSEHOLD_KERNEL_DEFAULT_WINDOW_DAYS);
    let delta = (window_end - onset.t0).max(0.0);
    let fear = ctx.fear_cache.fear(InitiatedThrough::Household, ctx.detected, ctx.deaths);
    let lambda = delta * gamma0 * fear;

    let n = poisson_draw(lambda, rng).min(peers.len() as u32) as usize;
    let chosen: Vec<u32> = peers.choose_multiple(rng, n).copied().collect();

    for peer in chosen {
        schedule_attempt(queue, peer, onset.t0, window_end, onset.person_id, InitiatedThrough::Household, rng);
    }
}

/// Constant (background) kernel (4.7): contacts scoped to the whole
/// population, excluding the infectious person themself.
fn constant_kernel(onset: &OnsetContext, ctx: &mut DispatchContext, queue: &mut EventQueue, rng: &mut impl Rng) {
    let gamma0 = match ctx.transmission_rates.get(&InitiatedThrough::Constant) {
        Some(g) => *g,
        None => return,
    };
    if ctx.population_size <= 1 || gamma0 <= 0.0 {
        return;
    }

    let window_end = onset.t1.or(onset.t2).unwrap_or(onset.t0);
    let delta = (window_end - onset.t0).max(0.0);
    let fear = ctx.fear_cache.fear(InitiatedThrough::Constant, ctx.detected, ctx.deaths);
    let lambda = delta * gamma0 * fear;

    let pool_size = (ctx.population_size - 1) as usize;
    let n = poisson_draw(lambda, rng).min(pool_size as u32) as usize;
    if n == 0 {
        return;
    }

    let sampled = rand::seq::index::sample(rng, pool_size, n);
    for idx in sampled.iter() {
        // exclude self by shifting indices at/after self's id by one
        let target = if (idx as u32) >= onset.person_id { idx as u32 + 1 } else { idx as u32 };
        schedule_attempt(queue, target, onset.t0, window_end, onset.person_id, InitiatedThrough::Constant, rng);
    }
}

/// Transport, employment, friendship and sporadic kernels are reserved
/// no-ops: their invocation is gated on the relevant person attribute being
/// set, but the scheduling body is intentionally empty (open question ii).
fn transport_kernel(_onset: &OnsetContext, _ctx: &mut DispatchContext, _queue: &mut EventQueue, _rng: &mut impl Rng) {}
fn employment_kernel(_onset: &OnsetContext, _ctx: &mut DispatchContext, _queue: &mut EventQueue, _rng: &mut impl Rng) {}
fn friendship_kernel(_onset: &OnsetContext, _ctx: &mut DispatchContext, _queue: &mut EventQueue, _rng: &mut impl Rng) {}
fn sporadic_kernel(_onset: &OnsetContext, _ctx: &mut DispatchContext, _queue: &mut EventQueue, _rng: &mut impl Rng) {}

/// Runs every active kernel for a newly-infectious person.
pub fn dispatch(onset: &OnsetContext, ctx: &mut DispatchContext, queue: &mut EventQueue, rng: &mut impl Rng) {
    household_kernel(onset, ctx, queue, rng);
    constant_kernel(onset, ctx, queue, rng);
    if onset.uses_public_transport {
        transport_kernel(onset, ctx, queue, rng);
    }
    if onset.is_employed {
        employment_kernel(onset, ctx, queue, rng);
    }
    friendship_kernel(onset, ctx, queue, rng);
    sporadic_kernel(onset, ctx, queue, rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fear::FearFactorParams;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn base_ctx<'a>(
        household_members: &'a HashMap<i64, Vec<u32>>,
        transmission_rates: &'a HashMap<InitiatedThrough, f64>,
        fear_cache: &'a mut FearCache,
    ) -> DispatchContext<'a> {
        DispatchContext { household_members, population_size: 100, transmission_rates, fear_cache, detected: 0, deaths: 0 }
    }

    #[test]
    fn household_kernel_only_targets_peers() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut household_members = HashMap::new();
        household_members.insert(0i64, vec![0, 1, 2, 3]);
        let mut rates = HashMap::new();
        rates.insert(InitiatedThrough::Household, 5.0);
        rates.insert(InitiatedThrough::Constant, 0.0);
        let mut fear_map = HashMap::new();
        fear_map.insert(InitiatedThrough::Household, FearFactorParams::disabled());
        let mut fear_cache = FearCache::new(fear_map);
        let mut ctx = base_ctx(&household_members, &rates, &mut fear_cache);

        let onset = OnsetContext { person_id: 0, household_id: 0, t0: 0.0, t1: None, t2: Some(10.0), uses_public_transport: false, is_employed: false };
        let mut queue = EventQueue::new();
        dispatch(&onset, &mut ctx, &mut queue, &mut rng);

        let mut seen = vec![];
        while let Some(event) = queue.pop_min() {
            assert!(vec![1u32, 2, 3].contains(&event.person_id));
            assert_eq!(event.initiated_through, InitiatedThrough::Household);
            seen.push(event.person_id);
        }
    }

    #[test]
    fn zero_gamma_schedules_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut household_members = HashMap::new();
        household_members.insert(0i64, vec![0, 1]);
        let mut rates = HashMap::new();
        rates.insert(InitiatedThrough::Household, 0.0);
        rates.insert(InitiatedThrough::Constant, 0.0);
        let mut fear_cache = FearCache::new(HashMap::new());
        let mut ctx = base_ctx(&household_members, &rates, &mut fear_cache);
        let onset = OnsetContext { person_id: 0, household_id: 0, t0: 0.0, t1: Some(5.0), t2: None, uses_public_transport: false, is_employed: false };
        let mut queue = EventQueue::new();
        dispatch(&onset, &mut ctx, &mut queue, &mut rng);
        assert!(queue.is_empty());
    }

    #[test]
    fn constant_kernel_never_targets_self() {
        let mut rng = StdRng::seed_from_u64(5);
        let household_members = HashMap::new();
        let mut rates = HashMap::new();
        rates.insert(InitiatedThrough::Constant, 50.0);
        let mut fear_cache = FearCache::new(HashMap::new());
        let mut ctx = base_ctx(&household_members, &rates, &mut fear_cache);
        ctx.population_size = 10;
        let onset = OnsetContext { person_id: 3, household_id: -1, t0: 0.0, t1: Some(20.0), t2: None, uses_public_transport: false, is_employed: false };
        let mut queue = EventQueue::new();
        dispatch(&onset, &mut ctx, &mut queue, &mut rng);
        while let Some(event) = queue.pop_min() {
            assert_ne!(event.person_id, 3);
        }
    }
}
