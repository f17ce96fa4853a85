// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Capacity model of the KLL growth scheme.
//!
//! Level capacities shrink geometrically by a factor of 2/3 from the top level down, and are
//! never smaller than the minimum level width `m`.

use super::MAX_K;
use super::MAX_M;
use super::MAX_NUM_LEVELS;
use super::MIN_M;
use crate::error::Error;

/// Rounding slack accepted by [`k_from_epsilon`] before it rounds up instead.
pub const EPS_DELTA_THRESHOLD: f64 = 1e-6;
/// Smallest normalized rank error reachable with [`MAX_K`] for single-sided queries.
pub const MIN_EPS: f64 = 4.7634e-5;
/// Coefficient of the double-sided (PMF) error curve.
pub const PMF_COEF: f64 = 2.446;
/// Exponent of the double-sided (PMF) error curve.
pub const PMF_EXP: f64 = 0.9433;
/// Coefficient of the single-sided (CDF, rank, quantile) error curve.
pub const CDF_COEF: f64 = 2.296;
/// Exponent of the single-sided (CDF, rank, quantile) error curve.
pub const CDF_EXP: f64 = 0.9723;

/// Largest depth computed without folding.
const MAX_UNFOLDED_DEPTH: u8 = 30;

const POWERS_OF_THREE: [u64; 31] = [
    1,
    3,
    9,
    27,
    81,
    243,
    729,
    2187,
    6561,
    19683,
    59049,
    177147,
    531441,
    1594323,
    4782969,
    14348907,
    43046721,
    129140163,
    387420489,
    1162261467,
    3486784401,
    10460353203,
    31381059609,
    94143178827,
    282429536481,
    847288609443,
    2541865828329,
    7625597484987,
    22876792454961,
    68630377364883,
    205891132094649,
];

/// Checks that `m` is even and within `[MIN_M, MAX_M]`.
pub fn check_m(m: u8) -> Result<(), Error> {
    if !(MIN_M..=MAX_M).contains(&m) || m % 2 == 1 {
        return Err(Error::invalid_argument(format!(
            "M must be >= {MIN_M}, <= {MAX_M} and even: {m}"
        ))
        .with_context("m", m));
    }
    Ok(())
}

/// Checks that `k` is within `[m, MAX_K]`.
pub fn check_k(k: u16, m: u8) -> Result<(), Error> {
    if k < m as u16 || k > MAX_K {
        return Err(
            Error::invalid_argument(format!("K must be >= {m} and <= {MAX_K}: {k}"))
                .with_context("k", k),
        );
    }
    Ok(())
}

/// Returns the nominal item capacity of one level.
///
/// `level` is zero based and must be below `num_levels`, which must be in `1..=61`. The capacity
/// approximates `k * (2/3)^depth` where `depth` is the distance from the top level.
///
/// # Panics
///
/// Panics if `num_levels` or `level` are out of range.
pub fn level_capacity(k: u16, num_levels: usize, level: usize, m: u8) -> u32 {
    assert!(
        (1..=MAX_NUM_LEVELS).contains(&num_levels),
        "num_levels must be in [1, {MAX_NUM_LEVELS}], got {num_levels}"
    );
    assert!(level < num_levels, "level must be < num_levels");
    let depth = num_levels - level - 1;
    let cap = int_cap_aux(k, depth as u8);
    std::cmp::max(m as u32, cap as u32)
}

/// Returns `round(k * (2/3)^depth)` using exact integer arithmetic.
///
/// Depths above 30 are folded: the depth is split in two halves that are applied one after the
/// other, which keeps every intermediate product within 64 bits. Depths up to 60 fold exactly
/// once, matching every other DataSketches implementation bit for bit.
pub fn int_cap_aux(k: u16, depth: u8) -> u16 {
    if depth <= MAX_UNFOLDED_DEPTH {
        return int_cap_aux_aux(k, depth);
    }
    let half = depth / 2;
    let rest = depth - half;
    let tmp = int_cap_aux(k, half);
    int_cap_aux(tmp, rest)
}

fn int_cap_aux_aux(k: u16, depth: u8) -> u16 {
    debug_assert!(depth <= MAX_UNFOLDED_DEPTH, "depth must be <= 30");
    // pre-multiply by 2 so that (tmp + 1) / 2 rounds half up
    let twok = (k as u64) << 1;
    let tmp = (twok << depth) / POWERS_OF_THREE[depth as usize];
    let result = (tmp + 1) >> 1;
    assert!(result <= k as u64, "capacity result exceeds k");
    result as u16
}

/// Returns the total item capacity of a sketch with `num_levels` levels.
pub fn compute_total_item_capacity(k: u16, m: u8, num_levels: usize) -> u32 {
    (0..num_levels)
        .map(|level| level_capacity(k, num_levels, level, m))
        .sum()
}

/// Returns the normalized rank error for the given k.
///
/// If `pmf` is true this is the double-sided error of PMF queries, otherwise the single-sided
/// error of rank, quantile and CDF queries.
pub fn normalized_rank_error(k: u16, pmf: bool) -> f64 {
    let k = k as f64;
    if pmf {
        PMF_COEF / k.powf(PMF_EXP)
    } else {
        CDF_COEF / k.powf(CDF_EXP)
    }
}

/// Returns the smallest k whose normalized rank error does not exceed `epsilon`.
///
/// The result is clamped to `[MIN_M, MAX_K]`.
pub fn k_from_epsilon(epsilon: f64, pmf: bool) -> u16 {
    let eps = epsilon.max(MIN_EPS);
    let kdbl = if pmf {
        ((PMF_COEF / eps).ln() / PMF_EXP).exp()
    } else {
        ((CDF_COEF / eps).ln() / CDF_EXP).exp()
    };
    let krnd = kdbl.round();
    let del = (krnd - kdbl).abs();
    let k = if del < EPS_DELTA_THRESHOLD {
        krnd
    } else {
        kdbl.ceil()
    };
    k.clamp(MIN_M as f64, MAX_K as f64) as u16
}

/// Returns the number of items held by `level`, or 0 if the level does not exist.
pub fn current_level_size_items(level: usize, num_levels: usize, levels_arr: &[u32]) -> u32 {
    if level >= num_levels {
        return 0;
    }
    levels_arr[level + 1] - levels_arr[level]
}

/// Returns the number of retained items in all levels above level 0.
pub fn num_retained_above_level_zero(num_levels: usize, levels_arr: &[u32]) -> u32 {
    levels_arr[num_levels] - levels_arr[1]
}

/// Returns the total weight of the retained items, each item of level `L` weighing `2^L`.
///
/// Saturates at `u64::MAX`, which only a corrupt levels array can reach.
pub fn sum_the_sample_weights(num_levels: usize, levels_arr: &[u32]) -> u64 {
    let mut total = 0u64;
    let mut weight = 1u64;
    for level in 0..num_levels {
        let pop = (levels_arr[level + 1] - levels_arr[level]) as u64;
        total = total.saturating_add(weight.saturating_mul(pop));
        weight = weight.saturating_mul(2);
    }
    total
}

/// Converts individual weights into cumulative weights in place and returns the total.
///
/// `[1, 1, 1, 1]` becomes `[1, 2, 3, 4]`.
pub fn convert_to_cumulative(weights: &mut [u64]) -> u64 {
    let mut subtotal = 0u64;
    for weight in weights.iter_mut() {
        subtotal += *weight;
        *weight = subtotal;
    }
    subtotal
}

/// Returns a very conservative upper bound of the number of levels for a stream of `n` items.
pub fn ub_on_num_levels(n: u64) -> usize {
    if n == 0 {
        return 1;
    }
    1 + (63 - n.leading_zeros() as usize)
}
