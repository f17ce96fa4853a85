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

//! Growth planning: projections of level counts and byte sizes for a target stream length.

use super::MAX_NUM_LEVELS;
use super::helper::check_k;
use super::helper::check_m;
use super::helper::level_capacity;
use super::serialization::DATA_START;
use crate::error::Error;

/// Cumulative totals of a sketch whose levels are all completely full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelStats {
    /// Stream weight represented by the items.
    pub n: u64,
    /// Number of levels the totals were computed for.
    pub num_levels: usize,
    /// Number of items.
    pub num_items: u32,
}

/// One step of the growth scheme of a sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthStats {
    /// Configured k.
    pub k: u16,
    /// Configured m.
    pub m: u8,
    /// Stream length the scheme was computed for.
    pub given_n: u64,
    /// Minimal number of levels able to absorb `given_n`.
    pub num_levels: usize,
    /// Total item capacity at `num_levels`.
    pub max_items: u32,
    /// Largest stream length absorbed at `num_levels` before another level is needed.
    pub max_n: u64,
    /// Compact serialized size of a completely full sketch at `num_levels`.
    pub compact_bytes: usize,
    /// Updatable serialized size of a completely full sketch at `num_levels`.
    pub updatable_bytes: usize,
}

/// Returns the item capacity of a single level and the stream weight it represents.
pub fn level_capacity_items(k: u16, m: u8, num_levels: usize, level: usize) -> LevelStats {
    let items = level_capacity(k, num_levels, level, m);
    // saturate: the top levels of very tall sketches represent more than u64::MAX items
    let n = u64::try_from((items as u128) << level).unwrap_or(u64::MAX);
    LevelStats {
        n,
        num_levels,
        num_items: items,
    }
}

/// Returns the cumulative stream weight and items when all `num_levels` levels are full.
pub fn final_sketch_stats_at_num_levels(k: u16, m: u8, num_levels: usize) -> LevelStats {
    let mut cum_items = 0u32;
    let mut cum_n = 0u64;
    for level in 0..num_levels {
        let stats = level_capacity_items(k, m, num_levels, level);
        cum_items += stats.num_items;
        cum_n = cum_n.saturating_add(stats.n);
        tracing::trace!(
            level,
            items = stats.num_items,
            cum_items,
            n = stats.n,
            cum_n,
            "sketch structure"
        );
    }
    LevelStats {
        n: cum_n,
        num_levels,
        num_items: cum_items,
    }
}

/// Returns the growth scheme of a sketch that absorbs a stream of `n` items.
///
/// The returned projection carries the minimal number of levels whose full capacity covers `n`,
/// together with the compact and updatable byte sizes of such a sketch for items of
/// `item_size_bytes` bytes. Each enumerated step is emitted as a `debug` event.
///
/// # Errors
///
/// Returns an error if k or m are invalid, or if `n` exceeds what 61 levels can represent.
///
/// # Examples
///
/// ```
/// # use datasketches_kll::kll::growth_scheme_for_given_n;
/// let stats = growth_scheme_for_given_n(200, 8, 1_000_000, 8).unwrap();
/// assert!(stats.max_n >= 1_000_000);
/// assert_eq!(stats.updatable_bytes, stats.compact_bytes + 4);
/// ```
pub fn growth_scheme_for_given_n(
    k: u16,
    m: u8,
    n: u64,
    item_size_bytes: usize,
) -> Result<GrowthStats, Error> {
    check_m(m)?;
    check_k(k, m)?;

    let mut num_levels = 0;
    loop {
        num_levels += 1;
        if num_levels > MAX_NUM_LEVELS {
            return Err(Error::invalid_argument(format!(
                "stream length {n} exceeds the capacity of {MAX_NUM_LEVELS} levels"
            ))
            .with_context("k", k)
            .with_context("m", m));
        }

        let stats = final_sketch_stats_at_num_levels(k, m, num_levels);
        let compact_bytes = stats.num_items as usize * item_size_bytes
            + num_levels * size_of::<u32>()
            + 2 * item_size_bytes
            + DATA_START;
        let updatable_bytes = compact_bytes + size_of::<u32>();
        tracing::debug!(
            num_levels,
            max_items = stats.num_items,
            max_n = stats.n,
            compact_bytes,
            updatable_bytes,
            "growth scheme"
        );

        if stats.n >= n {
            return Ok(GrowthStats {
                k,
                m,
                given_n: n,
                num_levels,
                max_items: stats.num_items,
                max_n: stats.n,
                compact_bytes,
                updatable_bytes,
            });
        }
    }
}
