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

//! Level array management: finding the level to compact and growing the sketch by a level.

use super::MAX_NUM_LEVELS;
use super::compaction::merge_sorted_in_place;
use super::compaction::random_bit;
use super::compaction::randomly_halve_down;
use super::compaction::randomly_halve_up;
use super::helper::level_capacity;
use super::item::KllItem;
use super::memory::memory_space_mgmt;
use super::sketch::KllSketch;
use crate::error::Error;

/// Finds the first level, starting with level 0, whose population reaches its nominal capacity.
///
/// `levels_arr` must hold at least `num_levels + 1` entries. Returns `None` if no level is at
/// capacity.
pub fn find_level_to_compact(
    k: u16,
    m: u8,
    num_levels: usize,
    levels_arr: &[u32],
) -> Option<usize> {
    (0..num_levels).find(|&level| {
        let pop = levels_arr[level + 1] - levels_arr[level];
        pop >= level_capacity(k, num_levels, level, m)
    })
}

#[allow(private_bounds)]
impl<T: KllItem> KllSketch<T> {
    /// Grows a completely full sketch by one empty top level.
    ///
    /// The items array grows by the capacity of the new bottom level, and all existing items are
    /// shifted up by that amount so the new space opens at index 0. Level boundaries move with
    /// the items, so every level keeps its contents and order.
    ///
    /// A memory-backed sketch first makes sure its region can hold the larger image, asking its
    /// memory request server for a new region if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the sketch is read only, if it is not completely full
    /// (`levels_array()[0] != 0`), if it already has the maximum number of levels, or if the
    /// memory request server fails. The sketch is unchanged in all of these cases.
    pub fn add_empty_top_level(&mut self) -> Result<(), Error> {
        if self.is_read_only {
            return Err(Error::read_only("add_empty_top_level"));
        }
        if self.levels_arr[0] != 0 {
            return Err(Error::invalid_argument(format!(
                "sketch is not completely full, levels[0] = {}",
                self.levels_arr[0]
            )));
        }
        self.add_empty_top_level_to_completely_full_sketch()
    }

    pub(super) fn add_empty_top_level_to_completely_full_sketch(&mut self) -> Result<(), Error> {
        let cur_num_levels = self.num_levels;
        let cur_total_cap = self.levels_arr[cur_num_levels];
        assert_eq!(self.levels_arr[0], 0, "sketch must be completely full");
        assert_eq!(self.items.len(), cur_total_cap as usize);

        if cur_num_levels >= MAX_NUM_LEVELS {
            return Err(Error::invalid_argument(format!(
                "sketch already has the maximum of {MAX_NUM_LEVELS} levels"
            )));
        }

        let delta_cap = level_capacity(self.k, cur_num_levels + 1, 0, self.m);
        let new_total_cap = cur_total_cap + delta_cap;
        let new_num_levels = cur_num_levels + 1;

        // a spare slot left by an earlier over-allocation is reused
        let mut new_levels_arr = self.levels_arr.clone();
        if new_levels_arr.len() < cur_num_levels + 2 {
            new_levels_arr.resize(cur_num_levels + 2, 0);
        }
        // shift every index but the new top sentinel
        for offset in &mut new_levels_arr[..new_num_levels] {
            *offset += delta_cap;
        }
        new_levels_arr[new_num_levels] = new_total_cap;

        let mut new_items = vec![T::null_value(); new_total_cap as usize];
        new_items[delta_cap as usize..].copy_from_slice(&self.items);

        let new_region = match self.memory.as_mut() {
            Some(memory) => memory_space_mgmt(
                memory,
                new_levels_arr.len(),
                new_total_cap as usize,
                T::SIZE_BYTES,
            )?,
            None => None,
        };

        tracing::debug!(
            k = self.k,
            num_levels = new_num_levels,
            delta_cap,
            total_cap = new_total_cap,
            "added empty top level"
        );
        if let (Some(memory), Some(region)) = (self.memory.as_mut(), new_region) {
            memory.region = region;
        }
        self.num_levels = new_num_levels;
        self.levels_arr = new_levels_arr;
        self.items = new_items;
        self.sync_memory();
        Ok(())
    }

    /// Makes room for one more item at the bottom of a completely full sketch.
    pub(super) fn compress_while_updating(&mut self) -> Result<(), Error> {
        let Some(level) = find_level_to_compact(self.k, self.m, self.num_levels, &self.levels_arr)
        else {
            unreachable!("a completely full sketch always has a level at or over capacity");
        };

        // the level above the top one must exist before the top one can be compacted
        if level == self.num_levels - 1 {
            self.add_empty_top_level_to_completely_full_sketch()?;
        }

        let raw_beg = self.levels_arr[level] as usize;
        let raw_end = self.levels_arr[level + 1] as usize;
        let pop_above = self.levels_arr[level + 2] as usize - raw_end;
        let raw_pop = raw_end - raw_beg;
        let odd_pop = raw_pop % 2 == 1;
        let adj_beg = if odd_pop { raw_beg + 1 } else { raw_beg };
        let adj_pop = if odd_pop { raw_pop - 1 } else { raw_pop };
        let half_adj_pop = adj_pop / 2;
        tracing::trace!(level, raw_pop, pop_above, "compacting level");

        if level == 0 {
            self.items[adj_beg..adj_beg + adj_pop].sort_by(T::cmp);
        }
        if pop_above == 0 {
            randomly_halve_up(&mut self.items, adj_beg, adj_pop, random_bit());
        } else {
            randomly_halve_down(&mut self.items, adj_beg, adj_pop, random_bit());
            merge_sorted_in_place(
                &mut self.items,
                adj_beg,
                half_adj_pop,
                raw_end,
                pop_above,
                adj_beg + half_adj_pop,
            );
        }

        // the level above now starts where its merged items begin
        let new_index = (raw_end - half_adj_pop) as u32;
        self.levels_arr[level + 1] = new_index;
        if odd_pop {
            // the leftover item stays at the current level, right below the level above
            self.levels_arr[level] = new_index - 1;
            self.items[new_index as usize - 1] = self.items[raw_beg];
        } else {
            self.levels_arr[level] = new_index;
        }
        debug_assert_eq!(self.levels_arr[level] as usize, raw_beg + half_adj_pop);

        // shift the levels below up over the freed space
        if level > 0 {
            let lower_beg = self.levels_arr[0] as usize;
            self.items
                .copy_within(lower_beg..raw_beg, lower_beg + half_adj_pop);
            for offset in &mut self.levels_arr[..level] {
                *offset += half_adj_pop as u32;
            }
        }
        Ok(())
    }
}
