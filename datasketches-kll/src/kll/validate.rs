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

//! Validation of serialized KLL images.
//!
//! [`MemoryValidate`] performs all the error checking of an incoming image and extracts the key
//! fields in the process, deriving the ones a compact layout leaves out.

use super::MAX_NUM_LEVELS;
use super::helper::check_k;
use super::helper::check_m;
use super::helper::compute_total_item_capacity;
use super::helper::sum_the_sample_weights;
use super::serialization;
use super::serialization::DATA_START;
use super::serialization::DATA_START_SINGLE_ITEM;
use super::serialization::FLAG_EMPTY;
use super::serialization::FLAG_LEVEL_ZERO_SORTED;
use super::serialization::PREAMBLE_HEADER_BYTES;
use super::serialization::PREAMBLE_INTS_EMPTY_SINGLE;
use super::serialization::PREAMBLE_INTS_FULL;
use super::serialization::SERIAL_VERSION_EMPTY_FULL;
use super::serialization::SERIAL_VERSION_SINGLE;
use super::serialization::SERIAL_VERSION_UPDATABLE;
use crate::codec::family::Family;
use crate::error::Error;
use crate::error::PreambleFault;

/// The four recognized encodings of a KLL image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KllLayout {
    /// Compact image of a sketch with more than one item.
    FullCompact,
    /// Compact image of an empty sketch: the 8 byte preamble only.
    EmptyCompact,
    /// Compact image of a sketch with exactly one item.
    SingleCompact,
    /// Updatable image carrying the whole items array and levels array.
    Updatable,
}

/// The validated preamble and derived fields of a serialized KLL image.
///
/// A `MemoryValidate` is a read-only view: it is created from an image, inspected, and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryValidate {
    preamble_ints: u8,
    serial_version: u8,
    family_id: u8,
    flags: u8,
    k: u16,
    m: u8,
    layout: KllLayout,
    n: u64,
    min_k: u16,
    num_levels: usize,
    levels_arr: Vec<u32>,
    sketch_bytes: usize,
}

impl MemoryValidate {
    /// Validates `bytes` as the image of a sketch of items of `item_size_bytes` bytes each.
    ///
    /// # Errors
    ///
    /// Returns an error if the family id is not KLL, if k or m are out of range, if the preamble
    /// fields contradict each other, if the levels array is malformed, or if `bytes` is shorter
    /// than the image size the preamble implies.
    pub fn new(bytes: &[u8], item_size_bytes: usize) -> Result<Self, Error> {
        if bytes.len() < PREAMBLE_HEADER_BYTES {
            return Err(Error::insufficient_data("preamble")
                .with_context("length", bytes.len())
                .with_context("required", PREAMBLE_HEADER_BYTES));
        }

        let preamble_ints = serialization::pre_ints(bytes);
        let serial_version = serialization::ser_ver(bytes);
        let family_id = serialization::family_id(bytes);
        Family::KLL.validate_id(family_id)?;
        let flags = serialization::flags(bytes);
        let k = serialization::k(bytes);
        let m = serialization::m(bytes);
        check_m(m)?;
        check_k(k, m)?;

        let mut validated = MemoryValidate {
            preamble_ints,
            serial_version,
            family_id,
            flags,
            k,
            m,
            layout: KllLayout::FullCompact,
            n: 0,
            min_k: k,
            num_levels: 1,
            levels_arr: vec![k as u32, k as u32],
            sketch_bytes: PREAMBLE_HEADER_BYTES,
        };
        if serial_version == SERIAL_VERSION_UPDATABLE {
            validated.updatable_validate(bytes, item_size_bytes)?;
        } else {
            validated.compact_validate(bytes, item_size_bytes)?;
        }

        validated.validate_size(bytes.len())?;
        Ok(validated)
    }

    /// Checks that a buffer of `len` bytes holds the whole image.
    pub fn validate_size(&self, len: usize) -> Result<(), Error> {
        if len < self.sketch_bytes {
            return Err(Error::insufficient_data("sketch")
                .with_context("length", len)
                .with_context("required", self.sketch_bytes));
        }
        Ok(())
    }

    fn compact_validate(&mut self, bytes: &[u8], item_size_bytes: usize) -> Result<(), Error> {
        let empty = self.is_empty();
        // only the serial version marks the single-item layout, other flag bits are reserved
        let single_item = self.serial_version == SERIAL_VERSION_SINGLE;
        if empty && single_item {
            return Err(Error::preamble(
                PreambleFault::EmptyBitAndSingleFormat,
                "Flags: empty bit and single item format are exclusive",
                self.flags,
            ));
        }

        match (empty, single_item) {
            (false, false) => {
                if self.preamble_ints != PREAMBLE_INTS_FULL {
                    return Err(Error::preamble(
                        PreambleFault::InvalidPreInts,
                        format!("PreInts must be: {PREAMBLE_INTS_FULL}"),
                        self.preamble_ints,
                    ));
                }
                if self.serial_version != SERIAL_VERSION_EMPTY_FULL {
                    return Err(Error::preamble(
                        PreambleFault::EmptyBitAndSerVer,
                        format!("SerVer: {SERIAL_VERSION_EMPTY_FULL}"),
                        self.serial_version,
                    ));
                }
                self.read_full_preamble(bytes)?;

                let num_levels = self.num_levels;
                ensure_len(bytes, DATA_START + num_levels * size_of::<u32>(), "levels")?;
                // the last entry is not serialized, it is recomputed from k, m and num_levels
                let mut levels_arr = serialization::levels(bytes, num_levels);
                levels_arr.push(compute_total_item_capacity(self.k, self.m, num_levels));
                check_levels(&levels_arr)?;
                check_weights(self.n, num_levels, &levels_arr)?;

                let retained = (levels_arr[num_levels] - levels_arr[0]) as usize;
                self.layout = KllLayout::FullCompact;
                self.levels_arr = levels_arr;
                self.sketch_bytes = DATA_START
                    + num_levels * size_of::<u32>()
                    + 2 * item_size_bytes
                    + retained * item_size_bytes;
            }
            (true, false) => {
                if self.preamble_ints != PREAMBLE_INTS_EMPTY_SINGLE {
                    return Err(Error::preamble(
                        PreambleFault::EmptyBitAndPreInts,
                        format!("PreInts: {PREAMBLE_INTS_EMPTY_SINGLE}"),
                        self.preamble_ints,
                    ));
                }
                if self.serial_version != SERIAL_VERSION_EMPTY_FULL {
                    return Err(Error::preamble(
                        PreambleFault::EmptyBitAndSerVer,
                        format!("SerVer: {SERIAL_VERSION_EMPTY_FULL}"),
                        self.serial_version,
                    ));
                }
                let k = self.k as u32;
                self.layout = KllLayout::EmptyCompact;
                self.n = 0;
                self.min_k = self.k;
                self.num_levels = 1;
                self.levels_arr = vec![k, k];
                self.sketch_bytes = DATA_START_SINGLE_ITEM;
            }
            (false, true) => {
                if self.preamble_ints != PREAMBLE_INTS_EMPTY_SINGLE {
                    return Err(Error::preamble(
                        PreambleFault::SingleBitAndPreInts,
                        format!("PreInts: {PREAMBLE_INTS_EMPTY_SINGLE}"),
                        self.preamble_ints,
                    ));
                }
                let k = self.k as u32;
                self.layout = KllLayout::SingleCompact;
                self.n = 1;
                self.min_k = self.k;
                self.num_levels = 1;
                self.levels_arr = vec![k - 1, k];
                self.sketch_bytes = DATA_START_SINGLE_ITEM + item_size_bytes;
            }
            (true, true) => unreachable!("rejected above"),
        }
        Ok(())
    }

    fn updatable_validate(&mut self, bytes: &[u8], item_size_bytes: usize) -> Result<(), Error> {
        if self.preamble_ints != PREAMBLE_INTS_FULL {
            return Err(Error::preamble(
                PreambleFault::InvalidPreInts,
                format!("PreInts must be: {PREAMBLE_INTS_FULL}"),
                self.preamble_ints,
            ));
        }
        self.read_full_preamble(bytes)?;

        let num_levels = self.num_levels;
        ensure_len(
            bytes,
            DATA_START + (num_levels + 1) * size_of::<u32>(),
            "levels",
        )?;
        let levels_arr = serialization::levels(bytes, num_levels + 1);
        check_levels(&levels_arr)?;
        let capacity = levels_arr[num_levels];
        let expected = compute_total_item_capacity(self.k, self.m, num_levels);
        if capacity != expected {
            return Err(Error::deserial(format!(
                "levels last offset must equal capacity: expected {expected}, got {capacity}"
            )));
        }
        check_weights(self.n, num_levels, &levels_arr)?;

        self.layout = KllLayout::Updatable;
        self.levels_arr = levels_arr;
        self.sketch_bytes = DATA_START
            + (num_levels + 1) * size_of::<u32>()
            + 2 * item_size_bytes
            + capacity as usize * item_size_bytes;
        Ok(())
    }

    fn read_full_preamble(&mut self, bytes: &[u8]) -> Result<(), Error> {
        ensure_len(bytes, DATA_START, "preamble")?;
        self.n = serialization::n(bytes);
        self.min_k = serialization::min_k(bytes);
        self.num_levels = serialization::num_levels(bytes) as usize;

        if !(1..=MAX_NUM_LEVELS).contains(&self.num_levels) {
            return Err(Error::deserial(format!(
                "num_levels must be in [1, {MAX_NUM_LEVELS}], got {}",
                self.num_levels
            )));
        }
        if self.min_k < self.m as u16 || self.min_k > self.k {
            return Err(Error::deserial(format!(
                "min_k must be in [{}, {}], got {}",
                self.m, self.k, self.min_k
            )));
        }
        Ok(())
    }

    /// Returns the preamble ints field.
    pub fn preamble_ints(&self) -> u8 {
        self.preamble_ints
    }

    /// Returns the serial version field.
    pub fn serial_version(&self) -> u8 {
        self.serial_version
    }

    /// Returns the family id field.
    pub fn family_id(&self) -> u8 {
        self.family_id
    }

    /// Returns the raw flags byte.
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Returns parameter k.
    pub fn k(&self) -> u16 {
        self.k
    }

    /// Returns parameter m.
    pub fn m(&self) -> u8 {
        self.m
    }

    /// Returns the encoding the image uses.
    pub fn layout(&self) -> KllLayout {
        self.layout
    }

    /// Returns true if the empty flag is set.
    pub fn is_empty(&self) -> bool {
        self.flags & FLAG_EMPTY != 0
    }

    /// Returns true if the image uses the single item compact encoding.
    pub fn is_single_item(&self) -> bool {
        self.layout == KllLayout::SingleCompact
    }

    /// Returns true if the level zero sorted flag is set.
    pub fn is_level_zero_sorted(&self) -> bool {
        self.flags & FLAG_LEVEL_ZERO_SORTED != 0
    }

    /// Returns true if the image is in the updatable encoding.
    pub fn is_updatable(&self) -> bool {
        self.layout == KllLayout::Updatable
    }

    /// Returns the stream length, read or derived.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Returns the minimum k, read or derived.
    pub fn min_k(&self) -> u16 {
        self.min_k
    }

    /// Returns the number of levels, read or derived.
    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    /// Returns the full levels array of `num_levels + 1` entries, sentinel included.
    pub fn levels_arr(&self) -> &[u32] {
        &self.levels_arr
    }

    /// Returns the exact image size in bytes implied by the preamble.
    pub fn sketch_bytes(&self) -> usize {
        self.sketch_bytes
    }
}

fn ensure_len(bytes: &[u8], required: usize, tag: &'static str) -> Result<(), Error> {
    if bytes.len() < required {
        return Err(Error::insufficient_data(tag)
            .with_context("length", bytes.len())
            .with_context("required", required));
    }
    Ok(())
}

fn check_levels(levels_arr: &[u32]) -> Result<(), Error> {
    if levels_arr.windows(2).any(|w| w[1] < w[0]) {
        return Err(Error::deserial("levels array must be non-decreasing"));
    }
    Ok(())
}

fn check_weights(n: u64, num_levels: usize, levels_arr: &[u32]) -> Result<(), Error> {
    let weight = sum_the_sample_weights(num_levels, levels_arr);
    if weight != n {
        return Err(Error::deserial(format!(
            "n must equal the total weight of the levels: n = {n}, weight = {weight}"
        ))
        .with_context("n", n)
        .with_context("weight", weight));
    }
    Ok(())
}
