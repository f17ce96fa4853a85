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

//! Compact and updatable binary layouts of a sketch.

use super::item::KllItem;
use super::memory::required_sketch_bytes;
use super::serialization::DATA_START;
use super::serialization::DATA_START_SINGLE_ITEM;
use super::serialization::EMPTY_SIZE_BYTES;
use super::serialization::FLAG_EMPTY;
use super::serialization::FLAG_LEVEL_ZERO_SORTED;
use super::serialization::FLAGS_BYTE_ADR;
use super::serialization::N_LONG_ADR;
use super::serialization::PREAMBLE_INTS_EMPTY_SINGLE;
use super::serialization::PREAMBLE_INTS_FULL;
use super::serialization::SERIAL_VERSION_EMPTY_FULL;
use super::serialization::SERIAL_VERSION_SINGLE;
use super::serialization::SERIAL_VERSION_UPDATABLE;
use super::sketch::KllSketch;
use crate::codec::SketchBytes;
use crate::codec::family::Family;
use crate::error::Error;

/// Returns the serialized size of a sketch with the given shape.
///
/// `capacity` is the total item capacity and `retained` the number of retained items. The
/// compact size of an empty or single item sketch uses the short fast path layouts.
pub fn serialized_size_bytes(
    n: u64,
    num_levels: usize,
    capacity: usize,
    retained: usize,
    item_size_bytes: usize,
    updatable: bool,
) -> usize {
    if updatable {
        return required_sketch_bytes(num_levels + 1, capacity, item_size_bytes);
    }
    match n {
        0 => EMPTY_SIZE_BYTES,
        1 => DATA_START_SINGLE_ITEM + item_size_bytes,
        _ => {
            DATA_START
                + num_levels * size_of::<u32>()
                + 2 * item_size_bytes
                + retained * item_size_bytes
        }
    }
}

#[allow(private_bounds)]
impl<T: KllItem> KllSketch<T> {
    /// Returns the size in bytes of the image [`to_compact_bytes`] or [`to_updatable_bytes`]
    /// would produce now.
    ///
    /// [`to_compact_bytes`]: Self::to_compact_bytes
    /// [`to_updatable_bytes`]: Self::to_updatable_bytes
    pub fn current_serialized_size_bytes(&self, updatable: bool) -> usize {
        serialized_size_bytes(
            self.n,
            self.num_levels,
            self.total_item_capacity(),
            self.num_retained(),
            T::SIZE_BYTES,
            updatable,
        )
    }

    /// Serializes the sketch to its compact image.
    pub fn serialize(&self) -> Vec<u8> {
        self.to_compact_bytes()
    }

    /// Serializes the sketch to its compact image.
    ///
    /// Empty sketches take 8 bytes and single item sketches 8 bytes plus the item. Larger sketches
    /// omit the last entry of the levels array and the free space of the items array.
    pub fn to_compact_bytes(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(self.current_serialized_size_bytes(false));
        self.write_preamble_header(&mut bytes, false);
        if self.is_empty() {
            return bytes.into_bytes();
        }
        if self.is_single_item() {
            T::serialize(self.items[self.levels_arr[0] as usize], &mut bytes);
            return bytes.into_bytes();
        }

        // the last entry of the levels array is recomputed on read
        self.write_full_body(&mut bytes, self.num_levels, self.levels_arr[0] as usize);
        debug_assert_eq!(bytes.len(), self.current_serialized_size_bytes(false));
        bytes.into_bytes()
    }

    /// Serializes the sketch to its updatable image.
    ///
    /// The image always uses the full layout and carries the whole levels array and items array,
    /// so a sketch wrapped from it can keep growing in place.
    pub fn to_updatable_bytes(&self) -> Vec<u8> {
        self.updatable_image(self.current_serialized_size_bytes(true))
    }

    /// Serializes the sketch into `dst` and returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if `dst` is smaller than [`current_serialized_size_bytes`].
    ///
    /// [`current_serialized_size_bytes`]: Self::current_serialized_size_bytes
    pub fn serialize_into(&self, dst: &mut [u8], updatable: bool) -> Result<usize, Error> {
        let size = self.current_serialized_size_bytes(updatable);
        if dst.len() < size {
            return Err(Error::buffer_too_small(size, dst.len()));
        }
        let bytes = if updatable {
            self.to_updatable_bytes()
        } else {
            self.to_compact_bytes()
        };
        dst[..size].copy_from_slice(&bytes);
        Ok(size)
    }

    /// Rewrites the updatable image of a memory-backed sketch into its region.
    pub(super) fn sync_memory(&mut self) {
        let size = self.current_serialized_size_bytes(true);
        if self.memory.is_none() {
            return;
        }
        let image = self.updatable_image(size);
        if let Some(memory) = self.memory.as_mut() {
            debug_assert!(memory.region.len() >= size, "region must hold the image");
            memory.region[..size].copy_from_slice(&image);
        }
    }

    /// Writes an insert that did not compact through to the region of a memory-backed sketch.
    ///
    /// Only the fields such an insert changes are written: the flags, n, the level 0 offset, min
    /// and max, and the item slot at `index`. The rest of the region already holds the image.
    pub(super) fn write_insert_through(&mut self, index: usize) {
        if self.memory.is_none() {
            return;
        }
        let item_size = T::SIZE_BYTES;
        let min_max_offset = DATA_START + (self.num_levels + 1) * size_of::<u32>();
        let item_offset = min_max_offset + 2 * item_size + index * item_size;

        let mut n = SketchBytes::with_capacity(size_of::<u64>());
        n.write_u64_le(self.n);
        let mut level_zero = SketchBytes::with_capacity(size_of::<u32>());
        level_zero.write_u32_le(self.levels_arr[0]);
        let mut min_max = SketchBytes::with_capacity(2 * item_size);
        T::serialize(self.min_item.unwrap_or_else(T::null_value), &mut min_max);
        T::serialize(self.max_item.unwrap_or_else(T::null_value), &mut min_max);
        let mut item = SketchBytes::with_capacity(item_size);
        T::serialize(self.items[index], &mut item);
        let flags = self.flags();

        if let Some(memory) = self.memory.as_mut() {
            let region = &mut memory.region;
            debug_assert!(region.len() >= item_offset + item_size, "region must hold the image");
            region[FLAGS_BYTE_ADR] = flags;
            for (offset, field) in [
                (N_LONG_ADR, n),
                (DATA_START, level_zero),
                (min_max_offset, min_max),
                (item_offset, item),
            ] {
                let field = field.into_bytes();
                region[offset..offset + field.len()].copy_from_slice(&field);
            }
        }
    }

    fn updatable_image(&self, size: usize) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(size);
        self.write_preamble_header(&mut bytes, true);
        self.write_full_body(&mut bytes, self.num_levels + 1, 0);
        debug_assert_eq!(bytes.len(), size);
        bytes.into_bytes()
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.is_empty() {
            flags |= FLAG_EMPTY;
        }
        if self.is_level_zero_sorted {
            flags |= FLAG_LEVEL_ZERO_SORTED;
        }
        flags
    }

    fn write_preamble_header(&self, bytes: &mut SketchBytes, updatable: bool) {
        let preamble_ints = if updatable || self.n > 1 {
            PREAMBLE_INTS_FULL
        } else {
            PREAMBLE_INTS_EMPTY_SINGLE
        };
        let serial_version = if updatable {
            SERIAL_VERSION_UPDATABLE
        } else if self.is_single_item() {
            SERIAL_VERSION_SINGLE
        } else {
            SERIAL_VERSION_EMPTY_FULL
        };

        bytes.write_u8(preamble_ints);
        bytes.write_u8(serial_version);
        bytes.write_u8(Family::KLL.id);
        bytes.write_u8(self.flags());
        bytes.write_u16_le(self.k);
        bytes.write_u8(self.m);
        bytes.write_u8(0);
    }

    /// Writes the rest of the full layout: n, min k, the first `levels_len` offsets, min and max
    /// items, and the items array from `items_start` on.
    fn write_full_body(&self, bytes: &mut SketchBytes, levels_len: usize, items_start: usize) {
        bytes.write_u64_le(self.n);
        bytes.write_u16_le(self.min_k);
        bytes.write_u8(self.num_levels as u8);
        bytes.write_u8(0);
        for offset in &self.levels_arr[..levels_len] {
            bytes.write_u32_le(*offset);
        }
        T::serialize(self.min_item.unwrap_or_else(T::null_value), bytes);
        T::serialize(self.max_item.unwrap_or_else(T::null_value), bytes);
        let capacity = self.levels_arr[self.num_levels] as usize;
        for item in &self.items[items_start..capacity] {
            T::serialize(*item, bytes);
        }
    }
}
