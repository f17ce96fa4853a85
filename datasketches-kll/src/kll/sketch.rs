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

use std::cmp::Ordering;

use super::DEFAULT_K;
use super::DEFAULT_M;
use super::MAX_K;
use super::MIN_K;
use super::helper::check_k;
use super::helper::check_m;
use super::helper::compute_total_item_capacity;
use super::helper::normalized_rank_error;
use super::helper::sum_the_sample_weights;
use super::item::KllItem;
use super::memory::DirectMemory;
use super::memory::MemoryRequestServer;
use super::memory::required_sketch_bytes;
use super::serialization::DATA_START;
use super::serialization::DATA_START_SINGLE_ITEM;
use super::serialization::SERIAL_VERSION_UPDATABLE;
use super::serialization::SER_VER_BYTE_ADR;
use super::validate::KllLayout;
use super::validate::MemoryValidate;
use crate::codec::SketchSlice;
use crate::error::Error;

/// KLL sketch state laid out as one items array addressed by a levels array.
///
/// Level `L` holds the items `items[levels_arr[L]..levels_arr[L + 1]]`, each weighing `2^L`.
/// Everything below `levels_arr[0]` is free space that new items are written into from the top
/// down. The last entry of the levels array is the total item capacity.
///
/// See the [kll module level documentation](crate::kll) for more.
#[allow(private_bounds)]
#[derive(Debug)]
pub struct KllSketch<T: KllItem> {
    pub(super) k: u16,
    pub(super) m: u8,
    pub(super) min_k: u16,
    pub(super) n: u64,
    pub(super) num_levels: usize,
    pub(super) levels_arr: Vec<u32>,
    pub(super) items: Vec<T>,
    pub(super) min_item: Option<T>,
    pub(super) max_item: Option<T>,
    pub(super) is_level_zero_sorted: bool,
    pub(super) is_read_only: bool,
    pub(super) memory: Option<DirectMemory>,
}

impl<T: KllItem> Default for KllSketch<T> {
    fn default() -> Self {
        Self::new(DEFAULT_K)
    }
}

#[allow(private_bounds)]
impl<T: KllItem> KllSketch<T> {
    /// Creates a new sketch with the given value of k and the default m.
    ///
    /// # Panics
    ///
    /// Panics if k is not in [MIN_K, MAX_K].
    ///
    /// # Examples
    ///
    /// ```
    /// # use datasketches_kll::kll::KllSketch;
    /// let sketch = KllSketch::<f64>::new(200);
    /// assert_eq!(sketch.k(), 200);
    /// assert_eq!(sketch.total_item_capacity(), 200);
    /// ```
    pub fn new(k: u16) -> Self {
        assert!(
            (MIN_K..=MAX_K).contains(&k),
            "k must be in [{MIN_K}, {MAX_K}], got {k}"
        );
        Self::make_empty(k, DEFAULT_M)
    }

    /// Creates a new sketch with the given k and minimum level width m.
    ///
    /// # Errors
    ///
    /// Returns an error if m is not even and in `[2, 8]`, or if k is not in `[m, 65535]`.
    pub fn try_with_m(k: u16, m: u8) -> Result<Self, Error> {
        check_m(m)?;
        check_k(k, m)?;
        Ok(Self::make_empty(k, m))
    }

    /// Creates a new empty sketch that lives in the caller supplied `region`.
    ///
    /// The region is kept in the updatable layout after every update. When it becomes too small,
    /// `server` is asked for a larger one.
    ///
    /// # Errors
    ///
    /// Returns an error if k or m are invalid, or if `region` cannot hold the empty image.
    pub fn new_direct(
        k: u16,
        m: u8,
        region: Vec<u8>,
        server: impl MemoryRequestServer + 'static,
    ) -> Result<Self, Error> {
        let mut sketch = Self::try_with_m(k, m)?;
        let required = required_sketch_bytes(2, k as usize, T::SIZE_BYTES);
        if region.len() < required {
            return Err(Error::buffer_too_small(required, region.len()));
        }
        sketch.memory = Some(DirectMemory {
            region,
            server: Box::new(server),
        });
        sketch.sync_memory();
        Ok(sketch)
    }

    /// Deserializes a sketch from any of the compact or updatable images.
    ///
    /// The returned sketch owns its arrays and can be updated.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let validated = MemoryValidate::new(bytes, T::SIZE_BYTES)?;
        Self::heapify_validated(&validated, bytes)
    }

    /// Same as [`deserialize`](Self::deserialize).
    pub fn heapify(bytes: &[u8]) -> Result<Self, Error> {
        Self::deserialize(bytes)
    }

    /// Wraps a compact image into a read-only sketch.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is invalid. Updates of the returned sketch fail with
    /// [`ErrorKind::ReadOnly`](crate::error::ErrorKind::ReadOnly).
    pub fn wrap(bytes: &[u8]) -> Result<Self, Error> {
        let mut sketch = Self::deserialize(bytes)?;
        sketch.is_read_only = true;
        Ok(sketch)
    }

    /// Wraps an updatable image held in `region` into a memory-backed sketch.
    ///
    /// # Errors
    ///
    /// Returns an error if the region does not hold a valid updatable image.
    pub fn writable_wrap(
        region: Vec<u8>,
        server: impl MemoryRequestServer + 'static,
    ) -> Result<Self, Error> {
        let validated = MemoryValidate::new(&region, T::SIZE_BYTES)?;
        if validated.layout() != KllLayout::Updatable {
            return Err(Error::deserial(format!(
                "writable wrap requires the updatable layout, got {:?}",
                validated.layout()
            )));
        }
        let mut sketch = Self::heapify_validated(&validated, &region)?;
        sketch.memory = Some(DirectMemory {
            region,
            server: Box::new(server),
        });
        Ok(sketch)
    }

    /// Returns parameter k used to configure this sketch.
    pub fn k(&self) -> u16 {
        self.k
    }

    /// Returns parameter m, the minimum level width.
    pub fn m(&self) -> u8 {
        self.m
    }

    /// Returns the minimum k used when merging sketches.
    pub fn min_k(&self) -> u16 {
        self.min_k
    }

    /// Returns total weight of the stream.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Returns the number of levels.
    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    /// Returns the levels array, `num_levels + 1` entries with the total capacity last.
    pub fn levels_array(&self) -> &[u32] {
        &self.levels_arr[..=self.num_levels]
    }

    /// Returns the whole items array, including the free space below `levels_array()[0]`.
    pub fn items_array(&self) -> &[T] {
        &self.items
    }

    /// Returns the retained items of all levels, level 0 first.
    pub fn retained_items(&self) -> &[T] {
        &self.items[self.levels_arr[0] as usize..self.levels_arr[self.num_levels] as usize]
    }

    /// Returns the retained items of one level, or an empty slice if the level does not exist.
    pub fn level_items(&self, level: usize) -> &[T] {
        if level >= self.num_levels {
            return &[];
        }
        &self.items[self.levels_arr[level] as usize..self.levels_arr[level + 1] as usize]
    }

    /// Returns true if the sketch has not seen any data.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns true if the sketch has seen exactly one item.
    pub fn is_single_item(&self) -> bool {
        self.n == 1
    }

    /// Returns true if level 0 is known to be sorted.
    pub fn is_level_zero_sorted(&self) -> bool {
        self.is_level_zero_sorted
    }

    /// Returns true if the sketch is in estimation mode.
    pub fn is_estimation_mode(&self) -> bool {
        self.num_levels > 1
    }

    /// Returns true if the sketch rejects updates.
    pub fn is_read_only(&self) -> bool {
        self.is_read_only
    }

    /// Returns true if the sketch lives in caller supplied memory.
    pub fn has_memory(&self) -> bool {
        self.memory.is_some()
    }

    /// Returns true if the backing memory region carries the updatable serial version.
    pub fn is_memory_updatable_format(&self) -> bool {
        self.memory()
            .and_then(|region| region.get(SER_VER_BYTE_ADR))
            .is_some_and(|serial_version| *serial_version == SERIAL_VERSION_UPDATABLE)
    }

    /// Returns the backing memory region of a memory-backed sketch.
    pub fn memory(&self) -> Option<&[u8]> {
        self.memory.as_ref().map(|memory| memory.region.as_slice())
    }

    /// Gives the backing memory region back to the caller.
    pub fn into_memory(self) -> Option<Vec<u8>> {
        self.memory.map(|memory| memory.region)
    }

    /// Returns the number of retained items.
    pub fn num_retained(&self) -> usize {
        (self.levels_arr[self.num_levels] - self.levels_arr[0]) as usize
    }

    /// Returns the total item capacity, the last entry of the levels array.
    pub fn total_item_capacity(&self) -> usize {
        self.levels_arr[self.num_levels] as usize
    }

    /// Returns the minimum item seen by the sketch.
    pub fn min_item(&self) -> Option<T> {
        self.min_item
    }

    /// Returns the maximum item seen by the sketch.
    pub fn max_item(&self) -> Option<T> {
        self.max_item
    }

    /// Returns the only item of a single item sketch.
    ///
    /// # Errors
    ///
    /// Returns an error if the sketch does not hold exactly one item.
    pub fn single_item(&self) -> Result<T, Error> {
        if !self.is_single_item() {
            return Err(Error::invalid_argument(format!(
                "sketch does not have exactly one item, n = {}",
                self.n
            )));
        }
        Ok(self.items[self.levels_arr[0] as usize])
    }

    /// Returns normalized rank error for the configured k.
    pub fn normalized_rank_error(&self, pmf: bool) -> f64 {
        normalized_rank_error(self.min_k, pmf)
    }

    /// Updates the sketch with a new item.
    ///
    /// NaN values are ignored for floating-point types.
    ///
    /// # Errors
    ///
    /// Returns an error if the sketch is read only, or if a memory-backed sketch needs a larger
    /// region and the memory request server fails. The sketch is unchanged in both cases.
    pub fn update(&mut self, item: T) -> Result<(), Error> {
        if self.is_read_only {
            return Err(Error::read_only("update"));
        }
        if T::is_nan(&item) {
            return Ok(());
        }
        let compacted = self.levels_arr[0] == 0;
        if compacted {
            self.compress_while_updating()?;
        }
        self.update_min_max(item);
        self.n += 1;
        self.is_level_zero_sorted = false;
        let next = self.levels_arr[0] - 1;
        self.levels_arr[0] = next;
        self.items[next as usize] = item;
        debug_assert_eq!(
            sum_the_sample_weights(self.num_levels, &self.levels_arr),
            self.n,
            "total weight does not match n"
        );
        if compacted {
            self.sync_memory();
        } else {
            self.write_insert_through(next as usize);
        }
        Ok(())
    }

    fn make_empty(k: u16, m: u8) -> Self {
        Self {
            k,
            m,
            min_k: k,
            n: 0,
            num_levels: 1,
            levels_arr: vec![k as u32, k as u32],
            items: vec![T::null_value(); k as usize],
            min_item: None,
            max_item: None,
            is_level_zero_sorted: false,
            is_read_only: false,
            memory: None,
        }
    }

    fn heapify_validated(validated: &MemoryValidate, bytes: &[u8]) -> Result<Self, Error> {
        let k = validated.k();
        let m = validated.m();
        let num_levels = validated.num_levels();
        let levels_arr = validated.levels_arr().to_vec();
        let capacity = levels_arr[num_levels] as usize;
        let mut items = vec![T::null_value(); capacity];
        let mut cursor = SketchSlice::new(bytes);

        let (min_item, max_item) = match validated.layout() {
            KllLayout::EmptyCompact => (None, None),
            KllLayout::SingleCompact => {
                cursor.seek(DATA_START_SINGLE_ITEM);
                let item = T::deserialize(&mut cursor)?;
                items[capacity - 1] = item;
                (Some(item), Some(item))
            }
            KllLayout::FullCompact | KllLayout::Updatable => {
                let levels_len = if validated.is_updatable() {
                    num_levels + 1
                } else {
                    num_levels
                };
                cursor.seek(DATA_START + levels_len * size_of::<u32>());
                let min_item = T::deserialize(&mut cursor)?;
                let max_item = T::deserialize(&mut cursor)?;
                // a compact image carries the retained items only
                let start = if validated.is_updatable() {
                    0
                } else {
                    levels_arr[0] as usize
                };
                for item in &mut items[start..] {
                    *item = T::deserialize(&mut cursor)?;
                }
                if validated.n() == 0 {
                    (None, None)
                } else {
                    (Some(min_item), Some(max_item))
                }
            }
        };

        debug_assert_eq!(compute_total_item_capacity(k, m, num_levels) as usize, capacity);
        Ok(Self {
            k,
            m,
            min_k: validated.min_k(),
            n: validated.n(),
            num_levels,
            levels_arr,
            items,
            min_item,
            max_item,
            is_level_zero_sorted: validated.is_level_zero_sorted(),
            is_read_only: false,
            memory: None,
        })
    }

    fn update_min_max(&mut self, item: T) {
        match (self.min_item, self.max_item) {
            (Some(min), Some(max)) => {
                if T::cmp(&item, &min) == Ordering::Less {
                    self.min_item = Some(item);
                }
                if T::cmp(&max, &item) == Ordering::Less {
                    self.max_item = Some(item);
                }
            }
            _ => {
                self.min_item = Some(item);
                self.max_item = Some(item);
            }
        }
    }
}
