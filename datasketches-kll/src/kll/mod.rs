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

//! KLL sketch internals: capacity model, level management and binary layouts.
//!
//! A KLL sketch keeps its items in one array partitioned into levels, level `L` items carrying
//! weight `2^L`. Level capacities shrink geometrically by a factor of 2/3 from the top level
//! down, never below the minimum width m. New items enter level 0 at the bottom of the array and
//! full levels are compacted upward.
//!
//! Images use the Apache DataSketches binary format: a compact form for storage and transport,
//! and an updatable form that a memory-backed sketch keeps current while it grows.
//!
//! # Usage
//!
//! ```rust
//! # use datasketches_kll::kll::KllSketch;
//! let mut sketch = KllSketch::<i64>::new(128);
//! for i in 1..=1000 {
//!     sketch.update(i).unwrap();
//! }
//! assert_eq!(sketch.n(), 1000);
//! assert!(sketch.is_estimation_mode());
//!
//! let bytes = sketch.to_compact_bytes();
//! let restored = KllSketch::<i64>::deserialize(&bytes).unwrap();
//! assert_eq!(restored.levels_array(), sketch.levels_array());
//! assert_eq!(restored.min_item(), Some(1));
//! assert_eq!(restored.max_item(), Some(1000));
//! ```

mod compaction;
mod growth;
mod helper;
mod item;
mod layout;
mod levels;
mod memory;
pub mod serialization;
mod sketch;
mod validate;

pub use self::growth::GrowthStats;
pub use self::growth::LevelStats;
pub use self::growth::final_sketch_stats_at_num_levels;
pub use self::growth::growth_scheme_for_given_n;
pub use self::growth::level_capacity_items;
pub use self::helper::CDF_COEF;
pub use self::helper::CDF_EXP;
pub use self::helper::EPS_DELTA_THRESHOLD;
pub use self::helper::MIN_EPS;
pub use self::helper::PMF_COEF;
pub use self::helper::PMF_EXP;
pub use self::helper::check_k;
pub use self::helper::check_m;
pub use self::helper::compute_total_item_capacity;
pub use self::helper::convert_to_cumulative;
pub use self::helper::current_level_size_items;
pub use self::helper::int_cap_aux;
pub use self::helper::k_from_epsilon;
pub use self::helper::level_capacity;
pub use self::helper::normalized_rank_error;
pub use self::helper::num_retained_above_level_zero;
pub use self::helper::sum_the_sample_weights;
pub use self::helper::ub_on_num_levels;
pub use self::layout::serialized_size_bytes;
pub use self::levels::find_level_to_compact;
pub use self::memory::DefaultMemoryRequestServer;
pub use self::memory::MemoryRequestServer;
pub use self::sketch::KllSketch;
pub use self::validate::KllLayout;
pub use self::validate::MemoryValidate;

/// Default value of parameter k.
pub const DEFAULT_K: u16 = 200;
/// Default value of parameter m.
pub const DEFAULT_M: u8 = 8;
/// Minimum value of parameter m.
pub const MIN_M: u8 = 2;
/// Maximum value of parameter m.
pub const MAX_M: u8 = 8;
/// Minimum value of parameter k.
pub const MIN_K: u16 = DEFAULT_M as u16;
/// Maximum value of parameter k.
pub const MAX_K: u16 = u16::MAX;
/// Maximum number of levels a sketch can have.
pub const MAX_NUM_LEVELS: usize = 61;
