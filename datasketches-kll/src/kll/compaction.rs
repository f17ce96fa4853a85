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

//! In-place halving and merging of level slices in the items array.

use std::cell::Cell;
use std::cmp::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use super::item::KllItem;

fn seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seed = nanos as u64 ^ (std::process::id() as u64);
    if seed == 0 { 0x9e3779b97f4a7c15 } else { seed }
}

pub(super) fn random_bit() -> usize {
    thread_local! {
        static RNG_STATE: Cell<u64> = Cell::new(seed());
    }

    RNG_STATE.with(|state| {
        let mut x = state.get();
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        state.set(x);
        (x & 1) as usize
    })
}

/// Keeps every other item of `items[start..start + len]`, packed into the upper half.
///
/// `len` must be even; `offset` (0 or 1) picks which item of each pair survives.
pub(super) fn randomly_halve_up<T: KllItem>(
    items: &mut [T],
    start: usize,
    len: usize,
    offset: usize,
) {
    debug_assert!(len % 2 == 0, "length must be even");
    let half = len / 2;
    let mut j = start + len - 1 - offset;
    for i in (start + half..start + len).rev() {
        items[i] = items[j];
        j = j.wrapping_sub(2);
    }
}

/// Keeps every other item of `items[start..start + len]`, packed into the lower half.
///
/// `len` must be even; `offset` (0 or 1) picks which item of each pair survives.
pub(super) fn randomly_halve_down<T: KllItem>(
    items: &mut [T],
    start: usize,
    len: usize,
    offset: usize,
) {
    debug_assert!(len % 2 == 0, "length must be even");
    let half = len / 2;
    let mut j = start + offset;
    for i in start..start + half {
        items[i] = items[j];
        j += 2;
    }
}

/// Merges the sorted runs `items[a..a + len_a]` and `items[b..b + len_b]` into `items[c..]`.
///
/// The output may overlap the second run as long as it starts at or after the end of the first
/// run and no later than `b - len_a`, which holds when halving a level right below its parent.
pub(super) fn merge_sorted_in_place<T: KllItem>(
    items: &mut [T],
    a: usize,
    len_a: usize,
    b: usize,
    len_b: usize,
    c: usize,
) {
    debug_assert!(c >= a + len_a && c + len_a <= b, "merge output overlaps unread items");
    let lim_a = a + len_a;
    let lim_b = b + len_b;
    let (mut i, mut j) = (a, b);
    for out in c..c + len_a + len_b {
        let take_b = i == lim_a || (j < lim_b && T::cmp(&items[j], &items[i]) == Ordering::Less);
        if take_b {
            items[out] = items[j];
            j += 1;
        } else {
            items[out] = items[i];
            i += 1;
        }
    }
}
