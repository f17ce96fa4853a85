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

use datasketches_kll::error::ErrorKind;
use datasketches_kll::kll::DEFAULT_K;
use datasketches_kll::kll::DEFAULT_M;
use datasketches_kll::kll::GrowthStats;
use datasketches_kll::kll::MAX_K;
use datasketches_kll::kll::compute_total_item_capacity;
use datasketches_kll::kll::final_sketch_stats_at_num_levels;
use datasketches_kll::kll::growth_scheme_for_given_n;
use datasketches_kll::kll::level_capacity_items;
use googletest::assert_that;
use googletest::prelude::contains_substring;

#[test]
fn test_growth_scheme_default_k() {
    let stats = growth_scheme_for_given_n(DEFAULT_K, DEFAULT_M, 1000, 8).unwrap();
    assert_eq!(
        stats,
        GrowthStats {
            k: 200,
            m: 8,
            given_n: 1000,
            num_levels: 3,
            max_items: 422,
            max_n: 1155,
            compact_bytes: 422 * 8 + 3 * 4 + 2 * 8 + 20,
            updatable_bytes: 422 * 8 + 4 * 4 + 2 * 8 + 20,
        }
    );
}

#[test]
fn test_growth_scheme_level_boundaries() {
    let at_capacity = growth_scheme_for_given_n(DEFAULT_K, DEFAULT_M, 200, 4).unwrap();
    assert_eq!(at_capacity.num_levels, 1);
    assert_eq!(at_capacity.max_n, 200);

    let one_more = growth_scheme_for_given_n(DEFAULT_K, DEFAULT_M, 201, 4).unwrap();
    assert_eq!(one_more.num_levels, 2);
    assert_eq!(one_more.max_items, 333);
    assert_eq!(one_more.max_n, 133 + 2 * 200);

    let empty = growth_scheme_for_given_n(DEFAULT_K, DEFAULT_M, 0, 4).unwrap();
    assert_eq!(empty.num_levels, 1);
}

#[test]
fn test_growth_scheme_is_minimal() {
    for n in [1u64, 500, 1155, 1156, 100_000, 1_000_000, 1 << 40] {
        for item_size in [4usize, 8] {
            let stats = growth_scheme_for_given_n(DEFAULT_K, DEFAULT_M, n, item_size).unwrap();
            assert!(stats.max_n >= n);
            assert_eq!(
                stats.max_items,
                compute_total_item_capacity(DEFAULT_K, DEFAULT_M, stats.num_levels)
            );
            assert_eq!(stats.updatable_bytes, stats.compact_bytes + 4);
            if stats.num_levels > 1 {
                let below = final_sketch_stats_at_num_levels(
                    DEFAULT_K,
                    DEFAULT_M,
                    stats.num_levels - 1,
                );
                assert!(below.n < n, "{} levels already hold {n}", stats.num_levels - 1);
            }
        }
    }
}

#[test]
fn test_growth_scheme_too_many_levels() {
    // every level of a k = m = 8 sketch holds 8 items, which caps n below u64::MAX
    let err = growth_scheme_for_given_n(8, 8, u64::MAX, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_that!(err.message(), contains_substring("61 levels"));

    let stats = growth_scheme_for_given_n(MAX_K, 8, u64::MAX, 8).unwrap();
    assert_eq!(stats.max_n, u64::MAX);
}

#[test]
fn test_growth_scheme_invalid_parameters() {
    let err = growth_scheme_for_given_n(DEFAULT_K, 5, 1000, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = growth_scheme_for_given_n(4, 8, 1000, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_level_capacity_items() {
    let top = level_capacity_items(DEFAULT_K, DEFAULT_M, 3, 2);
    assert_eq!(top.num_items, 200);
    assert_eq!(top.n, 800);
    let bottom = level_capacity_items(DEFAULT_K, DEFAULT_M, 3, 0);
    assert_eq!(bottom.num_items, 89);
    assert_eq!(bottom.n, 89);
}

#[test]
fn test_final_sketch_stats_saturate() {
    let stats = final_sketch_stats_at_num_levels(DEFAULT_K, DEFAULT_M, 3);
    assert_eq!(stats.num_items, 422);
    assert_eq!(stats.n, 89 + 2 * 133 + 4 * 200);

    let tall = final_sketch_stats_at_num_levels(MAX_K, DEFAULT_M, 61);
    assert_eq!(tall.n, u64::MAX);
    assert_eq!(tall.num_levels, 61);
}
