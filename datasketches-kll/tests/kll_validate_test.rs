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
use datasketches_kll::error::PreambleFault;
use datasketches_kll::kll::DefaultMemoryRequestServer;
use datasketches_kll::kll::KllLayout;
use datasketches_kll::kll::KllSketch;
use datasketches_kll::kll::MemoryValidate;
use googletest::assert_that;
use googletest::prelude::contains_substring;

fn filled(k: u16, n: i64) -> KllSketch<i64> {
    let mut sketch = KllSketch::<i64>::new(k);
    for i in 1..=n {
        sketch.update(i).unwrap();
    }
    sketch
}

fn header(pre_ints: u8, ser_ver: u8, flags: u8) -> Vec<u8> {
    vec![pre_ints, ser_ver, 15, flags, 200, 0, 8, 0]
}

fn assert_fault(bytes: &[u8], fault: PreambleFault) {
    let err = MemoryValidate::new(bytes, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedPreamble(fault), "{err}");
    let err = KllSketch::<i64>::deserialize(bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedPreamble(fault));
}

#[test]
fn test_validate_empty_image() {
    let bytes = KllSketch::<i64>::new(200).to_compact_bytes();
    let validated = MemoryValidate::new(&bytes, 8).unwrap();
    assert_eq!(validated.layout(), KllLayout::EmptyCompact);
    assert!(validated.is_empty());
    assert!(!validated.is_single_item());
    assert_eq!(validated.n(), 0);
    assert_eq!(validated.min_k(), 200);
    assert_eq!(validated.num_levels(), 1);
    assert_eq!(validated.levels_arr(), &[200, 200]);
    assert_eq!(validated.sketch_bytes(), 8);
}

#[test]
fn test_validate_single_item_image() {
    let bytes = filled(200, 1).to_compact_bytes();
    let validated = MemoryValidate::new(&bytes, 8).unwrap();
    assert_eq!(validated.layout(), KllLayout::SingleCompact);
    assert!(validated.is_single_item());
    assert_eq!(validated.n(), 1);
    assert_eq!(validated.levels_arr(), &[199, 200]);
    assert_eq!(validated.sketch_bytes(), 16);
}

#[test]
fn test_validate_single_item_by_serial_version_only() {
    let mut bytes = header(2, 2, 0);
    bytes.extend_from_slice(&7i64.to_le_bytes());
    let validated = MemoryValidate::new(&bytes, 8).unwrap();
    assert_eq!(validated.layout(), KllLayout::SingleCompact);
    let sketch = KllSketch::<i64>::deserialize(&bytes).unwrap();
    assert_eq!(sketch.single_item().unwrap(), 7);
}

#[test]
fn test_validate_full_image() {
    let bytes = filled(128, 1000).to_compact_bytes();
    let validated = MemoryValidate::new(&bytes, 8).unwrap();
    assert_eq!(validated.layout(), KllLayout::FullCompact);
    assert_eq!(validated.preamble_ints(), 5);
    assert_eq!(validated.serial_version(), 1);
    assert_eq!(validated.family_id(), 15);
    assert_eq!(validated.flags(), 0);
    assert_eq!(validated.k(), 128);
    assert_eq!(validated.m(), 8);
    assert_eq!(validated.n(), 1000);
    assert_eq!(validated.num_levels(), 4);
    assert_eq!(validated.levels_arr(), &[15, 173, 212, 213, 308]);
    assert_eq!(validated.sketch_bytes(), bytes.len());
    assert!(!validated.is_updatable());
    assert!(!validated.is_level_zero_sorted());
}

#[test]
fn test_empty_bit_faults() {
    assert_fault(&header(5, 1, 1), PreambleFault::EmptyBitAndPreInts);
    assert_fault(&header(2, 7, 1), PreambleFault::EmptyBitAndSerVer);
    assert_fault(&header(2, 2, 1), PreambleFault::EmptyBitAndSingleFormat);
}

#[test]
fn test_single_item_faults() {
    let mut bytes = header(5, 2, 0);
    bytes.extend_from_slice(&1i64.to_le_bytes());
    assert_fault(&bytes, PreambleFault::SingleBitAndPreInts);
}

#[test]
fn test_reserved_flag_bit_does_not_select_single_item() {
    // with the full serial version, a short preamble is a full image fault
    let mut bytes = header(2, 1, 4);
    bytes.extend_from_slice(&1i64.to_le_bytes());
    assert_fault(&bytes, PreambleFault::InvalidPreInts);

    let validated = MemoryValidate::new(&header(2, 1, 1 | 4), 8).unwrap();
    assert_eq!(validated.layout(), KllLayout::EmptyCompact);
    assert!(!validated.is_single_item());

    let mut bytes = header(2, 2, 4);
    bytes.extend_from_slice(&7i64.to_le_bytes());
    let validated = MemoryValidate::new(&bytes, 8).unwrap();
    assert_eq!(validated.layout(), KllLayout::SingleCompact);
}

#[test]
fn test_full_image_faults() {
    let mut bytes = filled(128, 1000).to_compact_bytes();
    bytes[0] = 2;
    assert_fault(&bytes, PreambleFault::InvalidPreInts);
    bytes[0] = 5;
    bytes[1] = 7;
    assert_fault(&bytes, PreambleFault::EmptyBitAndSerVer);

    let mut bytes = filled(128, 1000).to_updatable_bytes();
    bytes[0] = 2;
    assert_fault(&bytes, PreambleFault::InvalidPreInts);
}

#[test]
fn test_fault_message() {
    let err = MemoryValidate::new(&header(5, 1, 1), 8).unwrap_err();
    assert_that!(err.message(), contains_substring("EmptyBitAndPreInts"));
    assert_that!(err.message(), contains_substring("NOT: 5"));
    assert_eq!(err.context_value("actual"), Some("5"));
}

#[test]
fn test_invalid_family() {
    let mut bytes = header(2, 1, 1);
    bytes[2] = 16;
    let err = MemoryValidate::new(&bytes, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFamily);
    assert_eq!(err.context_value("expected"), Some("15"));
    assert_eq!(err.context_value("actual"), Some("16"));
}

#[test]
fn test_invalid_k_and_m() {
    let mut bytes = header(2, 1, 1);
    bytes[6] = 3;
    let err = MemoryValidate::new(&bytes, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let mut bytes = header(2, 1, 1);
    bytes[4] = 4;
    let err = MemoryValidate::new(&bytes, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_insufficient_data() {
    let err = MemoryValidate::new(&[2, 1, 15, 1, 200], 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientData);

    let bytes = filled(128, 1000).to_compact_bytes();
    let err = KllSketch::<i64>::deserialize(&bytes[..100]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientData);
    let err = KllSketch::<i64>::deserialize(&bytes[..12]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientData);

    let bytes = filled(200, 1).to_compact_bytes();
    let err = KllSketch::<i64>::deserialize(&bytes[..12]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientData);
}

#[test]
fn test_malformed_full_preamble() {
    let bytes = filled(128, 1000).to_compact_bytes();

    let mut no_levels = bytes.clone();
    no_levels[18] = 0;
    let err = MemoryValidate::new(&no_levels, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);

    let mut too_many_levels = bytes.clone();
    too_many_levels[18] = 62;
    let err = MemoryValidate::new(&too_many_levels, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);

    let mut big_min_k = bytes.clone();
    big_min_k[16..18].copy_from_slice(&300u16.to_le_bytes());
    let err = MemoryValidate::new(&big_min_k, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);

    let mut decreasing = bytes;
    decreasing[24..28].copy_from_slice(&10u32.to_le_bytes());
    let err = MemoryValidate::new(&decreasing, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
}

#[test]
fn test_updatable_capacity_mismatch() {
    let mut bytes = filled(128, 1000).to_updatable_bytes();
    bytes[36..40].copy_from_slice(&309u32.to_le_bytes());
    let err = MemoryValidate::new(&bytes, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
    assert_that!(err.message(), contains_substring("capacity"));
}

#[test]
fn test_n_must_match_level_weights() {
    let sketch = filled(200, 300);
    for bytes in [sketch.to_compact_bytes(), sketch.to_updatable_bytes()] {
        assert!(MemoryValidate::new(&bytes, 8).is_ok());

        let mut patched = bytes.clone();
        patched[8..16].copy_from_slice(&5u64.to_le_bytes());
        let err = MemoryValidate::new(&patched, 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
        assert_that!(err.message(), contains_substring("total weight"));
        assert_eq!(err.context_value("n"), Some("5"));
        assert_eq!(err.context_value("weight"), Some("300"));

        let err = KllSketch::<i64>::deserialize(&patched).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
        let err = KllSketch::<i64>::wrap(&patched).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
    }

    let mut patched = sketch.to_updatable_bytes();
    patched[8..16].copy_from_slice(&301u64.to_le_bytes());
    let err =
        KllSketch::<i64>::writable_wrap(patched, DefaultMemoryRequestServer::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
}
