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

//! Byte layout of serialized KLL images, shared by every DataSketches implementation.
//!
//! ```text
//! Byte   |    7    |   6   |    5   |    4   |    3    |    2     |    1   |     0     |
//!   0    | unused  |   M   |        K        |  Flags  | FamilyID | SerVer | PreInts   |
//!   8    |                               N (u64)                                       |
//!  16    |      levels[0] ...             | unused  | NumLevels |        minK          |
//! ```
//!
//! Compact images omit the last entry of the levels array and the unused prefix of the items
//! array. Updatable images carry both.

use byteorder::ByteOrder;
use byteorder::LittleEndian;

/// Serialization version for empty or full compact sketches.
pub const SERIAL_VERSION_EMPTY_FULL: u8 = 1;
/// Serialization version for single-item compact sketches.
pub const SERIAL_VERSION_SINGLE: u8 = 2;
/// Serialization version for updatable sketches.
pub const SERIAL_VERSION_UPDATABLE: u8 = 3;

/// Preamble ints for empty and single-item sketches.
pub const PREAMBLE_INTS_EMPTY_SINGLE: u8 = 2;
/// Preamble ints for sketches with more than one item.
pub const PREAMBLE_INTS_FULL: u8 = 5;

/// Flag indicating the sketch is empty.
pub const FLAG_EMPTY: u8 = 1 << 0;
/// Flag indicating level zero is sorted.
pub const FLAG_LEVEL_ZERO_SORTED: u8 = 1 << 1;

pub const PREAMBLE_INTS_BYTE_ADR: usize = 0;
pub const SER_VER_BYTE_ADR: usize = 1;
pub const FAMILY_BYTE_ADR: usize = 2;
pub const FLAGS_BYTE_ADR: usize = 3;
pub const K_SHORT_ADR: usize = 4;
pub const M_BYTE_ADR: usize = 6;
pub const N_LONG_ADR: usize = 8;
pub const MIN_K_SHORT_ADR: usize = 16;
pub const NUM_LEVELS_BYTE_ADR: usize = 18;

/// Size of the first part of the preamble, shared by every layout.
pub const PREAMBLE_HEADER_BYTES: usize = 8;
/// Serialized size for an empty sketch in bytes.
pub const EMPTY_SIZE_BYTES: usize = 8;
/// Data offset for single-item sketches.
pub const DATA_START_SINGLE_ITEM: usize = 8;
/// Data offset for sketches with more than one item.
pub const DATA_START: usize = 20;

/// Fixed address readers of a serialized image.
///
/// Callers check the image length against the address before reading.
pub(super) fn pre_ints(bytes: &[u8]) -> u8 {
    bytes[PREAMBLE_INTS_BYTE_ADR]
}

pub(super) fn ser_ver(bytes: &[u8]) -> u8 {
    bytes[SER_VER_BYTE_ADR]
}

pub(super) fn family_id(bytes: &[u8]) -> u8 {
    bytes[FAMILY_BYTE_ADR]
}

pub(super) fn flags(bytes: &[u8]) -> u8 {
    bytes[FLAGS_BYTE_ADR]
}

pub(super) fn k(bytes: &[u8]) -> u16 {
    LittleEndian::read_u16(&bytes[K_SHORT_ADR..])
}

pub(super) fn m(bytes: &[u8]) -> u8 {
    bytes[M_BYTE_ADR]
}

pub(super) fn n(bytes: &[u8]) -> u64 {
    LittleEndian::read_u64(&bytes[N_LONG_ADR..])
}

pub(super) fn min_k(bytes: &[u8]) -> u16 {
    LittleEndian::read_u16(&bytes[MIN_K_SHORT_ADR..])
}

pub(super) fn num_levels(bytes: &[u8]) -> u8 {
    bytes[NUM_LEVELS_BYTE_ADR]
}

/// Reads `len` level offsets starting at [`DATA_START`].
pub(super) fn levels(bytes: &[u8], len: usize) -> Vec<u32> {
    let mut levels = vec![0u32; len];
    LittleEndian::read_u32_into(&bytes[DATA_START..DATA_START + len * 4], &mut levels);
    levels
}
