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
use std::fmt;

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;

/// Fixed-width item types a [`KllSketch`] can hold.
///
/// Every item occupies `SIZE_BYTES` bytes in both the items array of an image and the min/max
/// pair, which is what lets the layouts address items by offset.
///
/// [`KllSketch`]: super::KllSketch
pub(crate) trait KllItem: Copy + PartialEq + fmt::Debug {
    const SIZE_BYTES: usize;

    fn cmp(a: &Self, b: &Self) -> Ordering;

    /// Items for which this returns true are dropped by `update`.
    fn is_nan(_value: &Self) -> bool {
        false
    }

    /// Filler for unused slots of the items array and for the min/max of an empty updatable image.
    fn null_value() -> Self;

    fn serialize(value: Self, bytes: &mut SketchBytes);

    fn deserialize(input: &mut SketchSlice<'_>) -> Result<Self, Error>;
}

macro_rules! float_item {
    ($ty:ty, $write:ident, $read:ident) => {
        impl KllItem for $ty {
            const SIZE_BYTES: usize = size_of::<$ty>();

            fn cmp(a: &Self, b: &Self) -> Ordering {
                // NaN never reaches the items array
                a.partial_cmp(b).unwrap_or(Ordering::Greater)
            }

            fn is_nan(value: &Self) -> bool {
                value.is_nan()
            }

            fn null_value() -> Self {
                <$ty>::NAN
            }

            fn serialize(value: Self, bytes: &mut SketchBytes) {
                bytes.$write(value);
            }

            fn deserialize(input: &mut SketchSlice<'_>) -> Result<Self, Error> {
                input
                    .$read()
                    .map_err(|_| Error::insufficient_data(stringify!($ty)))
            }
        }
    };
}

macro_rules! int_item {
    ($ty:ty, $write:ident, $read:ident) => {
        impl KllItem for $ty {
            const SIZE_BYTES: usize = size_of::<$ty>();

            fn cmp(a: &Self, b: &Self) -> Ordering {
                Ord::cmp(a, b)
            }

            fn null_value() -> Self {
                0
            }

            fn serialize(value: Self, bytes: &mut SketchBytes) {
                bytes.$write(value);
            }

            fn deserialize(input: &mut SketchSlice<'_>) -> Result<Self, Error> {
                input
                    .$read()
                    .map_err(|_| Error::insufficient_data(stringify!($ty)))
            }
        }
    };
}

float_item!(f32, write_f32_le, read_f32_le);
float_item!(f64, write_f64_le, read_f64_le);
int_item!(i32, write_i32_le, read_i32_le);
int_item!(i64, write_i64_le, read_i64_le);
