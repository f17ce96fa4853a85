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

/// Growable output buffer of a serialized image.
///
/// An image is always written front to back, so the writers only append.
pub(crate) struct SketchBytes {
    bytes: Vec<u8>,
}

macro_rules! le_writers {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self, n: $ty) {
                self.bytes.extend_from_slice(&n.to_le_bytes());
            }
        )*
    };
}

impl SketchBytes {
    /// Preallocates `capacity` bytes, normally the exact image size.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn write_u8(&mut self, n: u8) {
        self.bytes.push(n);
    }

    le_writers! {
        write_u16_le => u16,
        write_u32_le => u32,
        write_i32_le => i32,
        write_u64_le => u64,
        write_i64_le => i64,
        write_f32_le => f32,
        write_f64_le => f64,
    }
}
