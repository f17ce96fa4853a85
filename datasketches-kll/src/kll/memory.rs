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

//! Backing memory of updatable sketches.
//!
//! A memory-backed sketch keeps its updatable image in a region handed over by the caller.
//! When the image outgrows the region, a [`MemoryRequestServer`] is asked for a larger one.

use std::fmt;

use super::serialization::DATA_START;
use crate::error::Error;
use crate::error::ErrorKind;

/// Supplies larger memory regions to memory-backed sketches.
pub trait MemoryRequestServer {
    /// Returns a region of at least `required_bytes` bytes.
    ///
    /// `current` is the region the sketch lives in now. The sketch copies its preamble into the
    /// returned region and rewrites everything after it, so the returned bytes need not be
    /// initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be satisfied. The sketch is left unchanged.
    fn request(&mut self, current: &[u8], required_bytes: usize) -> Result<Vec<u8>, Error>;
}

/// A [`MemoryRequestServer`] that allocates zeroed regions on the heap.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMemoryRequestServer {
    over_allocate: bool,
}

impl DefaultMemoryRequestServer {
    /// Creates a server that allocates exactly the requested number of bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a server that allocates twice the requested number of bytes, so that the next few
    /// growth steps fit in place.
    pub fn over_allocating() -> Self {
        Self {
            over_allocate: true,
        }
    }
}

impl MemoryRequestServer for DefaultMemoryRequestServer {
    fn request(&mut self, _current: &[u8], required_bytes: usize) -> Result<Vec<u8>, Error> {
        let len = if self.over_allocate {
            required_bytes.checked_mul(2).ok_or_else(|| {
                Error::new(
                    ErrorKind::ReallocationFailed,
                    format!("cannot over-allocate {required_bytes} bytes"),
                )
            })?
        } else {
            required_bytes
        };
        Ok(vec![0u8; len])
    }
}

/// The caller supplied region of a memory-backed sketch and the server that can replace it.
pub(super) struct DirectMemory {
    pub(super) region: Vec<u8>,
    pub(super) server: Box<dyn MemoryRequestServer>,
}

impl fmt::Debug for DirectMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectMemory")
            .field("capacity", &self.region.len())
            .finish_non_exhaustive()
    }
}

/// Returns the updatable image size for the given array lengths.
pub(super) fn required_sketch_bytes(
    levels_arr_len: usize,
    items_arr_len: usize,
    item_size_bytes: usize,
) -> usize {
    DATA_START
        + levels_arr_len * size_of::<u32>()
        + 2 * item_size_bytes
        + items_arr_len * item_size_bytes
}

/// Makes sure `memory` can hold an updatable image with the new array lengths.
///
/// Returns `None` if the current region is large enough. Otherwise returns the new region with
/// the preamble already copied over; the caller installs it and rewrites the rest of the image.
pub(super) fn memory_space_mgmt(
    memory: &mut DirectMemory,
    new_levels_arr_len: usize,
    new_items_arr_len: usize,
    item_size_bytes: usize,
) -> Result<Option<Vec<u8>>, Error> {
    let required = required_sketch_bytes(new_levels_arr_len, new_items_arr_len, item_size_bytes);
    if required <= memory.region.len() {
        return Ok(None);
    }

    tracing::debug!(
        current = memory.region.len(),
        required,
        "requesting larger sketch memory"
    );
    let mut region = memory
        .server
        .request(&memory.region, required)
        .map_err(|err| Error::reallocation_failed(required, err))?;
    if region.len() < required {
        return Err(Error::buffer_too_small(required, region.len()));
    }
    region[..DATA_START].copy_from_slice(&memory.region[..DATA_START]);
    Ok(Some(region))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(len: usize) -> DirectMemory {
        let mut region = vec![0u8; len];
        for (i, b) in region.iter_mut().take(DATA_START).enumerate() {
            *b = i as u8 + 1;
        }
        DirectMemory {
            region,
            server: Box::new(DefaultMemoryRequestServer::new()),
        }
    }

    #[test]
    fn test_required_sketch_bytes() {
        assert_eq!(required_sketch_bytes(2, 200, 8), 20 + 8 + 16 + 1600);
        assert_eq!(required_sketch_bytes(3, 333, 4), 20 + 12 + 8 + 1332);
    }

    #[test]
    fn test_region_large_enough_is_kept() {
        let mut memory = direct(2000);
        let result = memory_space_mgmt(&mut memory, 2, 200, 8).unwrap();
        assert!(result.is_none());
        assert_eq!(memory.region.len(), 2000);
    }

    #[test]
    fn test_new_region_carries_preamble() {
        let mut memory = direct(1644);
        let region = memory_space_mgmt(&mut memory, 3, 333, 8).unwrap().unwrap();
        assert_eq!(region.len(), 2712);
        assert_eq!(&region[..DATA_START], &memory.region[..DATA_START]);
        assert!(region[DATA_START..].iter().all(|b| *b == 0));
        // the old region is untouched until the caller installs the new one
        assert_eq!(memory.region.len(), 1644);
    }

    #[test]
    fn test_over_allocating_server() {
        let mut server = DefaultMemoryRequestServer::over_allocating();
        assert_eq!(server.request(&[], 100).unwrap().len(), 200);
        let err = server.request(&[], usize::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReallocationFailed);
    }
}
