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

//! Level management and binary layout engine for KLL quantile sketches.
//!
//! The crate answers three questions for a KLL sketch: how many levels and how much item
//! capacity a configuration needs, how to grow that capacity in place without disturbing the
//! retained items, and how to read and write the byte-exact DataSketches binary image of the
//! sketch state.
//!
//! See the [kll module level documentation](crate::kll) for the details.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod codec;

pub mod error;
pub mod kll;
