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

//! Error types for KLL engine operations

use std::fmt;

/// PreambleFault identifies which combination of preamble fields made an image unreadable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PreambleFault {
    /// The empty bit is set but the preamble ints field is not the short value.
    EmptyBitAndPreInts,
    /// The empty bit is set but the serial version is not the empty/full version.
    EmptyBitAndSerVer,
    /// The single-item format is used but the serial version is not the single-item version.
    ///
    /// The single-item format is identified by its serial version, so images read by this crate
    /// never raise this fault.
    SingleBitAndSerVer,
    /// The single-item format is used but the preamble ints field is not the short value.
    SingleBitAndPreInts,
    /// A full or updatable image does not carry the full preamble ints value.
    InvalidPreInts,
    /// The empty bit and the single-item format are both present.
    EmptyBitAndSingleFormat,
}

impl PreambleFault {
    /// Convert this fault into static str.
    pub const fn into_static(self) -> &'static str {
        match self {
            PreambleFault::EmptyBitAndPreInts => "EmptyBitAndPreInts",
            PreambleFault::EmptyBitAndSerVer => "EmptyBitAndSerVer",
            PreambleFault::SingleBitAndSerVer => "SingleBitAndSerVer",
            PreambleFault::SingleBitAndPreInts => "SingleBitAndPreInts",
            PreambleFault::InvalidPreInts => "InvalidPreInts",
            PreambleFault::EmptyBitAndSingleFormat => "EmptyBitAndSingleFormat",
        }
    }
}

impl fmt::Display for PreambleFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// ErrorKind is all kinds of Error of the KLL engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A sketch parameter such as k or m is out of range.
    InvalidArgument,
    /// The family id of a serialized image is not the KLL family.
    InvalidFamily,
    /// The preamble fields of a serialized image contradict each other.
    MalformedPreamble(PreambleFault),
    /// The body of a serialized image is inconsistent with its preamble.
    MalformedDeserializeData,
    /// A serialized image is shorter than the size its preamble implies.
    InsufficientData,
    /// A caller supplied region is too small for the bytes that must be written into it.
    BufferTooSmall,
    /// The memory request server could not provide a larger region.
    ReallocationFailed,
    /// The sketch is read only.
    ReadOnly,
}

impl ErrorKind {
    /// Convert this error kind instance into static str.
    pub const fn into_static(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::InvalidFamily => "InvalidFamily",
            ErrorKind::MalformedPreamble(_) => "MalformedPreamble",
            ErrorKind::MalformedDeserializeData => "MalformedDeserializeData",
            ErrorKind::InsufficientData => "InsufficientData",
            ErrorKind::BufferTooSmall => "BufferTooSmall",
            ErrorKind::ReallocationFailed => "ReallocationFailed",
            ErrorKind::ReadOnly => "ReadOnly",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MalformedPreamble(fault) => write!(f, "MalformedPreamble({fault})"),
            kind => write!(f, "{}", kind.into_static()),
        }
    }
}

/// Error is the error struct returned by all fallible engine functions.
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new Error with error kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::default(),
            source: None,
        }
    }

    /// Add more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Set source for error.
    ///
    /// # Panics
    ///
    /// Panics if the source has been set.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::error::Error as _;
    /// use datasketches_kll::error::{Error, ErrorKind};
    ///
    /// let mut error = Error::new(ErrorKind::ReallocationFailed, "failed to grow sketch memory");
    /// assert!(error.source().is_none());
    /// error = error.set_source(std::io::Error::new(std::io::ErrorKind::Other, "out of memory"));
    /// assert!(error.source().is_some());
    /// ```
    pub fn set_source(mut self, src: impl Into<anyhow::Error>) -> Self {
        assert!(self.source.is_none(), "the source error has been set");
        self.source = Some(src.into());
        self
    }

    /// Return error's kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return error's message.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Return the value recorded for the given context key, if any.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub(crate) fn invalid_family(expected: u8, actual: u8, name: &'static str) -> Self {
        Self::new(
            ErrorKind::InvalidFamily,
            format!("FamilyID Field must be: {expected} ({name}), NOT: {actual}"),
        )
        .with_context("expected", expected)
        .with_context("actual", actual)
    }

    pub(crate) fn preamble(fault: PreambleFault, expected: impl Into<String>, actual: u8) -> Self {
        Self::new(
            ErrorKind::MalformedPreamble(fault),
            format!("{} -> {}, NOT: {actual}", fault, expected.into()),
        )
        .with_context("actual", actual)
    }

    pub(crate) fn deserial(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedDeserializeData, message)
    }

    pub(crate) fn insufficient_data(tag: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::InsufficientData,
            format!("insufficient data while reading {tag}"),
        )
    }

    pub(crate) fn buffer_too_small(required: usize, actual: usize) -> Self {
        Self::new(
            ErrorKind::BufferTooSmall,
            format!("buffer must hold at least {required} bytes, got {actual}"),
        )
        .with_context("required", required)
        .with_context("actual", actual)
    }

    pub(crate) fn read_only(operation: &'static str) -> Self {
        Self::new(ErrorKind::ReadOnly, "sketch is read only").with_context("operation", operation)
    }

    pub(crate) fn reallocation_failed(required: usize, src: Error) -> Self {
        Self::new(
            ErrorKind::ReallocationFailed,
            format!("memory request for {required} bytes failed"),
        )
        .with_context("required", required)
        .set_source(src)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // If alternate has been specified, we will print like Debug.
        if f.alternate() {
            let mut de = f.debug_struct("Error");
            de.field("kind", &self.kind);
            de.field("message", &self.message);
            de.field("context", &self.context);
            de.field("source", &self.source);
            return de.finish();
        }

        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }
        writeln!(f)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "Context:")?;
            for (k, v) in self.context.iter() {
                writeln!(f, "   {k}: {v}")?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "Source:")?;
            writeln!(f, "   {source:#}")?;
        }

        Ok(())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.context.is_empty() {
            write!(f, ", context: {{ ")?;
            write!(
                f,
                "{}",
                self.context
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|v| v.as_ref())
    }
}
