//! Per-run identifiers.
//!
//! A run's tracing span and its [`RunReport`](crate::agent::RunReport) carry
//! the same `RunId`, e.g. `run_01h455vb4pex5vsknk084sn02q`, so a report can be
//! matched to its log lines.

use mti::prelude::*;
use std::fmt;

/// TypeID with prefix `run`, backed by a UUIDv7 so ids sort by start time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(MagicTypeId);

impl RunId {
    const PREFIX: &'static str = "run";

    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
