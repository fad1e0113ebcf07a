//! Identifier types.
//!
//! Identifiers are TypeIDs: a prefix naming the entity followed by a
//! time-ordered UUIDv7 suffix, e.g. `run_01h455vb4pex5vsknk084sn02q`.

mod run_id;

pub use run_id::RunId;
