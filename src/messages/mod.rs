//! Conversation turn and tool catalog types.
//!
//! These are the shapes shared between the execution loop, the
//! conversation memory and the reasoning service.

mod types;

pub use types::*;
