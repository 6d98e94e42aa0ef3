//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Attribute-keyed bucketing with lazy promotion
//! - Partial digest refinement
//! - Full digest refinement
//! - Optional byte-exact comparison
//! - Priority-based choice of the retained copy
//!
//! The entry point is [`MatchIndex::classify`], called once per discovered
//! file from any number of threads.

pub mod bucket;
pub mod group;
pub mod index;
pub mod priority;

use std::path::PathBuf;

use serde::Serialize;

pub use bucket::{Bucket, Seed};
pub use group::CollisionGroup;
pub use index::{AttributeBucket, AttributeKey, HeadBucket, MatchIndex, MatchStats, MatchSummary};
pub use priority::PriorityOrder;

/// A confirmed duplicate pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Duplicate {
    /// The higher-priority copy, left in place
    pub retained: PathBuf,
    /// The lower-priority copy, to be relocated
    pub relocate: PathBuf,
}
