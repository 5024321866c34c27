pub mod aggregate;
pub mod constant;
pub mod error;
pub mod event;
pub mod params;
pub mod report;
pub mod sequence;
pub mod syncable;

/// Ordinal position of a block in the chain; the unit of work of the pipeline.
pub type Height = u64;

/// Identifier of a declared index version (see [`crate::targets`]).
pub type VersionId = u64;

/// Identifier of a declared target (a named task set).
pub type TargetId = u64;
