pub mod cli;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod targets;
pub mod tasks;
pub mod types;
pub mod utils;

#[cfg(test)]
pub mod tests;

// Re-export commonly used item
pub use error::{IndexerError, IndexerResult};
