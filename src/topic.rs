//! Topic handling module
//!
//! This module provides the topic filter type used by the routing rules:
//! parsing, load-time validation and matching of concrete topics against
//! wildcard patterns.

// Submodules
pub mod pattern;

#[cfg(test)]
mod pattern_tests;

// Re-export commonly used types for convenience
pub use pattern::{PatternSegment, TopicPattern, TopicPatternError};
