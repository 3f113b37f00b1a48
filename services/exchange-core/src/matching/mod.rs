//! Matching predicates
//!
//! Price compatibility rules used by the match pass in `engine`.

pub mod crossing;
