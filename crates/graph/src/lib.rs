//! Job dependency graph and cycle detection.
//!
//! Edges run from the depended-upon job to its dependent, so a traversal walks
//! forward along "must complete before". Every cycle is reported as a walkable
//! [`CyclePath`](jobmig_core::CyclePath).

pub mod dependency;

pub use dependency::{assert_acyclic, detect_cycles, DependencyGraph};
