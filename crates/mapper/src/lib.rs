//! Source reconciliation and target-format mapping.
//!
//! - [`reconcile`]: merge two job sources under a primary-wins policy,
//!   failing on contradictions instead of overwriting
//! - [`target`]: cycle-gated transformation into [`TargetJob`](jobmig_core::TargetJob)s

pub mod reconcile;
pub mod target;

pub use reconcile::reconcile;
pub use target::{to_target, to_target_with, TargetOptions};
