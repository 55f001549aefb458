//! PEP 508 dependency specifiers
//!
//! Handles:
//! - Requirement strings as found in `Requires-Dist` metadata
//! - Environment markers and their evaluation against an interpreter
//! - The subset of PEP 440 version ordering that marker comparisons need

mod marker;
mod requirement;
mod version;

pub use marker::{MarkerEnvironment, MarkerError, MarkerEvaluator, MarkerTree, parse_marker};
pub use requirement::{Requirement, RequirementError};
