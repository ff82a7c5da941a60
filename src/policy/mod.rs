//! Declarative dependency policy.
//!
//! `.quay-policy.yml` describes which sources, packages, and versions the
//! project accepts. The engine evaluates the resolved set and produces an
//! ordered report; the install pipeline aborts on errors before any side
//! effect.

pub mod config;
pub mod engine;
pub mod report;

pub use config::PolicyConfig;
pub use engine::evaluate;
pub use report::{PolicyReport, RuleSeverity, Violation};
