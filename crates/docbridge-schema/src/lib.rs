//! Schema registry used by the bridge to validate message payloads.
//!
//! Schemas are registered once, up front, and compiled on registration.
//! Validation reports every violation in evaluation order; callers that only
//! need pass/fail plus the first error use [`SchemaRegistry::first_violation`].

pub mod registry;
mod validator;
pub mod violation;

pub use registry::{SchemaError, SchemaRegistry, SchemaResult};
pub use violation::{Violation, ViolationKind};
