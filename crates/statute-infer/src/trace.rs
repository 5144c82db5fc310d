//! Unification trace.
//!
//! Recording is opt-in through [`crate::CheckOptions::trace_unification`];
//! a store that does not record pays nothing beyond a flag test. Steps
//! serialize to JSON for tooling that wants to replay the checker's
//! reasoning.

use serde::Serialize;

/// A single step in a unification trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnifyStep {
    pub step: usize,
    pub action: UnifyAction,
    pub left: String,
    pub right: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifyAction {
    /// Both sides already in the same class.
    Identity,
    /// Compound types recursed into component-wise.
    Decompose,
    /// A metavariable class merged into a concrete one.
    Absorb,
    /// The metavariable occurs inside the other side.
    OccursCheck,
    /// Shapes or names differ.
    Error,
}
