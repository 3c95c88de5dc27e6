//! # Identifiers
//!
//! Steps and components are addressed by opaque string ids that never change
//! after creation. Fresh ids come from an [`IdSource`] so commands stay
//! deterministic under test while production code uses random UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a step (one page of the funnel)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

/// Identifier of a component placed on a step
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(StepId);
string_id!(ComponentId);

/// Source of fresh, globally unique ids
pub trait IdSource: Send {
    fn next_step_id(&mut self) -> StepId;

    fn next_component_id(&mut self) -> ComponentId;
}

/// Random v4 UUIDs (default for interactive sessions)
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_step_id(&mut self) -> StepId {
        StepId(format!("step-{}", uuid::Uuid::new_v4()))
    }

    fn next_component_id(&mut self) -> ComponentId {
        ComponentId(format!("cmp-{}", uuid::Uuid::new_v4()))
    }
}

/// Deterministic counter ids (`step-1`, `cmp-1`, ...)
///
/// Only unique within documents built entirely from this source; use
/// [`UuidIds`] for documents loaded from storage.
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    next_step: u64,
    next_component: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIds {
    fn next_step_id(&mut self) -> StepId {
        self.next_step += 1;
        StepId(format!("step-{}", self.next_step))
    }

    fn next_component_id(&mut self) -> ComponentId {
        self.next_component += 1;
        ComponentId(format!("cmp-{}", self.next_component))
    }
}
