// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Graph Node Lifecycle
//!
//! # States
//!
//! - Pending: registered, waiting for its dependencies
//! - Submitted: dependencies resolved, request issued
//! - Created: request acknowledged (terminal)
//! - Failed: request rejected (terminal)
//! - Skipped: a dependency failed, request never issued (terminal)
//!
//! # Inputs
//!
//! - Submit: Pending → Submitted
//! - Succeed: Submitted → Created
//! - Fail: Submitted → Failed
//! - DependencyFailed: Pending → Skipped

use serde::Serialize;
use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Lifecycle state of one graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Submitted,
    Created,
    Failed,
    Skipped,
}

impl NodeStatus {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Created | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Created => "created",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// Lifecycle input (FSM input)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    Submit,
    Succeed,
    Fail,
    DependencyFailed,
}

impl StateMachine for NodeStatus {
    type Input = NodeEvent;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use NodeEvent::*;
        use NodeStatus::*;

        let next = match (self, input) {
            (Pending, Submit) => Submitted,
            (Pending, DependencyFailed) => Skipped,
            (Submitted, Succeed) => Created,
            (Submitted, Fail) => Failed,
            _ => {
                return Err(TransitionError::InvalidTransition {
                    from: self.to_string(),
                    input: format!("{:?}", input),
                })
            }
        };
        Ok((next, ()))
    }
}
