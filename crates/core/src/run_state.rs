//! WES run states, backend job states, and the mapping between them.
//!
//! A run carries two layers of state: the persisted WES [`RunState`] and
//! the [`JobState`] reported by the asynchronous backend for its job
//! handle. [`reconcile_state`] folds the second into the first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

macro_rules! define_state_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire/storage label of this state.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(CoreError::Internal(format!(
                        "Unknown {} value '{other}'",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

define_state_enum! {
    /// GA4GH WES run state.
    RunState {
        Unknown = "UNKNOWN",
        Queued = "QUEUED",
        Initializing = "INITIALIZING",
        Running = "RUNNING",
        Paused = "PAUSED",
        Complete = "COMPLETE",
        ExecutorError = "EXECUTOR_ERROR",
        SystemError = "SYSTEM_ERROR",
        Canceling = "CANCELING",
        Canceled = "CANCELED",
    }
}

define_state_enum! {
    /// State of a job as reported by the execution backend.
    JobState {
        Pending = "pending",
        Started = "started",
        Success = "success",
        Failure = "failure",
        Retry = "retry",
        Revoked = "revoked",
    }
}

impl RunState {
    /// Terminal states are sticky: nothing overwrites them.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Complete | RunState::ExecutorError | RunState::SystemError | RunState::Canceled
        )
    }

    /// Whether the backend mapping may move a run out of this state.
    ///
    /// `CANCELING` is neither terminal nor reconcilable: only an explicit
    /// cancel moves it forward.
    pub fn is_reconcilable(self) -> bool {
        matches!(
            self,
            RunState::Unknown
                | RunState::Queued
                | RunState::Initializing
                | RunState::Running
                | RunState::Paused
        )
    }
}

impl JobState {
    /// The WES state a run takes when its job reports this state.
    pub fn to_run_state(self) -> RunState {
        match self {
            JobState::Pending => RunState::Queued,
            JobState::Started => RunState::Running,
            JobState::Success => RunState::Complete,
            JobState::Failure => RunState::ExecutorError,
            JobState::Retry => RunState::Queued,
            JobState::Revoked => RunState::Canceled,
        }
    }
}

/// Fold a backend-reported job state into the current run state.
///
/// Returns `current` untouched unless it is reconcilable.
pub fn reconcile_state(current: RunState, reported: JobState) -> RunState {
    if current.is_reconcilable() {
        reported.to_run_state()
    } else {
        current
    }
}
