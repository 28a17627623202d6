//! Lifecycle state machine
//!
//! Linear, no backward transitions: `Pending -> Locking -> Fetching ->
//! Preparing -> Building -> Packaging -> {Succeeded | Failed}`. The
//! transition function is pure so tests can drive failure injection at any
//! stage.

use std::fmt;

/// Per-component lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Pending,
    Locking,
    Fetching,
    Preparing,
    Building,
    Packaging,
    Succeeded,
    Failed,
}

/// Result of executing one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Ok,
    Failed,
}

impl LifecycleState {
    /// Apply one stage outcome
    ///
    /// A failure at any active stage transitions directly to `Failed`;
    /// terminal states absorb every outcome.
    #[must_use]
    pub fn advance(self, outcome: StageOutcome) -> Self {
        if self.is_terminal() {
            return self;
        }
        match outcome {
            StageOutcome::Failed => Self::Failed,
            StageOutcome::Ok => match self {
                Self::Pending => Self::Locking,
                Self::Locking => Self::Fetching,
                Self::Fetching => Self::Preparing,
                Self::Preparing => Self::Building,
                Self::Building => Self::Packaging,
                Self::Packaging => Self::Succeeded,
                Self::Succeeded | Self::Failed => self,
            },
        }
    }

    /// Whether the state admits no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Locking => "locking",
            Self::Fetching => "fetching",
            Self::Preparing => "preparing",
            Self::Building => "building",
            Self::Packaging => "packaging",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}
