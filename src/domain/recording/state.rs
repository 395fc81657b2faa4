//! Recording cycle state machine

use std::fmt;
use thiserror::Error;

/// Recorder states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
    Stopping,
}

impl RecorderState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while {current_state}")]
pub struct InvalidStateTransition {
    pub current_state: RecorderState,
    pub action: String,
}

/// One recording cycle.
///
/// State machine:
///   IDLE -> RECORDING (begin)
///   RECORDING -> STOPPING (request_stop)
///   STOPPING -> IDLE (finish)
///   any -> IDLE (force_idle, after a failed stop)
#[derive(Debug, Default)]
pub struct RecordingCycle {
    state: RecorderState,
}

impl RecordingCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == RecorderState::Idle
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Transition from IDLE to RECORDING
    pub fn begin(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(RecorderState::Idle, RecorderState::Recording, "start recording")
    }

    /// Transition from RECORDING to STOPPING
    pub fn request_stop(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(RecorderState::Recording, RecorderState::Stopping, "stop recording")
    }

    /// Transition from STOPPING to IDLE
    pub fn finish(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(RecorderState::Stopping, RecorderState::Idle, "finish stopping")
    }

    /// Return to IDLE from any state
    pub fn force_idle(&mut self) {
        self.state = RecorderState::Idle;
    }

    fn transition(
        &mut self,
        from: RecorderState,
        to: RecorderState,
        action: &str,
    ) -> Result<(), InvalidStateTransition> {
        if self.state != from {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: action.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }
}
