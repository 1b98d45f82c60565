/// Session lifecycle state machine
///
/// Observable states are STOPPED and RUNNING; Starting/Stopping are the
/// transitional states the orchestrator moves through while opening the
/// source and joining the loop thread. Only the orchestrator mutates state;
/// the UI reads a [`SessionStatus`] snapshot.
use std::time::Instant;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionState {
    /// No loop thread; source released
    Stopped,

    /// start() is loading detectors and opening the source
    Starting,

    /// Tick loop is live
    Running { since: Instant },

    /// Stop requested; loop draining
    Stopping,
}

impl SessionState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, SessionState::Stopped)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running { .. })
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Stopping)
    }

    /// Time since the loop went live, if it is
    pub fn running_duration(&self) -> Option<std::time::Duration> {
        match self {
            SessionState::Running { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SessionState::Stopped => "Stopped",
            SessionState::Starting => "Starting...",
            SessionState::Running { .. } => "Running",
            SessionState::Stopping => "Stopping...",
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Stopped
    }
}

/// Rejected state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    AlreadyRunning,
    AlreadyStopped,
    InTransition,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::AlreadyRunning => write!(f, "Session is already running"),
            TransitionError::AlreadyStopped => write!(f, "Session is already stopped"),
            TransitionError::InTransition => {
                write!(f, "Cannot perform action during state transition")
            }
        }
    }
}

impl std::error::Error for TransitionError {}

/// State machine guarding the session lifecycle transitions
pub struct SessionStateMachine {
    state: SessionState,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::Stopped,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Stopped → Starting
    pub fn start(&mut self) -> Result<(), TransitionError> {
        match self.state {
            SessionState::Stopped => {
                self.state = SessionState::Starting;
                Ok(())
            }
            SessionState::Running { .. } => Err(TransitionError::AlreadyRunning),
            _ => Err(TransitionError::InTransition),
        }
    }

    /// Starting → Running
    pub fn mark_running(&mut self) -> Result<(), TransitionError> {
        match self.state {
            SessionState::Starting => {
                self.state = SessionState::Running {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(TransitionError::InTransition),
        }
    }

    /// Running → Stopping
    pub fn stop(&mut self) -> Result<(), TransitionError> {
        match self.state {
            SessionState::Running { .. } => {
                self.state = SessionState::Stopping;
                Ok(())
            }
            SessionState::Stopped => Err(TransitionError::AlreadyStopped),
            _ => Err(TransitionError::InTransition),
        }
    }

    /// Stopping → Stopped
    pub fn mark_stopped(&mut self) -> Result<(), TransitionError> {
        match self.state {
            SessionState::Stopping => {
                self.state = SessionState::Stopped;
                Ok(())
            }
            _ => Err(TransitionError::InTransition),
        }
    }

    /// Unconditional return to Stopped (start failure, loop error exit)
    pub fn force_stop(&mut self) {
        self.state = SessionState::Stopped;
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a session for the UI layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionStatus {
    pub state: SessionState,
    pub frames_processed: u64,
    pub alerts_fired: u64,
    pub alerts_failed: u64,
}
