// Per-agent task lifecycle
use std::fmt;
use tracing::debug;

use crate::error::{CoordError, Result};

/// What a worker is currently doing with one leased agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Idle,
    Leased,
    Navigating,
    Orbiting,
    Docked,
    Surveying,
    Extracting,
    Transferring,
    Selling,
    Released,
    Faulted,
}

impl TaskState {
    /// Valid next states from the current state.
    pub fn valid_transitions(self) -> &'static [TaskState] {
        use TaskState::*;
        match self {
            Idle => &[Leased],
            Leased => &[Navigating, Orbiting, Docked, Released, Faulted],
            Navigating => &[Orbiting, Docked, Released, Faulted],
            Orbiting => &[Navigating, Docked, Surveying, Extracting, Transferring, Released, Faulted],
            Docked => &[Navigating, Orbiting, Selling, Released, Faulted],
            Surveying => &[Orbiting, Extracting, Released, Faulted],
            Extracting => &[Navigating, Orbiting, Docked, Surveying, Transferring, Selling, Released, Faulted],
            Transferring => &[Navigating, Orbiting, Docked, Extracting, Selling, Released, Faulted],
            Selling => &[Navigating, Orbiting, Docked, Released, Faulted],
            Released => &[Idle],
            Faulted => &[Released],
        }
    }

    pub fn can_transition_to(self, next: TaskState) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// States in which the worker is actively driving the agent.
    pub fn is_working(self) -> bool {
        !matches!(self, TaskState::Idle | TaskState::Released | TaskState::Faulted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Leased => "leased",
            Self::Navigating => "navigating",
            Self::Orbiting => "orbiting",
            Self::Docked => "docked",
            Self::Surveying => "surveying",
            Self::Extracting => "extracting",
            Self::Transferring => "transferring",
            Self::Selling => "selling",
            Self::Released => "released",
            Self::Faulted => "faulted",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one agent's task state and rejects illegal moves.
#[derive(Debug, Clone)]
pub struct AgentTask {
    agent: String,
    state: TaskState,
}

impl AgentTask {
    pub fn new(agent: impl Into<String>) -> Self {
        Self { agent: agent.into(), state: TaskState::Idle }
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Move to `next`. Staying in the current state is always allowed.
    pub fn advance(&mut self, next: TaskState) -> Result<()> {
        if next == self.state {
            return Ok(());
        }
        if !self.state.can_transition_to(next) {
            return Err(CoordError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!(agent = %self.agent, "🔁 {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Record a failure. Allowed from any working state.
    pub fn fault(&mut self) {
        if self.state.is_working() {
            self.state = TaskState::Faulted;
        }
    }

    /// Wind down to `Released`, passing through whatever the current state
    /// requires.
    pub fn release(&mut self) -> Result<()> {
        match self.state {
            TaskState::Released => Ok(()),
            TaskState::Idle => Err(CoordError::InvalidTransition {
                from: self.state.to_string(),
                to: TaskState::Released.to_string(),
            }),
            _ => self.advance(TaskState::Released),
        }
    }
}
