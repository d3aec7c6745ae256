// Lease heartbeat and directive check between long-running steps
use crate::error::{CoordError, Result};
use crate::storage::{DirectiveStore, LeaseManager};

/// Checked between the steps of any loop that can outlast a lease: every
/// extraction, every jump hop, every hauler poll.
#[derive(Clone)]
pub struct KeepAlive {
    leases: LeaseManager,
    directives: DirectiveStore,
    directive: String,
}

impl KeepAlive {
    pub fn new(leases: LeaseManager, directives: DirectiveStore, directive: impl Into<String>) -> Self {
        Self { leases, directives, directive: directive.into() }
    }

    /// Refresh the lease on `agent` and re-read the directive. False when
    /// either says to stop.
    pub async fn check(&self, agent: &str) -> Result<bool> {
        if !self.leases.heartbeat(agent).await? {
            return Ok(false);
        }
        self.directives.is_active(&self.directive).await
    }

    /// Like `check`, but stopping is an `Interrupted` error so it unwinds
    /// through nested operations.
    pub async fn ensure(&self, agent: &str) -> Result<()> {
        if self.check(agent).await? {
            Ok(())
        } else {
            Err(CoordError::Interrupted(agent.to_string()))
        }
    }
}
