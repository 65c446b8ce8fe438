use std::sync::{Arc, Mutex};

/// Application lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Initializing,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl LifecycleState {
    /// Whether the application has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Stopped | LifecycleState::Failed)
    }
}

/// Simple lifecycle manager for the framework
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    state: Arc<Mutex<LifecycleState>>,
}

impl LifecycleManager {
    /// Create a new lifecycle manager
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LifecycleState::Created)),
        }
    }

    /// Current state
    pub fn state(&self) -> LifecycleState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(LifecycleState::Failed)
    }

    /// Check if the lifecycle manager is running
    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Move to a new state
    pub fn transition(&self, next: LifecycleState) {
        if let Ok(mut state) = self.state.lock() {
            tracing::debug!("Lifecycle transition: {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    /// Move to `next` only if the current state is `expected`
    ///
    /// Returns false when another caller already moved the state on.
    pub fn transition_from(&self, expected: LifecycleState, next: LifecycleState) -> bool {
        match self.state.lock() {
            Ok(mut state) if *state == expected => {
                tracing::debug!("Lifecycle transition: {:?} -> {:?}", *state, next);
                *state = next;
                true
            }
            _ => false,
        }
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let manager = LifecycleManager::new();
        assert_eq!(manager.state(), LifecycleState::Created);

        manager.transition(LifecycleState::Running);
        assert!(manager.is_running());

        assert!(manager.transition_from(LifecycleState::Running, LifecycleState::Stopping));
        assert!(!manager.transition_from(LifecycleState::Running, LifecycleState::Stopping));
        assert_eq!(manager.state(), LifecycleState::Stopping);
        assert!(!manager.state().is_terminal());

        manager.transition(LifecycleState::Stopped);
        assert!(manager.state().is_terminal());
    }
}
