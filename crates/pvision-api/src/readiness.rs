//! Model readiness tracking.
//!
//! The detector loads in the background at startup, so the server is
//! reachable before it can serve detections. Handlers consult this state
//! instead of probing the model directly; `/ready` reports it to
//! orchestrators.

use tokio::sync::RwLock;

/// Detector lifecycle, from process start to loaded (or failed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    /// Load not yet started
    Uninitialized,
    /// Load in progress
    Loading,
    /// Detector is installed and serving
    Ready,
    /// Load failed; the server stays up but detection endpoints refuse
    Failed(String),
}

impl ModelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::Uninitialized => "uninitialized",
            ModelState::Loading => "loading",
            ModelState::Ready => "ready",
            ModelState::Failed(_) => "failed",
        }
    }
}

/// Shared readiness flag, written once by the startup task.
#[derive(Debug)]
pub struct ReadinessState {
    state: RwLock<ModelState>,
}

impl ReadinessState {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ModelState::Uninitialized),
        }
    }

    pub async fn set_loading(&self) {
        *self.state.write().await = ModelState::Loading;
    }

    pub async fn set_ready(&self) {
        *self.state.write().await = ModelState::Ready;
    }

    pub async fn set_failed(&self, error: impl Into<String>) {
        *self.state.write().await = ModelState::Failed(error.into());
    }

    pub async fn state(&self) -> ModelState {
        self.state.read().await.clone()
    }

    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.read().await, ModelState::Ready)
    }
}

impl Default for ReadinessState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_startup_transitions() {
        let readiness = ReadinessState::new();
        assert_eq!(readiness.state().await, ModelState::Uninitialized);
        assert!(!readiness.is_ready().await);

        readiness.set_loading().await;
        assert_eq!(readiness.state().await.as_str(), "loading");

        readiness.set_ready().await;
        assert!(readiness.is_ready().await);
    }

    #[tokio::test]
    async fn test_failed_state_keeps_error() {
        let readiness = ReadinessState::new();
        readiness.set_loading().await;
        readiness.set_failed("model file missing").await;

        assert!(!readiness.is_ready().await);
        match readiness.state().await {
            ModelState::Failed(error) => assert_eq!(error, "model file missing"),
            other => panic!("expected failed state, got {:?}", other),
        }
    }
}
