//! Cooperative pause/resume/cancel gate
//!
//! The batch job checks the gate between test cases. A running assertion is
//! never interrupted.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GateState {
    #[default]
    Running,
    Paused,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("test job cancelled")]
pub struct Cancelled;

#[derive(Debug)]
pub struct PauseGate {
    state: watch::Sender<GateState>,
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseGate {
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(GateState::Running);
        Self { state }
    }

    #[must_use]
    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    /// Returns false unless the gate was running
    pub fn pause(&self) -> bool {
        self.transition(GateState::Running, GateState::Paused)
    }

    /// Returns false unless the gate was paused
    pub fn resume(&self) -> bool {
        self.transition(GateState::Paused, GateState::Running)
    }

    pub fn cancel(&self) {
        self.state.send_replace(GateState::Cancelled);
    }

    /// Re-arm the gate for a new run
    pub fn reset(&self) {
        self.state.send_replace(GateState::Running);
    }

    fn transition(&self, from: GateState, to: GateState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Wait while paused. Fails once the gate is cancelled.
    pub async fn checkpoint(&self) -> Result<(), Cancelled> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|state| *state != GateState::Paused)
            .await
            .map(|state| *state)
            .map_err(|_| Cancelled)?;

        match state {
            GateState::Cancelled => Err(Cancelled),
            GateState::Running | GateState::Paused => Ok(()),
        }
    }

    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == GateState::Cancelled).await;
    }

    /// Sleep for `duration` unless cancelled first
    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        if duration.is_zero() {
            return self.checkpoint_cancelled();
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => Ok(()),
            () = self.cancelled() => Err(Cancelled),
        }
    }

    fn checkpoint_cancelled(&self) -> Result<(), Cancelled> {
        match self.state() {
            GateState::Cancelled => Err(Cancelled),
            GateState::Running | GateState::Paused => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_transitions() {
        let gate = PauseGate::new();
        assert!(!gate.resume());
        assert!(gate.pause());
        assert!(!gate.pause());
        assert_eq!(gate.state(), GateState::Paused);
        assert!(gate.resume());

        gate.cancel();
        assert!(!gate.pause());
        gate.reset();
        assert_eq!(gate.state(), GateState::Running);
    }

    #[tokio::test]
    async fn test_checkpoint_waits_for_resume() {
        let gate = Arc::new(PauseGate::new());
        gate.pause();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.checkpoint().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        gate.resume();
        assert_eq!(waiter.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_cancel_releases_paused_checkpoint() {
        let gate = Arc::new(PauseGate::new());
        gate.pause();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.checkpoint().await })
        };
        gate.cancel();
        assert_eq!(waiter.await.unwrap(), Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_stops_on_cancel() {
        let gate = Arc::new(PauseGate::new());
        let sleeper = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.sleep(Duration::from_secs(3600)).await })
        };
        tokio::task::yield_now().await;
        gate.cancel();
        assert_eq!(sleeper.await.unwrap(), Err(Cancelled));
    }
}
