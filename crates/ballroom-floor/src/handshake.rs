//! Per-role handshake: "a partner for your role is now available".

use crate::signal::{Signal, WaitError};
use ballroom_core::{BallroomError, PerRole, Result, Role};
use std::time::Duration;

/// One signal per role used to wake a single queued dancer.
///
/// The dancer who finds a partner waiting signals the partner's role and
/// never waits on it; the dancer who queued waits on its own role.
#[derive(Debug, Default)]
pub struct HandshakeChannel {
    slots: PerRole<Signal>,
}

impl HandshakeChannel {
    /// Create both channels empty
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake one queued dancer of `role`.
    ///
    /// A second signal before the first is consumed means a match was made
    /// while another match still held the floor.
    pub fn signal(&self, role: Role) -> Result<()> {
        let slot = self.slots.get(role);
        if slot.pending() > 0 {
            return Err(BallroomError::invariant(format!(
                "handshake for {role} signalled while a previous signal is unconsumed"
            )));
        }
        slot.signal();
        Ok(())
    }

    /// Wait to be matched as `role`.
    pub async fn wait(&self, role: Role, timeout: Duration) -> std::result::Result<(), WaitError> {
        self.slots.get(role).wait(timeout).await
    }

    /// Dismiss every queued dancer.
    pub fn close(&self) {
        for role in Role::ALL {
            self.slots.get(role).close();
        }
    }

    /// Unconsumed signals per role
    pub fn pending(&self) -> PerRole<usize> {
        PerRole::from_fn(|role| self.slots.get(role).pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_signal_wakes_only_that_role() {
        let channel = Arc::new(HandshakeChannel::new());
        let leader = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.wait(Role::Leader, Duration::from_secs(1)).await })
        };
        let follower = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.wait(Role::Follower, Duration::from_secs(1)).await })
        };
        tokio::task::yield_now().await;

        channel.signal(Role::Leader).unwrap();
        assert_eq!(leader.await.unwrap(), Ok(()));
        assert_eq!(follower.await.unwrap(), Err(WaitError::Timeout));
    }

    #[test]
    fn test_double_signal_is_violation() {
        let channel = HandshakeChannel::new();
        channel.signal(Role::Follower).unwrap();
        assert_eq!(channel.pending(), PerRole::new(0, 1));

        let err = channel.signal(Role::Follower).unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(channel.pending(), PerRole::new(0, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_dismisses_both_roles() {
        let channel = HandshakeChannel::new();
        channel.close();
        for role in Role::ALL {
            assert_eq!(
                channel.wait(role, Duration::from_secs(1)).await,
                Err(WaitError::Closed)
            );
        }
    }
}
