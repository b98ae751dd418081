use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::AbortHandle;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

/// Called when a disconnected player's grace period runs out.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait ForfeitHandler: Send + Sync {
    async fn on_grace_expired(&self, room_id: &str, user_id: &str, epoch: u64);
}

type TimerKey = (String, String);

struct Timer {
    token: u64,
    handle: AbortHandle,
}

/// Process-local table of grace timers keyed by `(room_id, user_id)`.
/// At most one timer per key; arming again replaces the previous one.
pub struct ReconnectionSupervisor {
    grace: Duration,
    timers: Arc<Mutex<HashMap<TimerKey, Timer>>>,
    next_token: AtomicU64,
}

fn lock(timers: &Mutex<HashMap<TimerKey, Timer>>) -> MutexGuard<'_, HashMap<TimerKey, Timer>> {
    timers.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ReconnectionSupervisor {
    pub fn new(grace: Duration) -> Self {
        ReconnectionSupervisor {
            grace,
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_token: AtomicU64::new(1),
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Starts the grace period for a player. When it elapses without a `cancel`,
    /// `handler` is told once, with the epoch the timer was armed for.
    pub fn arm(
        &self,
        room_id: &str,
        user_id: &str,
        epoch: u64,
        handler: Arc<dyn ForfeitHandler>,
    ) {
        let key: TimerKey = (room_id.to_string(), user_id.to_string());
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        let timers = self.timers.clone();
        let grace = self.grace;
        let task_key = key.clone();

        // Hold the table while spawning so the task cannot look for its entry before it exists.
        let mut table = lock(&self.timers);
        let task = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let still_armed = {
                let mut table = lock(&timers);
                match table.get(&task_key) {
                    Some(timer) if timer.token == token => {
                        table.remove(&task_key);
                        true
                    }
                    _ => false,
                }
            };
            if still_armed {
                info!(
                    "Grace period expired for user {} in room {}",
                    task_key.1, task_key.0
                );
                handler
                    .on_grace_expired(&task_key.0, &task_key.1, epoch)
                    .await;
            }
        });

        if let Some(previous) = table.insert(
            key,
            Timer {
                token,
                handle: task.abort_handle(),
            },
        ) {
            previous.handle.abort();
        }
        debug!(
            "Armed {:?} grace timer for user {} in room {} (epoch {})",
            grace, user_id, room_id, epoch
        );
    }

    /// Stops a pending timer. Returns whether one was pending.
    pub fn cancel(&self, room_id: &str, user_id: &str) -> bool {
        let key: TimerKey = (room_id.to_string(), user_id.to_string());
        match lock(&self.timers).remove(&key) {
            Some(timer) => {
                timer.handle.abort();
                debug!("Cancelled grace timer for user {} in room {}", user_id, room_id);
                true
            }
            None => false,
        }
    }

    pub fn cancel_room(&self, room_id: &str) {
        lock(&self.timers).retain(|(room, _), timer| {
            if room == room_id {
                timer.handle.abort();
                false
            } else {
                true
            }
        });
    }

    pub fn is_armed(&self, room_id: &str, user_id: &str) -> bool {
        lock(&self.timers).contains_key(&(room_id.to_string(), user_id.to_string()))
    }

    pub fn armed_count(&self) -> usize {
        lock(&self.timers).len()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn expecting_forfeits(times: usize) -> Arc<dyn ForfeitHandler> {
        let mut handler = MockForfeitHandler::new();
        handler
            .expect_on_grace_expired()
            .with(eq("room-1"), eq("alice"), eq(3u64))
            .times(times)
            .returning(|_, _, _| Box::pin(async {}));
        Arc::new(handler)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once_after_grace() {
        let supervisor = ReconnectionSupervisor::new(Duration::from_secs(30));
        supervisor.arm("room-1", "alice", 3, expecting_forfeits(1));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(supervisor.is_armed("room-1", "alice"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!supervisor.is_armed("room-1", "alice"));
        assert_eq!(supervisor.armed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let supervisor = ReconnectionSupervisor::new(Duration::from_secs(30));
        supervisor.arm("room-1", "alice", 3, expecting_forfeits(0));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(supervisor.cancel("room-1", "alice"));
        assert!(!supervisor.cancel("room-1", "alice"));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(supervisor.armed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_replaces_previous_timer() {
        let supervisor = ReconnectionSupervisor::new(Duration::from_secs(30));
        let mut first = MockForfeitHandler::new();
        first.expect_on_grace_expired().times(0);
        supervisor.arm("room-1", "alice", 2, Arc::new(first));

        tokio::time::sleep(Duration::from_secs(20)).await;
        supervisor.arm("room-1", "alice", 3, expecting_forfeits(1));

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(supervisor.is_armed("room-1", "alice"));
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!supervisor.is_armed("room-1", "alice"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_room_stops_every_player() {
        let supervisor = ReconnectionSupervisor::new(Duration::from_secs(30));
        let mut handler = MockForfeitHandler::new();
        handler.expect_on_grace_expired().times(0);
        let handler: Arc<dyn ForfeitHandler> = Arc::new(handler);
        supervisor.arm("room-1", "alice", 1, handler.clone());
        supervisor.arm("room-1", "bob", 1, handler.clone());
        supervisor.arm("room-2", "carol", 1, expecting_other_room());

        supervisor.cancel_room("room-1");

        assert_eq!(supervisor.armed_count(), 1);
        assert!(supervisor.is_armed("room-2", "carol"));
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(supervisor.armed_count(), 0);
    }

    fn expecting_other_room() -> Arc<dyn ForfeitHandler> {
        let mut handler = MockForfeitHandler::new();
        handler
            .expect_on_grace_expired()
            .with(eq("room-2"), eq("carol"), eq(1u64))
            .times(1)
            .returning(|_, _, _| Box::pin(async {}));
        Arc::new(handler)
    }
}
