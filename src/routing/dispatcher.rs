//! Waiter registry and dispatcher
//!
//! Every waiter lives in a single registry behind one lock. Registration,
//! matching, expiry and cancellation all remove entries under that lock, and
//! whoever removes an entry is the only party allowed to resolve it. That is
//! what makes resolution exactly-once: a match, a timeout and a cancel can
//! race freely, but only one of them finds the entry.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};

use super::waiter::{EventKind, Predicate, Scope, WaitOutcome, WaitSpec, WaiterId, WaiterInfo};
use crate::events::InboundEvent;
use crate::session::SessionKey;

struct WaiterEntry {
    scope: Scope,
    kind: EventKind,
    session: Option<SessionKey>,
    predicate: Predicate,
    created_at: chrono::DateTime<Utc>,
    deadline: Instant,
    slot: oneshot::Sender<WaitOutcome>,
}

impl WaiterEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline > now && !self.slot.is_closed()
    }

    fn accepts(&self, event: &InboundEvent) -> bool {
        let (Some(channel_id), Some(user_id)) = (event.channel_id(), event.user_id()) else {
            return false;
        };
        self.scope.admits(channel_id, user_id) && self.kind.admits(event) && (self.predicate)(event)
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    waiters: BTreeMap<WaiterId, WaiterEntry>,
}

/// Routes inbound events to the first matching live waiter
#[derive(Clone, Default)]
pub struct Dispatcher {
    registry: Arc<Mutex<Registry>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter and return the handle that resolves it
    pub fn register(&self, spec: WaitSpec) -> WaiterHandle {
        let (slot, rx) = oneshot::channel();
        let deadline = spec.deadline;

        let id = {
            let mut registry = self.registry.lock();
            registry.next_id += 1;
            let id = WaiterId(registry.next_id);
            let previous = registry.waiters.insert(
                id,
                WaiterEntry {
                    scope: spec.scope,
                    kind: spec.kind,
                    session: spec.session,
                    predicate: spec.predicate,
                    created_at: Utc::now(),
                    deadline,
                    slot,
                },
            );
            debug_assert!(previous.is_none(), "waiter id {id} reused");
            id
        };

        trace!(waiter = %id, channel = %spec.scope.channel_id, "registered waiter");
        WaiterHandle {
            id,
            deadline,
            rx,
            dispatcher: self.clone(),
            settled: false,
        }
    }

    /// Cancel a waiter before it matches.
    ///
    /// Returns `false` when the waiter was already resolved, in which case
    /// nothing happens.
    pub fn cancel(&self, id: WaiterId) -> bool {
        let mut registry = self.registry.lock();
        match registry.waiters.remove(&id) {
            Some(entry) => {
                let _ = entry.slot.send(WaitOutcome::Cancelled);
                debug!(waiter = %id, "cancelled waiter");
                true
            }
            None => false,
        }
    }

    /// Cancel every live waiter owned by one interaction
    pub fn cancel_session(&self, session: SessionKey) -> usize {
        let mut registry = self.registry.lock();
        let ids: Vec<WaiterId> = registry
            .waiters
            .iter()
            .filter(|(_, entry)| entry.session == Some(session))
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Some(entry) = registry.waiters.remove(id) {
                let _ = entry.slot.send(WaitOutcome::Cancelled);
            }
        }
        if !ids.is_empty() {
            debug!(session = %session, count = ids.len(), "cancelled session waiters");
        }
        ids.len()
    }

    /// Cancel everything, e.g. on shutdown
    pub fn cancel_all(&self) -> usize {
        let drained = std::mem::take(&mut self.registry.lock().waiters);
        let count = drained.len();
        for entry in drained.into_values() {
            let _ = entry.slot.send(WaitOutcome::Cancelled);
        }
        count
    }

    /// Deliver an event to the oldest live waiter that accepts it.
    ///
    /// Waiters that do not accept the event stay registered. Returns the
    /// waiter that received it; `None` means the event is dropped here.
    pub fn dispatch(&self, event: &InboundEvent) -> Option<WaiterId> {
        let now = Instant::now();
        let mut registry = self.registry.lock();

        let id = registry
            .waiters
            .iter()
            .find(|(_, entry)| entry.is_live(now) && entry.accepts(event))
            .map(|(id, _)| *id)?;

        let entry = registry.waiters.remove(&id)?;
        let _ = entry.slot.send(WaitOutcome::Matched(event.clone()));
        debug!(waiter = %id, "delivered event");
        Some(id)
    }

    /// Resolve every waiter whose deadline has passed. Returns how many expired.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut registry = self.registry.lock();
        let expired: Vec<WaiterId> = registry
            .waiters
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            if let Some(entry) = registry.waiters.remove(id) {
                let _ = entry.slot.send(WaitOutcome::TimedOut);
            }
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "swept expired waiters");
        }
        expired.len()
    }

    /// Sweep periodically until every other handle to this dispatcher is gone
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let registry: Weak<Mutex<Registry>> = Arc::downgrade(&self.registry);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                Dispatcher { registry }.sweep_expired();
            }
            trace!("sweeper stopped");
        })
    }

    pub fn live_count(&self) -> usize {
        self.registry.lock().waiters.len()
    }

    pub fn is_live(&self, id: WaiterId) -> bool {
        self.registry.lock().waiters.contains_key(&id)
    }

    /// Snapshot of live waiters in registration order
    pub fn live_waiters(&self) -> Vec<WaiterInfo> {
        let now = Instant::now();
        self.registry
            .lock()
            .waiters
            .iter()
            .map(|(id, entry)| WaiterInfo {
                id: *id,
                scope: entry.scope,
                kind: entry.kind,
                session: entry.session,
                created_at: entry.created_at,
                remaining: entry.deadline.saturating_duration_since(now),
            })
            .collect()
    }

    fn take(&self, id: WaiterId) -> bool {
        self.registry.lock().waiters.remove(&id).is_some()
    }
}

/// The suspended side of a waiter
///
/// Dropping a handle without awaiting it cancels the waiter.
pub struct WaiterHandle {
    id: WaiterId,
    deadline: Instant,
    rx: oneshot::Receiver<WaitOutcome>,
    dispatcher: Dispatcher,
    settled: bool,
}

impl WaiterHandle {
    pub fn id(&self) -> WaiterId {
        self.id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Cancel through the dispatcher; a later `wait` yields `Cancelled`
    pub fn cancel(&self) -> bool {
        self.dispatcher.cancel(self.id)
    }

    /// Suspend until the waiter is matched, expires or is cancelled
    pub async fn wait(mut self) -> WaitOutcome {
        let outcome = match timeout_at(self.deadline, &mut self.rx).await {
            Ok(Ok(outcome)) => outcome,
            // registry dropped with the entry still inside
            Ok(Err(_)) => WaitOutcome::Cancelled,
            Err(_) => self.expire(),
        };
        self.settled = true;
        outcome
    }

    fn expire(&mut self) -> WaitOutcome {
        if self.dispatcher.take(self.id) {
            debug!(waiter = %self.id, "waiter timed out");
            return WaitOutcome::TimedOut;
        }
        // Someone else removed the entry first; they filled the slot while
        // holding the registry lock, so the value is already there.
        self.rx.try_recv().unwrap_or(WaitOutcome::TimedOut)
    }
}

impl Drop for WaiterHandle {
    fn drop(&mut self) {
        if !self.settled && self.dispatcher.take(self.id) {
            trace!(waiter = %self.id, "handle dropped, waiter removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MessageEvent;
    use crate::value_objects::{ChannelId, MessageId, UserId};
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn message(channel: u64, user: u64, content: &str) -> InboundEvent {
        InboundEvent::Message(MessageEvent {
            channel_id: ChannelId(channel),
            author_id: UserId(user),
            message_id: MessageId(99),
            content: content.to_string(),
        })
    }

    fn in_minutes(minutes: u64) -> Instant {
        Instant::now() + Duration::from_secs(minutes * 60)
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_until_matched() {
        let dispatcher = Dispatcher::new();
        let handle = dispatcher.register(WaitSpec::new(
            Scope::user(ChannelId(1), UserId(2)),
            in_minutes(15),
        ));

        let mut wait = task::spawn(handle.wait());
        assert_pending!(wait.poll());

        let event = message(1, 2, "hello");
        assert!(dispatcher.dispatch(&event).is_some());
        assert!(wait.is_woken());
        assert_ready_eq!(wait.poll(), WaitOutcome::Matched(event));
        assert_eq!(dispatcher.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_order_wins() {
        let dispatcher = Dispatcher::new();
        let scope = Scope::user(ChannelId(1), UserId(2));
        let first = dispatcher.register(WaitSpec::new(scope, in_minutes(1)).messages());
        let second = dispatcher.register(WaitSpec::new(scope, in_minutes(1)).messages());

        let delivered = dispatcher.dispatch(&message(1, 2, "x"));
        assert_eq!(delivered, Some(first.id()));
        assert!(dispatcher.is_live(second.id()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejecting_predicate_leaves_waiter_live() {
        let dispatcher = Dispatcher::new();
        let handle = dispatcher.register(
            WaitSpec::new(Scope::user(ChannelId(1), UserId(2)), in_minutes(1)).matching(|e| {
                e.as_message().is_some_and(|m| m.content == "yes")
            }),
        );

        assert_eq!(dispatcher.dispatch(&message(1, 2, "no")), None);
        assert_eq!(dispatcher.dispatch(&message(1, 3, "yes")), None);
        assert_eq!(dispatcher.dispatch(&message(1, 2, "yes")), Some(handle.id()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_waiter_never_matches() {
        let dispatcher = Dispatcher::new();
        let handle = dispatcher.register(WaitSpec::new(
            Scope::user(ChannelId(1), UserId(2)),
            in_minutes(1),
        ));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(dispatcher.dispatch(&message(1, 2, "late")), None);
        assert_eq!(handle.wait().await, WaitOutcome::TimedOut);
        assert_eq!(dispatcher.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_resolves_timeout_once() {
        let dispatcher = Dispatcher::new();
        let handle = dispatcher.register(WaitSpec::new(
            Scope::user(ChannelId(1), UserId(2)),
            in_minutes(1),
        ));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(dispatcher.sweep_expired(), 1);
        assert_eq!(dispatcher.sweep_expired(), 0);
        assert!(!dispatcher.cancel(handle.id()));
        assert_eq!(handle.wait().await, WaitOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let dispatcher = Dispatcher::new();
        let handle = dispatcher.register(WaitSpec::new(
            Scope::user(ChannelId(1), UserId(2)),
            in_minutes(1),
        ));

        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert_eq!(dispatcher.dispatch(&message(1, 2, "x")), None);
        assert_eq!(handle.wait().await, WaitOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_removes_waiter() {
        let dispatcher = Dispatcher::new();
        let handle = dispatcher.register(WaitSpec::new(
            Scope::user(ChannelId(1), UserId(2)),
            in_minutes(1),
        ));
        assert_eq!(dispatcher.live_count(), 1);
        drop(handle);
        assert_eq!(dispatcher.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_session_only_touches_owner() {
        let dispatcher = Dispatcher::new();
        let key = SessionKey::new();
        let scope = Scope::user(ChannelId(1), UserId(2));
        let owned = dispatcher.register(WaitSpec::new(scope, in_minutes(1)).owned_by(key));
        let other = dispatcher.register(WaitSpec::new(scope, in_minutes(1)).owned_by(SessionKey::new()));

        assert_eq!(dispatcher.cancel_session(key), 1);
        assert!(dispatcher.is_live(other.id()));
        assert_eq!(owned.wait().await, WaitOutcome::Cancelled);
    }
}
