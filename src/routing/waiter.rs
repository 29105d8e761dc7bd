//! Waiter types: what a suspended handler is waiting for

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use crate::events::InboundEvent;
use crate::session::SessionKey;
use crate::value_objects::{ChannelId, UserId};

/// Identifier of a registered waiter. Ordering follows registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaiterId(pub(crate) u64);

impl fmt::Display for WaiterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Channel a waiter listens in, optionally restricted to one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub channel_id: ChannelId,
    pub user_id: Option<UserId>,
}

impl Scope {
    /// Events from `user_id` in `channel_id` only
    pub fn user(channel_id: ChannelId, user_id: UserId) -> Self {
        Self {
            channel_id,
            user_id: Some(user_id),
        }
    }

    /// Events from anyone in `channel_id`
    pub fn channel(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            user_id: None,
        }
    }

    pub fn admits(&self, channel_id: ChannelId, user_id: UserId) -> bool {
        self.channel_id == channel_id && self.user_id.is_none_or(|u| u == user_id)
    }
}

/// Which event kinds a waiter considers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Message,
    Signal,
    Any,
}

impl EventKind {
    pub fn admits(self, event: &InboundEvent) -> bool {
        match (self, event) {
            (_, InboundEvent::Other) => false,
            (EventKind::Any, _) => true,
            (EventKind::Message, InboundEvent::Message(_)) => true,
            (EventKind::Signal, InboundEvent::Signal(_)) => true,
            _ => false,
        }
    }
}

/// How a waiter was resolved. Exactly one of these is produced per waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Matched(InboundEvent),
    TimedOut,
    Cancelled,
}

impl WaitOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, WaitOutcome::Matched(_))
    }

    pub fn into_event(self) -> Option<InboundEvent> {
        match self {
            WaitOutcome::Matched(event) => Some(event),
            _ => None,
        }
    }
}

/// Match predicate. Runs inside the registry's critical section, so it must
/// be a pure function of the event and must not touch the dispatcher.
pub type Predicate = Box<dyn Fn(&InboundEvent) -> bool + Send + Sync>;

/// Registration request for a waiter
pub struct WaitSpec {
    pub(crate) scope: Scope,
    pub(crate) kind: EventKind,
    pub(crate) deadline: Instant,
    pub(crate) session: Option<SessionKey>,
    pub(crate) predicate: Predicate,
}

impl WaitSpec {
    /// Accept any event in `scope` until `deadline`
    pub fn new(scope: Scope, deadline: Instant) -> Self {
        Self {
            scope,
            kind: EventKind::Any,
            deadline,
            session: None,
            predicate: Box::new(|_| true),
        }
    }

    /// Only consider new messages
    pub fn messages(mut self) -> Self {
        self.kind = EventKind::Message;
        self
    }

    /// Only consider reactions and component activations
    pub fn signals(mut self) -> Self {
        self.kind = EventKind::Signal;
        self
    }

    pub fn matching<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&InboundEvent) -> bool + Send + Sync + 'static,
    {
        self.predicate = Box::new(predicate);
        self
    }

    /// Tag the waiter with the interaction that owns it
    pub fn owned_by(mut self, session: SessionKey) -> Self {
        self.session = Some(session);
        self
    }
}

/// Diagnostic snapshot of a live waiter
#[derive(Debug, Clone, Serialize)]
pub struct WaiterInfo {
    pub id: WaiterId,
    pub scope: Scope,
    pub kind: EventKind,
    pub session: Option<SessionKey>,
    pub created_at: DateTime<Utc>,
    pub remaining: Duration,
}
