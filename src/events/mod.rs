//! Inbound events and the normalizer that feeds the dispatcher
//!
//! The transport hands over [`RawEvent`]s exactly as the chat gateway shaped
//! them. The normalizer projects each one into an [`InboundEvent`], the
//! closed set of kinds that waiters can match on, and forwards it to the
//! [`Dispatcher`]. It does no filtering of its own.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{InteractionError, InteractionResult};
use crate::routing::{Dispatcher, WaiterId};
use crate::value_objects::{
    ACCEPT_COMPONENT, ACCEPT_EMOJI, ChannelId, MessageId, POSITION_EMOJI, PageAction,
    REJECT_COMPONENT, REJECT_EMOJI, UserId,
};

/// Gateway event as received from the chat transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawEvent {
    MessageCreate {
        channel_id: ChannelId,
        message_id: MessageId,
        author_id: Option<UserId>,
        #[serde(default)]
        content: String,
    },
    ReactionAdd {
        channel_id: ChannelId,
        message_id: MessageId,
        user_id: Option<UserId>,
        emoji: Option<String>,
    },
    /// Button press. Guild interactions carry the user on the member record,
    /// direct-message interactions carry it directly.
    InteractionCreate {
        channel_id: ChannelId,
        message_id: Option<MessageId>,
        user_id: Option<UserId>,
        member_user_id: Option<UserId>,
        custom_id: Option<String>,
    },
    #[serde(other)]
    Other,
}

impl RawEvent {
    /// Decode a JSON gateway payload
    pub fn from_json(payload: &str) -> InteractionResult<Self> {
        serde_json::from_str(payload).map_err(|e| InteractionError::MalformedEvent(e.to_string()))
    }
}

/// A new chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub message_id: MessageId,
    pub content: String,
}

/// What the user activated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Signal {
    /// Reaction emoji name
    Reaction(String),
    /// Interactive component identifier
    Component(String),
}

impl Signal {
    /// 1-based position this signal selects, if it is a positional signal
    pub fn position(&self) -> Option<usize> {
        match self {
            Signal::Reaction(emoji) => POSITION_EMOJI
                .iter()
                .position(|e| e == emoji)
                .map(|i| i + 1),
            Signal::Component(id) => id
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=POSITION_EMOJI.len()).contains(n)),
        }
    }

    /// Navigation action this signal requests, if any
    pub fn page_action(&self) -> Option<PageAction> {
        PageAction::ALL.into_iter().find(|action| match self {
            Signal::Reaction(emoji) => emoji == action.emoji(),
            Signal::Component(id) => id == action.component_id(),
        })
    }

    /// `Some(true)` for accept, `Some(false)` for reject
    pub fn verdict(&self) -> Option<bool> {
        match self {
            Signal::Reaction(emoji) if emoji == ACCEPT_EMOJI => Some(true),
            Signal::Reaction(emoji) if emoji == REJECT_EMOJI => Some(false),
            Signal::Component(id) if id == ACCEPT_COMPONENT => Some(true),
            Signal::Component(id) if id == REJECT_COMPONENT => Some(false),
            _ => None,
        }
    }
}

/// A reaction or component activation on a specific message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub message_id: MessageId,
    pub signal: Signal,
}

/// Correlation-relevant projection of an upstream event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundEvent {
    Message(MessageEvent),
    Signal(SignalEvent),
    Other,
}

impl InboundEvent {
    pub fn channel_id(&self) -> Option<ChannelId> {
        match self {
            InboundEvent::Message(m) => Some(m.channel_id),
            InboundEvent::Signal(s) => Some(s.channel_id),
            InboundEvent::Other => None,
        }
    }

    /// Author of a message or the user behind a signal
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            InboundEvent::Message(m) => Some(m.author_id),
            InboundEvent::Signal(s) => Some(s.user_id),
            InboundEvent::Other => None,
        }
    }

    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            InboundEvent::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_signal(&self) -> Option<&SignalEvent> {
        match self {
            InboundEvent::Signal(s) => Some(s),
            _ => None,
        }
    }
}

/// Project a raw gateway event into an inbound event
pub fn normalize(raw: RawEvent) -> InteractionResult<InboundEvent> {
    match raw {
        RawEvent::MessageCreate {
            channel_id,
            message_id,
            author_id,
            content,
        } => {
            let author_id = author_id.ok_or_else(|| {
                InteractionError::MalformedEvent(format!("message {message_id} has no author"))
            })?;
            Ok(InboundEvent::Message(MessageEvent {
                channel_id,
                author_id,
                message_id,
                content,
            }))
        }
        RawEvent::ReactionAdd {
            channel_id,
            message_id,
            user_id,
            emoji,
        } => {
            let user_id = user_id.ok_or_else(|| {
                InteractionError::MalformedEvent(format!("reaction on {message_id} has no user"))
            })?;
            let emoji = emoji.filter(|e| !e.is_empty()).ok_or_else(|| {
                InteractionError::MalformedEvent(format!("reaction on {message_id} has no emoji"))
            })?;
            Ok(InboundEvent::Signal(SignalEvent {
                channel_id,
                user_id,
                message_id,
                signal: Signal::Reaction(emoji),
            }))
        }
        RawEvent::InteractionCreate {
            channel_id,
            message_id,
            user_id,
            member_user_id,
            custom_id,
        } => {
            let message_id = message_id.ok_or_else(|| {
                InteractionError::MalformedEvent("component interaction without a message".to_string())
            })?;
            let user_id = user_id.or(member_user_id).ok_or_else(|| {
                InteractionError::MalformedEvent(format!("interaction on {message_id} has no user"))
            })?;
            let custom_id = custom_id.filter(|id| !id.is_empty()).ok_or_else(|| {
                InteractionError::MalformedEvent(format!(
                    "interaction on {message_id} has no component id"
                ))
            })?;
            Ok(InboundEvent::Signal(SignalEvent {
                channel_id,
                user_id,
                message_id,
                signal: Signal::Component(custom_id),
            }))
        }
        RawEvent::Other => Ok(InboundEvent::Other),
    }
}

/// Feeds normalized events into the dispatcher
#[derive(Clone)]
pub struct EventNormalizer {
    dispatcher: Dispatcher,
}

impl EventNormalizer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Normalize and dispatch one event. Malformed events are logged and dropped.
    ///
    /// Returns the waiter that received the event, if any.
    pub fn ingest(&self, raw: RawEvent) -> Option<WaiterId> {
        let event = match normalize(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "dropping malformed event");
                return None;
            }
        };
        if matches!(event, InboundEvent::Other) {
            trace!("ignoring uncorrelated event");
            return None;
        }
        let delivered = self.dispatcher.dispatch(&event);
        if delivered.is_none() {
            trace!(?event, "no waiter for event");
        }
        delivered
    }

    /// Consume the upstream stream until it closes
    pub async fn run(self, mut events: mpsc::Receiver<RawEvent>) {
        while let Some(raw) = events.recv().await {
            self.ingest(raw);
        }
        debug!("upstream event stream closed");
    }

    /// Run the ingestion loop on its own task
    pub fn spawn(self, events: mpsc::Receiver<RawEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_user_falls_back_to_member() {
        let event = normalize(RawEvent::InteractionCreate {
            channel_id: ChannelId(1),
            message_id: Some(MessageId(2)),
            user_id: None,
            member_user_id: Some(UserId(3)),
            custom_id: Some("4".to_string()),
        })
        .unwrap();

        let signal = event.as_signal().unwrap();
        assert_eq!(signal.user_id, UserId(3));
        assert_eq!(signal.signal.position(), Some(4));
    }

    #[test]
    fn test_reaction_without_user_is_malformed() {
        let err = normalize(RawEvent::ReactionAdd {
            channel_id: ChannelId(1),
            message_id: MessageId(2),
            user_id: None,
            emoji: Some(ACCEPT_EMOJI.to_string()),
        })
        .unwrap_err();
        assert!(matches!(err, InteractionError::MalformedEvent(_)));
    }

    #[test]
    fn test_component_without_message_is_malformed() {
        let err = normalize(RawEvent::InteractionCreate {
            channel_id: ChannelId(1),
            message_id: None,
            user_id: Some(UserId(3)),
            member_user_id: None,
            custom_id: Some("next".to_string()),
        })
        .unwrap_err();
        assert!(matches!(err, InteractionError::MalformedEvent(_)));
    }

    #[test]
    fn test_decodes_json_payloads() {
        let raw = RawEvent::from_json(
            r#"{"type":"message_create","channel_id":10,"message_id":11,"author_id":12,"content":"2"}"#,
        )
        .unwrap();
        let event = normalize(raw).unwrap();
        assert_eq!(event.user_id(), Some(UserId(12)));
        assert_eq!(event.as_message().unwrap().content, "2");

        let other = RawEvent::from_json(r#"{"type":"typing_start"}"#).unwrap();
        assert_eq!(other, RawEvent::Other);

        assert!(RawEvent::from_json("not json").is_err());
    }

    #[test]
    fn test_signal_classification() {
        assert_eq!(Signal::Reaction(POSITION_EMOJI[1].to_string()).position(), Some(2));
        assert_eq!(Signal::Component("0".to_string()).position(), None);
        assert_eq!(Signal::Component("11".to_string()).position(), None);
        assert_eq!(
            Signal::Component("prev".to_string()).page_action(),
            Some(PageAction::Previous)
        );
        assert_eq!(Signal::Reaction(ACCEPT_EMOJI.to_string()).verdict(), Some(true));
        assert_eq!(Signal::Component("reject".to_string()).verdict(), Some(false));
        assert_eq!(Signal::Reaction("\u{1f44d}".to_string()).verdict(), None);
    }
}
