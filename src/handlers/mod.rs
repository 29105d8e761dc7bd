//! Interaction controllers and the glossary command handler
//!
//! The controllers (pagination, wizard, confirmation gate) all follow the
//! same shape: send a prompt, arm a waiter owned by the interaction, suspend
//! on it, act on the outcome. An [`Interaction`] ties those waiters together
//! so a superseding command can tear all of them down at once.

pub mod command_handler;
pub mod confirmation;
pub mod pagination;
pub mod wizard;

pub use command_handler::{GatedAction, GlossaryCommandHandler};
pub use confirmation::{Confirmation, ConfirmationGate};
pub use pagination::{Disambiguation, PageState, Paginator};
pub use wizard::{TermWizard, WizardOutcome};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::collaborators::Outbound;
use crate::config::SignalStyle;
use crate::events::{InboundEvent, Signal};
use crate::routing::{Dispatcher, Scope, WaitOutcome, WaitSpec, WaiterHandle};
use crate::session::SessionKey;
use crate::value_objects::{
    ACCEPT_COMPONENT, ACCEPT_EMOJI, ChannelId, MessageRef, POSITION_EMOJI, PageAction,
    REJECT_COMPONENT, REJECT_EMOJI, UserId, position_component_id,
};

/// One live exchange with one user
///
/// Closing an interaction cancels every waiter it owns and stops it from
/// arming new ones.
#[derive(Debug, Clone)]
pub struct Interaction {
    key: SessionKey,
    channel_id: ChannelId,
    user_id: UserId,
    closed: Arc<AtomicBool>,
}

impl Interaction {
    pub fn new(channel_id: ChannelId, user_id: UserId) -> Self {
        Self {
            key: SessionKey::new(),
            channel_id,
            user_id,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn key(&self) -> SessionKey {
        self.key
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close(&self, dispatcher: &Dispatcher) {
        self.closed.store(true, Ordering::SeqCst);
        dispatcher.cancel_session(self.key);
    }

    /// Register a waiter owned by this interaction.
    ///
    /// Returns `None` once the interaction is closed. The closed flag is
    /// checked again after registering, so a close that races with this call
    /// either cancels the new waiter or is observed here.
    pub fn arm(&self, dispatcher: &Dispatcher, spec: WaitSpec) -> Option<WaiterHandle> {
        if self.is_closed() {
            return None;
        }
        let handle = dispatcher.register(spec.owned_by(self.key));
        if self.is_closed() {
            handle.cancel();
            return None;
        }
        Some(handle)
    }
}

/// The newest interaction of one kind per (channel, user)
#[derive(Debug, Default)]
pub struct ActiveInteractions {
    by_scope: Mutex<HashMap<(ChannelId, UserId), Interaction>>,
}

impl ActiveInteractions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `interaction` current for its scope, returning the one it replaces
    pub fn begin(&self, interaction: &Interaction) -> Option<Interaction> {
        self.by_scope.lock().insert(
            (interaction.channel_id, interaction.user_id),
            interaction.clone(),
        )
    }

    /// Remove and return whatever is current for the scope
    pub fn take(&self, channel_id: ChannelId, user_id: UserId) -> Option<Interaction> {
        self.by_scope.lock().remove(&(channel_id, user_id))
    }

    /// Forget `interaction` unless a newer one already replaced it
    pub fn finish(&self, interaction: &Interaction) {
        let mut by_scope = self.by_scope.lock();
        let scope = (interaction.channel_id, interaction.user_id);
        if by_scope.get(&scope).is_some_and(|current| current.key == interaction.key) {
            by_scope.remove(&scope);
        }
    }

    pub fn current(&self, channel_id: ChannelId, user_id: UserId) -> Option<SessionKey> {
        self.by_scope.lock().get(&(channel_id, user_id)).map(|i| i.key)
    }
}

/// Signals selecting positions `1..=count`
pub fn positional_signals(style: SignalStyle, count: usize) -> Vec<Signal> {
    (1..=count.min(POSITION_EMOJI.len()))
        .map(|n| match style {
            SignalStyle::Reactions => Signal::Reaction(POSITION_EMOJI[n - 1].to_string()),
            SignalStyle::Buttons => Signal::Component(position_component_id(n)),
        })
        .collect()
}

/// Navigation signals; page movement only when there is more than one page
pub fn navigation_signals(style: SignalStyle, multi_page: bool) -> Vec<Signal> {
    PageAction::ALL
        .into_iter()
        .filter(|action| multi_page || *action == PageAction::Close)
        .map(|action| match style {
            SignalStyle::Reactions => Signal::Reaction(action.emoji().to_string()),
            SignalStyle::Buttons => Signal::Component(action.component_id().to_string()),
        })
        .collect()
}

/// Accept and reject, in that order
pub fn verdict_signals(style: SignalStyle) -> Vec<Signal> {
    match style {
        SignalStyle::Reactions => vec![
            Signal::Reaction(ACCEPT_EMOJI.to_string()),
            Signal::Reaction(REJECT_EMOJI.to_string()),
        ],
        SignalStyle::Buttons => vec![
            Signal::Component(ACCEPT_COMPONENT.to_string()),
            Signal::Component(REJECT_COMPONENT.to_string()),
        ],
    }
}

/// Retract signals other users put on `anchor` until the interaction closes
pub(crate) async fn suppress_foreign_signals(
    dispatcher: Dispatcher,
    outbound: Arc<dyn Outbound>,
    interaction: Interaction,
    anchor: MessageRef,
    deadline: Instant,
) {
    let owner = interaction.user_id();
    loop {
        let spec = WaitSpec::new(Scope::channel(anchor.channel_id), deadline)
            .signals()
            .matching(move |event| {
                event
                    .as_signal()
                    .is_some_and(|s| s.message_id == anchor.message_id && s.user_id != owner)
            });
        let Some(handle) = interaction.arm(&dispatcher, spec) else {
            break;
        };
        let WaitOutcome::Matched(InboundEvent::Signal(signal)) = handle.wait().await else {
            break;
        };
        debug!(user = %signal.user_id, message = %anchor.message_id, "suppressing foreign signal");
        if let Err(e) = outbound.retract_signal(&signal).await {
            warn!(error = %e, "could not retract foreign signal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_closed_interaction_cannot_arm() {
        let dispatcher = Dispatcher::new();
        let interaction = Interaction::new(ChannelId(1), UserId(2));
        let deadline = Instant::now() + Duration::from_secs(60);
        let scope = Scope::user(ChannelId(1), UserId(2));

        let handle = interaction.arm(&dispatcher, WaitSpec::new(scope, deadline)).unwrap();
        interaction.close(&dispatcher);
        assert_eq!(handle.wait().await, WaitOutcome::Cancelled);
        assert!(interaction.arm(&dispatcher, WaitSpec::new(scope, deadline)).is_none());
        assert_eq!(dispatcher.live_count(), 0);
    }

    #[test]
    fn test_finish_keeps_newer_interaction() {
        let active = ActiveInteractions::new();
        let older = Interaction::new(ChannelId(1), UserId(2));
        let newer = Interaction::new(ChannelId(1), UserId(2));

        assert!(active.begin(&older).is_none());
        let replaced = active.begin(&newer).unwrap();
        assert_eq!(replaced.key(), older.key());

        active.finish(&older);
        assert_eq!(active.current(ChannelId(1), UserId(2)), Some(newer.key()));
        active.finish(&newer);
        assert_eq!(active.current(ChannelId(1), UserId(2)), None);
    }

    #[test]
    fn test_take_clears_scope() {
        let active = ActiveInteractions::new();
        let listing = Interaction::new(ChannelId(1), UserId(2));
        active.begin(&listing);

        assert_eq!(active.take(ChannelId(1), UserId(3)).map(|i| i.key()), None);
        assert_eq!(active.take(ChannelId(1), UserId(2)).map(|i| i.key()), Some(listing.key()));
        assert_eq!(active.current(ChannelId(1), UserId(2)), None);
    }

    #[test]
    fn test_signal_sets() {
        assert_eq!(positional_signals(SignalStyle::Reactions, 2).len(), 2);
        assert_eq!(
            positional_signals(SignalStyle::Buttons, 3)[2],
            Signal::Component("3".to_string())
        );
        assert_eq!(navigation_signals(SignalStyle::Buttons, false), vec![Signal::Component("cross".to_string())]);
        assert_eq!(navigation_signals(SignalStyle::Reactions, true).len(), 5);
        assert_eq!(verdict_signals(SignalStyle::Reactions)[0].verdict(), Some(true));
    }
}
