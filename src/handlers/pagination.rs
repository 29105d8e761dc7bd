//! Paginated disambiguation of a result list
//!
//! A listing is shown one page at a time on a single anchor message. The
//! owner picks an item by typing its number or activating its positional
//! signal, and moves between pages with the navigation signals. Positions are
//! always resolved against the page that is current when the selection
//! arrives, never against the page the listing was first sent with.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{
    ActiveInteractions, Interaction, navigation_signals, positional_signals, suppress_foreign_signals,
};
use crate::collaborators::Outbound;
use crate::config::InteractionConfig;
use crate::error::InteractionResult;
use crate::events::InboundEvent;
use crate::projections::{ResultPage, TermCard, render_result_page};
use crate::routing::{Dispatcher, Scope, WaitOutcome, WaitSpec};
use crate::session::{SessionKey, SessionMeta, SessionStore};
use crate::value_objects::{ChannelId, MessageRef, PageAction, Term, UserId};

/// Session state of one listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageState {
    pub query: String,
    pub pages: Vec<Vec<Term>>,
    /// Current page, 0-based
    pub page: usize,
    /// Set when the owner closed the listing
    pub closed: bool,
}

impl PageState {
    pub fn new(query: &str, items: Vec<Term>, page_size: usize) -> Self {
        let pages = items.chunks(page_size.max(1)).map(<[Term]>::to_vec).collect();
        Self {
            query: query.to_string(),
            pages,
            page: 0,
            closed: false,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_len(&self) -> usize {
        self.pages.get(self.page).map_or(0, Vec::len)
    }

    /// Item at 1-based `position` on the current page
    pub fn item_at(&self, position: usize) -> Option<&Term> {
        let index = position.checked_sub(1)?;
        self.pages.get(self.page)?.get(index)
    }

    /// Apply a navigation action. Returns whether the page changed.
    pub fn turn(&mut self, action: PageAction) -> bool {
        let next = action.apply(self.page, self.page_count());
        let changed = next != self.page;
        self.page = next;
        changed
    }

    pub fn render(&self) -> ResultPage {
        render_result_page(&self.query, self.page, &self.pages)
    }
}

/// How a disambiguation ended
#[derive(Debug, Clone, PartialEq)]
pub enum Disambiguation {
    NoResults,
    /// Exactly one item; shown without a listing
    Single(Term),
    Resolved(Term),
    TimedOut,
    /// A newer listing for the same user and channel took over
    Superseded,
    /// The owner closed the listing
    Closed,
}

#[derive(Clone)]
pub struct Paginator {
    dispatcher: Dispatcher,
    outbound: Arc<dyn Outbound>,
    config: Arc<InteractionConfig>,
    sessions: Arc<SessionStore<PageState>>,
    active: Arc<ActiveInteractions>,
}

impl Paginator {
    pub fn new(dispatcher: Dispatcher, outbound: Arc<dyn Outbound>, config: Arc<InteractionConfig>) -> Self {
        Self {
            dispatcher,
            outbound,
            config,
            sessions: Arc::new(SessionStore::new()),
            active: Arc::new(ActiveInteractions::new()),
        }
    }

    pub fn sessions(&self) -> &SessionStore<PageState> {
        &self.sessions
    }

    /// Session of the listing `user_id` currently has open in `channel_id`
    pub fn current(&self, channel_id: ChannelId, user_id: UserId) -> Option<SessionKey> {
        self.active.current(channel_id, user_id)
    }

    /// Show `items` to `user_id` and wait for a choice.
    ///
    /// Any listing the same user still has open in the channel is superseded.
    pub async fn present(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        query: &str,
        mut items: Vec<Term>,
    ) -> InteractionResult<Disambiguation> {
        if items.len() < 2 {
            self.supersede(self.active.take(channel_id, user_id));
        }
        match items.len() {
            0 => {
                self.outbound.send_text(channel_id, "No results found.").await?;
                return Ok(Disambiguation::NoResults);
            }
            1 => {
                let term = items.remove(0);
                self.outbound.send_card(channel_id, "", &TermCard::from_term(&term)).await?;
                return Ok(Disambiguation::Single(term));
            }
            _ => {}
        }

        let interaction = Interaction::new(channel_id, user_id);
        self.supersede(self.active.begin(&interaction));

        let key = interaction.key();
        let deadline = Instant::now() + self.config.selection_timeout();
        let state = PageState::new(query, items, self.config.page_size);
        let first_page = state.render();
        let mut signals = positional_signals(self.config.signal_style, state.current_len());
        signals.extend(navigation_signals(self.config.signal_style, state.page_count() > 1));
        info!(
            session = %key,
            user = %user_id,
            results = state.pages.iter().map(Vec::len).sum::<usize>(),
            pages = state.page_count(),
            "presenting result listing"
        );
        self.sessions.insert(key, SessionMeta::new(user_id, channel_id), state);

        let message_id = match self.outbound.send_page(channel_id, &first_page).await {
            Ok(id) => id,
            Err(e) => {
                self.conclude(&interaction);
                return Err(e.into());
            }
        };
        self.sessions.set_anchor(key, message_id);
        let anchor = MessageRef::new(channel_id, message_id);

        tokio::spawn(self.clone().navigate(interaction.clone(), anchor, deadline));
        tokio::spawn(suppress_foreign_signals(
            self.dispatcher.clone(),
            self.outbound.clone(),
            interaction.clone(),
            anchor,
            deadline,
        ));
        let outbound = self.outbound.clone();
        tokio::spawn(async move {
            if let Err(e) = outbound.offer_signals(anchor, &signals).await {
                // usually the listing was already resolved and deleted
                debug!(error = %e, "could not offer listing signals");
            }
        });

        let outcome = self.await_selection(&interaction, anchor, deadline).await;
        match &outcome {
            Disambiguation::Resolved(term) => {
                self.conclude(&interaction);
                if let Err(e) = self.outbound.delete_message(anchor).await {
                    warn!(error = %e, "could not delete resolved listing");
                }
                self.outbound.send_card(channel_id, "", &TermCard::from_term(term)).await?;
            }
            Disambiguation::TimedOut | Disambiguation::Closed => self.conclude(&interaction),
            _ => {}
        }
        info!(session = %key, ?outcome, "listing finished");
        Ok(outcome)
    }

    fn supersede(&self, previous: Option<Interaction>) {
        if let Some(previous) = previous {
            debug!(session = %previous.key(), "superseding open listing");
            self.sessions.delete(previous.key());
            previous.close(&self.dispatcher);
        }
    }

    async fn await_selection(
        &self,
        interaction: &Interaction,
        anchor: MessageRef,
        deadline: Instant,
    ) -> Disambiguation {
        let key = interaction.key();
        let scope = Scope::user(interaction.channel_id(), interaction.user_id());
        loop {
            // syntactic check only; the page is consulted after the match
            let spec = WaitSpec::new(scope, deadline)
                .matching(move |event| requested_position(event, anchor).is_some());
            let Some(handle) = interaction.arm(&self.dispatcher, spec) else {
                return self.ended_early(key);
            };

            let event = match handle.wait().await {
                WaitOutcome::Matched(event) => event,
                WaitOutcome::TimedOut => return Disambiguation::TimedOut,
                WaitOutcome::Cancelled => return self.ended_early(key),
            };
            let Some(position) = requested_position(&event, anchor) else {
                continue;
            };
            match self.sessions.read(key, |state| state.item_at(position).cloned()) {
                None => return Disambiguation::Superseded,
                Some(Some(term)) => return Disambiguation::Resolved(term),
                Some(None) => {
                    debug!(session = %key, position, "selection outside current page, ignoring");
                }
            }
        }
    }

    fn ended_early(&self, key: SessionKey) -> Disambiguation {
        if self.sessions.read(key, |state| state.closed).unwrap_or(false) {
            Disambiguation::Closed
        } else {
            Disambiguation::Superseded
        }
    }

    /// Handle the owner's navigation signals until the listing ends
    async fn navigate(self, interaction: Interaction, anchor: MessageRef, deadline: Instant) {
        let key = interaction.key();
        let scope = Scope::user(interaction.channel_id(), interaction.user_id());
        let navigation = move || {
            WaitSpec::new(scope, deadline).signals().matching(move |event| {
                event
                    .as_signal()
                    .is_some_and(|s| s.message_id == anchor.message_id && s.signal.page_action().is_some())
            })
        };
        let mut armed = interaction.arm(&self.dispatcher, navigation());
        while let Some(handle) = armed {
            let WaitOutcome::Matched(InboundEvent::Signal(signal)) = handle.wait().await else {
                break;
            };
            // the next press must find a waiter while this one is still being rendered
            armed = interaction.arm(&self.dispatcher, navigation());
            let Some(action) = signal.signal.page_action() else {
                continue;
            };

            if action == PageAction::Close {
                self.sessions.update(key, |state| state.closed = true);
                interaction.close(&self.dispatcher);
                if let Err(e) = self.outbound.delete_message(anchor).await {
                    warn!(error = %e, "could not delete closed listing");
                }
                break;
            }

            let rendered = self
                .sessions
                .update(key, |state| state.turn(action).then(|| state.render()));
            match rendered {
                None => break,
                Some(Some(page)) => {
                    if let Err(e) = self.outbound.edit_page(anchor, &page).await {
                        warn!(error = %e, "could not update listing page");
                    }
                }
                Some(None) => {}
            }
            if let Err(e) = self.outbound.retract_signal(&signal).await {
                debug!(error = %e, "could not retract navigation signal");
            }
        }
    }

    fn conclude(&self, interaction: &Interaction) {
        interaction.close(&self.dispatcher);
        self.sessions.delete(interaction.key());
        self.active.finish(interaction);
    }
}

/// Position named by a typed number or a positional signal on the listing
fn requested_position(event: &InboundEvent, anchor: MessageRef) -> Option<usize> {
    match event {
        InboundEvent::Message(message) => message.content.trim().parse::<usize>().ok().filter(|n| *n >= 1),
        InboundEvent::Signal(signal) if signal.message_id == anchor.message_id => signal.signal.position(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MessageEvent, Signal, SignalEvent};
    use crate::value_objects::{CategoryId, MessageId, POSITION_EMOJI, TermId};

    fn terms(count: i64) -> Vec<Term> {
        (0..count)
            .map(|i| Term {
                id: TermId(i),
                name: format!("term {i}"),
                category_id: CategoryId(1),
                category_name: "Identity".to_string(),
                description: String::new(),
                source: String::new(),
                aliases: Vec::new(),
                content_warnings: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_pages_split_by_page_size() {
        let state = PageState::new("q", terms(12), 5);
        let sizes: Vec<usize> = state.pages.iter().map(Vec::len).collect();
        assert_eq!(sizes, [5, 5, 2]);
    }

    #[test]
    fn test_item_at_uses_current_page() {
        let mut state = PageState::new("q", terms(12), 5);
        assert_eq!(state.item_at(2).unwrap().id, TermId(1));
        assert!(state.item_at(0).is_none());

        assert!(state.turn(PageAction::Last));
        assert_eq!(state.item_at(2).unwrap().id, TermId(11));
        assert!(state.item_at(3).is_none());

        assert!(state.turn(PageAction::Next));
        assert_eq!(state.page, 0);
    }

    #[test]
    fn test_requested_position() {
        let anchor = MessageRef::new(ChannelId(1), MessageId(50));
        let typed = |content: &str| {
            InboundEvent::Message(MessageEvent {
                channel_id: ChannelId(1),
                author_id: UserId(2),
                message_id: MessageId(60),
                content: content.to_string(),
            })
        };
        let reacted = |message: u64, emoji: &str| {
            InboundEvent::Signal(SignalEvent {
                channel_id: ChannelId(1),
                user_id: UserId(2),
                message_id: MessageId(message),
                signal: Signal::Reaction(emoji.to_string()),
            })
        };

        assert_eq!(requested_position(&typed(" 3 "), anchor), Some(3));
        assert_eq!(requested_position(&typed("0"), anchor), None);
        assert_eq!(requested_position(&typed("three"), anchor), None);
        assert_eq!(requested_position(&reacted(50, POSITION_EMOJI[4]), anchor), Some(5));
        assert_eq!(requested_position(&reacted(51, POSITION_EMOJI[4]), anchor), None);
    }
}
