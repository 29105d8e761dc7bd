//! Sequential dialog that collects a new glossary term
//!
//! Each step sends a prompt and waits for the next message from the same
//! user in the same channel. The cancel keyword ends the dialog at any step
//! without persisting anything. The final step is a confirmation gate on a
//! preview of the term; only an accepted gate reaches the store.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{ActiveInteractions, Confirmation, ConfirmationGate, Interaction};
use crate::aggregate::{DraftRules, StepAnswer, TermDraft, WizardStep};
use crate::collaborators::{GlossaryStore, Outbound};
use crate::config::InteractionConfig;
use crate::error::InteractionResult;
use crate::projections::TermCard;
use crate::routing::{Dispatcher, Scope, WaitOutcome, WaitSpec};
use crate::session::{SessionKey, SessionMeta, SessionStore};
use crate::value_objects::{ChannelId, MessageRef, TermId, UserId};

pub const CANCELLED_TEXT: &str = "Term creation cancelled.";
pub const TIMED_OUT_TEXT: &str = "Operation timed out.";
pub const PREVIEW_TEXT: &str =
    "Term finished. React with \u{2705} to finish adding it, or with \u{274c} to cancel. Preview:";

/// How a wizard run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardOutcome {
    Committed(TermId),
    /// Cancel keyword, or the confirmation was rejected
    Cancelled,
    TimedOut,
    /// The same user started another wizard in the channel
    Superseded,
}

enum Reply {
    Text(String),
    TimedOut,
    Closed,
}

#[derive(Clone)]
pub struct TermWizard {
    dispatcher: Dispatcher,
    outbound: Arc<dyn Outbound>,
    store: Arc<dyn GlossaryStore>,
    gate: ConfirmationGate,
    config: Arc<InteractionConfig>,
    drafts: Arc<SessionStore<TermDraft>>,
    active: Arc<ActiveInteractions>,
}

impl TermWizard {
    pub fn new(
        dispatcher: Dispatcher,
        outbound: Arc<dyn Outbound>,
        store: Arc<dyn GlossaryStore>,
        config: Arc<InteractionConfig>,
    ) -> Self {
        let gate = ConfirmationGate::new(dispatcher.clone(), outbound.clone(), config.clone());
        Self {
            dispatcher,
            outbound,
            store,
            gate,
            config,
            drafts: Arc::new(SessionStore::new()),
            active: Arc::new(ActiveInteractions::new()),
        }
    }

    pub fn drafts(&self) -> &SessionStore<TermDraft> {
        &self.drafts
    }

    /// Session of the wizard `user_id` is running in `channel_id`
    pub fn current(&self, channel_id: ChannelId, user_id: UserId) -> Option<SessionKey> {
        self.active.current(channel_id, user_id)
    }

    /// Run the dialog to completion. `name` pre-fills the first step.
    pub async fn run(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        name: Option<&str>,
    ) -> InteractionResult<WizardOutcome> {
        let interaction = Interaction::new(channel_id, user_id);
        if let Some(previous) = self.active.begin(&interaction) {
            debug!(session = %previous.key(), "superseding running wizard");
            self.drafts.delete(previous.key());
            previous.close(&self.dispatcher);
        }
        self.drafts
            .insert(interaction.key(), SessionMeta::new(user_id, channel_id), TermDraft::new());
        info!(session = %interaction.key(), user = %user_id, "term wizard started");

        let result = self.drive(&interaction, name).await;

        interaction.close(&self.dispatcher);
        self.drafts.delete(interaction.key());
        self.active.finish(&interaction);
        if let Ok(outcome) = &result {
            info!(session = %interaction.key(), ?outcome, "term wizard finished");
        }
        result
    }

    async fn drive(&self, interaction: &Interaction, name: Option<&str>) -> InteractionResult<WizardOutcome> {
        let key = interaction.key();
        let channel_id = interaction.channel_id();
        let rules = DraftRules::from(&*self.config);

        let mut intro = String::new();
        if let Some(name) = name {
            match self.drafts.update(key, |draft| draft.apply(StepAnswer::Text(name), &rules)) {
                None => return Ok(WizardOutcome::Superseded),
                Some(Ok(_)) => intro = format!("Creating a term with the name `{}`.\n", name.trim()),
                Some(Err(_)) => {}
            }
        }
        intro.push_str(&format!(
            "You can send `{}` at any time to stop.\n",
            self.config.cancel_keyword
        ));

        let mut prompted = None;
        loop {
            let Some(step) = self.drafts.read(key, TermDraft::step) else {
                return Ok(WizardOutcome::Superseded);
            };
            if step == WizardStep::Confirm {
                return self.confirm(interaction).await;
            }

            if prompted != Some(step) {
                let Some(prompt) = self.drafts.read(key, |draft| self.prompt(step, draft)) else {
                    return Ok(WizardOutcome::Superseded);
                };
                let text = if intro.is_empty() {
                    prompt
                } else {
                    format!("{}{prompt}", std::mem::take(&mut intro))
                };
                self.outbound.send_text(channel_id, &text).await?;
                prompted = Some(step);
            }

            let answer = match self.next_reply(interaction).await {
                Reply::Text(answer) => answer,
                Reply::TimedOut => {
                    self.outbound.send_text(channel_id, TIMED_OUT_TEXT).await?;
                    return Ok(WizardOutcome::TimedOut);
                }
                Reply::Closed => return Ok(WizardOutcome::Superseded),
            };
            if answer == self.config.cancel_keyword {
                self.outbound.send_text(channel_id, CANCELLED_TEXT).await?;
                return Ok(WizardOutcome::Cancelled);
            }

            let applied = if step == WizardStep::AskCategory {
                let resolved = self.store.category_by_name(answer.trim()).await?;
                self.drafts.update(key, |draft| {
                    draft.apply(
                        StepAnswer::Category {
                            typed: &answer,
                            resolved: resolved.as_ref(),
                        },
                        &rules,
                    )
                })
            } else {
                self.drafts
                    .update(key, |draft| draft.apply(StepAnswer::Text(&answer), &rules))
            };
            match applied {
                None => return Ok(WizardOutcome::Superseded),
                Some(Ok(next)) => debug!(session = %key, ?step, ?next, "step answered"),
                Some(Err(rejection)) => {
                    debug!(session = %key, ?step, %rejection, "answer rejected");
                    self.outbound.send_text(channel_id, &rejection.to_string()).await?;
                }
            }
        }
    }

    async fn next_reply(&self, interaction: &Interaction) -> Reply {
        let deadline = Instant::now() + self.config.wizard_step_timeout();
        let scope = Scope::user(interaction.channel_id(), interaction.user_id());
        let Some(handle) = interaction.arm(&self.dispatcher, WaitSpec::new(scope, deadline).messages()) else {
            return Reply::Closed;
        };
        match handle.wait().await {
            WaitOutcome::Matched(event) => match event.as_message() {
                Some(message) => Reply::Text(message.content.clone()),
                None => Reply::Closed,
            },
            WaitOutcome::TimedOut => Reply::TimedOut,
            WaitOutcome::Cancelled => Reply::Closed,
        }
    }

    async fn confirm(&self, interaction: &Interaction) -> InteractionResult<WizardOutcome> {
        let channel_id = interaction.channel_id();
        let Some(term) = self.drafts.read(interaction.key(), TermDraft::finish) else {
            return Ok(WizardOutcome::Superseded);
        };
        let term = term?;

        let message_id = self
            .outbound
            .send_card(channel_id, PREVIEW_TEXT, &TermCard::preview(&term))
            .await?;
        let deadline = Instant::now() + self.config.confirmation_timeout();
        let verdict = self
            .gate
            .confirm_within(interaction, MessageRef::new(channel_id, message_id), deadline)
            .await?;
        if interaction.is_closed() {
            return Ok(WizardOutcome::Superseded);
        }

        match verdict {
            Confirmation::Accepted => {
                let id = self.store.add_term(&term).await?;
                info!(term = %id, name = %term.name, "term added");
                self.outbound
                    .send_text(channel_id, &format!("\u{2705} Term added (ID {id})."))
                    .await?;
                Ok(WizardOutcome::Committed(id))
            }
            Confirmation::Rejected => {
                self.outbound.send_text(channel_id, "Cancelled.").await?;
                Ok(WizardOutcome::Cancelled)
            }
            Confirmation::TimedOut => {
                self.outbound.send_text(channel_id, TIMED_OUT_TEXT).await?;
                Ok(WizardOutcome::TimedOut)
            }
        }
    }

    fn prompt(&self, step: WizardStep, draft: &TermDraft) -> String {
        match step {
            WizardStep::AskName => "Please type the name of the term:".to_string(),
            WizardStep::AskCategory => "Please type the name of the category this term belongs to:".to_string(),
            WizardStep::AskDescription => match draft.category() {
                Some(category) => format!(
                    "Category set to `{}` (ID {}). Please type the description:",
                    category.name, category.id
                ),
                None => "Please type the description:".to_string(),
            },
            WizardStep::AskSource => "Description set. Please type the source:".to_string(),
            WizardStep::AskAliases => format!(
                "Source set. Please type a *newline separated* list of aliases/synonyms, or `{}` to set no aliases:",
                self.config.no_aliases_keyword
            ),
            WizardStep::Confirm => PREVIEW_TEXT.to_string(),
        }
    }
}
