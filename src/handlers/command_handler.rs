//! Glossary command handler implementation

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::{Confirmation, ConfirmationGate, Disambiguation, Paginator, TermWizard, WizardOutcome};
use crate::collaborators::{GlossaryStore, Outbound};
use crate::commands::{AddTerm, ApproveSubmission, DeleteTerm, SearchTerms};
use crate::config::InteractionConfig;
use crate::error::InteractionResult;
use crate::projections::TermCard;
use crate::routing::Dispatcher;
use crate::value_objects::{ChannelId, MessageRef, SearchQuery, UserId};

pub const INTERNAL_ERROR_TEXT: &str =
    "An internal error occurred. If this issue persists, please contact the bot developer.";

/// Result of a command that goes through a confirmation gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatedAction {
    Performed,
    Declined,
    TimedOut,
    /// The target does not exist; no gate was shown
    NotFound,
}

/// Handler for glossary commands
#[derive(Clone)]
pub struct GlossaryCommandHandler {
    store: Arc<dyn GlossaryStore>,
    outbound: Arc<dyn Outbound>,
    config: Arc<InteractionConfig>,
    dispatcher: Dispatcher,
    paginator: Paginator,
    wizard: TermWizard,
    gate: ConfirmationGate,
}

impl GlossaryCommandHandler {
    /// Create a new glossary command handler
    pub fn new(
        dispatcher: Dispatcher,
        store: Arc<dyn GlossaryStore>,
        outbound: Arc<dyn Outbound>,
        config: Arc<InteractionConfig>,
    ) -> Self {
        Self {
            paginator: Paginator::new(dispatcher.clone(), outbound.clone(), config.clone()),
            wizard: TermWizard::new(dispatcher.clone(), outbound.clone(), store.clone(), config.clone()),
            gate: ConfirmationGate::new(dispatcher.clone(), outbound.clone(), config.clone()),
            store,
            outbound,
            config,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    pub fn wizard(&self) -> &TermWizard {
        &self.wizard
    }

    /// Handle SearchTerms command
    pub async fn handle_search(&self, cmd: SearchTerms) -> InteractionResult<Disambiguation> {
        let result = self.search(&cmd).await;
        self.reporting(cmd.channel_id, "search", result).await
    }

    async fn search(&self, cmd: &SearchTerms) -> InteractionResult<Disambiguation> {
        let (text, limit) = cmd.text_and_limit(self.config.search_limit);

        let category = match cmd.category.as_deref() {
            Some(name) => match self.store.category_by_name(name).await? {
                Some(category) => Some(category.id),
                None => {
                    self.outbound
                        .send_text(cmd.channel_id, &format!("Could not find a category named `{name}`."))
                        .await?;
                    return Ok(Disambiguation::NoResults);
                }
            },
            None => None,
        };

        let query = SearchQuery {
            text: text.to_string(),
            category,
            limit,
            ignored_tags: cmd.ignored_tags.clone(),
        };
        let mut results = self.store.search(&query).await?;
        if cmd.no_content_warnings {
            results.retain(|term| !term.has_content_warnings());
        }
        results.truncate(limit);
        info!(user = %cmd.user_id, query = %query.text, results = results.len(), "search executed");

        self.paginator.present(cmd.channel_id, cmd.user_id, text, results).await
    }

    /// Handle AddTerm command
    pub async fn handle_add_term(&self, cmd: AddTerm) -> InteractionResult<WizardOutcome> {
        let result = self.wizard.run(cmd.channel_id, cmd.user_id, cmd.name.as_deref()).await;
        self.reporting(cmd.channel_id, "add_term", result).await
    }

    /// Handle DeleteTerm command
    pub async fn handle_delete_term(&self, cmd: DeleteTerm) -> InteractionResult<GatedAction> {
        let result = self.delete_term(cmd).await;
        self.reporting(cmd.channel_id, "delete_term", result).await
    }

    async fn delete_term(&self, cmd: DeleteTerm) -> InteractionResult<GatedAction> {
        let Some(term) = self.store.term(cmd.term_id).await? else {
            self.outbound.send_text(cmd.channel_id, "No term found with that ID.").await?;
            return Ok(GatedAction::NotFound);
        };

        let message_id = self
            .outbound
            .send_card(
                cmd.channel_id,
                "Are you sure you want to delete this term? React with \u{2705} to confirm or \u{274c} to cancel.",
                &TermCard::from_term(&term),
            )
            .await?;
        let verdict = self.confirm(MessageRef::new(cmd.channel_id, message_id), cmd.user_id).await?;

        let action = self
            .settle(cmd.channel_id, verdict, "\u{2705} Term deleted.", || {
                self.store.remove_term(cmd.term_id)
            })
            .await?;
        if action == GatedAction::Performed {
            info!(term = %cmd.term_id, user = %cmd.user_id, "term deleted");
        }
        Ok(action)
    }

    /// Handle ApproveSubmission command
    pub async fn handle_approve_submission(&self, cmd: ApproveSubmission) -> InteractionResult<GatedAction> {
        let result = self.approve_submission(cmd).await;
        self.reporting(cmd.channel_id, "approve_submission", result).await
    }

    async fn approve_submission(&self, cmd: ApproveSubmission) -> InteractionResult<GatedAction> {
        let Some(submission) = self.store.submission(cmd.submission_id).await? else {
            self.outbound
                .send_text(cmd.channel_id, "No submission found with that ID.")
                .await?;
            return Ok(GatedAction::NotFound);
        };

        let message_id = self
            .outbound
            .send_card(
                cmd.channel_id,
                "Approve this submission? React with \u{2705} to approve or \u{274c} to cancel.",
                &TermCard::from_submission(&submission),
            )
            .await?;
        let verdict = self.confirm(MessageRef::new(cmd.channel_id, message_id), cmd.user_id).await?;

        let action = self
            .settle(cmd.channel_id, verdict, "\u{2705} Submission approved.", || {
                self.store.approve_submission(cmd.submission_id, cmd.user_id)
            })
            .await?;
        if action == GatedAction::Performed {
            info!(submission = %cmd.submission_id, user = %cmd.user_id, "submission approved");
        }
        Ok(action)
    }

    async fn confirm(&self, anchor: MessageRef, user: UserId) -> InteractionResult<Confirmation> {
        let deadline = Instant::now() + self.config.confirmation_timeout();
        self.gate.confirm(anchor, user, deadline).await
    }

    /// Run `action` only when the gate was accepted, and report back either way
    async fn settle<F, Fut>(
        &self,
        channel_id: ChannelId,
        verdict: Confirmation,
        done_text: &str,
        action: F,
    ) -> InteractionResult<GatedAction>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<()>>,
    {
        match verdict {
            Confirmation::Accepted => {
                action().await?;
                self.outbound.send_text(channel_id, done_text).await?;
                Ok(GatedAction::Performed)
            }
            Confirmation::Rejected => {
                self.outbound.send_text(channel_id, "Cancelled.").await?;
                Ok(GatedAction::Declined)
            }
            Confirmation::TimedOut => {
                self.outbound.send_text(channel_id, super::wizard::TIMED_OUT_TEXT).await?;
                Ok(GatedAction::TimedOut)
            }
        }
    }

    /// Log a failed command and tell the user something went wrong
    async fn reporting<T>(
        &self,
        channel_id: ChannelId,
        operation: &'static str,
        result: InteractionResult<T>,
    ) -> InteractionResult<T> {
        if let Err(e) = &result {
            error!(operation, channel = %channel_id, error = %e, "command failed");
            if let Err(send_error) = self.outbound.send_text(channel_id, INTERNAL_ERROR_TEXT).await {
                warn!(error = %send_error, "could not report failure to the user");
            }
        }
        result
    }
}
