//! Interfaces to the transport and the persistent store
//!
//! Both are opaque and fallible; failures come back as `anyhow::Error` and
//! are passed up to the command handler that made the call.

use async_trait::async_trait;

use crate::events::{Signal, SignalEvent};
use crate::projections::{ResultPage, TermCard};
use crate::value_objects::{
    CategoryRef, ChannelId, MessageId, MessageRef, NewTerm, SearchQuery, Submission,
    SubmissionId, Term, TermId, UserId,
};

/// Outbound side of the chat transport
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send_text(&self, channel_id: ChannelId, content: &str) -> anyhow::Result<MessageId>;

    async fn send_card(
        &self,
        channel_id: ChannelId,
        content: &str,
        card: &TermCard,
    ) -> anyhow::Result<MessageId>;

    async fn send_page(&self, channel_id: ChannelId, page: &ResultPage) -> anyhow::Result<MessageId>;

    async fn edit_page(&self, anchor: MessageRef, page: &ResultPage) -> anyhow::Result<()>;

    async fn delete_message(&self, anchor: MessageRef) -> anyhow::Result<()>;

    /// Attach signals to a message: reactions are added, components become buttons
    async fn offer_signals(&self, anchor: MessageRef, signals: &[Signal]) -> anyhow::Result<()>;

    /// Undo one user's signal: remove their reaction, or acknowledge a
    /// component press without changing anything
    async fn retract_signal(&self, signal: &SignalEvent) -> anyhow::Result<()>;
}

/// The glossary's persistent store
#[async_trait]
pub trait GlossaryStore: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> anyhow::Result<Vec<Term>>;

    async fn term(&self, id: TermId) -> anyhow::Result<Option<Term>>;

    /// Resolve a category name to its identifier
    async fn category_by_name(&self, name: &str) -> anyhow::Result<Option<CategoryRef>>;

    async fn add_term(&self, term: &NewTerm) -> anyhow::Result<TermId>;

    async fn remove_term(&self, id: TermId) -> anyhow::Result<()>;

    async fn submission(&self, id: SubmissionId) -> anyhow::Result<Option<Submission>>;

    async fn approve_submission(&self, id: SubmissionId, approved_by: UserId) -> anyhow::Result<()>;
}
