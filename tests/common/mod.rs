//! Shared fakes and helpers for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use glossary_dialog::{
    CategoryId, CategoryRef, ChannelId, MessageId, MessageRef, NewTerm, RawEvent, ResultPage,
    SearchQuery, Signal, SignalEvent, Submission, SubmissionId, Term, TermCard, TermId, UserId,
    GlossaryStore, Outbound,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

pub const CHANNEL: ChannelId = ChannelId(100);
pub const OWNER: UserId = UserId(7);
pub const STRANGER: UserId = UserId(8);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Let spawned tasks run without letting paused time move
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// Yield until `condition` holds
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

pub fn term(id: i64, name: &str) -> Term {
    Term {
        id: TermId(id),
        name: name.to_string(),
        category_id: CategoryId(1),
        category_name: "Category A".to_string(),
        description: format!("Description of {name}"),
        source: "Community".to_string(),
        aliases: Vec::new(),
        content_warnings: String::new(),
    }
}

pub fn terms(count: i64) -> Vec<Term> {
    (0..count).map(|i| term(i, &format!("term {i}"))).collect()
}

pub fn message(channel: ChannelId, user: UserId, content: &str) -> RawEvent {
    RawEvent::MessageCreate {
        channel_id: channel,
        message_id: MessageId(9_000),
        author_id: Some(user),
        content: content.to_string(),
    }
}

pub fn reaction(anchor: MessageRef, user: UserId, emoji: &str) -> RawEvent {
    RawEvent::ReactionAdd {
        channel_id: anchor.channel_id,
        message_id: anchor.message_id,
        user_id: Some(user),
        emoji: Some(emoji.to_string()),
    }
}

pub fn button(anchor: MessageRef, user: UserId, custom_id: &str) -> RawEvent {
    RawEvent::InteractionCreate {
        channel_id: anchor.channel_id,
        message_id: Some(anchor.message_id),
        user_id: None,
        member_user_id: Some(user),
        custom_id: Some(custom_id.to_string()),
    }
}

/// Everything the interaction layer sent out
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text { message: MessageRef, content: String },
    Card { message: MessageRef, content: String, card: TermCard },
    Page { message: MessageRef, page: ResultPage },
    Edit { message: MessageRef, page: ResultPage },
    Delete(MessageRef),
    Offer { message: MessageRef, signals: Vec<Signal> },
    Retract(SignalEvent),
}

/// Outbound fake that records every call
pub struct RecordingOutbound {
    next_id: AtomicU64,
    log: Mutex<Vec<Sent>>,
    edit_latency: Option<Duration>,
}

impl RecordingOutbound {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1_000),
            log: Mutex::new(Vec::new()),
            edit_latency: None,
        }
    }

    /// Page edits take `latency` before they are recorded
    pub fn with_edit_latency(latency: Duration) -> Self {
        Self {
            edit_latency: Some(latency),
            ..Self::new()
        }
    }

    fn allocate(&self, channel_id: ChannelId) -> MessageRef {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        MessageRef::new(channel_id, MessageId(id))
    }

    pub fn log(&self) -> Vec<Sent> {
        self.log.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|sent| match sent {
                Sent::Text { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }

    pub fn pages(&self) -> Vec<(MessageRef, ResultPage)> {
        self.log
            .lock()
            .iter()
            .filter_map(|sent| match sent {
                Sent::Page { message, page } => Some((*message, page.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<ResultPage> {
        self.log
            .lock()
            .iter()
            .filter_map(|sent| match sent {
                Sent::Edit { page, .. } => Some(page.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn cards(&self) -> Vec<(MessageRef, String, TermCard)> {
        self.log
            .lock()
            .iter()
            .filter_map(|sent| match sent {
                Sent::Card { message, content, card } => Some((*message, content.clone(), card.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn offers(&self, anchor: MessageRef) -> Vec<Signal> {
        self.log
            .lock()
            .iter()
            .filter_map(|sent| match sent {
                Sent::Offer { message, signals } if *message == anchor => Some(signals.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn retracted(&self) -> Vec<SignalEvent> {
        self.log
            .lock()
            .iter()
            .filter_map(|sent| match sent {
                Sent::Retract(signal) => Some(signal.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        self.log
            .lock()
            .iter()
            .filter_map(|sent| match sent {
                Sent::Delete(message) => Some(*message),
                _ => None,
            })
            .collect()
    }

    fn record(&self, sent: Sent) {
        self.log.lock().push(sent);
    }
}

#[async_trait]
impl Outbound for RecordingOutbound {
    async fn send_text(&self, channel_id: ChannelId, content: &str) -> anyhow::Result<MessageId> {
        let message = self.allocate(channel_id);
        self.record(Sent::Text {
            message,
            content: content.to_string(),
        });
        Ok(message.message_id)
    }

    async fn send_card(&self, channel_id: ChannelId, content: &str, card: &TermCard) -> anyhow::Result<MessageId> {
        let message = self.allocate(channel_id);
        self.record(Sent::Card {
            message,
            content: content.to_string(),
            card: card.clone(),
        });
        Ok(message.message_id)
    }

    async fn send_page(&self, channel_id: ChannelId, page: &ResultPage) -> anyhow::Result<MessageId> {
        let message = self.allocate(channel_id);
        self.record(Sent::Page {
            message,
            page: page.clone(),
        });
        Ok(message.message_id)
    }

    async fn edit_page(&self, anchor: MessageRef, page: &ResultPage) -> anyhow::Result<()> {
        if let Some(latency) = self.edit_latency {
            tokio::time::sleep(latency).await;
        }
        self.record(Sent::Edit {
            message: anchor,
            page: page.clone(),
        });
        Ok(())
    }

    async fn delete_message(&self, anchor: MessageRef) -> anyhow::Result<()> {
        self.record(Sent::Delete(anchor));
        Ok(())
    }

    async fn offer_signals(&self, anchor: MessageRef, signals: &[Signal]) -> anyhow::Result<()> {
        self.record(Sent::Offer {
            message: anchor,
            signals: signals.to_vec(),
        });
        Ok(())
    }

    async fn retract_signal(&self, signal: &SignalEvent) -> anyhow::Result<()> {
        self.record(Sent::Retract(signal.clone()));
        Ok(())
    }
}

/// Store fake backed by vectors
pub struct InMemoryGlossaryStore {
    terms: Mutex<Vec<Term>>,
    categories: Vec<CategoryRef>,
    submissions: Vec<Submission>,
    approved: Mutex<Vec<(SubmissionId, UserId)>>,
    added: Mutex<Vec<NewTerm>>,
    next_term_id: AtomicI64,
    failing: AtomicBool,
}

impl InMemoryGlossaryStore {
    pub fn new(terms: Vec<Term>) -> Self {
        Self {
            terms: Mutex::new(terms),
            categories: vec![
                CategoryRef {
                    id: CategoryId(1),
                    name: "Category A".to_string(),
                },
                CategoryRef {
                    id: CategoryId(2),
                    name: "Category B".to_string(),
                },
            ],
            submissions: vec![Submission {
                id: SubmissionId(5),
                submitted_by: UserId(42),
                summary: "Please add aceflux".to_string(),
            }],
            approved: Mutex::new(Vec::new()),
            added: Mutex::new(Vec::new()),
            next_term_id: AtomicI64::new(500),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every later call fail
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn added(&self) -> Vec<NewTerm> {
        self.added.lock().clone()
    }

    pub fn approved(&self) -> Vec<(SubmissionId, UserId)> {
        self.approved.lock().clone()
    }

    pub fn contains(&self, id: TermId) -> bool {
        self.terms.lock().iter().any(|t| t.id == id)
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("database is unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl GlossaryStore for InMemoryGlossaryStore {
    async fn search(&self, query: &SearchQuery) -> anyhow::Result<Vec<Term>> {
        self.check()?;
        let needle = query.text.to_lowercase();
        Ok(self
            .terms
            .lock()
            .iter()
            .filter(|t| t.name.to_lowercase().contains(&needle))
            .filter(|t| query.category.is_none_or(|c| c == t.category_id))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn term(&self, id: TermId) -> anyhow::Result<Option<Term>> {
        self.check()?;
        Ok(self.terms.lock().iter().find(|t| t.id == id).cloned())
    }

    async fn category_by_name(&self, name: &str) -> anyhow::Result<Option<CategoryRef>> {
        self.check()?;
        Ok(self
            .categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn add_term(&self, term: &NewTerm) -> anyhow::Result<TermId> {
        self.check()?;
        let id = TermId(self.next_term_id.fetch_add(1, Ordering::SeqCst));
        self.added.lock().push(term.clone());
        self.terms.lock().push(Term {
            id,
            name: term.name.clone(),
            category_id: term.category.id,
            category_name: term.category.name.clone(),
            description: term.description.clone(),
            source: term.source.clone(),
            aliases: term.aliases.clone(),
            content_warnings: String::new(),
        });
        Ok(id)
    }

    async fn remove_term(&self, id: TermId) -> anyhow::Result<()> {
        self.check()?;
        self.terms.lock().retain(|t| t.id != id);
        Ok(())
    }

    async fn submission(&self, id: SubmissionId) -> anyhow::Result<Option<Submission>> {
        self.check()?;
        Ok(self.submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn approve_submission(&self, id: SubmissionId, approved_by: UserId) -> anyhow::Result<()> {
        self.check()?;
        self.approved.lock().push((id, approved_by));
        Ok(())
    }
}
