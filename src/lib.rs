//! Glossary dialog module
//!
//! This crate is the multi-turn interaction core of a chat glossary bot.
//! Command handlers suspend while they wait for a specific user's next
//! message or reaction, and resume when it arrives. It provides:
//! - Normalization of upstream gateway events into a small closed set
//! - A waiter registry that delivers each event to at most one waiter,
//!   oldest first, with deadlines and cancellation
//! - Per-interaction session state
//! - Paginated disambiguation of search results
//! - A step-by-step wizard for adding terms
//! - A confirmation gate for destructive actions
//!
//! The chat transport and the glossary store are outside this crate and are
//! reached through the traits in [`collaborators`].

pub mod aggregate;
pub mod collaborators;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod projections;
pub mod routing;
pub mod runtime;
pub mod session;
pub mod value_objects;

// Re-export main types
pub use aggregate::{DraftRules, FieldRejection, StepAnswer, TermDraft, WizardStep};

pub use collaborators::{GlossaryStore, Outbound};

pub use commands::{AddTerm, ApproveSubmission, DeleteTerm, SearchTerms};

pub use config::{InteractionConfig, SignalStyle};

pub use error::{InteractionError, InteractionResult};

pub use events::{EventNormalizer, InboundEvent, MessageEvent, RawEvent, Signal, SignalEvent, normalize};

pub use handlers::{
    Confirmation, ConfirmationGate, Disambiguation, GatedAction, GlossaryCommandHandler, PageState,
    Paginator, TermWizard, WizardOutcome,
};

pub use projections::{ResultPage, TermCard};

pub use routing::{Dispatcher, Scope, WaitOutcome, WaitSpec, WaiterHandle, WaiterId};

pub use runtime::InteractionRuntime;

pub use session::{SessionKey, SessionMeta, SessionStore};

pub use value_objects::{
    CategoryId, CategoryRef, ChannelId, MessageId, MessageRef, NewTerm, PageAction, SearchQuery,
    Submission, SubmissionId, Term, TermId, UserId,
};
