//! Commands that open a multi-turn interaction
//!
//! Parsing the chat command itself is the transport's job; these are the
//! already-parsed requests handed to [`crate::GlossaryCommandHandler`].

use serde::{Deserialize, Serialize};

use crate::value_objects::{ChannelId, SubmissionId, TermId, UserId};

/// Prefix that asks for the single best match instead of a listing
pub const SINGLE_RESULT_PREFIX: char = '!';

/// Search the glossary and let the user pick a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTerms {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    /// Query as typed, possibly starting with [`SINGLE_RESULT_PREFIX`]
    pub query: String,
    /// Category name to restrict the search to
    pub category: Option<String>,
    /// Leave out terms that carry content warnings
    pub no_content_warnings: bool,
    /// Tags excluded from results (the store interprets them)
    pub ignored_tags: Vec<String>,
}

impl SearchTerms {
    pub fn new(channel_id: ChannelId, user_id: UserId, query: impl Into<String>) -> Self {
        Self {
            channel_id,
            user_id,
            query: query.into(),
            category: None,
            no_content_warnings: false,
            ignored_tags: Vec::new(),
        }
    }

    /// Query text without the prefix, and the result limit it implies
    pub fn text_and_limit(&self, default_limit: usize) -> (&str, usize) {
        let query = self.query.trim();
        match query.strip_prefix(SINGLE_RESULT_PREFIX) {
            Some(rest) => (rest.trim_start(), 1),
            None => (query, default_limit),
        }
    }
}

/// Start the add-term wizard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTerm {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    /// Name given with the command, skipping the first question
    pub name: Option<String>,
}

/// Delete a term after the user confirms it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTerm {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub term_id: TermId,
}

/// Approve a pending submission after the user confirms it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveSubmission {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub submission_id: SubmissionId,
}
