//! Value objects for the glossary interaction domain

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake_id!(
    /// Chat channel identifier
    ChannelId
);
snowflake_id!(
    /// Chat user identifier
    UserId
);
snowflake_id!(
    /// Chat message identifier
    MessageId
);

/// Glossary term identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TermId(pub i64);

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pending user submission identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub i64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message in a specific channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

impl MessageRef {
    pub fn new(channel_id: ChannelId, message_id: MessageId) -> Self {
        Self {
            channel_id,
            message_id,
        }
    }
}

/// A stored glossary term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub description: String,
    pub source: String,
    pub aliases: Vec<String>,
    /// Content warnings, empty when the term has none
    pub content_warnings: String,
}

impl Term {
    pub fn has_content_warnings(&self) -> bool {
        !self.content_warnings.trim().is_empty()
    }
}

/// A fully validated term ready to be persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTerm {
    pub name: String,
    pub category: CategoryRef,
    pub description: String,
    pub source: String,
    pub aliases: Vec<String>,
}

/// A category resolved from the name the user typed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
}

/// A user-submitted entry waiting for staff approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub submitted_by: UserId,
    pub summary: String,
}

/// Parameters passed through to the store's search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub category: Option<CategoryId>,
    pub limit: usize,
    pub ignored_tags: Vec<String>,
}

/// Keycap emoji used as positional signals, in position order
pub const POSITION_EMOJI: [&str; 10] = [
    "1\u{fe0f}\u{20e3}",
    "2\u{fe0f}\u{20e3}",
    "3\u{fe0f}\u{20e3}",
    "4\u{fe0f}\u{20e3}",
    "5\u{fe0f}\u{20e3}",
    "6\u{fe0f}\u{20e3}",
    "7\u{fe0f}\u{20e3}",
    "8\u{fe0f}\u{20e3}",
    "9\u{fe0f}\u{20e3}",
    "\u{1f51f}",
];

pub const ACCEPT_EMOJI: &str = "\u{2705}";
pub const REJECT_EMOJI: &str = "\u{274c}";

pub const ACCEPT_COMPONENT: &str = "accept";
pub const REJECT_COMPONENT: &str = "reject";

/// Page navigation actions on a result listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageAction {
    First,
    Previous,
    Next,
    Last,
    Close,
}

impl PageAction {
    pub const ALL: [PageAction; 5] = [
        PageAction::First,
        PageAction::Previous,
        PageAction::Next,
        PageAction::Last,
        PageAction::Close,
    ];

    pub fn emoji(self) -> &'static str {
        match self {
            PageAction::First => "\u{23ea}",
            PageAction::Previous => "\u{2b05}\u{fe0f}",
            PageAction::Next => "\u{27a1}\u{fe0f}",
            PageAction::Last => "\u{23e9}",
            PageAction::Close => REJECT_EMOJI,
        }
    }

    pub fn component_id(self) -> &'static str {
        match self {
            PageAction::First => "first",
            PageAction::Previous => "prev",
            PageAction::Next => "next",
            PageAction::Last => "last",
            PageAction::Close => "cross",
        }
    }

    /// Page index after applying this action, wrapping at both ends
    pub fn apply(self, current: usize, page_count: usize) -> usize {
        if page_count == 0 {
            return 0;
        }
        match self {
            PageAction::First => 0,
            PageAction::Last => page_count - 1,
            PageAction::Previous => (current + page_count - 1) % page_count,
            PageAction::Next => (current + 1) % page_count,
            PageAction::Close => current,
        }
    }
}

/// Component identifier of the button for 1-based position `n`
pub fn position_component_id(n: usize) -> String {
    n.to_string()
}
