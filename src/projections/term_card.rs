//! Single-term view used for search answers, previews and confirmations

use serde::{Deserialize, Serialize};

use crate::value_objects::{NewTerm, Submission, Term};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermCard {
    pub title: String,
    pub description: String,
    pub category: String,
    pub source: String,
    pub aliases: Vec<String>,
    pub content_warnings: Option<String>,
    pub footer: Option<String>,
}

impl TermCard {
    pub fn from_term(term: &Term) -> Self {
        Self {
            title: term.name.clone(),
            description: term.description.clone(),
            category: term.category_name.clone(),
            source: term.source.clone(),
            aliases: term.aliases.clone(),
            content_warnings: term.has_content_warnings().then(|| term.content_warnings.clone()),
            footer: Some(format!("ID: {}", term.id)),
        }
    }

    /// Preview of a term that has not been stored yet
    pub fn preview(term: &NewTerm) -> Self {
        Self {
            title: term.name.clone(),
            description: term.description.clone(),
            category: term.category.name.clone(),
            source: term.source.clone(),
            aliases: term.aliases.clone(),
            content_warnings: None,
            footer: None,
        }
    }

    pub fn from_submission(submission: &Submission) -> Self {
        Self {
            title: format!("Submission #{}", submission.id),
            description: submission.summary.clone(),
            category: String::new(),
            source: String::new(),
            aliases: Vec::new(),
            content_warnings: None,
            footer: Some(format!("Submitted by {}", submission.submitted_by)),
        }
    }
}
