//! Term draft aggregate - a glossary term under construction
//!
//! The draft is built one field at a time, in a fixed order:
//! name, category, description, source, aliases. Each answer is validated
//! before it is written; a rejected answer leaves the draft (and its step)
//! untouched so the wizard can simply ask again. Nothing leaves the draft
//! until [`TermDraft::finish`] confirms every field was populated by its step.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::InteractionConfig;
use crate::error::{InteractionError, InteractionResult};
use crate::value_objects::{CategoryRef, NewTerm};

/// Wizard step, one per draft field plus the final confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WizardStep {
    AskName,
    AskCategory,
    AskDescription,
    AskSource,
    AskAliases,
    Confirm,
}

impl WizardStep {
    /// Step that follows a successful answer
    pub fn next(self) -> Self {
        match self {
            WizardStep::AskName => WizardStep::AskCategory,
            WizardStep::AskCategory => WizardStep::AskDescription,
            WizardStep::AskDescription => WizardStep::AskSource,
            WizardStep::AskSource => WizardStep::AskAliases,
            WizardStep::AskAliases | WizardStep::Confirm => WizardStep::Confirm,
        }
    }

    pub fn field(self) -> &'static str {
        match self {
            WizardStep::AskName => "name",
            WizardStep::AskCategory => "category",
            WizardStep::AskDescription => "description",
            WizardStep::AskSource => "source",
            WizardStep::AskAliases => "aliases",
            WizardStep::Confirm => "confirmation",
        }
    }
}

/// Why an answer was not accepted. Shown to the user, then the step repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldRejection {
    Empty(&'static str),
    DescriptionTooLong { length: usize, max: usize },
    UnknownCategory(String),
    /// The answer does not belong to the current step
    UnexpectedAnswer(WizardStep),
}

impl fmt::Display for FieldRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRejection::Empty(field) => write!(f, "The {field} can't be empty, please try again."),
            FieldRejection::DescriptionTooLong { length, max } => write!(
                f,
                "Description too long ({length} characters, maximum {max}). Please try again."
            ),
            FieldRejection::UnknownCategory(name) => write!(
                f,
                "Could not find a category named `{name}`. Please type an existing category:"
            ),
            FieldRejection::UnexpectedAnswer(step) => {
                write!(f, "That answer doesn't fit here, expected the {}.", step.field())
            }
        }
    }
}

/// An answer to the current step
#[derive(Debug, Clone, Copy)]
pub enum StepAnswer<'a> {
    /// Free text for name, description, source or aliases
    Text(&'a str),
    /// Category name as typed, with the store's resolution of it
    Category {
        typed: &'a str,
        resolved: Option<&'a CategoryRef>,
    },
}

/// Limits applied while validating answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRules {
    pub max_description_chars: usize,
    pub no_aliases_keyword: String,
}

impl From<&InteractionConfig> for DraftRules {
    fn from(config: &InteractionConfig) -> Self {
        Self {
            max_description_chars: config.max_description_chars,
            no_aliases_keyword: config.no_aliases_keyword.clone(),
        }
    }
}

impl Default for DraftRules {
    fn default() -> Self {
        Self::from(&InteractionConfig::default())
    }
}

/// A term under construction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TermDraft {
    name: Option<String>,
    category: Option<CategoryRef>,
    description: Option<String>,
    source: Option<String>,
    aliases: Option<Vec<String>>,
}

impl TermDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn category(&self) -> Option<&CategoryRef> {
        self.category.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn aliases(&self) -> Option<&[String]> {
        self.aliases.as_deref()
    }

    /// Step the draft is waiting on: the first field still missing
    pub fn step(&self) -> WizardStep {
        if self.name.is_none() {
            WizardStep::AskName
        } else if self.category.is_none() {
            WizardStep::AskCategory
        } else if self.description.is_none() {
            WizardStep::AskDescription
        } else if self.source.is_none() {
            WizardStep::AskSource
        } else if self.aliases.is_none() {
            WizardStep::AskAliases
        } else {
            WizardStep::Confirm
        }
    }

    pub fn is_complete(&self) -> bool {
        self.step() == WizardStep::Confirm
    }

    /// Validate an answer for the current step and record it.
    ///
    /// Returns the step to ask next. On rejection the draft is unchanged.
    pub fn apply(&mut self, answer: StepAnswer<'_>, rules: &DraftRules) -> Result<WizardStep, FieldRejection> {
        let step = self.step();
        match (step, answer) {
            (WizardStep::AskName, StepAnswer::Text(text)) => {
                self.name = Some(non_empty(text, "name")?);
            }
            (WizardStep::AskCategory, StepAnswer::Category { typed, resolved }) => {
                let category = resolved.ok_or_else(|| FieldRejection::UnknownCategory(typed.trim().to_string()))?;
                self.category = Some(category.clone());
            }
            (WizardStep::AskDescription, StepAnswer::Text(text)) => {
                let description = non_empty(text, "description")?;
                let length = description.chars().count();
                if length > rules.max_description_chars {
                    return Err(FieldRejection::DescriptionTooLong {
                        length,
                        max: rules.max_description_chars,
                    });
                }
                self.description = Some(description);
            }
            (WizardStep::AskSource, StepAnswer::Text(text)) => {
                self.source = Some(non_empty(text, "source")?);
            }
            (WizardStep::AskAliases, StepAnswer::Text(text)) => {
                self.aliases = Some(parse_aliases(text, &rules.no_aliases_keyword));
            }
            (step, _) => return Err(FieldRejection::UnexpectedAnswer(step)),
        }
        Ok(step.next())
    }

    /// Turn a complete draft into a term ready for persistence
    pub fn finish(&self) -> InteractionResult<NewTerm> {
        let missing = |field| InteractionError::IncompleteDraft(field);
        Ok(NewTerm {
            name: self.name.clone().ok_or_else(|| missing("name"))?,
            category: self.category.clone().ok_or_else(|| missing("category"))?,
            description: self.description.clone().ok_or_else(|| missing("description"))?,
            source: self.source.clone().ok_or_else(|| missing("source"))?,
            aliases: self.aliases.clone().ok_or_else(|| missing("aliases"))?,
        })
    }
}

fn non_empty(text: &str, field: &'static str) -> Result<String, FieldRejection> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FieldRejection::Empty(field));
    }
    Ok(trimmed.to_string())
}

/// Newline separated alias list; the "none" keyword means no aliases
pub fn parse_aliases(text: &str, none_keyword: &str) -> Vec<String> {
    if text.trim() == none_keyword {
        return Vec::new();
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
