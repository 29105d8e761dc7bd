//! Read models shown to the user
//!
//! These are plain data views of terms and result pages. Turning them into
//! embeds, buttons or plain text is the transport's job.

use serde::{Deserialize, Serialize};

pub mod term_card;

pub use term_card::TermCard;

use crate::value_objects::{POSITION_EMOJI, Term};

const SNIPPET_CHARS: usize = 100;

/// One page of a result listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    pub title: String,
    pub lines: Vec<String>,
    pub footer: String,
    /// Navigation hint, only present when there is more than one page
    pub usage: Option<String>,
}

/// Render page `index` (0-based) of a listing split into `pages`
pub fn render_result_page(query: &str, index: usize, pages: &[Vec<Term>]) -> ResultPage {
    let total: usize = pages.iter().map(Vec::len).sum();
    let items = pages.get(index).map(Vec::as_slice).unwrap_or_default();

    let lines = items
        .iter()
        .zip(POSITION_EMOJI)
        .map(|(term, emoji)| format!("{emoji} **{}**\n{}", display_name(term), snippet(&term.description)))
        .collect();

    ResultPage {
        title: format!("Search results for \"{query}\""),
        lines,
        footer: format!("Results: {total} | Page {}/{}", index + 1, pages.len().max(1)),
        usage: (pages.len() > 1).then(|| {
            "Use \u{2b05}\u{fe0f} \u{27a1}\u{fe0f} to navigate between pages and the numbers to choose a term."
                .to_string()
        }),
    }
}

/// Name followed by its aliases, if any
pub fn display_name(term: &Term) -> String {
    if term.aliases.is_empty() {
        term.name.clone()
    } else {
        format!("{} ({})", term.name, term.aliases.join(", "))
    }
}

fn snippet(description: &str) -> String {
    let mut chars = description.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head.trim_end())
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{CategoryId, TermId};

    fn term(id: i64, description: &str) -> Term {
        Term {
            id: TermId(id),
            name: format!("term {id}"),
            category_id: CategoryId(1),
            category_name: "Orientation".to_string(),
            description: description.to_string(),
            source: "source".to_string(),
            aliases: if id == 0 { vec!["alias".to_string()] } else { Vec::new() },
            content_warnings: String::new(),
        }
    }

    #[test]
    fn test_page_render() {
        let pages = vec![
            (0..5).map(|i| term(i, "short")).collect::<Vec<_>>(),
            vec![term(5, &"long ".repeat(40))],
        ];

        let first = render_result_page("ace", 0, &pages);
        assert_eq!(first.title, "Search results for \"ace\"");
        assert_eq!(first.lines.len(), 5);
        assert!(first.lines[0].starts_with(POSITION_EMOJI[0]));
        assert!(first.lines[0].contains("term 0 (alias)"));
        assert_eq!(first.footer, "Results: 6 | Page 1/2");
        assert!(first.usage.is_some());

        let second = render_result_page("ace", 1, &pages);
        assert_eq!(second.lines.len(), 1);
        assert!(second.lines[0].ends_with("..."));
        assert_eq!(second.footer, "Results: 6 | Page 2/2");
    }

    #[test]
    fn test_single_page_has_no_usage_hint() {
        let pages = vec![vec![term(1, "a"), term(2, "b")]];
        assert!(render_result_page("q", 0, &pages).usage.is_none());
    }
}
