//! Pure projection from a script and a progress snapshot to the partial text
//! a presenter should display.
//!
//! Within a section the title is revealed first, followed by the content
//! items in declaration order. Every function here is deterministic, so a
//! presenter can re-render from any snapshot at any time.

use std::borrow::Cow;

use serde::Serialize;

use crate::models::{Progress, Script, Section, SectionKind, WordBudget};
use crate::tokenizer::{self, LinkTokens};

pub fn is_section_visible(progress: &Progress, section_index: usize) -> bool {
    section_index <= progress.current_section
}

pub fn word_progress_for(progress: &Progress, section_index: usize) -> WordBudget {
    if progress.is_complete || section_index < progress.current_section {
        WordBudget::All
    } else if section_index > progress.current_section {
        WordBudget::Words(0)
    } else {
        progress.words_revealed
    }
}

/// First `budget` tokens of `full_text` joined by single spaces, or the text
/// unmodified once the budget covers every token.
pub fn revealed_text<'a>(full_text: &'a str, budget: WordBudget, mode: LinkTokens) -> Cow<'a, str> {
    let tokens = tokenizer::tokens(full_text, mode);
    if budget.covers(tokens.len()) {
        return Cow::Borrowed(full_text);
    }
    Cow::Owned(tokens[..budget.visible_of(tokens.len())].join(" "))
}

/// The token right after the visible boundary, if any.
pub fn typing_token<'a>(full_text: &'a str, budget: WordBudget, mode: LinkTokens) -> Option<&'a str> {
    match budget {
        WordBudget::All => None,
        WordBudget::Words(n) => tokenizer::tokens(full_text, mode).get(n).copied(),
    }
}

/// Local budgets for a section's title and each of its items.
pub fn item_budgets(section: &Section, budget: WordBudget, mode: LinkTokens) -> (WordBudget, Vec<WordBudget>) {
    let title_words = tokenizer::word_count(&section.title, mode);
    let title_budget = budget.clamp_to(title_words);
    let mut remaining = budget.saturating_sub(title_words);

    let items = section
        .content
        .iter()
        .map(|item| {
            let words = tokenizer::word_count(item, mode);
            let local = remaining.clamp_to(words);
            remaining = remaining.saturating_sub(words);
            local
        })
        .collect();

    (title_budget, items)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub text: String,
    pub typing: Option<String>,
    pub complete: bool,
}

impl ItemView {
    fn build(full_text: &str, budget: WordBudget, mode: LinkTokens) -> Option<Self> {
        if budget.is_zero() {
            return None;
        }
        let complete = budget.covers(tokenizer::word_count(full_text, mode));
        Some(Self {
            text: revealed_text(full_text, budget, mode).into_owned(),
            typing: typing_token(full_text, budget, mode).map(str::to_string),
            complete,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub index: usize,
    pub id: String,
    pub kind: SectionKind,
    pub title: Option<ItemView>,
    pub items: Vec<ItemView>,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptView {
    pub sections: Vec<SectionView>,
    pub is_complete: bool,
}

pub fn project_section(section: &Section, index: usize, budget: WordBudget, mode: LinkTokens) -> SectionView {
    let (title_budget, budgets) = item_budgets(section, budget, mode);
    SectionView {
        index,
        id: section.id.clone(),
        kind: section.kind,
        title: ItemView::build(&section.title, title_budget, mode),
        items: section
            .content
            .iter()
            .zip(budgets)
            .filter_map(|(item, local)| ItemView::build(item, local, mode))
            .collect(),
        complete: budget.covers(section.word_count(mode)),
    }
}

/// Builds the view of every visible section.
pub fn project(script: &Script, progress: &Progress, mode: LinkTokens) -> ScriptView {
    let sections = script
        .sections
        .iter()
        .enumerate()
        .filter(|(index, _)| progress.is_complete || is_section_visible(progress, *index))
        .map(|(index, section)| {
            project_section(section, index, word_progress_for(progress, index), mode)
        })
        .collect();

    ScriptView {
        sections,
        is_complete: progress.is_complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_section_script() -> Script {
        Script::new(vec![
            Section::new("intro", SectionKind::Hero, "Hello world", &["a b c"]),
            Section::new("outro", SectionKind::CallToAction, "Bye", &["x y"]),
        ])
    }

    fn at(current_section: usize, words: usize) -> Progress {
        Progress {
            current_section,
            words_revealed: WordBudget::Words(words),
            is_complete: false,
        }
    }

    #[test]
    fn test_visibility_and_section_progress() {
        let progress = at(1, 2);
        assert!(is_section_visible(&progress, 0));
        assert!(is_section_visible(&progress, 1));
        assert!(!is_section_visible(&progress, 2));

        assert_eq!(word_progress_for(&progress, 0), WordBudget::All);
        assert_eq!(word_progress_for(&progress, 1), WordBudget::Words(2));
        assert_eq!(word_progress_for(&progress, 2), WordBudget::Words(0));
        assert_eq!(word_progress_for(&Progress::completed(1), 1), WordBudget::All);
    }

    #[test]
    fn test_revealed_text_boundaries() {
        let text = "one  two three";
        assert_eq!(revealed_text(text, WordBudget::Words(0), LinkTokens::Atomic), "");
        assert_eq!(revealed_text(text, WordBudget::Words(2), LinkTokens::Atomic), "one two");
        // Full budget returns the text untouched, spacing included
        assert_eq!(revealed_text(text, WordBudget::Words(3), LinkTokens::Atomic), text);
        assert_eq!(revealed_text(text, WordBudget::Words(99), LinkTokens::Atomic), text);
        assert_eq!(revealed_text(text, WordBudget::All, LinkTokens::Atomic), text);
    }

    #[test]
    fn test_typing_token() {
        assert_eq!(typing_token("a b c", WordBudget::Words(1), LinkTokens::Atomic), Some("b"));
        assert_eq!(typing_token("a b c", WordBudget::Words(3), LinkTokens::Atomic), None);
        assert_eq!(typing_token("a b c", WordBudget::All, LinkTokens::Atomic), None);
    }

    #[test]
    fn test_item_budgets_title_first() {
        let section = Section::new("s", SectionKind::Body, "T1 T2", &["a b c", "d e"]);

        let (title, items) = item_budgets(&section, WordBudget::Words(1), LinkTokens::Atomic);
        assert_eq!(title, WordBudget::Words(1));
        assert_eq!(items, vec![WordBudget::Words(0), WordBudget::Words(0)]);

        let (title, items) = item_budgets(&section, WordBudget::Words(6), LinkTokens::Atomic);
        assert_eq!(title, WordBudget::Words(2));
        assert_eq!(items, vec![WordBudget::Words(3), WordBudget::Words(1)]);

        let (_, items) = item_budgets(&section, WordBudget::Words(50), LinkTokens::Atomic);
        assert_eq!(items, vec![WordBudget::Words(3), WordBudget::Words(2)]);
    }

    #[test]
    fn test_scenario_projection() {
        let script = two_section_script();

        // Three words in: title complete, first item shows one word
        let view = project(&script, &at(0, 3), LinkTokens::Atomic);
        assert_eq!(view.sections.len(), 1);
        let intro = &view.sections[0];
        assert_eq!(intro.title.as_ref().unwrap().text, "Hello world");
        assert!(intro.title.as_ref().unwrap().complete);
        assert_eq!(intro.items[0].text, "a");
        assert_eq!(intro.items[0].typing.as_deref(), Some("b"));
        assert!(!intro.complete);

        // Second section started: first section is fully shown
        let view = project(&script, &at(1, 1), LinkTokens::Atomic);
        assert_eq!(view.sections.len(), 2);
        assert!(view.sections[0].complete);
        assert_eq!(view.sections[0].items[0].text, "a b c");
        assert_eq!(view.sections[1].title.as_ref().unwrap().text, "Bye");
        assert!(view.sections[1].items.is_empty());
    }

    #[test]
    fn test_item_hidden_at_zero_budget() {
        let script = two_section_script();
        let view = project(&script, &at(0, 0), LinkTokens::Atomic);
        assert!(view.sections[0].title.is_none());
        assert!(view.sections[0].items.is_empty());
    }

    #[test]
    fn test_final_render_is_idempotent() {
        let script = two_section_script();
        let done = Progress::completed(script.last_index());
        let first = project(&script, &done, LinkTokens::Atomic);
        let second = project(&script, &done, LinkTokens::Atomic);
        assert_eq!(first, second);
        assert!(first.is_complete);
        assert!(first.sections.iter().all(|section| section.complete));
        assert_eq!(first.sections[1].items[0].text, "x y");
    }

    #[test]
    fn test_no_skipping() {
        // Growing the budget by one reveals exactly one more token overall
        let section = Section::new("s", SectionKind::Body, "T1 T2", &["a b c", "d e"]);
        let total = section.word_count(LinkTokens::Atomic);
        let mut previous = 0;
        for n in 0..=total {
            let view = project_section(&section, 0, WordBudget::Words(n), LinkTokens::Atomic);
            let shown: usize = view
                .title
                .iter()
                .chain(view.items.iter())
                .map(|item| tokenizer::word_count(&item.text, LinkTokens::Atomic))
                .sum();
            assert_eq!(shown, n);
            assert!(shown >= previous);
            previous = shown;
        }
    }

    #[test]
    fn test_link_revealed_whole() {
        let text = r#"park cash in <a href="https://example.com/term" class="underline">TERM fund</a> today"#;
        let partial = revealed_text(text, WordBudget::Words(4), LinkTokens::Atomic);
        assert!(partial.ends_with("</a>"));
        let split = revealed_text(text, WordBudget::Words(4), LinkTokens::Whitespace);
        assert!(!split.contains("</a>"));
    }
}
