use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tokenizer::{self, LinkTokens};

// Identifier of an advisor persona, e.g. "sarah-chen"
pub type AdvisorId = String;

// Define the kinds of sections a script can hold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Hero,
    Body,
    CallToAction,
}

impl SectionKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            SectionKind::Hero => "Hero",
            SectionKind::Body => "Body",
            SectionKind::CallToAction => "Call to Action",
        }
    }
}

// Define the structure for a section of marketing copy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub id: String,
    pub kind: SectionKind,
    pub title: String,
    pub content: Vec<String>,
}

impl Section {
    pub fn new(id: &str, kind: SectionKind, title: &str, content: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            content: content.iter().map(|item| item.to_string()).collect(),
        }
    }

    /// Words in the title plus every content item.
    pub fn word_count(&self, mode: LinkTokens) -> usize {
        tokenizer::word_count(&self.title, mode)
            + self
                .content
                .iter()
                .map(|item| tokenizer::word_count(item, mode))
                .sum::<usize>()
    }
}

// An ordered sequence of sections for one advisor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Script {
    pub sections: Vec<Section>,
}

impl Script {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Index of the final section, 0 for an empty script.
    pub fn last_index(&self) -> usize {
        self.sections.len().saturating_sub(1)
    }
}

/// Maximum number of tokens eligible for display in a section.
///
/// `All` is strictly greater than any finite count, so a section that has been
/// passed or a completed script can be compared against real word counts
/// without a sentinel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordBudget {
    Words(usize),
    All,
}

impl WordBudget {
    pub fn covers(&self, count: usize) -> bool {
        match self {
            WordBudget::Words(n) => *n >= count,
            WordBudget::All => true,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, WordBudget::Words(0))
    }

    /// Number of tokens visible out of `count`.
    pub fn visible_of(&self, count: usize) -> usize {
        match self {
            WordBudget::Words(n) => (*n).min(count),
            WordBudget::All => count,
        }
    }

    /// Budget left after spending `count` tokens.
    pub fn saturating_sub(self, count: usize) -> WordBudget {
        match self {
            WordBudget::Words(n) => WordBudget::Words(n.saturating_sub(count)),
            WordBudget::All => WordBudget::All,
        }
    }

    /// Budget clamped to an item's own word count.
    pub fn clamp_to(self, count: usize) -> WordBudget {
        match self {
            WordBudget::Words(n) => WordBudget::Words(n.min(count)),
            WordBudget::All => WordBudget::All,
        }
    }
}

impl Default for WordBudget {
    fn default() -> Self {
        WordBudget::Words(0)
    }
}

impl fmt::Display for WordBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordBudget::Words(n) => write!(f, "{}", n),
            WordBudget::All => write!(f, "all"),
        }
    }
}

// Per-advisor reveal cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Progress {
    pub current_section: usize,
    pub words_revealed: WordBudget,
    pub is_complete: bool,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(last_index: usize) -> Self {
        Self {
            current_section: last_index,
            words_revealed: WordBudget::All,
            is_complete: true,
        }
    }
}

// Define the structure for an advisor's public profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvisorProfile {
    pub firm: String,
    pub licenses: Vec<String>,
    pub product_interest: String,
    pub investment_strategy: String,
    pub experience: String,
    pub specialization: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorPersona {
    pub id: AdvisorId,
    pub name: String,
    pub product_focus: Option<String>,
    pub profile: Option<AdvisorProfile>,
    #[serde(skip)]
    pub script: Option<Arc<Script>>,
}

impl AdvisorPersona {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            product_focus: None,
            profile: None,
            script: None,
        }
    }

    pub fn has_script(&self) -> bool {
        self.script.is_some()
    }

    pub fn firm(&self) -> Option<&str> {
        self.profile.as_ref().map(|profile| profile.firm.as_str())
    }

    /// Name with spaces replaced by underscores, used in export file names.
    pub fn file_stem(&self) -> String {
        self.name.split_whitespace().collect::<Vec<_>>().join("_")
    }
}

/// Roster entry as exposed over the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonaSummary {
    pub id: AdvisorId,
    pub name: String,
    pub product_focus: Option<String>,
    pub profile: Option<AdvisorProfile>,
    pub has_script: bool,
    pub section_count: usize,
}

impl From<&AdvisorPersona> for PersonaSummary {
    fn from(persona: &AdvisorPersona) -> Self {
        Self {
            id: persona.id.clone(),
            name: persona.name.clone(),
            product_focus: persona.product_focus.clone(),
            profile: persona.profile.clone(),
            has_script: persona.has_script(),
            section_count: persona.script.as_ref().map_or(0, |script| script.len()),
        }
    }
}
