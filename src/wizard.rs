use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{StudioError, StudioResult};
use crate::models::{AdvisorId, AdvisorPersona};

pub const TOPICS: [&str; 6] = [
    "ETF",
    "SMA",
    "Model Portfolios",
    "Portfolio Construction",
    "Fixed Income",
    "Growth",
];

pub const REQUIRED_ADVISORS: usize = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    DateRange,
    Research,
    Topics,
    Advisors,
    Profiles,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> StudioResult<Self> {
        if from > to {
            return Err(StudioError::InvalidDateRange {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(Self { from, to })
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            to: NaiveDate::from_ymd_opt(2025, 7, 27).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WizardState {
    pub step: WizardStep,
    pub date_range: DateRange,
    pub topic: Option<String>,
    pub selected: Vec<AdvisorId>,
}

/// Result of stepping back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackOutcome {
    pub step: WizardStep,
    /// Generated progress must be cancelled and thrown away.
    pub discard_progress: bool,
}

/// Linear navigation through the content wizard.
#[derive(Debug, Clone)]
pub struct Wizard {
    state: WizardState,
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            state: WizardState {
                step: WizardStep::DateRange,
                date_range: DateRange::default(),
                topic: None,
                selected: Vec::new(),
            },
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn step(&self) -> WizardStep {
        self.state.step
    }

    pub fn selected(&self) -> &[AdvisorId] {
        &self.state.selected
    }

    fn expect_step(&self, expected: WizardStep) -> StudioResult<()> {
        if self.state.step != expected {
            return Err(StudioError::WrongStep {
                expected,
                actual: self.state.step,
            });
        }
        Ok(())
    }

    fn move_to(&mut self, step: WizardStep) {
        info!(from = ?self.state.step, to = ?step, "Wizard step");
        self.state.step = step;
    }

    /// Confirms the date range and starts the research animation.
    pub fn submit_date_range(&mut self, range: DateRange) -> StudioResult<()> {
        self.expect_step(WizardStep::DateRange)?;
        self.state.date_range = range;
        self.move_to(WizardStep::Research);
        Ok(())
    }

    pub fn finish_research(&mut self) -> StudioResult<()> {
        self.expect_step(WizardStep::Research)?;
        self.move_to(WizardStep::Topics);
        Ok(())
    }

    pub fn select_topic(&mut self, topic: &str) -> StudioResult<()> {
        self.expect_step(WizardStep::Topics)?;
        let topic = TOPICS
            .iter()
            .find(|known| known.eq_ignore_ascii_case(topic.trim()))
            .ok_or_else(|| StudioError::UnknownTopic(topic.to_string()))?;
        self.state.topic = Some(topic.to_string());
        self.move_to(WizardStep::Advisors);
        Ok(())
    }

    /// Selects or deselects an advisor. Returns whether it is selected afterwards.
    pub fn toggle_advisor(&mut self, persona: &AdvisorPersona) -> StudioResult<bool> {
        self.expect_step(WizardStep::Advisors)?;

        if let Some(position) = self.state.selected.iter().position(|id| *id == persona.id) {
            self.state.selected.remove(position);
            return Ok(false);
        }
        if !persona.has_script() {
            return Err(StudioError::NoScript(persona.name.clone()));
        }
        if self.state.selected.len() >= REQUIRED_ADVISORS {
            return Err(StudioError::SelectionFull {
                max: REQUIRED_ADVISORS,
            });
        }
        self.state.selected.push(persona.id.clone());
        Ok(true)
    }

    pub fn proceed_to_profiles(&mut self) -> StudioResult<()> {
        self.expect_step(WizardStep::Advisors)?;
        if self.state.selected.len() != REQUIRED_ADVISORS {
            return Err(StudioError::SelectionIncomplete {
                required: REQUIRED_ADVISORS,
                selected: self.state.selected.len(),
            });
        }
        self.move_to(WizardStep::Profiles);
        Ok(())
    }

    pub fn back(&mut self) -> BackOutcome {
        let (step, discard_progress) = match self.state.step {
            WizardStep::Profiles => {
                self.state.selected.clear();
                (WizardStep::Advisors, true)
            }
            WizardStep::Advisors => {
                self.state.topic = None;
                (WizardStep::Topics, false)
            }
            WizardStep::Topics | WizardStep::Research | WizardStep::DateRange => {
                (WizardStep::DateRange, false)
            }
        };
        self.move_to(step);
        BackOutcome {
            step,
            discard_progress,
        }
    }
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}
