use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{BudgetMode, RevealConfig, Timing};
use crate::models::{Progress, Script, WordBudget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverPhase {
    Idle,
    Revealing,
    Pausing,
    Complete,
    Cancelled,
}

/// Word budget of every section of `script`, in section order.
pub fn section_budgets<R: Rng + ?Sized>(script: &Script, config: &RevealConfig, rng: &mut R) -> Vec<usize> {
    match config.budget {
        BudgetMode::Deterministic => script
            .sections
            .iter()
            .map(|section| section.word_count(config.link_tokens))
            .collect(),
        BudgetMode::Padded { min, max } => {
            let (low, high) = if min <= max { (min, max) } else { (max, min) };
            script
                .sections
                .iter()
                .map(|_| rng.gen_range(low..=high))
                .collect()
        }
    }
}

/// Advances one advisor's reveal cursor.
///
/// The driver is a plain state machine with no timers of its own: a runner
/// asks [`ProgressDriver::next_delay`] how long to wait, then calls
/// [`ProgressDriver::step`]. Every step that changes the cursor returns the
/// new snapshot.
pub struct ProgressDriver {
    script: Arc<Script>,
    budgets: Vec<usize>,
    timing: Timing,
    progress: Progress,
    phase: DriverPhase,
}

impl ProgressDriver {
    pub fn new(script: Arc<Script>, config: &RevealConfig) -> Self {
        let budgets = section_budgets(&script, config, &mut rand::thread_rng());
        Self::with_budgets(script, budgets, config.timing())
    }

    pub fn with_budgets(script: Arc<Script>, budgets: Vec<usize>, timing: Timing) -> Self {
        Self {
            script,
            budgets,
            timing,
            progress: Progress::new(),
            phase: DriverPhase::Idle,
        }
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, DriverPhase::Revealing | DriverPhase::Pausing)
    }

    pub fn script(&self) -> &Arc<Script> {
        &self.script
    }

    /// Budget of the section at `index`; sections past the budget table have none.
    pub fn total_words(&self, index: usize) -> usize {
        self.budgets.get(index).copied().unwrap_or(0)
    }

    /// Begins at section 0, word 0. Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            debug!("Driver already running, ignoring start");
            return false;
        }

        self.progress = Progress::new();
        self.phase = DriverPhase::Revealing;

        if self.script.is_empty() {
            self.complete();
        } else {
            self.settle_empty_section();
        }
        true
    }

    /// Reveals one more word of the current section.
    pub fn tick(&mut self) -> Option<Progress> {
        if self.phase != DriverPhase::Revealing {
            return None;
        }

        let total = self.total_words(self.progress.current_section);
        let revealed = match self.progress.words_revealed {
            WordBudget::Words(n) => (n + 1).min(total),
            WordBudget::All => total,
        };
        self.progress.words_revealed = WordBudget::Words(revealed);

        if revealed >= total {
            self.finish_section();
        }
        Some(self.progress)
    }

    /// Ends the inter-section pause and moves to the next section.
    pub fn advance_section(&mut self) -> Option<Progress> {
        if self.phase != DriverPhase::Pausing {
            return None;
        }

        self.progress.current_section += 1;
        self.progress.words_revealed = WordBudget::Words(0);
        self.phase = DriverPhase::Revealing;
        self.settle_empty_section();
        Some(self.progress)
    }

    /// Performs whichever transition the current phase calls for.
    pub fn step(&mut self) -> Option<Progress> {
        match self.phase {
            DriverPhase::Revealing => self.tick(),
            DriverPhase::Pausing => self.advance_section(),
            DriverPhase::Idle | DriverPhase::Complete | DriverPhase::Cancelled => None,
        }
    }

    /// Delay before the next call to [`ProgressDriver::step`], `None` when stopped.
    pub fn next_delay(&self) -> Option<Duration> {
        match self.phase {
            DriverPhase::Revealing => Some(self.timing.word_interval),
            DriverPhase::Pausing => Some(self.timing.section_pause),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        if self.phase != DriverPhase::Cancelled {
            debug!(section = self.progress.current_section, "Driver cancelled");
            self.phase = DriverPhase::Cancelled;
        }
    }

    fn settle_empty_section(&mut self) {
        if self.total_words(self.progress.current_section) == 0 {
            self.finish_section();
        }
    }

    fn finish_section(&mut self) {
        if self.progress.current_section >= self.script.last_index() {
            self.complete();
        } else {
            self.phase = DriverPhase::Pausing;
        }
    }

    fn complete(&mut self) {
        self.progress = Progress::completed(self.script.last_index());
        self.phase = DriverPhase::Complete;
        info!(sections = self.script.len(), "Reveal complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Section, SectionKind};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn timing() -> Timing {
        Timing {
            word_interval: Duration::from_millis(80),
            section_pause: Duration::from_millis(300),
        }
    }

    fn scenario_driver() -> ProgressDriver {
        let script = Script::new(vec![
            Section::new("intro", SectionKind::Hero, "Hello world", &["a b c"]),
            Section::new("outro", SectionKind::CallToAction, "Bye", &["x y"]),
        ]);
        ProgressDriver::new(Arc::new(script), &RevealConfig::default())
    }

    #[test]
    fn test_two_section_scenario() {
        let mut driver = scenario_driver();
        assert!(driver.start());
        assert_eq!(driver.total_words(0), 5);
        assert_eq!(driver.total_words(1), 3);

        let mut last = driver.progress();
        for _ in 0..5 {
            last = driver.tick().unwrap();
        }
        assert_eq!(last.current_section, 0);
        assert_eq!(last.words_revealed, WordBudget::Words(5));
        assert!(!last.is_complete);
        assert_eq!(driver.phase(), DriverPhase::Pausing);
        assert_eq!(driver.next_delay(), Some(Duration::from_millis(300)));

        // Ticks during the pause change nothing
        assert!(driver.tick().is_none());

        let advanced = driver.advance_section().unwrap();
        assert_eq!(advanced.current_section, 1);
        assert_eq!(advanced.words_revealed, WordBudget::Words(0));

        for _ in 0..3 {
            last = driver.tick().unwrap();
        }
        assert!(last.is_complete);
        assert_eq!(last.current_section, 1);
        assert_eq!(last.words_revealed, WordBudget::All);
        assert_eq!(driver.next_delay(), None);
        assert!(driver.step().is_none());
    }

    #[test]
    fn test_start_is_noop_while_running() {
        let mut driver = scenario_driver();
        assert!(driver.start());
        driver.tick();
        driver.tick();
        assert!(!driver.start());
        assert_eq!(driver.progress().words_revealed, WordBudget::Words(2));
    }

    #[test]
    fn test_restart_after_completion() {
        let mut driver = scenario_driver();
        driver.start();
        while driver.step().is_some() {}
        assert!(driver.progress().is_complete);

        assert!(driver.start());
        assert_eq!(driver.progress(), Progress::new());
    }

    #[test]
    fn test_monotonic_until_complete() {
        let mut driver = scenario_driver();
        driver.start();
        let mut previous = driver.progress();
        let mut steps = 0;
        while let Some(next) = driver.step() {
            if next.current_section == previous.current_section {
                assert!(next.words_revealed >= previous.words_revealed);
            } else {
                assert_eq!(next.current_section, previous.current_section + 1);
                assert_eq!(next.words_revealed, WordBudget::Words(0));
            }
            previous = next;
            steps += 1;
        }
        // 5 ticks, 1 advance, 3 ticks
        assert_eq!(steps, 9);
        assert!(previous.is_complete);
    }

    #[test]
    fn test_empty_script_completes_immediately() {
        let mut driver = ProgressDriver::new(Arc::new(Script::default()), &RevealConfig::default());
        assert!(driver.start());
        assert_eq!(driver.progress(), Progress::completed(0));
        assert_eq!(driver.next_delay(), None);
    }

    #[test]
    fn test_zero_word_sections_are_skipped_through() {
        let script = Script::new(vec![
            Section::new("blank", SectionKind::Hero, "", &[]),
            Section::new("body", SectionKind::Body, "Title", &["one"]),
            Section::new("tail", SectionKind::CallToAction, "", &[""]),
        ]);
        let mut driver = ProgressDriver::new(Arc::new(script), &RevealConfig::default());
        driver.start();
        assert_eq!(driver.phase(), DriverPhase::Pausing);

        let progress = driver.advance_section().unwrap();
        assert_eq!(progress.current_section, 1);
        driver.tick();
        let progress = driver.tick().unwrap();
        assert_eq!(progress.words_revealed, WordBudget::Words(2));

        // Final section has no words and completes as soon as it is entered
        let progress = driver.advance_section().unwrap();
        assert!(progress.is_complete);
        assert_eq!(progress.current_section, 2);
    }

    #[test]
    fn test_cancel_stops_emission() {
        let mut driver = scenario_driver();
        driver.start();
        driver.tick();
        driver.tick();
        driver.cancel();
        assert!(driver.tick().is_none());
        assert!(driver.step().is_none());
        assert_eq!(driver.next_delay(), None);
        assert_eq!(driver.progress().words_revealed, WordBudget::Words(2));
    }

    #[test]
    fn test_padded_budgets_within_range() {
        let script = Script::new(vec![
            Section::new("a", SectionKind::Hero, "x", &[]),
            Section::new("b", SectionKind::Body, "y", &[]),
            Section::new("c", SectionKind::Body, "z", &[]),
        ]);
        let config = RevealConfig {
            budget: BudgetMode::Padded { min: 50, max: 150 },
            ..RevealConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let budgets = section_budgets(&script, &config, &mut rng);
            assert_eq!(budgets.len(), 3);
            assert!(budgets.iter().all(|b| (50..=150).contains(b)));
        }

        // Swapped bounds are tolerated
        let swapped = RevealConfig {
            budget: BudgetMode::Padded { min: 9, max: 3 },
            ..RevealConfig::default()
        };
        let budgets = section_budgets(&script, &swapped, &mut rng);
        assert!(budgets.iter().all(|b| (3..=9).contains(b)));
    }

    #[test]
    fn test_padded_budget_stalls_then_advances() {
        // A budget larger than the text keeps ticking past the last word
        let script = Script::new(vec![
            Section::new("a", SectionKind::Hero, "x", &[]),
            Section::new("b", SectionKind::Body, "y", &[]),
        ]);
        let mut driver = ProgressDriver::with_budgets(Arc::new(script), vec![3, 1], timing());
        driver.start();
        assert_eq!(driver.tick().unwrap().words_revealed, WordBudget::Words(1));
        assert_eq!(driver.tick().unwrap().words_revealed, WordBudget::Words(2));
        assert_eq!(driver.tick().unwrap().words_revealed, WordBudget::Words(3));
        assert_eq!(driver.phase(), DriverPhase::Pausing);
    }
}
