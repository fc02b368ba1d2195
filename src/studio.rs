use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::board::{ProgressBoard, ProgressEvent, StartOutcome};
use crate::clock::Clock;
use crate::config::{AppConfig, PrerollConfig};
use crate::error::{StudioError, StudioResult};
use crate::export;
use crate::models::{AdvisorId, AdvisorPersona, Progress};
use crate::projector::{self, ScriptView};
use crate::research::{self, ResearchPlan, ResearchProgress};
use crate::scripts::Roster;
use crate::wizard::{BackOutcome, DateRange, Wizard, WizardState, WizardStep};

#[derive(Debug, Clone, Serialize)]
pub struct GenerationStart {
    pub advisor: AdvisorId,
    pub outcome: StartOutcome,
}

/// The wizard, its roster and the reveal runs of one session.
pub struct Studio {
    roster: Arc<Roster>,
    clock: Arc<dyn Clock>,
    preroll: PrerollConfig,
    wizard: Mutex<Wizard>,
    board: ProgressBoard,
    research: watch::Sender<ResearchProgress>,
    research_stale: Mutex<Arc<AtomicBool>>,
}

impl Studio {
    pub fn new(roster: Arc<Roster>, clock: Arc<dyn Clock>, config: &AppConfig) -> Self {
        let (research, _) = watch::channel(ResearchProgress::idle());
        Self {
            roster,
            board: ProgressBoard::new(clock.clone(), config.reveal.clone()),
            clock,
            preroll: config.preroll.clone(),
            wizard: Mutex::new(Wizard::new()),
            research,
            research_stale: Mutex::new(Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn board(&self) -> &ProgressBoard {
        &self.board
    }

    pub fn preroll(&self) -> &PrerollConfig {
        &self.preroll
    }

    pub fn wizard_state(&self) -> WizardState {
        self.wizard.lock().state().clone()
    }

    pub fn persona(&self, advisor: &str) -> StudioResult<&AdvisorPersona> {
        self.roster
            .find(advisor)
            .ok_or_else(|| StudioError::UnknownAdvisor(advisor.to_string()))
    }

    pub fn submit_date_range(&self, range: DateRange) -> StudioResult<WizardState> {
        let mut wizard = self.wizard.lock();
        wizard.submit_date_range(range)?;
        Ok(wizard.state().clone())
    }

    /// Moves on to topic selection, stopping any research still playing.
    pub fn finish_research(&self) -> StudioResult<WizardState> {
        let mut wizard = self.wizard.lock();
        wizard.finish_research()?;
        self.research_stale.lock().store(true, Ordering::Release);
        Ok(wizard.state().clone())
    }

    pub fn select_topic(&self, topic: &str) -> StudioResult<WizardState> {
        let mut wizard = self.wizard.lock();
        wizard.select_topic(topic)?;
        Ok(wizard.state().clone())
    }

    pub fn toggle_advisor(&self, advisor: &str) -> StudioResult<bool> {
        let persona = self.persona(advisor)?;
        self.wizard.lock().toggle_advisor(persona)
    }

    pub fn proceed_to_profiles(&self) -> StudioResult<WizardState> {
        let mut wizard = self.wizard.lock();
        wizard.proceed_to_profiles()?;
        Ok(wizard.state().clone())
    }

    /// Steps back, cancelling research and discarding runs when leaving the
    /// profile step.
    pub fn back(&self) -> BackOutcome {
        let outcome = self.wizard.lock().back();
        self.research_stale.lock().store(true, Ordering::Release);
        if outcome.discard_progress {
            info!("Discarding generated content");
            self.board.cancel_all();
        }
        outcome
    }

    fn selected_for_generation(&self) -> StudioResult<Vec<AdvisorId>> {
        let wizard = self.wizard.lock();
        if wizard.step() != WizardStep::Profiles {
            return Err(StudioError::WrongStep {
                expected: WizardStep::Profiles,
                actual: wizard.step(),
            });
        }
        Ok(wizard.selected().to_vec())
    }

    /// Starts one reveal per selected advisor.
    pub fn generate(&self) -> StudioResult<Vec<GenerationStart>> {
        let selected = self.selected_for_generation()?;
        Ok(selected
            .into_iter()
            .map(|advisor| {
                let outcome = self.board.start(&advisor, self.roster.script_for(&advisor));
                GenerationStart { advisor, outcome }
            })
            .collect())
    }

    /// Plays the generation pre-roll, then starts the reveals. Returns `None`
    /// if the user stepped back while the pre-roll was playing.
    pub async fn generate_with_preroll(&self) -> StudioResult<Option<Vec<GenerationStart>>> {
        self.selected_for_generation()?;
        if self.preroll.enabled {
            let plan = ResearchPlan::generation_preroll();
            if !self.play_research(&plan).await {
                warn!("Generation pre-roll cancelled");
                return Ok(None);
            }
        }
        self.generate().map(Some)
    }

    /// Plays `plan` on the shared research channel. Any earlier sequence is
    /// cancelled first.
    pub async fn play_research(&self, plan: &ResearchPlan) -> bool {
        let stale = Arc::new(AtomicBool::new(false));
        {
            let mut current = self.research_stale.lock();
            current.store(true, Ordering::Release);
            *current = stale.clone();
        }
        research::play(plan, self.clock.as_ref(), &self.preroll, &self.research, &stale).await
    }

    pub fn subscribe_research(&self) -> watch::Receiver<ResearchProgress> {
        self.research.subscribe()
    }

    pub fn progress(&self, advisor: &str) -> StudioResult<ProgressEvent> {
        let persona = self.persona(advisor)?;
        self.board
            .snapshot(&persona.id)
            .ok_or_else(|| StudioError::GenerationIncomplete(persona.name.clone()))
    }

    /// Projected view of an advisor's script at its current progress.
    pub fn view(&self, advisor: &str) -> StudioResult<ScriptView> {
        let persona = self.persona(advisor)?;
        let script = persona
            .script
            .as_ref()
            .ok_or_else(|| StudioError::NoScript(persona.name.clone()))?;
        let progress = self
            .board
            .snapshot(&persona.id)
            .map(|event| event.progress)
            .unwrap_or_else(Progress::new);
        Ok(projector::project(
            script,
            &progress,
            self.board.config().link_tokens,
        ))
    }

    pub fn generation_complete(&self) -> bool {
        let selected = self.wizard.lock().selected().to_vec();
        self.board.all_complete(&selected)
    }

    fn completed_selection(&self) -> StudioResult<Vec<&AdvisorPersona>> {
        let selected = self.wizard.lock().selected().to_vec();
        if let Some(pending) = selected
            .iter()
            .find(|advisor| !self.board.all_complete(std::slice::from_ref(advisor)))
        {
            return Err(StudioError::GenerationIncomplete(pending.clone()));
        }
        if selected.is_empty() {
            return Err(StudioError::GenerationIncomplete("no advisors selected".to_string()));
        }
        selected.iter().map(|advisor| self.persona(advisor)).collect()
    }

    /// Combined plain-text export; only available once every run is complete.
    pub fn export_text(&self, date: NaiveDate) -> StudioResult<(String, String)> {
        let advisors = self.completed_selection()?;
        let body = export::export_text(&advisors, date)?;
        Ok((export::text_file_name(&advisors, date), body))
    }

    pub fn export_html(&self, advisor: &str, date: NaiveDate) -> StudioResult<(String, String)> {
        let advisors = self.completed_selection()?;
        let persona = self.persona(advisor)?;
        if !advisors.iter().any(|selected| selected.id == persona.id) {
            return Err(StudioError::GenerationIncomplete(persona.name.clone()));
        }
        let body = export::export_html(persona, date)?;
        Ok((export::html_file_name(persona, date), body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ImmediateClock, ManualClock};
    use crate::scripts::{MICHAEL_RODRIGUEZ, SARAH_CHEN};

    fn studio_with(clock: Arc<dyn Clock>) -> Studio {
        let mut config = AppConfig::default();
        config.preroll.enabled = false;
        Studio::new(Roster::get_instance(), clock, &config)
    }

    fn to_profiles(studio: &Studio) {
        studio.submit_date_range(DateRange::default()).unwrap();
        studio.finish_research().unwrap();
        studio.select_topic("ETF").unwrap();
        studio.toggle_advisor(MICHAEL_RODRIGUEZ).unwrap();
        studio.toggle_advisor("Sarah Chen").unwrap();
        studio.proceed_to_profiles().unwrap();
    }

    async fn wait_complete(studio: &Studio, advisor: &str) {
        let mut rx = studio.board().subscribe(advisor).unwrap();
        while !rx.borrow_and_update().progress.is_complete {
            rx.changed().await.unwrap();
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 27).unwrap()
    }

    #[tokio::test]
    async fn test_generate_requires_profiles_step() {
        let studio = studio_with(Arc::new(ImmediateClock));
        assert!(matches!(
            studio.generate(),
            Err(StudioError::WrongStep { expected: WizardStep::Profiles, .. })
        ));
    }

    #[tokio::test]
    async fn test_export_gated_on_completion() {
        let clock = Arc::new(ManualClock::new());
        let studio = studio_with(clock.clone());
        to_profiles(&studio);

        let started = studio.generate().unwrap();
        assert_eq!(started.len(), 2);
        assert!(started.iter().all(|s| matches!(s.outcome, StartOutcome::Started { .. })));
        assert!(matches!(
            studio.export_text(date()),
            Err(StudioError::GenerationIncomplete(_))
        ));

        // Enough ticks for both scripts to finish
        clock.release(100_000);
        wait_complete(&studio, MICHAEL_RODRIGUEZ).await;
        wait_complete(&studio, SARAH_CHEN).await;
        assert!(studio.generation_complete());

        let (name, body) = studio.export_text(date()).unwrap();
        assert_eq!(name, "Marketing_Content_Michael_Rodriguez_and_Sarah_Chen_2025-07-27.txt");
        assert!(body.starts_with("=== Michael Rodriguez"));

        let (name, _) = studio.export_html(SARAH_CHEN, date()).unwrap();
        assert_eq!(name, "Sarah_Chen_Marketing_Content_2025-07-27.html");
    }

    #[tokio::test]
    async fn test_view_tracks_progress() {
        let studio = studio_with(Arc::new(ImmediateClock));
        to_profiles(&studio);

        // Before generation nothing is revealed
        let view = studio.view(SARAH_CHEN).unwrap();
        assert_eq!(view.sections.len(), 1);
        assert!(view.sections[0].title.is_none());

        studio.generate().unwrap();
        wait_complete(&studio, SARAH_CHEN).await;
        let view = studio.view(SARAH_CHEN).unwrap();
        assert!(view.is_complete);
        assert_eq!(view.sections.len(), 6);
    }

    #[tokio::test]
    async fn test_back_discards_runs() {
        let clock = Arc::new(ManualClock::new());
        let studio = studio_with(clock.clone());
        to_profiles(&studio);
        studio.generate().unwrap();
        assert!(studio.board().is_running(MICHAEL_RODRIGUEZ));

        let outcome = studio.back();
        assert!(outcome.discard_progress);
        assert!(studio.board().snapshot(MICHAEL_RODRIGUEZ).is_none());
        assert!(studio.board().snapshot(SARAH_CHEN).is_none());
        assert!(studio.wizard_state().selected.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_advisor() {
        let studio = studio_with(Arc::new(ImmediateClock));
        assert!(matches!(
            studio.view("nobody"),
            Err(StudioError::UnknownAdvisor(_))
        ));
    }

    #[tokio::test]
    async fn test_preroll_then_generate() {
        let mut config = AppConfig::default();
        config.preroll.speed = 1000.0;
        let studio = Studio::new(Roster::get_instance(), Arc::new(ImmediateClock), &config);
        to_profiles(&studio);

        let research = studio.subscribe_research();
        let started = studio.generate_with_preroll().await.unwrap().unwrap();
        assert_eq!(started.len(), 2);
        let last = research.borrow().clone();
        assert!(!last.active);
        assert_eq!(last.total, 6);
    }
}
