use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::RevealConfig;
use crate::driver::ProgressDriver;
use crate::models::{AdvisorId, Progress, Script};

/// Snapshot published after every driver step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub advisor: AdvisorId,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub progress: Progress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum StartOutcome {
    Started { run_id: Uuid },
    /// A run is already in flight; the request was a no-op.
    AlreadyRunning { run_id: Uuid },
    /// No script exists, the advisor was marked complete with no content.
    NoContent { run_id: Uuid },
}

impl StartOutcome {
    pub fn run_id(&self) -> Uuid {
        match self {
            StartOutcome::Started { run_id }
            | StartOutcome::AlreadyRunning { run_id }
            | StartOutcome::NoContent { run_id } => *run_id,
        }
    }
}

struct AdvisorSlot {
    run_id: Uuid,
    stale: Arc<AtomicBool>,
    events: watch::Receiver<ProgressEvent>,
    handle: Option<JoinHandle<()>>,
}

impl AdvisorSlot {
    fn is_running(&self) -> bool {
        !self.events.borrow().progress.is_complete
    }

    fn stop(&self) {
        self.stale.store(true, Ordering::Release);
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

/// Registry of reveal runs keyed by advisor.
///
/// Each run is a tokio task that owns its driver and publishes through a
/// watch channel; the board keeps the receiving end so late subscribers see
/// the latest snapshot straight away. Runs for different advisors never
/// share state.
pub struct ProgressBoard {
    clock: Arc<dyn Clock>,
    config: RevealConfig,
    slots: DashMap<AdvisorId, AdvisorSlot>,
}

impl ProgressBoard {
    pub fn new(clock: Arc<dyn Clock>, config: RevealConfig) -> Self {
        Self {
            clock,
            config,
            slots: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    /// Starts revealing `script` for `advisor`. Must be called from within a
    /// tokio runtime.
    pub fn start(&self, advisor: &str, script: Option<Arc<Script>>) -> StartOutcome {
        match self.slots.entry(advisor.to_string()) {
            Entry::Occupied(entry) if entry.get().is_running() => {
                let run_id = entry.get().run_id;
                debug!(advisor, %run_id, "Reveal already running, ignoring start");
                StartOutcome::AlreadyRunning { run_id }
            }
            Entry::Occupied(mut entry) => {
                let (slot, outcome) = self.launch(advisor, script);
                entry.get().stop();
                entry.insert(slot);
                outcome
            }
            Entry::Vacant(entry) => {
                let (slot, outcome) = self.launch(advisor, script);
                entry.insert(slot);
                outcome
            }
        }
    }

    fn launch(&self, advisor: &str, script: Option<Arc<Script>>) -> (AdvisorSlot, StartOutcome) {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let stale = Arc::new(AtomicBool::new(false));

        let Some(script) = script else {
            info!(advisor, %run_id, "No script available, marking complete");
            let (_, events) = watch::channel(ProgressEvent {
                advisor: advisor.to_string(),
                run_id,
                started_at,
                progress: Progress::completed(0),
            });
            let slot = AdvisorSlot {
                run_id,
                stale,
                events,
                handle: None,
            };
            return (slot, StartOutcome::NoContent { run_id });
        };

        let mut driver = ProgressDriver::new(script, &self.config);
        driver.start();
        let (publisher, events) = watch::channel(ProgressEvent {
            advisor: advisor.to_string(),
            run_id,
            started_at,
            progress: driver.progress(),
        });

        info!(advisor, %run_id, "Starting reveal");
        let handle = tokio::spawn(run_driver(
            driver,
            self.clock.clone(),
            stale.clone(),
            publisher,
        ));

        let slot = AdvisorSlot {
            run_id,
            stale,
            events,
            handle: Some(handle),
        };
        (slot, StartOutcome::Started { run_id })
    }

    /// Stops the advisor's run and discards its progress.
    pub fn cancel(&self, advisor: &str) -> bool {
        match self.slots.remove(advisor) {
            Some((_, slot)) => {
                slot.stop();
                info!(advisor, run_id = %slot.run_id, "Reveal cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let advisors: Vec<AdvisorId> = self.slots.iter().map(|slot| slot.key().clone()).collect();
        for advisor in advisors {
            self.cancel(&advisor);
        }
    }

    pub fn snapshot(&self, advisor: &str) -> Option<ProgressEvent> {
        self.slots
            .get(advisor)
            .map(|slot| slot.events.borrow().clone())
    }

    pub fn subscribe(&self, advisor: &str) -> Option<watch::Receiver<ProgressEvent>> {
        self.slots.get(advisor).map(|slot| slot.events.clone())
    }

    pub fn is_running(&self, advisor: &str) -> bool {
        self.slots
            .get(advisor)
            .is_some_and(|slot| slot.is_running())
    }

    /// True once every listed advisor has a completed run.
    pub fn all_complete(&self, advisors: &[AdvisorId]) -> bool {
        !advisors.is_empty()
            && advisors.iter().all(|advisor| {
                self.snapshot(advisor)
                    .is_some_and(|event| event.progress.is_complete)
            })
    }
}

impl Drop for ProgressBoard {
    fn drop(&mut self) {
        for slot in self.slots.iter() {
            slot.stop();
        }
    }
}

async fn run_driver(
    mut driver: ProgressDriver,
    clock: Arc<dyn Clock>,
    stale: Arc<AtomicBool>,
    publisher: watch::Sender<ProgressEvent>,
) {
    while let Some(delay) = driver.next_delay() {
        clock.sleep(delay).await;

        if stale.load(Ordering::Acquire) {
            driver.cancel();
            debug!("Discarding tick from a cancelled run");
            return;
        }

        if let Some(progress) = driver.step() {
            if !publish(&publisher, &stale, progress) {
                driver.cancel();
                debug!("Run cancelled while publishing");
                return;
            }
        }
    }
}

// The stale check runs under the channel lock so a cancel cannot slip in
// between the check and the send.
fn publish(publisher: &watch::Sender<ProgressEvent>, stale: &AtomicBool, progress: Progress) -> bool {
    publisher.send_if_modified(|event| {
        if stale.load(Ordering::Acquire) {
            return false;
        }
        event.progress = progress;
        true
    })
}
