use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::PrerollConfig;

// Define the structure for a landing research step
#[derive(Debug, Clone, Serialize)]
pub struct ResearchStep {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub duration_ms: u64,
    pub details: Vec<&'static str>,
}

pub const STEP_GAP: Duration = Duration::from_millis(300);
pub const RESEARCH_SETTLE: Duration = Duration::from_millis(1000);

pub fn landing_steps() -> Vec<ResearchStep> {
    vec![
        ResearchStep {
            id: "data-extraction",
            title: "Data Extraction",
            description: "Connecting to Adobe CDP and internal databases",
            duration_ms: 12000,
            details: vec![
                "Connecting to Adobe CDP API...",
                "Extracting client portfolio data for date range",
                "Pulling advisor interaction logs",
                "Gathering product performance metrics",
                "Accessing risk assessment databases",
            ],
        },
        ResearchStep {
            id: "query-generation",
            title: "Query Generation & Exploration",
            description: "Generating intelligent search queries using the Knowledge Graph",
            duration_ms: 15000,
            details: vec![
                "Generating intelligent search queries using the Knowledge Graph...",
                "Expanding queries based on semantic relationships and ontologies...",
                "Mapping entities to related concepts and subdomains...",
                "Identifying relevant nodes and edges for contextual exploration...",
                "Running exploratory passes to discover adjacent knowledge areas...",
            ],
        },
        ResearchStep {
            id: "classification",
            title: "🧠 Classification & Structuring",
            description: "Classifying retrieved insights by domain and relevance",
            duration_ms: 14000,
            details: vec![
                "Classifying retrieved insights by domain and relevance...",
                "Clustering topics into high-level themes and nested subtopics...",
                "Identifying key personas, sectors, and strategic focus areas...",
                "Ranking topics by importance, recency, and depth of discussion...",
                "Organizing graph segments into structured knowledge layers...",
            ],
        },
        ResearchStep {
            id: "theme-extraction",
            title: "📚 Theme & Subtopic Extraction",
            description: "Extracting dominant themes from connected knowledge paths",
            duration_ms: 13000,
            details: vec![
                "Extracting dominant themes from connected knowledge paths...",
                "Detecting underlying narratives and evolving storylines...",
                "Linking subtopics to their parent themes via semantic reasoning...",
                "Synthesizing multi-hop relationships into coherent knowledge clusters...",
                "Tracing conceptual flows and topic interdependencies...",
            ],
        },
        ResearchStep {
            id: "consolidation",
            title: "Consolidating Analysis",
            description: "Synthesizing insights and creating recommendations",
            duration_ms: 11000,
            details: vec![
                "Consolidating findings across all data sources",
                "Generating actionable insights",
                "Creating advisor-specific recommendations",
                "Formatting charts and visualizations",
                "Preparing executive summary",
            ],
        },
        ResearchStep {
            id: "report-generation",
            title: "Report Generation",
            description: "Creating comprehensive research report",
            duration_ms: 10000,
            details: vec![
                "Generating market outlook sections",
                "Creating advisor comparison matrices",
                "Building interactive dashboards",
                "Finalizing research methodology notes",
                "Preparing presentation materials",
            ],
        },
    ]
}

/// One status line and how long it stays up
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchBeat {
    pub step: usize,
    pub message: String,
    pub hold: Duration,
}

/// A timed sequence of status lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchPlan {
    pub name: &'static str,
    pub total_steps: usize,
    pub beats: Vec<ResearchBeat>,
}

impl ResearchPlan {
    /// Status messages shown while content is being "generated".
    pub fn generation_preroll() -> Self {
        let messages: [(&str, u64); 6] = [
            ("Connecting to manulifeim.com...", 3000),
            ("Fetching content from manulifeim.com/advisors...", 2500),
            ("Analyzing advisor profiles and performance data...", 2000),
            ("Accessing Internal Knowledge Base...", 2000),
            ("Retrieving content templates from Seismic...", 2500),
            ("Generating personalized marketing content...", 1000),
        ];
        let beats = messages
            .iter()
            .enumerate()
            .map(|(index, (message, hold_ms))| ResearchBeat {
                step: index + 1,
                message: message.to_string(),
                hold: Duration::from_millis(*hold_ms),
            })
            .collect();

        Self {
            name: "generation",
            total_steps: messages.len(),
            beats,
        }
    }

    /// The landing research animation: each step's duration is split evenly
    /// across its detail lines.
    pub fn landing_research() -> Self {
        let steps = landing_steps();
        let total_steps = steps.len();
        let mut beats = Vec::new();

        for (index, step) in steps.iter().enumerate() {
            let per_detail = Duration::from_millis(step.duration_ms / step.details.len().max(1) as u64);
            for (detail_index, detail) in step.details.iter().enumerate() {
                let last_detail = detail_index + 1 == step.details.len();
                let hold = if last_detail && index + 1 < total_steps {
                    per_detail + STEP_GAP
                } else if last_detail {
                    per_detail + RESEARCH_SETTLE
                } else {
                    per_detail
                };
                beats.push(ResearchBeat {
                    step: index + 1,
                    message: format!("{}: {}", step.title, detail),
                    hold,
                });
            }
        }

        Self {
            name: "landing",
            total_steps,
            beats,
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.beats.iter().map(|beat| beat.hold).sum()
    }
}

/// Snapshot of a research sequence for presenters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchProgress {
    pub step: usize,
    pub total: usize,
    pub message: String,
    pub active: bool,
}

impl ResearchProgress {
    pub fn idle() -> Self {
        Self {
            step: 0,
            total: 0,
            message: String::new(),
            active: false,
        }
    }
}

/// Plays `plan`, publishing a snapshot per beat. Returns false if `stale` was
/// raised before the sequence finished.
pub async fn play(
    plan: &ResearchPlan,
    clock: &dyn Clock,
    preroll: &PrerollConfig,
    publisher: &watch::Sender<ResearchProgress>,
    stale: &AtomicBool,
) -> bool {
    info!(plan = plan.name, beats = plan.beats.len(), "Playing research sequence");

    for beat in &plan.beats {
        if stale.load(Ordering::Acquire) {
            debug!(plan = plan.name, "Research sequence cancelled");
            return false;
        }
        publisher.send_replace(ResearchProgress {
            step: beat.step,
            total: plan.total_steps,
            message: beat.message.clone(),
            active: true,
        });
        clock.sleep(preroll.scale(beat.hold)).await;
    }

    if stale.load(Ordering::Acquire) {
        return false;
    }
    publisher.send_replace(ResearchProgress {
        step: plan.total_steps,
        total: plan.total_steps,
        message: String::new(),
        active: false,
    });
    true
}
