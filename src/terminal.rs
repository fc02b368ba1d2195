use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::debug;

use crate::board::ProgressEvent;
use crate::error::StudioResult;
use crate::models::{AdvisorId, SectionKind};
use crate::projector::{ItemView, ScriptView, SectionView};
use crate::research::ResearchProgress;
use crate::studio::Studio;
use crate::tokenizer;

fn item_line(item: &ItemView) -> String {
    let text = tokenizer::strip_links(&item.text).into_owned();
    match &item.typing {
        Some(_) if !item.complete => format!("{}▌", text),
        _ => text,
    }
}

/// Renders one section as plain terminal text.
pub fn render_section(section: &SectionView) -> String {
    let mut out = String::new();
    if let Some(title) = &section.title {
        let line = item_line(title);
        match section.kind {
            SectionKind::Hero => out.push_str(&format!("# {}\n", line)),
            SectionKind::Body => out.push_str(&format!("## {}\n", line)),
            SectionKind::CallToAction => out.push_str(&format!(">> {}\n", line)),
        }
    }
    for item in &section.items {
        match section.kind {
            SectionKind::Body => out.push_str(&format!("  • {}\n", item_line(item))),
            SectionKind::Hero | SectionKind::CallToAction => {
                out.push_str(&format!("  {}\n", item_line(item)))
            }
        }
    }
    out
}

pub fn render_view(heading: &str, view: &ScriptView) -> String {
    let mut out = format!("=== {} ===\n", heading);
    for section in &view.sections {
        out.push('\n');
        out.push_str(&render_section(section));
    }
    if view.is_complete {
        out.push_str("\n[generation complete]\n");
    }
    out
}

/// Prints research status lines until the sequence stops.
pub async fn print_research(mut events: watch::Receiver<ResearchProgress>) {
    // A finished earlier sequence may still be the current value
    let mut seen_active = false;
    loop {
        let snapshot = events.borrow_and_update().clone();
        if snapshot.active {
            seen_active = true;
            println!("[{}/{}] {}", snapshot.step, snapshot.total, snapshot.message);
        } else if seen_active {
            return;
        }
        if events.changed().await.is_err() {
            return;
        }
    }
}

// Prints each section of one advisor once it has been fully revealed
async fn print_sections(studio: Arc<Studio>, advisor: AdvisorId, mut events: watch::Receiver<ProgressEvent>) {
    let name = studio
        .persona(&advisor)
        .map(|persona| persona.name.clone())
        .unwrap_or_else(|_| advisor.clone());
    let mut printed = 0;

    loop {
        let progress = events.borrow_and_update().progress;
        let finished = if progress.is_complete {
            usize::MAX
        } else {
            progress.current_section
        };

        if finished > printed {
            if let Ok(view) = studio.view(&advisor) {
                for section in view.sections.iter().filter(|s| s.index >= printed && s.index < finished) {
                    println!("[{}]\n{}", name, render_section(section));
                }
                printed = view.sections.len().min(finished);
            }
        }

        if progress.is_complete {
            println!("[{}] generation complete", name);
            return;
        }
        if events.changed().await.is_err() {
            debug!(advisor = %advisor, "Reveal stopped before completion");
            return;
        }
    }
}

/// Follows every selected advisor's reveal, printing sections as they finish.
pub async fn follow_generation(studio: Arc<Studio>, advisors: &[AdvisorId]) -> StudioResult<()> {
    let mut tasks = Vec::new();
    for advisor in advisors {
        let persona = studio.persona(advisor)?;
        if let Some(events) = studio.board().subscribe(&persona.id) {
            tasks.push(tokio::spawn(print_sections(studio.clone(), persona.id.clone(), events)));
        }
    }
    for result in join_all(tasks).await {
        if let Err(e) = result {
            debug!("Section printer stopped: {}", e);
        }
    }
    Ok(())
}
