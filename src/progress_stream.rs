use actix_web::http::header::CACHE_CONTROL;
use actix_web::web::Bytes;
use actix_web::{HttpResponse, Responder, web};
use futures::stream::StreamExt;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::board::ProgressEvent;
use crate::handlers::AppState;
use crate::research::ResearchProgress;

// Frames one server-sent event
fn sse_frame<T: Serialize>(event: Option<&str>, payload: &T) -> Option<String> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(match event {
            Some(name) => format!("event: {}\ndata: {}\n\n", name, json),
            None => format!("data: {}\n\n", json),
        }),
        Err(e) => {
            warn!("Failed to serialize stream payload: {}", e);
            None
        }
    }
}

fn event_stream(rx: mpsc::Receiver<String>) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((CACHE_CONTROL, "no-cache"))
        .insert_header(("Connection", "keep-alive"))
        .insert_header(("Content-Type", "text/event-stream"))
        .streaming(ReceiverStream::new(rx).map(|item| Ok::<Bytes, actix_web::Error>(Bytes::from(item))))
}

/// Forwards progress snapshots until the run completes or is cancelled.
pub async fn forward_progress(mut events: watch::Receiver<ProgressEvent>, tx: mpsc::Sender<String>) {
    loop {
        let event = events.borrow_and_update().clone();
        let done = event.progress.is_complete;
        if let Some(frame) = sse_frame(None, &event) {
            if tx.send(frame).await.is_err() {
                debug!(advisor = %event.advisor, "Progress stream client disconnected");
                return;
            }
        }
        if done {
            if let Some(frame) = sse_frame(Some("complete"), &event) {
                let _ = tx.send(frame).await;
            }
            return;
        }
        if events.changed().await.is_err() {
            // The run was cancelled and its publisher dropped
            if let Some(frame) = sse_frame(Some("cancelled"), &event) {
                let _ = tx.send(frame).await;
            }
            return;
        }
    }
}

/// Forwards research snapshots until the sequence ends.
pub async fn forward_research(mut events: watch::Receiver<ResearchProgress>, tx: mpsc::Sender<String>) {
    loop {
        let snapshot = events.borrow_and_update().clone();
        if let Some(frame) = sse_frame(None, &snapshot) {
            if tx.send(frame).await.is_err() {
                return;
            }
        }
        if snapshot.total > 0 && !snapshot.active {
            return;
        }
        if events.changed().await.is_err() {
            return;
        }
    }
}

// Handler for streaming one advisor's reveal progress
pub async fn stream_progress(advisor: web::Path<String>, data: web::Data<AppState>) -> impl Responder {
    let advisor = advisor.into_inner();
    let persona = match data.studio.persona(&advisor) {
        Ok(persona) => persona,
        Err(e) => return HttpResponse::NotFound().body(e.to_string()),
    };
    let Some(events) = data.studio.board().subscribe(&persona.id) else {
        return HttpResponse::NotFound().body(format!("No generation running for {}", persona.name));
    };

    let (tx, rx) = mpsc::channel(100);
    tokio::spawn(forward_progress(events, tx));
    event_stream(rx)
}

// Handler for streaming the research status sequence
pub async fn stream_research(data: web::Data<AppState>) -> impl Responder {
    let (tx, rx) = mpsc::channel(100);
    tokio::spawn(forward_research(data.studio.subscribe_research(), tx));
    event_stream(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Progress, WordBudget};
    use chrono::Utc;
    use uuid::Uuid;

    fn event(progress: Progress) -> ProgressEvent {
        ProgressEvent {
            advisor: "a".to_string(),
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            progress,
        }
    }

    #[tokio::test]
    async fn test_stream_ends_on_completion() {
        let (publisher, events) = watch::channel(event(Progress::new()));
        let (tx, mut rx) = mpsc::channel(16);
        let forwarder = tokio::spawn(forward_progress(events, tx));

        let first = rx.recv().await.unwrap();
        assert!(first.starts_with("data: "));
        assert!(first.ends_with("\n\n"));

        publisher.send_modify(|e| e.progress = Progress::completed(1));
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        forwarder.await.unwrap();

        let last = frames.last().unwrap();
        assert!(last.starts_with("event: complete\n"));
    }

    #[tokio::test]
    async fn test_stream_reports_cancellation() {
        let mut start = Progress::new();
        start.words_revealed = WordBudget::Words(3);
        let (publisher, events) = watch::channel(event(start));
        let (tx, mut rx) = mpsc::channel(16);
        let forwarder = tokio::spawn(forward_progress(events, tx));

        rx.recv().await.unwrap();
        drop(publisher);
        let frame = rx.recv().await.unwrap();
        assert!(frame.starts_with("event: cancelled\n"));
        assert!(rx.recv().await.is_none());
        forwarder.await.unwrap();
    }

    #[tokio::test]
    async fn test_research_stream_stops_when_inactive() {
        let (publisher, events) = watch::channel(ResearchProgress::idle());
        let (tx, mut rx) = mpsc::channel(16);
        let forwarder = tokio::spawn(forward_research(events, tx));

        rx.recv().await.unwrap();
        publisher.send_replace(ResearchProgress {
            step: 6,
            total: 6,
            message: String::new(),
            active: false,
        });
        let frame = rx.recv().await.unwrap();
        assert!(frame.contains("\"step\":6"));
        assert!(rx.recv().await.is_none());
        forwarder.await.unwrap();
    }
}
