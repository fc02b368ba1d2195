use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header::{CONTENT_DISPOSITION, ContentType};
use actix_web::{HttpResponse, Responder, ResponseError, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{StudioError, StudioResult};
use crate::models::PersonaSummary;
use crate::outreach;
use crate::progress_stream::{stream_progress, stream_research};
use crate::research::ResearchPlan;
use crate::studio::Studio;
use crate::wizard::{DateRange, WizardStep};

// Shared state handed to every handler
pub struct AppState {
    pub studio: Arc<Studio>,
}

impl ResponseError for StudioError {
    fn status_code(&self) -> StatusCode {
        match self {
            StudioError::UnknownAdvisor(_) => StatusCode::NOT_FOUND,
            StudioError::WrongStep { .. } | StudioError::GenerationIncomplete(_) => StatusCode::CONFLICT,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize)]
pub struct DateRangeRequest {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Deserialize)]
pub struct TopicRequest {
    pub topic: String,
}

#[derive(Serialize, Deserialize)]
pub struct ToggleResponse {
    pub advisor: String,
    pub selected: bool,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub advisor: Option<String>,
    pub date: Option<NaiveDate>,
}

// API endpoint to list the roster
pub async fn get_advisors_handler(data: web::Data<AppState>) -> impl Responder {
    let advisors: Vec<PersonaSummary> = data
        .studio
        .roster()
        .all()
        .iter()
        .map(PersonaSummary::from)
        .collect();
    HttpResponse::Ok().json(advisors)
}

pub async fn get_wizard_handler(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.studio.wizard_state())
}

pub async fn submit_date_range_handler(
    request: web::Json<DateRangeRequest>,
    data: web::Data<AppState>,
) -> StudioResult<HttpResponse> {
    let range = DateRange::new(request.from, request.to)?;
    let state = data.studio.submit_date_range(range)?;

    // The landing research plays in the background and advances the wizard
    let studio = data.studio.clone();
    tokio::spawn(async move {
        if studio.play_research(&ResearchPlan::landing_research()).await {
            if let Err(e) = studio.finish_research() {
                info!("Research finished after navigation moved on: {}", e);
            }
        }
    });

    Ok(HttpResponse::Ok().json(state))
}

// Skips the rest of the research animation
pub async fn finish_research_handler(data: web::Data<AppState>) -> StudioResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(data.studio.finish_research()?))
}

pub async fn select_topic_handler(
    request: web::Json<TopicRequest>,
    data: web::Data<AppState>,
) -> StudioResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(data.studio.select_topic(&request.topic)?))
}

pub async fn toggle_advisor_handler(
    advisor: web::Path<String>,
    data: web::Data<AppState>,
) -> StudioResult<HttpResponse> {
    let advisor = advisor.into_inner();
    let selected = data.studio.toggle_advisor(&advisor)?;
    Ok(HttpResponse::Ok().json(ToggleResponse { advisor, selected }))
}

pub async fn proceed_handler(data: web::Data<AppState>) -> StudioResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(data.studio.proceed_to_profiles()?))
}

pub async fn back_handler(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.studio.back())
}

// Starts generation; the pre-roll plays in the background when enabled
pub async fn generate_handler(data: web::Data<AppState>) -> StudioResult<HttpResponse> {
    let studio = data.studio.clone();
    let wizard = studio.wizard_state();
    if wizard.step != WizardStep::Profiles {
        return Err(StudioError::WrongStep {
            expected: WizardStep::Profiles,
            actual: wizard.step,
        });
    }

    tokio::spawn(async move {
        if let Err(e) = studio.generate_with_preroll().await {
            info!("Generation did not start: {}", e);
        }
    });
    Ok(HttpResponse::Accepted().json(wizard))
}

pub async fn get_progress_handler(
    advisor: web::Path<String>,
    data: web::Data<AppState>,
) -> StudioResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(data.studio.progress(&advisor)?))
}

pub async fn get_view_handler(
    advisor: web::Path<String>,
    data: web::Data<AppState>,
) -> StudioResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(data.studio.view(&advisor)?))
}

pub async fn get_links_handler(
    advisor: web::Path<String>,
    data: web::Data<AppState>,
) -> StudioResult<HttpResponse> {
    let persona = data.studio.persona(&advisor)?;
    Ok(HttpResponse::Ok().json(outreach::links_for(persona, Utc::now())))
}

pub async fn export_handler(
    query: web::Query<ExportQuery>,
    data: web::Data<AppState>,
) -> StudioResult<HttpResponse> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let (file_name, body, content_type) = match query.format.as_deref().unwrap_or("text") {
        "text" => {
            let (name, body) = data.studio.export_text(date)?;
            (name, body, ContentType::plaintext())
        }
        "html" => {
            let advisor = query
                .advisor
                .as_deref()
                .ok_or_else(|| StudioError::UnknownAdvisor("missing advisor parameter".to_string()))?;
            let (name, body) = data.studio.export_html(advisor, date)?;
            (name, body, ContentType::html())
        }
        other => {
            return Ok(HttpResponse::BadRequest().json(ErrorResponse {
                error: format!("Unsupported export format: {}", other),
            }));
        }
    };

    Ok(HttpResponse::Ok()
        .insert_header(content_type)
        .insert_header((CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)))
        .body(body))
}

/// Registers every API route under the current scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/advisors", web::get().to(get_advisors_handler))
        .route("/advisors/{id}/progress", web::get().to(get_progress_handler))
        .route("/advisors/{id}/view", web::get().to(get_view_handler))
        .route("/advisors/{id}/stream", web::get().to(stream_progress))
        .route("/advisors/{id}/links", web::get().to(get_links_handler))
        .route("/wizard", web::get().to(get_wizard_handler))
        .route("/wizard/date-range", web::post().to(submit_date_range_handler))
        .route("/wizard/research", web::post().to(finish_research_handler))
        .route("/wizard/topic", web::post().to(select_topic_handler))
        .route("/wizard/advisors/{id}", web::post().to(toggle_advisor_handler))
        .route("/wizard/proceed", web::post().to(proceed_handler))
        .route("/wizard/back", web::post().to(back_handler))
        .route("/generate", web::post().to(generate_handler))
        .route("/research/stream", web::get().to(stream_research))
        .route("/export", web::get().to(export_handler));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ImmediateClock;
    use crate::config::AppConfig;
    use crate::scripts::{MICHAEL_RODRIGUEZ, Roster, SARAH_CHEN};
    use crate::wizard::{WizardState, WizardStep};
    use actix_web::{App, test};

    fn app_state() -> web::Data<AppState> {
        let mut config = AppConfig::default();
        config.preroll.enabled = false;
        web::Data::new(AppState {
            studio: Arc::new(Studio::new(
                Roster::get_instance(),
                Arc::new(ImmediateClock),
                &config,
            )),
        })
    }

    #[actix_web::test]
    async fn test_list_advisors() {
        let app = test::init_service(
            App::new()
                .app_data(app_state())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/advisors").to_request();
        let advisors: Vec<PersonaSummary> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(advisors.len(), 6);
        assert!(advisors[0].has_script);
        assert_eq!(advisors[1].section_count, 6);
        assert!(!advisors[5].has_script);
    }

    #[actix_web::test]
    async fn test_wizard_flow_and_errors() {
        let state = app_state();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        // Topic before the research step is a conflict
        let req = test::TestRequest::post()
            .uri("/api/wizard/topic")
            .set_json(serde_json::json!({"topic": "ETF"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        // Inverted date range is rejected
        let req = test::TestRequest::post()
            .uri("/api/wizard/date-range")
            .set_json(serde_json::json!({"from": "2025-07-27", "to": "2025-01-01"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/wizard/date-range")
            .set_json(serde_json::json!({"from": "2025-01-01", "to": "2025-07-27"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        // The background research advances the wizard once it finishes
        while state.studio.wizard_state().step != WizardStep::Topics {
            tokio::task::yield_now().await;
        }
        let req = test::TestRequest::post().uri("/api/wizard/research").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post()
            .uri("/api/wizard/topic")
            .set_json(serde_json::json!({"topic": "ETF"}))
            .to_request();
        let state_after: WizardState = test::call_and_read_body_json(&app, req).await;
        assert_eq!(state_after.topic.as_deref(), Some("ETF"));

        let req = test::TestRequest::post()
            .uri("/api/wizard/advisors/lisa-anderson")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/wizard/advisors/nobody")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_export_conflict_until_complete() {
        let state = app_state();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/export?format=text").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let studio = &state.studio;
        studio.submit_date_range(DateRange::default()).unwrap();
        studio.finish_research().unwrap();
        studio.select_topic("ETF").unwrap();
        studio.toggle_advisor(MICHAEL_RODRIGUEZ).unwrap();
        studio.toggle_advisor(SARAH_CHEN).unwrap();
        studio.proceed_to_profiles().unwrap();
        studio.generate().unwrap();

        for advisor in [MICHAEL_RODRIGUEZ, SARAH_CHEN] {
            let mut rx = studio.board().subscribe(advisor).unwrap();
            while !rx.borrow_and_update().progress.is_complete {
                rx.changed().await.unwrap();
            }
        }

        let req = test::TestRequest::get()
            .uri("/api/export?format=text&date=2025-07-27")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let disposition = resp
            .headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("Marketing_Content_Michael_Rodriguez_and_Sarah_Chen_2025-07-27.txt"));

        let req = test::TestRequest::get()
            .uri("/api/export?format=pdf")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_links_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(app_state())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/advisors/sarah-chen/links")
            .to_request();
        let links: outreach::OutreachLinks = test::call_and_read_body_json(&app, req).await;
        assert!(links.mailto.starts_with("mailto:?subject="));
        assert!(links.calendar.starts_with("https://calendar.google.com/calendar/render?action=TEMPLATE"));
    }
}
