use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::api::metrics;
use crate::services::{extract_access_token, AccessGate, GateNotice, GateState};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GateView {
    pub success: bool,
    /// `locked` (show the signup form) or `unlocked` (show the playbook).
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<GateNotice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<GateState> for GateView {
    fn from(state: GateState) -> Self {
        match state {
            GateState::Unlocked { name } => Self {
                success: true,
                state: "unlocked".to_string(),
                name: Some(name),
                notice: None,
                message: None,
            },
            GateState::Locked { notice } => Self {
                success: true,
                state: "locked".to_string(),
                name: None,
                notice,
                message: notice.map(|n| n.message().to_string()),
            },
        }
    }
}

#[utoipa::path(
    get,
    path = "/playbook",
    tag = "Playbook",
    params(
        ("access" = Option<String>, Query, description = "Access token from the emailed link")
    ),
    responses(
        (status = 200, description = "Gate decision for this visit", body = GateView),
        (status = 500, description = "Signup storage unavailable")
    )
)]
pub async fn view_playbook(req: HttpRequest, gate: web::Data<AccessGate>) -> HttpResponse {
    let token = extract_access_token(req.query_string());
    log::info!("📖 GET /playbook - token present: {}", token.is_some());

    match gate.evaluate(token.as_deref()).await {
        Ok(state) => {
            if token.is_some() {
                metrics::record_access(state.is_unlocked());
            }
            HttpResponse::Ok()
                .insert_header((header::CACHE_CONTROL, "no-store"))
                .json(GateView::from(state))
        }
        Err(e) => {
            log::error!("❌ Failed to evaluate access token: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": e.message()
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support;
    use crate::services::SignupRequest;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_signup_then_unlock_with_token() {
        let harness = test_support::harness();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(harness.gate.clone()))
                .route("/playbook", web::get().to(view_playbook)),
        )
        .await;

        harness
            .signups
            .submit(&SignupRequest {
                name: "Ada".to_string(),
                email: "ada@x.com".to_string(),
                company: Some("Acme".to_string()),
                role: Some("CTO".to_string()),
            })
            .await
            .unwrap();
        let token = harness.store.find_by_email("ada@x.com").await.unwrap().unwrap().access_token;

        let req = test::TestRequest::get()
            .uri(&format!("/playbook?access={}", token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(resp.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["state"], "unlocked");
        assert_eq!(body["name"], "Ada");
    }

    #[actix_web::test]
    async fn test_bogus_token_shows_locked_with_notice() {
        let harness = test_support::harness();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(harness.gate.clone()))
                .route("/playbook", web::get().to(view_playbook)),
        )
        .await;

        let req = test::TestRequest::get().uri("/playbook?access=bogus").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["state"], "locked");
        assert_eq!(body["notice"], "invalid_link");
        assert_eq!(body["message"], GateNotice::InvalidLink.message());

        let req = test::TestRequest::get().uri("/playbook").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["state"], "locked");
        assert!(body.get("notice").is_none());
    }
}
