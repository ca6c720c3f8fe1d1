use actix_web::{web, HttpResponse};

use crate::api::metrics;
use crate::services::{SignupRequest, SignupResponse, SignupService};
use crate::utils::AppError;

#[utoipa::path(
    post,
    path = "/api/v1/signup",
    tag = "Signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Access link sent (or simulated)", body = SignupResponse),
        (status = 400, description = "Name or email missing or invalid"),
        (status = 502, description = "Email could not be sent; the form can be resubmitted"),
        (status = 500, description = "Signup storage unavailable")
    )
)]
pub async fn submit_signup(
    signups: web::Data<SignupService>,
    request: web::Json<SignupRequest>,
) -> HttpResponse {
    log::info!("📝 POST /signup - email: {}", request.email);

    match signups.submit(&request).await {
        Ok(response) => {
            log::info!(
                "✅ Access link {} for {}",
                if response.simulated { "simulated" } else { "sent" },
                response.email
            );
            // Email counters belong to /api/send-playbook
            metrics::record_signup(response.resent);
            HttpResponse::Ok().json(response)
        }
        Err(AppError::Validation(msg)) => {
            log::warn!("⚠️ Signup rejected: {}", msg);
            HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": msg
            }))
        }
        Err(AppError::Notification(msg)) => {
            log::error!("❌ Failed to send email to {}: {}", request.email, msg);
            HttpResponse::BadGateway().json(serde_json::json!({
                "success": false,
                "error": format!("Failed to send email: {}", msg)
            }))
        }
        Err(e) => {
            log::error!("❌ Signup failed for {}: {}", request.email, e);
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
    use crate::database::MemoryStore;
    use crate::services::{EndpointNotifier, TokenStore};
    use actix_web::{http::StatusCode, test, App};
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[actix_web::test]
    async fn test_submit_twice_reuses_token() {
        let harness = test_support::harness();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(harness.signups.clone()))
                .route("/api/v1/signup", web::post().to(submit_signup)),
        )
        .await;

        let payload = serde_json::json!({
            "name": "Ada", "email": "ada@x.com", "company": "Acme", "role": "CTO"
        });

        let req = test::TestRequest::post().uri("/api/v1/signup").set_json(&payload).to_request();
        let first: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(first["success"], true);
        assert_eq!(first["resent"], false);
        assert_eq!(first["simulated"], true);

        let req = test::TestRequest::post().uri("/api/v1/signup").set_json(&payload).to_request();
        let second: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(second["resent"], true);
        assert!(first["redirectTo"].as_str().unwrap().contains("?access=prism_"));
        assert_eq!(first["redirectTo"], second["redirectTo"]);
        assert_eq!(harness.store.get_all().await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_missing_email_is_bad_request() {
        let harness = test_support::harness();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(harness.signups.clone()))
                .route("/api/v1/signup", web::post().to(submit_signup)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/signup")
            .set_json(serde_json::json!({ "name": "Ada" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(harness.store.get_all().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_email_counters_untouched_by_signup() {
        let _metrics = metrics::serial();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true, "messageId": "re_1", "email": "ada@x.com"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({ "error": "down" })))
            .mount(&server)
            .await;

        let store = TokenStore::new(Arc::new(MemoryStore::new()), None);
        let notifier = Arc::new(EndpointNotifier::new(format!("{}/api/send-playbook", server.uri())));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(SignupService::new(store, notifier)))
                .route("/api/v1/signup", web::post().to(submit_signup)),
        )
        .await;

        let before = metrics::MetricsResponse::snapshot();

        let req = test::TestRequest::post()
            .uri("/api/v1/signup")
            .set_json(serde_json::json!({ "name": "Ada", "email": "ada@x.com" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/v1/signup")
            .set_json(serde_json::json!({ "name": "Bob", "email": "bob@x.com" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_GATEWAY);

        let after = metrics::MetricsResponse::snapshot();
        assert_eq!(after.emails_sent_total, before.emails_sent_total);
        assert_eq!(after.email_failures_total, before.email_failures_total);
    }
}
