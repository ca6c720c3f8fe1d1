use actix_web::{
    http::{header, StatusCode},
    web, HttpRequest, HttpResponse, HttpResponseBuilder,
};

use crate::api::metrics;
use crate::services::{SendError, SendPlaybookRequest, SendPlaybookResponse, SendPlaybookService};

pub const SEND_PLAYBOOK_PATH: &str = "/api/send-playbook";

/// Any origin may call this endpoint; headers go on every response, not just preflight.
fn with_cors(status: StatusCode) -> HttpResponseBuilder {
    let mut builder = HttpResponse::build(status);
    builder
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"));
    builder
}

/// `POST` / `OPTIONS` handled here, everything else answered with 405.
pub fn resource() -> actix_web::Resource {
    web::resource(SEND_PLAYBOOK_PATH)
        .route(web::post().to(send_playbook))
        .route(web::method(actix_web::http::Method::OPTIONS).to(preflight))
        .default_service(web::route().to(method_not_allowed))
}

#[utoipa::path(
    post,
    path = "/api/send-playbook",
    tag = "Email",
    request_body = SendPlaybookRequest,
    responses(
        (status = 200, description = "Email accepted by the provider", body = SendPlaybookResponse),
        (status = 400, description = "name, email or accessToken missing"),
        (status = 500, description = "Provider unreachable or not configured")
    )
)]
pub async fn send_playbook(
    req: HttpRequest,
    body: web::Bytes,
    service: web::Data<SendPlaybookService>,
) -> HttpResponse {
    let request: SendPlaybookRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("⚠️ POST /send-playbook - unreadable body: {}", e);
            return with_cors(StatusCode::BAD_REQUEST).json(serde_json::json!({
                "error": "Missing required fields"
            }));
        }
    };

    log::info!(
        "📧 POST /send-playbook - email: {}",
        request.email.as_deref().unwrap_or("N/A")
    );

    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());

    match service.send(&request, origin).await {
        Ok(response) => {
            metrics::record_email(true);
            with_cors(StatusCode::OK).json(response)
        }
        Err(SendError::MissingFields) => {
            log::warn!("⚠️ POST /send-playbook - missing required fields");
            with_cors(StatusCode::BAD_REQUEST).json(serde_json::json!({
                "error": "Missing required fields"
            }))
        }
        Err(SendError::Provider { status, message }) => {
            log::error!("❌ Resend API error {}: {}", status, message);
            metrics::record_email(false);
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            with_cors(status).json(serde_json::json!({ "error": message }))
        }
        Err(SendError::Internal(details)) => {
            log::error!("❌ Error sending email: {}", details);
            metrics::record_email(false);
            with_cors(StatusCode::INTERNAL_SERVER_ERROR).json(serde_json::json!({
                "error": "Internal server error",
                "details": details
            }))
        }
    }
}

pub async fn preflight() -> HttpResponse {
    with_cors(StatusCode::OK).finish()
}

pub async fn method_not_allowed() -> HttpResponse {
    with_cors(StatusCode::METHOD_NOT_ALLOWED)
        .insert_header((header::ALLOW, "POST, OPTIONS"))
        .json(serde_json::json!({ "error": "Method not allowed" }))
}
