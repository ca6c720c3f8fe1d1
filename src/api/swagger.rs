use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Playbook Gate API",
        version = "1.0.0",
        description = "Lead-capture gate for the PRISM playbook.\n\n**Flow:** a visitor signs up, receives an emailed link carrying an access token, and the playbook unlocks when the link is opened.\n\n**Admin:** stats and revocation require `Authorization: Bearer <ADMIN_API_KEY>`."
    ),
    paths(
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,
        crate::api::playbook::view_playbook,
        crate::api::signup::submit_signup,
        crate::api::send_playbook::send_playbook,
        crate::api::admin::get_signup_stats,
        crate::api::admin::revoke_token,
    ),
    components(
        schemas(
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,
            crate::api::playbook::GateView,
            crate::services::access_gate::GateNotice,
            crate::services::signup_service::SignupRequest,
            crate::services::signup_service::SignupResponse,
            crate::services::email_service::SendPlaybookRequest,
            crate::services::email_service::SendPlaybookResponse,
            crate::models::SignupRecord,
            crate::models::SignupStats,
        )
    ),
    tags(
        (name = "Health", description = "Health check and service counters."),
        (name = "Playbook", description = "Gate decision for the playbook page."),
        (name = "Signup", description = "Signup form submission and access link delivery."),
        (name = "Email", description = "Sends the access email through the transactional-email provider."),
        (name = "Admin", description = "Signup statistics and token revocation."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_key",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Value of ADMIN_API_KEY"))
                        .build(),
                ),
            );
        }
    }
}
