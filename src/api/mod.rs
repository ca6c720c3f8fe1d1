pub mod admin;
pub mod health;
pub mod metrics;
pub mod playbook;
pub mod send_playbook;
pub mod signup;
pub mod swagger;

use crate::middleware::AdminAuth;
use actix_web::web;

/// Routes under `/api/v1`.
pub fn configure_v1(cfg: &mut web::ServiceConfig) {
    cfg.route("/signup", web::post().to(signup::submit_signup)).service(
        web::scope("/admin")
            .wrap(AdminAuth)
            .route("/signups/stats", web::get().to(admin::get_signup_stats))
            .route("/tokens/{token}/revoke", web::post().to(admin::revoke_token)),
    );
}
