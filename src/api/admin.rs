use actix_web::{web, HttpResponse};

use crate::models::SignupStats;
use crate::services::TokenStore;
use crate::utils::AppError;

#[utoipa::path(
    get,
    path = "/api/v1/admin/signups/stats",
    tag = "Admin",
    responses(
        (status = 200, description = "Signup totals, role breakdown and the ten newest signups", body = SignupStats),
        (status = 401, description = "Missing or wrong admin key"),
        (status = 500, description = "Signup storage unavailable")
    ),
    security(
        ("admin_key" = [])
    )
)]
pub async fn get_signup_stats(store: web::Data<TokenStore>) -> HttpResponse {
    log::info!("📊 GET /admin/signups/stats");

    match store.stats().await {
        Ok(stats) => {
            log::info!("✅ Signup stats: {} total", stats.total);
            HttpResponse::Ok().json(stats)
        }
        Err(e) => {
            log::error!("❌ Failed to compute signup stats: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": e.message()
            }))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/tokens/{token}/revoke",
    tag = "Admin",
    params(
        ("token" = String, Path, description = "Access token to revoke")
    ),
    responses(
        (status = 200, description = "Token revoked (idempotent)"),
        (status = 404, description = "Unknown token"),
        (status = 401, description = "Missing or wrong admin key")
    ),
    security(
        ("admin_key" = [])
    )
)]
pub async fn revoke_token(store: web::Data<TokenStore>, path: web::Path<String>) -> HttpResponse {
    let token = path.into_inner();
    log::info!("🚫 POST /admin/tokens/…/revoke");

    match store.revoke(&token).await {
        Ok(record) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "email": record.email,
            "revokedAt": record.revoked_at
        })),
        Err(AppError::NotFound(msg)) => {
            log::warn!("⚠️ Revoke requested for unknown token");
            HttpResponse::NotFound().json(serde_json::json!({
                "success": false,
                "error": msg
            }))
        }
        Err(e) => {
            log::error!("❌ Failed to revoke token: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": e.message()
            }))
        }
    }
}
