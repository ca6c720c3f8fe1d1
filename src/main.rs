mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{http::header, middleware::{Compress, Logger}, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::database::{KeyValueStore, MemoryStore, MongoDB};
use crate::middleware::AdminKey;
use crate::services::{AccessGate, ResendClient, SendPlaybookService, SignupService, TokenStore};

fn build_cors(config: &AppConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600);

    if config.cors_allowed_origins.is_empty() {
        cors = cors.allow_any_origin();
    } else {
        for origin in &config.cors_allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }
    cors
}

fn io_error(e: utils::AppError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(io_error)?;

    log::info!("🚀 Starting Playbook Gate...");

    let backend: Arc<dyn KeyValueStore> = match &config.database_url {
        Some(url) => {
            let db = MongoDB::new(url).await.map_err(io_error)?;
            log::info!("✅ MongoDB connected successfully");
            Arc::new(db)
        }
        None => {
            log::warn!("⚠️ DATABASE_URL not set, signups are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    match config.token_ttl {
        Some(ttl) => log::info!("⏳ Access tokens expire after {} days", ttl.num_days()),
        None => log::info!("⏳ Access tokens never expire"),
    }

    let store = TokenStore::new(backend, config.token_ttl);
    let gate = AccessGate::new(store.clone());
    let signups = SignupService::new(store.clone(), services::build_notifier(&config));

    let resend = ResendClient::new(config.resend_api_url.clone(), config.resend_api_key.clone());
    if !resend.is_configured() {
        log::warn!("⚠️ RESEND_API_KEY not set, /api/send-playbook will answer 500");
    }
    let sender = SendPlaybookService::new(
        Arc::new(resend),
        config.from_email.clone(),
        config.public_base_url.clone(),
        config.playbook_path.clone(),
    );

    let store_data = web::Data::new(store);
    let gate_data = web::Data::new(gate);
    let signups_data = web::Data::new(signups);
    let sender_data = web::Data::new(sender);
    let admin_key = web::Data::new(AdminKey(config.admin_api_key.clone()));

    let bind_addr = format!("{}:{}", config.host, config.port);
    log::info!("🌐 Server starting on {}", bind_addr);
    log::info!("📖 Playbook page at: {}", config.playbook_url());
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_addr);

    let server_config = config.clone();
    HttpServer::new(move || {
        // Generate OpenAPI document
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(store_data.clone())
            .app_data(gate_data.clone())
            .app_data(signups_data.clone())
            .app_data(sender_data.clone())
            .app_data(admin_key.clone())
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .wrap(Compress::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            // Health check
            .route("/health", web::get().to(api::health::health_check))
            // Metrics
            .route("/metrics", web::get().to(api::metrics::get_metrics))
            // Gated page: Locked / Unlocked decided from ?access=
            .route(&server_config.playbook_path, web::get().to(api::playbook::view_playbook))
            // Email sender: answers any origin itself
            .service(api::send_playbook::resource())
            .service(
                web::scope("/api/v1")
                    .wrap(build_cors(&server_config))
                    .configure(api::configure_v1)
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
