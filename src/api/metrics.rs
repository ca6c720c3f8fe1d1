use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static SIGNUPS_CREATED: AtomicU64 = AtomicU64::new(0);
static SIGNUPS_RESENT: AtomicU64 = AtomicU64::new(0);
static ACCESS_GRANTED: AtomicU64 = AtomicU64::new(0);
static ACCESS_DENIED: AtomicU64 = AtomicU64::new(0);
static EMAILS_SENT: AtomicU64 = AtomicU64::new(0);
static EMAIL_FAILURES: AtomicU64 = AtomicU64::new(0);

pub fn increment_request_count() {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn record_signup(resent: bool) {
    if resent {
        SIGNUPS_RESENT.fetch_add(1, Ordering::Relaxed);
    } else {
        SIGNUPS_CREATED.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_access(granted: bool) {
    if granted {
        ACCESS_GRANTED.fetch_add(1, Ordering::Relaxed);
    } else {
        ACCESS_DENIED.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_email(sent: bool) {
    if sent {
        EMAILS_SENT.fetch_add(1, Ordering::Relaxed);
    } else {
        EMAIL_FAILURES.fetch_add(1, Ordering::Relaxed);
    }
}

/// Serializes tests that assert exact counter values.
#[cfg(test)]
pub fn serial() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub http_requests_total: u64,
    pub http_errors_total: u64,
    pub signups_created_total: u64,
    pub signups_resent_total: u64,
    pub access_granted_total: u64,
    pub access_denied_total: u64,
    pub emails_sent_total: u64,
    pub email_failures_total: u64,
}

impl MetricsResponse {
    pub fn snapshot() -> Self {
        Self {
            http_requests_total: REQUEST_COUNT.load(Ordering::Relaxed),
            http_errors_total: ERROR_COUNT.load(Ordering::Relaxed),
            signups_created_total: SIGNUPS_CREATED.load(Ordering::Relaxed),
            signups_resent_total: SIGNUPS_RESENT.load(Ordering::Relaxed),
            access_granted_total: ACCESS_GRANTED.load(Ordering::Relaxed),
            access_denied_total: ACCESS_DENIED.load(Ordering::Relaxed),
            emails_sent_total: EMAILS_SENT.load(Ordering::Relaxed),
            email_failures_total: EMAIL_FAILURES.load(Ordering::Relaxed),
        }
    }

    /// Prometheus text exposition format.
    pub fn render(&self) -> String {
        let counters = [
            ("http_requests_total", "Total number of HTTP requests", self.http_requests_total),
            ("http_errors_total", "Total number of HTTP errors", self.http_errors_total),
            ("signups_created_total", "Signups that created a new record", self.signups_created_total),
            ("signups_resent_total", "Signups that resent an existing link", self.signups_resent_total),
            ("access_granted_total", "Playbook requests with a valid token", self.access_granted_total),
            ("access_denied_total", "Playbook requests with a rejected token", self.access_denied_total),
            ("emails_sent_total", "Access emails accepted by the provider", self.emails_sent_total),
            ("email_failures_total", "Access emails that failed to send", self.email_failures_total),
        ];

        counters
            .iter()
            .map(|(name, help, value)| {
                format!("# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Service counters in Prometheus text format", body = MetricsResponse)
    )
)]
pub async fn get_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(MetricsResponse::snapshot().render())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_every_counter() {
        let text = MetricsResponse::snapshot().render();
        for name in [
            "http_requests_total",
            "signups_created_total",
            "access_denied_total",
            "email_failures_total",
        ] {
            assert!(text.contains(&format!("# TYPE {} counter", name)));
        }
    }

    #[test]
    fn test_counters_only_grow() {
        let _metrics = serial();
        let before = MetricsResponse::snapshot();
        record_signup(false);
        record_access(true);
        record_email(false);
        let after = MetricsResponse::snapshot();
        assert!(after.signups_created_total > before.signups_created_total);
        assert!(after.access_granted_total > before.access_granted_total);
        assert!(after.email_failures_total > before.email_failures_total);
    }
}
