use crate::{config::AppConfig, services::access_gate::ACCESS_PARAM, utils::AppError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const ROLE_NOT_SPECIFIED: &str = "Not specified";
const ENDPOINT_TIMEOUT_SECS: u64 = 10;

/// What the visitor should receive: their details plus the token to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessNotification {
    pub name: String,
    pub email: String,
    pub company: String,
    pub role: Option<String>,
    pub access_token: String,
}

impl AccessNotification {
    pub fn role_or_default(&self) -> &str {
        self.role
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(ROLE_NOT_SPECIFIED)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub email: String,
    pub message_id: Option<String>,
    /// Nothing was sent; the caller should send the visitor to `access_link`.
    pub simulated: bool,
    pub access_link: Option<String>,
}

/// Appends the token as the `access` query parameter of the playbook page URL.
pub fn build_access_link(page_url: &str, token: &str) -> String {
    let separator = if page_url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}{}={}",
        page_url,
        separator,
        ACCESS_PARAM,
        urlencoding::encode(token)
    )
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_access(&self, notification: &AccessNotification) -> Result<DeliveryReceipt, AppError>;

    fn mode(&self) -> &'static str;
}

/// Picks the endpoint notifier when a send endpoint is configured, else simulated.
pub fn build_notifier(config: &AppConfig) -> Arc<dyn Notifier> {
    match &config.send_endpoint {
        Some(endpoint) => {
            log::info!("📧 Access emails go through {}", endpoint);
            Arc::new(EndpointNotifier::new(endpoint.clone()))
        }
        None => {
            log::warn!("⚠️ PLAYBOOK_SEND_ENDPOINT not configured. Using simulated notifier.");
            Arc::new(SimulatedNotifier::new(config.playbook_url(), config.simulated_delay))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EndpointRequest<'a> {
    name: &'a str,
    email: &'a str,
    company: &'a str,
    role: &'a str,
    access_token: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EndpointResponse {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Posts the signup to the `send-playbook` endpoint, which talks to the provider.
pub struct EndpointNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl EndpointNotifier {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl Notifier for EndpointNotifier {
    async fn send_access(&self, notification: &AccessNotification) -> Result<DeliveryReceipt, AppError> {
        let body = EndpointRequest {
            name: &notification.name,
            email: &notification.email,
            company: &notification.company,
            role: notification.role_or_default(),
            access_token: &notification.access_token,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(ENDPOINT_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                log::error!("❌ Email send failed: {}", e);
                AppError::Notification(format!("Failed to send email: {}", e))
            })?;

        let status = response.status();
        // A non-JSON body still yields the generic message below
        let data: EndpointResponse = response.json().await.unwrap_or_default();

        if !status.is_success() {
            let message = data
                .error
                .unwrap_or_else(|| "Failed to send email".to_string());
            log::error!("❌ Send endpoint returned {}: {}", status, message);
            return Err(AppError::Notification(message));
        }

        log::info!("✅ Email sent successfully to {}", notification.email);
        Ok(DeliveryReceipt {
            email: notification.email.clone(),
            message_id: data.message_id,
            simulated: false,
            access_link: None,
        })
    }

    fn mode(&self) -> &'static str {
        "endpoint"
    }
}

/// Logs the email instead of sending it and hands the access link straight back.
pub struct SimulatedNotifier {
    page_url: String,
    delay: Duration,
}

impl SimulatedNotifier {
    pub fn new(page_url: String, delay: Duration) -> Self {
        Self { page_url, delay }
    }
}

#[async_trait]
impl Notifier for SimulatedNotifier {
    async fn send_access(&self, notification: &AccessNotification) -> Result<DeliveryReceipt, AppError> {
        let access_link = build_access_link(&self.page_url, &notification.access_token);

        log::info!("=== SIMULATED: email not sent, no provider configured ===");
        log::info!("To: {}", notification.email);
        log::info!("Name: {}", notification.name);
        log::info!("Company: {}", notification.company);
        log::info!("Role: {}", notification.role_or_default());
        log::info!("Access Link: {}", access_link);

        tokio::time::sleep(self.delay).await;

        Ok(DeliveryReceipt {
            email: notification.email.clone(),
            message_id: None,
            simulated: true,
            access_link: Some(access_link),
        })
    }

    fn mode(&self) -> &'static str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification() -> AccessNotification {
        AccessNotification {
            name: "Ada".to_string(),
            email: "ada@x.com".to_string(),
            company: "Acme".to_string(),
            role: None,
            access_token: "prism_abc".to_string(),
        }
    }

    #[test]
    fn test_build_access_link() {
        assert_eq!(
            build_access_link("https://prism.example.com/playbook", "prism_abc"),
            "https://prism.example.com/playbook?access=prism_abc"
        );
        assert_eq!(
            build_access_link("https://prism.example.com/playbook?lang=en", "a b&c"),
            "https://prism.example.com/playbook?lang=en&access=a%20b%26c"
        );
    }

    #[test]
    fn test_role_defaults_to_not_specified() {
        let mut n = notification();
        assert_eq!(n.role_or_default(), ROLE_NOT_SPECIFIED);
        n.role = Some("CTO".to_string());
        assert_eq!(n.role_or_default(), "CTO");
    }

    #[tokio::test]
    async fn test_simulated_notifier_returns_link() {
        let notifier = SimulatedNotifier::new("http://localhost:3002/playbook".to_string(), Duration::ZERO);
        let receipt = notifier.send_access(&notification()).await.unwrap();

        assert!(receipt.simulated);
        assert_eq!(receipt.email, "ada@x.com");
        assert_eq!(
            receipt.access_link.as_deref(),
            Some("http://localhost:3002/playbook?access=prism_abc")
        );
        assert_eq!(notifier.mode(), "simulated");
    }

    #[test]
    fn test_build_notifier_selects_mode() {
        let simulated = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(build_notifier(&simulated).mode(), "simulated");

        let vars: HashMap<&str, &str> =
            HashMap::from([("PLAYBOOK_SEND_ENDPOINT", "https://prism.example.com/api/send-playbook")]);
        let configured = AppConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(build_notifier(&configured).mode(), "endpoint");
    }

    #[tokio::test]
    async fn test_endpoint_notifier_surfaces_transport_error() {
        // Nothing listens on port 9 locally
        let notifier = EndpointNotifier::new("http://127.0.0.1:9/api/send-playbook".to_string());
        let err = notifier.send_access(&notification()).await.unwrap_err();
        assert!(matches!(err, AppError::Notification(msg) if msg.starts_with("Failed to send email")));
    }

    async fn endpoint_answering(response: ResponseTemplate) -> (MockServer, EndpointNotifier) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/send-playbook"))
            .respond_with(response)
            .mount(&server)
            .await;
        let notifier = EndpointNotifier::new(format!("{}/api/send-playbook", server.uri()));
        (server, notifier)
    }

    #[tokio::test]
    async fn test_endpoint_notifier_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/send-playbook"))
            .and(body_partial_json(serde_json::json!({
                "email": "ada@x.com",
                "role": ROLE_NOT_SPECIFIED,
                "accessToken": "prism_abc"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "messageId": "re_123",
                "email": "ada@x.com"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = EndpointNotifier::new(format!("{}/api/send-playbook", server.uri()));
        let receipt = notifier.send_access(&notification()).await.unwrap();

        assert!(!receipt.simulated);
        assert_eq!(receipt.message_id.as_deref(), Some("re_123"));
        assert!(receipt.access_link.is_none());
    }

    #[tokio::test]
    async fn test_endpoint_notifier_surfaces_error_body() {
        let (_server, notifier) = endpoint_answering(
            ResponseTemplate::new(503).set_body_json(serde_json::json!({ "error": "Daily quota exceeded" })),
        )
        .await;

        let err = notifier.send_access(&notification()).await.unwrap_err();
        assert_eq!(err, AppError::Notification("Daily quota exceeded".to_string()));
    }

    #[tokio::test]
    async fn test_endpoint_notifier_non_json_error_falls_back() {
        let (_server, notifier) =
            endpoint_answering(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>")).await;

        let err = notifier.send_access(&notification()).await.unwrap_err();
        assert_eq!(err, AppError::Notification("Failed to send email".to_string()));
    }
}
