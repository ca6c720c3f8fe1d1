use crate::{services::notifier::{build_access_link, ROLE_NOT_SPECIFIED}, utils::html::escape};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const EMAIL_SUBJECT: &str = "Your PRISM Framework Strategic Playbook Access";
const PROVIDER_TIMEOUT_SECS: u64 = 10;

/// Body accepted by `POST /api/send-playbook`. Every field may be missing on the wire.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendPlaybookRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendPlaybookResponse {
    pub success: bool,
    pub message_id: Option<String>,
    pub email: String,
}

/// Fully rendered message handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered with a non-2xx status.
    Rejected { status: u16, message: String },
    /// Request never completed, or the provider is not configured.
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    MissingFields,
    Provider { status: u16, message: String },
    Internal(String),
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Returns the provider's message id.
    async fn send(&self, email: &OutboundEmail) -> Result<Option<String>, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Resend transactional-email API client.
pub struct ResendClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl ResendClient {
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl EmailProvider for ResendClient {
    async fn send(&self, email: &OutboundEmail) -> Result<Option<String>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Transport("RESEND_API_KEY is not configured".to_string()))?;

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .json(email)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        let data: Option<ResendResponse> = response.json().await.ok();

        if !status.is_success() {
            log::error!("❌ Resend API error {}: {:?}", status, data);
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message: data
                    .and_then(|d| d.message)
                    .unwrap_or_else(|| "Failed to send email".to_string()),
            });
        }

        Ok(data.and_then(|d| d.id))
    }
}

/// Renders the access email. All interpolated values are HTML-escaped.
pub fn render_access_email(
    name: &str,
    company: &str,
    role: &str,
    access_link: &str,
    home_link: &str,
) -> String {
    let name = escape(name);
    let company = escape(company);
    let role = escape(role);
    let access_link = escape(access_link);
    let home_link = escape(home_link);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Roboto', sans-serif; line-height: 1.6; color: #1e293b; margin: 0; padding: 0; background-color: #f8fafc; }}
        .container {{ max-width: 600px; margin: 40px auto; background: #ffffff; border-radius: 8px; overflow: hidden; }}
        .header {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 40px 30px; text-align: center; }}
        .content {{ padding: 40px 30px; }}
        .info-box {{ background: #f8fafc; border-left: 4px solid #2563eb; padding: 15px 20px; margin: 20px 0; }}
        .cta-button {{ display: inline-block; background: #667eea; color: white; text-decoration: none; padding: 16px 32px; border-radius: 8px; font-weight: 600; }}
        .link-box {{ background: #fef3c7; border: 1px solid #fbbf24; border-radius: 6px; padding: 15px; margin: 20px 0; word-break: break-all; }}
        .footer {{ background: #f8fafc; padding: 30px; text-align: center; color: #64748b; font-size: 14px; border-top: 1px solid #e2e8f0; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>Your PRISM Playbook Access</h1>
            <p>Strategic Guide to Legacy System Transformation</p>
        </div>
        <div class="content">
            <p>Hello <strong>{name}</strong>,</p>
            <p>Thank you for your interest in the <strong>PRISM Framework Strategic Playbook</strong>!</p>
            <div class="info-box">
                <h3>Your Details:</h3>
                <ul>
                    <li><strong>Name:</strong> {name}</li>
                    <li><strong>Company:</strong> {company}</li>
                    <li><strong>Role:</strong> {role}</li>
                </ul>
            </div>
            <p>Click the button below to access your personalized copy of the Strategic Guide:</p>
            <p style="text-align: center;"><a href="{access_link}" class="cta-button">Access Your Playbook</a></p>
            <div class="link-box">
                <p><strong>Or copy this link:</strong></p>
                <a href="{access_link}">{access_link}</a>
            </div>
            <p style="color: #64748b; font-size: 14px;">This link is unique to you. If you have any questions, feel free to reply to this email.</p>
        </div>
        <div class="footer">
            <p><strong>PRISM Framework</strong></p>
            <p><a href="{home_link}" style="color: #2563eb;">Home</a></p>
        </div>
    </div>
</body>
</html>
"#
    )
}

fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Server side of the access email: validation, rendering, one provider call.
#[derive(Clone)]
pub struct SendPlaybookService {
    provider: Arc<dyn EmailProvider>,
    from_email: String,
    default_origin: String,
    playbook_path: String,
}

impl SendPlaybookService {
    pub fn new(
        provider: Arc<dyn EmailProvider>,
        from_email: String,
        default_origin: String,
        playbook_path: String,
    ) -> Self {
        Self {
            provider,
            from_email,
            default_origin,
            playbook_path,
        }
    }

    /// `origin` is the caller's `Origin` header; links fall back to the public base URL.
    pub async fn send(
        &self,
        request: &SendPlaybookRequest,
        origin: Option<&str>,
    ) -> Result<SendPlaybookResponse, SendError> {
        let (Some(name), Some(email), Some(access_token)) = (
            required(&request.name),
            required(&request.email),
            required(&request.access_token),
        ) else {
            return Err(SendError::MissingFields);
        };

        let base_url = origin
            .map(str::trim)
            .filter(|o| !o.is_empty() && *o != "null")
            .unwrap_or(self.default_origin.as_str())
            .trim_end_matches('/');
        let access_link = build_access_link(&format!("{}{}", base_url, self.playbook_path), access_token);
        let home_link = format!("{}/", base_url);

        let html = render_access_email(
            name,
            request.company.as_deref().unwrap_or_default(),
            required(&request.role).unwrap_or(ROLE_NOT_SPECIFIED),
            &access_link,
            &home_link,
        );

        let outbound = OutboundEmail {
            from: self.from_email.clone(),
            to: email.to_string(),
            subject: EMAIL_SUBJECT.to_string(),
            html,
        };

        match self.provider.send(&outbound).await {
            Ok(message_id) => {
                log::info!("📧 Playbook access email sent to {}", email);
                Ok(SendPlaybookResponse {
                    success: true,
                    message_id,
                    email: email.to_string(),
                })
            }
            Err(ProviderError::Rejected { status, message }) => {
                Err(SendError::Provider { status, message })
            }
            Err(ProviderError::Transport(message)) => {
                log::error!("❌ Error sending email: {}", message);
                Err(SendError::Internal(message))
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Provider double: records outbound mail and replays a canned result.
    pub struct StubProvider {
        pub outcome: Result<Option<String>, ProviderError>,
        pub sent: Mutex<Vec<OutboundEmail>>,
    }

    impl StubProvider {
        pub fn ok(id: &str) -> Self {
            Self {
                outcome: Ok(Some(id.to_string())),
                sent: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(outcome: ProviderError) -> Self {
            Self {
                outcome: Err(outcome),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EmailProvider for StubProvider {
        async fn send(&self, email: &OutboundEmail) -> Result<Option<String>, ProviderError> {
            self.sent.lock().unwrap().push(email.clone());
            self.outcome.clone()
        }
    }
}
