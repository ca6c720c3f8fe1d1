use crate::{
    models::SignupFields,
    services::notifier::{AccessNotification, DeliveryReceipt, Notifier},
    services::token_store::TokenStore,
    utils::AppError,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<SignupFields, AppError> {
        let name = self.name.trim();
        let email = self.email.trim();

        if name.is_empty() || email.is_empty() {
            return Err(AppError::Validation("Name and email are required".to_string()));
        }
        if !email.contains('@') {
            return Err(AppError::Validation("Please enter a valid email address".to_string()));
        }

        Ok(SignupFields {
            name: name.to_string(),
            email: email.to_string(),
            company: self.company.as_deref().unwrap_or_default().trim().to_string(),
            role: self
                .role
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub email: String,
    /// The email already had a live signup; its existing link was resent.
    pub resent: bool,
    pub simulated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Set in simulated mode: where the client should navigate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl SignupResponse {
    fn from_receipt(receipt: DeliveryReceipt, resent: bool) -> Self {
        Self {
            success: true,
            email: receipt.email,
            resent,
            simulated: receipt.simulated,
            message_id: receipt.message_id,
            redirect_to: receipt.access_link,
        }
    }
}

/// Handles a signup form submission end to end.
#[derive(Clone)]
pub struct SignupService {
    store: TokenStore,
    notifier: Arc<dyn Notifier>,
}

impl SignupService {
    pub fn new(store: TokenStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub fn notifier_mode(&self) -> &'static str {
        self.notifier.mode()
    }

    pub async fn submit(&self, request: &SignupRequest) -> Result<SignupResponse, AppError> {
        let fields = request.validate()?;

        // Reuse the live record so the same link goes out again
        let (record, resent) = match self.store.find_live_by_email(&fields.email, Utc::now()).await? {
            Some(existing) => {
                log::info!("🔁 {} already registered, resending access link", existing.email);
                (existing, true)
            }
            None => (self.store.save(&fields).await?, false),
        };

        let notification = AccessNotification {
            name: fields.name,
            email: record.email.clone(),
            company: fields.company,
            role: fields.role,
            access_token: record.access_token,
        };

        let receipt = self.notifier.send_access(&notification).await?;
        Ok(SignupResponse::from_receipt(receipt, resent))
    }
}
