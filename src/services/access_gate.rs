use crate::{services::token_store::TokenStore, utils::AppError};
use actix_web::web;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Query parameter carrying the access token on the playbook URL.
pub const ACCESS_PARAM: &str = "access";

/// Why a presented token did not unlock the playbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GateNotice {
    InvalidLink,
    ExpiredLink,
    RevokedLink,
}

impl GateNotice {
    pub fn message(&self) -> &'static str {
        match self {
            GateNotice::InvalidLink => "Invalid access link. Please request a new one.",
            GateNotice::ExpiredLink => "This access link has expired. Please request a new one.",
            GateNotice::RevokedLink => "This access link is no longer valid. Please request a new one.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// Show the signup form.
    Locked { notice: Option<GateNotice> },
    /// Show the playbook, greeting the visitor by name.
    Unlocked { name: String },
}

impl GateState {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, GateState::Unlocked { .. })
    }
}

/// Reads the first `access` parameter from a raw query string. Blank counts as absent.
pub fn extract_access_token(query: &str) -> Option<String> {
    let pairs = web::Query::<Vec<(String, String)>>::from_query(query).ok()?.into_inner();
    pairs
        .into_iter()
        .find(|(key, _)| key == ACCESS_PARAM)
        .map(|(_, token)| token.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[derive(Clone)]
pub struct AccessGate {
    store: TokenStore,
}

impl AccessGate {
    pub fn new(store: TokenStore) -> Self {
        Self { store }
    }

    pub async fn evaluate(&self, token: Option<&str>) -> Result<GateState, AppError> {
        self.evaluate_at(token, Utc::now()).await
    }

    pub async fn evaluate_at(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<GateState, AppError> {
        let Some(token) = token else {
            return Ok(GateState::Locked { notice: None });
        };

        let state = match self.store.find_by_token(token).await? {
            None => GateState::Locked {
                notice: Some(GateNotice::InvalidLink),
            },
            Some(record) if record.is_revoked() => GateState::Locked {
                notice: Some(GateNotice::RevokedLink),
            },
            Some(record) if record.is_expired(now) => GateState::Locked {
                notice: Some(GateNotice::ExpiredLink),
            },
            Some(record) => GateState::Unlocked { name: record.name },
        };

        match &state {
            GateState::Unlocked { name } => log::info!("🔓 Playbook unlocked for {}", name),
            GateState::Locked { notice } => log::warn!("🔒 Access token rejected: {:?}", notice),
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::SignupFields;
    use std::sync::Arc;

    fn gate() -> (AccessGate, TokenStore) {
        let store = TokenStore::new(Arc::new(MemoryStore::new()), Some(chrono::Duration::days(30)));
        (AccessGate::new(store.clone()), store)
    }

    fn ada() -> SignupFields {
        SignupFields {
            name: "Ada".to_string(),
            email: "ada@x.com".to_string(),
            company: "Acme".to_string(),
            role: Some("CTO".to_string()),
        }
    }

    #[test]
    fn test_extract_access_token() {
        assert_eq!(extract_access_token("access=prism_abc"), Some("prism_abc".to_string()));
        assert_eq!(
            extract_access_token("utm=x&access=prism%5Fabc"),
            Some("prism_abc".to_string())
        );
        assert_eq!(extract_access_token("access="), None);
        assert_eq!(extract_access_token(""), None);
        assert_eq!(extract_access_token("other=1"), None);
    }

    #[test]
    fn test_repeated_access_param_takes_first() {
        assert_eq!(extract_access_token("access=a&access=b"), Some("a".to_string()));
        assert_eq!(extract_access_token("access=&access=b"), None);
    }

    #[actix_web::test]
    async fn test_repeated_access_param_unlocks_with_first_token() {
        let (gate, store) = gate();
        let record = store.save(&ada()).await.unwrap();

        let query = format!("access={}&access=bogus", record.access_token);
        let token = extract_access_token(&query);
        let state = gate.evaluate(token.as_deref()).await.unwrap();
        assert_eq!(state, GateState::Unlocked { name: "Ada".to_string() });
    }

    #[actix_web::test]
    async fn test_no_token_is_locked_without_notice() {
        let (gate, _) = gate();
        assert_eq!(gate.evaluate(None).await.unwrap(), GateState::Locked { notice: None });
    }

    #[actix_web::test]
    async fn test_valid_token_unlocks_with_name() {
        let (gate, store) = gate();
        let record = store.save(&ada()).await.unwrap();

        let state = gate.evaluate(Some(&record.access_token)).await.unwrap();
        assert_eq!(state, GateState::Unlocked { name: "Ada".to_string() });
        assert!(state.is_unlocked());
    }

    #[actix_web::test]
    async fn test_bogus_token_is_invalid() {
        let (gate, store) = gate();
        store.save(&ada()).await.unwrap();

        let state = gate.evaluate(Some("bogus")).await.unwrap();
        assert_eq!(state, GateState::Locked { notice: Some(GateNotice::InvalidLink) });
    }

    #[actix_web::test]
    async fn test_expired_token() {
        let (gate, store) = gate();
        let record = store.save(&ada()).await.unwrap();

        let later = Utc::now() + chrono::Duration::days(31);
        let state = gate.evaluate_at(Some(&record.access_token), later).await.unwrap();
        assert_eq!(state, GateState::Locked { notice: Some(GateNotice::ExpiredLink) });
    }

    #[actix_web::test]
    async fn test_revoked_token() {
        let (gate, store) = gate();
        let record = store.save(&ada()).await.unwrap();
        store.revoke(&record.access_token).await.unwrap();

        let state = gate.evaluate(Some(&record.access_token)).await.unwrap();
        assert_eq!(state, GateState::Locked { notice: Some(GateNotice::RevokedLink) });
    }
}
