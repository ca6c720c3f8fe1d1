use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Form fields captured for a playbook signup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SignupFields {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// One persisted signup (slot `prism_signups`, JSON array element).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub access_token: String,
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl SignupRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Live records can unlock the playbook and are reused on resubmission.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired(now)
    }

    pub fn email_matches(&self, email: &str) -> bool {
        self.email.trim().to_lowercase() == email.trim().to_lowercase()
    }

    /// Role bucket used by stats; missing or blank roles count as `other`.
    pub fn role_bucket(&self) -> &str {
        match self.role.as_deref().map(str::trim) {
            Some(role) if !role.is_empty() => role,
            _ => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupStats {
    pub total: usize,
    pub by_role: BTreeMap<String, usize>,
    /// Newest first, at most ten entries.
    pub recent: Vec<SignupRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record() -> SignupRecord {
        SignupRecord {
            id: "id-1".to_string(),
            name: "Ada".to_string(),
            email: "Foo@Bar.com".to_string(),
            company: "Acme".to_string(),
            role: Some("CTO".to_string()),
            access_token: "prism_abc".to_string(),
            timestamp: Utc::now(),
            expires_at: None,
            revoked_at: None,
        }
    }

    #[test]
    fn test_email_match_is_case_insensitive() {
        let r = record();
        assert!(r.email_matches("foo@bar.com"));
        assert!(r.email_matches("  FOO@BAR.COM "));
        assert!(!r.email_matches("foo@baz.com"));
    }

    #[test]
    fn test_liveness() {
        let now = Utc::now();
        let mut r = record();
        assert!(r.is_live(now));

        r.expires_at = Some(now - Duration::seconds(1));
        assert!(r.is_expired(now));
        assert!(!r.is_live(now));

        r.expires_at = Some(now + Duration::days(1));
        r.revoked_at = Some(now);
        assert!(!r.is_live(now));
    }

    #[test]
    fn test_role_bucket() {
        let mut r = record();
        assert_eq!(r.role_bucket(), "CTO");
        r.role = Some("  ".to_string());
        assert_eq!(r.role_bucket(), "other");
        r.role = None;
        assert_eq!(r.role_bucket(), "other");
    }

    #[test]
    fn test_wire_format_uses_camel_case() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["accessToken"], "prism_abc");
        assert!(json.get("expiresAt").is_none());

        // Records written before expiry existed still load
        let legacy = r#"{"id":"x","name":"Ada","email":"a@x.com","company":"Acme",
            "role":"CTO","accessToken":"prism_x","timestamp":"2025-01-02T03:04:05.678Z"}"#;
        let parsed: SignupRecord = serde_json::from_str(legacy).unwrap();
        assert_eq!(parsed.access_token, "prism_x");
        assert!(parsed.expires_at.is_none());
    }
}
