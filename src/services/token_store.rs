use crate::{
    database::KeyValueStore,
    models::{SignupFields, SignupRecord, SignupStats},
    utils::AppError,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Slot holding the JSON array of signups.
pub const SIGNUPS_KEY: &str = "prism_signups";
pub const ACCESS_TOKEN_PREFIX: &str = "prism_";
const MAX_WRITE_ATTEMPTS: usize = 5;
const RECENT_LIMIT: usize = 10;

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// 122 random bits from the OS-seeded CSPRNG behind `uuid`'s `fast-rng`.
pub fn generate_access_token() -> String {
    format!("{}{}", ACCESS_TOKEN_PREFIX, Uuid::new_v4().simple())
}

/// Repository over the signup collection.
///
/// Every write is a read-modify-write of the whole collection guarded by the
/// backend's compare-and-swap, retried when another writer got there first.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
    token_ttl: Option<chrono::Duration>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, token_ttl: Option<chrono::Duration>) -> Self {
        Self { backend, token_ttl }
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    async fn load(&self) -> Result<(Vec<SignupRecord>, Option<u64>), AppError> {
        match self.backend.get(SIGNUPS_KEY).await? {
            Some(slot) => {
                let records: Vec<SignupRecord> = serde_json::from_str(&slot.value).map_err(|e| {
                    log::error!("❌ Slot '{}' holds malformed data: {}", SIGNUPS_KEY, e);
                    AppError::CorruptData(format!("slot '{}': {}", SIGNUPS_KEY, e))
                })?;
                Ok((records, Some(slot.version)))
            }
            None => Ok((Vec::new(), None)),
        }
    }

    /// Applies `mutate` to the collection and persists it, retrying on conflict.
    async fn update<T, F>(&self, mut mutate: F) -> Result<T, AppError>
    where
        F: FnMut(&mut Vec<SignupRecord>) -> T,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let (mut records, version) = self.load().await?;
            let result = mutate(&mut records);
            let encoded = serde_json::to_string(&records)
                .map_err(|e| AppError::Storage(format!("failed to encode signups: {}", e)))?;

            if self.backend.compare_and_swap(SIGNUPS_KEY, version, encoded).await? {
                return Ok(result);
            }
            log::warn!(
                "⚠️ Concurrent write on '{}' (attempt {}/{}), retrying",
                SIGNUPS_KEY,
                attempt,
                MAX_WRITE_ATTEMPTS
            );
        }

        Err(AppError::Conflict(format!(
            "gave up writing '{}' after {} attempts",
            SIGNUPS_KEY, MAX_WRITE_ATTEMPTS
        )))
    }

    /// Appends a new record with fresh id/token. Does not check for duplicates.
    pub async fn save(&self, fields: &SignupFields) -> Result<SignupRecord, AppError> {
        let now = Utc::now();
        let expires_at = match self.token_ttl {
            Some(ttl) => Some(now.checked_add_signed(ttl).ok_or_else(|| {
                AppError::Config("access token lifetime overflows the calendar".to_string())
            })?),
            None => None,
        };
        let record = SignupRecord {
            id: generate_id(),
            name: fields.name.trim().to_string(),
            email: fields.email.trim().to_string(),
            company: fields.company.trim().to_string(),
            role: fields
                .role
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            access_token: generate_access_token(),
            timestamp: now,
            expires_at,
            revoked_at: None,
        };

        let saved = record.clone();
        self.update(move |records| records.push(record.clone())).await?;

        log::info!("💾 Signup saved: {} ({})", saved.email, saved.id);
        Ok(saved)
    }

    pub async fn get_all(&self) -> Result<Vec<SignupRecord>, AppError> {
        Ok(self.load().await?.0)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<SignupRecord>, AppError> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .find(|r| r.email_matches(email)))
    }

    /// First record for `email` that is neither expired nor revoked at `now`.
    pub async fn find_live_by_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SignupRecord>, AppError> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .find(|r| r.email_matches(email) && r.is_live(now)))
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<SignupRecord>, AppError> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .find(|r| r.access_token == token))
    }

    /// Marks the token's record revoked. Revoking twice keeps the first timestamp.
    pub async fn revoke(&self, token: &str) -> Result<SignupRecord, AppError> {
        if self.find_by_token(token).await?.is_none() {
            return Err(AppError::NotFound("Token not found".to_string()));
        }

        let now = Utc::now();
        let revoked = self
            .update(|records| {
                records
                    .iter_mut()
                    .find(|r| r.access_token == token)
                    .map(|r| {
                        if r.revoked_at.is_none() {
                            r.revoked_at = Some(now);
                        }
                        r.clone()
                    })
            })
            .await?;

        // Record vanished between the lookup and the write
        let record = revoked.ok_or_else(|| AppError::NotFound("Token not found".to_string()))?;
        log::info!("🚫 Access token revoked for {}", record.email);
        Ok(record)
    }

    pub async fn stats(&self) -> Result<SignupStats, AppError> {
        let records = self.get_all().await?;

        let mut by_role = BTreeMap::new();
        for record in &records {
            *by_role.entry(record.role_bucket().to_string()).or_insert(0) += 1;
        }

        let recent = records.iter().rev().take(RECENT_LIMIT).cloned().collect();

        Ok(SignupStats {
            total: records.len(),
            by_role,
            recent,
        })
    }
}
