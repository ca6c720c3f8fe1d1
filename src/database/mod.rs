pub mod memory;

pub use memory::MemoryStore;

use crate::utils::AppError;
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{Client, Collection, Database};
use serde::{Deserialize, Serialize};

const SLOTS_COLLECTION: &str = "kv_slots";
const DUPLICATE_KEY_CODE: i32 = 11000;

/// A stored value together with the version it was written at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub value: String,
    pub version: u64,
}

/// Key/value slots with optimistic concurrency.
///
/// `compare_and_swap` only writes when the slot is still at `expected`
/// (`None` = slot must not exist yet) and reports whether it did. Callers
/// re-read and retry on `false`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Versioned>, AppError>;

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: String,
    ) -> Result<bool, AppError>;

    /// Backend name reported by `/health`.
    fn kind(&self) -> &'static str;
}

#[derive(Debug, Serialize, Deserialize)]
struct SlotDocument {
    #[serde(rename = "_id")]
    key: String,
    value: String,
    version: i64,
}

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, AppError> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(10);
        client_options.min_pool_size = Some(1);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .rsplit('/')
            .next()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty() && !s.contains(':') && !s.contains('@'))
            .unwrap_or("playbook_gate");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;
        log::info!("✅ MongoDB database '{}' reachable", db_name);

        Ok(Self { db })
    }

    fn slots(&self) -> Collection<SlotDocument> {
        self.db.collection(SLOTS_COLLECTION)
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY_CODE
    )
}

#[async_trait]
impl KeyValueStore for MongoDB {
    async fn get(&self, key: &str) -> Result<Option<Versioned>, AppError> {
        let slot = self.slots().find_one(doc! { "_id": key }).await?;

        Ok(slot.map(|s| Versioned {
            value: s.value,
            version: s.version.max(0) as u64,
        }))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: String,
    ) -> Result<bool, AppError> {
        match expected {
            None => {
                let slot = SlotDocument {
                    key: key.to_string(),
                    value,
                    version: 1,
                };
                match self.slots().insert_one(slot).await {
                    Ok(_) => Ok(true),
                    // Someone else created the slot first
                    Err(e) if is_duplicate_key(&e) => Ok(false),
                    Err(e) => Err(e.into()),
                }
            }
            Some(version) => {
                let current = version as i64;
                let result = self
                    .slots()
                    .update_one(
                        doc! { "_id": key, "version": current },
                        doc! { "$set": { "value": value, "version": current + 1 } },
                    )
                    .await?;
                Ok(result.matched_count == 1)
            }
        }
    }

    fn kind(&self) -> &'static str {
        "mongodb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_compare_and_swap() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/playbook_gate_test".to_string());
        let db = MongoDB::new(&uri).await.unwrap();

        let key = format!("test_slot_{}", uuid::Uuid::new_v4().simple());
        assert!(db.get(&key).await.unwrap().is_none());

        assert!(db.compare_and_swap(&key, None, "[]".to_string()).await.unwrap());
        assert!(!db.compare_and_swap(&key, None, "[1]".to_string()).await.unwrap());

        let slot = db.get(&key).await.unwrap().unwrap();
        assert_eq!(slot.version, 1);
        assert!(db.compare_and_swap(&key, Some(1), "[2]".to_string()).await.unwrap());
        assert!(!db.compare_and_swap(&key, Some(1), "[3]".to_string()).await.unwrap());
        assert_eq!(db.get(&key).await.unwrap().unwrap().value, "[2]");
    }
}
