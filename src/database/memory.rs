//! In-process slot store. Used by tests and when no `DATABASE_URL` is set;
//! contents are lost on restart.

use super::{KeyValueStore, Versioned};
use crate::utils::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<RwLock<HashMap<String, Versioned>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a slot unconditionally, bumping its version.
    #[cfg(test)]
    pub async fn put_raw(&self, key: &str, value: &str) {
        let mut slots = self.slots.write().await;
        let version = slots.get(key).map_or(1, |v| v.version + 1);
        slots.insert(
            key.to_string(),
            Versioned {
                value: value.to_string(),
                version,
            },
        );
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Versioned>, AppError> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: String,
    ) -> Result<bool, AppError> {
        let mut slots = self.slots.write().await;
        let current = slots.get(key).map(|v| v.version);
        if current != expected {
            return Ok(false);
        }
        let version = expected.map_or(1, |v| v + 1);
        slots.insert(key.to_string(), Versioned { value, version });
        Ok(true)
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
