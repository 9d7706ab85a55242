//! In-process [`DocumentStore`], used by unit tests and `STORE_BACKEND=memory`.

use std::collections::HashMap;

use axum::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::db::{DocumentStore, Namespace};
use crate::errors::{MarketError, Result};

#[derive(Debug)]
struct Entry {
    id: String,
    body: Value,
}

/// Documents are kept per namespace in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    namespaces: RwLock<HashMap<Namespace, Vec<Entry>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert_one(&self, ns: &Namespace, id: &str, document: Value) -> Result<()> {
        debug!("insert {ns} id={id}");
        self.namespaces
            .write()
            .await
            .entry(ns.clone())
            .or_default()
            .push(Entry {
                id: id.to_string(),
                body: document,
            });
        Ok(())
    }

    async fn update_one(&self, ns: &Namespace, id: &str, document: Value) -> Result<u64> {
        debug!("update {ns} id={id}");
        let mut namespaces = self.namespaces.write().await;
        let entry = namespaces
            .get_mut(ns)
            .and_then(|entries| entries.iter_mut().find(|e| e.id == id));
        Ok(match entry {
            Some(entry) => {
                entry.body = document;
                1
            }
            None => 0,
        })
    }

    async fn find_one(&self, ns: &Namespace, id: &str) -> Result<Value> {
        debug!("find {ns} id={id}");
        self.namespaces
            .read()
            .await
            .get(ns)
            .and_then(|entries| entries.iter().find(|e| e.id == id))
            .map(|e| e.body.clone())
            .ok_or_else(|| MarketError::NotFound {
                namespace: ns.clone(),
                id: id.to_string(),
            })
    }

    async fn find_all(&self, ns: &Namespace, limit: u32) -> Result<Vec<Value>> {
        debug!("find all {ns} limit={limit}");
        Ok(self
            .namespaces
            .read()
            .await
            .get(ns)
            .map(|entries| {
                entries
                    .iter()
                    .take(if limit == 0 { usize::MAX } else { limit as usize })
                    .map(|e| e.body.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}
