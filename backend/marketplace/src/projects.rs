//! Project store: CRUD for projects, sellers and buyers, plus folding bids
//! into a project's bid map.

use std::sync::Arc;

use axum::async_trait;
use tracing::{debug, error, info, warn};

use crate::config::DatabaseDetails;
use crate::db::{DocumentStore, Namespace};
use crate::errors::{MarketError, Result};
use crate::models::{Bid, Buyer, Document, Project, Seller};

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(&self, project: Project) -> Result<()>;
    async fn get_projects(&self) -> Result<Vec<Project>>;
    async fn get_project(&self, project_id: &str) -> Result<Project>;
    /// Insert or replace `bid` in the bid map of `project_id`.
    async fn update_project(&self, project_id: &str, bid: Bid) -> Result<()>;

    async fn create_buyer(&self, buyer: Buyer) -> Result<()>;
    async fn get_buyer(&self, buyer_id: &str) -> Result<Buyer>;

    async fn create_seller(&self, seller: Seller) -> Result<()>;
}

pub type SharedProjectStore = Arc<dyn ProjectStore>;

/// [`ProjectStore`] over any [`DocumentStore`].
pub struct ProjectManager {
    store: Arc<dyn DocumentStore>,
    databases: DatabaseDetails,
    fetch_limit: u32,
}

impl ProjectManager {
    pub fn new(store: Arc<dyn DocumentStore>, databases: DatabaseDetails, fetch_limit: u32) -> Self {
        Self {
            store,
            databases,
            fetch_limit,
        }
    }

    async fn insert<T: Document>(&self, ns: Namespace, record: &T) -> Result<()> {
        let document = serde_json::to_value(record)?;
        self.store
            .insert_one(&ns, record.document_id(), document)
            .await
            .inspect_err(|e| error!("insert into {ns} failed: {e}"))
    }

    async fn find<T: Document>(&self, ns: Namespace, id: &str) -> Result<T> {
        let document = self
            .store
            .find_one(&ns, id)
            .await
            .inspect_err(|e| error!("lookup in {ns} failed: {e}"))?;
        Ok(serde_json::from_value(document)?)
    }
}

#[async_trait]
impl ProjectStore for ProjectManager {
    async fn create_project(&self, project: Project) -> Result<()> {
        info!("Creating project {:?}", project.id);
        self.insert(self.databases.projects(), &project).await
    }

    async fn get_projects(&self) -> Result<Vec<Project>> {
        let ns = self.databases.projects();
        let documents = self
            .store
            .find_all(&ns, self.fetch_limit)
            .await
            .inspect_err(|e| error!("listing {ns} failed: {e}"))?;
        debug!("Fetched {} projects", documents.len());

        documents
            .into_iter()
            .map(|d| serde_json::from_value(d).map_err(MarketError::from))
            .collect()
    }

    async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.find(self.databases.projects(), project_id).await
    }

    // Read-modify-write of the whole project document. Two concurrent updates
    // of the same project can race and the later write drops the other bid.
    async fn update_project(&self, project_id: &str, bid: Bid) -> Result<()> {
        let ns = self.databases.projects();
        let mut project: Project = self.find(ns.clone(), project_id).await?;

        let bid_id = bid.id.clone();
        project.upsert_bid(bid);
        info!(
            "Placed bid {bid_id:?} on project {project_id:?} ({} bids)",
            project.bid_count()
        );

        let matched = self
            .store
            .update_one(&ns, project_id, serde_json::to_value(&project)?)
            .await
            .inspect_err(|e| error!("updating {ns} failed: {e}"))?;
        if matched == 0 {
            warn!("Project {project_id:?} vanished before its bid map was written back");
        }
        Ok(())
    }

    async fn create_buyer(&self, buyer: Buyer) -> Result<()> {
        info!("Creating buyer {:?}", buyer.id);
        self.insert(self.databases.buyers(), &buyer).await
    }

    async fn get_buyer(&self, buyer_id: &str) -> Result<Buyer> {
        self.find(self.databases.buyers(), buyer_id).await
    }

    async fn create_seller(&self, seller: Seller) -> Result<()> {
        info!("Creating seller {:?}", seller.id);
        self.insert(self.databases.sellers(), &seller).await
    }
}

#[cfg(test)]
pub(crate) fn test_databases() -> DatabaseDetails {
    DatabaseDetails {
        buyers_db_name: "buyersDB".to_string(),
        sellers_db_name: "sellersDB".to_string(),
        projects_db_name: "projectsDB".to_string(),
        collection_name: "bids".to_string(),
    }
}

#[cfg(test)]
pub(crate) fn in_memory_manager() -> ProjectManager {
    ProjectManager::new(
        Arc::new(crate::memory::InMemoryStore::new()),
        test_databases(),
        i32::MAX as u32,
    )
}
