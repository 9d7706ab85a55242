//! Bid evaluator. Places bids and picks the winning (lowest) one.

use tracing::info;

use crate::errors::{MarketError, Result};
use crate::models::{Bid, Buyer, Project};
use crate::projects::SharedProjectStore;

#[derive(Clone)]
pub struct BidEvaluator {
    projects: SharedProjectStore,
}

impl BidEvaluator {
    pub fn new(projects: SharedProjectStore) -> Self {
        Self { projects }
    }

    /// Record `bid` against `project_id`, replacing any bid with the same id.
    ///
    /// Neither the amount nor the referenced buyer and seller are checked.
    pub async fn place_bid(&self, project_id: &str, bid: Bid) -> Result<()> {
        self.projects.update_project(project_id, bid).await
    }

    /// Resolve the buyer behind the lowest bid on `project_id`.
    pub async fn compute_winner(&self, project_id: &str) -> Result<Buyer> {
        let project = self.projects.get_project(project_id).await?;
        let winning = lowest_bid(&project)
            .ok_or_else(|| MarketError::NoBids(project_id.to_string()))?;

        info!(
            "Project {project_id:?} won by bid {:?} ({}) from buyer {:?}",
            winning.id, winning.amount, winning.buyer_id
        );
        self.projects.get_buyer(&winning.buyer_id).await
    }
}

/// The bid with the strictly smallest amount.
///
/// Among equal amounts the first one seen wins, and the bid map has no stable
/// iteration order, so ties resolve arbitrarily.
pub fn lowest_bid(project: &Project) -> Option<&Bid> {
    project
        .bids
        .as_ref()?
        .values()
        .fold(None, |best: Option<&Bid>, bid| match best {
            Some(current) if current.amount <= bid.amount => Some(current),
            _ => Some(bid),
        })
}
