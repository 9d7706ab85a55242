//! Domain records owned by the project store.
//!
//! Identifiers are assigned by callers; nothing here generates them. Cross
//! references (`seller_id`, `buyer_id`) are opaque strings and are never
//! checked against the referenced collection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A buyer's priced offer against a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bid {
    pub id: String,
    pub seller_id: String,
    pub buyer_id: String,
    /// Unvalidated; zero and negative values are legitimate comparison inputs.
    ///
    /// Written as `amount`. Older clients sent the misspelt `ammount`, which is
    /// still read but no longer emitted.
    #[serde(alias = "ammount")]
    pub amount: i64,
}

/// A unit of work posted by a seller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: String,
    pub details: Vec<String>,
    pub seller_id: String,
    /// Bids keyed by bid id. `None` until the first bid is placed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bids: Option<HashMap<String, Bid>>,
    /// Reserved, never populated or read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<u64>,
    /// Reserved, never populated or read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<u64>,
}

impl Project {
    /// Insert `bid` under its own id, replacing any previous bid with that id.
    pub fn upsert_bid(&mut self, bid: Bid) {
        self.bids
            .get_or_insert_with(HashMap::new)
            .insert(bid.id.clone(), bid);
    }

    pub fn bid_count(&self) -> usize {
        self.bids.as_ref().map_or(0, HashMap::len)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Seller {
    pub id: String,
    pub seller_id: String,
    pub seller_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Buyer {
    pub id: String,
    pub buyer_id: String,
    pub buyer_name: String,
}

/// Records that live in the document store, filtered by their `id` field.
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync {
    fn document_id(&self) -> &str;
}

impl Document for Project {
    fn document_id(&self) -> &str {
        &self.id
    }
}

impl Document for Seller {
    fn document_id(&self) -> &str {
        &self.id
    }
}

impl Document for Buyer {
    fn document_id(&self) -> &str {
        &self.id
    }
}
