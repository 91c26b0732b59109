//! Prefix catalog model

use serde::{Deserialize, Serialize};

/// Catalog status of a prefix
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PrefixStatus {
    #[default]
    Active,
    Inactive,
}

/// Prefix catalog entry (`GET /api/master/get-prefixes`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrefixEntry {
    #[serde(alias = "_id")]
    pub id: String,
    pub prefix: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: PrefixStatus,
}

impl PrefixEntry {
    pub fn is_active(&self) -> bool {
        self.status == PrefixStatus::Active
    }
}

/// Entries the intake selector may offer, in catalog order
pub fn active_prefixes(catalog: &[PrefixEntry]) -> Vec<&PrefixEntry> {
    catalog.iter().filter(|p| p.is_active()).collect()
}
