use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest fetched engagement data for a (podcast, platform) pair.
/// Only the most recent row per platform is ever consulted for expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub id: i64,
    pub podcast_id: i64,
    pub platform: String,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub cost_usd: f64,
}

#[derive(Debug, Clone)]
pub struct NewMetric {
    pub podcast_id: i64,
    pub platform: String,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub cost_usd: f64,
}

/// One row of the append-only spend log. Entries are never updated or
/// deleted; the weekly spend is always the sum over the current window.
#[derive(Debug, Clone)]
pub struct NewCostEntry {
    pub logged_at: DateTime<Utc>,
    pub cost_usd: f64,
    pub podcast_id: Option<i64>,
}
