use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Podcast {
    pub id: i64,
    pub title: String,
    pub is_tracked: bool,
    pub tracking_status: TrackingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    Untracked,
    Tracked,
    Paused,
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::Untracked => "untracked",
            TrackingStatus::Tracked => "tracked",
            TrackingStatus::Paused => "paused",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "tracked" => TrackingStatus::Tracked,
            "paused" => TrackingStatus::Paused,
            _ => TrackingStatus::Untracked,
        }
    }
}
