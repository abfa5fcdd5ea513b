use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    BackgroundRefresh,
    ManualRefresh,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::BackgroundRefresh => "background_refresh",
            JobType::ManualRefresh => "manual_refresh",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "manual_refresh" => JobType::ManualRefresh,
            _ => JobType::BackgroundRefresh,
        }
    }

    /// Dispatch urgency consumed by the queue; higher is more urgent.
    /// Background passes run low so a manual trigger always jumps the line.
    pub fn priority(&self) -> i64 {
        match self {
            JobType::BackgroundRefresh => 30,
            JobType::ManualRefresh => 80,
        }
    }
}

/// A queued refresh, owned by the job queue once submitted. The scheduler
/// never learns whether a job eventually succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub podcast_id: i64,
    pub job_type: JobType,
    pub platforms: BTreeSet<String>,
    pub priority: i64,
    pub estimated_cost_usd: f64,
    pub queued_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub podcast_id: i64,
    pub job_type: JobType,
    pub platforms: BTreeSet<String>,
    pub priority: i64,
    pub estimated_cost_usd: f64,
}
