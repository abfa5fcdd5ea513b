use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::db::Repository;
use crate::error::Result;
use crate::models::{JobType, NewJob};

/// Seam to the external refresh queue. The scheduler only estimates costs
/// and submits work through this interface; execution, retries and result
/// persistence belong to whoever drains the queue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Cost in USD of refreshing the given platforms once.
    async fn estimate_cost(&self, platforms: &BTreeSet<String>) -> Result<f64>;

    /// Submits a refresh job and returns its id. An error means the queue
    /// rejected the submission.
    async fn queue_job(
        &self,
        podcast_id: i64,
        job_type: JobType,
        platforms: &BTreeSet<String>,
        priority: i64,
        estimated_cost_usd: f64,
    ) -> Result<i64>;
}

/// Queue backend persisting jobs to the local database, priced at a flat
/// per-platform rate.
pub struct SqliteJobQueue {
    repository: Repository,
    cost_per_platform_usd: f64,
}

impl SqliteJobQueue {
    pub fn new(repository: Repository, cost_per_platform_usd: f64) -> Self {
        Self {
            repository,
            cost_per_platform_usd,
        }
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn estimate_cost(&self, platforms: &BTreeSet<String>) -> Result<f64> {
        Ok(platforms.len() as f64 * self.cost_per_platform_usd)
    }

    async fn queue_job(
        &self,
        podcast_id: i64,
        job_type: JobType,
        platforms: &BTreeSet<String>,
        priority: i64,
        estimated_cost_usd: f64,
    ) -> Result<i64> {
        self.repository
            .insert_job(NewJob {
                podcast_id,
                job_type,
                platforms: platforms.clone(),
                priority,
                estimated_cost_usd,
            })
            .await
    }
}
