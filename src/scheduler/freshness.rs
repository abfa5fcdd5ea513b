use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::db::Repository;
use crate::error::Result;
use crate::models::Metric;

/// Decides which of a podcast's declared platforms need a refresh: those
/// with no metric on record, or whose latest metric has expired.
pub struct FreshnessEvaluator {
    repository: Repository,
}

impl FreshnessEvaluator {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn due_platforms(&self, podcast_id: i64) -> Result<BTreeSet<String>> {
        self.due_platforms_at(podcast_id, Utc::now()).await
    }

    pub async fn due_platforms_at(
        &self,
        podcast_id: i64,
        now: DateTime<Utc>,
    ) -> Result<BTreeSet<String>> {
        let declared = self.repository.get_social_links(podcast_id).await?;
        if declared.is_empty() {
            return Ok(BTreeSet::new());
        }

        let latest = self.repository.latest_metrics(podcast_id).await?;
        let by_platform: HashMap<&str, &Metric> =
            latest.iter().map(|m| (m.platform.as_str(), m)).collect();

        let due = declared
            .into_iter()
            .filter(|platform| match by_platform.get(platform.as_str()) {
                None => true,
                Some(metric) => metric.expires_at <= now,
            })
            .collect();
        Ok(due)
    }
}
