use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::db::Repository;
use crate::error::Result;
use crate::models::JobType;
use crate::queue::JobQueue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Queued { job_id: i64 },
    NotFound,
    NoPlatforms,
}

/// Operator path forcing an immediate high-priority refresh for one
/// podcast. Deliberately never consults the weekly budget: an operator must
/// always be able to force a refresh, even with the window already over the
/// cap. The scheduled background pass is the only budgeted path.
pub struct ManualTrigger {
    repository: Repository,
    queue: Arc<dyn JobQueue>,
}

impl ManualTrigger {
    pub fn new(repository: Repository, queue: Arc<dyn JobQueue>) -> Self {
        Self { repository, queue }
    }

    /// Queues a manual refresh. With no platforms given, every declared
    /// platform is refreshed, fresh or not.
    pub async fn trigger(
        &self,
        podcast_id: i64,
        platforms: Option<BTreeSet<String>>,
    ) -> Result<TriggerOutcome> {
        if self.repository.get_podcast(podcast_id).await?.is_none() {
            warn!(podcast_id, "manual refresh requested for unknown podcast");
            return Ok(TriggerOutcome::NotFound);
        }

        let platforms = match platforms {
            Some(platforms) if !platforms.is_empty() => platforms,
            _ => self
                .repository
                .get_social_links(podcast_id)
                .await?
                .into_iter()
                .collect(),
        };
        if platforms.is_empty() {
            warn!(podcast_id, "podcast declares no platforms to refresh");
            return Ok(TriggerOutcome::NoPlatforms);
        }

        let estimated = self.queue.estimate_cost(&platforms).await?;
        let job_id = self
            .queue
            .queue_job(
                podcast_id,
                JobType::ManualRefresh,
                &platforms,
                JobType::ManualRefresh.priority(),
                estimated,
            )
            .await?;
        info!(
            podcast_id,
            job_id,
            platforms = platforms.len(),
            estimated_usd = estimated,
            "queued manual refresh"
        );
        Ok(TriggerOutcome::Queued { job_id })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::models::{NewCostEntry, NewMetric, TrackingStatus};
    use crate::queue::SqliteJobQueue;

    use super::*;

    async fn setup(platforms: &[&str]) -> (Repository, ManualTrigger, i64) {
        let repository = Repository::open_in_memory().await.unwrap();
        let id = repository.insert_podcast("Serial".to_string()).await.unwrap();
        repository
            .set_tracking(id, true, TrackingStatus::Tracked)
            .await
            .unwrap();
        for platform in platforms {
            repository
                .add_social_link(id, platform.to_string(), None)
                .await
                .unwrap();
        }
        let queue = Arc::new(SqliteJobQueue::new(repository.clone(), 0.5));
        let trigger = ManualTrigger::new(repository.clone(), queue);
        (repository, trigger, id)
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn unknown_podcast_reports_not_found() {
        let (_repository, trigger, _id) = setup(&["spotify"]).await;
        let outcome = trigger.trigger(999, None).await.unwrap();
        assert_eq!(outcome, TriggerOutcome::NotFound);
    }

    #[tokio::test]
    async fn resolves_to_all_declared_platforms() {
        let (repository, trigger, id) = setup(&["spotify", "youtube"]).await;

        let outcome = trigger.trigger(id, None).await.unwrap();
        let TriggerOutcome::Queued { job_id } = outcome else {
            panic!("expected a queued job, got {outcome:?}");
        };

        let jobs = repository.pending_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, job_id);
        assert_eq!(jobs[0].platforms, set(&["spotify", "youtube"]));
        assert_eq!(jobs[0].priority, 80);
    }

    #[tokio::test]
    async fn refreshes_fresh_platforms_too() {
        // A current metric exists, but a manual refresh re-fetches anyway.
        let (repository, trigger, id) = setup(&["spotify"]).await;
        let now = Utc::now();
        repository
            .insert_metric(NewMetric {
                podcast_id: id,
                platform: "spotify".to_string(),
                fetched_at: now,
                expires_at: now + Duration::days(7),
                cost_usd: 0.5,
            })
            .await
            .unwrap();

        let outcome = trigger.trigger(id, None).await.unwrap();
        assert!(matches!(outcome, TriggerOutcome::Queued { .. }));

        let jobs = repository.pending_jobs().await.unwrap();
        assert_eq!(jobs[0].platforms, set(&["spotify"]));
    }

    #[tokio::test]
    async fn explicit_platform_list_passes_through() {
        let (repository, trigger, id) = setup(&["spotify", "youtube"]).await;

        let outcome = trigger
            .trigger(id, Some(set(&["youtube"])))
            .await
            .unwrap();
        assert!(matches!(outcome, TriggerOutcome::Queued { .. }));

        let jobs = repository.pending_jobs().await.unwrap();
        assert_eq!(jobs[0].platforms, set(&["youtube"]));
    }

    #[tokio::test]
    async fn succeeds_with_the_window_over_budget() {
        let (repository, trigger, id) = setup(&["spotify"]).await;
        repository
            .log_cost(NewCostEntry {
                logged_at: Utc::now(),
                cost_usd: 1_000.0,
                podcast_id: None,
            })
            .await
            .unwrap();

        let outcome = trigger.trigger(id, None).await.unwrap();
        assert!(matches!(outcome, TriggerOutcome::Queued { .. }));
    }

    #[tokio::test]
    async fn podcast_without_links_has_no_platforms() {
        let (_repository, trigger, id) = setup(&[]).await;
        let outcome = trigger.trigger(id, None).await.unwrap();
        assert_eq!(outcome, TriggerOutcome::NoPlatforms);
    }
}
