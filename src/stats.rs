use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::Repository;
use crate::error::Result;
use crate::models::Podcast;
use crate::scheduler::{week_bounds, CostLedger};

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub tracked_podcasts: i64,
    pub metrics_this_window: i64,
    pub window_cost_usd: f64,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// Read-only observability over the tracker's state. Never mutates jobs,
/// metrics or the cost log.
pub struct StatisticsReporter {
    repository: Repository,
    ledger: CostLedger,
}

impl StatisticsReporter {
    pub fn new(repository: Repository) -> Self {
        let ledger = CostLedger::new(repository.clone());
        Self { repository, ledger }
    }

    pub async fn snapshot(&self) -> Result<StatsSnapshot> {
        self.snapshot_at(Utc::now()).await
    }

    async fn snapshot_at(&self, now: DateTime<Utc>) -> Result<StatsSnapshot> {
        let (start, end) = week_bounds(now);
        Ok(StatsSnapshot {
            tracked_podcasts: self.repository.count_tracked_podcasts().await?,
            metrics_this_window: self.repository.count_metrics_between(start, end).await?,
            window_cost_usd: self.ledger.window_cost_at(now).await?,
            last_fetched_at: self.repository.latest_fetch_time().await?,
        })
    }

    /// Tracked podcasts with zero metrics or at least one expired metric,
    /// most recently updated first.
    pub async fn podcasts_due_for_refresh(&self) -> Result<Vec<Podcast>> {
        self.podcasts_due_for_refresh_at(Utc::now()).await
    }

    async fn podcasts_due_for_refresh_at(&self, now: DateTime<Utc>) -> Result<Vec<Podcast>> {
        let podcasts = self.repository.get_tracked_podcasts_by_recent_update().await?;

        let mut due = Vec::new();
        for podcast in podcasts {
            let metrics = self.repository.latest_metrics(podcast.id).await?;
            if metrics.is_empty() || metrics.iter().any(|m| m.expires_at <= now) {
                due.push(podcast);
            }
        }
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::models::{NewCostEntry, NewMetric, TrackingStatus};

    use super::*;

    async fn tracked_podcast(repo: &Repository, title: &str) -> i64 {
        let id = repo.insert_podcast(title.to_string()).await.unwrap();
        repo.set_tracking(id, true, TrackingStatus::Tracked)
            .await
            .unwrap();
        id
    }

    async fn insert_metric(
        repo: &Repository,
        podcast_id: i64,
        platform: &str,
        fetched_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) {
        repo.insert_metric(NewMetric {
            podcast_id,
            platform: platform.to_string(),
            fetched_at,
            expires_at,
            cost_usd: 0.5,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn snapshot_over_empty_state() {
        let repo = Repository::open_in_memory().await.unwrap();
        let reporter = StatisticsReporter::new(repo);

        let snapshot = reporter.snapshot().await.unwrap();
        assert_eq!(snapshot.tracked_podcasts, 0);
        assert_eq!(snapshot.metrics_this_window, 0);
        assert_eq!(snapshot.window_cost_usd, 0.0);
        assert!(snapshot.last_fetched_at.is_none());
    }

    #[tokio::test]
    async fn snapshot_counts_window_activity() {
        let repo = Repository::open_in_memory().await.unwrap();
        let id = tracked_podcast(&repo, "Serial").await;
        tracked_podcast(&repo, "Radiolab").await;
        let now = Utc::now();

        // One fetch in the window, one well before it.
        insert_metric(&repo, id, "spotify", now, now + Duration::days(7)).await;
        insert_metric(
            &repo,
            id,
            "youtube",
            now - Duration::days(30),
            now - Duration::days(23),
        )
        .await;

        repo.log_cost(NewCostEntry {
            logged_at: now,
            cost_usd: 1.25,
            podcast_id: Some(id),
        })
        .await
        .unwrap();

        let snapshot = reporter_snapshot(&repo).await;
        assert_eq!(snapshot.tracked_podcasts, 2);
        assert_eq!(snapshot.metrics_this_window, 1);
        assert_eq!(snapshot.window_cost_usd, 1.25);
        let last = snapshot.last_fetched_at.unwrap();
        assert!((last - now).num_seconds().abs() < 2);
    }

    async fn reporter_snapshot(repo: &Repository) -> StatsSnapshot {
        StatisticsReporter::new(repo.clone()).snapshot().await.unwrap()
    }

    #[tokio::test]
    async fn due_list_orders_by_recent_update() {
        let repo = Repository::open_in_memory().await.unwrap();
        let older = tracked_podcast(&repo, "Older").await;
        let newer = tracked_podcast(&repo, "Newer").await;
        let fresh = tracked_podcast(&repo, "Fresh").await;
        let now = Utc::now();

        // "Older" has an expired metric, "Newer" none at all, "Fresh" is
        // fully covered and must not appear.
        insert_metric(
            &repo,
            older,
            "spotify",
            now - Duration::days(10),
            now - Duration::days(3),
        )
        .await;
        insert_metric(&repo, fresh, "spotify", now, now + Duration::days(7)).await;

        let reporter = StatisticsReporter::new(repo.clone());
        let due: Vec<i64> = reporter
            .podcasts_due_for_refresh()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();

        // set_tracking bumps updated_at, so later-tracked podcasts sort first.
        assert_eq!(due, vec![newer, older]);
    }
}
