use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Job, JobType, Metric, NewCostEntry, NewJob, NewMetric, Podcast, TrackingStatus};

use super::schema::SCHEMA;

#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    #[allow(dead_code)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Podcast operations

    pub async fn insert_podcast(&self, title: String) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO podcasts (title, created_at, updated_at) VALUES (?1, ?2, ?3)",
                    params![title, now, now],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn set_tracking(&self, id: i64, tracked: bool, status: TrackingStatus) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE podcasts SET is_tracked = ?1, tracking_status = ?2, updated_at = ?3 WHERE id = ?4",
                    params![tracked, status.as_str(), now, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_podcast(&self, id: i64) -> Result<Option<Podcast>> {
        let podcast = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, is_tracked, tracking_status, created_at, updated_at FROM podcasts WHERE id = ?1",
                )?;
                let podcast = stmt
                    .query_row(params![id], |row| Ok(podcast_from_row(row)))
                    .optional()?;
                Ok(podcast)
            })
            .await?;
        Ok(podcast)
    }

    /// Podcasts eligible for a scheduled pass, in the repository's natural
    /// stable order (ascending id).
    pub async fn get_tracked_podcasts(&self) -> Result<Vec<Podcast>> {
        let podcasts = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, is_tracked, tracking_status, created_at, updated_at
                     FROM podcasts
                     WHERE is_tracked = 1 AND tracking_status = 'tracked'
                     ORDER BY id",
                )?;
                let podcasts = stmt
                    .query_map([], |row| Ok(podcast_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(podcasts)
            })
            .await?;
        Ok(podcasts)
    }

    pub async fn get_tracked_podcasts_by_recent_update(&self) -> Result<Vec<Podcast>> {
        let podcasts = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, is_tracked, tracking_status, created_at, updated_at
                     FROM podcasts
                     WHERE is_tracked = 1 AND tracking_status = 'tracked'
                     ORDER BY updated_at DESC, id DESC",
                )?;
                let podcasts = stmt
                    .query_map([], |row| Ok(podcast_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(podcasts)
            })
            .await?;
        Ok(podcasts)
    }

    pub async fn count_tracked_podcasts(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM podcasts WHERE is_tracked = 1 AND tracking_status = 'tracked'",
                    [],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    // Social link operations

    pub async fn add_social_link(
        &self,
        podcast_id: i64,
        platform: String,
        url: Option<String>,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO social_links (podcast_id, platform, url) VALUES (?1, ?2, ?3)",
                    params![podcast_id, platform, url],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_social_links(&self, podcast_id: i64) -> Result<Vec<String>> {
        let platforms = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT platform FROM social_links WHERE podcast_id = ?1 ORDER BY platform",
                )?;
                let platforms = stmt
                    .query_map(params![podcast_id], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(platforms)
            })
            .await?;
        Ok(platforms)
    }

    // Metric operations

    #[allow(dead_code)]
    pub async fn insert_metric(&self, metric: NewMetric) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO metrics (podcast_id, platform, fetched_at, expires_at, cost_usd)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        metric.podcast_id,
                        metric.platform,
                        metric.fetched_at.to_rfc3339(),
                        metric.expires_at.to_rfc3339(),
                        metric.cost_usd,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// Latest metric per platform for one podcast. Historical rows are kept
    /// but only the most recent fetch per platform is consulted for expiry.
    pub async fn latest_metrics(&self, podcast_id: i64) -> Result<Vec<Metric>> {
        let metrics = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT m.id, m.podcast_id, m.platform, m.fetched_at, m.expires_at, m.cost_usd
                     FROM metrics m
                     WHERE m.podcast_id = ?1
                       AND m.fetched_at = (SELECT MAX(m2.fetched_at) FROM metrics m2
                                           WHERE m2.podcast_id = m.podcast_id
                                             AND m2.platform = m.platform)
                     ORDER BY m.platform",
                )?;
                let metrics = stmt
                    .query_map(params![podcast_id], |row| Ok(metric_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(metrics)
            })
            .await?;
        Ok(metrics)
    }

    pub async fn count_metrics_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64> {
        let (start, end) = (start.to_rfc3339(), end.to_rfc3339());
        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM metrics WHERE fetched_at >= ?1 AND fetched_at < ?2",
                    params![start, end],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    pub async fn latest_fetch_time(&self) -> Result<Option<DateTime<Utc>>> {
        let fetched_at = self
            .conn
            .call(|conn| {
                let fetched_at: Option<String> =
                    conn.query_row("SELECT MAX(fetched_at) FROM metrics", [], |row| row.get(0))?;
                Ok(fetched_at)
            })
            .await?;
        Ok(fetched_at.and_then(|s| parse_datetime(&s)))
    }

    // Cost log operations

    pub async fn log_cost(&self, entry: NewCostEntry) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO cost_log (logged_at, cost_usd, podcast_id) VALUES (?1, ?2, ?3)",
                    params![entry.logged_at.to_rfc3339(), entry.cost_usd, entry.podcast_id],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// Spend logged within `[start, end)`. Always recomputed from the log so
    /// entries appended by other processes are included.
    pub async fn sum_cost_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64> {
        let (start, end) = (start.to_rfc3339(), end.to_rfc3339());
        let total = self
            .conn
            .call(move |conn| {
                let total: f64 = conn.query_row(
                    "SELECT COALESCE(SUM(cost_usd), 0.0) FROM cost_log
                     WHERE logged_at >= ?1 AND logged_at < ?2",
                    params![start, end],
                    |row| row.get(0),
                )?;
                Ok(total)
            })
            .await?;
        Ok(total)
    }

    // Job operations

    pub async fn insert_job(&self, job: NewJob) -> Result<i64> {
        let platforms_json = serde_json::to_string(&job.platforms)?;
        let queued_at = Utc::now().to_rfc3339();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO jobs (podcast_id, job_type, platforms, priority, estimated_cost_usd, queued_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        job.podcast_id,
                        job.job_type.as_str(),
                        platforms_json,
                        job.priority,
                        job.estimated_cost_usd,
                        queued_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn pending_jobs(&self) -> Result<Vec<Job>> {
        let jobs = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, podcast_id, job_type, platforms, priority, estimated_cost_usd, queued_at
                     FROM jobs
                     WHERE status = 'queued'
                     ORDER BY priority DESC, id",
                )?;
                let jobs = stmt
                    .query_map([], |row| Ok(job_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(jobs)
            })
            .await?;
        Ok(jobs)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn podcast_from_row(row: &Row) -> Podcast {
    Podcast {
        id: row.get(0).unwrap(),
        title: row.get(1).unwrap(),
        is_tracked: row.get::<_, i64>(2).unwrap() != 0,
        tracking_status: TrackingStatus::parse(&row.get::<_, String>(3).unwrap()),
        created_at: row
            .get::<_, String>(4)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}

fn metric_from_row(row: &Row) -> Metric {
    Metric {
        id: row.get(0).unwrap(),
        podcast_id: row.get(1).unwrap(),
        platform: row.get(2).unwrap(),
        fetched_at: row
            .get::<_, String>(3)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        expires_at: row
            .get::<_, String>(4)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        cost_usd: row.get(5).unwrap(),
    }
}

fn job_from_row(row: &Row) -> Job {
    Job {
        id: row.get(0).unwrap(),
        podcast_id: row.get(1).unwrap(),
        job_type: JobType::parse(&row.get::<_, String>(2).unwrap()),
        platforms: row
            .get::<_, String>(3)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default(),
        priority: row.get(4).unwrap(),
        estimated_cost_usd: row.get(5).unwrap(),
        queued_at: row
            .get::<_, String>(6)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    async fn tracked_podcast(repo: &Repository, title: &str) -> i64 {
        let id = repo.insert_podcast(title.to_string()).await.unwrap();
        repo.set_tracking(id, true, TrackingStatus::Tracked)
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn creates_schema_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("podpulse.db");
        let repo = Repository::new(path.to_str().unwrap()).await.unwrap();

        let id = repo.insert_podcast("Serial".to_string()).await.unwrap();
        let podcast = repo.get_podcast(id).await.unwrap().unwrap();
        assert_eq!(podcast.title, "Serial");
        assert!(!podcast.is_tracked);
        assert_eq!(podcast.tracking_status, TrackingStatus::Untracked);
    }

    #[tokio::test]
    async fn tracked_filter_requires_flag_and_status() {
        let repo = Repository::open_in_memory().await.unwrap();

        let tracked = tracked_podcast(&repo, "Tracked").await;
        let paused = repo.insert_podcast("Paused".to_string()).await.unwrap();
        repo.set_tracking(paused, true, TrackingStatus::Paused)
            .await
            .unwrap();
        repo.insert_podcast("Untracked".to_string()).await.unwrap();

        let podcasts = repo.get_tracked_podcasts().await.unwrap();
        assert_eq!(podcasts.len(), 1);
        assert_eq!(podcasts[0].id, tracked);
        assert_eq!(repo.count_tracked_podcasts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn tracked_podcasts_come_back_in_id_order() {
        let repo = Repository::open_in_memory().await.unwrap();
        let a = tracked_podcast(&repo, "A").await;
        let b = tracked_podcast(&repo, "B").await;
        let c = tracked_podcast(&repo, "C").await;

        let ids: Vec<i64> = repo
            .get_tracked_podcasts()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[tokio::test]
    async fn latest_metrics_picks_most_recent_per_platform() {
        let repo = Repository::open_in_memory().await.unwrap();
        let id = tracked_podcast(&repo, "Serial").await;
        let now = Utc::now();

        for (offset_days, cost) in [(10, 0.5), (1, 0.7)] {
            repo.insert_metric(NewMetric {
                podcast_id: id,
                platform: "spotify".to_string(),
                fetched_at: now - Duration::days(offset_days),
                expires_at: now - Duration::days(offset_days) + Duration::days(7),
                cost_usd: cost,
            })
            .await
            .unwrap();
        }

        let metrics = repo.latest_metrics(id).await.unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].platform, "spotify");
        assert_eq!(metrics[0].cost_usd, 0.7);
    }

    #[tokio::test]
    async fn social_links_are_unique_per_platform() {
        let repo = Repository::open_in_memory().await.unwrap();
        let id = tracked_podcast(&repo, "Serial").await;

        repo.add_social_link(id, "spotify".to_string(), None)
            .await
            .unwrap();
        repo.add_social_link(id, "spotify".to_string(), None)
            .await
            .unwrap();
        repo.add_social_link(id, "youtube".to_string(), None)
            .await
            .unwrap();

        let platforms = repo.get_social_links(id).await.unwrap();
        assert_eq!(platforms, vec!["spotify", "youtube"]);
    }

    #[tokio::test]
    async fn cost_sum_respects_bounds() {
        let repo = Repository::open_in_memory().await.unwrap();
        let now = Utc::now();

        for (offset_days, cost) in [(1, 2.0), (3, 3.0), (20, 10.0)] {
            repo.log_cost(NewCostEntry {
                logged_at: now - Duration::days(offset_days),
                cost_usd: cost,
                podcast_id: None,
            })
            .await
            .unwrap();
        }

        let total = repo
            .sum_cost_between(now - Duration::days(7), now)
            .await
            .unwrap();
        assert_eq!(total, 5.0);

        let empty = repo
            .sum_cost_between(now + Duration::days(1), now + Duration::days(2))
            .await
            .unwrap();
        assert_eq!(empty, 0.0);
    }

    #[tokio::test]
    async fn jobs_round_trip_with_platform_set() {
        use std::collections::BTreeSet;

        let repo = Repository::open_in_memory().await.unwrap();
        let id = tracked_podcast(&repo, "Serial").await;

        let platforms: BTreeSet<String> =
            ["spotify", "youtube"].iter().map(|s| s.to_string()).collect();
        let job_id = repo
            .insert_job(NewJob {
                podcast_id: id,
                job_type: JobType::ManualRefresh,
                platforms: platforms.clone(),
                priority: JobType::ManualRefresh.priority(),
                estimated_cost_usd: 1.0,
            })
            .await
            .unwrap();

        let jobs = repo.pending_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, job_id);
        assert_eq!(jobs[0].job_type, JobType::ManualRefresh);
        assert_eq!(jobs[0].priority, 80);
        assert_eq!(jobs[0].platforms, platforms);
    }
}
