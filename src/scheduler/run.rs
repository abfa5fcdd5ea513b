use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::models::JobType;
use crate::queue::JobQueue;

use super::{CostLedger, FreshnessEvaluator};

/// Knobs a pass reads from process configuration. Defaults live in
/// [`Config`], not here.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub weekly_budget_usd: f64,
    pub submit_throttle: Duration,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            weekly_budget_usd: config.weekly_budget_usd,
            submit_throttle: Duration::from_millis(config.submit_throttle_ms),
        }
    }
}

/// Budget verdict for one podcast within a pass. The stop-vs-skip split is
/// the load-bearing policy: a reached cap ends the whole pass, while a
/// single oversized estimate only passes over that podcast so cheaper ones
/// behind it still get a chance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    /// The cap is already reached; the pass halts without evaluating
    /// further podcasts.
    Stop,
    /// This podcast's estimate would overshoot the cap; skip it and move on.
    Skip,
    /// The estimate fits; submit and commit the spend.
    Submit,
}

/// With a zero estimate this reduces to the hard-cap check alone, which is
/// how the pass applies it before evaluating a podcast at all.
fn verdict(spent_usd: f64, limit_usd: f64, estimated_usd: f64) -> Verdict {
    if spent_usd >= limit_usd {
        Verdict::Stop
    } else if spent_usd + estimated_usd > limit_usd {
        Verdict::Skip
    } else {
        Verdict::Submit
    }
}

/// Walks the tracked podcasts once, queueing background refreshes for due
/// platforms while the weekly budget holds. Collaborators are injected; the
/// scheduler holds no global state.
pub struct RefreshScheduler {
    repository: Repository,
    ledger: CostLedger,
    freshness: FreshnessEvaluator,
    queue: Arc<dyn JobQueue>,
    settings: SchedulerSettings,
}

impl RefreshScheduler {
    pub fn new(repository: Repository, queue: Arc<dyn JobQueue>, settings: SchedulerSettings) -> Self {
        let ledger = CostLedger::new(repository.clone());
        let freshness = FreshnessEvaluator::new(repository.clone());
        Self {
            repository,
            ledger,
            freshness,
            queue,
            settings,
        }
    }

    /// Runs one scheduled pass. Safe to invoke repeatedly: a pass with
    /// nothing due queues nothing.
    ///
    /// The spend counter is seeded from the ledger once at the start and
    /// never re-read mid-pass, so overlapping passes or concurrent manual
    /// triggers can push the effective weekly spend past the cap. The cap
    /// is a soft limit; the host is expected to serialize passes.
    pub async fn run(&self) -> Result<()> {
        let podcasts = self.repository.get_tracked_podcasts().await?;
        if podcasts.is_empty() {
            debug!("no tracked podcasts, nothing to refresh");
            return Ok(());
        }

        let limit = self.settings.weekly_budget_usd;
        let mut spent = self.ledger.current_window_cost().await?;
        info!(
            podcasts = podcasts.len(),
            spent_usd = spent,
            limit_usd = limit,
            "starting refresh pass"
        );

        for podcast in podcasts {
            // Checked before the podcast is evaluated: reaching the cap
            // mid-pass ends the pass outright.
            if verdict(spent, limit, 0.0) == Verdict::Stop {
                info!(
                    spent_usd = spent,
                    limit_usd = limit,
                    "weekly budget exhausted, ending pass"
                );
                break;
            }

            let due = self.freshness.due_platforms(podcast.id).await?;
            if due.is_empty() {
                debug!(podcast_id = podcast.id, "all platforms fresh");
                continue;
            }

            let estimated = match self.queue.estimate_cost(&due).await {
                Ok(estimated) => estimated,
                Err(e) => {
                    warn!(
                        podcast_id = podcast.id,
                        error = %e,
                        "cost estimate failed, skipping podcast"
                    );
                    continue;
                }
            };

            match verdict(spent, limit, estimated) {
                Verdict::Stop => break,
                Verdict::Skip => {
                    info!(
                        podcast_id = podcast.id,
                        estimated_usd = estimated,
                        spent_usd = spent,
                        limit_usd = limit,
                        "estimate would overshoot weekly budget, skipping podcast"
                    );
                }
                Verdict::Submit => {
                    let submitted = self
                        .queue
                        .queue_job(
                            podcast.id,
                            JobType::BackgroundRefresh,
                            &due,
                            JobType::BackgroundRefresh.priority(),
                            estimated,
                        )
                        .await;
                    match submitted {
                        Ok(job_id) => {
                            spent += estimated;
                            info!(
                                podcast_id = podcast.id,
                                job_id,
                                platforms = due.len(),
                                estimated_usd = estimated,
                                spent_usd = spent,
                                "queued background refresh"
                            );
                            sleep(self.settings.submit_throttle).await;
                        }
                        Err(e) => {
                            // The estimate stays uncommitted; the podcast
                            // gets another chance on the next pass.
                            warn!(
                                podcast_id = podcast.id,
                                error = %e,
                                "job submission rejected"
                            );
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
