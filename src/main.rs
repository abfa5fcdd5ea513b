use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;

mod config;
mod db;
mod error;
mod models;
mod queue;
mod scheduler;
mod stats;

use config::Config;
use db::Repository;
use error::Result;
use models::{NewCostEntry, TrackingStatus};
use queue::{JobQueue, SqliteJobQueue};
use scheduler::{ManualTrigger, RefreshScheduler, SchedulerSettings, TriggerOutcome};
use stats::StatisticsReporter;

#[tokio::main]
async fn main() -> Result<()> {
    // Operational messages (skip/stop decisions) go to stderr at info level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = Config::load()?;
    let repository = Repository::new(&config.db_path).await?;
    let queue: Arc<dyn JobQueue> = Arc::new(SqliteJobQueue::new(
        repository.clone(),
        config.cost_per_platform_usd,
    ));

    match args.get(1).map(String::as_str) {
        Some("--run") => {
            let settings = SchedulerSettings::from_config(&config);
            RefreshScheduler::new(repository, queue, settings)
                .run()
                .await?;
        }

        Some("--trigger") => {
            let podcast_id = parse_id(args.get(2))?;
            let platforms: Option<BTreeSet<String>> = args.get(3).map(|list| {
                list.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            });

            let trigger = ManualTrigger::new(repository, queue);
            match trigger.trigger(podcast_id, platforms).await? {
                TriggerOutcome::Queued { job_id } => {
                    println!("Queued manual refresh job {job_id} for podcast {podcast_id}");
                }
                TriggerOutcome::NotFound => {
                    println!("No podcast with id {podcast_id}");
                }
                TriggerOutcome::NoPlatforms => {
                    println!("Podcast {podcast_id} declares no platforms");
                }
            }
        }

        Some("--stats") => {
            let reporter = StatisticsReporter::new(repository.clone());
            let snapshot = reporter.snapshot().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);

            let due = reporter.podcasts_due_for_refresh().await?;
            println!("Due for refresh: {}", due.len());
            for podcast in due {
                println!("  {} {}", podcast.id, podcast.title);
            }
            println!("Queued jobs: {}", repository.pending_jobs().await?.len());
        }

        Some("--add-podcast") => {
            if args.len() < 3 {
                return Err(anyhow::anyhow!("--add-podcast requires a title").into());
            }
            let title = args[2..].join(" ");
            let id = repository.insert_podcast(title.clone()).await?;
            println!("Added podcast {id}: {title}");
        }

        Some("--track") => {
            let podcast_id = parse_id(args.get(2))?;
            repository
                .set_tracking(podcast_id, true, TrackingStatus::Tracked)
                .await?;
            println!("Tracking podcast {podcast_id}");
        }

        Some("--link") => {
            let podcast_id = parse_id(args.get(2))?;
            let platform = args
                .get(3)
                .ok_or_else(|| anyhow::anyhow!("--link requires a platform name"))?
                .clone();
            let url = args.get(4).cloned();
            repository.add_social_link(podcast_id, platform.clone(), url).await?;
            println!("Linked {platform} to podcast {podcast_id}");
        }

        Some("--log-cost") => {
            // Manual correction entry for the append-only spend log.
            let cost_usd: f64 = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("--log-cost requires an amount"))?
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid amount"))?;
            let podcast_id = match args.get(3) {
                Some(_) => Some(parse_id(args.get(3))?),
                None => None,
            };
            repository
                .log_cost(NewCostEntry {
                    logged_at: Utc::now(),
                    cost_usd,
                    podcast_id,
                })
                .await?;
            println!("Logged {cost_usd:.2} USD");
        }

        _ => {
            eprintln!("Usage: podpulse <command>");
            eprintln!("  --run                               run one scheduled refresh pass");
            eprintln!("  --trigger <podcast-id> [platforms]  force a refresh (comma-separated platforms)");
            eprintln!("  --stats                             print tracker statistics");
            eprintln!("  --add-podcast <title>               add a podcast");
            eprintln!("  --track <podcast-id>                mark a podcast as tracked");
            eprintln!("  --link <podcast-id> <platform>      declare a platform for a podcast");
            eprintln!("  --log-cost <amount> [podcast-id]    append a spend correction");
        }
    }

    Ok(())
}

fn parse_id(arg: Option<&String>) -> Result<i64> {
    let arg = arg.ok_or_else(|| anyhow::anyhow!("missing podcast id"))?;
    arg.parse()
        .map_err(|_| anyhow::anyhow!("invalid podcast id: {arg}").into())
}
