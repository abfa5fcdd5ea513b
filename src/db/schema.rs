pub const SCHEMA: &str = r#"
-- podcasts table
CREATE TABLE IF NOT EXISTS podcasts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    is_tracked INTEGER NOT NULL DEFAULT 0,
    tracking_status TEXT NOT NULL DEFAULT 'untracked',
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_podcasts_tracking ON podcasts(is_tracked, tracking_status);

-- social_links table (which platforms are relevant per podcast)
CREATE TABLE IF NOT EXISTS social_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    podcast_id INTEGER NOT NULL REFERENCES podcasts(id) ON DELETE CASCADE,
    platform TEXT NOT NULL,
    url TEXT,
    UNIQUE(podcast_id, platform)
);

CREATE INDEX IF NOT EXISTS idx_social_links_podcast_id ON social_links(podcast_id);

-- metrics table (latest row per platform wins)
CREATE TABLE IF NOT EXISTS metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    podcast_id INTEGER NOT NULL REFERENCES podcasts(id) ON DELETE CASCADE,
    platform TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    cost_usd REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_metrics_podcast_platform ON metrics(podcast_id, platform, fetched_at DESC);

-- cost_log table (append-only; rows are never updated or deleted)
CREATE TABLE IF NOT EXISTS cost_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    logged_at TEXT NOT NULL,
    cost_usd REAL NOT NULL,
    podcast_id INTEGER REFERENCES podcasts(id)
);

CREATE INDEX IF NOT EXISTS idx_cost_log_logged_at ON cost_log(logged_at);

-- jobs table (owned by the queue once submitted)
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    podcast_id INTEGER NOT NULL REFERENCES podcasts(id) ON DELETE CASCADE,
    job_type TEXT NOT NULL,
    platforms TEXT NOT NULL,
    priority INTEGER NOT NULL,
    estimated_cost_usd REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'queued',
    queued_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status, priority DESC);
"#;
