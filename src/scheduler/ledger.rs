use chrono::{DateTime, NaiveTime, Utc, Weekday};

use crate::db::Repository;
use crate::error::Result;

/// Read-only view of the spend already committed in the current budgeting
/// window. The sum is recomputed from the append-only cost log on every
/// call; a cached counter would drift against entries written by manual
/// refreshes or direct corrections from other processes.
pub struct CostLedger {
    repository: Repository,
}

impl CostLedger {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn current_window_cost(&self) -> Result<f64> {
        self.window_cost_at(Utc::now()).await
    }

    pub async fn window_cost_at(&self, now: DateTime<Utc>) -> Result<f64> {
        let (start, end) = week_bounds(now);
        self.repository.sum_cost_between(start, end).await
    }
}

/// The budgeting window is the ISO week containing `now`: Monday 00:00:00
/// UTC up to (not including) the next Monday. ISO weeks keep the grouping
/// unambiguous across year boundaries, where a calendar-date week key would
/// split the window.
pub(crate) fn week_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let monday = now.date_naive().week(Weekday::Mon).first_day();
    let start = monday.and_time(NaiveTime::MIN).and_utc();
    (start, start + chrono::Duration::days(7))
}
