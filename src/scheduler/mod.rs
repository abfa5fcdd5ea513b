//! Budget-constrained refresh scheduling.
//!
//! A scheduled pass walks the tracked podcasts in repository order, asks the
//! [`FreshnessEvaluator`] which platforms are due, prices the work through
//! the queue and submits it while a hard weekly cap holds. [`CostLedger`]
//! supplies the spend already committed this week; [`ManualTrigger`] is the
//! operator path that bypasses the cap entirely.

mod freshness;
mod ledger;
mod manual;
mod run;

pub use freshness::FreshnessEvaluator;
pub use ledger::CostLedger;
pub use manual::{ManualTrigger, TriggerOutcome};
pub use run::{RefreshScheduler, SchedulerSettings};

pub(crate) use ledger::week_bounds;
