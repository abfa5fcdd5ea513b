mod job;
mod metric;
mod podcast;

pub use job::{Job, JobType, NewJob};
pub use metric::{Metric, NewCostEntry, NewMetric};
pub use podcast::{Podcast, TrackingStatus};
