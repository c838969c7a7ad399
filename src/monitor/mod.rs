pub mod aggregator;
pub mod engine;
pub mod schedule_poll;

pub use aggregator::ActivationAggregator;
pub use engine::EnforcementEngine;
pub use schedule_poll::{SchedulePoller, ScheduleStatus};
