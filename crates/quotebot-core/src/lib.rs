//! quotebot-core: dual-scheduler task coordinator.
//!
//! Two independent one-second clocks (a recurring interval countdown and a
//! wall-clock time-of-day watcher) share a single [`StatusCell`]; the status
//! value is the only point of mutual exclusion between them and manual
//! triggers. The [`TaskExecutor`] runs one generate-and-deliver cycle end to
//! end and always settles the status back to idle/running, success or not.

pub mod bot;
pub mod daily;
pub mod executor;
pub mod interval;
pub mod log;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod status;

pub use bot::QuoteBot;
pub use daily::DailyScheduler;
pub use executor::{Credentials, TaskExecutor};
pub use interval::IntervalScheduler;
pub use log::LogStream;
pub use provider::{ContentProvider, DeliveryChannel};
pub use registry::{RegistryError, ScheduleRegistry};
pub use retry::QuotaRetry;
pub use status::StatusCell;
