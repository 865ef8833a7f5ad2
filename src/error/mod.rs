mod app;
mod config;
mod report;
mod scheduler;
mod validation;
mod worker;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use report::ReportError;
pub use scheduler::SchedulerError;
pub use validation::ValidationError;
pub use worker::{IoOperation, WorkerError};
