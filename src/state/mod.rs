//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `SchedulerState`: Lifecycle of the crawl (idle, running, draining, stopped)
//! - `DomainState`: Per-root-domain concurrency and request spacing

mod domain_state;
mod scheduler_state;

// Re-export main types
pub use domain_state::DomainState;
pub use scheduler_state::SchedulerState;
