//! `barkeep-core`: recipe planning and single-worker pump dispatch.
//!
//! ```text
//! Snapshot ──► planner ──► DispensePlan ──► Dispatcher::submit ──► JobQueue
//!   (fresh per request)                                              │
//!                                                                    ▼
//!                     StatusRegistry ◄── worker (sole Actuator owner)
//! ```

pub mod actuator;
pub mod calibration;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod paths;
pub mod plan;
pub mod planner;
pub mod queue;
pub mod status;
pub mod types;
pub mod worker;

pub use dispatcher::{Dispatcher, Job, Receipt};
pub use error::{BarkeepError, Result};
