pub mod analyzer;
pub mod boundary;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod git;
pub mod lock;
pub mod notes;
pub mod pipeline;
pub mod process;
pub mod steps;
pub mod template;
pub mod ui;

pub use coordinator::{Coordinator, RunOptions, RunReport, RunState, SkipReason};
pub use error::{ReleaseError, Result};
