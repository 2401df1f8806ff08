//! Line-change statistics per commit, aggregated by author and by project.
//!
//! The pipeline runs provider -> [`resolve`] -> [`sequence`] -> [`aggregate`], with
//! the sqlite-backed [`cache`] consulted and populated by the sequence.

pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod export;
pub mod git;
pub mod history;
pub mod list;
pub mod metrics;
pub mod model;
pub mod provider;
pub mod report;
pub mod resolve;
pub mod sequence;
pub mod source;

pub use error::{MetricsError, Result};
