//! repovault - backup and restore for a clustered document repository
//!
//! - [`cache`]: key enumeration over local or clustered caches
//! - [`backup`]: rotating document files, binary area, change summary
//! - [`usage`]: binary usage tracking on the live change feed
//! - [`repository`]: the stores a backup reads from and restores into
//! - [`service`]: whole-repository backup and restore
//! - [`observability`]: structured logging and counters
//! - [`cli`]: backup inspection commands

pub mod backup;
pub mod cache;
pub mod cli;
pub mod observability;
pub mod repository;
pub mod service;
pub mod usage;
