//! On-disk instance management for Server Warden.
//!
//! An instance is a directory `serversPath/{id}/` holding the server
//! executable, its `console.log` and its `conf.json`. This module creates
//! those directories from template archives, rewrites their configuration
//! files, and deletes them.
//!
//! Both the provisioning and the configuration paths publish their result
//! with a single rename, so a failure never leaves a half-written instance or
//! a truncated configuration file behind.
pub mod provision;
pub mod removal;
pub mod settings;

pub use provision::{CreateOutcome, create, list_templates};
pub use removal::delete;
pub use settings::{read_config, update_config};
