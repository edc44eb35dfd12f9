//! # switchcrop common library
//!
//! Shared code for the switchcrop review client including:
//! - Error type
//! - Bootstrap TOML configuration
//! - Review event types and the broadcast EventBus
//! - Human-readable time formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
