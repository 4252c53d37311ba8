//! # Steadfast Progression
//!
//! User progression rules for Steadfast.
//!
//! This crate turns recorded user actions into progression:
//! - Catalog of levels, achievements and challenges (built-in or from file)
//! - Points per action kind
//! - Level resolution and progress to the next level
//! - Achievement unlock evaluation over data-driven rules
//! - Time-boxed challenges and task tracking
//! - Streaks and daily / weekly / monthly activity windows
//! - A multi-user service with deduplication, persistence and progress events

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod achievement;
pub mod action;
mod builtin;
pub mod catalog;
pub mod catalog_loader;
pub mod challenge;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod level;
pub mod points;
pub mod reward;
pub mod service;
pub mod snapshot;
pub mod stats;
pub mod store;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::achievement::*;
    pub use crate::action::*;
    pub use crate::catalog::*;
    pub use crate::catalog_loader::*;
    pub use crate::challenge::*;
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::level::*;
    pub use crate::points::*;
    pub use crate::reward::*;
    pub use crate::service::*;
    pub use crate::snapshot::*;
    pub use crate::stats::*;
    pub use crate::store::*;
    pub use steadfast_common::{EventId, UserId};
}

pub use prelude::*;
