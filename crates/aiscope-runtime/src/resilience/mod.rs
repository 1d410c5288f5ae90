//! Resilience patterns for aiscope-runtime.
//!
//! This module provides:
//! - Failure classification into quota, availability and fatal kinds
//! - Bounded exponential retry per model
//! - Ordered fallback across the configured model chain
//! - Catalog discovery once the configured chain is exhausted

mod backoff;
mod chain;
mod classify;
mod discovery;

pub use backoff::BackoffExecutor;
pub use chain::{ModelChainResolver, Resolution};
pub use classify::classify;
pub use discovery::{Discovery, ModelDiscovery};
