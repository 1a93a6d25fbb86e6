//! Core domain + application logic for the anonymous relay.
//!
//! This crate is intentionally framework-agnostic. The chat platform lives behind
//! [`platform::port::PlatformPort`], implemented in adapter crates (Telegram today).

pub mod config;
pub mod domain;
pub mod envelope;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod option;
pub mod platform;
pub mod relay;
pub mod router;
pub mod store;
pub mod templates;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
pub use option::OptionValue;
