//! Core domain + application logic for the anonymous channel bot.
//!
//! This crate is intentionally framework-agnostic. Telegram / OpenAI live
//! behind ports (traits) implemented in adapter crates.

pub mod classify;
pub mod config;
pub mod domain;
pub mod errors;
pub mod gate;
pub mod links;
pub mod logging;
pub mod messaging;
pub mod pipeline;
pub mod texts;

pub use errors::{Error, Result};
