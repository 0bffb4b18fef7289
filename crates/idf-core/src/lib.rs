//! Core domain + application logic for the IDFinder bot.
//!
//! This crate is framework-agnostic. Telegram and SQLite live behind ports
//! (traits) implemented in adapter crates.

pub mod access;
pub mod broadcast;
pub mod config;
pub mod domain;
pub mod errors;
pub mod export;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod model;
pub mod ports;
pub mod utils;

pub use errors::{Error, Result};
