//! Core pipeline for the UPI speaker service.
//!
//! Inbound payment text is classified into transactions, persisted, and
//! announced through speech and notifications by a long-lived background
//! service. The crate is framework-agnostic: the event source, settings,
//! persistence, speech and notification collaborators live behind ports
//! (traits) implemented in adapter crates.

pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod interceptor;
pub mod logging;
pub mod ports;
pub mod queue;
pub mod service;
pub mod settings;
pub mod speech;
pub mod store;
pub mod subscription;
pub mod worker;

pub use errors::{Error, Result};

#[cfg(test)]
mod fakes;
