//! # CanSat Ground Station Library
//!
//! Telemetry session engine for a CanSat ground station.
//!
//! This library provides the state behind a ground-station console: it
//! generates timestamped telemetry samples on a fixed period, keeps them in
//! an ordered session log, feeds a live chart, records operator commands and
//! exports the session to CSV. Rendering is left to the caller, which drives
//! the [`session::SessionController`] and subscribes to its notifications.

pub mod command;
pub mod config;
pub mod error;
pub mod event_log;
pub mod export;
pub mod session;
pub mod telemetry;
