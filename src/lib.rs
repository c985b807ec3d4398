// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Hostwatch - host telemetry agent
//!
//! Collects host sensors (uptime, load, memory, network, system details) with
//! a set of independent workers and streams them to the log or an MQTT broker.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Polling      │   │ Event        │   │ One-shot     │
//! │ workers      │   │ workers      │   │ workers      │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        └──────────────────┼──────────────────┘
//!                           ↓
//!                  ┌─────────────────┐
//!                  │ Worker Manager  │  fan-in, per-worker cancel
//!                  └────────┬────────┘
//!                           ↓
//!                  ┌─────────────────┐
//!                  │ Sinks (log/MQTT)│
//!                  └─────────────────┘
//! ```

#![allow(dead_code)]

pub mod config;
pub mod core;
pub mod sensors;
pub mod streaming;
pub mod workers;

// Re-exports for convenience
pub use config::Config;
pub use core::{Agent, Entity};
pub use workers::{EntityWorker, Manager, MqttWorker, SensorWorker, WorkerError};

/// Hostwatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hostwatch name
pub const NAME: &str = "Hostwatch";
