// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Core module - the agent, its entities and the poll scheduler

mod agent;
mod entity;
pub mod scheduler;

pub use agent::Agent;
pub use entity::Entity;
pub use scheduler::{poll_sensors, Updater};
