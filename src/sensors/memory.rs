// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Memory and swap usage

use async_trait::async_trait;
use anyhow::{bail, Result};
use sysinfo::System;
use tokio_util::sync::CancellationToken;

use crate::core::Entity;
use crate::workers::PollingType;

pub const MEMORY_WORKER_ID: &str = "memory_usage_sensors";

/// Reports RAM and swap usage
pub struct MemoryWorker {
    system: System,
}

impl MemoryWorker {
    pub fn new() -> Self {
        Self { system: System::new() }
    }
}

impl Default for MemoryWorker {
    fn default() -> Self {
        Self::new()
    }
}

/// Memory figures in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MemStats {
    total: u64,
    available: u64,
    swap_total: u64,
    swap_used: u64,
}

#[async_trait]
impl PollingType for MemoryWorker {
    async fn sensors(&mut self, _token: &CancellationToken) -> Result<Vec<Entity>> {
        self.system.refresh_memory();

        let stats = MemStats {
            total: self.system.total_memory(),
            available: self.system.available_memory(),
            swap_total: self.system.total_swap(),
            swap_used: self.system.used_swap(),
        };
        if stats.total == 0 {
            bail!("memory statistics unavailable");
        }

        Ok(memory_entities(&stats))
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10_000.0).round() / 100.0
}

fn memory_entities(stats: &MemStats) -> Vec<Entity> {
    let used = stats.total.saturating_sub(stats.available);

    let mut entities = vec![
        Entity::new("memory_total", "Memory Total", stats.total)
            .with_units("B")
            .with_device_class("data_size")
            .with_icon("mdi:memory"),
        Entity::new("memory_used", "Memory Used", used)
            .with_units("B")
            .with_device_class("data_size")
            .with_icon("mdi:memory"),
        Entity::new("memory_usage", "Memory Usage", percent(used, stats.total))
            .with_units("%")
            .with_icon("mdi:memory"),
    ];

    // Hosts without swap only get the RAM figures.
    if stats.swap_total > 0 {
        entities.push(
            Entity::new("swap_usage", "Swap Usage", percent(stats.swap_used, stats.swap_total))
                .with_units("%")
                .with_icon("mdi:harddisk"),
        );
    }

    entities
        .into_iter()
        .map(|e| e.with_data_source("procfs"))
        .collect()
}
