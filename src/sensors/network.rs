// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Network transfer totals and rates

use std::time::Duration;
use async_trait::async_trait;
use anyhow::Result;
use sysinfo::Networks;
use tokio_util::sync::CancellationToken;

use crate::core::Entity;
use crate::workers::PollingType;

pub const NETWORK_WORKER_ID: &str = "network_rates_sensors";

/// Bytes moved across all non-loopback interfaces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Transfer {
    received: u64,
    transmitted: u64,
}

/// Reports total bytes received/sent and the rate since the last poll
pub struct NetworkRatesWorker {
    networks: Networks,
    delta: Duration,
}

impl NetworkRatesWorker {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            delta: Duration::ZERO,
        }
    }

    fn totals(&self) -> (Transfer, Transfer) {
        let mut total = Transfer::default();
        let mut since_refresh = Transfer::default();

        for (name, data) in self.networks.iter() {
            if name == "lo" {
                continue;
            }
            total.received += data.total_received();
            total.transmitted += data.total_transmitted();
            since_refresh.received += data.received();
            since_refresh.transmitted += data.transmitted();
        }

        (total, since_refresh)
    }
}

impl Default for NetworkRatesWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PollingType for NetworkRatesWorker {
    fn update_delta(&mut self, delta: Duration) {
        self.delta = delta;
    }

    async fn sensors(&mut self, _token: &CancellationToken) -> Result<Vec<Entity>> {
        self.networks.refresh();
        let (total, since_refresh) = self.totals();

        Ok(network_entities(total, since_refresh, self.delta))
    }
}

/// Bytes per second, or `None` when no time has passed yet
fn rate(bytes: u64, delta: Duration) -> Option<f64> {
    let secs = delta.as_secs_f64();
    if secs < 0.001 {
        return None;
    }
    Some((bytes as f64 / secs * 100.0).round() / 100.0)
}

fn network_entities(total: Transfer, since_refresh: Transfer, delta: Duration) -> Vec<Entity> {
    let mut entities = vec![
        Entity::new("bytes_received", "Bytes Received", total.received)
            .with_units("B")
            .with_device_class("data_size")
            .with_icon("mdi:download-network"),
        Entity::new("bytes_sent", "Bytes Sent", total.transmitted)
            .with_units("B")
            .with_device_class("data_size")
            .with_icon("mdi:upload-network"),
    ];

    // The first poll has no previous sample to compute a rate from.
    if let (Some(rx), Some(tx)) = (
        rate(since_refresh.received, delta),
        rate(since_refresh.transmitted, delta),
    ) {
        entities.push(
            Entity::new("bytes_received_rate", "Bytes Received Throughput", rx)
                .with_units("B/s")
                .with_device_class("data_rate")
                .with_icon("mdi:transfer-down"),
        );
        entities.push(
            Entity::new("bytes_sent_rate", "Bytes Sent Throughput", tx)
                .with_units("B/s")
                .with_device_class("data_rate")
                .with_icon("mdi:transfer-up"),
        );
    }

    entities
        .into_iter()
        .map(|e| e.with_data_source("sysfs"))
        .collect()
}
