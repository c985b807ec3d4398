// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! System load averages

use async_trait::async_trait;
use anyhow::Result;
use sysinfo::{LoadAvg, System};
use tokio_util::sync::CancellationToken;

use crate::core::Entity;
use crate::workers::PollingType;

pub const LOAD_AVERAGE_WORKER_ID: &str = "load_averages_sensors";

/// Reports the 1, 5 and 15 minute load averages
pub struct LoadAverageWorker;

#[async_trait]
impl PollingType for LoadAverageWorker {
    async fn sensors(&mut self, _token: &CancellationToken) -> Result<Vec<Entity>> {
        Ok(load_entities(&System::load_average()))
    }
}

fn load_entities(load: &LoadAvg) -> Vec<Entity> {
    [("1", load.one), ("5", load.five), ("15", load.fifteen)]
        .into_iter()
        .map(|(minutes, value)| {
            Entity::new(
                &format!("cpu_load_average_{}_min", minutes),
                &format!("CPU load average ({} min)", minutes),
                value,
            )
            .with_units("load")
            .with_icon("mdi:chip")
            .with_data_source("procfs")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_entities() {
        let entities = load_entities(&LoadAvg { one: 0.5, five: 1.25, fifteen: 2.0 });
        let ids: Vec<_> = entities.iter().map(|e| e.id.as_str()).collect();

        assert_eq!(ids, vec![
            "cpu_load_average_1_min",
            "cpu_load_average_5_min",
            "cpu_load_average_15_min",
        ]);
        assert_eq!(entities[1].state, serde_json::json!(1.25));
    }
}
