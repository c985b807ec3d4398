// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Host uptime

use async_trait::async_trait;
use anyhow::Result;
use sysinfo::System;
use tokio_util::sync::CancellationToken;

use crate::core::Entity;
use crate::workers::PollingType;

pub const UPTIME_WORKER_ID: &str = "uptime_sensor";

/// Reports how long the host has been up, in hours
pub struct UptimeWorker;

#[async_trait]
impl PollingType for UptimeWorker {
    async fn sensors(&mut self, _token: &CancellationToken) -> Result<Vec<Entity>> {
        Ok(vec![uptime_entity(System::uptime())])
    }
}

fn uptime_entity(seconds: u64) -> Entity {
    let hours = (seconds as f64 / 3600.0 * 100.0).round() / 100.0;

    Entity::new("uptime", "Uptime", hours)
        .with_units("h")
        .with_device_class("duration")
        .with_icon("mdi:restart")
        .with_data_source("procfs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_in_hours() {
        let entity = uptime_entity(5400);
        assert_eq!(entity.state, serde_json::json!(1.5));
        assert_eq!(entity.units.as_deref(), Some("h"));
    }

    #[tokio::test]
    async fn test_uptime_worker_reports_one_entity() {
        let sensors = UptimeWorker.sensors(&CancellationToken::new()).await.unwrap();
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].id, "uptime");
    }
}
