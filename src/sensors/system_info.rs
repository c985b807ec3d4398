// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Static system information, gathered once

use async_trait::async_trait;
use anyhow::{bail, Result};
use sysinfo::System;
use tokio_util::sync::CancellationToken;

use crate::core::Entity;
use crate::workers::OneShotType;

pub const SYSTEM_INFO_WORKER_ID: &str = "system_info_sensors";

/// Reports OS, kernel, hostname and agent version
pub struct SystemInfoWorker;

#[async_trait]
impl OneShotType for SystemInfoWorker {
    async fn sensors(&mut self, _token: &CancellationToken) -> Result<Vec<Entity>> {
        let details = [
            ("distribution_name", "Distribution Name", System::name(), "mdi:linux"),
            ("distribution_version", "Distribution Version", System::os_version(), "mdi:numeric"),
            ("kernel_version", "Kernel Version", System::kernel_version(), "mdi:chip"),
            ("hostname", "Hostname", System::host_name(), "mdi:server"),
        ];

        let mut entities: Vec<Entity> = details
            .into_iter()
            .filter_map(|(id, name, value, icon)| {
                value.map(|v| {
                    Entity::new(id, name, v)
                        .with_icon(icon)
                        .with_data_source("procfs")
                })
            })
            .collect();

        if entities.is_empty() {
            bail!("no system information available");
        }

        entities.push(
            Entity::new("agent_version", "Agent Version", crate::VERSION)
                .with_icon("mdi:information-outline"),
        );

        Ok(entities)
    }
}
