// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Streaming module - where merged entities end up

mod mqtt;

pub use mqtt::{MqttClient, MqttSink};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::Entity;

/// Destination for entities coming off the merged worker channel
#[async_trait]
pub trait EntitySink: Send {
    fn name(&self) -> &str;

    async fn publish(&mut self, entity: &Entity) -> Result<()>;
}

/// Writes every entity to the log
pub struct LogSink;

#[async_trait]
impl EntitySink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn publish(&mut self, entity: &Entity) -> Result<()> {
        let units = entity.units.as_deref().unwrap_or("");
        info!("{} ({}) = {}{}", entity.name, entity.id, entity.state, units);
        Ok(())
    }
}

/// Hand every entity from `rx` to each sink until the channel closes. A sink
/// failing to publish is logged and does not stop the others.
///
/// Returns the number of entities received.
pub async fn run_sink(mut rx: mpsc::Receiver<Entity>, mut sinks: Vec<Box<dyn EntitySink>>) -> u64 {
    let mut received = 0;

    while let Some(entity) = rx.recv().await {
        received += 1;

        for sink in sinks.iter_mut() {
            if let Err(e) = sink.publish(&entity).await {
                warn!("Sink {} could not publish {}: {:#}", sink.name(), entity.id, e);
            }
        }
    }

    received
}

/// Base topic of an entity, `{prefix}/sensor/{device}/{entity}`
pub fn entity_topic(prefix: &str, device_name: &str, entity_id: &str) -> String {
    format!("{}/sensor/{}/{}", prefix, device_name, entity_id)
}

pub fn state_topic(prefix: &str, device_name: &str, entity_id: &str) -> String {
    format!("{}/state", entity_topic(prefix, device_name, entity_id))
}

pub fn attributes_topic(prefix: &str, device_name: &str, entity_id: &str) -> String {
    format!("{}/attributes", entity_topic(prefix, device_name, entity_id))
}

pub fn config_topic(prefix: &str, device_name: &str, entity_id: &str) -> String {
    format!("{}/config", entity_topic(prefix, device_name, entity_id))
}
