// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! The agent - starts workers and streams what they produce

use std::sync::Arc;
use std::time::Instant;
use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::sensors;
use crate::streaming::{run_sink, EntitySink, LogSink, MqttClient, MqttSink};
use crate::workers::Manager;

/// Owns the worker manager and the root cancellation token
pub struct Agent {
    pub config: Arc<Config>,
    manager: Arc<Manager>,
    token: CancellationToken,
    start_time: Instant,
}

impl Agent {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            manager: Arc::new(Manager::new()),
            token: CancellationToken::new(),
            start_time: Instant::now(),
        }
    }

    /// Root token. Cancelling it stops every worker and makes [`Agent::run`]
    /// return. Nothing else does.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn manager(&self) -> Arc<Manager> {
        self.manager.clone()
    }

    pub fn shutdown(&self) {
        info!("Stopping agent...");
        self.token.cancel();
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Start all workers and publish their entities until shut down.
    ///
    /// Keeps running after every entity worker has finished, since MQTT
    /// workers may still be active.
    pub async fn run(&self, log_entities: bool) -> Result<()> {
        info!("Starting agent for device {}", self.config.device_name);

        let entities = self
            .manager
            .start_entity_workers(&self.token, sensors::entity_workers(&self.config));

        let mut sinks: Vec<Box<dyn EntitySink>> = Vec::new();
        if log_entities {
            sinks.push(Box::new(LogSink));
        }

        if self.config.mqtt.enabled {
            let data = self
                .manager
                .start_mqtt_workers(&self.token, sensors::mqtt_workers(&self.config));

            let client = MqttClient::new(&self.config.mqtt, data.subscriptions, self.token.clone());
            if let Err(e) = client.publish_configs(&data.configs).await {
                warn!("Could not publish MQTT configs: {:#}", e);
            }
            if let Some(msgs) = data.msgs {
                tokio::spawn(client.clone().forward_messages(msgs));
            }

            sinks.push(Box::new(MqttSink::new(
                client,
                &self.config.mqtt.topic_prefix,
                &self.config.device_name,
            )));
        }

        if sinks.is_empty() {
            warn!("MQTT is disabled and entity logging is off, entities will be dropped");
        }

        info!("Agent started");
        let received = run_sink(entities, sinks).await;

        if !self.token.is_cancelled() {
            info!("All entity workers finished, waiting for shutdown");
            self.token.cancelled().await;
        }

        self.manager.stop_all_workers();
        info!("Agent stopped after {}s, {} entities received", self.uptime(), received);
        Ok(())
    }
}
