// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Agent heartbeat published over MQTT

use std::sync::Arc;
use std::time::Duration;
use serde_json::json;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

use crate::config::WorkerPrefs;
use crate::core::scheduler::poll_sensors;
use crate::workers::{
    MqttEntityConfig, MqttMessage, MqttSubscription, MqttWorker, MqttWorkerData, WorkerError,
    CHANNEL_CAPACITY,
};

pub const HEARTBEAT_WORKER_ID: &str = "agent_heartbeat";

/// Publishes an "online" state on a jittered interval, and immediately when
/// a message arrives on the refresh topic
pub struct HeartbeatWorker {
    prefs: WorkerPrefs,
    topic_prefix: String,
    device_name: String,
}

impl HeartbeatWorker {
    pub fn new(prefs: WorkerPrefs, topic_prefix: &str, device_name: &str) -> Self {
        Self {
            prefs,
            topic_prefix: topic_prefix.to_string(),
            device_name: device_name.to_string(),
        }
    }

    fn base_topic(&self) -> String {
        format!("{}/binary_sensor/{}/{}", self.topic_prefix, self.device_name, HEARTBEAT_WORKER_ID)
    }

    pub fn state_topic(&self) -> String {
        format!("{}/state", self.base_topic())
    }

    pub fn refresh_topic(&self) -> String {
        format!("{}/{}/heartbeat/refresh", self.topic_prefix, self.device_name)
    }

    fn config(&self) -> anyhow::Result<MqttEntityConfig> {
        // Missing three beats in a row marks the agent offline.
        let expire_after = self.prefs.update_interval_secs.saturating_mul(3);

        MqttEntityConfig::json(
            &format!("{}/config", self.base_topic()),
            &json!({
                "name": "Agent Heartbeat",
                "unique_id": format!("{}_{}", self.device_name, HEARTBEAT_WORKER_ID),
                "state_topic": self.state_topic(),
                "device_class": "connectivity",
                "payload_on": "ON",
                "payload_off": "OFF",
                "expire_after": expire_after,
                "device": {
                    "name": self.device_name,
                    "identifiers": [self.device_name],
                },
            }),
        )
    }
}

impl MqttWorker for HeartbeatWorker {
    fn id(&self) -> &str {
        HEARTBEAT_WORKER_ID
    }

    fn is_disabled(&self) -> bool {
        self.prefs.disabled
    }

    fn start(&mut self, token: CancellationToken) -> Result<MqttWorkerData, WorkerError> {
        let config = self.config().map_err(|source| WorkerError::Setup {
            id: HEARTBEAT_WORKER_ID.to_string(),
            source,
        })?;

        let refresh = Arc::new(Notify::new());
        let notifier = refresh.clone();
        let subscription = MqttSubscription::new(&self.refresh_topic(), move |_| {
            notifier.notify_one();
        });

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let state_topic = self.state_topic();
        let interval = self.prefs.interval();
        let jitter = self.prefs.jitter();

        tokio::spawn(
            async move {
                let mut updater = {
                    let tx = tx.clone();
                    let topic = state_topic.clone();
                    let token = token.clone();
                    move |_elapsed: Duration| {
                        let tx = tx.clone();
                        let token = token.clone();
                        let msg = MqttMessage::new(&topic, "ON");
                        async move {
                            tokio::select! {
                                _ = tx.send(msg) => {}
                                _ = token.cancelled() => {}
                            }
                        }
                    }
                };

                let on_refresh = async {
                    loop {
                        refresh.notified().await;
                        debug!("Heartbeat refresh requested");
                        if tx.send(MqttMessage::new(&state_topic, "ON")).await.is_err() {
                            break;
                        }
                    }
                };

                tokio::select! {
                    _ = poll_sensors(&token, &mut updater, interval, jitter) => {}
                    _ = on_refresh => {}
                }
            }
            .instrument(info_span!("mqtt_worker", id = HEARTBEAT_WORKER_ID)),
        );

        Ok(MqttWorkerData {
            configs: vec![config],
            subscriptions: vec![subscription],
            msgs: Some(rx),
        })
    }
}
