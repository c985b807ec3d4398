// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! MQTT client for streaming entities and worker messages

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, Publish};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use super::{attributes_topic, config_topic, state_topic, EntitySink};
use crate::config::MqttConfig;
use crate::core::Entity;
use crate::workers::{MqttEntityConfig, MqttMessage, MqttSubscription};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// MQTT client wrapper. The connection itself is driven by a background
/// event loop that stops when the token is cancelled.
#[derive(Clone)]
pub struct MqttClient {
    client: AsyncClient,
}

impl MqttClient {
    /// Create the client and spawn its event loop. Incoming messages are
    /// routed to the matching `subscriptions`, which are renewed on every
    /// (re)connect.
    pub fn new(config: &MqttConfig, subscriptions: Vec<MqttSubscription>, token: CancellationToken) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.server, config.port);

        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 100);
        let subscriptions = Arc::new(subscriptions);

        info!("MQTT client initialized for {}:{}", config.server, config.port);

        let loop_client = client.clone();
        tokio::spawn(
            async move {
                loop {
                    let event = tokio::select! {
                        event = eventloop.poll() => event,
                        _ = token.cancelled() => break,
                    };

                    match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!("MQTT connected");
                            for sub in subscriptions.iter() {
                                if let Err(e) = loop_client.try_subscribe(&sub.topic, sub.qos) {
                                    warn!("MQTT subscribe to {} failed: {}", sub.topic, e);
                                }
                            }
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            debug!("MQTT received: {:?}", publish.topic);
                            dispatch(&subscriptions, &to_message(&publish));
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!("MQTT error: {:?}", e);
                            tokio::select! {
                                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                                _ = token.cancelled() => break,
                            }
                        }
                    }
                }

                if let Err(e) = loop_client.try_disconnect() {
                    debug!("MQTT disconnect failed: {}", e);
                }
                info!("MQTT event loop stopped");
            }
            .in_current_span(),
        );

        Self { client }
    }

    pub async fn publish(&self, msg: MqttMessage) -> Result<()> {
        self.client
            .publish(msg.topic, msg.qos, msg.retain, msg.payload)
            .await
            .map_err(|e| anyhow!("MQTT publish failed: {}", e))
    }

    /// Publish the retained config messages gathered from the MQTT workers
    pub async fn publish_configs(&self, configs: &[MqttEntityConfig]) -> Result<()> {
        for config in configs {
            self.publish(config.to_message()).await?;
        }
        Ok(())
    }

    /// Publish worker messages until the channel closes
    pub async fn forward_messages(self, mut msgs: mpsc::Receiver<MqttMessage>) {
        while let Some(msg) = msgs.recv().await {
            let topic = msg.topic.clone();
            if let Err(e) = self.publish(msg).await {
                warn!("Could not publish to {}: {:#}", topic, e);
            }
        }
        debug!("MQTT worker messages finished");
    }
}

fn to_message(publish: &Publish) -> MqttMessage {
    MqttMessage {
        topic: publish.topic.clone(),
        payload: publish.payload.to_vec(),
        qos: publish.qos,
        retain: publish.retain,
    }
}

/// Pass `msg` to every subscription whose filter matches its topic.
/// Returns how many handled it.
fn dispatch(subscriptions: &[MqttSubscription], msg: &MqttMessage) -> usize {
    let mut handled = 0;
    for sub in subscriptions.iter().filter(|sub| sub.matches(&msg.topic)) {
        sub.handle(msg);
        handled += 1;
    }
    handled
}

/// Publishes entities as MQTT sensors. The discovery config of an entity is
/// sent the first time it is seen, state and attributes on every update.
pub struct MqttSink {
    client: MqttClient,
    topic_prefix: String,
    device_name: String,
    announced: HashSet<String>,
}

impl MqttSink {
    pub fn new(client: MqttClient, topic_prefix: &str, device_name: &str) -> Self {
        Self {
            client,
            topic_prefix: topic_prefix.to_string(),
            device_name: device_name.to_string(),
            announced: HashSet::new(),
        }
    }

    fn messages(&self, entity: &Entity, announce: bool) -> Result<Vec<MqttMessage>> {
        let mut msgs = Vec::with_capacity(3);

        if announce {
            let config = discovery_config(&self.topic_prefix, &self.device_name, entity);
            let topic = config_topic(&self.topic_prefix, &self.device_name, &entity.id);
            msgs.push(MqttMessage::json(&topic, &config)?.retained());
        }

        let topic = state_topic(&self.topic_prefix, &self.device_name, &entity.id);
        msgs.push(MqttMessage::new(&topic, state_payload(&entity.state)));

        if !entity.attributes.is_empty() {
            let topic = attributes_topic(&self.topic_prefix, &self.device_name, &entity.id);
            msgs.push(MqttMessage::json(&topic, &entity.attributes)?);
        }

        Ok(msgs)
    }
}

#[async_trait]
impl EntitySink for MqttSink {
    fn name(&self) -> &str {
        "mqtt"
    }

    async fn publish(&mut self, entity: &Entity) -> Result<()> {
        let announce = !self.announced.contains(&entity.id);

        for msg in self.messages(entity, announce)? {
            self.client.publish(msg).await?;
        }

        if announce {
            self.announced.insert(entity.id.clone());
        }
        Ok(())
    }
}

/// Strings are published bare, anything else as JSON
fn state_payload(state: &Value) -> Vec<u8> {
    match state {
        Value::String(s) => s.clone().into_bytes(),
        other => other.to_string().into_bytes(),
    }
}

fn discovery_config(prefix: &str, device_name: &str, entity: &Entity) -> Value {
    let mut config = json!({
        "name": entity.name,
        "unique_id": format!("{}_{}", device_name, entity.id),
        "state_topic": state_topic(prefix, device_name, &entity.id),
        "device": {
            "name": device_name,
            "identifiers": [device_name],
        },
    });

    let optional = [
        ("unit_of_measurement", &entity.units),
        ("device_class", &entity.device_class),
        ("icon", &entity.icon),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            config[key] = json!(value);
        }
    }

    if !entity.attributes.is_empty() {
        config["json_attributes_topic"] = json!(attributes_topic(prefix, device_name, &entity.id));
    }

    config
}
