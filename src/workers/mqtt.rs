// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! MQTT workers - configs, subscriptions and messages for the broker

use std::fmt;
use std::sync::Arc;
use anyhow::Result;
use rumqttc::QoS;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::WorkerError;

/// A message to publish, or one received from the broker
#[derive(Debug, Clone, PartialEq)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

impl MqttMessage {
    pub fn new(topic: &str, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.to_string(),
            payload: payload.into(),
            qos: QoS::AtLeastOnce,
            retain: false,
        }
    }

    pub fn json<T: Serialize>(topic: &str, payload: &T) -> Result<Self> {
        Ok(Self::new(topic, serde_json::to_vec(payload)?))
    }

    pub fn retained(mut self) -> Self {
        self.retain = true;
        self
    }
}

/// Retained config (discovery) message published once on connect
#[derive(Debug, Clone, PartialEq)]
pub struct MqttEntityConfig {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl MqttEntityConfig {
    pub fn json<T: Serialize>(topic: &str, payload: &T) -> Result<Self> {
        Ok(Self {
            topic: topic.to_string(),
            payload: serde_json::to_vec(payload)?,
        })
    }

    pub fn to_message(&self) -> MqttMessage {
        MqttMessage::new(&self.topic, self.payload.clone()).retained()
    }
}

type Handler = Arc<dyn Fn(&MqttMessage) + Send + Sync>;

/// A topic to subscribe to and what to do with its messages
#[derive(Clone)]
pub struct MqttSubscription {
    pub topic: String,
    pub qos: QoS,
    handler: Handler,
}

impl MqttSubscription {
    pub fn new<F>(topic: &str, handler: F) -> Self
    where
        F: Fn(&MqttMessage) + Send + Sync + 'static,
    {
        Self {
            topic: topic.to_string(),
            qos: QoS::AtLeastOnce,
            handler: Arc::new(handler),
        }
    }

    pub fn handle(&self, msg: &MqttMessage) {
        (self.handler)(msg)
    }

    /// Whether `topic` matches this subscription's filter, honouring the
    /// `+` and `#` wildcards.
    pub fn matches(&self, topic: &str) -> bool {
        let mut filter = self.topic.split('/');
        let mut levels = topic.split('/');

        loop {
            match (filter.next(), levels.next()) {
                (Some("#"), _) => return true,
                (Some("+"), Some(_)) => {}
                (Some(f), Some(l)) if f == l => {}
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl fmt::Debug for MqttSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttSubscription")
            .field("topic", &self.topic)
            .field("qos", &self.qos)
            .finish()
    }
}

/// Everything a started MQTT worker hands to the broker connection
#[derive(Debug, Default)]
pub struct MqttWorkerData {
    pub configs: Vec<MqttEntityConfig>,
    pub subscriptions: Vec<MqttSubscription>,
    pub msgs: Option<mpsc::Receiver<MqttMessage>>,
}

/// A worker that manages some MQTT functionality
pub trait MqttWorker: Send {
    fn id(&self) -> &str;

    fn is_disabled(&self) -> bool;

    /// Run the worker until `token` is cancelled. Must be called from within
    /// a tokio runtime.
    fn start(&mut self, token: CancellationToken) -> Result<MqttWorkerData, WorkerError>;
}
