// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Worker contract - how collectors produce entities
//!
//! A collector implements exactly one capability trait:
//!
//! - [`PollingType`]: produces a batch of entities on every jittered tick
//! - [`EventType`]: produces an unbounded stream of entities on external triggers
//! - [`OneShotType`]: produces one batch, then finishes
//!
//! [`SensorWorker`] wraps a capability together with its ID and disabled flag
//! and exposes the uniform [`EntityWorker`] surface the [`Manager`] starts.

mod manager;
mod mqtt;
mod runner;

pub use manager::{merge_channels, Manager};
pub use mqtt::{MqttEntityConfig, MqttMessage, MqttSubscription, MqttWorker, MqttWorkerData};

use std::time::Duration;
use async_trait::async_trait;
use anyhow::Result;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::Entity;

/// Capacity of every worker and fan-in channel. A single slot keeps the
/// hand-off close to a rendezvous so slow sinks push back on the workers.
pub const CHANNEL_CAPACITY: usize = 1;

/// Errors raised while starting workers
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker {0} has already been started")]
    AlreadyStarted(String),

    #[error("worker {id} could not be set up: {source}")]
    Setup {
        id: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Sensors generated on a poll interval.
#[async_trait]
pub trait PollingType: Send + Sync {
    /// Time elapsed since the previous poll. Workers that don't compute rates
    /// can ignore it.
    fn update_delta(&mut self, _delta: Duration) {}

    async fn sensors(&mut self, token: &CancellationToken) -> Result<Vec<Entity>>;
}

/// Sensors generated on external events, such as D-Bus signals.
#[async_trait]
pub trait EventType: Send + Sync {
    /// Subscribe to events. The returned channel must be closed once `token`
    /// is cancelled.
    async fn events(&mut self, token: CancellationToken) -> Result<mpsc::Receiver<Entity>>;

    /// Initial snapshot sent before any event.
    async fn sensors(&mut self, _token: &CancellationToken) -> Result<Vec<Entity>> {
        Ok(Vec::new())
    }
}

/// Sensors generated a single time with no further updates.
#[async_trait]
pub trait OneShotType: Send + Sync {
    async fn sensors(&mut self, token: &CancellationToken) -> Result<Vec<Entity>>;
}

/// The capability a worker was built with
pub enum WorkerKind {
    Polling {
        worker: Box<dyn PollingType>,
        interval: Duration,
        jitter: Duration,
    },
    Event(Box<dyn EventType>),
    OneShot(Box<dyn OneShotType>),
}

impl WorkerKind {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerKind::Polling { .. } => "polling",
            WorkerKind::Event(_) => "events",
            WorkerKind::OneShot(_) => "oneshot",
        }
    }
}

/// A unit of collection work the [`Manager`] can start and stop.
pub trait EntityWorker: Send {
    /// Stable identifier, unique within a manager
    fn id(&self) -> &str;

    /// Whether the worker was turned off, e.g. through preferences
    fn is_disabled(&self) -> bool;

    /// Run the worker until `token` is cancelled.
    ///
    /// Must be called from within a tokio runtime. A disabled worker returns
    /// an already closed channel rather than an error.
    fn start(&mut self, token: CancellationToken) -> Result<mpsc::Receiver<Entity>, WorkerError>;
}

/// Worker metadata paired with the capability that produces its sensors
pub struct SensorWorker {
    id: String,
    disabled: bool,
    kind: Option<WorkerKind>,
}

impl SensorWorker {
    pub fn new(id: &str, kind: WorkerKind) -> Self {
        Self {
            id: id.to_string(),
            disabled: false,
            kind: Some(kind),
        }
    }

    pub fn polling(id: &str, worker: impl PollingType + 'static, interval: Duration, jitter: Duration) -> Self {
        Self::new(id, WorkerKind::Polling {
            worker: Box::new(worker),
            interval,
            jitter,
        })
    }

    pub fn event(id: &str, worker: impl EventType + 'static) -> Self {
        Self::new(id, WorkerKind::Event(Box::new(worker)))
    }

    pub fn one_shot(id: &str, worker: impl OneShotType + 'static) -> Self {
        Self::new(id, WorkerKind::OneShot(Box::new(worker)))
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Capability name, or `None` once started
    pub fn kind(&self) -> Option<&'static str> {
        self.kind.as_ref().map(WorkerKind::name)
    }
}

impl EntityWorker for SensorWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn start(&mut self, token: CancellationToken) -> Result<mpsc::Receiver<Entity>, WorkerError> {
        if self.disabled {
            let (_, rx) = mpsc::channel(CHANNEL_CAPACITY);
            return Ok(rx);
        }

        let kind = self
            .kind
            .take()
            .ok_or_else(|| WorkerError::AlreadyStarted(self.id.clone()))?;

        Ok(runner::run(&self.id, kind, token))
    }
}
