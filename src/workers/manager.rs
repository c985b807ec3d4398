// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Worker manager - starts workers, tracks them, merges their output

use std::collections::HashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use super::{EntityWorker, MqttWorker, MqttWorkerData, CHANNEL_CAPACITY};
use crate::core::Entity;

/// Tracks running workers by ID so they can be stopped individually
pub struct Manager {
    workers: Mutex<HashMap<String, CancellationToken>>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Start the given workers, each under its own child of `token`, and
    /// return a single channel carrying all their entities.
    ///
    /// Workers that are disabled or fail to start are logged and skipped.
    /// The channel closes once every started worker has finished or `token`
    /// is cancelled.
    pub fn start_entity_workers<I>(&self, token: &CancellationToken, workers: I) -> mpsc::Receiver<Entity>
    where
        I: IntoIterator<Item = Box<dyn EntityWorker>>,
    {
        let mut channels = Vec::new();

        for mut worker in workers {
            let id = worker.id().to_string();
            if worker.is_disabled() {
                warn!("Not starting disabled worker {}", id);
                continue;
            }

            let worker_token = token.child_token();
            match worker.start(worker_token.clone()) {
                Ok(rx) => {
                    self.register(&id, worker_token);
                    channels.push(rx);
                    debug!("Started worker {}", id);
                }
                Err(e) => {
                    worker_token.cancel();
                    warn!("Could not start worker {}: {:#}", id, e);
                }
            }
        }

        merge_channels(token.clone(), channels)
    }

    /// Start the given MQTT workers. Configs and subscriptions of all started
    /// workers are collected and their message channels merged.
    pub fn start_mqtt_workers<I>(&self, token: &CancellationToken, workers: I) -> MqttWorkerData
    where
        I: IntoIterator<Item = Box<dyn MqttWorker>>,
    {
        let mut data = MqttWorkerData::default();
        let mut channels = Vec::new();

        for mut worker in workers {
            let id = worker.id().to_string();
            if worker.is_disabled() {
                warn!("Not starting disabled worker {}", id);
                continue;
            }

            let worker_token = token.child_token();
            let span = info_span!("mqtt_worker", id = %id);
            let started = span.in_scope(|| worker.start(worker_token.clone()));
            match started {
                Ok(worker_data) => {
                    self.register(&id, worker_token);
                    data.configs.extend(worker_data.configs);
                    data.subscriptions.extend(worker_data.subscriptions);
                    if let Some(msgs) = worker_data.msgs {
                        channels.push(msgs);
                    }
                    debug!("Started worker {}", id);
                }
                Err(e) => {
                    worker_token.cancel();
                    warn!("Could not start worker {}: {:#}", id, e);
                }
            }
        }

        data.msgs = Some(merge_channels(token.clone(), channels));
        data
    }

    /// Stop the workers with the given IDs. Unknown IDs are logged and
    /// otherwise ignored.
    pub fn stop_workers<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let workers = self.workers.lock();
        for id in ids {
            let id = id.as_ref();
            match workers.get(id) {
                Some(token) => {
                    token.cancel();
                    debug!("Stopped worker {}", id);
                }
                None => warn!("Unknown worker or worker not running: {}", id),
            }
        }
    }

    /// Stop every worker this manager has started.
    pub fn stop_all_workers(&self) {
        let workers = self.workers.lock();
        for (id, token) in workers.iter() {
            token.cancel();
            debug!("Stopped worker {}", id);
        }
    }

    /// Whether a worker with this ID was started and has not been stopped.
    pub fn is_running(&self, id: &str) -> bool {
        self.workers
            .lock()
            .get(id)
            .map(|token| !token.is_cancelled())
            .unwrap_or(false)
    }

    // A restarted worker replaces its stale entry.
    fn register(&self, id: &str, token: CancellationToken) {
        self.workers.lock().insert(id.to_string(), token);
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge several channels into one (fan-in).
///
/// Each input gets its own forwarding task, so values from one input keep
/// their order while different inputs interleave arbitrarily. The output
/// closes after every input has closed, or once `token` is cancelled.
pub fn merge_channels<T>(token: CancellationToken, inputs: Vec<mpsc::Receiver<T>>) -> mpsc::Receiver<T>
where
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    for mut input in inputs {
        let tx = tx.clone();
        let token = token.clone();
        tokio::spawn(
            async move {
                loop {
                    let value = tokio::select! {
                        value = input.recv() => match value {
                            Some(value) => value,
                            None => break,
                        },
                        _ = token.cancelled() => break,
                    };

                    tokio::select! {
                        res = tx.send(value) => {
                            if res.is_err() {
                                break;
                            }
                        }
                        _ = token.cancelled() => break,
                    }
                }
            }
            .in_current_span(),
        );
    }

    // The forwarders now hold the only senders; the output closes when the
    // last of them exits.
    drop(tx);
    rx
}
