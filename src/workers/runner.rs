// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Runners adapting each worker capability into an entity channel

use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument, Span};

use super::{EventType, OneShotType, PollingType, WorkerKind, CHANNEL_CAPACITY};
use crate::core::scheduler::{poll_sensors, Updater};
use crate::core::Entity;

/// Spawn the runner matching `kind`. The returned channel closes when the
/// runner exits.
pub(super) fn run(id: &str, kind: WorkerKind, token: CancellationToken) -> mpsc::Receiver<Entity> {
    let span = info_span!("entity_worker", id = %id, worker_type = kind.name());

    match kind {
        WorkerKind::Polling { worker, interval, jitter } => {
            handle_polling(token, worker, interval, jitter, span)
        }
        WorkerKind::Event(worker) => handle_events(token, worker, span),
        WorkerKind::OneShot(worker) => handle_one_shot(token, worker, span),
    }
}

/// Poll the worker on a jittered interval and pass on every batch.
fn handle_polling(
    token: CancellationToken,
    worker: Box<dyn PollingType>,
    interval: Duration,
    jitter: Duration,
    span: Span,
) -> mpsc::Receiver<Entity> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(
        async move {
            let output = tx.clone();
            let mut updater = PollingUpdater {
                worker,
                tx,
                token: token.clone(),
            };

            tokio::select! {
                _ = poll_sensors(&token, &mut updater, interval, jitter) => {}
                _ = output.closed() => {
                    debug!("Nobody is listening, stopping worker");
                }
            }
        }
        .instrument(span),
    );

    rx
}

struct PollingUpdater {
    worker: Box<dyn PollingType>,
    tx: mpsc::Sender<Entity>,
    token: CancellationToken,
}

#[async_trait]
impl Updater for PollingUpdater {
    async fn update(&mut self, elapsed: Duration) {
        // Workers that don't compute rates treat this as a no-op.
        self.worker.update_delta(elapsed);

        let sensors = match self.worker.sensors(&self.token).await {
            Ok(sensors) => sensors,
            Err(e) => {
                error!("Worker error occurred: {:#}", e);
                return;
            }
        };

        if sensors.is_empty() {
            warn!("Worker returned no sensors");
            return;
        }

        send_all(&self.tx, &self.token, sensors).await;
    }
}

/// Subscribe to the worker's events and pass them on until its channel closes.
///
/// Cancellation ends forwarding at once. Events the worker had already
/// queued are dropped with its channel rather than drained, since the
/// consumer may have stopped reading by then.
fn handle_events(
    token: CancellationToken,
    mut worker: Box<dyn EventType>,
    span: Span,
) -> mpsc::Receiver<Entity> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(
        async move {
            let mut events = match worker.events(token.clone()).await {
                Ok(events) => events,
                Err(e) => {
                    warn!("Unable to retrieve sensor events: {:#}", e);
                    return;
                }
            };

            match worker.sensors(&token).await {
                Ok(snapshot) => {
                    if !send_all(&tx, &token, snapshot).await {
                        return;
                    }
                }
                Err(e) => warn!("Unable to retrieve initial sensors: {:#}", e),
            }

            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(entity) => {
                            if !send(&tx, &token, entity).await {
                                break;
                            }
                        }
                        None => break,
                    },
                    _ = token.cancelled() => break,
                }
            }
            debug!("Event stream finished");
        }
        .instrument(span),
    );

    rx
}

/// Gather the worker's sensors a single time, pass them on, then close.
fn handle_one_shot(
    token: CancellationToken,
    mut worker: Box<dyn OneShotType>,
    span: Span,
) -> mpsc::Receiver<Entity> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(
        async move {
            match worker.sensors(&token).await {
                Ok(sensors) => {
                    send_all(&tx, &token, sensors).await;
                }
                Err(e) => warn!("Unable to retrieve sensors: {:#}", e),
            }
        }
        .instrument(span),
    );

    rx
}

/// Send one entity. Returns false once the receiver is gone or the worker
/// was cancelled.
async fn send(tx: &mpsc::Sender<Entity>, token: &CancellationToken, entity: Entity) -> bool {
    tokio::select! {
        res = tx.send(entity) => res.is_ok(),
        _ = token.cancelled() => false,
    }
}

async fn send_all(tx: &mpsc::Sender<Entity>, token: &CancellationToken, entities: Vec<Entity>) -> bool {
    for entity in entities {
        if !send(tx, token, entity).await {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::{EntityWorker, SensorWorker};
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_polling_preserves_order_and_reports_delta() {
        let poller = CountingPoller::new("cpu", 2);
        let deltas = poller.deltas.clone();
        let mut worker = SensorWorker::polling("cpu", poller, Duration::from_secs(1), Duration::ZERO);

        let token = CancellationToken::new();
        let mut rx = worker.start(token.clone()).unwrap();

        let mut states = Vec::new();
        for _ in 0..6 {
            states.push(rx.recv().await.unwrap().state);
        }
        token.cancel();
        while rx.recv().await.is_some() {}

        let expected: Vec<_> = (0..6).map(serde_json::Value::from).collect();
        assert_eq!(states, expected);

        let deltas = deltas.lock();
        assert!(deltas[0] < Duration::from_millis(1));
        assert!(deltas[1] >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_survives_errors_and_empty_batches() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut worker = SensorWorker::polling(
            "flaky",
            FlakyPoller { calls: calls.clone() },
            Duration::from_secs(1),
            Duration::ZERO,
        );

        let token = CancellationToken::new();
        let rx = worker.start(token.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(4500)).await;
        token.cancel();

        assert!(drain(rx).await.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        let output = logs.contents();
        assert_eq!(output.matches("Worker error occurred: sensor read failed").count(), 3);
        assert_eq!(output.matches("Worker returned no sensors").count(), 2);
        assert!(output.contains("id=flaky"), "{output}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_stops_when_receiver_dropped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut worker = SensorWorker::polling(
            "flaky",
            FlakyPoller { calls: calls.clone() },
            Duration::from_secs(1),
            Duration::ZERO,
        );

        let rx = worker.start(CancellationToken::new()).unwrap();
        drop(rx);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(calls.load(Ordering::SeqCst) <= 1);
    }

    #[tokio::test]
    async fn test_events_snapshot_then_stream() {
        let mut worker = SensorWorker::event("power", ScriptedEvents {
            snapshot: vec![entity("profile", 0)],
            events: vec![entity("profile", 1), entity("profile", 2)],
            hold_open: false,
            fail: false,
        });

        let rx = worker.start(CancellationToken::new()).unwrap();
        let states: Vec<_> = drain(rx).await.into_iter().map(|e| e.state).collect();
        assert_eq!(states, vec![serde_json::json!(0), serde_json::json!(1), serde_json::json!(2)]);
    }

    #[tokio::test]
    async fn test_event_subscription_failure_closes_channel() {
        let mut worker = SensorWorker::event("power", ScriptedEvents {
            snapshot: vec![entity("profile", 0)],
            events: vec![],
            hold_open: false,
            fail: true,
        });

        let rx = worker.start(CancellationToken::new()).unwrap();
        assert!(drain(rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_events_close_on_cancel() {
        let mut worker = SensorWorker::event("power", ScriptedEvents {
            snapshot: vec![],
            events: vec![entity("lid", 1)],
            hold_open: true,
            fail: false,
        });

        let token = CancellationToken::new();
        let mut rx = worker.start(token.clone()).unwrap();
        assert!(rx.recv().await.is_some());

        token.cancel();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_drops_queued_events() {
        let mut worker = SensorWorker::event("power", ScriptedEvents {
            snapshot: vec![],
            events: (0..10).map(|n| entity("lid", n)).collect(),
            hold_open: true,
            fail: false,
        });

        let token = CancellationToken::new();
        let mut rx = worker.start(token.clone()).unwrap();
        assert!(rx.recv().await.is_some());

        token.cancel();
        // Only what already sat in the output slot gets through.
        assert!(drain(rx).await.len() <= 1);
    }

    #[tokio::test]
    async fn test_one_shot_sends_batch_then_closes() {
        let mut worker = SensorWorker::one_shot("info", FixedBatch {
            entities: vec![entity("kernel", 1), entity("os", 2), entity("host", 3)],
            fail: false,
        });

        let rx = worker.start(CancellationToken::new()).unwrap();
        let ids: Vec<_> = drain(rx).await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["kernel", "os", "host"]);
    }

    #[tokio::test]
    async fn test_one_shot_failure_sends_nothing() {
        let mut worker = SensorWorker::one_shot("info", FixedBatch {
            entities: vec![entity("kernel", 1)],
            fail: true,
        });

        let rx = worker.start(CancellationToken::new()).unwrap();
        assert!(drain(rx).await.is_empty());
    }
}
