// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor module - host collectors wired up as workers

mod heartbeat;
mod load;
mod memory;
mod network;
mod system_info;
mod uptime;

pub use heartbeat::{HeartbeatWorker, HEARTBEAT_WORKER_ID};
pub use load::{LoadAverageWorker, LOAD_AVERAGE_WORKER_ID};
pub use memory::{MemoryWorker, MEMORY_WORKER_ID};
pub use network::{NetworkRatesWorker, NETWORK_WORKER_ID};
pub use system_info::{SystemInfoWorker, SYSTEM_INFO_WORKER_ID};
pub use uptime::{UptimeWorker, UPTIME_WORKER_ID};

use crate::config::{Config, WorkerPrefs};
use crate::workers::{EntityWorker, MqttWorker, PollingType, SensorWorker};

fn polling(id: &str, worker: impl PollingType + 'static, prefs: &WorkerPrefs) -> Box<dyn EntityWorker> {
    Box::new(
        SensorWorker::polling(id, worker, prefs.interval(), prefs.jitter()).disabled(prefs.disabled),
    )
}

/// Build every entity worker the agent knows about. Disabled ones are
/// included so the manager can log that they were skipped.
pub fn entity_workers(config: &Config) -> Vec<Box<dyn EntityWorker>> {
    let prefs = &config.workers;

    vec![
        polling(UPTIME_WORKER_ID, UptimeWorker, &prefs.uptime),
        polling(LOAD_AVERAGE_WORKER_ID, LoadAverageWorker, &prefs.load_average),
        polling(MEMORY_WORKER_ID, MemoryWorker::new(), &prefs.memory),
        polling(NETWORK_WORKER_ID, NetworkRatesWorker::new(), &prefs.network),
        Box::new(
            SensorWorker::one_shot(SYSTEM_INFO_WORKER_ID, SystemInfoWorker)
                .disabled(prefs.system_info.disabled),
        ),
    ]
}

/// Build the MQTT-only workers
pub fn mqtt_workers(config: &Config) -> Vec<Box<dyn MqttWorker>> {
    vec![Box::new(HeartbeatWorker::new(
        config.workers.heartbeat.clone(),
        &config.mqtt.topic_prefix,
        &config.device_name,
    ))]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_workers_follow_prefs() {
        let mut config = Config::default();
        config.workers.memory.disabled = true;

        let workers = entity_workers(&config);
        let ids: Vec<_> = workers.iter().map(|w| w.id().to_string()).collect();
        assert_eq!(
            ids,
            vec![
                UPTIME_WORKER_ID,
                LOAD_AVERAGE_WORKER_ID,
                MEMORY_WORKER_ID,
                NETWORK_WORKER_ID,
                SYSTEM_INFO_WORKER_ID,
            ]
        );

        let disabled: Vec<_> = workers
            .iter()
            .filter(|w| w.is_disabled())
            .map(|w| w.id())
            .collect();
        assert_eq!(disabled, vec![MEMORY_WORKER_ID]);
    }

    #[test]
    fn test_mqtt_workers() {
        let mut config = Config::default();
        config.workers.heartbeat.disabled = true;

        let workers = mqtt_workers(&config);
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].id(), HEARTBEAT_WORKER_ID);
        assert!(workers[0].is_disabled());
    }
}
