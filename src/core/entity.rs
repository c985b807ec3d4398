// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor entities produced by workers

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single sensor reading or event at a point in time.
///
/// Workers create entities and hand them over by value; the worker core never
/// looks inside, only sinks serialize them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable entity identifier, unique per device
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Current state
    pub state: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Extra attributes published alongside the state
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl Entity {
    pub fn new(id: &str, name: &str, state: impl Into<Value>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            state: state.into(),
            units: None,
            device_class: None,
            icon: None,
            attributes: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = Some(units.to_string());
        self
    }

    pub fn with_device_class(mut self, class: &str) -> Self {
        self.device_class = Some(class.to_string());
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Source the reading came from, e.g. `/proc`
    pub fn with_data_source(self, source: &str) -> Self {
        self.with_attribute("data_source", source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_optional_fields() {
        let entity = Entity::new("uptime", "Uptime", 12.5)
            .with_units("h")
            .with_device_class("duration")
            .with_icon("mdi:restart")
            .with_data_source("/proc");

        assert_eq!(entity.state, serde_json::json!(12.5));
        assert_eq!(entity.units.as_deref(), Some("h"));
        assert_eq!(entity.device_class.as_deref(), Some("duration"));
        assert_eq!(entity.attributes.get("data_source"), Some(&serde_json::json!("/proc")));
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let entity = Entity::new("kernel", "Kernel Version", "6.8.0");
        let json = serde_json::to_value(&entity).unwrap();

        assert_eq!(json["state"], "6.8.0");
        assert!(json.get("units").is_none());
        assert!(json.get("attributes").is_none());
    }
}
