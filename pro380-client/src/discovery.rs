//! Home Assistant MQTT discovery messages
//!
//! Builds the sensor configuration records and topics a publisher announces
//! before sending readings. Only message construction lives here; the broker
//! connection is the caller's.

use serde::{Deserialize, Serialize};

/// Prefix of the state topic readings are published to
pub const STATE_TOPIC_PREFIX: &str = "emon";

/// Topic announcing one sensor entity
pub fn discovery_topic(device_id: &str, entity_id: &str) -> String {
    format!("homeassistant/sensor/{}/{}/config", device_id, entity_id)
}

/// Topic carrying the JSON readings of a device
pub fn state_topic(device_id: &str) -> String {
    format!("{}/{}", STATE_TOPIC_PREFIX, device_id)
}

/// Device block shared by all sensor entities of one meter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub identifiers: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

impl DeviceInfo {
    /// Device block for an Inepro PRO380-Mod meter
    pub fn pro380(device_id: &str) -> Self {
        Self {
            identifiers: device_id.to_string(),
            name: "Inepro PRO380".to_string(),
            manufacturer: "Inepro Metering".to_string(),
            model: "Inepro PRO380-Mod 3-Phase Energy Monitor".to_string(),
        }
    }
}

/// A published measurement: reading key, display name, unit and class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity {
    /// Key in the reading record, normally a catalog register name
    pub entity_id: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub device_class: &'static str,
}

/// Voltage and energy entities announced for a PRO380
pub const DEFAULT_ENTITIES: [Entity; 4] = [
    Entity { entity_id: "l1_voltage", name: "L1_Voltage", unit: "V", device_class: "voltage" },
    Entity { entity_id: "l2_voltage", name: "L2_Voltage", unit: "V", device_class: "voltage" },
    Entity { entity_id: "l3_voltage", name: "L3_Voltage", unit: "V", device_class: "voltage" },
    Entity {
        entity_id: "total_active_energy",
        name: "Total Active Energy",
        unit: "kWh",
        device_class: "energy",
    },
];

/// Sensor configuration payload, in Home Assistant's abbreviated keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub stat_t: String,
    pub device: DeviceInfo,
    pub uniq_id: String,
    pub name: String,
    pub unit_of_meas: String,
    pub device_class: String,
    pub value_template: String,
}

impl SensorConfig {
    pub fn new(device: &DeviceInfo, entity: &Entity) -> Self {
        let device_id = device.identifiers.as_str();
        Self {
            stat_t: state_topic(device_id),
            device: device.clone(),
            uniq_id: format!("{}_{}", device_id, entity.entity_id),
            name: entity.name.to_string(),
            unit_of_meas: entity.unit.to_string(),
            device_class: entity.device_class.to_string(),
            value_template: format!("{{{{ value_json.{} }}}}", entity.entity_id),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Topic and payload of every discovery message for `entities`
pub fn discovery_messages(
    device: &DeviceInfo,
    entities: &[Entity],
) -> serde_json::Result<Vec<(String, String)>> {
    entities
        .iter()
        .map(|entity| {
            let payload = SensorConfig::new(device, entity).to_json()?;
            Ok((discovery_topic(&device.identifiers, entity.entity_id), payload))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pro380_core::catalog;

    #[test]
    fn test_topics() {
        assert_eq!(
            discovery_topic("pro380_1", "l1_voltage"),
            "homeassistant/sensor/pro380_1/l1_voltage/config"
        );
        assert_eq!(state_topic("pro380_1"), "emon/pro380_1");
    }

    #[test]
    fn test_sensor_config_shape() {
        let device = DeviceInfo::pro380("pro380_1");
        let config = SensorConfig::new(&device, &DEFAULT_ENTITIES[3]);
        let json: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();

        assert_eq!(json["stat_t"], "emon/pro380_1");
        assert_eq!(json["uniq_id"], "pro380_1_total_active_energy");
        assert_eq!(json["name"], "Total Active Energy");
        assert_eq!(json["unit_of_meas"], "kWh");
        assert_eq!(json["device_class"], "energy");
        assert_eq!(json["value_template"], "{{ value_json.total_active_energy }}");
        assert_eq!(json["device"]["identifiers"], "pro380_1");
        assert_eq!(json["device"]["manufacturer"], "Inepro Metering");
    }

    #[test]
    fn test_discovery_messages() {
        let device = DeviceInfo::pro380("pro380_1");
        let messages = discovery_messages(&device, &DEFAULT_ENTITIES).unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].0, "homeassistant/sensor/pro380_1/l2_voltage/config");

        let config: SensorConfig = serde_json::from_str(&messages[1].1).unwrap();
        assert_eq!(config, SensorConfig::new(&device, &DEFAULT_ENTITIES[1]));
    }

    #[test]
    fn test_default_entities_are_catalog_registers() {
        for entity in DEFAULT_ENTITIES {
            assert!(catalog::lookup(entity.entity_id).is_some(), "{}", entity.entity_id);
        }
    }
}
