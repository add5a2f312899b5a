//! Periodic readings for a publishing loop
//!
//! A [`Poller`] reads a fixed set of registers and produces a [`Reading`],
//! the flat JSON record a publisher sends to the device's state topic. The
//! cadence and the destination belong to the caller.

use crate::device::MeterClient;
use pro380_core::{catalog, MeterResult, RegisterDescriptor, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// Values read in one polling pass, keyed by register name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    #[serde(skip)]
    pub device_id: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

impl Reading {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Serialize as `{"name": value, ...}`
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Reads a fixed list of registers from one meter
#[derive(Debug, Clone)]
pub struct Poller {
    device_id: String,
    registers: Vec<(String, RegisterDescriptor)>,
    decimals: Option<u32>,
}

impl Poller {
    /// Create a poller for catalog registers
    ///
    /// Fails with `UnknownRegister` for a name not in the catalog.
    pub fn new(device_id: &str, names: &[&str]) -> MeterResult<Self> {
        let registers = names
            .iter()
            .map(|name| catalog::get(name).map(|desc| (name.to_string(), desc)))
            .collect::<MeterResult<Vec<_>>>()?;
        Ok(Self::with_registers(device_id, registers))
    }

    /// Create a poller for arbitrary descriptors
    pub fn with_registers(device_id: &str, registers: Vec<(String, RegisterDescriptor)>) -> Self {
        Self {
            device_id: device_id.to_string(),
            registers,
            decimals: Some(2),
        }
    }

    /// Round float values to `decimals` places; `None` keeps full precision
    pub fn decimals(mut self, decimals: Option<u32>) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn register_names(&self) -> impl Iterator<Item = &str> {
        self.registers.iter().map(|(name, _)| name.as_str())
    }

    /// Read every register once
    ///
    /// The first failing register aborts the pass; no partial reading is
    /// returned.
    pub async fn poll_once<C: MeterClient + ?Sized>(&self, client: &mut C) -> MeterResult<Reading> {
        let mut values = BTreeMap::new();
        for (name, descriptor) in &self.registers {
            let value = client.query(*descriptor).await.inspect_err(|e| {
                log::warn!("Reading {} from {} failed: {}", name, self.device_id, e);
            })?;
            let value = match self.decimals {
                Some(decimals) => value.rounded(decimals),
                None => value,
            };
            values.insert(name.clone(), value);
        }
        log::trace!("Polled {} registers from {}", values.len(), self.device_id);
        Ok(Reading {
            device_id: self.device_id.clone(),
            values,
        })
    }
}
