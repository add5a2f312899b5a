//! Register catalog of the Inepro PRO380-Mod meter
//!
//! Maps symbolic register names to their descriptors. The table is built once
//! on first use and is read-only afterwards.

use crate::error::{MeterError, MeterResult};
use crate::register::{DecodeKind, RegisterDescriptor};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

pub const SERIAL_NUMBER: RegisterDescriptor = RegisterDescriptor::new(0x1000, 4, DecodeKind::HexString);
pub const METER_CODE: RegisterDescriptor = RegisterDescriptor::new(0x1010, 2, DecodeKind::HexString);
pub const METER_ID: RegisterDescriptor = RegisterDescriptor::new(0x1018, 2, DecodeKind::HexString);
pub const BAUD_RATE: RegisterDescriptor = RegisterDescriptor::new(0x1020, 2, DecodeKind::Integer);
pub const PROTOCOL_VERSION: RegisterDescriptor = RegisterDescriptor::new(0x1050, 4, DecodeKind::Float);
pub const SOFTWARE_VERSION: RegisterDescriptor = RegisterDescriptor::new(0x1054, 4, DecodeKind::Float);
pub const HARDWARE_VERSION: RegisterDescriptor = RegisterDescriptor::new(0x1058, 4, DecodeKind::Float);
pub const METER_AMPS: RegisterDescriptor = RegisterDescriptor::new(0x1060, 2, DecodeKind::Integer);
pub const CT_RATE: RegisterDescriptor = RegisterDescriptor::new(0x1062, 2, DecodeKind::Integer);
pub const TOTAL_ACTIVE_POWER: RegisterDescriptor = RegisterDescriptor::new(0x2080, 4, DecodeKind::Float);
/// L1, L2 and L3 voltages in one read
pub const PHASE_VOLTAGES: RegisterDescriptor = RegisterDescriptor::new(0x5002, 12, DecodeKind::FloatTuple);
pub const L1_VOLTAGE: RegisterDescriptor = RegisterDescriptor::new(0x5002, 4, DecodeKind::Float);
pub const L2_VOLTAGE: RegisterDescriptor = RegisterDescriptor::new(0x5004, 4, DecodeKind::Float);
pub const L3_VOLTAGE: RegisterDescriptor = RegisterDescriptor::new(0x5006, 4, DecodeKind::Float);
pub const GRID_FREQUENCY: RegisterDescriptor = RegisterDescriptor::new(0x5008, 4, DecodeKind::Float);
pub const TOTAL_ACTIVE_ENERGY: RegisterDescriptor = RegisterDescriptor::new(0x6000, 4, DecodeKind::Float);

static CATALOG: Lazy<BTreeMap<&'static str, RegisterDescriptor>> = Lazy::new(|| {
    BTreeMap::from([
        ("serial_number", SERIAL_NUMBER),
        ("meter_code", METER_CODE),
        ("meter_id", METER_ID),
        ("baud_rate", BAUD_RATE),
        ("protocol_version", PROTOCOL_VERSION),
        ("software_version", SOFTWARE_VERSION),
        ("hardware_version", HARDWARE_VERSION),
        ("meter_amps", METER_AMPS),
        ("ct_rate", CT_RATE),
        ("total_active_power", TOTAL_ACTIVE_POWER),
        ("phase_voltages", PHASE_VOLTAGES),
        ("l1_voltage", L1_VOLTAGE),
        ("l2_voltage", L2_VOLTAGE),
        ("l3_voltage", L3_VOLTAGE),
        ("grid_frequency", GRID_FREQUENCY),
        ("total_active_energy", TOTAL_ACTIVE_ENERGY),
    ])
});

/// Look up a register by name
pub fn lookup(name: &str) -> Option<&'static RegisterDescriptor> {
    CATALOG.get(name)
}

/// Look up a register by name, failing with [`MeterError::UnknownRegister`]
pub fn get(name: &str) -> MeterResult<RegisterDescriptor> {
    lookup(name)
        .copied()
        .ok_or_else(|| MeterError::UnknownRegister(name.to_string()))
}

/// All register names in sorted order
pub fn names() -> impl Iterator<Item = &'static str> {
    CATALOG.keys().copied()
}

/// All catalog entries in name order
pub fn iter() -> impl Iterator<Item = (&'static str, &'static RegisterDescriptor)> {
    CATALOG.iter().map(|(name, desc)| (*name, desc))
}
