//! CRC-16/Modbus calculation for RTU frames

/// CRC calculation constants
const INITIAL_CRC: u16 = 0xFFFF;
const KEY: u16 = 0xA001; // Bit-reversed 8005

/// Precomputed CRC table
static CRC_TABLE: once_cell::sync::Lazy<[u16; 256]> = once_cell::sync::Lazy::new(|| {
    let mut table = [0u16; 256];
    for b in 0..=0xFF {
        let mut v = b as u16;
        for _ in 0..8 {
            if (v & 1) == 1 {
                v = (v >> 1) ^ KEY;
            } else {
                v >>= 1;
            }
        }
        table[b as usize] = v;
    }
    table
});

/// CRC-16/Modbus calculator
#[derive(Debug, Clone)]
pub struct Crc16 {
    crc_value: u16,
}

impl Crc16 {
    /// Create a new CRC calculator
    pub fn new() -> Self {
        Self {
            crc_value: INITIAL_CRC,
        }
    }

    /// Reset the CRC value to initial state
    pub fn reset(&mut self) {
        self.crc_value = INITIAL_CRC;
    }

    /// Update the CRC value with a single byte
    pub fn update(&mut self, data: u8) {
        self.crc_value = (self.crc_value >> 8) ^ CRC_TABLE[((self.crc_value ^ data as u16) & 0xFF) as usize];
    }

    /// Update the CRC value with multiple bytes
    pub fn update_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Get the CRC value as transmitted on the wire (low byte first)
    pub fn to_le_bytes(&self) -> [u8; 2] {
        self.crc_value.to_le_bytes()
    }

    /// Get the current CRC value
    pub fn value(&self) -> u16 {
        self.crc_value
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the CRC-16/Modbus of `data`
pub fn crc16(data: &[u8]) -> u16 {
    let mut calc = Crc16::new();
    calc.update_bytes(data);
    calc.value()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Straight bit loop, used to cross-check the table
    fn bitwise(data: &[u8]) -> u16 {
        let mut crc: u16 = 0xFFFF;
        for &byte in data {
            crc ^= byte as u16;
            for _ in 0..8 {
                if (crc & 0x0001) != 0 {
                    crc = (crc >> 1) ^ 0xA001;
                } else {
                    crc >>= 1;
                }
            }
        }
        crc
    }

    #[test]
    fn test_crc_reference_vectors() {
        assert_eq!(crc16(b"123456789"), 0x4B37);
        assert_eq!(crc16(&[0x01, 0x03, 0x10, 0x00, 0x00, 0x02]), 0xCBC0);
        assert_eq!(crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]), 0x0A84);
    }

    #[test]
    fn test_crc_wire_order() {
        let mut calc = Crc16::new();
        calc.update_bytes(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(calc.to_le_bytes(), [0x84, 0x0A]);
    }

    #[test]
    fn test_crc_table_matches_bit_loop() {
        let data: Vec<u8> = (0..=255u8).rev().collect();
        assert_eq!(crc16(&data), bitwise(&data));
        assert_eq!(crc16(&[0x11, 0x03, 0x00, 0x6B, 0x00, 0x03]), bitwise(&[0x11, 0x03, 0x00, 0x6B, 0x00, 0x03]));
    }

    #[test]
    fn test_crc_reset() {
        let mut calc = Crc16::new();
        calc.update(0x01);
        calc.reset();
        assert_eq!(calc.value(), INITIAL_CRC);
        assert_eq!(crc16(&[]), INITIAL_CRC);
    }
}
