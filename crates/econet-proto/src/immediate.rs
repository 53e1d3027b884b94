//! Immediate operations answered without a data phase.

/// Control byte of the machine-peek immediate operation.
///
/// A station that receives a machine peek replies with its identification
/// appended to the scout acknowledgement.
pub const MACHINE_PEEK: u8 = 0x88;

/// Identification returned in response to a machine peek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineIdentity {
    /// Machine type code
    pub machine_type: u8,
    /// Manufacturer code
    pub manufacturer: u8,
    /// Minor software version
    pub version_minor: u8,
    /// Major software version
    pub version_major: u8,
}

impl MachineIdentity {
    /// Identification reported by this bridge: undefined machine type ('U'),
    /// manufacturer 'J', version 5.0 (a 32-bit client).
    pub const BRIDGE: Self =
        Self { machine_type: 0x55, manufacturer: 0x4a, version_minor: 0x00, version_major: 0x05 };

    /// Bytes appended to the acknowledgement, in wire order.
    pub const fn to_bytes(self) -> [u8; 4] {
        [self.machine_type, self.manufacturer, self.version_minor, self.version_major]
    }
}

impl Default for MachineIdentity {
    fn default() -> Self {
        Self::BRIDGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_identity_bytes() {
        assert_eq!(MachineIdentity::BRIDGE.to_bytes(), [0x55, 0x4a, 0x00, 0x05]);
    }
}
