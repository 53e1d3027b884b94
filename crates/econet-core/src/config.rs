//! Engine configuration.

use std::time::Duration;

use econet_proto::{HEADER_LEN, MachineIdentity, SCOUT_HEADER_LEN, is_broadcast_station};

use crate::error::ConfigError;

/// Longest timeout accepted by [`EngineConfig::validate`].
pub const MAX_TIMEOUT: Duration = Duration::from_secs(3600);

/// Timeouts for every wait in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Reading the opening frame of an exchange
    pub first_frame: Duration,
    /// Waiting for the data frame to start after acknowledging a scout
    pub data_frame_wait: Duration,
    /// Reading the data frame once it has started
    pub data_frame_read: Duration,
    /// Waiting for an acknowledgement to start
    pub ack_wait: Duration,
    /// Reading an acknowledgement once it has started
    pub ack_read: Duration,
    /// Sending any frame
    pub write: Duration,
    /// Reading a frame in monitor mode
    pub monitor_read: Duration,
    /// Lifetime of a pending reply
    pub reply_expiry: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            first_frame: Duration::from_millis(2000),
            data_frame_wait: Duration::from_millis(100),
            data_frame_read: Duration::from_millis(10_000),
            ack_wait: Duration::from_millis(200),
            ack_read: Duration::from_millis(2000),
            write: Duration::from_millis(10_000),
            monitor_read: Duration::from_millis(2000),
            reply_expiry: Duration::from_millis(250),
        }
    }
}

impl Timeouts {
    fn named(&self) -> [(&'static str, Duration); 8] {
        [
            ("first frame", self.first_frame),
            ("data frame wait", self.data_frame_wait),
            ("data frame read", self.data_frame_read),
            ("ack wait", self.ack_wait),
            ("ack read", self.ack_read),
            ("write", self.write),
            ("monitor read", self.monitor_read),
            ("reply expiry", self.reply_expiry),
        ]
    }
}

/// Capacities of the engine-owned frame buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSizes {
    /// Outgoing data, broadcast and reply frames
    pub tx_data: usize,
    /// Outgoing scouts
    pub tx_scout: usize,
    /// Outgoing and incoming acknowledgements
    pub ack: usize,
    /// Each receive buffer in the pool
    pub rx_data: usize,
}

impl Default for BufferSizes {
    fn default() -> Self {
        Self { tx_data: 3500, tx_scout: 32, ack: 32, rx_data: 16_536 }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Own station number
    pub station: u8,
    /// Own network number
    pub network: u8,
    /// Buffer capacities
    pub buffers: BufferSizes,
    /// Wait timeouts
    pub timeouts: Timeouts,
    /// Arm a pending reply after each completed transmit exchange
    pub deferred_replies: bool,
    /// Identification returned to machine peeks
    pub identity: MachineIdentity,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            station: 2,
            network: 0,
            buffers: BufferSizes::default(),
            timeouts: Timeouts::default(),
            deferred_replies: false,
            identity: MachineIdentity::BRIDGE,
        }
    }
}

impl EngineConfig {
    /// Check the configuration can be run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_broadcast_station(self.station) {
            return Err(ConfigError::BroadcastStation(self.station));
        }

        let peek_ack = HEADER_LEN + self.identity.to_bytes().len();
        let minimums = [
            ("tx data", self.buffers.tx_data, HEADER_LEN),
            ("tx scout", self.buffers.tx_scout, SCOUT_HEADER_LEN),
            ("ack", self.buffers.ack, peek_ack),
            ("rx data", self.buffers.rx_data, SCOUT_HEADER_LEN),
        ];
        for (buffer, capacity, required) in minimums {
            if capacity < required {
                return Err(ConfigError::BufferTooSmall { buffer, capacity, required });
            }
        }

        for (name, timeout) in self.timeouts.named() {
            if timeout.is_zero() || timeout > MAX_TIMEOUT {
                return Err(ConfigError::TimeoutOutOfRange { name, timeout });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn broadcast_station_rejected() {
        for station in [0x00, 0xff] {
            let config = EngineConfig { station, ..EngineConfig::default() };
            assert_eq!(config.validate(), Err(ConfigError::BroadcastStation(station)));
        }
    }

    #[test]
    fn ack_buffer_must_hold_peek_response() {
        let config = EngineConfig {
            buffers: BufferSizes { ack: 7, ..BufferSizes::default() },
            ..EngineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::BufferTooSmall { buffer: "ack", capacity: 7, required: 8 })
        );
    }

    #[test]
    fn zero_sized_buffer_rejected() {
        let config = EngineConfig {
            buffers: BufferSizes { tx_data: 0, ..BufferSizes::default() },
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BufferTooSmall { buffer: "tx data", .. })
        ));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = EngineConfig::default();
        config.timeouts.ack_wait = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TimeoutOutOfRange { name: "ack wait", .. })
        ));
    }
}
