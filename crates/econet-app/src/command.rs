//! Host commands.

use econet_core::TransmitRequest;

/// What the engine loop does with the line between commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Line is not polled; the loop only services commands
    #[default]
    Stop,
    /// Frames addressed to this station are received and acknowledged
    Listen,
    /// Every frame on the wire is captured, nothing is acknowledged
    Monitor,
}

impl Mode {
    /// Numeric mode as reported in status events.
    pub fn code(self) -> u8 {
        match self {
            Self::Stop => 0,
            Self::Listen => 1,
            Self::Monitor => 2,
        }
    }

    /// Mode for a numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Stop),
            1 => Some(Self::Listen),
            2 => Some(Self::Monitor),
            _ => None,
        }
    }

    /// Whether the line is polled in this mode.
    pub fn is_active(self) -> bool {
        self != Self::Stop
    }
}

/// A request from the host to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report a status snapshot
    Status,
    /// Reset and re-initialise the controller
    Restart,
    /// Change the polling mode
    SetMode(Mode),
    /// Change the station number
    SetStation(u8),
    /// Four-way transmit
    Transmit(TransmitRequest),
    /// Answer the pending reply
    Reply {
        /// Id from the receive event
        reply_id: u16,
        /// Reply payload
        data: Vec<u8>,
    },
    /// Broadcast a frame
    Broadcast {
        /// Broadcast payload
        data: Vec<u8>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_codes() {
        for mode in [Mode::Stop, Mode::Listen, Mode::Monitor] {
            assert_eq!(Mode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(Mode::from_code(3), None);
        assert!(!Mode::default().is_active());
    }
}
