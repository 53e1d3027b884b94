//! Handshake orchestration.
//!
//! [`Engine`] runs the receive and transmit sides of the Econet four-way
//! handshake on top of [`Line`]. Every operation is a synchronous call that
//! returns once its exchange is over; the caller polls [`Engine::receive`]
//! (or [`Engine::monitor`]) in a loop and interleaves transmit requests
//! between polls.
//!
//! # Receive
//!
//! ```text
//!  remote                     engine
//!    │ scout ──────────────────> │  opening frame, classified
//!    │ <──────────────────── ack │  flag fill held
//!    │ data ───────────────────> │  retried until the data wait expires
//!    │ <──────────────────── ack │
//! ```
//!
//! Broadcasts end after the opening frame. A machine peek is answered in
//! the scout acknowledgement itself and never reaches the caller.
//!
//! # Transmit
//!
//! The same four frames in the other direction. Both frames are built into
//! engine-owned buffers before anything is sent, so an oversized request
//! fails without touching the controller.

use econet_proto::{
    Address, BROADCAST_STATION, FrameHeader, FrameType, MACHINE_PEEK, ParsedFrame, ScoutFields,
    classify, encode_data, encode_scout,
};
use tracing::{debug, info, trace, warn};

use crate::{
    adlc::{Adlc, Status1, Status2},
    config::EngineConfig,
    env::{ActivityIndicator, Clock, NoActivity},
    error::{AckError, ConfigError, RxError, TxError},
    line::{Line, ReadOutcome, WriteOutcome},
    listen::ListenAddresses,
    poll::Deadline,
    reply::ReplyTracker,
    scout::{MAX_SCOUT_LEN, Scout},
};

/// Outcome of one receive or monitor poll.
///
/// Frame bytes are left in the buffer passed to the poll: the broadcast
/// frame for `Broadcast`, the data frame for `Immediate` and `Transmit`, the
/// captured frame for `Monitor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxResult {
    /// Nothing for the caller
    None,
    /// Exchange failed
    Error(RxError),
    /// Broadcast frame received
    Broadcast,
    /// Immediate operation completed
    Immediate {
        /// The opening scout
        scout: Scout,
    },
    /// Four-way transfer completed
    Transmit {
        /// The opening scout
        scout: Scout,
        /// Id to quote when replying, if deferred replies are enabled
        reply_id: Option<u16>,
    },
    /// Frame captured in monitor mode
    Monitor,
}

impl RxResult {
    fn from_failed_read(outcome: ReadOutcome) -> Self {
        rx_error(outcome).map_or(Self::None, Self::Error)
    }
}

/// Error for a failed read, or `None` for reads that are not errors.
fn rx_error(outcome: ReadOutcome) -> Option<RxError> {
    match outcome {
        ReadOutcome::Ok(_) | ReadOutcome::NoAddressMatch => None,
        ReadOutcome::CrcError => Some(RxError::Crc),
        ReadOutcome::OverrunError => Some(RxError::Overrun),
        ReadOutcome::AbortError => Some(RxError::Abort),
        ReadOutcome::Timeout => Some(RxError::Timeout),
        ReadOutcome::Overflow => Some(RxError::Overflow),
        ReadOutcome::Unexpected => Some(RxError::Misc),
    }
}

/// A four-way transmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitRequest {
    /// Destination station and network
    pub dest: Address,
    /// Scout control byte
    pub control: u8,
    /// Destination port
    pub port: u8,
    /// Data frame payload
    pub data: Vec<u8>,
    /// Extra bytes appended to the scout
    pub scout_extra: Vec<u8>,
}

/// Econet engine bound to one controller.
pub struct Engine<A, C> {
    line: Line<A, C>,
    config: EngineConfig,
    listen: ListenAddresses,
    replies: ReplyTracker,
    activity: Box<dyn ActivityIndicator>,
    tx_scout: Vec<u8>,
    tx_data: Vec<u8>,
    ack: Vec<u8>,
}

impl<A, C> std::fmt::Debug for Engine<A, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("listen", &self.listen)
            .field("replies", &self.replies)
            .finish_non_exhaustive()
    }
}

impl<A: Adlc, C: Clock> Engine<A, C> {
    /// Validate `config`, allocate the transmit buffers and initialise the
    /// controller.
    pub fn new(adlc: A, clock: C, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut line = Line::new(adlc, clock);
        line.init();

        Ok(Self {
            line,
            listen: ListenAddresses::new(config.station),
            replies: ReplyTracker::new(),
            activity: Box::new(NoActivity),
            tx_scout: Vec::with_capacity(config.buffers.tx_scout),
            tx_data: Vec::with_capacity(config.buffers.tx_data),
            ack: Vec::with_capacity(config.buffers.ack),
            config,
        })
    }

    /// Report line activity through `indicator`.
    #[must_use]
    pub fn with_activity_indicator(mut self, indicator: impl ActivityIndicator + 'static) -> Self {
        self.activity = Box::new(indicator);
        self
    }

    /// Own station number.
    pub fn station(&self) -> u8 {
        self.listen.station()
    }

    /// Own address on the local network.
    pub fn address(&self) -> Address {
        Address::new(self.listen.station(), self.config.network)
    }

    /// Change the own station number.
    pub fn set_station(&mut self, station: u8) -> Result<(), ConfigError> {
        if econet_proto::is_broadcast_station(station) {
            return Err(ConfigError::BroadcastStation(station));
        }
        info!(from = self.listen.station(), to = station, "station changed");
        self.listen.set_station(station);
        self.config.station = station;
        Ok(())
    }

    /// Station numbers currently accepted on receive.
    pub fn listen_addresses(&self) -> &ListenAddresses {
        &self.listen
    }

    /// Configuration in force.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The pending reply tracker.
    pub fn replies(&self) -> &ReplyTracker {
        &self.replies
    }

    /// The controller and clock.
    pub fn line(&self) -> &Line<A, C> {
        &self.line
    }

    /// Raw status register 1, for status reports.
    pub fn status_register(&mut self) -> u8 {
        self.line.status1().bits()
    }

    /// Reset and re-initialise the controller, dropping any pending reply.
    pub fn restart(&mut self) {
        info!(station = self.station(), "restarting controller");
        self.replies.clear();
        self.line.reset();
    }

    /// Drop an expired pending reply and let the line go idle.
    ///
    /// [`Engine::receive`] does this itself; a caller that stops polling
    /// must keep calling it while a reply is pending.
    pub fn service_timers(&mut self) {
        if self.replies.expire(self.line.clock().now()) {
            debug!("pending reply expired");
            self.line.release_flag_fill();
        }
    }

    /// Drop the pending reply, if any, and let the line go idle.
    pub fn cancel_reply(&mut self) {
        if self.replies.is_armed() {
            debug!("pending reply cancelled");
            self.replies.clear();
            self.line.release_flag_fill();
        }
    }

    /// Poll for one incoming exchange and run it to completion.
    ///
    /// At most `buffers.rx_data` bytes are written to `data`.
    pub fn receive(&mut self, data: &mut Vec<u8>) -> RxResult {
        self.service_timers();

        let status = self.line.status1();
        if status.contains(Status1::S2_RD_REQ) {
            let result = if self.line.status2().contains(Status2::ADDR_PRESENT) {
                self.activity.set_active(true);
                let result = self.handle_opening_frame(data);
                self.activity.set_active(false);
                result
            } else {
                RxResult::None
            };
            self.line.irq_reset();
            if self.replies.is_armed() {
                self.line.hold_flag_fill();
            }
            result
        } else if status.contains(Status1::RDA) {
            self.line.abort_read();
            self.line.irq_reset();
            RxResult::None
        } else {
            RxResult::None
        }
    }

    /// Poll for one frame on the wire, whoever it is addressed to.
    ///
    /// Nothing is acknowledged and no handshake is run.
    pub fn monitor(&mut self, data: &mut Vec<u8>) -> RxResult {
        let status = self.line.status1();
        if status.contains(Status1::S2_RD_REQ) {
            let result = if self.line.status2().contains(Status2::ADDR_PRESENT) {
                self.activity.set_active(true);
                let outcome = self.line.read_frame(
                    data,
                    self.config.buffers.rx_data,
                    &[],
                    self.config.timeouts.monitor_read,
                    false,
                );
                self.activity.set_active(false);
                if outcome.is_ok() {
                    RxResult::Monitor
                } else {
                    debug!(?outcome, "monitor read failed");
                    self.line.abort_read();
                    RxResult::from_failed_read(outcome)
                }
            } else {
                RxResult::None
            };
            self.line.irq_reset();
            result
        } else if status.contains(Status1::RDA) {
            self.line.abort_read();
            self.line.irq_reset();
            RxResult::None
        } else {
            RxResult::None
        }
    }

    /// Send a scout and a data frame, each acknowledged by the peer.
    pub fn transmit(&mut self, request: &TransmitRequest) -> Result<(), TxError> {
        let header = FrameHeader::new(request.dest, self.address());
        encode_data(&mut self.tx_data, self.config.buffers.tx_data, header, &request.data)?;
        encode_scout(
            &mut self.tx_scout,
            self.config.buffers.tx_scout,
            header,
            ScoutFields { control: request.control, port: request.port },
            &request.scout_extra,
        )?;

        self.activity.set_active(true);
        let result = self.four_way(header);
        self.activity.set_active(false);

        if let Err(error) = result {
            debug!(?request.dest, %error, "transmit failed");
        }
        result
    }

    fn four_way(&mut self, header: FrameHeader) -> Result<(), TxError> {
        let write = self.config.timeouts.write;

        self.line.tx_frame(&self.tx_scout, true, write).into_result()?;
        self.wait_ack(header.dest, header.src).map_err(|_| TxError::NoScoutAck)?;

        self.line.tx_frame(&self.tx_data, true, write).into_result()?;
        self.wait_ack(header.dest, header.src).map_err(|_| TxError::NoDataAck)
    }

    /// Send a single unacknowledged frame to every station.
    pub fn broadcast(&mut self, data: &[u8]) -> Result<(), TxError> {
        let header =
            FrameHeader::new(Address::new(BROADCAST_STATION, BROADCAST_STATION), self.address());
        encode_data(&mut self.tx_data, self.config.buffers.tx_data, header, data)?;

        self.activity.set_active(true);
        let result = self.line.tx_frame(&self.tx_data, false, self.config.timeouts.write);
        self.activity.set_active(false);
        result.into_result()
    }

    /// Answer the pending reply `reply_id` with a data frame.
    ///
    /// Fails with [`TxError::InvalidReceiveId`] without touching the
    /// controller if the id is stale, unknown or expired.
    pub fn reply(&mut self, reply_id: u16, data: &[u8]) -> Result<(), TxError> {
        let now = self.line.clock().now();
        let Some(peer) = self.replies.peer_for(reply_id, now) else {
            debug!(reply_id, "no live pending reply");
            return Err(TxError::InvalidReceiveId);
        };

        let header = FrameHeader::new(peer, self.address());
        encode_data(&mut self.tx_data, self.config.buffers.tx_data, header, data)?;
        self.replies.clear();

        self.activity.set_active(true);
        let result = self
            .line
            .tx_frame(&self.tx_data, false, self.config.timeouts.write)
            .into_result()
            .and_then(|()| self.wait_ack(header.dest, header.src).map_err(|_| TxError::NoDataAck));
        self.activity.set_active(false);
        result
    }

    /// Wait for the acknowledgement of a frame sent to `from` by `to`.
    ///
    /// Reads that fail are discarded and the wait continues until the ack
    /// wait timeout. The first complete frame addressed to this station
    /// decides the outcome: it must be an acknowledgement whose header is
    /// exactly `from` → `to`.
    pub fn wait_ack(&mut self, from: Address, to: Address) -> Result<(), AckError> {
        let timeouts = self.config.timeouts;
        let deadline = Deadline::after(self.line.clock(), timeouts.ack_wait);

        loop {
            self.line.irq_reset();
            let remaining = deadline.remaining(self.line.clock());
            if !self.line.wait_frame_start(remaining) {
                debug!(?from, "no acknowledgement");
                return Err(AckError::Timeout);
            }
            let outcome = self.line.read_frame(
                &mut self.ack,
                self.config.buffers.ack,
                self.listen.own(),
                timeouts.ack_read,
                false,
            );
            if outcome.is_ok() {
                break;
            }
            debug!(?outcome, "acknowledgement read failed");
            self.line.abort_read();
        }

        match classify(&self.ack, false) {
            ParsedFrame { frame_type: FrameType::Acknowledge, header: Some(header), .. }
                if header.src == from && header.dest == to =>
            {
                trace!(?from, "acknowledged");
                Ok(())
            },
            parsed => {
                warn!(
                    frame_type = ?parsed.frame_type,
                    header = ?parsed.header,
                    ?from,
                    ?to,
                    "unexpected frame while waiting for acknowledgement"
                );
                Err(AckError::Mismatch { frame_type: parsed.frame_type, header: parsed.header })
            },
        }
    }

    fn handle_opening_frame(&mut self, data: &mut Vec<u8>) -> RxResult {
        let outcome = self.line.read_frame(
            data,
            self.config.buffers.rx_data,
            self.listen.all(),
            self.config.timeouts.first_frame,
            true,
        );
        if !outcome.is_ok() {
            debug!(?outcome, "opening frame read failed");
            self.line.abort_read();
            return RxResult::from_failed_read(outcome);
        }

        let parsed = classify(data, true);
        match (parsed.frame_type, parsed.header, parsed.scout) {
            (FrameType::Broadcast, ..) => {
                trace!(len = data.len(), "broadcast");
                self.line.abort_read();
                RxResult::Broadcast
            },
            (FrameType::Immediate, Some(header), Some(scout)) if scout.control == MACHINE_PEEK => {
                self.answer_machine_peek(header)
            },
            (FrameType::Immediate, Some(header), Some(_)) => {
                let received = self
                    .keep_scout(data)
                    .and_then(|scout| self.receive_data(header, data).map(|()| scout));
                match received {
                    Ok(scout) => RxResult::Immediate { scout },
                    Err(error) => RxResult::Error(error),
                }
            },
            (FrameType::Transmit, Some(header), Some(_)) => {
                let received = self
                    .keep_scout(data)
                    .and_then(|scout| self.receive_data(header, data).map(|()| scout));
                let scout = match received {
                    Ok(scout) => scout,
                    Err(error) => return RxResult::Error(error),
                };
                let reply_id = self.config.deferred_replies.then(|| {
                    let now = self.line.clock().now();
                    self.replies.arm(header.src, now, self.config.timeouts.reply_expiry)
                });
                RxResult::Transmit { scout, reply_id }
            },
            (frame_type, ..) => {
                warn!(?frame_type, len = data.len(), "unexpected opening frame");
                self.line.abort_read();
                RxResult::None
            },
        }
    }

    /// Copy the opening scout out of `data` before the data frame reuses it.
    fn keep_scout(&mut self, data: &[u8]) -> Result<Scout, RxError> {
        Scout::new(data).ok_or_else(|| {
            warn!(len = data.len(), max = MAX_SCOUT_LEN, "scout too long");
            self.line.abort_read();
            RxError::Overflow
        })
    }

    fn answer_machine_peek(&mut self, scout: FrameHeader) -> RxResult {
        let identity = self.config.identity.to_bytes();
        let sent = self.send_ack(scout, &identity, false);
        self.line.abort_read();
        if sent == WriteOutcome::Ok {
            debug!(peer = ?scout.src, "answered machine peek");
            RxResult::None
        } else {
            debug!(?sent, "machine peek response failed");
            RxResult::Error(RxError::ScoutAck)
        }
    }

    /// Acknowledge a scout and receive the data frame that follows.
    fn receive_data(&mut self, scout: FrameHeader, data: &mut Vec<u8>) -> Result<(), RxError> {
        let timeouts = self.config.timeouts;

        let sent = self.send_ack(scout, &[], true);
        if sent != WriteOutcome::Ok {
            debug!(?sent, "scout acknowledgement failed");
            return Err(RxError::ScoutAck);
        }
        self.line.irq_reset();

        let deadline = Deadline::after(self.line.clock(), timeouts.data_frame_wait);
        loop {
            let remaining = deadline.remaining(self.line.clock());
            if !self.line.wait_frame_start(remaining) {
                debug!(peer = ?scout.src, "no data frame");
                return Err(RxError::Timeout);
            }
            let outcome = self.line.read_frame(
                data,
                self.config.buffers.rx_data,
                self.listen.all(),
                timeouts.data_frame_read,
                false,
            );
            if outcome.is_ok() {
                break;
            }

            debug!(?outcome, "data frame read failed");
            self.line.abort_read();
            self.line.irq_reset();
            if deadline.has_passed(self.line.clock()) {
                return Err(rx_error(outcome).unwrap_or(RxError::Timeout));
            }
        }

        let header = match classify(data, false) {
            ParsedFrame { frame_type: FrameType::Data, header: Some(header), .. } => header,
            parsed => {
                warn!(frame_type = ?parsed.frame_type, len = data.len(), "expected data frame");
                self.line.abort_read();
                return Err(RxError::UnexpectedFrame);
            },
        };

        let sent = self.send_ack(header, &[], false);
        if sent != WriteOutcome::Ok {
            debug!(?sent, "data acknowledgement failed");
            return Err(RxError::DataAck);
        }
        Ok(())
    }

    /// Acknowledge a frame carrying `incoming`, with `extra` appended.
    fn send_ack(&mut self, incoming: FrameHeader, extra: &[u8], flag_fill: bool) -> WriteOutcome {
        if encode_data(&mut self.ack, self.config.buffers.ack, incoming.acknowledgement(), extra)
            .is_err()
        {
            return WriteOutcome::Overflow;
        }
        self.line.prepare_ack();
        self.line.tx_frame(&self.ack, flag_fill, self.config.timeouts.write)
    }
}
