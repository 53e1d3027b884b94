//! The engine loop.
//!
//! [`EngineLoop`] owns the [`Engine`] and runs on its own thread. Each
//! iteration services at most one host command and the engine timers, then,
//! unless stopped, claims a receive buffer and runs one receive or monitor
//! poll. Stopping drops any pending reply, so nothing is left to expire
//! while the loop waits for a command.
//!
//! The loop never blocks on the host. Commands are taken with `try_recv`
//! while the line is polled; only in [`Mode::Stop`], where there is nothing
//! else to do, does it wait for the next command. Events go out with
//! `try_send`: when the event queue is full the event is dropped, its buffer
//! released and the drop counted.

use std::{ops::ControlFlow, sync::Arc};

use econet_core::{Adlc, BufferPool, Clock, Engine, RxResult};
use tokio::sync::mpsc::{
    self,
    error::{TryRecvError, TrySendError},
};
use tracing::{debug, info, warn};

use crate::{
    VERSION,
    command::{Command, Mode},
    event::{Counters, Event, RxEvent, StatusReport},
};

/// Command queue depth. A host sending a second command waits for the first
/// to be taken.
pub const COMMAND_QUEUE_DEPTH: usize = 1;

/// Engine plus the queues connecting it to the host.
#[derive(Debug)]
pub struct EngineLoop<A, C> {
    engine: Engine<A, C>,
    pool: Arc<BufferPool>,
    commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<Event>,
    mode: Mode,
    counters: Counters,
    exhausted: bool,
}

impl<A: Adlc, C: Clock> EngineLoop<A, C> {
    /// Create a stopped loop.
    pub fn new(
        engine: Engine<A, C>,
        pool: Arc<BufferPool>,
        commands: mpsc::Receiver<Command>,
        events: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            engine,
            pool,
            commands,
            events,
            mode: Mode::Stop,
            counters: Counters::default(),
            exhausted: false,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Counters so far.
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// The engine.
    pub fn engine(&self) -> &Engine<A, C> {
        &self.engine
    }

    /// Run until the host goes away, then hand back the final counters.
    pub fn run(mut self) -> Counters {
        info!(station = self.engine.station(), "engine loop started");
        while self.poll_once().is_continue() {}
        info!(
            dropped_events = self.counters.dropped_events,
            exhausted_claims = self.counters.exhausted_claims,
            "engine loop stopped"
        );
        self.counters
    }

    /// One iteration: at most one command, then one line poll.
    ///
    /// Breaks once the command queue is closed or the host has dropped the
    /// event queue.
    pub fn poll_once(&mut self) -> ControlFlow<()> {
        let command = if self.mode.is_active() {
            match self.commands.try_recv() {
                Ok(command) => Some(command),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => return ControlFlow::Break(()),
            }
        } else {
            match self.commands.blocking_recv() {
                Some(command) => Some(command),
                None => return ControlFlow::Break(()),
            }
        };

        if let Some(command) = command
            && self.execute(command).is_break()
        {
            return ControlFlow::Break(());
        }

        self.engine.service_timers();
        if self.mode.is_active() { self.poll_line() } else { ControlFlow::Continue(()) }
    }

    fn execute(&mut self, command: Command) -> ControlFlow<()> {
        debug!(?command, "command");
        match command {
            Command::Status => {
                let report = StatusReport {
                    version: VERSION,
                    station: self.engine.station(),
                    status_register: self.engine.status_register(),
                    mode: self.mode,
                    counters: self.counters,
                };
                self.emit(Event::Status(report))
            },
            Command::Restart => {
                self.engine.restart();
                ControlFlow::Continue(())
            },
            Command::SetMode(mode) => {
                if mode != self.mode {
                    info!(from = ?self.mode, to = ?mode, "mode changed");
                }
                if mode == Mode::Stop {
                    self.engine.cancel_reply();
                }
                self.mode = mode;
                ControlFlow::Continue(())
            },
            Command::SetStation(station) => {
                if let Err(error) = self.engine.set_station(station) {
                    warn!(%error, "station not changed");
                }
                ControlFlow::Continue(())
            },
            Command::Transmit(request) => {
                let result = self.engine.transmit(&request);
                self.emit(Event::Tx(result))
            },
            Command::Reply { reply_id, data } => {
                let result = self.engine.reply(reply_id, &data);
                self.emit(Event::Reply(result))
            },
            Command::Broadcast { data } => {
                let result = self.engine.broadcast(&data);
                self.emit(Event::Tx(result))
            },
        }
    }

    fn poll_line(&mut self) -> ControlFlow<()> {
        let pool = Arc::clone(&self.pool);
        let Some(mut claim) = pool.claim() else {
            self.counters.exhausted_claims += 1;
            if !self.exhausted {
                warn!(
                    buffers = pool.capacity(),
                    "receive buffers exhausted, line not polled until the host releases one"
                );
                self.exhausted = true;
            }
            return ControlFlow::Continue(());
        };
        self.exhausted = false;

        let result = match self.mode {
            Mode::Monitor => self.engine.monitor(&mut claim),
            Mode::Listen | Mode::Stop => self.engine.receive(&mut claim),
        };

        let event = match result {
            RxResult::None => return ControlFlow::Continue(()),
            RxResult::Error(error) => {
                debug!(%error, "receive failed");
                RxEvent::Error(error)
            },
            RxResult::Broadcast => RxEvent::Broadcast { buffer: claim.commit() },
            RxResult::Immediate { scout } => RxEvent::Immediate { scout, buffer: claim.commit() },
            RxResult::Transmit { scout, reply_id } => {
                RxEvent::Transmit { scout, buffer: claim.commit(), reply_id }
            },
            RxResult::Monitor => RxEvent::Monitor { buffer: claim.commit() },
        };
        self.emit(Event::Rx(event))
    }

    fn emit(&mut self, event: Event) -> ControlFlow<()> {
        match self.events.try_send(event) {
            Ok(()) => ControlFlow::Continue(()),
            Err(TrySendError::Full(event)) => {
                if let Some(buffer) = event.buffer() {
                    self.pool.release(buffer);
                }
                self.counters.dropped_events += 1;
                warn!(?event, dropped = self.counters.dropped_events, "event queue full, event dropped");
                ControlFlow::Continue(())
            },
            Err(TrySendError::Closed(event)) => {
                if let Some(buffer) = event.buffer() {
                    self.pool.release(buffer);
                }
                debug!("event queue closed");
                ControlFlow::Break(())
            },
        }
    }
}

