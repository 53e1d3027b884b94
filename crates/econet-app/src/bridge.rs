//! Engine thread startup and the host's handle to it.

use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};

use econet_core::{
    Adlc, BufferHandle, BufferPool, Clock, ConfigError, Engine, EngineConfig, PoolError,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::{
    command::Command,
    event::{Counters, Event},
    runtime::{COMMAND_QUEUE_DEPTH, EngineLoop},
};

/// Name of the engine thread.
pub const ENGINE_THREAD: &str = "econet-engine";

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Engine configuration
    pub engine: EngineConfig,
    /// Number of receive buffers, which is also the event queue depth
    pub buffers: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { engine: EngineConfig::default(), buffers: 6 }
    }
}

/// Fatal errors while starting the bridge.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Engine configuration rejected
    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),
    /// Receive buffers could not be allocated
    #[error("receive buffer pool: {0}")]
    Pool(#[from] PoolError),
    /// Engine thread could not be started
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] io::Error),
}

/// The engine thread is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("engine has stopped")]
pub struct EngineStopped;

/// Host side of a running bridge.
#[derive(Debug)]
pub struct BridgeHandle {
    commands: mpsc::Sender<Command>,
    events: mpsc::Receiver<Event>,
    pool: Arc<BufferPool>,
    thread: JoinHandle<Counters>,
}

impl BridgeHandle {
    /// Build an engine from `config` and start it on its own thread.
    pub fn start<A, C>(adlc: A, clock: C, config: BridgeConfig) -> Result<Self, StartupError>
    where
        A: Adlc + 'static,
        C: Clock + 'static,
    {
        let engine = Engine::new(adlc, clock, config.engine)?;
        Self::spawn(engine, config.buffers)
    }

    /// Start an already built engine with `buffers` receive buffers.
    pub fn spawn<A, C>(engine: Engine<A, C>, buffers: usize) -> Result<Self, StartupError>
    where
        A: Adlc + 'static,
        C: Clock + 'static,
    {
        let pool = Arc::new(BufferPool::new(buffers, engine.config().buffers.rx_data)?);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (event_tx, event_rx) = mpsc::channel(buffers);

        let engine_loop = EngineLoop::new(engine, Arc::clone(&pool), command_rx, event_tx);
        let thread = thread::Builder::new()
            .name(ENGINE_THREAD.to_owned())
            .spawn(move || engine_loop.run())
            .map_err(StartupError::Spawn)?;

        info!(buffers, buffer_size = pool.buffer_size(), "bridge started");
        Ok(Self { commands: command_tx, events: event_rx, pool, thread })
    }

    /// Queue a command, waiting while the previous one is still pending.
    pub async fn send(&self, command: Command) -> Result<(), EngineStopped> {
        self.commands.send(command).await.map_err(|_| EngineStopped)
    }

    /// Blocking [`Self::send`], for callers outside an async runtime.
    pub fn blocking_send(&self, command: Command) -> Result<(), EngineStopped> {
        self.commands.blocking_send(command).map_err(|_| EngineStopped)
    }

    /// Next event, or `None` once the engine has stopped and the queue is
    /// drained.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// Blocking [`Self::next_event`], for callers outside an async runtime.
    pub fn blocking_next_event(&mut self) -> Option<Event> {
        self.events.blocking_recv()
    }

    /// Shared receive buffers.
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Copy out a received frame and return its buffer to the pool.
    pub fn take_buffer(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        let frame = self.pool.get(buffer, <[u8]>::to_vec);
        self.pool.release(buffer);
        frame
    }

    /// Close the command queue and wait for the engine thread to finish its
    /// current exchange and exit.
    ///
    /// Returns the loop's final counters, or `None` if the thread panicked.
    pub fn shutdown(self) -> Option<Counters> {
        let Self { commands, events, pool: _, thread } = self;
        drop(commands);
        drop(events);
        match thread.join() {
            Ok(counters) => Some(counters),
            Err(_) => {
                error!("engine thread panicked");
                None
            },
        }
    }
}
