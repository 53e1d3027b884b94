//! econet-bridge: Econet engine behind a line-oriented stdio protocol.

use std::{io, process::ExitCode};

use clap::{Parser, ValueEnum};
use econet_app::{BridgeConfig, BridgeHandle, StartupError};
use econet_bridge::{ParseError, parse, render};
use econet_core::EngineConfig;
use econet_harness::{SimAdlc, SimClock};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Link controller implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Simulated controller that hears its own transmissions
    Loopback,
}

/// Econet bridge
#[derive(Parser, Debug)]
#[command(name = "econet-bridge")]
#[command(version, about, long_about = None)]
struct Args {
    /// Own station number
    #[arg(long, default_value_t = 2)]
    station: u8,

    /// Own network number
    #[arg(long, default_value_t = 0)]
    network: u8,

    /// Receive buffers (also the event queue depth)
    #[arg(long, default_value_t = 6)]
    buffers: usize,

    /// Arm a pending reply after each received transfer
    #[arg(long)]
    deferred_replies: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Link controller to drive
    #[arg(long, value_enum, default_value_t = Backend::Loopback)]
    backend: Backend,
}

#[derive(Debug, Error)]
enum BridgeError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("host i/o: {0}")]
    Io(#[from] io::Error),
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

async fn write_line(stdout: &mut Stdout, line: &str) -> io::Result<()> {
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

fn start(args: &Args) -> Result<BridgeHandle, StartupError> {
    let config = BridgeConfig {
        engine: EngineConfig {
            station: args.station,
            network: args.network,
            deferred_replies: args.deferred_replies,
            ..EngineConfig::default()
        },
        buffers: args.buffers,
    };

    match args.backend {
        Backend::Loopback => {
            let clock = SimClock::new();
            let adlc = SimAdlc::new(clock.clone());
            adlc.set_loopback(true);
            BridgeHandle::start(adlc, clock, config)
        },
    }
}

async fn run(args: Args) -> Result<(), BridgeError> {
    let mut bridge = start(&args)?;
    info!(station = args.station, network = args.network, backend = ?args.backend, "bridge ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                match parse(&line) {
                    Ok(command) => {
                        if bridge.send(command).await.is_err() {
                            break;
                        }
                    },
                    Err(ParseError::Empty) => {},
                    Err(error) => write_line(&mut stdout, &format!("ERROR {error}")).await?,
                }
            }
            event = bridge.next_event() => {
                let Some(event) = event else {
                    warn!("engine stopped");
                    break;
                };
                let frame = event.buffer().and_then(|buffer| bridge.take_buffer(buffer));
                write_line(&mut stdout, &render(&event, frame.as_deref())).await?;
            }
        }
    }

    match tokio::task::spawn_blocking(move || bridge.shutdown()).await {
        Ok(Some(counters)) => info!(?counters, "bridge stopped"),
        Ok(None) | Err(_) => warn!("engine thread did not stop cleanly"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "bridge failed");
            ExitCode::FAILURE
        },
    }
}
