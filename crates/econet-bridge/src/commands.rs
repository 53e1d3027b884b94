//! Host command parsing.
//!
//! One command per line, fields separated by whitespace. Numbers are
//! decimal, payloads standard base64.
//!
//! ```text
//! STATUS
//! RESTART
//! SET_MODE STOP|LISTEN|MONITOR
//! SET_STATION <station>
//! TX <station> <network> <control> <port> <data> [<scout extra>]
//! REPLY <reply id> <data>
//! BCAST <data>
//! ```

use std::{
    fmt::Write as _,
    str::{FromStr, SplitWhitespace},
};

use base64::{DecodeError, Engine as _, engine::general_purpose::STANDARD};
use econet_app::{Command, Mode};
use econet_core::TransmitRequest;
use econet_proto::Address;
use thiserror::Error;

const COMMANDS: [&str; 7] = ["STATUS", "RESTART", "SET_MODE", "SET_STATION", "TX", "REPLY", "BCAST"];

/// Why a command line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Blank line
    #[error("empty command")]
    Empty,
    /// First word is not a command
    #[error("unknown command {0}")]
    Unknown(String),
    /// Required argument absent
    #[error("{command} missing {argument}")]
    MissingArgument {
        /// Command name
        command: &'static str,
        /// Argument name
        argument: &'static str,
    },
    /// More arguments than the command takes
    #[error("{command} takes no more arguments")]
    TrailingArguments {
        /// Command name
        command: &'static str,
    },
    /// Argument is not a number in range
    #[error("{command} {argument} {value} is not a valid number")]
    InvalidNumber {
        /// Command name
        command: &'static str,
        /// Argument name
        argument: &'static str,
        /// Text given
        value: String,
    },
    /// Not a mode name
    #[error("unknown mode {0}")]
    InvalidMode(String),
    /// Payload is not base64
    #[error("{command} {argument} is not valid base64: {source}")]
    InvalidBase64 {
        /// Command name
        command: &'static str,
        /// Argument name
        argument: &'static str,
        /// Decoder error
        #[source]
        source: DecodeError,
    },
}

struct Args<'a> {
    command: &'static str,
    rest: SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn required(&mut self, argument: &'static str) -> Result<&'a str, ParseError> {
        self.rest
            .next()
            .ok_or(ParseError::MissingArgument { command: self.command, argument })
    }

    fn number<T: FromStr>(&mut self, argument: &'static str) -> Result<T, ParseError> {
        let value = self.required(argument)?;
        value.parse().map_err(|_| ParseError::InvalidNumber {
            command: self.command,
            argument,
            value: value.to_owned(),
        })
    }

    fn payload(&mut self, argument: &'static str) -> Result<Vec<u8>, ParseError> {
        let value = self.required(argument)?;
        self.decode(argument, value)
    }

    fn optional_payload(&mut self, argument: &'static str) -> Result<Vec<u8>, ParseError> {
        match self.rest.next() {
            Some(value) => self.decode(argument, value),
            None => Ok(Vec::new()),
        }
    }

    fn decode(&self, argument: &'static str, value: &str) -> Result<Vec<u8>, ParseError> {
        STANDARD
            .decode(value)
            .map_err(|source| ParseError::InvalidBase64 { command: self.command, argument, source })
    }

    fn finish(mut self, command: Command) -> Result<Command, ParseError> {
        match self.rest.next() {
            Some(_) => Err(ParseError::TrailingArguments { command: self.command }),
            None => Ok(command),
        }
    }
}

fn parse_mode(name: &str) -> Result<Mode, ParseError> {
    match name {
        "STOP" => Ok(Mode::Stop),
        "LISTEN" => Ok(Mode::Listen),
        "MONITOR" => Ok(Mode::Monitor),
        other => Err(ParseError::InvalidMode(other.to_owned())),
    }
}

fn mode_name(mode: Mode) -> &'static str {
    match mode {
        Mode::Stop => "STOP",
        Mode::Listen => "LISTEN",
        Mode::Monitor => "MONITOR",
    }
}

/// Parse one command line.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let mut rest = line.split_whitespace();
    let name = rest.next().ok_or(ParseError::Empty)?;
    let command = COMMANDS
        .into_iter()
        .find(|command| *command == name)
        .ok_or_else(|| ParseError::Unknown(name.to_owned()))?;
    let mut args = Args { command, rest };

    let parsed = match command {
        "STATUS" => Command::Status,
        "RESTART" => Command::Restart,
        "SET_MODE" => Command::SetMode(parse_mode(args.required("mode")?)?),
        "SET_STATION" => Command::SetStation(args.number("station")?),
        "TX" => {
            let station = args.number("station")?;
            let network = args.number("network")?;
            let control = args.number("control")?;
            let port = args.number("port")?;
            let data = args.payload("data")?;
            let scout_extra = args.optional_payload("scout extra")?;
            Command::Transmit(TransmitRequest {
                dest: Address::new(station, network),
                control,
                port,
                data,
                scout_extra,
            })
        },
        "REPLY" => {
            let reply_id = args.number("reply id")?;
            let data = args.payload("data")?;
            Command::Reply { reply_id, data }
        },
        _ => Command::Broadcast { data: args.payload("data")? },
    };
    args.finish(parsed)
}

/// Format a command as a line [`parse`] accepts.
///
/// An empty scout extra is left off. Empty data payloads have no text
/// form.
pub fn format(command: &Command) -> String {
    let mut line = String::new();
    let _ = match command {
        Command::Status => write!(line, "STATUS"),
        Command::Restart => write!(line, "RESTART"),
        Command::SetMode(mode) => write!(line, "SET_MODE {}", mode_name(*mode)),
        Command::SetStation(station) => write!(line, "SET_STATION {station}"),
        Command::Transmit(request) => {
            let _ = write!(
                line,
                "TX {} {} {} {} {}",
                request.dest.station,
                request.dest.network,
                request.control,
                request.port,
                STANDARD.encode(&request.data)
            );
            if request.scout_extra.is_empty() {
                Ok(())
            } else {
                write!(line, " {}", STANDARD.encode(&request.scout_extra))
            }
        },
        Command::Reply { reply_id, data } => {
            write!(line, "REPLY {reply_id} {}", STANDARD.encode(data))
        },
        Command::Broadcast { data } => write!(line, "BCAST {}", STANDARD.encode(data)),
    };
    line
}
