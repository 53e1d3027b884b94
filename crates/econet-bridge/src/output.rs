//! Event lines written to the host.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use econet_app::{Event, RxEvent, StatusReport};
use econet_core::{RxError, TxError};

/// Result code for a transmit, broadcast or reply.
pub fn tx_code(result: Result<(), TxError>) -> &'static str {
    match result {
        Ok(()) => "OK",
        Err(TxError::Overflow) => "OVERFLOW",
        Err(TxError::Underrun) => "UNDERRUN",
        Err(TxError::LineJammed) => "LINE_JAMMED",
        Err(TxError::NoScoutAck) => "NO_SCOUT_ACK",
        Err(TxError::NoDataAck) => "NO_DATA_ACK",
        Err(TxError::InvalidReceiveId) => "INVALID_RECEIVE_ID",
        Err(TxError::Misc) => "MISC",
    }
}

/// Code for a failed receive.
pub fn rx_error_code(error: RxError) -> &'static str {
    match error {
        RxError::Crc => "ECONET_RX_ERROR_CRC",
        RxError::Overrun => "ECONET_RX_ERROR_OVERRUN",
        RxError::Abort => "ECONET_RX_ERROR_ABORT",
        RxError::Timeout => "ECONET_RX_ERROR_TIMEOUT",
        RxError::Overflow => "ECONET_RX_ERROR_OVERFLOW",
        RxError::ScoutAck => "ECONET_RX_ERROR_SCOUT_ACK",
        RxError::DataAck => "ECONET_RX_ERROR_DATA_ACK",
        RxError::UnexpectedFrame => "ECONET_RX_ERROR_UNEXPECTED_FRAME",
        RxError::Misc => "ECONET_RX_ERROR_MISC",
    }
}

fn status_line(report: &StatusReport) -> String {
    format!(
        "STATUS {} {} {:02x} {} {} {}",
        report.version,
        report.station,
        report.status_register,
        report.mode.code(),
        report.counters.dropped_events,
        report.counters.exhausted_claims,
    )
}

/// Render an event as one line, without the newline.
///
/// `frame` is the contents of the event's receive buffer, if it has one.
pub fn render(event: &Event, frame: Option<&[u8]>) -> String {
    let rx = match event {
        Event::Status(report) => return status_line(report),
        Event::Tx(result) => return format!("TX_RESULT {}", tx_code(*result)),
        Event::Reply(result) => return format!("REPLY_RESULT {}", tx_code(*result)),
        Event::Rx(RxEvent::Error(error)) => return format!("ERROR {}", rx_error_code(*error)),
        Event::Rx(rx) => rx,
    };

    let Some(frame) = frame else {
        return "ERROR receive buffer missing".to_owned();
    };
    let frame = STANDARD.encode(frame);
    match rx {
        RxEvent::Broadcast { .. } => format!("RX_BROADCAST {frame}"),
        RxEvent::Monitor { .. } => format!("MONITOR {frame}"),
        RxEvent::Immediate { scout, .. } => format!("RX_IMMEDIATE {} {frame}", STANDARD.encode(scout)),
        RxEvent::Transmit { scout, reply_id: None, .. } => {
            format!("RX_TRANSMIT {} {frame}", STANDARD.encode(scout))
        },
        RxEvent::Transmit { scout, reply_id: Some(id), .. } => {
            format!("RX_TRANSMIT {} {frame} {id}", STANDARD.encode(scout))
        },
        RxEvent::Error(error) => format!("ERROR {}", rx_error_code(*error)),
    }
}
