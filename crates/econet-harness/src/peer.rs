//! Remote stations for scenario tests.
//!
//! Builders for the frames a remote station puts on the wire, and
//! responders that play the remote side of a handshake against the engine.

use std::collections::VecDeque;

use econet_proto::{Address, FrameHeader};

use crate::sim_adlc::InboundFrame;

/// Data (or broadcast) frame from `src` to `dest`.
pub fn data_frame(dest: Address, src: Address, payload: &[u8]) -> Vec<u8> {
    let mut frame = FrameHeader::new(dest, src).to_bytes().to_vec();
    frame.extend_from_slice(payload);
    frame
}

/// Scout from `src` to `dest`.
pub fn scout_frame(dest: Address, src: Address, control: u8, port: u8, extra: &[u8]) -> Vec<u8> {
    let mut frame = FrameHeader::new(dest, src).to_bytes().to_vec();
    frame.extend_from_slice(&[control, port]);
    frame.extend_from_slice(extra);
    frame
}

/// Acknowledgement of a frame sent from `src` to `dest`.
pub fn ack_frame(dest: Address, src: Address) -> Vec<u8> {
    FrameHeader::new(dest, src).acknowledgement().to_bytes().to_vec()
}

/// Acknowledgement of `frame`, or `None` if it has no header.
pub fn ack_of(frame: &[u8]) -> Option<Vec<u8>> {
    FrameHeader::from_bytes(frame).map(|header| header.acknowledgement().to_bytes().to_vec())
}

/// Remote station that acknowledges every frame addressed to `station`.
pub fn acknowledging(station: Address) -> impl FnMut(&[u8]) -> Vec<InboundFrame> + Send + 'static {
    move |frame| match FrameHeader::from_bytes(frame) {
        Some(header) if header.dest == station => {
            vec![InboundFrame::new(header.acknowledgement().to_bytes().to_vec())]
        },
        _ => Vec::new(),
    }
}

/// Remote station that answers the engine's frames with fixed batches, one
/// batch per frame the engine sends, and stays silent once they run out.
pub fn scripted<I>(batches: I) -> impl FnMut(&[u8]) -> Vec<InboundFrame> + Send + 'static
where
    I: IntoIterator<Item = Vec<InboundFrame>>,
{
    let mut batches: VecDeque<Vec<InboundFrame>> = batches.into_iter().collect();
    move |_frame| batches.pop_front().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGINE: Address = Address::new(2, 0);
    const REMOTE: Address = Address::new(254, 0);

    #[test]
    fn frame_layouts() {
        assert_eq!(scout_frame(ENGINE, REMOTE, 0x80, 0x99, &[1]), vec![2, 0, 254, 0, 0x80, 0x99, 1]);
        assert_eq!(data_frame(ENGINE, REMOTE, b"hi"), vec![2, 0, 254, 0, b'h', b'i']);
        assert_eq!(ack_frame(ENGINE, REMOTE), vec![254, 0, 2, 0]);
        assert_eq!(ack_of(&[2, 0, 254, 0, 9]), Some(vec![254, 0, 2, 0]));
        assert_eq!(ack_of(&[2, 0]), None);
    }

    #[test]
    fn acknowledging_peer_ignores_other_stations() {
        let mut peer = acknowledging(REMOTE);
        assert_eq!(peer(&data_frame(REMOTE, ENGINE, b"x")), vec![InboundFrame::new(vec![2, 0, 254, 0])]);
        assert!(peer(&data_frame(Address::new(3, 0), ENGINE, b"x")).is_empty());
    }

    #[test]
    fn scripted_peer_runs_out() {
        let mut peer = scripted([vec![InboundFrame::new(vec![1, 2, 3, 4])]]);
        assert_eq!(peer(&[]).len(), 1);
        assert!(peer(&[]).is_empty());
    }
}
