//! Pending reply bookkeeping.
//!
//! After a transmit exchange completes the receiver may answer the sender
//! with a reply frame, without a scout, as long as it does so quickly. At
//! most one such reply is outstanding. It is identified by a counter that
//! wraps at 16 bits, so a stale id from an earlier exchange is rejected.

use std::time::{Duration, Instant};

use econet_proto::Address;

/// The single reply the engine is prepared to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReply {
    /// Id the host must quote to send the reply
    pub reply_id: u16,
    /// Last instant the reply may be sent
    pub expiry: Instant,
    /// Station the reply goes to
    pub peer: Address,
}

/// Tracks the pending reply and the id counter.
#[derive(Debug, Clone, Default)]
pub struct ReplyTracker {
    pending: Option<PendingReply>,
    last_id: u16,
}

impl ReplyTracker {
    /// Tracker with no pending reply.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a reply to `peer`, replacing any earlier one. Returns its id.
    pub fn arm(&mut self, peer: Address, now: Instant, ttl: Duration) -> u16 {
        self.last_id = self.last_id.wrapping_add(1);
        self.pending = Some(PendingReply { reply_id: self.last_id, expiry: now + ttl, peer });
        self.last_id
    }

    /// Peer to reply to, if `reply_id` names the live pending reply.
    pub fn peer_for(&self, reply_id: u16, now: Instant) -> Option<Address> {
        self.pending
            .filter(|pending| pending.reply_id == reply_id && now <= pending.expiry)
            .map(|pending| pending.peer)
    }

    /// Drop the pending reply.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Drop the pending reply if it has expired.
    ///
    /// Returns true only on the call that performs the drop.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(pending) if now > pending.expiry => {
                self.pending = None;
                true
            },
            _ => false,
        }
    }

    /// The pending reply, if any.
    pub fn pending(&self) -> Option<&PendingReply> {
        self.pending.as_ref()
    }

    /// Whether a reply is pending.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_millis(250);
    const PEER: Address = Address::new(0xfe, 0);

    #[test]
    fn armed_reply_accepts_its_id_only() {
        let t0 = Instant::now();
        let mut tracker = ReplyTracker::new();
        let id = tracker.arm(PEER, t0, TTL);

        assert_eq!(tracker.peer_for(id, t0), Some(PEER));
        assert_eq!(tracker.peer_for(id.wrapping_add(1), t0), None);
    }

    #[test]
    fn ids_increase_and_replace() {
        let t0 = Instant::now();
        let mut tracker = ReplyTracker::new();
        let first = tracker.arm(PEER, t0, TTL);
        let second = tracker.arm(Address::new(3, 0), t0, TTL);

        assert_eq!(second, first.wrapping_add(1));
        assert_eq!(tracker.peer_for(first, t0), None);
        assert_eq!(tracker.peer_for(second, t0), Some(Address::new(3, 0)));
    }

    #[test]
    fn id_counter_wraps() {
        let t0 = Instant::now();
        let mut tracker = ReplyTracker { pending: None, last_id: u16::MAX };
        assert_eq!(tracker.arm(PEER, t0, TTL), 0);
    }

    #[test]
    fn expiry_reported_once() {
        let t0 = Instant::now();
        let mut tracker = ReplyTracker::new();
        let id = tracker.arm(PEER, t0, TTL);

        assert!(!tracker.expire(t0 + TTL));
        assert_eq!(tracker.peer_for(id, t0 + TTL), Some(PEER));

        let late = t0 + TTL + Duration::from_millis(1);
        assert_eq!(tracker.peer_for(id, late), None);
        assert!(tracker.expire(late));
        assert!(!tracker.expire(late));
        assert!(!tracker.is_armed());
    }
}
