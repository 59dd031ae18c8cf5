use tracing::{trace, warn};

use super::{InboundEvent, decode};

/// Front door for inbound frames.
///
/// Malformed and unrecognized frames are logged and counted, never returned
/// as errors: one bad message must not stop the stream.
#[derive(Debug, Default)]
pub struct EventRouter {
    decoded: u64,
    dropped: u64,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&mut self, text: &str) -> Option<InboundEvent> {
        match decode(text) {
            Ok(event) => {
                self.decoded += 1;
                trace!(kind = %event.kind(), "Decoded event");
                Some(event)
            }
            Err(err) => {
                self.dropped += 1;
                warn!(error = %err, len = text.len(), "Dropping inbound frame");
                None
            }
        }
    }

    /// Frames decoded into an event so far.
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Frames dropped as malformed or unrecognized so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn bad_frames_are_counted_not_raised() {
        let mut router = EventRouter::new();
        assert!(router.route("{").is_none());
        assert!(router.route(r#"{"type":"mystery","data":{}}"#).is_none());
        let ack = router.route(r#"{"type":"connection_ack","data":{}}"#);
        assert_eq!(ack.map(|e| e.kind()), Some(EventKind::ConnectionAck));
        assert_eq!(router.decoded(), 1);
        assert_eq!(router.dropped(), 2);
    }
}
