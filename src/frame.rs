//! Frames exchanged with the transform service.
//!
//! Each frame is a single bincode value carried inside one length-delimited
//! envelope. The client writes [`Sreequest`]s and reads [`Sreesponse`]s;
//! both are tagged unions of a payload chunk or a keepalive ping, so the
//! receiver dispatches with an exhaustive `match` instead of inspecting
//! loosely typed fields.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bincode::{Decode, Encode};

/// Upper bound on the bytes a [`Payload`] frame adds around its data.
///
/// Covers the variant tag, the request id string, both part counters and
/// the data length prefix, with slack for the length-delimited envelope.
pub const MAX_FRAME_OVERHEAD: usize = 128;

/// One chunk of a logical transform request or response.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Payload {
    /// Correlation id shared by every chunk of the request.
    pub id: String,
    /// Zero-based position of this chunk.
    pub part: i32,
    /// Number of chunks the request was split into.
    pub total_parts: i32,
    /// Chunk bytes.
    pub data: Vec<u8>,
}

impl Payload {
    /// Build a payload chunk.
    #[must_use]
    pub fn new(id: impl Into<String>, part: i32, total_parts: i32, data: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            part,
            total_parts,
            data,
        }
    }
}

/// Keepalive ping stamped with the sender's wall clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Ping {
    /// Microseconds since the Unix epoch when the ping was created.
    pub time: i64,
}

impl Ping {
    /// Create a ping stamped with `at`.
    #[must_use]
    pub fn at(at: SystemTime) -> Self {
        Self {
            time: unix_micros(at),
        }
    }

    /// Create a ping stamped with the current time.
    #[must_use]
    pub fn now() -> Self { Self::at(SystemTime::now()) }

    /// Round trip between the embedded timestamp and `now`.
    ///
    /// Clock skew that would produce a negative duration yields zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, SystemTime};
    ///
    /// use sreeify::frame::Ping;
    ///
    /// let sent = SystemTime::now();
    /// let ping = Ping::at(sent);
    /// let rtt = ping.round_trip_at(sent + Duration::from_millis(40));
    /// assert_eq!(rtt, Duration::from_millis(40));
    /// ```
    #[must_use]
    pub fn round_trip_at(self, now: SystemTime) -> Duration {
        let sent = u64::try_from(self.time).unwrap_or(0);
        let sent = UNIX_EPOCH + Duration::from_micros(sent);
        now.duration_since(sent).unwrap_or(Duration::ZERO)
    }
}

/// Frame written by the client.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Sreequest {
    /// A chunk of a payload to transform.
    Payload(Payload),
    /// A keepalive ping.
    Ping(Ping),
}

/// Frame read by the client.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Sreesponse {
    /// A chunk of a transformed payload.
    Payload(Payload),
    /// An echoed keepalive ping.
    Ping(Ping),
}

fn unix_micros(at: SystemTime) -> i64 {
    at.duration_since(UNIX_EPOCH)
        .map_or(0, |since| i64::try_from(since.as_micros()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use rstest::rstest;

    use super::{MAX_FRAME_OVERHEAD, Payload, Ping, Sreequest, Sreesponse};
    use crate::message::Message;

    #[test]
    fn ping_round_trip_matches_elapsed_time() {
        let sent = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let ping = Ping::at(sent);
        assert_eq!(ping.time, 1_700_000_000_000_000);

        let rtt = ping.round_trip_at(sent + Duration::from_micros(2_345));
        assert_eq!(rtt, Duration::from_micros(2_345));
    }

    #[test]
    fn ping_from_the_future_reports_zero() {
        let sent = UNIX_EPOCH + Duration::from_secs(10);
        let ping = Ping::at(sent);
        assert_eq!(ping.round_trip_at(UNIX_EPOCH), Duration::ZERO);
    }

    #[test]
    fn inbound_ping_decodes_as_ping_variant() {
        let bytes = Sreesponse::Ping(Ping { time: 42 })
            .to_bytes()
            .expect("encode ping");
        let (frame, consumed) = Sreesponse::from_bytes(&bytes).expect("decode ping");
        assert_eq!(consumed, bytes.len());
        assert!(matches!(frame, Sreesponse::Ping(Ping { time: 42 })));
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(64 * 1024)]
    fn payload_overhead_stays_within_bound(#[case] data_len: usize) {
        let id = "0192f0c4-7e3a-7c1d-9b1e-4d5a6b7c8d9e";
        let frame = Sreequest::Payload(Payload::new(id, i32::MAX, i32::MAX, vec![0; data_len]));
        let encoded = frame.to_bytes().expect("encode payload");
        assert!(encoded.len() - data_len <= MAX_FRAME_OVERHEAD);
    }
}
