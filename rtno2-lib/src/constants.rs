//! Wire-format constants for the rtno2 protocol.

/// Two bytes that open every frame on the wire.
pub const SENTINEL: [u8; 2] = [0x0A, 0x0A];

/// Number of header bytes following the sentinel: command, result, length.
pub const HEADER_SIZE: usize = 3;

/// Largest payload a single packet may carry.
pub const MAX_PAYLOAD: usize = 252;

/// Default microsecond sleep between busy-poll iterations while waiting on
/// a deadline. Small enough to keep latency low, large enough not to pin a
/// core spinning on `bytes_available()`.
pub const POLL_INTERVAL_MICROS: u64 = 50;
