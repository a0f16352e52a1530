//! Delivers whole packets to/from the protocol layer over an unreliable
//! half-duplex byte stream, with explicit timeout classification.
//!
//! The four timeout classes exist so the protocol layer can decide whether
//! to keep resyncing (`PacketStartTimeout`), drop and retry
//! (`PacketChecksumTimeout`: probable desync), or eventually bubble up
//! (`PacketBodyTimeout` after many retries: device likely wedged).

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::trace;

use crate::channel::ByteChannel;
use crate::constants::{HEADER_SIZE, POLL_INTERVAL_MICROS, SENTINEL};
use crate::error::Rtno2Error;
use crate::packet::{self, Packet};

/// A transport-level failure, distinguishing exactly which phase timed out
/// (or whether the checksum itself was wrong) so the protocol layer can
/// apply its selective recovery policy.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Io(#[from] Rtno2Error),
    #[error("timed out waiting for the start sentinel")]
    PacketStartTimeout,
    #[error("timed out reading the packet header")]
    PacketHeaderTimeout,
    #[error("timed out reading the packet body")]
    PacketBodyTimeout,
    #[error("timed out reading the checksum byte")]
    PacketChecksumTimeout,
    #[error("checksum mismatch on received packet")]
    ChecksumError,
}

impl From<TransportError> for Rtno2Error {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Io(e) => e,
            TransportError::ChecksumError => Rtno2Error::ChecksumError,
            TransportError::PacketStartTimeout
            | TransportError::PacketHeaderTimeout
            | TransportError::PacketBodyTimeout
            | TransportError::PacketChecksumTimeout => Rtno2Error::Timeout,
        }
    }
}

/// `None` means "no deadline": wait indefinitely.
pub type Deadline = Option<Duration>;

pub struct Transport<C: ByteChannel> {
    channel: C,
}

impl<C: ByteChannel> Transport<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Writes `0x0A, 0x0A`, then command, result, length, payload, then the
    /// trailing checksum byte.
    pub fn send(&mut self, packet: &Packet) -> Result<(), Rtno2Error> {
        let mut frame = Vec::with_capacity(2 + HEADER_SIZE + packet.payload().len() + 1);
        frame.extend_from_slice(&SENTINEL);
        frame.extend_from_slice(&packet.encode());
        frame.push(packet.checksum());
        trace!(len = frame.len(), "tx frame");
        self.channel.write(&frame)
    }

    /// Blocks until a `0x0A 0x0A` pair is read or `deadline` expires.
    /// Single bytes that aren't `0x0A` are discarded; a lone `0x0A`
    /// followed by a non-`0x0A` byte restarts the search treating the
    /// second byte as ordinary (never consuming it as part of a match).
    pub fn is_new(&mut self, deadline: Deadline) -> Result<(), TransportError> {
        let start = Instant::now();
        let mut have_first = false;
        let mut byte = [0u8; 1];

        loop {
            if self.read_nonblocking(&mut byte)? == 1 {
                if byte[0] == SENTINEL[0] {
                    if have_first {
                        return Ok(());
                    }
                    have_first = true;
                } else {
                    have_first = false;
                }
                continue;
            }

            if let Some(d) = deadline
                && start.elapsed() >= d
            {
                return Err(TransportError::PacketStartTimeout);
            }
            std::thread::sleep(Duration::from_micros(POLL_INTERVAL_MICROS));
        }
    }

    /// Precondition: the caller has just observed [`Transport::is_new`].
    /// Reads the three header bytes, then `length` payload bytes, then the
    /// checksum byte, each under its own fresh deadline.
    pub fn receive(&mut self, deadline: Deadline) -> Result<Packet, TransportError> {
        let mut header = [0u8; HEADER_SIZE];
        self.read_with_deadline(&mut header, deadline, TransportError::PacketHeaderTimeout)?;
        let (command, result, length) = (header[0], header[1], header[2]);

        let mut payload = vec![0u8; length as usize];
        self.read_with_deadline(&mut payload, deadline, TransportError::PacketBodyTimeout)?;

        let mut checksum_byte = [0u8; 1];
        self.read_with_deadline(&mut checksum_byte, deadline, TransportError::PacketChecksumTimeout)?;

        let expected = packet::checksum(command, result, &payload);
        if checksum_byte[0] != expected {
            return Err(TransportError::ChecksumError);
        }

        Packet::decode(command, result, payload).map_err(TransportError::Io)
    }

    pub fn clear_rx_buffer(&mut self) -> Result<(), Rtno2Error> {
        self.channel.flush_rx()
    }

    fn read_nonblocking(&mut self, dst: &mut [u8]) -> Result<usize, Rtno2Error> {
        if self.channel.bytes_available()? == 0 {
            return Ok(0);
        }
        self.channel.read(dst)
    }

    /// Reads exactly `dst.len()` bytes, busy-polling `bytes_available`
    /// with small sleeps, restarting the deadline budget fresh for this
    /// call — each phase of a packet gets its own timeout window.
    fn read_with_deadline(
        &mut self,
        dst: &mut [u8],
        deadline: Deadline,
        on_timeout: TransportError,
    ) -> Result<(), TransportError> {
        let start = Instant::now();
        let mut filled = 0;

        while filled < dst.len() {
            let n = self.read_nonblocking(&mut dst[filled..])?;
            filled += n;
            if filled == dst.len() {
                return Ok(());
            }

            if let Some(d) = deadline
                && start.elapsed() >= d
            {
                return Err(on_timeout);
            }
            std::thread::sleep(Duration::from_micros(POLL_INTERVAL_MICROS));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::test_double::MemoryChannel;
    use crate::command::Command;
    use crate::result_code::ResultCode;

    fn transport(bytes: &[u8]) -> Transport<MemoryChannel> {
        Transport::new(MemoryChannel::with_inbound(bytes.iter().copied()))
    }

    #[test]
    fn is_new_finds_sentinel_after_stray_byte() {
        let mut t = transport(&[0x41, 0x0A, 0x0A]);
        assert!(t.is_new(None).is_ok());
    }

    #[test]
    fn is_new_does_not_false_trigger_on_single_stray_sentinel_byte() {
        // a lone 0x0A followed by a non-0x0A byte must not match, and must
        // not consume the byte that follows as part of a later valid pair
        let mut t = transport(&[0x0A, 0x41, 0x0A, 0x0A]);
        assert!(t.is_new(None).is_ok());
        // exactly the trailing two 0x0A bytes were consumed as the match
        assert_eq!(t.channel.bytes_available().unwrap(), 0);
    }

    #[test]
    fn receive_assembles_a_frame_that_arrives_in_two_chunks() {
        // models a half-duplex line where the sentinel lands in one poll
        // and the header/payload/checksum only show up a little later.
        let mut t = Transport::new(MemoryChannel::with_inbound([0x0A, 0x0A]));
        t.is_new(Some(Duration::from_millis(50))).unwrap();

        t.channel.push_inbound(&[0x01, 0x00, 0x01, 0x02, 0x04]);
        let packet = t.receive(Some(Duration::from_millis(50))).unwrap();
        assert_eq!(packet.command(), Command::GetState);
        assert_eq!(packet.payload(), &[0x02]);
    }

    #[test]
    fn is_new_times_out_on_empty_stream() {
        let mut t = transport(&[]);
        let err = t.is_new(Some(Duration::from_micros(100))).unwrap_err();
        assert!(matches!(err, TransportError::PacketStartTimeout));
    }

    #[test]
    fn receive_decodes_state_query_scenario() {
        // spec scenario 1, sentinel already consumed by is_new
        let mut t = transport(&[0x01, 0x00, 0x01, 0x02, 0x04]);
        let packet = t.receive(Some(Duration::from_millis(50))).unwrap();
        assert_eq!(packet.command(), Command::GetState);
        assert_eq!(packet.result(), ResultCode::Ok);
        assert_eq!(packet.payload(), &[0x02]);
    }

    #[test]
    fn receive_detects_checksum_mismatch() {
        let mut t = transport(&[0x01, 0x00, 0x01, 0x02, 0xFF]);
        let err = t.receive(Some(Duration::from_millis(50))).unwrap_err();
        assert!(matches!(err, TransportError::ChecksumError));
    }

    #[test]
    fn receive_reports_body_timeout_when_payload_never_arrives() {
        let mut t = transport(&[0x01, 0x00, 0x05]);
        let err = t.receive(Some(Duration::from_micros(200))).unwrap_err();
        assert!(matches!(err, TransportError::PacketBodyTimeout));
    }

    #[test]
    fn boundary_payload_lengths_round_trip() {
        for len in [0usize, 1, 252] {
            let payload = vec![0x07u8; len];
            let command = 0x20u8;
            let result = 0x00u8;
            let cksum = packet::checksum(command, result, &payload);
            let mut bytes = vec![command, result, len as u8];
            bytes.extend_from_slice(&payload);
            bytes.push(cksum);

            let mut t = transport(&bytes);
            let packet = t.receive(Some(Duration::from_millis(50))).unwrap();
            assert_eq!(packet.payload().len(), len);
        }
    }
}
