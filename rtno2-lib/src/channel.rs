//! The `ByteChannel` capability the core consumes from its hardware
//! collaborators (serial port, TCP tunnel) and, in tests, from an in-memory
//! double.

use crate::error::Rtno2Error;

pub mod serial;
pub mod tcp;

/// An ordered byte stream with non-blocking reads and an RX-buffer query.
///
/// Implementations are the "thin adapters" spec scopes out of the core:
/// [`serial::SerialChannel`] wraps a POSIX/cross-platform serial port,
/// [`tcp::TcpChannel`] wraps a TCP socket that tunnels raw bytes.
pub trait ByteChannel {
    /// Writes every byte in `data`, blocking until the underlying stream
    /// has accepted it.
    fn write(&mut self, data: &[u8]) -> Result<(), Rtno2Error>;

    /// Reads up to `dst.len()` bytes without blocking, returning how many
    /// bytes were actually copied into `dst`.
    fn read(&mut self, dst: &mut [u8]) -> Result<usize, Rtno2Error>;

    /// How many bytes are currently buffered and ready to read.
    fn bytes_available(&mut self) -> Result<usize, Rtno2Error>;

    /// Drops any buffered inbound bytes.
    fn flush_rx(&mut self) -> Result<(), Rtno2Error>;
}

#[cfg(test)]
pub(crate) mod test_double {
    use super::*;
    use std::collections::VecDeque;

    /// An in-memory [`ByteChannel`] used to drive the transport and
    /// protocol layers end-to-end without real hardware.
    #[derive(Debug, Default)]
    pub struct MemoryChannel {
        pub inbound: VecDeque<u8>,
        pub outbound: Vec<u8>,
    }

    impl MemoryChannel {
        pub fn with_inbound(bytes: impl IntoIterator<Item = u8>) -> Self {
            Self {
                inbound: bytes.into_iter().collect(),
                outbound: Vec::new(),
            }
        }

        pub fn push_inbound(&mut self, bytes: &[u8]) {
            self.inbound.extend(bytes);
        }
    }

    impl ByteChannel for MemoryChannel {
        fn write(&mut self, data: &[u8]) -> Result<(), Rtno2Error> {
            self.outbound.extend_from_slice(data);
            Ok(())
        }

        fn read(&mut self, dst: &mut [u8]) -> Result<usize, Rtno2Error> {
            let n = dst.len().min(self.inbound.len());
            for slot in dst.iter_mut().take(n) {
                *slot = self.inbound.pop_front().unwrap();
            }
            Ok(n)
        }

        fn bytes_available(&mut self) -> Result<usize, Rtno2Error> {
            Ok(self.inbound.len())
        }

        fn flush_rx(&mut self) -> Result<(), Rtno2Error> {
            self.inbound.clear();
            Ok(())
        }
    }
}
