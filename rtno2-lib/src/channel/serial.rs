//! A [`ByteChannel`](super::ByteChannel) backed by a POSIX/cross-platform
//! serial port, via the `serialport` crate.

use std::time::Duration;

use crate::channel::ByteChannel;
use crate::error::Rtno2Error;

/// A short read timeout on the underlying port turns its blocking `read`
/// into an effectively non-blocking one: a call either returns promptly
/// with whatever bytes are already buffered, or times out with zero.
const READ_TIMEOUT: Duration = Duration::from_millis(1);

pub struct SerialChannel {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialChannel {
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, Rtno2Error> {
        let port = serialport::new(path, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;
        Ok(Self { port })
    }
}

impl ByteChannel for SerialChannel {
    fn write(&mut self, data: &[u8]) -> Result<(), Rtno2Error> {
        self.port.write_all(data)?;
        Ok(())
    }

    fn read(&mut self, dst: &mut [u8]) -> Result<usize, Rtno2Error> {
        match self.port.read(dst) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn bytes_available(&mut self) -> Result<usize, Rtno2Error> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn flush_rx(&mut self) -> Result<(), Rtno2Error> {
        self.port.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }
}
