//! A [`ByteChannel`](super::ByteChannel) that tunnels raw bytes over a TCP
//! socket, mirroring a POSIX serial line.
//!
//! Grounded in the original `EtherTcp` HAL: a background thread keeps
//! pumping inbound bytes off the socket into a mutex-protected queue so
//! that `read`/`bytes_available` never block. The original kept that
//! queue and its mutex as process-wide globals; here they are per-channel
//! instance fields, since there is no reason for process-wide state.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, warn};

use crate::channel::ByteChannel;
use crate::error::Rtno2Error;

struct Shared {
    queue: Mutex<VecDeque<u8>>,
    closed: AtomicBool,
}

pub struct TcpChannel {
    stream: TcpStream,
    shared: Arc<Shared>,
    reader: Option<thread::JoinHandle<()>>,
}

impl TcpChannel {
    pub fn connect(addr: &str) -> Result<Self, Rtno2Error> {
        let stream = TcpStream::connect(addr)?;
        Self::from_stream(stream)
    }

    pub fn from_stream(stream: TcpStream) -> Result<Self, Rtno2Error> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(false),
        });

        let mut reader_stream = stream.try_clone()?;
        let reader_shared = Arc::clone(&shared);
        let reader = thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader_stream.read(&mut buf) {
                    Ok(0) => {
                        debug!("tcp channel: peer closed connection");
                        break;
                    }
                    Ok(n) => {
                        let mut queue = reader_shared.queue.lock().unwrap();
                        queue.extend(&buf[..n]);
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("tcp channel: reader thread stopping: {e}");
                        break;
                    }
                }
            }
            reader_shared.closed.store(true, Ordering::Release);
        });

        Ok(Self {
            stream,
            shared,
            reader: Some(reader),
        })
    }

    /// Whether the background reader thread has observed the peer close
    /// the connection (or a read error). Once set, `bytes_available`/
    /// `read` will only ever drain what's already queued; no more bytes
    /// will ever arrive.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl ByteChannel for TcpChannel {
    fn write(&mut self, data: &[u8]) -> Result<(), Rtno2Error> {
        self.stream.write_all(data)?;
        Ok(())
    }

    fn read(&mut self, dst: &mut [u8]) -> Result<usize, Rtno2Error> {
        let mut queue = self.shared.queue.lock().unwrap();
        let n = dst.len().min(queue.len());
        for slot in dst.iter_mut().take(n) {
            *slot = queue.pop_front().unwrap();
        }
        Ok(n)
    }

    fn bytes_available(&mut self) -> Result<usize, Rtno2Error> {
        Ok(self.shared.queue.lock().unwrap().len())
    }

    fn flush_rx(&mut self) -> Result<(), Rtno2Error> {
        self.shared.queue.lock().unwrap().clear();
        Ok(())
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        if let Some(reader) = self.reader.take() {
            // The socket shutdown above unblocks the reader thread's
            // blocking read; give it a moment to notice before we return.
            let _ = reader.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Duration;

    #[test]
    fn is_closed_flips_once_peer_disconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let stream = TcpStream::connect(addr).unwrap();
            drop(stream);
        });
        let (server_stream, _) = listener.accept().unwrap();
        client.join().unwrap();

        let mut channel = TcpChannel::from_stream(server_stream).unwrap();
        let mut waited = Duration::ZERO;
        while !channel.is_closed() && waited < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(10));
            waited += Duration::from_millis(10);
        }

        assert!(channel.is_closed());
        assert_eq!(channel.bytes_available().unwrap(), 0);
    }
}
