//! TCP-to-serial bridge daemon: accepts one client at a time and shuttles
//! raw bytes both ways between the socket and a serial port, so an rtno2
//! device attached over USB/UART can be reached as if it were a `tcp://`
//! device. One client is served at a time; when it disconnects the bridge
//! goes back to listening.

use std::io::ErrorKind;
use std::net::TcpListener;
use std::time::Duration;

use clap::Parser;
use clap_verbosity_flag::Verbosity;
use rtno2_lib::channel::serial::SerialChannel;
use rtno2_lib::channel::tcp::TcpChannel;
use rtno2_lib::ByteChannel;
use tracing::{error, info};

const MAX_CHUNK: usize = 1024;
const IDLE_SLEEP: Duration = Duration::from_micros(200);

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Serial device path, e.g. /dev/ttyUSB0.
    device: String,

    /// Baud rate to open the serial port at.
    baudrate: u32,

    /// TCP port to listen on.
    #[arg(default_value_t = 10000)]
    port: u16,

    #[command(flatten)]
    verbosity: Verbosity<clap_verbosity_flag::InfoLevel>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.verbosity.tracing_level_filter())
        .init();

    let listener = TcpListener::bind(("0.0.0.0", args.port))?;
    info!(port = args.port, "bridge listening");

    loop {
        let (stream, peer) = listener.accept()?;
        info!(%peer, "client connected");

        let mut serial = SerialChannel::open(&args.device, args.baudrate)?;
        let mut socket = TcpChannel::from_stream(stream)?;

        if let Err(e) = shuttle(&mut serial, &mut socket) {
            error!(%peer, error = %e, "bridge session ended");
        } else {
            info!(%peer, "client disconnected");
        }
    }
}

/// Drains whatever's waiting on either side every pass; never blocks on one
/// direction while the other has data ready. Returns when the peer socket
/// goes away (either because a write to it fails, or because its
/// background reader thread observed EOF and drained its queue empty); any
/// other I/O failure propagates as a real error.
fn shuttle(serial: &mut SerialChannel, socket: &mut TcpChannel) -> anyhow::Result<()> {
    let mut buf = [0u8; MAX_CHUNK];
    loop {
        let mut moved_any = false;

        let from_serial = serial.bytes_available()?;
        if from_serial > 0 {
            let n = serial.read(&mut buf[..from_serial.min(MAX_CHUNK)])?;
            if n > 0 {
                match socket.write(&buf[..n]) {
                    Ok(()) => {}
                    Err(e) if is_peer_gone(&e) => return Ok(()),
                    Err(e) => return Err(e.into()),
                }
                moved_any = true;
            }
        }

        let from_socket = socket.bytes_available()?;
        if from_socket > 0 {
            let n = socket.read(&mut buf[..from_socket.min(MAX_CHUNK)])?;
            if n > 0 {
                serial.write(&buf[..n])?;
                moved_any = true;
            }
        }

        if !moved_any {
            // A closed socket with nothing left queued means the client is
            // gone for good and no more bytes will ever arrive from it.
            if socket.is_closed() && socket.bytes_available()? == 0 {
                return Ok(());
            }
            std::thread::sleep(IDLE_SLEEP);
        }
    }
}

fn is_peer_gone(e: &rtno2_lib::Rtno2Error) -> bool {
    matches!(e, rtno2_lib::Rtno2Error::Io(io_err)
        if matches!(io_err.kind(), ErrorKind::BrokenPipe | ErrorKind::ConnectionReset))
}
