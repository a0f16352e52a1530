//! Connects to a device and prints its profile: architecture, execution
//! context, component state, and every in/out port with its type code.

use std::time::Duration;

use clap::Parser;
use clap_verbosity_flag::Verbosity;
use rtno2_lib::channel::serial::SerialChannel;
use rtno2_lib::channel::tcp::TcpChannel;
use rtno2_lib::{ByteChannel, Protocol};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Serial device path, or host when `--tcp` is set.
    device_spec: String,

    /// Baud rate for a serial connection, or TCP port when `--tcp` is set.
    baudrate_or_port: u32,

    /// Connect over a TCP tunnel instead of a local serial port.
    #[arg(long)]
    tcp: bool,

    #[arg(long, default_value_t = 1000)]
    wait_ms: u64,

    #[command(flatten)]
    verbosity: Verbosity<clap_verbosity_flag::InfoLevel>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.verbosity.tracing_level_filter())
        .init();

    let deadline = Some(Duration::from_millis(args.wait_ms));

    if args.tcp {
        let addr = format!("{}:{}", args.device_spec, args.baudrate_or_port);
        dump(Protocol::new(TcpChannel::connect(&addr)?), deadline)
    } else {
        dump(
            Protocol::new(SerialChannel::open(&args.device_spec, args.baudrate_or_port)?),
            deadline,
        )
    }
}

fn dump<C: ByteChannel>(mut protocol: Protocol<C>, deadline: Option<Duration>) -> anyhow::Result<()> {
    let state = protocol.get_state(deadline, 3)?;
    let ec_type = protocol.get_ec_type(deadline, 3)?;
    let profile = protocol.get_profile(deadline, 3)?;

    println!("state:             {state:?}");
    println!("execution context: {ec_type:?}");
    println!("architecture:      {:?}", profile.architecture);
    println!();
    println!("in-ports ({}):", profile.in_ports.len());
    for port in &profile.in_ports {
        println!("  {:<24} {:?}", port.name, port.type_code);
    }
    println!("out-ports ({}):", profile.out_ports.len());
    for port in &profile.out_ports {
        println!("  {:<24} {:?}", port.name, port.type_code);
    }

    Ok(())
}
