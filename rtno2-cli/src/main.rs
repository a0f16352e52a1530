//! Interactive test harness for an rtno2 device: connects over serial or a
//! TCP tunnel, runs the introspection calls, and offers a small REPL to
//! activate/deactivate/execute/send/receive named ports.

use std::io::{self, Write as _};
use std::time::Duration;

use clap::Parser;
use clap_verbosity_flag::Verbosity;
use rtno2_lib::channel::serial::SerialChannel;
use rtno2_lib::channel::tcp::TcpChannel;
use rtno2_lib::codec::PortValue;
use rtno2_lib::{ByteChannel, Profile, Protocol};
use tracing::info;

/// `rtno2-cli <device-spec> <baudrate-or-port> [tcp://host]`
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Serial device path (e.g. /dev/ttyUSB0) or, with `--tcp`, ignored.
    device_spec: String,

    /// Baud rate for a serial connection, or TCP port when `--tcp` is set.
    baudrate_or_port: u32,

    /// Connect over a TCP tunnel at this host instead of a local serial port.
    #[arg(long, value_name = "host")]
    tcp: Option<String>,

    /// Per-phase read deadline, in milliseconds. Omit for no deadline.
    #[arg(long, default_value_t = 1000)]
    wait_ms: u64,

    /// Outer retry count for request/reply operations.
    #[arg(long, default_value_t = 3)]
    retries: u32,

    #[command(flatten)]
    verbosity: Verbosity<clap_verbosity_flag::InfoLevel>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.verbosity.tracing_level_filter())
        .init();

    let deadline = Some(Duration::from_millis(args.wait_ms));

    let exit_code = match &args.tcp {
        Some(host) => {
            let addr = format!("{host}:{}", args.baudrate_or_port);
            info!("connecting to {addr} over tcp");
            run(Protocol::new(TcpChannel::connect(&addr)?), deadline, args.retries)
        }
        None => {
            info!("opening {} at {} baud", args.device_spec, args.baudrate_or_port);
            run(
                Protocol::new(SerialChannel::open(&args.device_spec, args.baudrate_or_port)?),
                deadline,
                args.retries,
            )
        }
    };

    match exit_code {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

fn run<C: ByteChannel>(mut protocol: Protocol<C>, deadline: Option<Duration>, retries: u32) -> anyhow::Result<()> {
    let state = protocol.get_state(deadline, retries)?;
    println!("component state: {state:?}");

    let ec_type = protocol.get_ec_type(deadline, retries)?;
    println!("execution context: {ec_type:?}");

    let profile = protocol.get_profile(deadline, retries)?;
    print_profile(&profile);

    repl(&mut protocol, &profile, deadline, retries)
}

fn print_profile(profile: &Profile) {
    println!("architecture: {:?}", profile.architecture);
    println!("in-ports:");
    for port in &profile.in_ports {
        println!("  {} : {:?}", port.name, port.type_code);
    }
    println!("out-ports:");
    for port in &profile.out_ports {
        println!("  {} : {:?}", port.name, port.type_code);
    }
}

/// A line-at-a-time loop: `activate`, `deactivate`, `execute`, `send
/// <port> <i32>`, `recv <port>`, `log`, `quit`.
fn repl<C: ByteChannel>(
    protocol: &mut Protocol<C>,
    profile: &Profile,
    deadline: Option<Duration>,
    retries: u32,
) -> anyhow::Result<()> {
    let stdin = io::stdin();
    loop {
        print!("rtno2> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let mut words = line.split_whitespace();

        match words.next() {
            Some("activate") => protocol.activate(deadline, retries)?,
            Some("deactivate") => protocol.deactivate(deadline, retries)?,
            Some("execute") => protocol.execute(deadline, retries)?,
            Some("log") => println!("{}", protocol.get_log(deadline, retries)?),
            Some("send") => {
                let (Some(port), Some(raw)) = (words.next(), words.next()) else {
                    println!("usage: send <port> <i32>");
                    continue;
                };
                let value: i32 = raw.parse()?;
                protocol.send_as(profile, port, value, deadline, retries)?;
            }
            Some("recv") => {
                let Some(port) = words.next() else {
                    println!("usage: recv <port>");
                    continue;
                };
                let value: i32 = protocol.receive_as(profile, port, deadline, retries)?;
                println!("{port} = {value}");
            }
            Some("quit") | Some("exit") => return Ok(()),
            Some(other) => println!("unrecognized command: {other}"),
            None => {}
        }
    }
}
