//! The request/reply state machine layered on the transport: retries,
//! selective error recovery, and the multi-packet profile discovery
//! exchange.

use std::time::Duration;

use tracing::{debug, warn};

use crate::channel::ByteChannel;
use crate::codec::PortValue;
use crate::command::Command;
use crate::error::Rtno2Error;
use crate::packet::Packet;
use crate::profile::{Architecture, ComponentState, ExecutionContextType, PortProfile, Profile, TypeCode};
use crate::result_code::ResultCode;
use crate::transport::{Deadline, Transport, TransportError};

/// A Protocol instance owns a Transport which owns a ByteChannel. All three
/// are constructed together, live for the session, and torn down in
/// reverse order; no persistent state survives teardown.
pub struct Protocol<C: ByteChannel> {
    transport: Transport<C>,
}

impl<C: ByteChannel> Protocol<C> {
    pub fn new(channel: C) -> Self {
        Self {
            transport: Transport::new(channel),
        }
    }

    pub fn transport_mut(&mut self) -> &mut Transport<C> {
        &mut self.transport
    }

    /// Loops up to `max_attempts` times, ignoring heart-beats (which never
    /// count against the budget) and surfacing a `PACKET_ERROR` reply's
    /// embedded result immediately.
    fn wait_and_receive_command(
        &mut self,
        expected: Command,
        deadline: Deadline,
        max_attempts: u32,
    ) -> Result<Packet, Rtno2Error> {
        let mut attempts = 0;
        loop {
            self.transport.is_new(deadline).map_err(|_| Rtno2Error::Timeout)?;
            let packet = self.transport.receive(deadline)?;

            match packet.command() {
                Command::HeartBeat => {
                    debug!("ignoring heart-beat while waiting for {expected:?}");
                    continue;
                }
                Command::PacketError => {
                    // the embedded result is surfaced as-is, even if its
                    // numeric value overlaps a transport timeout/checksum
                    // code — PACKET_ERROR is never retried.
                    return Err(Rtno2Error::DeviceResult(packet.result()));
                }
                cmd if cmd == expected => return Ok(packet),
                other => {
                    attempts += 1;
                    warn!(?other, ?expected, attempts, "unexpected command while waiting for reply");
                    if attempts >= max_attempts {
                        return Err(Rtno2Error::Timeout);
                    }
                }
            }
        }
    }

    /// Sends `command` with `payload` and waits for the matching reply,
    /// retrying up to `retry_count` times. A `CHECKSUM_ERROR` or any
    /// timeout sub-kind flushes the RX buffer and retransmits; a
    /// `PACKET_ERROR` reply's embedded result is returned immediately,
    /// without retry.
    fn request_reply(
        &mut self,
        command: Command,
        payload: Vec<u8>,
        deadline: Deadline,
        retry_count: u32,
    ) -> Result<Packet, Rtno2Error> {
        let packet = Packet::new(command, ResultCode::Ok, payload)?;
        let mut last_err = None;

        for attempt in 1..=retry_count.max(1) {
            self.transport.send(&packet)?;

            match self.wait_and_receive_command(command, deadline, 1) {
                Ok(reply) => return Ok(reply),
                Err(e @ (Rtno2Error::ChecksumError | Rtno2Error::Timeout)) => {
                    warn!(?command, attempt, "recoverable transport error, retrying");
                    self.transport.clear_rx_buffer()?;
                    last_err = Some(e);
                }
                Err(other) => return Err(other),
            }
        }

        Err(retries_exhausted(last_err, retry_count))
    }

    pub fn get_state(&mut self, deadline: Deadline, retry_count: u32) -> Result<ComponentState, Rtno2Error> {
        let reply = self.request_reply(Command::GetState, Vec::new(), deadline, retry_count)?;
        let byte = first_payload_byte(&reply)?;
        Ok(ComponentState::from(byte))
    }

    pub fn get_ec_type(&mut self, deadline: Deadline, retry_count: u32) -> Result<ExecutionContextType, Rtno2Error> {
        let reply = self.request_reply(Command::GetContextType, Vec::new(), deadline, retry_count)?;
        let byte = first_payload_byte(&reply)?;
        Ok(ExecutionContextType::from(byte))
    }

    pub fn activate(&mut self, deadline: Deadline, retry_count: u32) -> Result<(), Rtno2Error> {
        self.status_only(Command::Activate, deadline, retry_count)
    }

    pub fn deactivate(&mut self, deadline: Deadline, retry_count: u32) -> Result<(), Rtno2Error> {
        self.status_only(Command::Deactivate, deadline, retry_count)
    }

    pub fn execute(&mut self, deadline: Deadline, retry_count: u32) -> Result<(), Rtno2Error> {
        self.status_only(Command::Execute, deadline, retry_count)
    }

    fn status_only(&mut self, command: Command, deadline: Deadline, retry_count: u32) -> Result<(), Rtno2Error> {
        let reply = self.request_reply(command, Vec::new(), deadline, retry_count)?;
        if reply.result() != ResultCode::Ok {
            return Err(Rtno2Error::from_result_code(reply.result()));
        }
        Ok(())
    }

    /// `SEND_DATA` request payload: `[name_len, data_len, name, data]`.
    pub fn send_inport_data(
        &mut self,
        name: &str,
        data: &[u8],
        deadline: Deadline,
        retry_count: u32,
    ) -> Result<(), Rtno2Error> {
        let mut payload = Vec::with_capacity(2 + name.len() + data.len());
        payload.push(name.len() as u8);
        payload.push(data.len() as u8);
        payload.extend_from_slice(name.as_bytes());
        payload.extend_from_slice(data);

        let reply = self.request_reply(Command::SendData, payload, deadline, retry_count)?;
        if reply.result() != ResultCode::Ok {
            return Err(Rtno2Error::from_result_code(reply.result()));
        }
        Ok(())
    }

    /// `RECEIVE_DATA` request payload: `[name_len, 0, name]` — the
    /// data-len byte is reserved and always written as `0` by the host.
    /// The reply shares `SEND_DATA`'s layout, carrying the port's current
    /// value.
    pub fn receive_outport_data(
        &mut self,
        name: &str,
        deadline: Deadline,
        retry_count: u32,
    ) -> Result<(String, Vec<u8>), Rtno2Error> {
        let mut payload = Vec::with_capacity(2 + name.len());
        payload.push(name.len() as u8);
        payload.push(0);
        payload.extend_from_slice(name.as_bytes());

        let reply = self.request_reply(Command::ReceiveData, payload, deadline, retry_count)?;
        unpack_name_and_data(reply.payload())
    }

    pub fn receive_log_data(&mut self, deadline: Deadline, retry_count: u32) -> Result<Vec<u8>, Rtno2Error> {
        let reply = self.request_reply(Command::ReceiveLog, Vec::new(), deadline, retry_count)?;
        Ok(reply.into_payload())
    }

    /// Convenience wrapper over [`Protocol::receive_log_data`] that
    /// NUL-terminates and converts the bytes to a `String`.
    pub fn get_log(&mut self, deadline: Deadline, retry_count: u32) -> Result<String, Rtno2Error> {
        let bytes = self.receive_log_data(deadline, retry_count)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// The only multi-frame exchange: flushes RX, sends `GET_PROFILE`,
    /// expects a `PLATFORM_PROFILE` reply, then streams `INPORT_PROFILE`/
    /// `OUTPORT_PROFILE` frames until a terminating `GET_PROFILE` echo.
    ///
    /// The flush-send-wait-for-`PLATFORM_PROFILE` step is itself wrapped in
    /// the outer `retry_count` loop: a `CHECKSUM_ERROR` or timeout on that
    /// very first reply flushes RX and retransmits the whole request, the
    /// same as every other request/reply operation (spec §4.4.3 step 4;
    /// `original_source/src/rtno2proxy/protocol.cpp`'s own
    /// `for (i < retry_count)` loop wraps clear-RX, send, and the initial
    /// wait together).
    pub fn get_profile(&mut self, deadline: Deadline, retry_count: u32) -> Result<Profile, Rtno2Error> {
        let request = Packet::new(Command::GetProfile, ResultCode::Ok, Vec::new())?;
        let mut last_err = None;

        for attempt in 1..=retry_count.max(1) {
            self.transport.clear_rx_buffer()?;
            self.transport.send(&request)?;

            match self.wait_and_receive_command(Command::PlatformProfile, deadline, 1) {
                Ok(first) => {
                    let mut profile = Profile {
                        architecture: architecture_from(&first),
                        in_ports: Vec::new(),
                        out_ports: Vec::new(),
                    };
                    self.stream_profile(&mut profile, deadline, retry_count)?;
                    return Ok(profile);
                }
                Err(e @ (Rtno2Error::ChecksumError | Rtno2Error::Timeout)) => {
                    warn!(attempt, "recoverable error waiting for PLATFORM_PROFILE, retrying");
                    last_err = Some(e);
                }
                Err(other) => return Err(other),
            }
        }

        Err(retries_exhausted(last_err, retry_count))
    }

    fn stream_profile(&mut self, profile: &mut Profile, deadline: Deadline, retry_count: u32) -> Result<(), Rtno2Error> {
        loop {
            if self.transport.is_new(deadline).is_err() {
                self.transport.clear_rx_buffer()?;
                return self.retry_profile_stream(profile, deadline, retry_count, Rtno2Error::Timeout);
            }

            match self.transport.receive(deadline) {
                Ok(packet) => match packet.command() {
                    Command::PlatformProfile => profile.architecture = architecture_from(&packet),
                    Command::InportProfile => profile.in_ports.push(parse_port_profile(packet.payload())?),
                    Command::OutportProfile => profile.out_ports.push(parse_port_profile(packet.payload())?),
                    Command::GetProfile => return Ok(()),
                    Command::PacketError => return Err(Rtno2Error::Device),
                    Command::PacketErrorChecksum => return Err(Rtno2Error::ChecksumError),
                    Command::PacketErrorTimeout => return Err(Rtno2Error::Timeout),
                    other => debug!(?other, "ignoring unexpected command during profile streaming"),
                },
                Err(TransportError::ChecksumError) => {
                    std::thread::sleep(Duration::from_millis(20));
                    self.transport.clear_rx_buffer()?;
                    return self.retry_profile_stream(profile, deadline, retry_count, Rtno2Error::ChecksumError);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn retry_profile_stream(
        &mut self,
        profile: &mut Profile,
        deadline: Deadline,
        retry_count: u32,
        last_err: Rtno2Error,
    ) -> Result<(), Rtno2Error> {
        if retry_count == 0 {
            return Err(last_err);
        }
        *profile = self.get_profile(deadline, retry_count - 1)?;
        Ok(())
    }

    pub fn send_as<T: PortValue>(
        &mut self,
        profile: &Profile,
        port: &str,
        value: T,
        deadline: Deadline,
        retry_count: u32,
    ) -> Result<(), Rtno2Error> {
        profile.inport(port)?;
        self.send_inport_data(port, &value.encode(), deadline, retry_count)
    }

    pub fn receive_as<T: PortValue>(
        &mut self,
        profile: &Profile,
        port: &str,
        deadline: Deadline,
        retry_count: u32,
    ) -> Result<T, Rtno2Error> {
        profile.outport(port)?;
        let (_, data) = self.receive_outport_data(port, deadline, retry_count)?;
        T::decode(&data)
    }

    pub fn send_seq_as<T: PortValue>(
        &mut self,
        profile: &Profile,
        port: &str,
        values: &[T],
        deadline: Deadline,
        retry_count: u32,
    ) -> Result<(), Rtno2Error> {
        profile.inport(port)?;
        self.send_inport_data(port, &T::encode_seq(values), deadline, retry_count)
    }

    pub fn receive_seq_as<T: PortValue>(
        &mut self,
        profile: &Profile,
        port: &str,
        deadline: Deadline,
        retry_count: u32,
    ) -> Result<Vec<T>, Rtno2Error> {
        profile.outport(port)?;
        let (_, data) = self.receive_outport_data(port, deadline, retry_count)?;
        T::decode_seq(&data)
    }
}

/// Classifies an exhausted retry budget per spec §7: "exhausted retries:
/// surface ERR or TIMEOUT depending on whether the last attempt timed
/// out". A final timeout is surfaced as-is; any other recoverable failure
/// (a checksum error that never resolved) is surfaced as
/// [`Rtno2Error::RetriesExhausted`], the host's own "ERR" classification.
fn retries_exhausted(last_err: Option<Rtno2Error>, retry_count: u32) -> Rtno2Error {
    match last_err {
        Some(Rtno2Error::Timeout) => Rtno2Error::Timeout,
        _ => Rtno2Error::RetriesExhausted { retries: retry_count },
    }
}

fn first_payload_byte(packet: &Packet) -> Result<u8, Rtno2Error> {
    packet
        .payload()
        .first()
        .copied()
        .ok_or_else(|| Rtno2Error::InvalidPacket("expected a 1-byte payload".to_string()))
}

fn architecture_from(packet: &Packet) -> Architecture {
    packet
        .payload()
        .first()
        .copied()
        .map(Architecture::from)
        .unwrap_or_default()
}

fn parse_port_profile(payload: &[u8]) -> Result<PortProfile, Rtno2Error> {
    let type_byte = *payload
        .first()
        .ok_or_else(|| Rtno2Error::InvalidPacket("empty port profile payload".to_string()))?;
    let name_bytes = &payload[1..];
    let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
    Ok(PortProfile {
        type_code: TypeCode::from(type_byte),
        name: String::from_utf8_lossy(&name_bytes[..end]).into_owned(),
    })
}

fn unpack_name_and_data(payload: &[u8]) -> Result<(String, Vec<u8>), Rtno2Error> {
    let invalid = || Rtno2Error::InvalidPacket("malformed SEND_DATA-layout payload".to_string());
    let name_len = *payload.first().ok_or_else(invalid)? as usize;
    let data_len = *payload.get(1).ok_or_else(invalid)? as usize;
    let name_start = 2;
    let data_start = name_start + name_len;
    let data_end = data_start + data_len;
    let name_bytes = payload.get(name_start..data_start).ok_or_else(invalid)?;
    let data = payload.get(data_start..data_end).ok_or_else(invalid)?.to_vec();
    Ok((String::from_utf8_lossy(name_bytes).into_owned(), data))
}
