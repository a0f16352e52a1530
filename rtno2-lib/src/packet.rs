//! The framing codec: a pure, no-I/O mapping between a [`Packet`] and the
//! `command, result, length, payload` bytes that sit between the transport's
//! start sentinel and its trailing checksum byte.

use crate::command::Command;
use crate::constants::MAX_PAYLOAD;
use crate::error::Rtno2Error;
use crate::result_code::ResultCode;

/// Running unsigned 8-bit sum of `command + result + length + payload[*]`.
pub fn checksum(command: u8, result: u8, payload: &[u8]) -> u8 {
    let mut sum = command.wrapping_add(result).wrapping_add(payload.len() as u8);
    for &byte in payload {
        sum = sum.wrapping_add(byte);
    }
    sum
}

/// A decoded packet: the atomic unit exchanged between protocol and device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    command: Command,
    result: ResultCode,
    payload: Vec<u8>,
}

impl Packet {
    pub fn new(command: Command, result: ResultCode, payload: Vec<u8>) -> Result<Self, Rtno2Error> {
        if payload.len() > MAX_PAYLOAD {
            return Err(Rtno2Error::InvalidPacket(format!(
                "payload of {} bytes exceeds the {} byte limit",
                payload.len(),
                MAX_PAYLOAD
            )));
        }
        Ok(Self {
            command,
            result,
            payload,
        })
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn result(&self) -> ResultCode {
        self.result
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn length(&self) -> u8 {
        self.payload.len() as u8
    }

    /// The checksum this packet would carry on the wire.
    pub fn checksum(&self) -> u8 {
        checksum(self.command.into(), self.result.into(), &self.payload)
    }

    /// Serializes `command, result, length, payload` — everything between
    /// the transport's sentinel and its checksum byte.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3 + self.payload.len());
        out.push(self.command.into());
        out.push(self.result.into());
        out.push(self.length());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Rebuilds a packet from its header bytes and payload, as read off the
    /// wire by the transport (which has already verified the checksum).
    pub fn decode(command: u8, result: u8, payload: Vec<u8>) -> Result<Self, Rtno2Error> {
        Self::new(Command::from(command), ResultCode::from(result), payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_matches_state_query_scenario() {
        // spec scenario 1: 0A 0A 01 00 01 02 04
        assert_eq!(checksum(0x01, 0x00, &[0x02]), 0x04);
    }

    #[test]
    fn checksum_matches_activate_reply_scenario() {
        // spec scenario 2: 0A 0A 10 00 00 10
        assert_eq!(checksum(0x10, 0x00, &[]), 0x10);
    }

    #[test]
    fn decode_then_encode_round_trips_header_and_payload() {
        let packet = Packet::new(Command::GetState, ResultCode::Ok, vec![0x02]).unwrap();
        let decoded = Packet::decode(0x01, 0x00, vec![0x02]).unwrap();
        assert_eq!(packet, decoded);
        assert_eq!(decoded.encode(), vec![0x01, 0x00, 0x01, 0x02]);
    }

    #[test]
    fn boundary_payload_lengths_are_accepted() {
        assert!(Packet::new(Command::SendData, ResultCode::Ok, vec![]).is_ok());
        assert!(Packet::new(Command::SendData, ResultCode::Ok, vec![0xAB]).is_ok());
        assert!(Packet::new(Command::SendData, ResultCode::Ok, vec![0; MAX_PAYLOAD]).is_ok());
    }

    #[test]
    fn payload_over_the_limit_is_rejected() {
        let oversized = vec![0u8; MAX_PAYLOAD + 1];
        assert!(Packet::new(Command::SendData, ResultCode::Ok, oversized).is_err());
    }

    #[test]
    fn unknown_command_byte_round_trips_through_catch_all() {
        let packet = Packet::decode(0x99, 0x00, vec![]).unwrap();
        assert_eq!(packet.command(), Command::Unknown(0x99));
        assert_eq!(packet.encode()[0], 0x99);
    }
}
