//! Wire-level command codes shared by the host and the device.
//!
//! Numeric assignments are dense and ordered the way spec §6 lists the
//! command set; see DESIGN.md for why (the original command/result headers
//! were not present in the retrieved source pack).

use num_enum::{FromPrimitive, IntoPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum Command {
    GetState = 0x01,
    GetContextType = 0x02,

    Activate = 0x10,
    Deactivate = 0x11,
    Execute = 0x12,

    SendData = 0x20,
    ReceiveData = 0x21,
    ReceiveLog = 0x22,

    GetProfile = 0x30,
    PlatformProfile = 0x31,
    InportProfile = 0x32,
    OutportProfile = 0x33,

    PacketError = 0xF0,
    PacketErrorChecksum = 0xF1,
    PacketErrorTimeout = 0xF2,

    HeartBeat = 0xFE,

    #[num_enum(catch_all)]
    Unknown(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_command_matches_scenario_bytes() {
        let cmd: u8 = Command::GetState.into();
        assert_eq!(cmd, 0x01);
    }

    #[test]
    fn heart_beat_matches_scenario_bytes() {
        let cmd: u8 = Command::HeartBeat.into();
        assert_eq!(cmd, 0xFE);
    }

    #[test]
    fn activate_matches_scenario_bytes() {
        let cmd: u8 = Command::Activate.into();
        assert_eq!(cmd, 0x10);
    }

    #[test]
    fn unrecognized_byte_falls_back_to_catch_all() {
        assert_eq!(Command::from(0x99), Command::Unknown(0x99));
    }
}
