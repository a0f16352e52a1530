//! The device's self-description: architecture, execution context, and the
//! named, typed in/out ports that make up its profile.

use num_enum::{FromPrimitive, IntoPrimitive};

use crate::error::Rtno2Error;

/// Target microcontroller architecture, as advertised by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum Architecture {
    Avr = 1,
    Arm = 2,
    Esp32 = 3,
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl Default for Architecture {
    fn default() -> Self {
        Architecture::Unknown(255)
    }
}

/// The device-side scheduler mode that advances the component's step
/// function. Descriptive only; the host treats every mode uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum ExecutionContextType {
    MainLoop = 1,
    ProxySynchronous = 2,
    FspTimer = 3,
    TimerOne = 4,
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl Default for ExecutionContextType {
    fn default() -> Self {
        ExecutionContextType::Unknown(127)
    }
}

/// One of {created, inactive, active, error}; the host never fabricates
/// this, it only reads what the device reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum ComponentState {
    Created = 0,
    Inactive = 1,
    Active = 2,
    Error = 3,
    #[num_enum(catch_all)]
    Unknown(u8),
}

/// Identifies the primitive or sequence-of-primitive element type behind a
/// named port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum TypeCode {
    Bool = 1,
    Char = 2,
    U8 = 3,
    I32 = 4,
    F32 = 5,
    F64 = 6,
    BoolSeq = 0x81,
    CharSeq = 0x82,
    U8Seq = 0x83,
    I32Seq = 0x84,
    F32Seq = 0x85,
    F64Seq = 0x86,
    #[num_enum(catch_all)]
    Unknown(u8),
}

/// A single named, typed port on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortProfile {
    pub type_code: TypeCode,
    pub name: String,
}

/// The device's advertised capability set: architecture plus typed in/out
/// ports, assembled by [`crate::protocol::Protocol::get_profile`].
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub architecture: Architecture,
    pub in_ports: Vec<PortProfile>,
    pub out_ports: Vec<PortProfile>,
}

impl Profile {
    pub fn inport(&self, name: &str) -> Result<&PortProfile, Rtno2Error> {
        self.in_ports
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Rtno2Error::InportNotFound(name.to_string()))
    }

    pub fn outport(&self, name: &str) -> Result<&PortProfile, Rtno2Error> {
        self.out_ports
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Rtno2Error::OutportNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inport_lookup_fails_with_typed_not_found() {
        let profile = Profile::default();
        assert!(matches!(
            profile.inport("missing"),
            Err(Rtno2Error::InportNotFound(name)) if name == "missing"
        ));
    }

    #[test]
    fn outport_lookup_finds_matching_name() {
        let mut profile = Profile::default();
        profile.out_ports.push(PortProfile {
            type_code: TypeCode::I32,
            name: "long_out".to_string(),
        });
        assert_eq!(profile.outport("long_out").unwrap().type_code, TypeCode::I32);
    }
}
