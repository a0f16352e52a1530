//! Wire-level result codes embedded in a packet's `result` byte.

use num_enum::{FromPrimitive, IntoPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum ResultCode {
    Ok = 0x00,
    Err = 0x01,
    Timeout = 0x02,
    PacketStartTimeout = 0x03,
    PacketHeaderTimeout = 0x04,
    PacketBodyTimeout = 0x05,
    PacketChecksumTimeout = 0x06,
    ChecksumError = 0x07,
    InportNotFound = 0x08,
    OutportNotFound = 0x09,
    LogDataExceedSize = 0x0A,

    #[num_enum(catch_all)]
    Unknown(u8),
}

impl ResultCode {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ResultCode::Timeout
                | ResultCode::PacketStartTimeout
                | ResultCode::PacketHeaderTimeout
                | ResultCode::PacketBodyTimeout
                | ResultCode::PacketChecksumTimeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_matches_scenario_bytes() {
        let r: u8 = ResultCode::Ok.into();
        assert_eq!(r, 0);
    }

    #[test]
    fn timeout_variants_report_is_timeout() {
        assert!(ResultCode::PacketHeaderTimeout.is_timeout());
        assert!(!ResultCode::ChecksumError.is_timeout());
    }
}
