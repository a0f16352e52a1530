use std::io;
use thiserror::Error;

use crate::result_code::ResultCode;

/// The primary error type for the `rtno2-lib` library.
#[derive(Error, Debug)]
pub enum Rtno2Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("operation timed out")]
    Timeout,

    #[error("device reported an error")]
    Device,

    #[error("device reported result code {0:?}")]
    DeviceResult(ResultCode),

    #[error("checksum mismatch on received packet")]
    ChecksumError,

    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    #[error("payload length {actual} is not a multiple of element width {width}")]
    InvalidPayloadLength { actual: usize, width: usize },

    #[error("input port {0:?} not found in device profile")]
    InportNotFound(String),

    #[error("output port {0:?} not found in device profile")]
    OutportNotFound(String),

    #[error("exhausted {retries} retries without a usable reply")]
    RetriesExhausted { retries: u32 },
}

impl Rtno2Error {
    /// Maps a device-embedded `result` byte (from a `PACKET_ERROR` reply, or
    /// a timeout sub-kind surfaced by the transport) onto a typed error.
    pub fn from_result_code(code: ResultCode) -> Self {
        match code {
            // callers only reach here once they've already checked for OK
            ResultCode::Ok => Rtno2Error::Device,
            c if c.is_timeout() => Rtno2Error::Timeout,
            ResultCode::ChecksumError => Rtno2Error::ChecksumError,
            ResultCode::InportNotFound => Rtno2Error::InportNotFound(String::new()),
            ResultCode::OutportNotFound => Rtno2Error::OutportNotFound(String::new()),
            other => Rtno2Error::DeviceResult(other),
        }
    }
}
