//! Host-side driver for the rtno2 framed serial/TCP component protocol.
//!
//! Three layers, leaves first: a framing [`packet`] codec, a [`transport`]
//! that manages start-sentinel resync and per-phase timeouts, and a
//! [`protocol`] that layers request/reply retry, recovery, and profile
//! discovery on top. [`channel`] is the `ByteChannel` capability the
//! transport consumes from its hardware collaborators.

pub mod channel;
pub mod codec;
pub mod command;
pub mod constants;
pub mod error;
pub mod packet;
pub mod profile;
pub mod protocol;
pub mod result_code;
pub mod transport;

pub use channel::ByteChannel;
pub use codec::PortValue;
pub use command::Command;
pub use error::Rtno2Error;
pub use packet::Packet;
pub use profile::{Architecture, ComponentState, ExecutionContextType, PortProfile, Profile, TypeCode};
pub use protocol::Protocol;
pub use result_code::ResultCode;
pub use transport::{Deadline, Transport, TransportError};
