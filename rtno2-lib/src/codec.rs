//! The value codec: maps primitive port values and homogeneous sequences of
//! them to/from raw payload bytes.
//!
//! One trait, [`PortValue`], with a per-primitive-type implementation —
//! the re-architecture the teacher's own `Attribute`/`PacketType` enums
//! don't need but this protocol's typed ports do.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::Rtno2Error;

/// A primitive type that can sit behind a named device port.
pub trait PortValue: Sized + Copy {
    /// The width used both on the wire and when chunking a sequence.
    const WIDTH: usize;

    fn encode(&self) -> Vec<u8>;
    fn decode(bytes: &[u8]) -> Result<Self, Rtno2Error>;

    fn encode_seq(values: &[Self]) -> Vec<u8> {
        values.iter().flat_map(|v| v.encode()).collect()
    }

    fn decode_seq(bytes: &[u8]) -> Result<Vec<Self>, Rtno2Error> {
        if bytes.len() % Self::WIDTH != 0 {
            return Err(Rtno2Error::InvalidPayloadLength {
                actual: bytes.len(),
                width: Self::WIDTH,
            });
        }
        bytes.chunks(Self::WIDTH).map(Self::decode).collect()
    }
}

fn require_len(bytes: &[u8], expected: usize) -> Result<(), Rtno2Error> {
    if bytes.len() != expected {
        return Err(Rtno2Error::InvalidPayloadLength {
            actual: bytes.len(),
            width: expected,
        });
    }
    Ok(())
}

impl PortValue for bool {
    const WIDTH: usize = 1;

    fn encode(&self) -> Vec<u8> {
        vec![if *self { 1 } else { 0 }]
    }

    fn decode(bytes: &[u8]) -> Result<Self, Rtno2Error> {
        require_len(bytes, 1)?;
        Ok(bytes[0] != 0)
    }
}

/// The device's `char` is a raw single byte (spec.md §4.1), not a Unicode
/// scalar value. `encode` truncates to the low byte; `decode` widens that
/// byte back to a `char` via its Latin-1 codepoint, so every byte value is
/// representable and the mapping is total in both directions.
impl PortValue for char {
    const WIDTH: usize = 1;

    fn encode(&self) -> Vec<u8> {
        vec![*self as u8]
    }

    fn decode(bytes: &[u8]) -> Result<Self, Rtno2Error> {
        require_len(bytes, 1)?;
        Ok(bytes[0] as char)
    }
}

impl PortValue for u8 {
    const WIDTH: usize = 1;

    fn encode(&self) -> Vec<u8> {
        vec![*self]
    }

    fn decode(bytes: &[u8]) -> Result<Self, Rtno2Error> {
        require_len(bytes, 1)?;
        Ok(bytes[0])
    }
}

impl PortValue for i32 {
    const WIDTH: usize = 4;

    fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; 4];
        LittleEndian::write_i32(&mut out, *self);
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, Rtno2Error> {
        require_len(bytes, 4)?;
        Ok(LittleEndian::read_i32(bytes))
    }
}

impl PortValue for f32 {
    const WIDTH: usize = 4;

    fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; 4];
        LittleEndian::write_f32(&mut out, *self);
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, Rtno2Error> {
        require_len(bytes, 4)?;
        Ok(LittleEndian::read_f32(bytes))
    }
}

/// `f64` is narrowed to `f32` on send, since the device has no 64-bit float
/// support, and conditionally widened on receive: a 4-byte payload is
/// decoded as `f32` and widened, any other length as a genuine `f64`.
///
/// [`PortValue::WIDTH`] is `4` (the narrowed wire form); sequences of `f64`
/// are therefore packed as narrowed `f32` elements too, matching the
/// device's lack of genuine double support at the element level.
impl PortValue for f64 {
    const WIDTH: usize = 4;

    fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; 4];
        LittleEndian::write_f32(&mut out, *self as f32);
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, Rtno2Error> {
        if bytes.len() == 4 {
            Ok(LittleEndian::read_f32(bytes) as f64)
        } else if bytes.len() == 8 {
            Ok(LittleEndian::read_f64(bytes))
        } else {
            Err(Rtno2Error::InvalidPayloadLength {
                actual: bytes.len(),
                width: 4,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_round_trips() {
        assert!(bool::decode(&true.encode()).unwrap());
        assert!(!bool::decode(&false.encode()).unwrap());
    }

    #[test]
    fn char_round_trips_ascii_value() {
        assert_eq!(char::decode(&'Q'.encode()).unwrap(), 'Q');
    }

    #[test]
    fn char_decode_accepts_every_byte_value() {
        for byte in 0u8..=255 {
            assert_eq!(char::decode(&[byte]).unwrap() as u32, byte as u32);
        }
    }

    #[test]
    fn i32_round_trips_negative_values() {
        let v: i32 = -3;
        assert_eq!(i32::decode(&v.encode()).unwrap(), -3);
    }

    #[test]
    fn f64_narrows_to_four_bytes_on_encode() {
        // spec scenario 6: f64 3.0 leaves the wire as 00 00 40 40
        let bytes = 3.0f64.encode();
        assert_eq!(bytes, vec![0x00, 0x00, 0x40, 0x40]);
    }

    #[test]
    fn f64_decode_widens_four_byte_payload() {
        let bytes = [0x00, 0x00, 0x40, 0x40];
        assert_eq!(f64::decode(&bytes).unwrap(), 3.0);
    }

    #[test]
    fn f64_decode_reads_genuine_eight_byte_double() {
        let mut bytes = [0u8; 8];
        LittleEndian::write_f64(&mut bytes, 3.5);
        assert_eq!(f64::decode(&bytes).unwrap(), 3.5);
    }

    #[test]
    fn decode_seq_rejects_length_not_a_multiple_of_width() {
        let bytes = [0u8; 3];
        assert!(i32::decode_seq(&bytes).is_err());
    }

    #[test]
    fn i32_seq_round_trips() {
        let values = vec![1, -2, 3];
        let encoded = i32::encode_seq(&values);
        assert_eq!(i32::decode_seq(&encoded).unwrap(), values);
    }
}
