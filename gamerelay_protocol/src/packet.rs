// Wire packet codec.
//
// A packet is a 4-byte header followed by its payload:
//   byte 0:    version (must be 1)
//   byte 1:    (encoding << 6) | (packet_type & 0x3F)
//   bytes 2-3: payload length, big-endian u16
//   bytes 4..: payload
//
// `Packet` owns the full framed byte buffer (header + payload) so that the
// session fan-out can re-emit the exact bytes it received without
// re-encoding.

use crate::error::RelayError;
use crate::types::{Encoding, PacketType};

pub const VERSION: u8 = 1;
pub const PACKET_HEADER_SIZE: usize = 4;
pub const PACKET_MAX_SIZE: usize = 1024;
pub const MAX_DATA_SIZE: usize = PACKET_MAX_SIZE - PACKET_HEADER_SIZE;

const ENC_TYPE_OFFSET: usize = 1;
const LENGTH_OFFSET: usize = 2;

/// A fully framed wire packet: header bytes plus payload, owned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    bytes: Vec<u8>,
}

impl Packet {
    /// Build a packet from its parts. Rejects oversized payloads.
    pub fn construct(
        encoding: Encoding,
        packet_type: PacketType,
        payload: &[u8],
    ) -> Result<Self, RelayError> {
        if payload.len() > MAX_DATA_SIZE {
            return Err(RelayError::PacketLengthMismatch);
        }
        #[expect(clippy::cast_possible_truncation)]
        let len = payload.len() as u16;
        let mut bytes = Vec::with_capacity(PACKET_HEADER_SIZE + payload.len());
        bytes.push(VERSION);
        bytes.push((encoding.bits() << 6) | (packet_type.0 & 0x3F));
        bytes.extend_from_slice(&len.to_be_bytes());
        bytes.extend_from_slice(payload);
        Ok(Self { bytes })
    }

    /// Decode a packet from a full, already-length-delimited byte slice
    /// (header + payload, exactly `PACKET_HEADER_SIZE + payload_len` bytes).
    /// Used by the framer once it has assembled a complete packet; also
    /// useful directly in tests.
    pub fn decode(bytes: &[u8]) -> Result<Self, RelayError> {
        if bytes.len() < PACKET_HEADER_SIZE {
            return Err(RelayError::PacketLengthMismatch);
        }
        if bytes[0] != VERSION {
            return Err(RelayError::VersionMismatch);
        }
        let declared_len = u16::from_be_bytes([bytes[LENGTH_OFFSET], bytes[LENGTH_OFFSET + 1]]);
        let full_len = usize::from(declared_len) + PACKET_HEADER_SIZE;
        if full_len >= PACKET_MAX_SIZE {
            return Err(RelayError::PacketLengthMismatch);
        }
        if bytes.len() != full_len {
            return Err(RelayError::PacketLengthMismatch);
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    pub fn encoding(&self) -> Encoding {
        Encoding::from_bits(self.bytes[ENC_TYPE_OFFSET] >> 6)
    }

    pub fn packet_type(&self) -> PacketType {
        PacketType(self.bytes[ENC_TYPE_OFFSET] & 0x3F)
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[PACKET_HEADER_SIZE..]
    }

    /// The full framed byte sequence (header + payload), as sent on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload length as declared in the header (bytes 2-3).
    pub fn declared_payload_len(header: &[u8]) -> Option<u16> {
        if header.len() < PACKET_HEADER_SIZE {
            return None;
        }
        Some(u16::from_be_bytes([
            header[LENGTH_OFFSET],
            header[LENGTH_OFFSET + 1],
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_then_decode_is_identity() {
        for enc_bits in 0u8..4 {
            for type_bits in 0u8..64 {
                for len in [0usize, 1, 17, MAX_DATA_SIZE] {
                    let payload = vec![0xAB; len];
                    let encoding = Encoding::from_bits(enc_bits);
                    let packet_type = PacketType(type_bits);
                    let packet = Packet::construct(encoding, packet_type, &payload).unwrap();
                    let decoded = Packet::decode(packet.as_bytes()).unwrap();
                    assert_eq!(decoded.encoding(), encoding);
                    assert_eq!(decoded.packet_type(), packet_type);
                    assert_eq!(decoded.payload(), payload.as_slice());
                }
            }
        }
    }

    #[test]
    fn construct_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_DATA_SIZE + 1];
        let err = Packet::construct(Encoding::Bytes, PacketType::AUTH, &payload).unwrap_err();
        assert_eq!(err, RelayError::PacketLengthMismatch);
    }

    #[test]
    fn decode_rejects_version_mismatch() {
        let mut bytes = Packet::construct(Encoding::Bytes, PacketType::AUTH, b"hi")
            .unwrap()
            .as_bytes()
            .to_vec();
        bytes[0] = 2;
        assert_eq!(Packet::decode(&bytes).unwrap_err(), RelayError::VersionMismatch);
    }

    #[test]
    fn decode_rejects_oversize_length() {
        // Header declaring a length that pushes the total to PACKET_MAX_SIZE.
        let mut header = vec![VERSION, 0, 0, 0];
        let oversize_len = (PACKET_MAX_SIZE - PACKET_HEADER_SIZE) as u16;
        header[LENGTH_OFFSET..].copy_from_slice(&oversize_len.to_be_bytes());
        header.extend(vec![0u8; oversize_len as usize]);
        assert_eq!(
            Packet::decode(&header).unwrap_err(),
            RelayError::PacketLengthMismatch
        );
    }
}
