// Core identifier and header types for the relay wire protocol.
//
// `ClientId` and `GameId` are fixed-width ASCII-digit strings assigned by the
// server (never by the client). `Encoding` and `PacketType` together make up
// the bit-packed second header byte: 2 bits of encoding, 6 bits of type.

use std::fmt;

/// 8-character zero-padded decimal client identifier, assigned at handshake.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(String);

impl ClientId {
    pub const LEN: usize = 8;

    /// Build a `ClientId` from a raw numeric value, zero-padded to 8 digits.
    /// `value` must fit in 8 decimal digits (< 100_000_000).
    pub fn from_numeric(value: u32) -> Self {
        debug_assert!(value < 100_000_000);
        Self(format!("{value:08}"))
    }

    /// Parse a `ClientId` from its wire representation (exactly 8 ASCII digits).
    pub fn from_wire_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::LEN || !bytes.iter().all(u8::is_ascii_digit) {
            return None;
        }
        Some(Self(String::from_utf8(bytes.to_vec()).ok()?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 6-character decimal game (session) identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameId(String);

impl GameId {
    pub const LEN: usize = 6;

    /// Build a `GameId` from a raw numeric value in `[100_000, 999_999]`.
    pub fn from_numeric(value: u32) -> Self {
        debug_assert!((100_000..=999_999).contains(&value));
        Self(value.to_string())
    }

    /// Parse a `GameId` from its wire representation (exactly 6 ASCII digits).
    pub fn from_wire_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::LEN || !bytes.iter().all(u8::is_ascii_digit) {
            return None;
        }
        Some(Self(String::from_utf8(bytes.to_vec()).ok()?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload encoding, bit-packed into the top 2 bits of header byte 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Encoding {
    Custom = 0,
    Json = 1,
    String = 2,
    Bytes = 3,
}

impl Encoding {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Self::Custom,
            1 => Self::Json,
            2 => Self::String,
            _ => Self::Bytes,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Packet type, packed into the low 6 bits of header byte 1.
///
/// Modeled as a newtype over `u8` rather than a closed enum: an unrecognized
/// wire value must still round-trip through the codec and reach dispatch,
/// where it is logged and ignored rather than rejected by the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PacketType(pub u8);

impl PacketType {
    pub const AUTH: Self = Self(0);
    pub const HEALTH_CHECK_REQ: Self = Self(1);
    pub const HEALTH_CHECK_RES: Self = Self(2);
    pub const ERROR: Self = Self(3);
    pub const CREATE_GAME: Self = Self(4);
    pub const CREATE_GAME_SUCCESS: Self = Self(5);
    pub const JOIN_GAME: Self = Self(6);
    pub const JOIN_GAME_SUCCESS: Self = Self(7);
    pub const START_GAME: Self = Self(8);
    pub const LEAVE_GAME: Self = Self(9);
    pub const LEAVE_GAME_SUCCESS: Self = Self(10);
    pub const GAME_STATE: Self = Self(11);
    pub const DISCONNECT: Self = Self(12);

    /// A short name for logging; unknown types print their raw value.
    pub fn name(self) -> String {
        match self {
            Self::AUTH => "Auth".into(),
            Self::HEALTH_CHECK_REQ => "HealthCheckReq".into(),
            Self::HEALTH_CHECK_RES => "HealthCheckRes".into(),
            Self::ERROR => "Error".into(),
            Self::CREATE_GAME => "CreateGame".into(),
            Self::CREATE_GAME_SUCCESS => "CreateGameSuccess".into(),
            Self::JOIN_GAME => "JoinGame".into(),
            Self::JOIN_GAME_SUCCESS => "JoinGameSuccess".into(),
            Self::START_GAME => "StartGame".into(),
            Self::LEAVE_GAME => "LeaveGame".into(),
            Self::LEAVE_GAME_SUCCESS => "LeaveGameSuccess".into(),
            Self::GAME_STATE => "GameState".into(),
            Self::DISCONNECT => "Disconnect".into(),
            Self(other) => format!("Unknown({other})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_roundtrips_through_wire_bytes() {
        let id = ClientId::from_numeric(42);
        assert_eq!(id.as_str(), "00000042");
        let parsed = ClientId::from_wire_bytes(id.as_bytes()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn client_id_rejects_wrong_length_or_non_digits() {
        assert!(ClientId::from_wire_bytes(b"1234567").is_none());
        assert!(ClientId::from_wire_bytes(b"abcdefgh").is_none());
    }

    #[test]
    fn game_id_roundtrips() {
        let id = GameId::from_numeric(123456);
        assert_eq!(id.as_str(), "123456");
        assert_eq!(GameId::from_wire_bytes(b"123456"), Some(id));
    }

    #[test]
    fn encoding_bits_roundtrip() {
        for bits in 0..4u8 {
            assert_eq!(Encoding::from_bits(bits).bits(), bits);
        }
    }

    #[test]
    fn packet_type_name_for_unknown() {
        assert_eq!(PacketType(63).name(), "Unknown(63)");
    }
}
