// Parsing for the `GameState` packet payload.
//
// Layout (offsets into `Packet::payload()`, not the wire header):
//   byte 0:     version (currently 1)
//   byte 1:     substate tag
//   bytes 2-9:  embedded ClientId (8 ASCII digits)
//   bytes 10..: opaque command data
//
// The relay never interprets the data bytes — only the embedded ClientId,
// to confirm a sender isn't spoofing another client's id before forwarding.

use crate::error::RelayError;
use crate::types::ClientId;

pub const GS_VERSION: u8 = 1;

const VERSION_OFFSET: usize = 0;
const SUBSTATE_OFFSET: usize = 1;
const CLIENT_ID_OFFSET: usize = 2;
const DATA_OFFSET: usize = 10;

/// A parsed view over a `GameState` payload. Borrows from the packet.
pub struct GameStateView<'a> {
    payload: &'a [u8],
}

impl<'a> GameStateView<'a> {
    /// Parse a `GameState` payload. Rejects a payload shorter than the
    /// 10-byte fixed portion (version + substate + ClientId) — too short to
    /// safely slice the embedded ClientId.
    pub fn parse(payload: &'a [u8]) -> Result<Self, RelayError> {
        if payload.len() < DATA_OFFSET {
            return Err(RelayError::InvalidGameState);
        }
        Ok(Self { payload })
    }

    pub fn version(&self) -> u8 {
        self.payload[VERSION_OFFSET]
    }

    pub fn substate(&self) -> u8 {
        self.payload[SUBSTATE_OFFSET]
    }

    pub fn client_id(&self) -> Option<ClientId> {
        ClientId::from_wire_bytes(&self.payload[CLIENT_ID_OFFSET..DATA_OFFSET])
    }

    pub fn data(&self) -> &'a [u8] {
        &self.payload[DATA_OFFSET..]
    }
}
