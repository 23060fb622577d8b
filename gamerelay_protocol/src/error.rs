// Error taxonomy and wire shaping.
//
// Every `RelayError` carries a fixed wire code and short name (see the table
// below); `RelayError::to_wire_json` produces the `{code, error, message}`
// body that dispatch wraps in an `Error`-typed packet. Framer-level errors
// (`VersionMismatch`, `PacketLengthMismatch`) are fatal to the connection;
// everything else is a normal handler-level reply.

use serde::Serialize;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("version mismatch")]
    VersionMismatch,
    #[error("packet length mismatch")]
    PacketLengthMismatch,
    #[error("failed to generate client id")]
    ClientIdGeneration,
    #[error("failed to generate game id")]
    GameIdGeneration,
    #[error("no handler registered")]
    NoHandlerRegistered,
    #[error("server timed out")]
    ServerTimeout,
    #[error("invalid authentication packet")]
    InvalidAuthPkt,
    #[error("invalid authentication attempt")]
    InvalidAuthId,
    #[error("authentication timed out")]
    AuthTimeout,
    #[error("invalid game id")]
    InvalidGameId,
    #[error("cannot join while in a game")]
    InvalidGameJoinAttempt,
    #[error("disconnect from nonexistent game")]
    InvalidGameDisconnect,
    #[error("client not in any game")]
    ClientNotInGame,
    #[error("cannot create while in a game")]
    InvalidCreateGameAttempt,
    #[error("invalid game state")]
    InvalidGameState,
}

impl RelayError {
    pub fn code(&self) -> u16 {
        match self {
            Self::VersionMismatch | Self::PacketLengthMismatch => 400,
            Self::ClientIdGeneration | Self::GameIdGeneration => 500,
            Self::NoHandlerRegistered => 404,
            Self::ServerTimeout => 504,
            Self::InvalidAuthPkt => 401,
            Self::InvalidAuthId => 403,
            Self::AuthTimeout => 408,
            Self::InvalidGameId => 400,
            Self::InvalidGameJoinAttempt => 403,
            Self::InvalidGameDisconnect => 400,
            Self::ClientNotInGame => 403,
            Self::InvalidCreateGameAttempt => 403,
            Self::InvalidGameState => 400,
        }
    }

    pub fn short(&self) -> &'static str {
        match self {
            Self::VersionMismatch => "Version mismatch",
            Self::PacketLengthMismatch => "Packet length mismatch",
            Self::ClientIdGeneration => "Failed to generate client id",
            Self::GameIdGeneration => "Failed to generate game id",
            Self::NoHandlerRegistered => "No handler registered",
            Self::ServerTimeout => "Server timed out",
            Self::InvalidAuthPkt => "Invalid authentication packet",
            Self::InvalidAuthId => "Invalid authentication attempt",
            Self::AuthTimeout => "Authentication timed out",
            Self::InvalidGameId => "Invalid game ID",
            Self::InvalidGameJoinAttempt => "Cannot join while in a game",
            Self::InvalidGameDisconnect => "Disconnect from nonexistent game",
            Self::ClientNotInGame => "Client not in any game",
            Self::InvalidCreateGameAttempt => "Cannot create while in a game",
            Self::InvalidGameState => "Invalid game state",
        }
    }

    /// Whether this error is fatal to the connection (framer-level) rather
    /// than a normal handler-level reply.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::VersionMismatch | Self::PacketLengthMismatch)
    }

    pub fn to_wire_json(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct WireError<'a> {
            code: u16,
            error: &'a str,
            message: String,
        }
        let body = WireError {
            code: self.code(),
            error: self.short(),
            message: self.to_string(),
        };
        // Construction from a fixed, always-serializable struct; failure here
        // would be a bug in `WireError`, not a runtime condition.
        serde_json::to_vec(&body).expect("wire error body is always serializable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_json_has_expected_shape() {
        let json = RelayError::InvalidGameId.to_wire_json();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["code"], 400);
        assert_eq!(value["error"], "Invalid game ID");
    }

    #[test]
    fn fatal_errors_are_framer_errors() {
        assert!(RelayError::VersionMismatch.is_fatal());
        assert!(RelayError::PacketLengthMismatch.is_fatal());
        assert!(!RelayError::InvalidGameId.is_fatal());
    }
}
