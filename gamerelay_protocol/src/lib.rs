// gamerelay_protocol — wire protocol for the session relay server.
//
// This crate defines the binary packet format, the stateful byte-to-packet
// framer, the `GameState` payload layout, and the error taxonomy shared
// between the relay server (`gamerelay_server`) and any client implementation.
// It has no dependency on the relay's session/connection machinery.
//
// Module overview:
// - `types.rs`:     `ClientId`, `GameId`, `Encoding`, `PacketType`.
// - `packet.rs`:     The 4-byte header codec — `Packet::construct`/`decode`.
// - `framing.rs`:    `Framer`, the stateful reassembler for arbitrary reads.
// - `gamestate.rs`:  Parsing for the `GameState` packet payload.
// - `error.rs`:      `RelayError` and its wire JSON shape.
//
// Design decisions:
// - **Binary, length-prefixed packets**, not JSON framing — the wire format
//   is a fixed 4-byte header (version, bit-packed encoding+type, u16 length)
//   that callers encode payloads against with whichever `Encoding` they
//   declare; the framer and codec never parse the payload itself.
// - **`PacketType` is an open newtype**, not a closed enum — an unrecognized
//   wire value must still decode and reach dispatch, where it is logged and
//   ignored rather than rejected.
// - **No async runtime.** The framer only needs `std::io::Read`; callers
//   choose how they drive it (dedicated reader thread or inline).

pub mod error;
pub mod framing;
pub mod gamestate;
pub mod packet;
pub mod types;

pub use error::RelayError;
pub use framing::Framer;
pub use gamestate::GameStateView;
pub use packet::{Packet, MAX_DATA_SIZE, PACKET_HEADER_SIZE, PACKET_MAX_SIZE, VERSION};
pub use types::{ClientId, Encoding, GameId, PacketType};
