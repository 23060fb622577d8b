// gamerelay_server — session relay coordinator.
//
// Accepts TCP connections, runs a challenge-echo handshake that assigns each
// client a `ClientId`, groups authenticated clients into transient "games"
// (sessions) keyed by `GameId`, and relays `GameState` packets between
// members of the same session. It never interprets in-game data.
//
// Module overview:
// - `client.rs`:     `Client` — per-connection record, the single write sink.
// - `session.rs`:    `Session` — a game's member list and fan-out thread.
// - `manager.rs`:    `SessionManager` — the registry of live games.
// - `registry.rs`:   `Registry` — the registry of live connections, source of
//                    fresh `ClientId`s.
// - `connection.rs`: per-connection handshake and combined read/dispatch loop.
// - `dispatch.rs`:   binds `PacketType` to handler behavior.
// - `server.rs`:     TCP listener and process-wide shutdown control.
//
// Dependencies: `gamerelay_protocol` (wire format, framing, error taxonomy).
//
// The relay can run as a standalone binary (`main.rs`) or be embedded via
// the library API (`start_relay`).

pub mod client;
pub mod connection;
pub mod dispatch;
pub mod manager;
pub mod registry;
pub mod server;
pub mod session;

pub use server::{start_relay, RelayConfig, RelayHandle};
