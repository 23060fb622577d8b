// Packet dispatch: binds `PacketType` to handler behavior.
//
// `Disconnect` is special-cased before the generic lookup (it drives a state
// transition on the connection worker, not just a reply) — the same shape as
// the teacher's reader loop special-casing Hello/Goodbye outside its generic
// message dispatch. Every other type is either bound in the table below or,
// if unrecognized, logged and ignored.

use std::sync::Arc;

use gamerelay_protocol::{ClientId, Encoding, GameId, GameStateView, Packet, PacketType, RelayError};
use tracing::warn;

use crate::client::Client;
use crate::manager::SessionManager;
use crate::session::SessionEvent;

/// Outcome of dispatching one packet: whether the connection worker should
/// keep running or begin draining.
pub enum Outcome {
    Continue,
    Drain,
}

pub fn dispatch(client: &Arc<Client>, manager: &SessionManager, packet: Packet) -> Outcome {
    if packet.packet_type() == PacketType::DISCONNECT {
        let _ = manager.leave(client);
        return Outcome::Drain;
    }

    let result = match packet.packet_type() {
        PacketType::HEALTH_CHECK_REQ => health_check(client),
        PacketType::CREATE_GAME => create_game(client, manager),
        PacketType::JOIN_GAME => join_game(client, manager, packet.payload()),
        PacketType::START_GAME => start_game(client, manager, packet.payload()),
        PacketType::LEAVE_GAME => leave_game(client, manager),
        PacketType::GAME_STATE => game_state(client, packet),
        other => {
            warn!(packet_type = %other.name(), client = %client.id, "no handler registered");
            return Outcome::Continue;
        }
    };

    if let Err(err) = result {
        let _ = client.send_error(&err);
    }
    Outcome::Continue
}

fn health_check(client: &Arc<Client>) -> Result<(), RelayError> {
    let packet = Packet::construct(Encoding::String, PacketType::HEALTH_CHECK_RES, b"Im alive :D")
        .expect("fixed literal payload is well under MAX_DATA_SIZE");
    client.send(&packet).map_err(|_| RelayError::ServerTimeout)
}

fn create_game(client: &Arc<Client>, manager: &SessionManager) -> Result<(), RelayError> {
    let game_id = manager.create(client)?;
    let reply = Packet::construct(
        Encoding::String,
        PacketType::CREATE_GAME_SUCCESS,
        game_id.as_bytes(),
    )
    .expect("GameId is fixed-width and well under MAX_DATA_SIZE");
    client.send(&reply).map_err(|_| RelayError::ServerTimeout)
}

fn join_game(client: &Arc<Client>, manager: &SessionManager, payload: &[u8]) -> Result<(), RelayError> {
    let game_id = GameId::from_wire_bytes(payload).ok_or(RelayError::InvalidGameId)?;
    manager.join(client, &game_id)?;
    let reply = Packet::construct(Encoding::String, PacketType::JOIN_GAME_SUCCESS, game_id.as_bytes())
        .expect("GameId is fixed-width and well under MAX_DATA_SIZE");
    client.send(&reply).map_err(|_| RelayError::ServerTimeout)
}

fn start_game(client: &Arc<Client>, manager: &SessionManager, payload: &[u8]) -> Result<(), RelayError> {
    let game_id = GameId::from_wire_bytes(payload).ok_or(RelayError::InvalidGameId)?;
    manager.start(&game_id)?;
    let _ = client;
    Ok(())
}

fn leave_game(client: &Arc<Client>, manager: &SessionManager) -> Result<(), RelayError> {
    manager.leave(client)?;
    let reply = Packet::construct(Encoding::String, PacketType::LEAVE_GAME_SUCCESS, b"")
        .expect("empty payload always fits");
    client.send(&reply).map_err(|_| RelayError::ServerTimeout)
}

fn game_state(client: &Arc<Client>, packet: Packet) -> Result<(), RelayError> {
    let view = GameStateView::parse(packet.payload())?;
    let embedded: Option<ClientId> = view.client_id();
    if embedded.as_ref() != Some(&client.id) {
        return Err(RelayError::InvalidAuthId);
    }
    let binding = client
        .game
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .clone()
        .ok_or(RelayError::ClientNotInGame)?;
    // Back-pressure: block the dispatch thread if the session's queue is
    // full, rather than dropping the packet or disconnecting the sender.
    binding
        .events
        .send(SessionEvent::GameState(packet))
        .map_err(|_| RelayError::ClientNotInGame)
}
