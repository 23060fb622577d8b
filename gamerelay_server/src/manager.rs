// Session manager: the registry of live games.
//
// `SessionManager` owns the map from `GameId` to `Session`. It is the only
// thing that creates or removes sessions; `Session` itself handles member
// mutation and fan-out once created.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gamerelay_protocol::{GameId, RelayError};
use rand::Rng;

use crate::client::{Client, GameBinding};
use crate::session::{no_op_validator, Session};

const GAME_ID_MIN: u32 = 100_000;
const GAME_ID_MAX: u32 = 999_999;
const GAME_ID_MAX_ATTEMPTS: u32 = 16;

pub struct SessionManager {
    sessions: Mutex<HashMap<GameId, Arc<Session>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create a new session for `client`. Fails if the client is already
    /// bound to a session, or if a fresh `GameId` cannot be found within
    /// `GAME_ID_MAX_ATTEMPTS` collisions.
    pub fn create(&self, client: &Arc<Client>) -> Result<GameId, RelayError> {
        if client.game_id().is_some() {
            return Err(RelayError::InvalidCreateGameAttempt);
        }

        let mut sessions = self.sessions.lock().unwrap_or_else(|p| p.into_inner());
        let id = Self::fresh_game_id(&sessions)?;
        let session = Session::spawn(id.clone(), client.clone(), no_op_validator());
        Self::bind(client, &id, &session);
        sessions.insert(id.clone(), session);
        Ok(id)
    }

    /// Join an existing session. Fails if the client already has a session
    /// bound, or the session id is unknown.
    pub fn join(&self, client: &Arc<Client>, game_id: &GameId) -> Result<(), RelayError> {
        if client.game_id().is_some() {
            return Err(RelayError::InvalidGameJoinAttempt);
        }
        let sessions = self.sessions.lock().unwrap_or_else(|p| p.into_inner());
        let session = sessions.get(game_id).ok_or(RelayError::InvalidGameId)?;
        session.join(client.clone());
        Self::bind(client, game_id, session);
        Ok(())
    }

    /// `StartGame`: verifies the session exists. No further state transition
    /// in this version — a documented no-op hook for a future lobby state
    /// machine.
    pub fn start(&self, game_id: &GameId) -> Result<(), RelayError> {
        let sessions = self.sessions.lock().unwrap_or_else(|p| p.into_inner());
        if sessions.contains_key(game_id) {
            Ok(())
        } else {
            Err(RelayError::InvalidGameId)
        }
    }

    /// Remove `client` from its bound session. If that empties the session,
    /// the session's fan-out thread is stopped and it is removed from the
    /// registry. Returns an error if the client has no session bound, or if
    /// (inconsistently) its bound session no longer exists.
    pub fn leave(&self, client: &Arc<Client>) -> Result<(), RelayError> {
        let game_id = client.game_id().ok_or(RelayError::ClientNotInGame)?;
        let mut sessions = self.sessions.lock().unwrap_or_else(|p| p.into_inner());
        let session = sessions
            .get(&game_id)
            .cloned()
            .ok_or(RelayError::InvalidGameDisconnect)?;

        let emptied = session.leave(&client.id);
        *client.game.lock().unwrap_or_else(|p| p.into_inner()) = None;
        if emptied {
            session.stop();
            sessions.remove(&game_id);
        }
        Ok(())
    }

    fn bind(client: &Arc<Client>, game_id: &GameId, session: &Arc<Session>) {
        *client.game.lock().unwrap_or_else(|p| p.into_inner()) = Some(GameBinding {
            game_id: game_id.clone(),
            events: session.events(),
        });
    }

    fn fresh_game_id(existing: &HashMap<GameId, Arc<Session>>) -> Result<GameId, RelayError> {
        let mut rng = rand::thread_rng();
        for _ in 0..GAME_ID_MAX_ATTEMPTS {
            let candidate = GameId::from_numeric(rng.gen_range(GAME_ID_MIN..=GAME_ID_MAX));
            if !existing.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
        Err(RelayError::GameIdGeneration)
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamerelay_protocol::ClientId;
    use std::net::{TcpListener, TcpStream};

    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn make_client(id: u32) -> Arc<Client> {
        let (_peer, server) = tcp_pair();
        let addr = server.local_addr().unwrap();
        Arc::new(Client::new(ClientId::from_numeric(id), addr, server))
    }

    #[test]
    fn create_then_second_create_rejected() {
        let manager = SessionManager::new();
        let client = make_client(1);
        let game_id = manager.create(&client).unwrap();
        assert_eq!(client.game_id().as_ref(), Some(&game_id));

        let err = manager.create(&client).unwrap_err();
        assert_eq!(err, RelayError::InvalidCreateGameAttempt);
    }

    #[test]
    fn join_unknown_game_rejected() {
        let manager = SessionManager::new();
        let client = make_client(1);
        let err = manager
            .join(&client, &GameId::from_numeric(100000))
            .unwrap_err();
        assert_eq!(err, RelayError::InvalidGameId);
    }

    #[test]
    fn join_then_leave_removes_empty_session() {
        let manager = SessionManager::new();
        let host = make_client(1);
        let game_id = manager.create(&host).unwrap();

        let guest = make_client(2);
        manager.join(&guest, &game_id).unwrap();
        assert_eq!(guest.game_id().as_ref(), Some(&game_id));

        manager.leave(&guest).unwrap();
        assert!(guest.game_id().is_none());

        // Host leaving empties the session; a fresh create can reuse no
        // particular id but the session map no longer blocks anything.
        manager.leave(&host).unwrap();
        let err = manager.leave(&host).unwrap_err();
        assert_eq!(err, RelayError::ClientNotInGame);
    }

    #[test]
    fn start_requires_existing_game() {
        let manager = SessionManager::new();
        let err = manager.start(&GameId::from_numeric(100000)).unwrap_err();
        assert_eq!(err, RelayError::InvalidGameId);

        let host = make_client(1);
        let game_id = manager.create(&host).unwrap();
        manager.start(&game_id).unwrap();
    }
}
