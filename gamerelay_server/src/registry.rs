// Client registry: the set of currently live, authenticated connections.
//
// Distinct from `SessionManager` — this tracks every connected client
// regardless of session membership, and is the source of fresh `ClientId`s.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gamerelay_protocol::ClientId;
use rand::Rng;

use crate::client::Client;

const CLIENT_ID_MAX_ATTEMPTS: u32 = 16;

pub struct Registry {
    clients: Mutex<HashMap<ClientId, Arc<Client>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, client: Arc<Client>) {
        self.clients
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(client.id.clone(), client);
    }

    pub fn remove(&self, id: &ClientId) {
        self.clients.lock().unwrap_or_else(|p| p.into_inner()).remove(id);
    }

    /// Draw a fresh, currently-unused `ClientId`. `None` if the id space
    /// couldn't be freed within the retry budget (treated by the caller as
    /// `RelayError::ClientIdGeneration`).
    pub fn generate_client_id(&self) -> Option<ClientId> {
        let clients = self.clients.lock().unwrap_or_else(|p| p.into_inner());
        let mut rng = rand::thread_rng();
        for _ in 0..CLIENT_ID_MAX_ATTEMPTS {
            let candidate = ClientId::from_numeric(rng.gen_range(0..100_000_000));
            if !clients.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Force-close every registered socket so workers blocked in a read wake
    /// up immediately instead of waiting out their own poll interval.
    pub fn shutdown_all(&self) {
        for client in self.clients.lock().unwrap_or_else(|p| p.into_inner()).values() {
            client.shutdown();
        }
    }

    pub fn len(&self) -> usize {
        self.clients.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
