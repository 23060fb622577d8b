// Session (game) state and fan-out.
//
// A `Session` is a transient group of clients sharing a `GameId`. Its member
// list is mutated by `join`/`leave` and iterated by its own fan-out thread;
// both happen under the session's single mutex so a join can never race a
// broadcast into an inconsistent member list. The fan-out thread is the
// session's only consumer of its inbound event channel.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;

use gamerelay_protocol::{ClientId, GameId, GameStateView, Packet, RelayError};

use crate::client::Client;

const SESSION_CHANNEL_CAPACITY: usize = 10;

/// Events delivered to a session's fan-out thread.
pub enum SessionEvent {
    GameState(Packet),
    Stop,
}

/// A predicate applied to every `GameState` packet before it is relayed.
/// Defaults to a no-op that accepts everything.
pub type Validator = Arc<dyn Fn(&Packet) -> Result<(), RelayError> + Send + Sync>;

pub fn no_op_validator() -> Validator {
    Arc::new(|_: &Packet| Ok(()))
}

pub struct Session {
    pub id: GameId,
    members: Mutex<Vec<Arc<Client>>>,
    events: SyncSender<SessionEvent>,
    validator: Validator,
}

impl Session {
    /// Create a session and spawn its fan-out thread. `creator` becomes the
    /// first member (index 0, the host).
    pub fn spawn(id: GameId, creator: Arc<Client>, validator: Validator) -> Arc<Self> {
        let (tx, rx) = mpsc::sync_channel(SESSION_CHANNEL_CAPACITY);
        let session = Arc::new(Self {
            id,
            members: Mutex::new(vec![creator]),
            events: tx,
            validator,
        });
        let fan_out = session.clone();
        thread::spawn(move || fan_out.run(rx));
        session
    }

    pub fn events(&self) -> SyncSender<SessionEvent> {
        self.events.clone()
    }

    pub fn join(&self, client: Arc<Client>) {
        self.members
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(client);
    }

    /// Remove a member by id. Returns true if the session is now empty.
    pub fn leave(&self, client_id: &ClientId) -> bool {
        let mut members = self.members.lock().unwrap_or_else(|p| p.into_inner());
        members.retain(|m| &m.id != client_id);
        members.is_empty()
    }

    pub fn member_count(&self) -> usize {
        self.members
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    pub fn stop(&self) {
        let _ = self.events.send(SessionEvent::Stop);
    }

    /// Fan-out loop: the session's sole consumer of its event channel. Holds
    /// the member-list mutex across both the validator check and the
    /// broadcast so a concurrent join/leave cannot observe a half-relayed
    /// packet.
    fn run(self: Arc<Self>, rx: Receiver<SessionEvent>) {
        while let Ok(event) = rx.recv() {
            match event {
                SessionEvent::GameState(packet) => {
                    let Ok(view) = GameStateView::parse(packet.payload()) else {
                        continue;
                    };
                    let Some(sender_id) = view.client_id() else {
                        continue;
                    };
                    if (self.validator)(&packet).is_err() {
                        continue;
                    }
                    let members = self.members.lock().unwrap_or_else(|p| p.into_inner());
                    for member in members.iter() {
                        if member.id == sender_id {
                            continue;
                        }
                        let _ = member.send(&packet);
                    }
                }
                SessionEvent::Stop => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamerelay_protocol::{Encoding, PacketType};
    use std::net::{TcpListener, TcpStream};

    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn make_client(id: u32) -> (Arc<Client>, TcpStream) {
        let (peer, server) = tcp_pair();
        let addr = server.local_addr().unwrap();
        (
            Arc::new(Client::new(ClientId::from_numeric(id), addr, server)),
            peer,
        )
    }

    fn game_state_packet(sender: &ClientId, data: &[u8]) -> Packet {
        let mut payload = vec![1u8, 0];
        payload.extend_from_slice(sender.as_bytes());
        payload.extend_from_slice(data);
        Packet::construct(Encoding::Bytes, PacketType::GAME_STATE, &payload).unwrap()
    }

    fn read_exact_packet(stream: &mut TcpStream) -> Packet {
        use std::io::Read;
        let mut header = [0u8; gamerelay_protocol::PACKET_HEADER_SIZE];
        stream.read_exact(&mut header).unwrap();
        let len = Packet::declared_payload_len(&header).unwrap();
        let mut full = header.to_vec();
        full.resize(full.len() + usize::from(len), 0);
        stream
            .read_exact(&mut full[gamerelay_protocol::PACKET_HEADER_SIZE..])
            .unwrap();
        Packet::decode(&full).unwrap()
    }

    #[test]
    fn fan_out_excludes_sender() {
        let (host, _host_peer) = make_client(1);
        let (guest, mut guest_peer) = make_client(2);
        let session = Session::spawn(GameId::from_numeric(123456), host.clone(), no_op_validator());
        session.join(guest);

        let packet = game_state_packet(&host.id, b"hello");
        session.events().send(SessionEvent::GameState(packet)).unwrap();

        let received = read_exact_packet(&mut guest_peer);
        assert_eq!(&received.payload()[10..], b"hello");
    }

    #[test]
    fn leave_reports_emptiness() {
        let (host, _p1) = make_client(1);
        let (guest, _p2) = make_client(2);
        let session = Session::spawn(GameId::from_numeric(111111), host.clone(), no_op_validator());
        session.join(guest.clone());

        assert!(!session.leave(&guest.id));
        assert!(session.leave(&host.id));
    }

    #[test]
    fn member_count_tracks_join_and_leave() {
        let (host, _p1) = make_client(1);
        let (guest, _p2) = make_client(2);
        let session = Session::spawn(GameId::from_numeric(333333), host.clone(), no_op_validator());
        assert_eq!(session.member_count(), 1);

        session.join(guest.clone());
        assert_eq!(session.member_count(), 2);

        session.leave(&guest.id);
        assert_eq!(session.member_count(), 1);
    }

    #[test]
    fn failing_validator_drops_packet_silently() {
        let (host, _host_peer) = make_client(1);
        let (guest, mut guest_peer) = make_client(2);
        let rejecting: Validator = Arc::new(|_: &Packet| Err(RelayError::InvalidGameState));
        let session = Session::spawn(GameId::from_numeric(222222), host.clone(), rejecting);
        session.join(guest);

        let packet = game_state_packet(&host.id, b"x");
        session.events().send(SessionEvent::GameState(packet)).unwrap();
        session.stop();

        guest_peer
            .set_read_timeout(Some(std::time::Duration::from_millis(100)))
            .unwrap();
        let mut buf = [0u8; 1];
        let result = std::io::Read::read(&mut guest_peer, &mut buf);
        assert!(matches!(result, Ok(0)) || result.is_err());
    }
}
