// Per-connection client record.
//
// A `Client` is created once the handshake completes (the connection enters
// LIVE) and lives until the connection tears down. It owns the single write
// sink for its socket, mutex-guarded so dispatch replies and session fan-out
// can never interleave bytes from different threads. `game` tracks at most
// one session binding at a time.

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc::SyncSender;
use std::sync::Mutex;

use gamerelay_protocol::{ClientId, Encoding, GameId, Packet, PacketType, RelayError};

use crate::session::SessionEvent;

/// A client's binding to a session: its id and the inbound sender for that
/// session's fan-out thread.
#[derive(Clone)]
pub struct GameBinding {
    pub game_id: GameId,
    pub events: SyncSender<SessionEvent>,
}

pub struct Client {
    pub id: ClientId,
    pub addr: SocketAddr,
    writer: Mutex<std::io::BufWriter<TcpStream>>,
    pub game: Mutex<Option<GameBinding>>,
}

impl Client {
    pub fn new(id: ClientId, addr: SocketAddr, stream: TcpStream) -> Self {
        Self {
            id,
            addr,
            writer: Mutex::new(std::io::BufWriter::new(stream)),
            game: Mutex::new(None),
        }
    }

    /// Write a full framed packet to this client's socket and flush. A write
    /// error (broken pipe, etc.) is returned to the caller, which owns the
    /// decision to tear the connection down.
    pub fn send(&self, packet: &Packet) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        writer.write_all(packet.as_bytes())?;
        writer.flush()
    }

    pub fn send_error(&self, err: &RelayError) -> std::io::Result<()> {
        let packet = Packet::construct(Encoding::String, PacketType::ERROR, &err.to_wire_json())
            .expect("wire error body is well under MAX_DATA_SIZE");
        self.send(&packet)
    }

    pub fn game_id(&self) -> Option<GameId> {
        self.game
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .map(|b| b.game_id.clone())
    }

    /// Force-close the underlying socket so a thread blocked in a read wakes
    /// up immediately. Used by shutdown to avoid waiting out a worker's own
    /// poll interval.
    pub fn shutdown(&self) {
        if let Ok(writer) = self.writer.lock() {
            let _ = writer.get_ref().shutdown(std::net::Shutdown::Both);
        }
    }
}
