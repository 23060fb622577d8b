// Per-connection worker: handshake, then combined read-driver + dispatch.
//
// State machine: NEW -> AUTH_CHAL -> LIVE, with AUTH_CHAL -> DROPPED on
// timeout, a wrong packet type, or an echoed payload that doesn't match the
// challenge (silent, no reply — the peer isn't trusted yet) and LIVE ->
// DRAINING on Disconnect, a fatal framer error, or process shutdown.
//
// The handshake is server-speaks-first: the server assigns a `ClientId`,
// sends it as an Auth challenge, and the peer must echo the identical bytes
// back in an Auth packet within the timeout. The assigned id is reserved in
// the registry before the challenge is sent and released again if the echo
// never arrives or doesn't match, so a slow/dead peer can't squat an id.
//
// The read driver and the dispatch loop run on the same thread: a single
// connection's packets are processed in arrival order regardless, so a
// second thread would only add complexity. The socket's read timeout serves
// two purposes — a 5s deadline during the handshake, and a 250ms poll
// interval during LIVE so the worker can notice the shutdown flag between
// reads without a dedicated signal.

use std::io::Read;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gamerelay_protocol::{ClientId, Encoding, Framer, Packet, PacketType};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::dispatch::{self, Outcome};
use crate::manager::SessionManager;
use crate::registry::Registry;

const AUTH_TIMEOUT: Duration = Duration::from_secs(5);
const LIVE_POLL_INTERVAL: Duration = Duration::from_millis(250);
const READ_CHUNK: usize = 512;

/// Run a single connection to completion. Blocking; intended to be called on
/// its own thread by the acceptor.
pub fn run(
    stream: TcpStream,
    registry: Arc<Registry>,
    manager: Arc<SessionManager>,
    running: Arc<AtomicBool>,
) {
    let Ok(addr) = stream.peer_addr() else {
        return;
    };
    let Ok(mut reader) = stream.try_clone() else {
        return;
    };

    let Some(client) = handshake(stream, &mut reader, addr, &registry) else {
        return;
    };

    info!(client = %client.id, %addr, "client authenticated");
    live_loop(&client, reader, &manager, &running);

    let _ = manager.leave(&client);
    registry.remove(&client.id);
    client.shutdown();
    info!(client = %client.id, "connection closed");
}

/// NEW -> AUTH_CHAL -> LIVE. The server sends the Auth challenge first;
/// returns `None` (AUTH_CHAL -> DROPPED) on timeout, a read error, or a
/// reply that isn't `Auth` with the identical challenge payload — no reply
/// is sent to the peer in any of those cases, and the reserved `ClientId` is
/// released back to the registry.
fn handshake(
    stream: TcpStream,
    reader: &mut TcpStream,
    addr: SocketAddr,
    registry: &Registry,
) -> Option<Arc<Client>> {
    reader.set_read_timeout(Some(AUTH_TIMEOUT)).ok();

    let client_id = registry.generate_client_id()?;
    let client = Arc::new(Client::new(client_id.clone(), addr, stream));
    registry.insert(client.clone());

    if await_challenge_echo(&client, reader, &client_id) {
        Some(client)
    } else {
        registry.remove(&client_id);
        None
    }
}

/// Send the Auth challenge and wait for the peer to echo it back unchanged.
fn await_challenge_echo(client: &Client, reader: &mut TcpStream, client_id: &ClientId) -> bool {
    if client.send(&auth_challenge(client_id)).is_err() {
        return false;
    }

    let (mut framer, packets, errors) = Framer::new();
    let mut scratch = [0u8; READ_CHUNK];
    let echoed = loop {
        match reader.read(&mut scratch) {
            Ok(0) => return false,
            Ok(n) => {
                if framer.feed(&scratch[..n]).is_err() {
                    let _ = errors.try_recv();
                    return false;
                }
                if let Ok(packet) = packets.try_recv() {
                    break packet;
                }
            }
            Err(_) => return false,
        }
    };

    echoed.packet_type() == PacketType::AUTH && echoed.payload() == client_id.as_bytes()
}

fn auth_challenge(client_id: &ClientId) -> Packet {
    Packet::construct(Encoding::String, PacketType::AUTH, client_id.as_bytes())
        .expect("ClientId is fixed-width and well under MAX_DATA_SIZE")
}

/// LIVE: read and dispatch packets until Disconnect, a fatal framer error,
/// a read error, or shutdown.
fn live_loop(client: &Arc<Client>, mut reader: TcpStream, manager: &SessionManager, running: &AtomicBool) {
    reader.set_read_timeout(Some(LIVE_POLL_INTERVAL)).ok();

    let (mut framer, packets, errors) = Framer::new();
    let mut scratch = [0u8; READ_CHUNK];

    while running.load(Ordering::SeqCst) {
        match reader.read(&mut scratch) {
            Ok(0) => break,
            Ok(n) => {
                if framer.feed(&scratch[..n]).is_err() {
                    if let Ok(err) = errors.try_recv() {
                        warn!(client = %client.id, error = %err, "fatal framer error");
                    }
                    break;
                }
            }
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                // No full packet yet this poll; re-check the shutdown flag.
            }
            Err(_) => break,
        }

        while let Ok(packet) = packets.try_recv() {
            debug!(client = %client.id, packet_type = %packet.packet_type().name(), "dispatch");
            if let Outcome::Drain = dispatch::dispatch(client, manager, packet) {
                return;
            }
        }
    }
}
