// TCP acceptor and process-wide shutdown control.
//
// Architecture: one listener thread, one worker thread per accepted
// connection (`connection::run`). The listener is set non-blocking so it can
// poll the shared `running` flag between `accept()` calls, mirroring the
// teacher's `run_relay` accept loop. `RelayHandle::stop` flips that flag,
// force-closes every registered client socket so workers blocked in a read
// wake immediately rather than waiting out their own poll interval, and joins
// the acceptor thread plus every connection worker it has spawned so the
// process only exits once all of them have acknowledged shutdown.

use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::connection;
use crate::manager::SessionManager;
use crate::registry::Registry;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Configuration for starting a relay server.
pub struct RelayConfig {
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

type WorkerHandles = Arc<Mutex<Vec<thread::JoinHandle<()>>>>;

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    running: Arc<AtomicBool>,
    registry: Arc<Registry>,
    workers: WorkerHandles,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop, force-close every live connection, and wait
    /// for the acceptor thread and every connection worker to exit.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.registry.shutdown_all();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        for worker in self.workers.lock().unwrap_or_else(|p| p.into_inner()).drain(..) {
            let _ = worker.join();
        }
    }
}

/// Start the relay server on a background thread. Returns a handle for
/// stopping it and the actual bound address (useful when port 0 is used to
/// let the OS pick a free port).
pub fn start_relay(config: RelayConfig) -> std::io::Result<(RelayHandle, std::net::SocketAddr)> {
    let listener = TcpListener::bind(("0.0.0.0", config.port))?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;

    let running = Arc::new(AtomicBool::new(true));
    let registry = Arc::new(Registry::new());
    let manager = Arc::new(SessionManager::new());
    let workers: WorkerHandles = Arc::new(Mutex::new(Vec::new()));

    let running_clone = running.clone();
    let registry_clone = registry.clone();
    let workers_clone = workers.clone();
    let thread =
        thread::spawn(move || accept_loop(listener, registry_clone, manager, running_clone, workers_clone));

    Ok((
        RelayHandle {
            running,
            registry,
            workers,
            thread: Some(thread),
        },
        addr,
    ))
}

fn accept_loop(
    listener: TcpListener,
    registry: Arc<Registry>,
    manager: Arc<SessionManager>,
    running: Arc<AtomicBool>,
    workers: WorkerHandles,
) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, addr)) => {
                info!(%addr, "accepted connection");
                if stream.set_nonblocking(false).is_err() {
                    continue;
                }
                let registry = registry.clone();
                let manager = manager.clone();
                let running = running.clone();
                let handle = thread::spawn(move || connection::run(stream, registry, manager, running));
                workers.lock().unwrap_or_else(|p| p.into_inner()).push(handle);
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                break;
            }
        }
    }
}
