// CLI entry point for the session relay daemon.
//
// Starts a standalone relay server that game clients connect to. The relay
// runs the handshake, game lifecycle, and packet fan-out — it never
// interprets in-game data. See `server.rs` for the networking architecture
// and `session.rs` for the fan-out model.
//
// Usage:
//   relay [OPTIONS]
//     --port <PORT>             Listen port (default: 3000, or $GAMERELAY_PORT)
//     --max-game-payload <N>    Accepted but currently advisory (reserved)
//     --log-level <LEVEL>       Tracing filter (default: info)
//     --help, -h

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gamerelay_server::server::{start_relay, RelayConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    let (config, log_level) = parse_args();
    init_logging(&log_level);

    let (handle, addr) = match start_relay(config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to start relay: {e}");
            std::process::exit(1);
        }
    };

    println!("Relay listening on {addr}");
    println!("Press Ctrl+C to stop.");

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_wait(running.clone());

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    println!("\nShutting down...");
    handle.stop();
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Parse command-line arguments into a `RelayConfig` plus the log level.
/// Uses simple `std::env::args()` matching — no clap dependency. Falls back
/// to `GAMERELAY_PORT` when `--port` isn't given.
fn parse_args() -> (RelayConfig, String) {
    let mut config = RelayConfig::default();
    if let Ok(port) = std::env::var("GAMERELAY_PORT") {
        if let Ok(port) = port.parse() {
            config.port = port;
        }
    }
    let mut log_level = "info".to_string();

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                config.port = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--port requires a valid port number");
                    std::process::exit(1);
                });
            }
            "--max-game-payload" => {
                i += 1;
                if args.get(i).and_then(|s| s.parse::<u32>().ok()).is_none() {
                    eprintln!("--max-game-payload requires a valid number");
                    std::process::exit(1);
                }
            }
            "--log-level" => {
                i += 1;
                log_level = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--log-level requires a value");
                    std::process::exit(1);
                });
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    (config, log_level)
}

fn print_usage() {
    println!("Usage: relay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --port <PORT>             Listen port (default: 3000, or $GAMERELAY_PORT)");
    println!("  --max-game-payload <N>    Accepted but currently advisory (reserved)");
    println!("  --log-level <LEVEL>       Tracing filter (default: info)");
    println!("  --help, -h                Show this help");
}

/// Block until Ctrl+C is pressed, then set the flag to false.
fn ctrlc_wait(running: Arc<AtomicBool>) {
    // For a standalone binary we rely on the user killing the process — the
    // relay threads are torn down on exit. A proper signal handler would use
    // the `ctrlc` crate; not pulled in to keep this path dependency-minimal.
    let _ = running;
}
