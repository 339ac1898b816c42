//! Demo binary: start the server, wait for readiness, register a small
//! status endpoint, and run until SIGINT/SIGTERM.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use http::Method;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use littleserve::{
    HttpController, HttpRequest, MiniHttpEngine, MountConfig, RequestHandler, ResponseWriter,
    ServerConfig,
};

#[derive(Parser)]
#[command(name = "littleserve")]
#[command(about = "Embedded-style HTTP server with static asset serving", long_about = None)]
struct Cli {
    /// Listen port
    #[arg(short, long, env = "LITTLESERVE_PORT", default_value_t = 80)]
    port: u16,

    /// Static file mount root; omit to serve the embedded pages only
    #[arg(short, long, env = "LITTLESERVE_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

/// `GET /api/status` — uptime and state, as JSON.
struct StatusHandler {
    started: Instant,
}

#[derive(Serialize)]
struct StatusBody {
    state: &'static str,
    uptime_ms: u128,
}

impl RequestHandler for StatusHandler {
    fn handle(&self, _req: &HttpRequest, res: &mut ResponseWriter<'_>) -> io::Result<()> {
        let body = StatusBody {
            state: "running",
            uptime_ms: self.started.elapsed().as_millis(),
        };
        res.set_header("Content-Type", "application/json");
        res.send(&serde_json::to_vec(&body)?)
    }
}

#[cfg(unix)]
fn wait_for_shutdown() -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    if let Some(sig) = signals.forever().next() {
        info!("signal {sig} received, shutting down");
    }
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown() -> anyhow::Result<()> {
    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mut config = ServerConfig::from_env();
    config.port = cli.port;
    if let Some(dir) = &cli.static_dir {
        config.static_mount = Some(MountConfig::new(&dir.to_string_lossy(), "littlefs"));
    }

    let controller = HttpController::new(MiniHttpEngine, config);
    controller.start();
    controller
        .wait_until_running(Duration::from_secs(5))
        .map_err(|e| anyhow::anyhow!("server did not become ready: {e}"))?;

    controller
        .register_uri(
            "/api/status",
            Method::GET,
            Arc::new(StatusHandler {
                started: Instant::now(),
            }),
        )
        .map_err(|e| anyhow::anyhow!("status endpoint registration failed: {e}"))?;

    if let Some(addr) = controller.local_addr() {
        info!("listening on http://{addr}/");
    }

    wait_for_shutdown()?;

    controller.close_all_sessions();
    controller.stop();
    Ok(())
}
