use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{MissedTickBehavior, interval};

use drift_server::config::ServerConfig;
use drift_server::net::{bind, start_websocket_server};
use drift_server::physics::GroundWorld;
use drift_server::state::SharedSimState;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

#[tokio::main]
async fn main() {
    // Load .env locally; fine when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "bad configuration");
            return;
        }
    };
    let tuning = match config.load_tuning() {
        Ok(t) => Arc::new(t),
        Err(e) => {
            tracing::error!(error = %e, path = ?config.tuning_path, "failed to load tuning");
            return;
        }
    };
    tracing::info!(tick_hz = config.tick_hz, max_speed = tuning.max_speed, "starting drift server");

    let ground = Arc::new(GroundWorld::test_track());
    let state = Arc::new(Mutex::new(SharedSimState::new(tuning, ground)));

    let listener = match bind(&config.addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, "failed to bind");
            return;
        }
    };
    tokio::spawn(start_websocket_server(listener, Arc::clone(&state)));

    // Fixed timestep
    let dt = config.dt();
    let mut ticker = interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let mut sim = state.lock().await;
        sim.tick_all(dt);
        sim.broadcast_snapshot();
    }
}
