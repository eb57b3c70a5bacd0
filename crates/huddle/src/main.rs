//! `huddle-host`: runs one authoritative room.
//!
//! Configuration comes from `HUDDLE_*` environment variables (see
//! [`HostConfig::from_env`]); logging honours `RUST_LOG`.

use huddle::services::memory::MemoryProfiles;
use huddle::{HostConfig, HuddleError, RoomHost};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), HuddleError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = HostConfig::from_env()?;
    info!(bind = %config.bind, tick_rate_hz = config.tick_rate_hz, "starting huddle host");

    let host = RoomHost::builder()
        .config(config)
        .build(MemoryProfiles::new())
        .await?;
    info!(addr = %host.local_addr()?, "listening");

    let mut gate = host.room().gate();
    tokio::spawn(async move {
        if gate.wait_for(|open| *open).await.is_ok() {
            info!("gate is open");
        }
    });

    tokio::select! {
        res = host.run() => res,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}
