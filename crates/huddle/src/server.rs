//! `RoomHost` builder and accept loop.
//!
//! A room host is the authoritative process for one room: it accepts
//! participant connections, runs the room actor, and routes chat and gate
//! traffic between them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use huddle_chat::RouterConfig;
use huddle_gate::GateConfig;
use huddle_protocol::{Codec, JsonCodec};
use huddle_services::ProfileStore;
use huddle_transport::{Transport, WebSocketTransport};
use tracing::{debug, error, info};

use crate::handler::handle_connection;
use crate::room::{RoomHandle, spawn_room};
use crate::{HostConfig, HuddleError};

/// State shared by every connection task.
pub(crate) struct HostState<P, C> {
    pub(crate) room: RoomHandle,
    pub(crate) profiles: P,
    pub(crate) codec: C,
    pub(crate) config: HostConfig,
}

/// Builder for configuring and starting a [`RoomHost`].
///
/// # Example
///
/// ```rust,no_run
/// use huddle::prelude::*;
/// use huddle::services::memory::MemoryProfiles;
///
/// # async fn run() -> Result<(), HuddleError> {
/// let host = RoomHost::builder()
///     .bind("0.0.0.0:8080")
///     .gate(GateConfig::pair("A", "B"))
///     .build(MemoryProfiles::new())
///     .await?;
/// host.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoomHostBuilder {
    config: HostConfig,
}

impl RoomHostBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    pub fn register_timeout(mut self, timeout: Duration) -> Self {
        self.config.register_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn tick_rate_hz(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    pub fn router(mut self, router: RouterConfig) -> Self {
        self.config.router = router;
        self
    }

    pub fn gate(mut self, gate: GateConfig) -> Self {
        self.config.gate = gate;
        self
    }

    /// Binds the listener and starts the room actor.
    ///
    /// `profiles` supplies nicknames for connections that register with an
    /// identity but no display name.
    pub async fn build<P: ProfileStore>(
        self,
        profiles: P,
    ) -> Result<RoomHost<P, JsonCodec>, HuddleError> {
        let config = self.config.validated();
        let transport = WebSocketTransport::bind(&config.bind).await?;
        let room = spawn_room(&config);
        info!(addr = %transport.local_addr()?, "room host bound");

        Ok(RoomHost {
            transport,
            state: Arc::new(HostState {
                room,
                profiles,
                codec: JsonCodec,
                config,
            }),
        })
    }
}

/// A bound room host. Call [`run`](Self::run) to start accepting.
pub struct RoomHost<P, C> {
    transport: WebSocketTransport,
    state: Arc<HostState<P, C>>,
}

impl RoomHost<(), JsonCodec> {
    pub fn builder() -> RoomHostBuilder {
        RoomHostBuilder::new()
    }
}

impl<P, C> RoomHost<P, C>
where
    P: ProfileStore,
    C: Codec + 'static,
{
    pub fn local_addr(&self) -> Result<SocketAddr, HuddleError> {
        Ok(self.transport.local_addr()?)
    }

    /// Handle to the room actor, e.g. to watch the gate.
    pub fn room(&self) -> RoomHandle {
        self.state.room.clone()
    }

    pub fn config(&self) -> &HostConfig {
        &self.state.config
    }

    /// Runs the accept loop until the process ends.
    ///
    /// Each connection is served on its own task, handshake included; a
    /// slow or failing connection never stops the loop.
    pub async fn run(mut self) -> Result<(), HuddleError> {
        info!("room host running");

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(incoming, state).await {
                            debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept failed");
                }
            }
        }
    }
}
