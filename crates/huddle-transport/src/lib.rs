//! Connection transport for the Huddle room host.
//!
//! A [`Transport`] accepts [`Incoming`] peers. The accept loop hands each
//! one to its own task, which runs the [upgrade](Incoming::upgrade) and gets
//! a [`Connection`]; a slow handshake never holds up the next accept. A
//! connection is immediately [split](Connection::split) into a
//! [`FrameSink`] and a [`FrameSource`] so one task can write while another
//! reads. Frames are opaque byte
//! buffers; encoding is the protocol crate's job.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use huddle_protocol::ConnectionId;
#[cfg(feature = "websocket")]
pub use websocket::{
    WebSocketConnection, WebSocketReceiver, WebSocketSender, WebSocketTransport, WebSocketUpgrade,
};

use std::net::SocketAddr;

/// Accepts incoming connections.
pub trait Transport: Send + 'static {
    /// A peer that still has to complete its handshake.
    type Incoming: Incoming;

    /// Waits for the next peer. Does not run the handshake.
    async fn accept(&mut self) -> Result<Self::Incoming, TransportError>;

    /// Address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, TransportError>;
}

/// An accepted peer whose protocol handshake has not run yet.
pub trait Incoming: Send + 'static {
    /// The connection produced by a successful upgrade.
    type Connection: Connection;

    /// Identifier the upgraded connection will carry.
    fn id(&self) -> ConnectionId;

    /// Remote peer address.
    fn peer_addr(&self) -> SocketAddr;

    /// Runs the handshake. Callers bound this with a timeout.
    async fn upgrade(self) -> Result<Self::Connection, TransportError>;
}

/// One accepted connection, not yet split.
pub trait Connection: Send + 'static {
    /// Write half.
    type Sink: FrameSink;
    /// Read half.
    type Source: FrameSource;

    /// Identifier unique among this process's connections.
    fn id(&self) -> ConnectionId;

    /// Remote peer address.
    fn peer_addr(&self) -> SocketAddr;

    /// Separates the connection into independently owned halves.
    fn split(self) -> (Self::Sink, Self::Source);
}

/// Write half of a connection.
pub trait FrameSink: Send + 'static {
    /// Sends one frame.
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Starts a graceful close.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a connection.
pub trait FrameSource: Send + 'static {
    /// Receives the next frame.
    ///
    /// Returns `Ok(None)` once the peer closed cleanly.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}
