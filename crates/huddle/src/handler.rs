//! Per-connection handler: registration, then message routing.
//!
//! Each accepted connection gets its own task running this handler plus a
//! writer task that owns the socket's write half. The flow is:
//!   0. Finish the WebSocket upgrade (bounded by `register_timeout`)
//!   1. Wait for `Register` (bounded by `register_timeout`)
//!   2. Attach to the room actor, which replies with `Welcome`
//!   3. Loop: decode client messages and forward them to the room
//!   4. On `Bye`, close, error or idle timeout: detach from the room

use std::sync::Arc;

use huddle_chat::ChatCommand;
use huddle_protocol::{
    ClientMessage, Codec, ConnectionId, ErrorCode, ParticipantId, ServerMessage,
    fallback_display_name, validate_display_name,
};
use huddle_services::{ProfileError, ProfileStore};
use huddle_transport::{
    Connection, FrameSink, FrameSource, Incoming, WebSocketReceiver, WebSocketSender,
    WebSocketUpgrade,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::room::{Outbox, RoomHandle};
use crate::server::HostState;
use crate::{HuddleError, RoomError};

/// Detaches a registered connection from the room when the handler exits,
/// including on panic. `Drop` is synchronous, so the detach runs on a
/// spawned task.
struct RegistrationGuard {
    connection: ConnectionId,
    room: RoomHandle,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        let connection = self.connection;
        let room = self.room.clone();
        tokio::spawn(async move {
            if let Err(e) = room.detach(connection).await {
                debug!(%connection, error = %e, "detach after disconnect failed");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<P, C>(
    incoming: WebSocketUpgrade,
    state: Arc<HostState<P, C>>,
) -> Result<(), HuddleError>
where
    P: ProfileStore,
    C: Codec,
{
    let connection = incoming.id();
    let peer = incoming.peer_addr();
    debug!(%connection, %peer, "handling new connection");

    let timeout = state.config.register_timeout;
    let conn = match tokio::time::timeout(timeout, incoming.upgrade()).await {
        Ok(conn) => conn?,
        Err(_) => {
            info!(%connection, %peer, ?timeout, "handshake timed out");
            return Err(HuddleError::HandshakeTimeout(timeout));
        }
    };

    let (sink, mut source) = conn.split();
    let (outbox, inbox) = mpsc::unbounded_channel();
    tokio::spawn(write_loop(sink, inbox, Arc::clone(&state)));

    // --- Step 1: Register ---
    if !register(connection, &mut source, &outbox, &state).await? {
        return Ok(());
    }
    let _guard = RegistrationGuard {
        connection,
        room: state.room.clone(),
    };

    // --- Step 2: Message loop ---
    let idle_timeout = state.config.idle_timeout;
    loop {
        let data = match tokio::time::timeout(idle_timeout, source.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                info!(%connection, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                debug!(%connection, error = %e, "recv error");
                break;
            }
            Err(_) => {
                info!(%connection, "connection idle, closing");
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(%connection, error = %e, "failed to decode client message");
                reply_error(&outbox, ErrorCode::BadMessage, e.to_string());
                continue;
            }
        };

        if !handle_message(connection, msg, &outbox, &state.room).await? {
            info!(%connection, "client said bye");
            break;
        }
    }

    // _guard drops here, detaching the connection and announcing it.
    Ok(())
}

/// Waits for a valid `Register` and attaches to the room.
///
/// Refused registrations are reported and the client may try again until
/// the deadline. Returns `false` if the client left first.
async fn register<P, C>(
    connection: ConnectionId,
    source: &mut WebSocketReceiver,
    outbox: &Outbox,
    state: &HostState<P, C>,
) -> Result<bool, HuddleError>
where
    P: ProfileStore,
    C: Codec,
{
    let timeout = state.config.register_timeout;
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let data = match tokio::time::timeout_at(deadline, source.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                debug!(%connection, "closed before registering");
                return Ok(false);
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                info!(%connection, ?timeout, "registration timed out");
                return Err(HuddleError::RegistrationTimeout(timeout));
            }
        };

        let (display_name, identity) = match state.codec.decode(&data) {
            Ok(ClientMessage::Register {
                display_name,
                identity,
            }) => (display_name, identity),
            Ok(ClientMessage::Bye) => return Ok(false),
            Ok(_) => {
                reply_error(outbox, ErrorCode::NotRegistered, "send Register first");
                continue;
            }
            Err(e) => {
                reply_error(outbox, ErrorCode::BadMessage, e.to_string());
                continue;
            }
        };

        let name = match display_name {
            Some(name) => name,
            None => profile_name(connection, identity.as_ref(), state).await,
        };

        match state
            .room
            .register(connection, name, identity, outbox.clone())
            .await
        {
            Ok(()) => return Ok(true),
            Err(RoomError::Unavailable) => return Err(RoomError::Unavailable.into()),
            Err(e) => {
                debug!(%connection, error = %e, "registration refused");
                report(outbox, &e);
            }
        }
    }
}

/// Saved nickname for `identity`, or `Player_<n>`.
async fn profile_name<P, C>(
    connection: ConnectionId,
    identity: Option<&ParticipantId>,
    state: &HostState<P, C>,
) -> String
where
    P: ProfileStore,
    C: Codec,
{
    let Some(identity) = identity else {
        return fallback_display_name(connection);
    };
    match state.profiles.get_display_name(identity).await {
        Ok(name) if validate_display_name(&name, state.config.router.max_name_len).is_ok() => {
            name
        }
        Ok(name) => {
            warn!(%connection, %identity, name = %name, "stored display name is invalid, ignoring");
            fallback_display_name(connection)
        }
        Err(ProfileError::NotFound(_)) => fallback_display_name(connection),
        Err(e) => {
            warn!(%connection, %identity, error = %e, "profile lookup failed");
            fallback_display_name(connection)
        }
    }
}

/// Forwards one message to the room. Returns `false` when the client is done.
async fn handle_message(
    connection: ConnectionId,
    msg: ClientMessage,
    outbox: &Outbox,
    room: &RoomHandle,
) -> Result<bool, HuddleError> {
    let result = match msg {
        ClientMessage::Register { .. } => {
            reply_error(outbox, ErrorCode::AlreadyRegistered, "already registered");
            return Ok(true);
        }
        ClientMessage::Bye => return Ok(false),
        ClientMessage::Say { text } => match ChatCommand::parse(&text) {
            Ok(ChatCommand::Broadcast { body }) => room.broadcast(connection, body).await.map(drop),
            Ok(ChatCommand::Directed { target, body }) => {
                room.directed(connection, target, body).await.map(drop)
            }
            Err(e) => Err(RoomError::Router(e)),
        },
        ClientMessage::Broadcast { body } => room.broadcast(connection, body).await.map(drop),
        ClientMessage::Directed { target, body } => {
            room.directed(connection, target, body).await.map(drop)
        }
        ClientMessage::Actuate { actuator } => room.actuate(connection, actuator).await.map(drop),
    };

    match result {
        Ok(()) => Ok(true),
        Err(RoomError::Unavailable) => Err(RoomError::Unavailable.into()),
        Err(e) => {
            debug!(%connection, error = %e, "request refused");
            report(outbox, &e);
            Ok(true)
        }
    }
}

/// Drains the connection's outbox into the socket, then closes it.
///
/// Ends once every outbox sender is gone, i.e. the handler returned and
/// the room detached the connection.
async fn write_loop<P, C>(
    mut sink: WebSocketSender,
    mut inbox: mpsc::UnboundedReceiver<ServerMessage>,
    state: Arc<HostState<P, C>>,
) where
    P: ProfileStore,
    C: Codec,
{
    let connection = sink.id();
    while let Some(msg) = inbox.recv().await {
        let bytes = match state.codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%connection, error = %e, "failed to encode server message");
                continue;
            }
        };
        if let Err(e) = sink.send(&bytes).await {
            debug!(%connection, error = %e, "send failed, stopping writer");
            return;
        }
    }
    if let Err(e) = sink.close().await {
        debug!(%connection, error = %e, "close failed");
    }
}

fn report(outbox: &Outbox, err: &RoomError) {
    if let Some(code) = err.code() {
        reply_error(outbox, code, err.to_string());
    }
}

fn reply_error(outbox: &Outbox, code: ErrorCode, message: impl Into<String>) {
    let _ = outbox.send(ServerMessage::Error {
        code,
        message: message.into(),
    });
}
