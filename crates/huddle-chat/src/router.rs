//! The chat event router.

use huddle_protocol::{
    ChatEvent, ChatKind, ConnectionId, Dispatch, ParticipantId, Recipient, fallback_display_name,
    validate_display_name,
};
use tracing::{debug, info, warn};

use crate::{RouterConfig, RouterError};

#[derive(Debug, Clone)]
struct Registration {
    connection: ConnectionId,
    display_name: String,
    identity: Option<ParticipantId>,
}

/// Sequences chat for one room and decides who receives each line.
///
/// The router is the single writer for its room: every method takes
/// `&mut self`, and the room actor that owns it processes submissions
/// one at a time. Every event it emits (broadcast, directed, or system
/// notice) takes the next value of one room-wide counter, starting at 1,
/// so sequence order is acceptance order.
///
/// Rejected requests ([`RouterError`]) never consume a sequence number.
/// A directed line to an unknown name is *not* rejected: the sender gets
/// a sequenced "not found" notice instead.
#[derive(Debug)]
pub struct EventRouter {
    config: RouterConfig,
    // Registration order. Directed lookup is first-match over this list.
    registry: Vec<Registration>,
    sequence: u64,
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl EventRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config: config.validated(),
            registry: Vec::new(),
            sequence: 0,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Sequence number of the most recent event, 0 before the first.
    pub fn last_sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Registered connections in registration order.
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.registry.iter().map(|r| r.connection)
    }

    pub fn is_registered(&self, connection: ConnectionId) -> bool {
        self.position(connection).is_some()
    }

    pub fn display_name(&self, connection: ConnectionId) -> Option<&str> {
        self.position(connection)
            .map(|i| self.registry[i].display_name.as_str())
    }

    /// Connection registered under exactly `display_name` (case-sensitive),
    /// earliest registration first.
    pub fn resolve(&self, display_name: &str) -> Option<ConnectionId> {
        self.registry
            .iter()
            .find(|r| r.display_name == display_name)
            .map(|r| r.connection)
    }

    /// Registers or renames `connection`.
    ///
    /// A first registration announces the participant to the room.
    /// Registering an already-registered connection again replaces its
    /// name and identity silently and returns `Ok(None)`.
    ///
    /// # Errors
    /// - [`RouterError::InvalidName`] if the name breaks the naming rules.
    /// - [`RouterError::NameTaken`] if names are unique and another
    ///   connection holds this one.
    pub fn register(
        &mut self,
        connection: ConnectionId,
        display_name: &str,
        identity: Option<ParticipantId>,
    ) -> Result<Option<Dispatch>, RouterError> {
        let name = validate_display_name(display_name, self.config.max_name_len)?.to_owned();

        if self.config.unique_names
            && self
                .registry
                .iter()
                .any(|r| r.display_name == name && r.connection != connection)
        {
            return Err(RouterError::NameTaken(name));
        }

        if let Some(i) = self.position(connection) {
            let existing = &mut self.registry[i];
            warn!(
                %connection,
                old = %existing.display_name,
                new = %name,
                "connection registered twice, replacing"
            );
            existing.display_name = name;
            existing.identity = identity;
            return Ok(None);
        }

        info!(%connection, name = %name, "participant registered");
        self.registry.push(Registration {
            connection,
            display_name: name.clone(),
            identity: identity.clone(),
        });
        let body = format!("{name} joined the room.");
        Ok(Some(Dispatch {
            event: self.system_event(body, Some(name), identity, None),
            recipient: Recipient::All,
        }))
    }

    /// Removes `connection` and announces the departure.
    ///
    /// Unknown connections return `None` and consume nothing.
    pub fn unregister(&mut self, connection: ConnectionId) -> Option<Dispatch> {
        let i = self.position(connection)?;
        let gone = self.registry.remove(i);
        info!(%connection, name = %gone.display_name, "participant unregistered");
        let body = format!("{} left the room.", gone.display_name);
        Some(Dispatch {
            event: self.system_event(body, Some(gone.display_name), gone.identity, None),
            recipient: Recipient::All,
        })
    }

    /// A public line from `connection` to everyone.
    ///
    /// Unregistered senders are named `Player_<n>`.
    pub fn submit_broadcast(
        &mut self,
        connection: ConnectionId,
        body: &str,
    ) -> Result<Dispatch, RouterError> {
        let body = self.check_body(body)?;
        let (name, identity) = self.sender(connection);
        let event = ChatEvent {
            sequence: self.next_sequence(),
            kind: ChatKind::Broadcast,
            sender: Some(connection),
            sender_identity: identity,
            text: ChatEvent::render_broadcast(&name, body),
            sender_name: Some(name),
            target_name: None,
            body: body.to_owned(),
        };
        debug!(%connection, sequence = event.sequence, "broadcast accepted");
        Ok(Dispatch {
            event,
            recipient: Recipient::All,
        })
    }

    /// A private line from `connection` to whoever is registered as
    /// `target`.
    ///
    /// The line goes to both ends (once, if they are the same connection).
    /// With no such name, the sender alone receives a system notice; that
    /// notice is sequenced like any other event.
    pub fn submit_directed(
        &mut self,
        connection: ConnectionId,
        target: &str,
        body: &str,
    ) -> Result<Dispatch, RouterError> {
        let body = self.check_body(body)?;
        let (name, identity) = self.sender(connection);

        let Some(target_connection) = self.resolve(target) else {
            debug!(%connection, target, "directed message target not found");
            let notice = format!("Player '{target}' not found.");
            return Ok(Dispatch {
                event: self.system_event(notice, None, None, Some(target.to_owned())),
                recipient: Recipient::only([connection]),
            });
        };

        let event = ChatEvent {
            sequence: self.next_sequence(),
            kind: ChatKind::Directed,
            sender: Some(connection),
            sender_identity: identity,
            text: ChatEvent::render_directed(&name, body),
            sender_name: Some(name),
            target_name: Some(target.to_owned()),
            body: body.to_owned(),
        };
        debug!(
            %connection,
            target = %target_connection,
            sequence = event.sequence,
            "directed message accepted"
        );
        Ok(Dispatch {
            event,
            recipient: Recipient::only([connection, target_connection]),
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn position(&self, connection: ConnectionId) -> Option<usize> {
        self.registry.iter().position(|r| r.connection == connection)
    }

    fn sender(&self, connection: ConnectionId) -> (String, Option<ParticipantId>) {
        match self.position(connection) {
            Some(i) => {
                let r = &self.registry[i];
                (r.display_name.clone(), r.identity.clone())
            }
            None => (fallback_display_name(connection), None),
        }
    }

    fn check_body<'a>(&self, body: &'a str) -> Result<&'a str, RouterError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(RouterError::EmptyMessage);
        }
        if body.chars().count() > self.config.max_body_len {
            return Err(RouterError::MessageTooLong {
                max: self.config.max_body_len,
            });
        }
        Ok(body)
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn system_event(
        &mut self,
        body: String,
        sender_name: Option<String>,
        sender_identity: Option<ParticipantId>,
        target_name: Option<String>,
    ) -> ChatEvent {
        ChatEvent {
            sequence: self.next_sequence(),
            kind: ChatKind::System,
            sender: None,
            sender_identity,
            sender_name,
            target_name,
            text: ChatEvent::render_system(&body),
            body,
        }
    }
}
