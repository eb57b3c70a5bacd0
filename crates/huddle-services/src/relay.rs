//! Relay allocation and join-code exchange.
//!
//! The room owner reserves relay capacity, receives a short join code and
//! publishes it in the directory. Everyone else turns that code back into
//! connection parameters. All of it happens in one [`TransportMode`],
//! fixed per [`RelayBroker`].

use std::future::Future;
use std::sync::Arc;

use huddle_protocol::{ConnectionParams, JoinCode, RelaySession, TransportMode};

use crate::RelayError;

/// Reserved relay capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub id: String,
    /// Connections the relay accepts besides the host.
    pub max_connections: usize,
    /// Parameters for the hosting side.
    pub server_params: ConnectionParams,
}

/// The relay allocator service.
pub trait RelayAllocator: Send + Sync + 'static {
    fn allocate(
        &self,
        max_connections: usize,
        mode: TransportMode,
    ) -> impl Future<Output = Result<Allocation, RelayError>> + Send;

    /// Issues (or repeats) the join code for an allocation.
    fn join_code(
        &self,
        allocation: &Allocation,
    ) -> impl Future<Output = Result<JoinCode, RelayError>> + Send;

    /// Exchanges a join code for client connection parameters.
    fn resolve_join_code(
        &self,
        code: &JoinCode,
        mode: TransportMode,
    ) -> impl Future<Output = Result<ConnectionParams, RelayError>> + Send;
}

/// Typed front end for a [`RelayAllocator`], bound to one transport mode.
#[derive(Debug)]
pub struct RelayBroker<R> {
    inner: Arc<R>,
    mode: TransportMode,
}

impl<R> Clone for RelayBroker<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            mode: self.mode,
        }
    }
}

impl<R: RelayAllocator> RelayBroker<R> {
    pub fn new(allocator: R, mode: TransportMode) -> Self {
        Self {
            inner: Arc::new(allocator),
            mode,
        }
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Reserves room for `max_connections` peers besides the host.
    pub async fn allocate(&self, max_connections: usize) -> Result<Allocation, RelayError> {
        if max_connections == 0 {
            return Err(RelayError::Rejected(
                "allocation needs at least one connection".into(),
            ));
        }
        let allocation = self.inner.allocate(max_connections, self.mode).await?;
        tracing::info!(
            allocation = %allocation.id,
            max_connections,
            mode = %self.mode,
            "relay allocated"
        );
        Ok(allocation)
    }

    /// Allocates for a room of `capacity`: the host holds one slot itself.
    pub async fn allocate_for(&self, capacity: usize) -> Result<Allocation, RelayError> {
        self.allocate(capacity.saturating_sub(1)).await
    }

    pub async fn join_code(&self, allocation: &Allocation) -> Result<JoinCode, RelayError> {
        self.inner.join_code(allocation).await
    }

    /// Allocates for `capacity` and fetches the join code in one go.
    pub async fn host_session(&self, capacity: usize) -> Result<RelaySession, RelayError> {
        let allocation = self.allocate_for(capacity).await?;
        let join_code = self.join_code(&allocation).await?;
        Ok(RelaySession {
            allocation_id: allocation.id,
            join_code,
            server_params: allocation.server_params,
        })
    }

    /// Validates a raw code and resolves it into client parameters.
    pub async fn resolve(&self, raw_code: &str) -> Result<ConnectionParams, RelayError> {
        let code =
            JoinCode::parse(raw_code).map_err(|e| RelayError::InvalidJoinCode(e.to_string()))?;
        let params = self.inner.resolve_join_code(&code, self.mode).await?;
        tracing::debug!(%code, endpoint = %params.endpoint, "join code resolved");
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRelay;

    fn broker() -> RelayBroker<MemoryRelay> {
        RelayBroker::new(MemoryRelay::new(), TransportMode::Dtls)
    }

    #[tokio::test]
    async fn test_allocate_for_reserves_capacity_minus_host() {
        let allocation = broker().allocate_for(4).await.unwrap();
        assert_eq!(allocation.max_connections, 3);
        assert_eq!(allocation.server_params.mode, TransportMode::Dtls);
    }

    #[tokio::test]
    async fn test_allocate_zero_is_rejected() {
        assert!(matches!(
            broker().allocate_for(1).await,
            Err(RelayError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_host_session_code_resolves_to_same_allocation() {
        let relay = broker();
        let session = relay.host_session(4).await.unwrap();
        let params = relay
            .resolve(&session.join_code.as_str().to_lowercase())
            .await
            .unwrap();
        assert_eq!(params.allocation_id, session.allocation_id);
        assert_eq!(params.endpoint, session.server_params.endpoint);
    }

    #[tokio::test]
    async fn test_resolve_malformed_code_fails_locally() {
        assert!(matches!(
            broker().resolve("no!").await,
            Err(RelayError::InvalidJoinCode(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_in_other_mode_fails() {
        let relay = MemoryRelay::new();
        let host = RelayBroker::new(relay.clone(), TransportMode::Dtls);
        let client = RelayBroker::new(relay, TransportMode::Udp);
        let session = host.host_session(2).await.unwrap();
        assert!(matches!(
            client.resolve(session.join_code.as_str()).await,
            Err(RelayError::ModeMismatch { .. })
        ));
    }
}
