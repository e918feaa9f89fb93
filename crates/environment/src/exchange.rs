//! Synchronous request/response cycle on top of a [`ConnectionManager`].

use crate::error::EnvironmentError;
use connection::ConnectionManager;
use messaging::{Reaction, Response};
use std::sync::Arc;
use tracing::trace;

/// Sends reaction batches and decodes the states they produce.
///
/// `exchange` borrows the exchange mutably for the whole round trip, so a
/// second exchange cannot start before the first one has its response.
#[derive(Debug)]
pub struct ReactionExchange {
    connection: ConnectionManager,
}

impl ReactionExchange {
    #[must_use]
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    #[must_use]
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut ConnectionManager {
        &mut self.connection
    }

    /// One complete exchange.
    ///
    /// Returns `Ok(None)` when the simulator answered with nothing new (an
    /// empty payload or an empty state mapping). Errors are returned as they
    /// occur; nothing is retried here.
    ///
    /// # Errors
    ///
    /// Connection failures (including per-request timeouts) and
    /// [`EnvironmentError::ProtocolDecode`] for corrupt responses.
    pub fn exchange(&mut self, reactions: &[Reaction]) -> Result<Option<Response>, EnvironmentError> {
        let codec = Arc::clone(self.connection.codec());
        let request = codec.encode_reactions(reactions)?;
        let payload = self.connection.send(&request)?;
        if payload.is_empty() {
            trace!("exchange returned an empty payload");
            return Ok(None);
        }
        let response = codec.decode_response(&payload)?;
        if response.is_empty() {
            trace!("exchange returned no states");
            return Ok(None);
        }
        Ok(Some(response))
    }
}
