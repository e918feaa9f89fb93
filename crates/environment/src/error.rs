use connection::{ConnectionError, Endpoint};
use messaging::{DecodeError, EncodeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("simulator at {endpoint} did not describe itself after {attempts} attempts")]
    ConnectionTimeout { endpoint: Endpoint, attempts: u32 },
    #[error("protocol decode error: {0}")]
    ProtocolDecode(#[from] DecodeError),
    #[error(transparent)]
    ProtocolEncode(#[from] EncodeError),
    #[error("exchange returned no environment state")]
    NoEnvironment,
    #[error("action has {actual} values but the action space declares {expected}")]
    ActionSpaceMismatch { expected: usize, actual: usize },
    #[error("session is closed")]
    SessionClosed,
    #[error("session is not connected")]
    NotConnected,
    #[error(transparent)]
    Connection(ConnectionError),
}

impl From<ConnectionError> for EnvironmentError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::Timeout { endpoint, attempts } => EnvironmentError::ConnectionTimeout { endpoint, attempts },
            ConnectionError::NotConnected(_) => EnvironmentError::NotConnected,
            ConnectionError::Encode(e) => EnvironmentError::ProtocolEncode(e),
            ConnectionError::Decode(e) => EnvironmentError::ProtocolDecode(e),
            other => EnvironmentError::Connection(other),
        }
    }
}
