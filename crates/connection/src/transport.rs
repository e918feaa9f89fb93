//! # Transports
//!
//! The seam between the connection state machine and the bytes on the wire.
//! A [`Connector`] opens a [`Transport`]; a transport carries one request
//! payload out and exactly one complete response payload back.
//!
//! [`TcpConnector`] is the production implementation. Tests and in-process
//! simulators plug in their own connectors.

use crate::config::Endpoint;
use crate::frame::{self, FrameBuffer};
use std::io::{self, Read};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

const READ_CHUNK: usize = 16 * 1024;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("request frame not written within {0:?}")]
    WriteTimeout(Duration),
    #[error("remote closed the connection")]
    Closed,
    #[error("transport i/o failure: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Whether the transport is still usable after this error. Only a read
    /// timeout is: the partial response stays buffered. A request frame that
    /// may be half on the wire is not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

/// A bidirectional, frame-complete request/response channel.
pub trait Transport: Send {
    /// Send one request payload and block until its response payload arrives
    /// or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// [`TransportError::Timeout`] when no complete response arrived in time.
    /// The transport remains usable after a timeout.
    fn request(&mut self, payload: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Release the underlying resources. Calling it twice is a no-op.
    fn close(&mut self);
}

/// Opens transports to an endpoint.
pub trait Connector: Send {
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the endpoint cannot be reached.
    fn open(&mut self, endpoint: &Endpoint, timeout: Duration) -> Result<Box<dyn Transport>, TransportError>;
}

/// Connects over TCP with length-prefixed frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn open(&mut self, endpoint: &Endpoint, timeout: Duration) -> Result<Box<dyn Transport>, TransportError> {
        let mut last_error = None;
        for addr in (endpoint.host.as_str(), endpoint.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    debug!(%endpoint, %addr, "tcp transport opened");
                    return Ok(Box::new(TcpTransport::new(stream)));
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{endpoint} did not resolve")))
            .into())
    }
}

/// TCP transport.
///
/// Responses that arrive after their request timed out are still owed by the
/// remote; they are counted and discarded before the next response is
/// returned so replies never get paired with the wrong request.
pub struct TcpTransport {
    stream: Option<TcpStream>,
    inbound: FrameBuffer,
    stale_responses: usize,
}

impl TcpTransport {
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        Self { stream: Some(stream), inbound: FrameBuffer::default(), stale_responses: 0 }
    }

    fn next_frame(stream: &mut TcpStream, inbound: &mut FrameBuffer, deadline: Instant, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = inbound.next_frame()? {
                return Ok(frame);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout(timeout));
            }
            stream.set_read_timeout(Some(remaining))?;
            match stream.read(&mut chunk) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => inbound.extend(&chunk[..n]),
                Err(e) => return Err(classify(e, timeout)),
            }
        }
    }
}

fn classify(error: io::Error, timeout: Duration) -> TransportError {
    match error.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout(timeout),
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => TransportError::Closed,
        _ => TransportError::Io(error),
    }
}

impl Transport for TcpTransport {
    fn request(&mut self, payload: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let deadline = Instant::now() + timeout;

        stream.set_write_timeout(Some(timeout))?;
        if let Err(e) = frame::write_frame(stream, payload) {
            self.close();
            return Err(match classify(e, timeout) {
                TransportError::Timeout(elapsed) => TransportError::WriteTimeout(elapsed),
                other => other,
            });
        }
        self.stale_responses += 1;

        while self.stale_responses > 1 {
            Self::next_frame(stream, &mut self.inbound, deadline, timeout)?;
            self.stale_responses -= 1;
            trace!(outstanding = self.stale_responses, "discarded late response");
        }
        let response = Self::next_frame(stream, &mut self.inbound, deadline, timeout)?;
        self.stale_responses -= 1;
        Ok(response)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!("tcp transport closed");
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn stalled_write_closes_the_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        // Accepted but never read, so the socket buffers fill up.
        let (_peer, _) = listener.accept().unwrap();
        let mut transport = TcpTransport::new(stream);

        let payload = vec![0u8; 32 * 1024 * 1024];
        let err = transport.request(&payload, Duration::from_millis(100)).unwrap_err();

        assert!(matches!(err, TransportError::WriteTimeout(_)), "got {err:?}");
        assert!(!err.is_transient());
        assert!(matches!(transport.request(b"next", Duration::from_millis(100)), Err(TransportError::Closed)));
    }
}
