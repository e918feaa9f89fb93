//! Serves a [`LocalSimulator`] over TCP with the same framing the client uses.

use crate::local::LocalSimulator;
use connection::frame::{read_frame, write_frame};
use connection::Endpoint;
use messaging::{JsonCodec, Response};
use std::io;
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};

pub struct SimulatorServer {
    listener: TcpListener,
}

impl SimulatorServer {
    /// # Errors
    ///
    /// Propagates bind failures.
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Ok(Self { listener: TcpListener::bind(addr)? })
    }

    /// # Errors
    ///
    /// Propagates failures to query the bound address.
    pub fn local_endpoint(&self) -> io::Result<Endpoint> {
        let addr = self.listener.local_addr()?;
        Ok(Endpoint::new(addr.ip().to_string(), addr.port()))
    }

    /// Serve clients one after another, forever.
    ///
    /// # Errors
    ///
    /// Only accept failures end the loop; a client that misbehaves or hangs
    /// up is logged and the next one is accepted.
    pub fn run<S: LocalSimulator>(&self, simulator: &mut S) -> io::Result<()> {
        info!(endpoint = %self.local_endpoint()?, "simulator server listening");
        loop {
            if let Err(e) = self.accept_one(simulator) {
                warn!(error = %e, "client session ended with an error");
            }
        }
    }

    /// Accept one client and serve it until it hangs up.
    ///
    /// # Errors
    ///
    /// Accept and I/O failures other than the client closing the stream.
    pub fn accept_one<S: LocalSimulator>(&self, simulator: &mut S) -> io::Result<()> {
        let (stream, peer) = self.listener.accept()?;
        stream.set_nodelay(true)?;
        info!(%peer, "client connected");
        let result = serve_stream(stream, simulator);
        info!(%peer, "client disconnected");
        result
    }
}

fn serve_stream<S: LocalSimulator>(mut stream: TcpStream, simulator: &mut S) -> io::Result<()> {
    loop {
        let request = match read_frame(&mut stream) {
            Ok(request) => request,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        };
        let response = match JsonCodec.decode_reactions(&request) {
            Ok(reactions) => simulator.handle(&reactions),
            Err(e) => {
                warn!(error = %e, "undecodable request; answering with no update");
                Response::default()
            }
        };
        let payload = if response.is_empty() {
            Vec::new()
        } else {
            JsonCodec
                .encode_response(&response)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        };
        debug!(bytes = payload.len(), "answering request");
        write_frame(&mut stream, &payload)?;
    }
}
