use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use nav_runtime::{
    read_frame, write_frame, EnvelopeDecodeError, EnvelopeEncodeError, FrameError, Request,
    Response,
};
use thiserror::Error;

use crate::ClientConfig;

/// Moves one request to the navigation service and brings back its answer.
///
/// Implementations carry at most one request in flight; callers never
/// pipeline.
pub trait Transport {
    fn round_trip(&mut self, request: &Request) -> Result<Response, TransportError>;
}

/// The service could not be reached or the exchange broke down mid-flight.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("endpoint '{0}' did not resolve to any address")]
    Unresolved(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("failed to encode request: {0}")]
    Encode(#[from] EnvelopeEncodeError),
    #[error("failed to decode response: {0}")]
    Decode(#[from] EnvelopeDecodeError),
    #[error("connection closed before a response arrived")]
    Closed,
}

impl TransportError {
    /// True when the service was never heard from: connect, I/O and framing
    /// failures. Codec failures mean a reply (or request) exists but is
    /// unusable, which is not an outage.
    pub fn is_unreachable(&self) -> bool {
        !matches!(self, TransportError::Encode(_) | TransportError::Decode(_))
    }
}

/// Persistent TCP connection with lazy (re)connect.
///
/// Any failure drops the stream; the next round trip dials again.
#[derive(Debug)]
pub struct TcpTransport {
    config: ClientConfig,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Create a transport that dials on first use.
    pub fn lazy(config: ClientConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    /// Create a transport and dial immediately.
    pub fn connect(config: ClientConfig) -> Result<Self, TransportError> {
        let mut transport = Self::lazy(config);
        transport.ensure_connected()?;
        Ok(transport)
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn ensure_connected(&mut self) -> Result<&mut TcpStream, TransportError> {
        if self.stream.is_none() {
            let stream = self.dial()?;
            self.stream = Some(stream);
        }
        self.stream.as_mut().ok_or(TransportError::Closed)
    }

    fn dial(&self) -> Result<TcpStream, TransportError> {
        let endpoint = self.config.endpoint();
        let addrs: Vec<SocketAddr> = endpoint
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.config.connect_timeout()) {
                Ok(stream) => {
                    self.configure(&stream)
                        .map_err(|source| TransportError::Connect {
                            endpoint: endpoint.to_string(),
                            source,
                        })?;
                    tracing::debug!(
                        target: "pathfinding::client",
                        %addr,
                        "transport.connected"
                    );
                    return Ok(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }

        match last_err {
            Some(source) => Err(TransportError::Connect {
                endpoint: endpoint.to_string(),
                source,
            }),
            None => Err(TransportError::Unresolved(endpoint.to_string())),
        }
    }

    fn configure(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nodelay(self.config.tcp_nodelay())?;
        stream.set_read_timeout(self.config.read_timeout())?;
        stream.set_write_timeout(self.config.write_timeout())?;
        Ok(())
    }

    fn exchange(&mut self, payload: &[u8]) -> Result<Response, TransportError> {
        let stream = self.ensure_connected()?;
        write_frame(stream, payload)?;
        let frame = read_frame(stream)?.ok_or(TransportError::Closed)?;
        Ok(Response::decode(&frame)?)
    }
}

impl Transport for TcpTransport {
    fn round_trip(&mut self, request: &Request) -> Result<Response, TransportError> {
        let payload = request.encode_to_vec()?;
        let result = self.exchange(&payload);
        if result.is_err() {
            // Whatever state the stream is in, it is no longer frame aligned.
            self.stream = None;
        }
        result
    }
}
