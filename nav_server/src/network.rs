use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use nav_runtime::{read_frame, write_frame, FrameError, Response, MAX_FRAME_LEN};
use thiserror::Error;

use crate::dispatch::handle_frame;
use crate::engine::SpatialQueryEngine;

const ACCEPT_IDLE_SLEEP: Duration = Duration::from_millis(50);
const ACCEPT_ERROR_SLEEP: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind navigation listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to configure navigation listener: {0}")]
    Configure(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionOptions {
    /// Close a connection that sends nothing for this long; `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

type LiveConnections = Arc<Mutex<Vec<(u64, TcpStream)>>>;

/// Background TCP listener answering one framed request per framed response.
pub struct NavServer {
    local_addr: SocketAddr,
    shutdown: Option<Sender<()>>,
    accept_thread: Option<JoinHandle<()>>,
    connections: LiveConnections,
    served: Arc<AtomicU64>,
}

impl NavServer {
    pub fn start(
        bind_addr: SocketAddr,
        engine: Arc<dyn SpatialQueryEngine>,
    ) -> Result<NavServer, ServerError> {
        NavServer::start_with(bind_addr, engine, ConnectionOptions::default())
    }

    pub fn start_with(
        bind_addr: SocketAddr,
        engine: Arc<dyn SpatialQueryEngine>,
        options: ConnectionOptions,
    ) -> Result<NavServer, ServerError> {
        let listener = TcpListener::bind(bind_addr).map_err(|source| ServerError::Bind {
            addr: bind_addr,
            source,
        })?;
        listener
            .set_nonblocking(true)
            .map_err(ServerError::Configure)?;
        let local_addr = listener.local_addr().map_err(ServerError::Configure)?;

        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let connections: LiveConnections = Arc::new(Mutex::new(Vec::new()));
        let served = Arc::new(AtomicU64::new(0));

        let accept_connections = Arc::clone(&connections);
        let accept_served = Arc::clone(&served);
        let accept_thread = thread::Builder::new()
            .name("nav-accept".to_string())
            .spawn(move || {
                accept_loop(
                    listener,
                    engine,
                    options,
                    shutdown_rx,
                    accept_connections,
                    accept_served,
                )
            })
            .map_err(ServerError::Configure)?;

        tracing::info!(
            target: "pathfinding::server",
            addr = %local_addr,
            "server.listening"
        );

        Ok(NavServer {
            local_addr,
            shutdown: Some(shutdown_tx),
            accept_thread: Some(accept_thread),
            connections,
            served,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn requests_served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    pub fn open_connections(&self) -> usize {
        self.connections
            .lock()
            .map(|connections| connections.len())
            .unwrap_or(0)
    }

    /// Block the calling thread until the accept loop exits.
    pub fn wait(mut self) {
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
    }

    /// Stop accepting and close every live connection. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };
        let _ = shutdown.send(());
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
        if let Ok(mut connections) = self.connections.lock() {
            for (_, stream) in connections.drain(..) {
                let _ = stream.shutdown(Shutdown::Both);
            }
        }
        tracing::info!(
            target: "pathfinding::server",
            addr = %self.local_addr,
            served = self.requests_served(),
            "server.stopped"
        );
    }
}

impl Drop for NavServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(
    listener: TcpListener,
    engine: Arc<dyn SpatialQueryEngine>,
    options: ConnectionOptions,
    shutdown: Receiver<()>,
    connections: LiveConnections,
    served: Arc<AtomicU64>,
) {
    let mut next_id = 0u64;
    loop {
        match shutdown.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match listener.accept() {
            Ok((stream, peer)) => {
                next_id += 1;
                let id = next_id;
                if let Err(err) = prepare_stream(&stream, options) {
                    tracing::warn!(
                        target: "pathfinding::server",
                        %peer,
                        error = %err,
                        "connection.configure_failed"
                    );
                    continue;
                }
                match stream.try_clone() {
                    Ok(handle) => {
                        if let Ok(mut live) = connections.lock() {
                            live.push((id, handle));
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            target: "pathfinding::server",
                            %peer,
                            error = %err,
                            "connection.clone_failed"
                        );
                        continue;
                    }
                }
                tracing::info!(target: "pathfinding::server", %peer, id, "connection.accepted");

                let engine = Arc::clone(&engine);
                let connections = Arc::clone(&connections);
                let served = Arc::clone(&served);
                let spawned = thread::Builder::new()
                    .name(format!("nav-conn-{id}"))
                    .spawn(move || {
                        serve_connection(stream, peer, engine.as_ref(), &served);
                        if let Ok(mut live) = connections.lock() {
                            live.retain(|(live_id, _)| *live_id != id);
                        }
                    });
                if let Err(err) = spawned {
                    tracing::error!(
                        target: "pathfinding::server",
                        %peer,
                        error = %err,
                        "connection.spawn_failed"
                    );
                }
            }
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_IDLE_SLEEP);
            }
            Err(err) => {
                tracing::warn!(
                    target: "pathfinding::server",
                    error = %err,
                    "connection.accept_failed"
                );
                thread::sleep(ACCEPT_ERROR_SLEEP);
            }
        }
    }
}

fn prepare_stream(stream: &TcpStream, options: ConnectionOptions) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(options.idle_timeout)?;
    Ok(())
}

fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    engine: &dyn SpatialQueryEngine,
    served: &AtomicU64,
) {
    let write_half = match stream.try_clone() {
        Ok(write_half) => write_half,
        Err(err) => {
            tracing::warn!(target: "pathfinding::server", %peer, error = %err, "connection.clone_failed");
            return;
        }
    };
    let mut reader = BufReader::new(stream);
    let mut writer = BufWriter::new(write_half);

    loop {
        let frame = match read_frame(&mut reader) {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(FrameError::TooLarge { len, max }) => {
                tracing::warn!(
                    target: "pathfinding::server",
                    %peer,
                    len,
                    max,
                    "connection.frame_too_large"
                );
                // The stream cannot be resynchronised after an oversized header.
                let response = Response::error(format!("frame of {len} bytes exceeds {max}"));
                let _ = send_response(&mut writer, &response);
                break;
            }
            Err(err) => {
                tracing::debug!(target: "pathfinding::server", %peer, error = %err, "connection.read_failed");
                break;
            }
        };

        let response = handle_frame(engine, &frame);
        served.fetch_add(1, Ordering::Relaxed);
        if let Err(err) = send_response(&mut writer, &response) {
            tracing::debug!(target: "pathfinding::server", %peer, error = %err, "connection.write_failed");
            break;
        }
    }

    tracing::info!(target: "pathfinding::server", %peer, "connection.closed");
}

fn send_response(writer: &mut BufWriter<TcpStream>, response: &Response) -> Result<(), FrameError> {
    let bytes = encode_response(response)?;
    write_frame(writer, &bytes)
}

/// Encode `response`, substituting an error reply when it cannot be encoded
/// or would not fit in a single frame.
fn encode_response(response: &Response) -> Result<Vec<u8>, FrameError> {
    let replacement = match response.encode_to_vec() {
        Ok(bytes) if bytes.len() <= MAX_FRAME_LEN => return Ok(bytes),
        Ok(bytes) => {
            tracing::warn!(
                target: "pathfinding::server",
                len = bytes.len(),
                max = MAX_FRAME_LEN,
                "response.too_large"
            );
            Response::error(format!(
                "response of {} bytes exceeds the {MAX_FRAME_LEN} byte frame limit",
                bytes.len()
            ))
        }
        Err(err) => {
            tracing::error!(target: "pathfinding::server", error = %err, "response.encode_failed");
            Response::error(format!("failed to encode response: {err}"))
        }
    };
    replacement
        .encode_to_vec()
        .map_err(|err| FrameError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::static_engine::StaticWorldEngine;
    use nav_runtime::{Position, Request};

    fn round_trip(stream: &mut TcpStream, request: &Request) -> Response {
        write_frame(stream, &request.encode_to_vec().unwrap()).unwrap();
        let frame = read_frame(stream).unwrap().expect("response frame");
        Response::decode(&frame).unwrap()
    }

    #[test]
    fn answers_requests_over_loopback() {
        let engine: Arc<dyn SpatialQueryEngine> = Arc::new(StaticWorldEngine::builtin());
        let mut server = NavServer::start("127.0.0.1:0".parse().unwrap(), engine).unwrap();
        let mut stream = TcpStream::connect(server.local_addr()).unwrap();

        let request = Request::LineOfSight {
            map_id: 0,
            from: Position::new(0.0, 0.0, 1.0),
            to: Position::new(5.0, 0.0, 1.0),
        };
        for _ in 0..3 {
            assert_eq!(
                round_trip(&mut stream, &request),
                Response::LineOfSight {
                    in_line_of_sight: true
                }
            );
        }
        assert_eq!(server.requests_served(), 3);

        server.shutdown();
        assert_eq!(server.open_connections(), 0);
        assert!(read_frame(&mut stream).map(|frame| frame.is_none()).unwrap_or(true));
    }

    #[test]
    fn oversized_response_becomes_an_error_reply() {
        let corners = vec![Position::new(1.5, -2.5, 3.5); MAX_FRAME_LEN / 8];
        let bytes = encode_response(&Response::ComputePath { corners }).unwrap();
        assert!(bytes.len() <= MAX_FRAME_LEN);

        match Response::decode(&bytes).unwrap() {
            Response::Error { message } => assert!(message.contains("frame limit"), "{message}"),
            other => panic!("expected an error reply, got {other:?}"),
        }
    }

    #[test]
    fn ordinary_response_is_sent_unchanged() {
        let response = Response::LineOfSight {
            in_line_of_sight: false,
        };
        let bytes = encode_response(&response).unwrap();
        assert_eq!(Response::decode(&bytes).unwrap(), response);
    }
}
