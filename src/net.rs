//! TCP transport for pipeline edges.
//!
//! A network sink listens for exactly one connection and streams its input sequence into it,
//! a network source dials that address and decodes the stream back into a sequence.
//! The byte stream uses the plain record layout, the same as files.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use crate::error::PipelineError;
use crate::sequence::{Sequence, Stage};
use crate::sink::write_sink;
use crate::source::spawn_reader;

/// Listening end of a network pipeline edge.
pub struct NetworkSink {
    local_addr: SocketAddr,
    stage: Stage,
}

impl NetworkSink {
    /// Returns the address the sink is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Converts the sink into its stage handle.
    pub fn into_stage(self) -> Stage {
        self.stage
    }

    /// Waits until the input has been drained into the connection.
    pub fn join(self) -> Result<(), PipelineError> {
        self.stage.join()
    }

    /// Connects to the sink and hangs up at once, so a sink nobody is going to dial
    /// stops waiting for a connection and drops its input.
    pub fn release(&self) {
        match TcpStream::connect(self.local_addr) {
            Ok(stream) => drop(stream),
            Err(err) => log::warn!("network sink {} not released: {}", self.local_addr, err),
        }
    }
}

/// Binds `addr` and serves the input to the first accepted connection in background.
/// Returns as soon as the listener is bound, binding port `0` picks a free port.
///
/// # Arguments
/// * `addr` - Address to listen on
/// * `input` - Sequence to be sent
/// * `buf_size` - Socket write buffer size. If the parameter is [`None`] default capacity is used.
pub fn network_sink<A: ToSocketAddrs>(
    addr: A,
    input: Sequence,
    buf_size: Option<usize>,
) -> Result<NetworkSink, PipelineError> {
    let listener = TcpListener::bind(addr).map_err(PipelineError::Connection)?;
    let local_addr = listener.local_addr().map_err(PipelineError::Connection)?;
    log::info!("network sink listening on {}", local_addr);

    let stage = Stage::spawn("network sink", move || {
        let (stream, peer_addr) = listener.accept().map_err(PipelineError::Connection)?;
        drop(listener);
        log::debug!("network sink {} serving {}", local_addr, peer_addr);

        let writer = match buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, stream),
            None => io::BufWriter::new(stream),
        };
        match write_sink(writer, input) {
            Ok(written) => log::debug!("network sink {} done ({} records)", local_addr, written),
            // the peer stopped reading, same as a dropped queue receiver
            Err(PipelineError::IO(err)) if is_disconnect(&err) => {
                log::debug!("network sink {} stopped, peer disconnected: {}", local_addr, err)
            }
            Err(err) => return Err(err),
        }

        return Ok(());
    });

    return Ok(NetworkSink { local_addr, stage });
}

fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
    )
}

/// Dials `addr` and decodes records from the connection until the peer closes it.
///
/// # Arguments
/// * `addr` - Address of a network sink
/// * `capacity` - Output queue capacity
/// * `buf_size` - Socket read buffer size. If the parameter is [`None`] default capacity is used.
pub fn network_source<A: ToSocketAddrs>(
    addr: A,
    capacity: usize,
    buf_size: Option<usize>,
) -> Result<Sequence, PipelineError> {
    let stream = TcpStream::connect(addr).map_err(PipelineError::Connection)?;
    if let Ok(peer_addr) = stream.peer_addr() {
        log::debug!("network source connected to {}", peer_addr);
    }

    let reader = match buf_size {
        Some(buf_size) => io::BufReader::with_capacity(buf_size, stream),
        None => io::BufReader::new(stream),
    };

    return Ok(spawn_reader("network source", reader, None, capacity));
}
