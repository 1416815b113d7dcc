//! One task pair per accepted socket: a reader that decodes frames into
//! [`Event`]s, and a writer that drains an outbound queue.
//!
//! The wire-level state machine is `ReadingHeader -> ReadingBody(hdr) ->
//! ReadingHeader`, terminating in `Closing` on any I/O or decode error.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::codec::{self, body_padded_length, ErrorSubType, MainType, HEADER_LEN};
use crate::event::Event;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity for a connection, used as the `Registry`'s key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

enum ConnectionCommand {
    Write(Vec<u8>),
    Close,
}

/// A cheap, cloneable handle to a live connection's write queue.
///
/// This is this codebase's stand-in for the source's `weak_ptr<Connection>`:
/// once the writer task has exited, [`ConnectionHandle::write`] silently
/// drops the frame instead of reaching for a dangling pointer.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    pub addr: SocketAddr,
    tx: mpsc::UnboundedSender<ConnectionCommand>,
    closed: Arc<AtomicBool>,
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

impl std::hash::Hash for ConnectionHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Enqueue a pre-encoded frame for asynchronous send. At most one send
    /// is outstanding at a time; further writes are buffered in FIFO order
    /// behind it by the channel itself.
    pub fn write(&self, frame: Vec<u8>) {
        if self.tx.send(ConnectionCommand::Write(frame)).is_err() {
            trace!(connection = ?self.id, "dropped write: connection already closed");
        }
    }

    /// Convenience for sending a targeted `ERROR(UNKNOWN)` diagnostic.
    pub fn send_error(&self, diagnostic: &str) {
        let frame = codec::encode(
            MainType::Error,
            ErrorSubType::Unknown as u16,
            diagnostic.as_bytes(),
        );
        self.write(frame);
    }

    /// Best-effort shutdown; idempotent.
    pub fn close(&self) {
        let _ = self.tx.send(ConnectionCommand::Close);
    }
}

/// Spawn the reader/writer task pair for a freshly accepted socket and
/// return a handle to it.
pub fn spawn(
    socket: TcpStream,
    peer: SocketAddr,
    reactor_tx: mpsc::UnboundedSender<Event>,
) -> ConnectionHandle {
    let _ = socket.set_nodelay(true);
    let id = ConnectionId::next();
    let (read_half, write_half) = socket.into_split();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));

    let handle = ConnectionHandle {
        id,
        addr: peer,
        tx: cmd_tx,
        closed: closed.clone(),
    };

    tokio::spawn(write_loop(
        write_half,
        cmd_rx,
        reactor_tx.clone(),
        handle.clone(),
        closed.clone(),
    ));
    tokio::spawn(read_loop(read_half, reactor_tx, handle.clone(), closed));

    handle
}

async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut cmd_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    reactor_tx: mpsc::UnboundedSender<Event>,
    handle: ConnectionHandle,
    closed: Arc<AtomicBool>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            ConnectionCommand::Write(frame) => {
                if let Err(err) = write_half.write_all(&frame).await {
                    warn!(connection = ?handle.id(), peer = %handle.addr, %err, "send failed");
                    emit_close_once(&reactor_tx, &handle, &closed);
                    break;
                }
            }
            ConnectionCommand::Close => {
                let _ = write_half.shutdown().await;
                break;
            }
        }
    }
}

async fn read_loop(
    mut read_half: OwnedReadHalf,
    reactor_tx: mpsc::UnboundedSender<Event>,
    handle: ConnectionHandle,
    closed: Arc<AtomicBool>,
) {
    loop {
        let mut header_buf = [0u8; HEADER_LEN];
        if let Err(err) = read_half.read_exact(&mut header_buf).await {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                debug!(connection = ?handle.id(), peer = %handle.addr, "peer closed the connection");
            } else {
                warn!(connection = ?handle.id(), peer = %handle.addr, %err, "header read failed");
            }
            emit_close_once(&reactor_tx, &handle, &closed);
            return;
        }

        let header = match codec::decode_header(&header_buf) {
            Ok(header) => header,
            Err(err) => {
                warn!(connection = ?handle.id(), peer = %handle.addr, %err, "bad frame header");
                handle.send_error(&err.to_string());
                emit_close_once(&reactor_tx, &handle, &closed);
                return;
            }
        };

        let padded_len = body_padded_length(header.body_length) as usize;
        let mut body_buf = vec![0u8; padded_len];
        if let Err(err) = read_half.read_exact(&mut body_buf).await {
            warn!(connection = ?handle.id(), peer = %handle.addr, %err, "body read failed");
            emit_close_once(&reactor_tx, &handle, &closed);
            return;
        }
        body_buf.truncate(header.body_length as usize);

        trace!(
            connection = ?handle.id(),
            main = ?header.main_type,
            sub = header.sub_type,
            "decoded frame"
        );

        let event = Event::new(header.main_type, header.sub_type)
            .with_connection(handle.clone())
            .with_data(body_buf);

        if reactor_tx.send(event).is_err() {
            // reactor has shut down; nothing left to do.
            return;
        }
    }
}

/// Test-only helpers for constructing a [`ConnectionHandle`] without a real
/// socket, so other modules' unit tests can exercise the `Registry` and
/// handlers against an in-memory channel.
#[cfg(test)]
pub mod test_support {
    use super::*;

    /// A handle backed by a channel whose other end is immediately
    /// discarded, so `write`/`close` calls are accepted but go nowhere.
    pub fn fake_handle(addr: SocketAddr) -> ConnectionHandle {
        let (tx, mut rx) = mpsc::unbounded_channel::<ConnectionCommand>();
        tokio::spawn(async move { while rx.recv().await.is_some() {} });
        ConnectionHandle {
            id: ConnectionId::next(),
            addr,
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Emit the connection's single CLOSE event, no matter which side (reader or
/// writer) was first to notice the failure.
fn emit_close_once(
    reactor_tx: &mpsc::UnboundedSender<Event>,
    handle: &ConnectionHandle,
    closed: &Arc<AtomicBool>,
) {
    if closed.swap(true, Ordering::AcqRel) {
        return;
    }
    handle.close();
    let event = Event::new(MainType::Network, crate::codec::NetworkSubType::Close as u16)
        .with_connection(handle.clone());
    let _ = reactor_tx.send(event);
}
