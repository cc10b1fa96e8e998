//! Per-connection protocol state machine.
//!
//! A [`Connection`] owns one TCP transport, a bounded receive buffer, a
//! bounded queue of decoded frames, and the session handshake state. Framed
//! bytes go in via [`Connection::next_event`]; typed [`ConnectionEvent`]s
//! come out in arrival order. Send methods refuse to transmit anything but
//! handshake traffic until the session is joined.
//!
//! The state machine never treats malformed input as fatal: a desynchronized
//! or oversized receive buffer is discarded and parsing resumes at the next
//! start marker, a full queue drops its oldest entry, and unknown commands or
//! undecodable payloads drop just that message.

use crate::codec::{Decodable, Encodable};
use crate::datatypes::{ChatText, Command, KeyEvent, MouseEvent, Point};
use crate::frame::{self, Frame};
use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// Receive buffer cap. A buffer that grows past this without completing a
/// frame is discarded wholesale (parser resync).
pub const BUFFER_MAX_SIZE: usize = 20 * 1024 * 1024;

/// Decoded-frame queue cap. When full, the oldest entry is dropped before
/// the new one is enqueued: captures are latest-wins and input events are
/// best-effort, so stale entries are the right ones to lose.
pub const QUEUE_MAX_SIZE: usize = 25;

/// Outbound command channel depth for a driven connection.
pub(crate) const OUTBOUND_QUEUE_SIZE: usize = 32;

// Bound on the leave-session send during shutdown.
const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_millis(250);

/// Session handshake state of one connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No session negotiated (fresh connection, or after a leave).
    NoSession,
    /// Viewer role: `JoinSession` sent, waiting for the ack.
    Joining,
    /// Handshake complete; payload traffic flows.
    Joined,
}

// Parser cursor of the processing loop. Mirrors the message lifecycle:
// dequeue, classify, process, complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ProcessingState {
    ReadMessage,
    ReadCommand,
    ReadCommandDone,
    Process(Command),
}

/// Typed event delivered to the connection's owner.
#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionEvent {
    /// The session handshake state changed.
    SessionStateChanged(SessionState),
    /// A compressed window capture arrived.
    WindowCaptureReceived(Bytes),
    MouseMoveReceived(Point),
    MousePressReceived(MouseEvent),
    MouseReleaseReceived(MouseEvent),
    MouseClickReceived(MouseEvent),
    KeyPressReceived(KeyEvent),
    KeyReleaseReceived(KeyEvent),
    ChatMessageReceived(String),
    /// The transport closed; the connection is finished.
    Disconnected,
}

/// One framed TCP connection plus its session state machine.
#[derive(Debug)]
pub struct Connection {
    // Write-buffered stream; small handshake frames coalesce instead of
    // costing one syscall each.
    stream: BufWriter<TcpStream>,
    peer: SocketAddr,
    buffer: BytesMut,
    queue: VecDeque<Frame>,
    current: Option<Frame>,
    session: SessionState,
    processing: ProcessingState,
    state_tx: watch::Sender<SessionState>,
    // Outbound bytes the state machine owes the peer (handshake acks) and
    // the event it owes the owner. Both survive a dropped `next_event`
    // future; the next poll picks them up where the last one stopped.
    pending_write: BytesMut,
    pending_event: Option<ConnectionEvent>,
}

impl Connection {
    fn new(socket: TcpStream, peer: SocketAddr) -> Connection {
        let (state_tx, _) = watch::channel(SessionState::NoSession);
        Connection {
            stream: BufWriter::new(socket),
            peer,
            buffer: BytesMut::with_capacity(4 * 1024),
            queue: VecDeque::with_capacity(QUEUE_MAX_SIZE),
            current: None,
            session: SessionState::NoSession,
            processing: ProcessingState::ReadMessage,
            state_tx,
            pending_write: BytesMut::new(),
            pending_event: None,
        }
    }

    /// Wrap an accepted socket (host role). The session stays `NoSession`
    /// until the peer sends `JoinSession`.
    pub fn accept(socket: TcpStream) -> io::Result<Connection> {
        let peer = socket.peer_addr()?;
        Ok(Connection::new(socket, peer))
    }

    /// Connect to a host (viewer role) and open the handshake: transition to
    /// `Joining` and send `JoinSession`.
    pub async fn connect<T: ToSocketAddrs>(addr: T) -> crate::Result<Connection> {
        let socket = TcpStream::connect(addr).await?;
        let peer = socket.peer_addr()?;

        let mut connection = Connection::new(socket, peer);
        connection.set_session(SessionState::Joining);
        connection
            .send_message(Command::JoinSession, Bytes::new())
            .await?;
        Ok(connection)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn session_state(&self) -> SessionState {
        self.session
    }

    /// Watch the session state from outside the task that owns the
    /// connection.
    pub fn subscribe_session_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Produce the next typed event.
    ///
    /// Drains the message queue through the processing loop first; only when
    /// no queued message yields an event does it read more bytes from the
    /// transport. Returns `Ok(None)` once the peer closes the connection.
    ///
    /// Cancel safety: the processing loop is synchronous, so a session
    /// transition, its handshake ack and its event are all staged in `self`
    /// before the next await point. The awaits are the staged-write drain
    /// (each socket write consumes some of the stage or nothing) and the
    /// socket read (buffered data survives in `self`). Dropping the returned
    /// future between polls loses no frame, no transition and no event.
    pub async fn next_event(&mut self) -> crate::Result<Option<ConnectionEvent>> {
        loop {
            // Bytes owed to the peer go out before the owner sees the event
            // that produced them.
            self.flush_pending().await?;

            if let Some(event) = self.pending_event.take() {
                return Ok(Some(event));
            }

            if let Some(event) = self.process() {
                self.pending_event = Some(event);
                continue;
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                // Peer closed. Drop any half-received frame with the session.
                self.buffer.clear();
                self.set_session(SessionState::NoSession);
                return Ok(None);
            }

            self.drain_frames();
        }
    }

    // Run the processing loop until an event is produced or the queue is
    // exhausted. Synchronous: any bytes to transmit are staged, never
    // written here.
    fn process(&mut self) -> Option<ConnectionEvent> {
        loop {
            match self.processing {
                ProcessingState::ReadMessage => match self.queue.pop_front() {
                    None => return None,
                    Some(frame) => {
                        self.current = Some(frame);
                        self.processing = ProcessingState::ReadCommand;
                    }
                },
                ProcessingState::ReadCommand => {
                    let command = self.current.as_ref().map(|frame| frame.command);
                    self.processing = match command {
                        Some(Command::Unknown) | None => {
                            trace!(peer = %self.peer, "dropping message with unknown command");
                            self.current = None;
                            ProcessingState::ReadMessage
                        }
                        Some(command) => ProcessingState::Process(command),
                    };
                }
                ProcessingState::ReadCommandDone => {
                    self.processing = ProcessingState::ReadMessage;
                }
                ProcessingState::Process(command) => {
                    let payload = match self.current.take() {
                        Some(frame) => frame.payload,
                        None => Bytes::new(),
                    };
                    self.processing = ProcessingState::ReadCommandDone;
                    if let Some(event) = self.process_command(command, payload) {
                        return Some(event);
                    }
                }
            }
        }
    }

    fn process_command(&mut self, command: Command, payload: Bytes) -> Option<ConnectionEvent> {
        match command {
            Command::JoinSession => {
                if self.session == SessionState::NoSession {
                    self.stage_message(Command::JoinSessionAck, Bytes::new());
                    self.set_session(SessionState::Joined)
                } else {
                    // Duplicate join while joined is silently ignored.
                    debug!(peer = %self.peer, state = ?self.session, "ignoring join in current state");
                    None
                }
            }
            Command::JoinSessionAck => {
                if self.session == SessionState::Joining {
                    self.set_session(SessionState::Joined)
                } else {
                    None
                }
            }
            Command::LeaveSession => self.set_session(SessionState::NoSession),
            Command::WindowCapture => {
                if payload.is_empty() {
                    None
                } else {
                    Some(ConnectionEvent::WindowCaptureReceived(payload))
                }
            }
            Command::MouseMove => {
                Self::decode_payload(&payload, command).map(ConnectionEvent::MouseMoveReceived)
            }
            Command::MousePress => {
                Self::decode_payload(&payload, command).map(ConnectionEvent::MousePressReceived)
            }
            Command::MouseRelease => {
                Self::decode_payload(&payload, command).map(ConnectionEvent::MouseReleaseReceived)
            }
            Command::MouseClick => {
                Self::decode_payload(&payload, command).map(ConnectionEvent::MouseClickReceived)
            }
            Command::KeyPress => {
                Self::decode_payload(&payload, command).map(ConnectionEvent::KeyPressReceived)
            }
            Command::KeyRelease => {
                Self::decode_payload(&payload, command).map(ConnectionEvent::KeyReleaseReceived)
            }
            Command::ChatMessage => Self::decode_payload::<ChatText>(&payload, command)
                .map(|text| ConnectionEvent::ChatMessageReceived(text.into_string())),
            Command::Unknown => None,
        }
    }

    // Queue an outbound frame for the cancel-safe drain in `next_event`.
    // Only the state machine stages messages, so staged traffic is always
    // handshake traffic and bypasses the session gate by construction.
    fn stage_message(&mut self, command: Command, payload: Bytes) {
        let encoded = Frame::new(command, payload).encode();
        self.pending_write.extend_from_slice(&encoded);
    }

    // Drain staged bytes. Each socket write either consumes part of the
    // stage or nothing, so a future dropped at the await point leaves the
    // stage intact and the next call resumes where this one stopped.
    async fn flush_pending(&mut self) -> io::Result<()> {
        if self.pending_write.is_empty() {
            return Ok(());
        }
        while !self.pending_write.is_empty() {
            let written = self.stream.write(&self.pending_write).await?;
            if written == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            let _ = self.pending_write.split_to(written);
        }
        self.stream.flush().await
    }

    // A payload that fails to decode drops the message, nothing more.
    fn decode_payload<T: Decodable>(payload: &[u8], command: Command) -> Option<T> {
        match T::from_payload(payload) {
            Ok(value) => Some(value),
            Err(error) => {
                debug!(?command, %error, "dropping message with undecodable payload");
                None
            }
        }
    }

    fn set_session(&mut self, state: SessionState) -> Option<ConnectionEvent> {
        if self.session == state {
            return None;
        }
        self.session = state;
        self.state_tx.send_replace(state);
        Some(ConnectionEvent::SessionStateChanged(state))
    }

    // Move every complete frame out of the receive buffer into the queue,
    // applying the failure policy: desync or overflow clears the buffer,
    // a full queue drops its oldest entry.
    fn drain_frames(&mut self) {
        loop {
            match Frame::parse(&mut self.buffer) {
                Ok(frame) => self.enqueue(frame),
                Err(frame::Error::Incomplete) => {
                    if self.buffer.len() > BUFFER_MAX_SIZE {
                        warn!(
                            peer = %self.peer,
                            buffered = self.buffer.len(),
                            "receive buffer overflow without a complete frame, resyncing"
                        );
                        self.buffer.clear();
                    }
                    return;
                }
                Err(frame::Error::Desync) => {
                    warn!(peer = %self.peer, "frame desync, discarding receive buffer");
                    self.buffer.clear();
                    return;
                }
            }
        }
    }

    fn enqueue(&mut self, frame: Frame) {
        if self.queue.len() == QUEUE_MAX_SIZE {
            trace!(peer = %self.peer, "message queue full, dropping oldest");
            self.queue.pop_front();
        }
        self.queue.push_back(frame);
    }

    /// Send a compressed window capture. Empty blobs are dropped.
    pub async fn send_window_capture(&mut self, data: Bytes) -> io::Result<bool> {
        if data.is_empty() {
            return Ok(false);
        }
        self.send_message(Command::WindowCapture, data).await
    }

    pub async fn send_mouse_move(&mut self, position: Point) -> io::Result<bool> {
        self.send_message(Command::MouseMove, position.to_payload())
            .await
    }

    pub async fn send_mouse_press(
        &mut self,
        button: i32,
        position: Point,
        modifiers: i32,
    ) -> io::Result<bool> {
        self.send_mouse_event(Command::MousePress, button, position, modifiers)
            .await
    }

    pub async fn send_mouse_release(
        &mut self,
        button: i32,
        position: Point,
        modifiers: i32,
    ) -> io::Result<bool> {
        self.send_mouse_event(Command::MouseRelease, button, position, modifiers)
            .await
    }

    pub async fn send_mouse_click(
        &mut self,
        button: i32,
        position: Point,
        modifiers: i32,
    ) -> io::Result<bool> {
        self.send_mouse_event(Command::MouseClick, button, position, modifiers)
            .await
    }

    pub async fn send_key_press(&mut self, key: i32, modifiers: i32) -> io::Result<bool> {
        self.send_key_event(Command::KeyPress, key, modifiers).await
    }

    pub async fn send_key_release(&mut self, key: i32, modifiers: i32) -> io::Result<bool> {
        self.send_key_event(Command::KeyRelease, key, modifiers)
            .await
    }

    /// Send a chat message, truncating over-long text.
    pub async fn send_chat_message(&mut self, text: &str) -> io::Result<bool> {
        let payload = ChatText::new(text).to_payload();
        self.send_message(Command::ChatMessage, payload).await
    }

    async fn send_mouse_event(
        &mut self,
        command: Command,
        button: i32,
        position: Point,
        modifiers: i32,
    ) -> io::Result<bool> {
        let payload = MouseEvent::new(button, position, modifiers).to_payload();
        self.send_message(command, payload).await
    }

    async fn send_key_event(
        &mut self,
        command: Command,
        key: i32,
        modifiers: i32,
    ) -> io::Result<bool> {
        let payload = KeyEvent::new(key, modifiers).to_payload();
        self.send_message(command, payload).await
    }

    /// Frame and transmit one message.
    ///
    /// Returns `Ok(false)` without touching the transport when the session
    /// gate refuses the send: everything except handshake traffic requires
    /// `Joined`.
    async fn send_message(&mut self, command: Command, payload: Bytes) -> io::Result<bool> {
        if self.session != SessionState::Joined && !command.is_handshake() {
            return Ok(false);
        }

        // Staged handshake traffic keeps its place ahead of this frame.
        self.flush_pending().await?;

        let encoded = Frame::new(command, payload).encode();
        self.stream.write_all(&encoded).await?;
        self.stream.flush().await?;
        Ok(true)
    }

    /// Graceful teardown: leave the session if joined (with a bounded wait
    /// for the write to drain), then shut the transport down.
    pub async fn shutdown(&mut self) {
        if self.session == SessionState::Joined {
            // send_message drains any staged ack ahead of the leave.
            let leave = self.send_message(Command::LeaveSession, Bytes::new());
            if timeout(SHUTDOWN_FLUSH_TIMEOUT, leave).await.is_err() {
                debug!(peer = %self.peer, "leave-session flush timed out");
            }
            self.set_session(SessionState::NoSession);
        } else if !self.pending_write.is_empty() {
            if timeout(SHUTDOWN_FLUSH_TIMEOUT, self.flush_pending()).await.is_err() {
                debug!(peer = %self.peer, "staged write drain timed out");
            }
        }
        let _ = self.stream.shutdown().await;
    }
}

/// Outbound command for a connection running on its own task.
#[derive(Clone, Debug)]
pub(crate) enum Outbound {
    Capture(Bytes),
    MouseMove(Point),
    MousePress(MouseEvent),
    MouseRelease(MouseEvent),
    MouseClick(MouseEvent),
    KeyPress(KeyEvent),
    KeyRelease(KeyEvent),
    Chat(String),
}

/// Run one connection to completion on the current task.
///
/// Multiplexes the outbound command channel against inbound events; events
/// are forwarded to the owner tagged with the peer address. The loop ends
/// when the peer disconnects, the transport errors, or the owner drops the
/// command sender; the teardown path always runs the `Joined`-leave
/// handshake and always delivers a final `Disconnected` event.
pub(crate) async fn drive(
    mut connection: Connection,
    mut outbound: mpsc::Receiver<Outbound>,
    events: mpsc::Sender<(SocketAddr, ConnectionEvent)>,
) {
    let peer = connection.peer_addr();

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(command) => {
                    if let Err(error) = apply(&mut connection, command).await {
                        debug!(%peer, %error, "write failed, closing connection");
                        break;
                    }
                }
                // Owner dropped the handle: destruction path.
                None => break,
            },
            event = connection.next_event() => match event {
                Ok(Some(event)) => {
                    if events.send((peer, event)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    debug!(%peer, %error, "read failed, closing connection");
                    break;
                }
            },
        }
    }

    connection.shutdown().await;
    let _ = events.send((peer, ConnectionEvent::Disconnected)).await;
}

async fn apply(connection: &mut Connection, command: Outbound) -> io::Result<()> {
    match command {
        Outbound::Capture(data) => connection.send_window_capture(data).await?,
        Outbound::MouseMove(position) => connection.send_mouse_move(position).await?,
        Outbound::MousePress(event) => {
            connection
                .send_mouse_press(event.button, event.position, event.modifiers)
                .await?
        }
        Outbound::MouseRelease(event) => {
            connection
                .send_mouse_release(event.button, event.position, event.modifiers)
                .await?
        }
        Outbound::MouseClick(event) => {
            connection
                .send_mouse_click(event.button, event.position, event.modifiers)
                .await?
        }
        Outbound::KeyPress(event) => connection.send_key_press(event.key, event.modifiers).await?,
        Outbound::KeyRelease(event) => {
            connection
                .send_key_release(event.key, event.modifiers)
                .await?
        }
        Outbound::Chat(text) => connection.send_chat_message(&text).await?,
    };
    Ok(())
}
