// ABOUTME: The window sharing hub: accepts viewers, runs the capture tick,
// ABOUTME: fans captures out and routes injected input to the host sinks

use crate::compress::compress;
use crate::connection::{drive, Connection, ConnectionEvent, Outbound, OUTBOUND_QUEUE_SIZE};
use crate::server::config::ServerConfig;
use crate::server::traits::{CaptureSource, EventSink};
use bytes::Bytes;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

// Depth of the hub's tagged event channel. Connection tasks block (briefly)
// when the hub falls this far behind.
const EVENT_QUEUE_SIZE: usize = 256;

/// Errors surfaced by [`Server::start`].
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the listen socket failed (port in use, permissions, ...).
    #[error("failed to bind listen socket: {0}")]
    Bind(#[source] io::Error),
}

/// The window sharing host.
///
/// Listens for viewer connections, runs one [`Connection`] task per viewer,
/// broadcasts compressed captures on a periodic tick, and routes injected
/// pointer/keyboard/chat events into the host-supplied [`EventSink`].
///
/// The hub itself is a single task owning the connection set; accept,
/// disconnect, event routing and the capture tick all serialize there, so
/// the fan-out never races a connection-set mutation.
///
/// # Example
///
/// ```rust,no_run
/// use remwin::server::{Server, ServerConfig};
///
/// # async fn example() -> Result<(), remwin::server::ServerError> {
/// let source = |_window: Option<u64>, _quality: f32| -> Option<Vec<u8>> {
///     None // plug a platform screen grabber in here
/// };
/// let server = Server::start(ServerConfig::default(), Some(Box::new(source)), ()).await?;
/// println!("sharing on {}", server.local_addr());
/// # server.stop().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Server {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    count_rx: watch::Receiver<usize>,
    task: JoinHandle<()>,
}

impl Server {
    /// Bind the configured port and start the hub.
    ///
    /// `capture` is the optional capture source; with `None` the tick never
    /// sends anything (screen capture is a host concern, there is no
    /// built-in grabber). `sink` receives the injected input events.
    pub async fn start<S: EventSink>(
        config: ServerConfig,
        capture: Option<Box<dyn CaptureSource>>,
        sink: S,
    ) -> Result<Server, ServerError> {
        let listener = TcpListener::bind(("0.0.0.0", config.port))
            .await
            .map_err(ServerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ServerError::Bind)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (count_tx, count_rx) = watch::channel(0usize);
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);

        let state = HubState {
            config,
            capture,
            sink,
            connections: HashMap::new(),
            events_tx,
            count_tx,
        };
        let task = tokio::spawn(run(state, listener, events_rx, shutdown_rx));

        info!(%local_addr, "window sharing server started");
        Ok(Server {
            local_addr,
            shutdown_tx,
            count_rx,
            task,
        })
    }

    /// The bound listen address (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently connected viewers.
    pub fn client_count(&self) -> usize {
        *self.count_rx.borrow()
    }

    /// Watch the viewer count; fires on every connect and disconnect.
    pub fn client_count_changed(&self) -> watch::Receiver<usize> {
        self.count_rx.clone()
    }

    /// Stop listening and tear every connection down.
    ///
    /// Joined viewers receive a `LeaveSession` before their transport
    /// closes; the call returns once all connection tasks have finished.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
        info!("window sharing server stopped");
    }
}

// Everything the hub mutates while running. Kept separate from the listener
// and channel receivers so the select arms and their handlers can borrow
// disjoint locals.
struct HubState<S> {
    config: ServerConfig,
    capture: Option<Box<dyn CaptureSource>>,
    sink: S,
    connections: HashMap<SocketAddr, ConnectionHandle>,
    events_tx: mpsc::Sender<(SocketAddr, ConnectionEvent)>,
    count_tx: watch::Sender<usize>,
}

struct ConnectionHandle {
    outbound: mpsc::Sender<Outbound>,
}

async fn run<S: EventSink>(
    mut state: HubState<S>,
    listener: TcpListener,
    mut events_rx: mpsc::Receiver<(SocketAddr, ConnectionEvent)>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut tick = interval(state.config.update_delay);
    // A tick that overruns its slot runs once, late, instead of bursting.
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((socket, _)) => state.handle_accept(socket, &mut tick),
                Err(error) => warn!(%error, "accept failed"),
            },
            Some((peer, event)) = events_rx.recv() => state.handle_event(peer, event),
            // The capture tick runs iff at least one viewer is connected.
            _ = tick.tick(), if !state.connections.is_empty() => state.handle_tick(),
            _ = shutdown_rx.changed() => break,
        }
    }

    drop(listener);
    state.teardown(events_rx).await;
}

impl<S: EventSink> HubState<S> {
    fn handle_accept(&mut self, socket: TcpStream, tick: &mut Interval) {
        let connection = match Connection::accept(socket) {
            Ok(connection) => connection,
            Err(error) => {
                warn!(%error, "failed to register accepted socket");
                return;
            }
        };

        let peer = connection.peer_addr();
        debug!(%peer, "viewer connected");

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_SIZE);
        tokio::spawn(drive(connection, outbound_rx, self.events_tx.clone()));

        if self.connections.is_empty() {
            // First viewer: the capture tick starts counting from now.
            tick.reset();
        }

        // A reconnect from the same address replaces the stale handle; its
        // task ends when it notices the dropped sender or dead socket.
        self.connections
            .insert(peer, ConnectionHandle { outbound: outbound_tx });
        self.publish_count();
        self.broadcast_chat(None, &format!("{peer}: joined the chat"));
    }

    fn handle_event(&mut self, peer: SocketAddr, event: ConnectionEvent) {
        match event {
            ConnectionEvent::MouseMoveReceived(position) => self.sink.mouse_move(position),
            ConnectionEvent::MousePressReceived(event) => self.sink.mouse_press(event),
            ConnectionEvent::MouseReleaseReceived(event) => self.sink.mouse_release(event),
            ConnectionEvent::MouseClickReceived(event) => self.sink.mouse_click(event),
            ConnectionEvent::KeyPressReceived(event) => {
                self.sink.key_press(event.key, event.modifiers);
            }
            ConnectionEvent::KeyReleaseReceived(event) => {
                self.sink.key_release(event.key, event.modifiers);
            }
            ConnectionEvent::ChatMessageReceived(text) => {
                self.sink.chat_message(peer, &text);
                self.broadcast_chat(Some(peer), &format!("{peer}: {text}"));
            }
            ConnectionEvent::SessionStateChanged(session) => {
                debug!(%peer, ?session, "session state changed");
            }
            // Viewers do not send captures; a host that receives one ignores it.
            ConnectionEvent::WindowCaptureReceived(_) => {
                trace!(%peer, "ignoring window capture from viewer");
            }
            ConnectionEvent::Disconnected => self.handle_disconnect(peer),
        }
    }

    fn handle_disconnect(&mut self, peer: SocketAddr) {
        if self.connections.remove(&peer).is_none() {
            // Stale handle already replaced by a reconnect.
            return;
        }
        debug!(%peer, "viewer disconnected");
        self.publish_count();
        self.broadcast_chat(None, &format!("{peer}: left the chat"));
    }

    // One capture tick: grab, compress, fan out. Serial iteration; writes
    // are non-blocking hand-offs to each connection task, so a slow viewer
    // only loses its own frames.
    fn handle_tick(&mut self) {
        let Some(source) = self.capture.as_mut() else {
            return;
        };
        let Some(blob) = source.capture(self.config.window, self.config.quality) else {
            return;
        };
        if blob.is_empty() {
            return;
        }

        let compressed = Bytes::from(compress(&blob));
        for (peer, handle) in &self.connections {
            if handle
                .outbound
                .try_send(Outbound::Capture(compressed.clone()))
                .is_err()
            {
                trace!(%peer, "outbound queue full, dropping capture");
            }
        }
    }

    fn broadcast_chat(&self, exclude: Option<SocketAddr>, text: &str) {
        for (peer, handle) in &self.connections {
            if Some(*peer) == exclude {
                continue;
            }
            if handle
                .outbound
                .try_send(Outbound::Chat(text.to_string()))
                .is_err()
            {
                trace!(%peer, "outbound queue full, dropping chat notice");
            }
        }
    }

    fn publish_count(&self) {
        self.count_tx.send_replace(self.connections.len());
    }

    // Destroy every connection and wait for their tasks: dropping the
    // outbound senders makes each task run its leave handshake, and the
    // event channel closing signals that the last task has finished.
    async fn teardown(mut self, mut events_rx: mpsc::Receiver<(SocketAddr, ConnectionEvent)>) {
        self.connections.clear();
        self.count_tx.send_replace(0);
        drop(self.events_tx);

        while events_rx.recv().await.is_some() {}
    }
}
