//! Viewer endpoint.
//!
//! A [`Client`] connects to a sharing host, runs the join handshake, and
//! then speaks both directions of the session: window captures and chat
//! arrive as [`ConnectionEvent`]s from [`Client::next_event`], while the
//! `send_*` methods inject pointer and keyboard input back into the shared
//! window.
//!
//! Captures are delivered exactly as they travel on the wire, still
//! compressed. Run them through [`crate::compress::decompress`] to recover
//! the JPEG for decoding and display. The client never reconnects on its
//! own; that policy belongs to the host application.
//!
//! # Example
//!
//! ```rust,no_run
//! use remwin::client::Client;
//! use remwin::{compress, ConnectionEvent, Point};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = Client::connect("127.0.0.1:55555").await?;
//! client.wait_joined().await?;
//!
//! client.send_mouse_click(1, Point::new(100, 200), 0).await?;
//! client.send_chat_message("hello from the viewer").await?;
//!
//! while let Some(event) = client.next_event().await {
//!     if let ConnectionEvent::WindowCaptureReceived(blob) = event {
//!         let jpeg = compress::decompress(&blob)?;
//!         // hand `jpeg` to an image decoder
//!         drop(jpeg);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{ClientError, ClientResult};

use crate::connection::{
    drive, Connection, ConnectionEvent, Outbound, SessionState, OUTBOUND_QUEUE_SIZE,
};
use crate::datatypes::{KeyEvent, MouseEvent, Point};
use std::net::SocketAddr;
use tokio::net::ToSocketAddrs;
use tokio::sync::{mpsc, watch};

// Event channel depth between the connection task and the consumer.
const EVENT_QUEUE_SIZE: usize = 64;

/// A connected viewer.
///
/// The connection itself runs on its own task; this handle feeds it outbound
/// input and receives its typed events.
#[derive(Debug)]
pub struct Client {
    peer: SocketAddr,
    commands: mpsc::Sender<Outbound>,
    events: mpsc::Receiver<(SocketAddr, ConnectionEvent)>,
    session: watch::Receiver<SessionState>,
}

impl Client {
    /// Connect to a sharing host and start the join handshake.
    ///
    /// Returns as soon as `JoinSession` is on the wire; use
    /// [`Client::wait_joined`] to block until the host acks.
    pub async fn connect<T: ToSocketAddrs>(addr: T) -> ClientResult<Client> {
        let connection = Connection::connect(addr).await?;
        let peer = connection.peer_addr();
        let session = connection.subscribe_session_state();

        let (commands, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_SIZE);
        let (events_tx, events) = mpsc::channel(EVENT_QUEUE_SIZE);
        tokio::spawn(drive(connection, outbound_rx, events_tx));

        Ok(Client {
            peer,
            commands,
            events,
            session,
        })
    }

    /// Address of the host this client is connected to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Snapshot of the session handshake state.
    pub fn session_state(&self) -> SessionState {
        *self.session.borrow()
    }

    /// Wait until the host has acked the join.
    pub async fn wait_joined(&mut self) -> ClientResult<()> {
        self.session
            .wait_for(|state| *state == SessionState::Joined)
            .await
            .map_err(|_| ClientError::Closed)?;
        Ok(())
    }

    /// Receive the next event from the host.
    ///
    /// Returns `None` after the final [`ConnectionEvent::Disconnected`] has
    /// been consumed.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        self.events.recv().await.map(|(_, event)| event)
    }

    pub async fn send_mouse_move(&self, position: Point) -> ClientResult<()> {
        self.send(Outbound::MouseMove(position)).await
    }

    pub async fn send_mouse_press(
        &self,
        button: i32,
        position: Point,
        modifiers: i32,
    ) -> ClientResult<()> {
        self.send(Outbound::MousePress(MouseEvent::new(button, position, modifiers)))
            .await
    }

    pub async fn send_mouse_release(
        &self,
        button: i32,
        position: Point,
        modifiers: i32,
    ) -> ClientResult<()> {
        self.send(Outbound::MouseRelease(MouseEvent::new(button, position, modifiers)))
            .await
    }

    pub async fn send_mouse_click(
        &self,
        button: i32,
        position: Point,
        modifiers: i32,
    ) -> ClientResult<()> {
        self.send(Outbound::MouseClick(MouseEvent::new(button, position, modifiers)))
            .await
    }

    pub async fn send_key_press(&self, key: i32, modifiers: i32) -> ClientResult<()> {
        self.send(Outbound::KeyPress(KeyEvent::new(key, modifiers))).await
    }

    pub async fn send_key_release(&self, key: i32, modifiers: i32) -> ClientResult<()> {
        self.send(Outbound::KeyRelease(KeyEvent::new(key, modifiers))).await
    }

    /// Send a chat message; over-long text is truncated before framing.
    pub async fn send_chat_message(&self, text: &str) -> ClientResult<()> {
        self.send(Outbound::Chat(text.to_string())).await
    }

    async fn send(&self, command: Outbound) -> ClientResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::Closed)
    }

    /// Disconnect gracefully: the connection task sends `LeaveSession` if
    /// the session is joined, then closes the transport.
    pub async fn disconnect(mut self) {
        drop(self.commands);
        // Drain until the task delivers its final Disconnected and exits.
        while self.events.recv().await.is_some() {}
    }
}
