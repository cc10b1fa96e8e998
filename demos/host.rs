//! Demo host: shares a synthetic test pattern and logs injected input.
//!
//! ```text
//! cargo run --example host -- --port 55555
//! ```

use argh::FromArgs;
use remwin::server::{EventSink, Server, ServerConfig};
use remwin::{MouseEvent, Point};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

#[derive(FromArgs)]
/// Share a synthetic test pattern over the session protocol.
struct Args {
    /// TCP port to listen on
    #[argh(option, short = 'p', default = "55555")]
    port: u16,

    /// capture interval in milliseconds
    #[argh(option, default = "25")]
    interval_ms: u64,
}

struct LogSink;

impl EventSink for LogSink {
    fn mouse_move(&mut self, position: Point) {
        info!(?position, "mouse move");
    }

    fn mouse_click(&mut self, event: MouseEvent) {
        info!(?event, "mouse click");
    }

    fn key_press(&mut self, key: i32, modifiers: i32) {
        info!(key, modifiers, "key press");
    }

    fn chat_message(&mut self, peer: SocketAddr, text: &str) {
        info!(%peer, text, "chat");
    }
}

#[tokio::main]
async fn main() -> remwin::Result<()> {
    tracing_subscriber::fmt::init();
    let args: Args = argh::from_env();

    // No real screen grabber here: each tick produces a counter pattern so
    // viewers have something to look at on the wire.
    let mut frame_no = 0u64;
    let source = move |_window: Option<u64>, quality: f32| {
        frame_no += 1;
        Some(format!("synthetic frame {frame_no} at quality {quality:.2}").into_bytes())
    };

    let config = ServerConfig::default()
        .with_port(args.port)
        .with_update_delay(Duration::from_millis(args.interval_ms));
    let server = Server::start(config, Some(Box::new(source)), LogSink).await?;
    info!(addr = %server.local_addr(), "host ready, waiting for viewers");

    let mut count = server.client_count_changed();
    loop {
        count.changed().await?;
        info!(viewers = *count.borrow(), "viewer count changed");
    }
}
