//! Demo viewer: joins a host, optionally says hello, and logs what arrives.
//!
//! ```text
//! cargo run --example viewer -- 127.0.0.1:55555 --chat "hello"
//! ```

use argh::FromArgs;
use remwin::client::Client;
use remwin::{compress, ConnectionEvent};
use tracing::info;

#[derive(FromArgs)]
/// Connect to a sharing host and log the session traffic.
struct Args {
    /// host:port of the sharing server
    #[argh(positional)]
    addr: String,

    /// chat message to send after joining
    #[argh(option)]
    chat: Option<String>,
}

#[tokio::main]
async fn main() -> remwin::Result<()> {
    tracing_subscriber::fmt::init();
    let args: Args = argh::from_env();

    let mut client = Client::connect(args.addr.as_str()).await?;
    client.wait_joined().await?;
    info!(host = %client.peer_addr(), "session joined");

    if let Some(text) = &args.chat {
        client.send_chat_message(text).await?;
    }

    while let Some(event) = client.next_event().await {
        match event {
            ConnectionEvent::WindowCaptureReceived(blob) => {
                let jpeg = compress::decompress(&blob)?;
                info!(
                    compressed = blob.len(),
                    decoded = jpeg.len(),
                    "capture received"
                );
            }
            ConnectionEvent::ChatMessageReceived(text) => info!(%text, "chat received"),
            ConnectionEvent::SessionStateChanged(state) => info!(?state, "session state"),
            ConnectionEvent::Disconnected => break,
            other => info!(?other, "event"),
        }
    }

    info!("host went away, exiting");
    Ok(())
}
