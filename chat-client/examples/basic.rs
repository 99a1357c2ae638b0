//! Minimal end-to-end wiring of the controller against a live backend.
//!
//! ```sh
//! RUST_LOG=chatsync_client=debug cargo run --example basic
//! ```

use chatsync_client::{HttpHistoryFetcher, SyncConfig, SyncController, WsTransport};
use chat_types::{ConversationId, UserId};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = SyncConfig::default();
    let transport = WsTransport::new(&config.socket_base_url);
    let history = HttpHistoryFetcher::new(&config.history_base_url)?;
    let mut controller = SyncController::new(config, UserId::new(1), transport, history);

    controller.bind(ConversationId::new(1)).await;
    let mut timeline = controller.timeline();

    if let Err(e) = controller.send_message("hello from the example").await {
        tracing::warn!(error = %e, "send rejected");
    }

    // Print the timeline as polls refresh it.
    for _ in 0..5 {
        if timeline.changed().await.is_err() {
            break;
        }
        let messages = timeline.borrow_and_update().clone();
        for m in &messages {
            println!("[{}] {}: {}", m.created_at, m.sender, m.content);
        }
        println!("---");
    }

    controller.unbind().await;
    Ok(())
}
