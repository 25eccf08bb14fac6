//! Standalone SQS consumer: long-polls the queue until interrupted.
//!
//! Run with: cargo run --bin consumer
use anyhow::{Context, Result};
use shared::{SqsConsumer, Telemetry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

mod shared;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = Telemetry::init("sqs-consumer")?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .context("failed to install Ctrl+C handler")?;

    let config = shared::aws_config().await;
    let queue_url = shared::env_var("SQS_QUEUE_URL")?;
    tracing::info!(%queue_url, "polling for messages, press Ctrl+C to stop");
    let consumer = SqsConsumer::new(shared::sqs_client(&config), queue_url);

    let mut received = 0;
    while running.load(Ordering::SeqCst) {
        match consumer.receive(10, 20).await {
            Ok(count) => received += count,
            Err(err) => {
                tracing::error!(error = %err, "failed to receive messages");
                sleep(Duration::from_secs(5)).await;
            }
        }
    }
    tracing::info!(received, "stopped");

    telemetry.shutdown()
}
