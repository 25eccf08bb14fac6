//! Publishes a few notes through SNS, then consumes them from the subscribed
//! SQS queue. Each processing span is linked to the span that published it.
//!
//! Run with: cargo run --bin sns-sqs-example
use anyhow::Result;
use shared::{Note, SnsProducer, SqsConsumer, Telemetry};
use std::time::Duration;
use tokio::time::sleep;

mod shared;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = Telemetry::init("sns-sqs-example")?;

    let config = shared::aws_config().await;
    let topic_arn = shared::env_var("SNS_TOPIC_ARN")?;
    let queue_url = shared::env_var("SQS_QUEUE_URL")?;
    tracing::info!(%topic_arn, %queue_url, "starting");

    let producer = SnsProducer::new(shared::sns_client(&config), topic_arn);
    let consumer = SqsConsumer::new(shared::sqs_client(&config), queue_url);

    for i in 1..=3 {
        producer
            .publish(&Note::new(i, format!("Test message number {i}")))
            .await?;
        sleep(Duration::from_millis(500)).await;
    }

    // Wait a bit for messages to propagate
    sleep(Duration::from_secs(2)).await;

    let mut received = 0;
    for _ in 0..3 {
        received += consumer.receive(10, 10).await?;
        sleep(Duration::from_secs(1)).await;
    }
    tracing::info!(received, "example completed");

    telemetry.shutdown()
}
