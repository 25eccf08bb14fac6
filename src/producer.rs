//! Standalone SNS producer: publishes each line read from stdin.
//!
//! Run with: cargo run --bin producer
use anyhow::Result;
use shared::{Note, SnsProducer, Telemetry};
use std::io::{self, Write};

mod shared;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = Telemetry::init("sns-producer")?;

    let config = shared::aws_config().await;
    let topic_arn = shared::env_var("SNS_TOPIC_ARN")?;
    tracing::info!(%topic_arn, "publishing");
    let producer = SnsProducer::new(shared::sns_client(&config), topic_arn);

    let mut next_id = 1;
    loop {
        print!("Enter message (or 'quit' to exit): ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match producer.publish(&Note::new(next_id, input)).await {
            Ok(_) => next_id += 1,
            Err(err) => tracing::error!(error = %err, "failed to publish"),
        }
    }

    telemetry.shutdown()
}
