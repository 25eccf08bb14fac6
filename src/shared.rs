//! Setup, producer and consumer shared by the demo binaries.
#![allow(dead_code)]

use anyhow::{Context as _, Result};
use aws_config::{BehaviorVersion, SdkConfig};
use opentelemetry::context::FutureExt;
use opentelemetry::global;
use opentelemetry::trace::{SpanKind, TraceContextExt, TracerProvider as _};
use opentelemetry::Context;
use opentelemetry_aws_pubsub::{
    sns, sqs, MessageAttributesPropagator, ProcessSpanConfig, SpanStartOption,
};
use opentelemetry_sdk::trace::SdkTracerProvider;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Payload published through SNS and read back from SQS.
#[derive(Serialize, Deserialize, Debug)]
pub struct Note {
    pub id: u32,
    pub content: String,
    pub timestamp: String,
}

impl Note {
    pub fn new(id: u32, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Installed tracer provider; flushed and shut down by [`Telemetry::shutdown`].
pub struct Telemetry {
    tracer_provider: SdkTracerProvider,
}

impl Telemetry {
    /// Installs the Datadog tracer provider, the message attribute propagator,
    /// and a `tracing` subscriber bridged into OpenTelemetry.
    ///
    /// Log verbosity follows `RUST_LOG`, defaulting to `info`.
    pub fn init(service: &'static str) -> Result<Self> {
        let tracer_provider = datadog_opentelemetry::tracing().init();
        global::set_text_map_propagator(MessageAttributesPropagator::new());

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .with(tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer(service)))
            .try_init()
            .context("failed to install tracing subscriber")?;

        Ok(Self { tracer_provider })
    }

    pub fn shutdown(self) -> Result<()> {
        self.tracer_provider
            .shutdown()
            .context("failed to shut down tracer provider")
    }
}

pub async fn aws_config() -> SdkConfig {
    aws_config::load_defaults(BehaviorVersion::latest()).await
}

/// An SNS client injecting trace context into published messages.
pub fn sns_client(config: &SdkConfig) -> aws_sdk_sns::Client {
    let sns_config = aws_sdk_sns::config::Builder::from(config)
        .interceptor(sns::TraceContextInterceptor::new())
        .build();
    aws_sdk_sns::Client::from_conf(sns_config)
}

/// An SQS client injecting trace context into sent messages.
pub fn sqs_client(config: &SdkConfig) -> aws_sdk_sqs::Client {
    let sqs_config = aws_sdk_sqs::config::Builder::from(config)
        .interceptor(sqs::TraceContextInterceptor::new())
        .build();
    aws_sdk_sqs::Client::from_conf(sqs_config)
}

pub fn env_var(name: &str) -> Result<String> {
    anyhow::Context::with_context(std::env::var(name), || {
        format!("{name} environment variable not set")
    })
}

/// Publishes notes to an SNS topic.
pub struct SnsProducer {
    client: aws_sdk_sns::Client,
    topic_arn: String,
}

impl SnsProducer {
    pub fn new(client: aws_sdk_sns::Client, topic_arn: String) -> Self {
        Self { client, topic_arn }
    }

    /// Publishes `note` inside a `publish` span whose context is injected into
    /// the message attributes.
    pub async fn publish(&self, note: &Note) -> Result<Option<String>> {
        let span = tracing::info_span!("publish", note.id = note.id, topic = %self.topic_arn);
        let cx = span.context();

        let body = serde_json::to_string(note)?;
        let response = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .message(body)
            .subject(format!("Note {}", note.id))
            .send()
            .with_context(cx)
            .instrument(span)
            .await
            .context("failed to publish message to SNS")?;

        tracing::info!(note.id = note.id, message_id = ?response.message_id(), "published");
        Ok(response.message_id().map(str::to_owned))
    }
}

/// Receives SNS notifications from an SQS queue subscribed to the topic.
pub struct SqsConsumer {
    client: aws_sdk_sqs::Client,
    queue_url: String,
    config: ProcessSpanConfig,
}

impl SqsConsumer {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: String) -> Self {
        Self {
            client,
            queue_url,
            config: ProcessSpanConfig::new()
                .with_start_options([SpanStartOption::Kind(SpanKind::Consumer)]),
        }
    }

    /// Receives one batch of messages, processes each in its own span and
    /// deletes it. Returns the number of messages received.
    pub async fn receive(&self, max_messages: i32, wait_time_seconds: i32) -> Result<usize> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_time_seconds)
            .message_attribute_names("All")
            .send()
            .await
            .context("failed to receive messages from SQS")?;

        let messages = response.messages.unwrap_or_default();
        for msg in &messages {
            if let Err(err) = self.process(msg).await {
                tracing::warn!(error = %err, message_id = ?msg.message_id(), "failed to process message");
                continue;
            }
            if let Some(receipt_handle) = msg.receipt_handle() {
                self.client
                    .delete_message()
                    .queue_url(&self.queue_url)
                    .receipt_handle(receipt_handle)
                    .send()
                    .await
                    .context("failed to delete message")?;
            }
        }
        Ok(messages.len())
    }

    async fn process(&self, msg: &aws_sdk_sqs::types::Message) -> Result<()> {
        let body = msg.body().unwrap_or_default();
        match body.parse::<sns::Entity>() {
            // SNS wraps the published message and its attributes in an envelope.
            Ok(notification) if notification.kind == "Notification" => {
                let text = notification.message.as_str();
                self.config
                    .in_process_span(&Context::current(), &notification, |cx| async move {
                        handle(&cx, text)
                    })
                    .await
            }
            // Raw message delivery: attributes arrive as SQS message attributes.
            _ => {
                self.config
                    .in_process_span(&Context::current(), msg, |cx| async move { handle(&cx, body) })
                    .await
            }
        }
    }
}

fn handle(cx: &Context, body: &str) -> Result<()> {
    let note: Note = serde_json::from_str(body).context("message is not a note")?;
    let span_context = cx.span().span_context().clone();
    tracing::info!(
        note.id = note.id,
        content = %note.content,
        trace_id = %span_context.trace_id(),
        "received"
    );
    Ok(())
}
