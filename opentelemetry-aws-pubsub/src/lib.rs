//! OpenTelemetry trace-context propagation through AWS SNS and SQS message
//! attributes.
//!
//! A producer's span context travels as two String-typed message attributes,
//! `otel.trace_id` and `otel.span_id`. Consumers start a `process` span per
//! message, linked to the producer span.
//!
//! # Features
//!
//! - `sns` - SNS publish interceptor and notification types (enabled by default)
//! - `sqs` - SQS send interceptor and Lambda event types (enabled by default)
//!
//! # Example
//!
//! ## Publishing to SNS with trace context
//!
//! ```ignore
//! use opentelemetry::context::FutureExt;
//! use opentelemetry_aws_pubsub::sns::TraceContextInterceptor;
//!
//! let sns_config = aws_sdk_sns::config::Builder::from(&sdk_config)
//!     .interceptor(TraceContextInterceptor::new())
//!     .build();
//! let client = aws_sdk_sns::Client::from_conf(sns_config);
//!
//! client.publish()
//!     .topic_arn(&topic_arn)
//!     .message(&message_body)
//!     .send()
//!     .with_context(cx)
//!     .await?;
//! ```
//!
//! ## Consuming from SQS with trace context
//!
//! ```ignore
//! use opentelemetry::Context;
//! use opentelemetry_aws_pubsub::{sns, wrap_processor, ProcessSpanConfig};
//!
//! let process = wrap_processor(
//!     |cx: &Context, notification: &sns::Entity| handle(cx, &notification.message),
//!     ProcessSpanConfig::new(),
//! );
//!
//! let notification: sns::Entity = msg.body().unwrap_or_default().parse()?;
//! process(&Context::current(), &notification)?;
//! ```

#[cfg(any(feature = "sns", feature = "sqs"))]
mod binary;
pub mod carrier;
pub mod error;
pub mod process;
pub mod propagator;

#[cfg(feature = "sns")]
pub mod sns;

#[cfg(feature = "sqs")]
pub mod sqs;

// Re-exports for convenience
pub use carrier::MessageAttributeCarrier;
pub use error::Error;
pub use process::{
    wrap_processor, wrap_yielder, GlobalProvider, ProcessSpanConfig, SpanStartOption,
    TracedMessage, PROCESS_SPAN_NAME,
};
pub use propagator::{
    extract_remote_span_context, MessageAttributesPropagator, SPAN_ID_KEY, TRACE_ID_KEY,
};
