//! Amazon SQS support.
//!
//! - [`TraceContextInterceptor`] injects the current trace context into the
//!   message attributes of `SendMessage` and `SendMessageBatch` requests.
//! - [`Event`] and [`Message`] model the payload of the Lambda SQS event
//!   source. [`Message`] and the SDK's `aws_sdk_sqs::types::Message` both
//!   implement [`TracedMessage`](crate::TracedMessage).

mod attribute;
mod interceptor;
mod message;

pub use attribute::{AttributeKind, AttributeType, AttributeValue};
pub use interceptor::TraceContextInterceptor;
pub use message::{Event, Message};
