//! Amazon SNS support.
//!
//! - [`TraceContextInterceptor`] injects the current trace context into the
//!   message attributes of `Publish` and `PublishBatch` requests.
//! - [`Entity`] models the JSON notification SNS delivers to subscribers,
//!   including SQS queues without raw message delivery. It implements
//!   [`TracedMessage`](crate::TracedMessage), so handlers of notifications can
//!   be wrapped with [`wrap_processor`](crate::wrap_processor).

mod attribute;
mod entity;
mod interceptor;

pub use attribute::{AttributeType, AttributeValue};
pub use entity::Entity;
pub use interceptor::TraceContextInterceptor;
