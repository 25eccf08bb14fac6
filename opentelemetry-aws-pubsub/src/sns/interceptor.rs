//! SNS publish interceptor for OpenTelemetry context propagation.
//!
//! This module provides an AWS SDK interceptor that injects the current trace
//! context into the message attributes of `Publish` and `PublishBatch` calls.

use crate::carrier::{impl_sdk_string_attribute, MessageAttributeCarrier};
use crate::propagator::MessageAttributesPropagator;
use aws_sdk_sns::operation::publish::PublishInput;
use aws_sdk_sns::operation::publish_batch::PublishBatchInput;
use aws_sdk_sns::types::MessageAttributeValue;
use aws_smithy_runtime_api::box_error::BoxError;
use aws_smithy_runtime_api::client::interceptors::context::{
    BeforeSerializationInterceptorContextMut, Input,
};
use aws_smithy_runtime_api::client::interceptors::Intercept;
use aws_smithy_runtime_api::client::runtime_components::RuntimeComponents;
use aws_smithy_types::config_bag::ConfigBag;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::Context;
use std::collections::HashMap;

/// An [`Intercept`] implementation injecting trace context into SNS messages.
///
/// The context is the OpenTelemetry [`Context::current`] at the time the
/// request is serialized. Every entry of a `PublishBatch` call receives its
/// own copy of the trace attributes.
///
/// # Example
///
/// ```ignore
/// use opentelemetry::context::FutureExt;
/// use opentelemetry_aws_pubsub::sns::TraceContextInterceptor;
///
/// let sns_config = aws_sdk_sns::config::Builder::from(&sdk_config)
///     .interceptor(TraceContextInterceptor::new())
///     .build();
/// let client = aws_sdk_sns::Client::from_conf(sns_config);
///
/// client.publish()
///     .topic_arn(&topic_arn)
///     .message(&message_body)
///     .send()
///     .with_context(cx)
///     .await?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct TraceContextInterceptor {
    propagator: MessageAttributesPropagator,
}

impl TraceContextInterceptor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Intercept for TraceContextInterceptor {
    fn name(&self) -> &'static str {
        "SnsTraceContextInterceptor"
    }

    fn modify_before_serialization(
        &self,
        context: &mut BeforeSerializationInterceptorContextMut<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        instrument_publish(&self.propagator, &Context::current(), context.input_mut());
        Ok(())
    }
}

pub(crate) fn instrument_publish(
    propagator: &MessageAttributesPropagator,
    cx: &Context,
    input: &mut Input,
) {
    if let Some(params) = input.downcast_mut::<PublishInput>() {
        let attributes = params.message_attributes.get_or_insert_with(HashMap::new);
        propagator.inject_context(cx, &mut MessageAttributeCarrier::new(attributes));
        return;
    }
    if let Some(params) = input.downcast_mut::<PublishBatchInput>() {
        for entry in params.publish_batch_request_entries.iter_mut().flatten() {
            let attributes = entry.message_attributes.get_or_insert_with(HashMap::new);
            propagator.inject_context(cx, &mut MessageAttributeCarrier::new(attributes));
        }
    }
}

impl_sdk_string_attribute!(MessageAttributeValue, aws_sdk_sns::error::BuildError);
