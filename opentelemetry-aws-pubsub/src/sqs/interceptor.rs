//! SQS send interceptor for OpenTelemetry context propagation.
//!
//! This module provides an AWS SDK interceptor that injects the current trace
//! context into the message attributes of `SendMessage` and
//! `SendMessageBatch` calls.

use crate::carrier::{impl_sdk_string_attribute, MessageAttributeCarrier};
use crate::propagator::MessageAttributesPropagator;
use aws_sdk_sqs::operation::send_message::SendMessageInput;
use aws_sdk_sqs::operation::send_message_batch::SendMessageBatchInput;
use aws_sdk_sqs::types::MessageAttributeValue;
use aws_smithy_runtime_api::box_error::BoxError;
use aws_smithy_runtime_api::client::interceptors::context::{
    BeforeSerializationInterceptorContextMut, Input,
};
use aws_smithy_runtime_api::client::interceptors::Intercept;
use aws_smithy_runtime_api::client::runtime_components::RuntimeComponents;
use aws_smithy_types::config_bag::ConfigBag;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use std::collections::HashMap;

/// SQS rejects messages carrying more message attributes than this.
const MAX_MESSAGE_ATTRIBUTES: usize = 10;

/// An [`Intercept`] implementation injecting trace context into SQS messages.
///
/// The context is the OpenTelemetry [`Context::current`] at the time the
/// request is serialized. Every entry of a `SendMessageBatch` call receives
/// its own copy of the trace attributes.
///
/// A message already carrying so many attributes that the trace attributes
/// would exceed the SQS limit is sent without them.
///
/// # Example
///
/// ```ignore
/// use opentelemetry_aws_pubsub::sqs::TraceContextInterceptor;
///
/// let sqs_config = aws_sdk_sqs::config::Builder::from(&sdk_config)
///     .interceptor(TraceContextInterceptor::new())
///     .build();
/// let client = aws_sdk_sqs::Client::from_conf(sqs_config);
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
        "SqsTraceContextInterceptor"
    }

    fn modify_before_serialization(
        &self,
        context: &mut BeforeSerializationInterceptorContextMut<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        instrument_send(&self.propagator, &Context::current(), context.input_mut());
        Ok(())
    }
}

pub(crate) fn instrument_send(
    propagator: &MessageAttributesPropagator,
    cx: &Context,
    input: &mut Input,
) {
    if let Some(params) = input.downcast_mut::<SendMessageInput>() {
        let attributes = params.message_attributes.get_or_insert_with(HashMap::new);
        inject_within_limit(propagator, cx, attributes);
        return;
    }
    if let Some(params) = input.downcast_mut::<SendMessageBatchInput>() {
        for entry in params.entries.iter_mut().flatten() {
            let attributes = entry.message_attributes.get_or_insert_with(HashMap::new);
            inject_within_limit(propagator, cx, attributes);
        }
    }
}

fn inject_within_limit(
    propagator: &MessageAttributesPropagator,
    cx: &Context,
    attributes: &mut HashMap<String, MessageAttributeValue>,
) {
    if !cx.span().span_context().is_valid() {
        return;
    }
    let added = propagator
        .fields()
        .filter(|field| !attributes.contains_key(*field))
        .count();
    if attributes.len() + added > MAX_MESSAGE_ATTRIBUTES {
        tracing::warn!(
            attributes = attributes.len(),
            limit = MAX_MESSAGE_ATTRIBUTES,
            "too many message attributes, trace context not injected"
        );
        return;
    }
    propagator.inject_context(cx, &mut MessageAttributeCarrier::new(attributes));
}

impl_sdk_string_attribute!(MessageAttributeValue, aws_sdk_sqs::error::BuildError);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::StringAttribute;
    use crate::process::tests::{finished_spans, test_provider, SPAN_ID_HEX, TRACE_ID_HEX};
    use crate::process::{wrap_processor, ProcessSpanConfig};
    use crate::propagator::{SPAN_ID_KEY, TRACE_ID_KEY};
    use crate::Error;
    use aws_sdk_sqs::types::{Message, SendMessageBatchRequestEntry};
    use aws_sdk_sqs::config::{BehaviorVersion, Credentials, Region};
    use aws_smithy_http_client::test_util::capture_request;
    use opentelemetry::context::FutureExt;
    use opentelemetry::propagation::Extractor;
    use opentelemetry::trace::{SpanContext, SpanId, TraceFlags, TraceId, TraceState};

    fn producer_context() -> Context {
        Context::new().with_remote_span_context(SpanContext::new(
            TraceId::from_hex(TRACE_ID_HEX).unwrap(),
            SpanId::from_hex(SPAN_ID_HEX).unwrap(),
            TraceFlags::SAMPLED,
            false,
            TraceState::default(),
        ))
    }

    fn string_attribute(value: &str) -> MessageAttributeValue {
        MessageAttributeValue::from_string(value.to_string()).unwrap()
    }

    fn assert_trace_attributes(attributes: &HashMap<String, MessageAttributeValue>) {
        for (key, want) in [(TRACE_ID_KEY, TRACE_ID_HEX), (SPAN_ID_KEY, SPAN_ID_HEX)] {
            let attribute = &attributes[key];
            assert_eq!(attribute.data_type(), "String");
            assert_eq!(attribute.string_value(), Some(want));
        }
    }

    #[test]
    fn test_carrier_over_sdk_attributes() {
        let mut attributes = HashMap::from([
            ("s1".to_string(), string_attribute("a")),
            (
                "n1".to_string(),
                MessageAttributeValue::builder()
                    .data_type("Number")
                    .string_value("1")
                    .build()
                    .unwrap(),
            ),
            ("s2".to_string(), string_attribute("b")),
        ]);

        let carrier = MessageAttributeCarrier::new(&mut attributes);

        assert_eq!(carrier.keys(), vec!["s1", "s2"]);
        assert_eq!(carrier.get("n1"), None);
        assert_eq!(carrier.get("s2"), Some("b"));
    }

    #[test]
    fn test_send_message_allocates_attributes() {
        let mut input = Input::erase(
            SendMessageInput::builder()
                .queue_url("https://sqs.us-east-1.amazonaws.com/123456789012/orders")
                .message_body("msg")
                .build()
                .unwrap(),
        );

        instrument_send(&MessageAttributesPropagator::new(), &producer_context(), &mut input);

        let params = input.downcast_ref::<SendMessageInput>().unwrap();
        let attributes = params.message_attributes.as_ref().unwrap();
        assert_eq!(attributes.len(), 2);
        assert_trace_attributes(attributes);
        assert_eq!(params.message_body(), Some("msg"));
    }

    #[test]
    fn test_send_message_without_span_adds_no_trace_attributes() {
        let mut input = Input::erase(
            SendMessageInput::builder()
                .message_body("msg")
                .message_attributes("existing", string_attribute("value"))
                .build()
                .unwrap(),
        );

        instrument_send(&MessageAttributesPropagator::new(), &Context::new(), &mut input);

        let params = input.downcast_ref::<SendMessageInput>().unwrap();
        let attributes = params.message_attributes.as_ref().unwrap();
        assert_eq!(attributes.len(), 1);
        assert!(attributes.contains_key("existing"));
    }

    #[test]
    fn test_send_message_respects_attribute_limit() {
        let mut builder = SendMessageInput::builder().message_body("msg");
        for i in 0..9 {
            builder = builder.message_attributes(format!("a{i}"), string_attribute("v"));
        }
        let mut input = Input::erase(builder.build().unwrap());

        instrument_send(&MessageAttributesPropagator::new(), &producer_context(), &mut input);

        let params = input.downcast_ref::<SendMessageInput>().unwrap();
        let attributes = params.message_attributes.as_ref().unwrap();
        assert_eq!(attributes.len(), 9);
        assert!(!attributes.contains_key(TRACE_ID_KEY));
    }

    #[test]
    fn test_send_message_overwrites_stale_trace_attributes_at_limit() {
        let mut builder = SendMessageInput::builder()
            .message_body("msg")
            .message_attributes(TRACE_ID_KEY, string_attribute("stale"))
            .message_attributes(SPAN_ID_KEY, string_attribute("stale"));
        for i in 0..8 {
            builder = builder.message_attributes(format!("a{i}"), string_attribute("v"));
        }
        let mut input = Input::erase(builder.build().unwrap());

        instrument_send(&MessageAttributesPropagator::new(), &producer_context(), &mut input);

        let params = input.downcast_ref::<SendMessageInput>().unwrap();
        let attributes = params.message_attributes.as_ref().unwrap();
        assert_eq!(attributes.len(), 10);
        assert_trace_attributes(attributes);
    }

    #[test]
    fn test_send_message_batch_injects_every_entry() {
        let mut input = Input::erase(
            SendMessageBatchInput::builder()
                .queue_url("https://sqs.us-east-1.amazonaws.com/123456789012/orders")
                .entries(
                    SendMessageBatchRequestEntry::builder()
                        .id("1")
                        .message_body("first")
                        .build()
                        .unwrap(),
                )
                .entries(
                    SendMessageBatchRequestEntry::builder()
                        .id("2")
                        .message_body("second")
                        .delay_seconds(5)
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap(),
        );

        instrument_send(&MessageAttributesPropagator::new(), &producer_context(), &mut input);

        let params = input.downcast_mut::<SendMessageBatchInput>().unwrap();
        let entries = params.entries.as_mut().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id(), "1");
        assert_eq!(entries[1].id(), "2");
        assert_eq!(entries[1].delay_seconds(), Some(5));
        for entry in entries.iter() {
            assert_trace_attributes(entry.message_attributes.as_ref().unwrap());
        }

        entries[0]
            .message_attributes
            .as_mut()
            .unwrap()
            .remove(TRACE_ID_KEY);
        assert!(entries[1]
            .message_attributes
            .as_ref()
            .unwrap()
            .contains_key(TRACE_ID_KEY));
    }

    #[test]
    fn test_other_operations_pass_through() {
        let mut input = Input::erase(42_u64);

        instrument_send(&MessageAttributesPropagator::new(), &producer_context(), &mut input);

        assert_eq!(input.downcast_ref::<u64>(), Some(&42));
    }

    #[test]
    fn test_sent_context_links_processing_span() {
        let mut input = Input::erase(
            SendMessageInput::builder()
                .message_body("order created")
                .build()
                .unwrap(),
        );
        instrument_send(&MessageAttributesPropagator::new(), &producer_context(), &mut input);

        let params = input.downcast_ref::<SendMessageInput>().unwrap();
        let received = Message::builder()
            .message_id("b5a1c2d3-e4f5-4a6b-8c7d-9e0f1a2b3c4d")
            .set_body(params.message_body().map(str::to_owned))
            .set_message_attributes(params.message_attributes.clone())
            .build();

        let (provider, exporter) = test_provider();
        let processor = wrap_processor(
            |_cx: &Context, msg: &Message| {
                assert_eq!(msg.body(), Some("order created"));
                Ok::<(), Error>(())
            },
            ProcessSpanConfig::new().with_tracer_provider(provider),
        );
        processor(&Context::new(), &received).unwrap();

        let spans = finished_spans(&exporter);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].links.len(), 1);
        let linked = &spans[0].links[0].span_context;
        assert_eq!(linked.trace_id().to_string(), TRACE_ID_HEX);
        assert_eq!(linked.span_id().to_string(), SPAN_ID_HEX);
    }

    #[tokio::test]
    async fn test_client_send_message_carries_trace_context() {
        let (http_client, request) = capture_request(None);
        let config = aws_sdk_sqs::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("akid", "secret", None, None, "test"))
            .http_client(http_client)
            .interceptor(TraceContextInterceptor::new())
            .build();
        let client = aws_sdk_sqs::Client::from_conf(config);

        // The captured response has no body, so the call itself fails.
        let _ = client
            .send_message()
            .queue_url("https://sqs.us-east-1.amazonaws.com/123456789012/orders")
            .message_body("msg")
            .send()
            .with_context(producer_context())
            .await;

        let request = request.expect_request();
        let body = std::str::from_utf8(request.body().bytes().unwrap()).unwrap();
        for want in [TRACE_ID_KEY, TRACE_ID_HEX, SPAN_ID_KEY, SPAN_ID_HEX] {
            assert!(body.contains(want), "{want} missing from {body}");
        }
    }
}
