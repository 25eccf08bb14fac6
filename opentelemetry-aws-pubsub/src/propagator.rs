//! # Message Attributes Propagator
//!

use opentelemetry::{
    propagation::{text_map_propagator::FieldIter, Extractor, Injector, TextMapPropagator},
    trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState},
    Context,
};
use std::sync::OnceLock;

/// Attribute holding the trace ID as 32 lowercase hex characters.
pub const TRACE_ID_KEY: &str = "otel.trace_id";
/// Attribute holding the span ID as 16 lowercase hex characters.
pub const SPAN_ID_KEY: &str = "otel.span_id";

static MESSAGE_ATTRIBUTE_FIELDS: OnceLock<[String; 2]> = OnceLock::new();

fn message_attribute_fields() -> &'static [String; 2] {
    MESSAGE_ATTRIBUTE_FIELDS.get_or_init(|| [TRACE_ID_KEY.to_owned(), SPAN_ID_KEY.to_owned()])
}

#[derive(Debug, thiserror::Error)]
enum ExtractError {
    #[error("attribute {0} is missing")]
    Missing(&'static str),
    #[error("attribute {key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Propagates `SpanContext`s through message attributes named `otel.trace_id`
/// and `otel.span_id`.
///
/// SNS and SQS restrict attribute names and do not forward standard tracing
/// headers, so the hyphenated W3C `traceparent` header cannot be used. The
/// trace ID and span ID are carried as two flat string attributes instead:
///
/// `otel.trace_id: abcdef121234567890abcdef12345678`
/// `otel.span_id: 1234567890abcdef`
///
/// Trace flags and trace state are not carried. Extraction failures never
/// reach the caller: the incoming context is returned unchanged.
#[derive(Clone, Debug, Default)]
pub struct MessageAttributesPropagator {
    _private: (),
}

impl MessageAttributesPropagator {
    /// Create a new `MessageAttributesPropagator`.
    pub fn new() -> Self {
        MessageAttributesPropagator { _private: () }
    }

    fn extract_span_context(&self, extractor: &dyn Extractor) -> Result<SpanContext, ExtractError> {
        let value = hex_field(extractor, TRACE_ID_KEY, 32)?;
        let trace_id = TraceId::from_hex(value)
            .ok()
            .filter(|trace_id| *trace_id != TraceId::INVALID)
            .ok_or_else(|| invalid(TRACE_ID_KEY, value))?;

        let value = hex_field(extractor, SPAN_ID_KEY, 16)?;
        let span_id = SpanId::from_hex(value)
            .ok()
            .filter(|span_id| *span_id != SpanId::INVALID)
            .ok_or_else(|| invalid(SPAN_ID_KEY, value))?;

        Ok(SpanContext::new(
            trace_id,
            span_id,
            TraceFlags::default(),
            true,
            TraceState::default(),
        ))
    }
}

impl TextMapPropagator for MessageAttributesPropagator {
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        let span = cx.span();
        let span_context = span.span_context();
        if !span_context.is_valid() {
            return;
        }
        injector.set(TRACE_ID_KEY, span_context.trace_id().to_string());
        injector.set(SPAN_ID_KEY, span_context.span_id().to_string());
    }

    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        match self.extract_span_context(extractor) {
            Ok(span_context) => cx.with_remote_span_context(span_context),
            Err(err @ ExtractError::Missing(_)) => {
                tracing::debug!(error = %err, "no span context in message attributes");
                cx.clone()
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to extract span context");
                cx.clone()
            }
        }
    }

    fn fields(&self) -> FieldIter<'_> {
        FieldIter::new(message_attribute_fields())
    }
}

/// Extracts the producer's span context from message attributes.
///
/// Extraction runs against an empty context, so `None` always means the
/// attributes carried no usable span context.
pub fn extract_remote_span_context(extractor: &dyn Extractor) -> Option<SpanContext> {
    let cx = MessageAttributesPropagator::new().extract_with_context(&Context::new(), extractor);
    let span = cx.span();
    let span_context = span.span_context();
    span_context.is_valid().then(|| span_context.clone())
}

/// Reads `key`, which must hold exactly `len` lowercase hex characters.
fn hex_field<'a>(
    extractor: &'a dyn Extractor,
    key: &'static str,
    len: usize,
) -> Result<&'a str, ExtractError> {
    let value = extractor.get(key).ok_or(ExtractError::Missing(key))?;
    // `from_hex` also accepts upper case and a leading `+`.
    if value.len() != len
        || value.starts_with('+')
        || value.chars().any(|c| c.is_ascii_uppercase())
    {
        return Err(invalid(key, value));
    }
    Ok(value)
}

fn invalid(key: &'static str, value: &str) -> ExtractError {
    ExtractError::Invalid {
        key,
        value: value.to_owned(),
    }
}
