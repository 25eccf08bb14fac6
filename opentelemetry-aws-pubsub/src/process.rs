//! Processing spans for consumed messages.
//!
//! A processing span is started for every message handed to a wrapped
//! handler. When the message carries the producer's span context in its
//! attributes, the processing span is *linked* to it rather than parented by
//! it: queue delivery is not a direct call, and one producer span may fan out
//! to many deliveries.

use opentelemetry::context::FutureExt;
use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::{
    Link, SpanBuilder, SpanContext, SpanKind, Status, TraceContextExt, Tracer, TracerProvider,
};
use opentelemetry::{Context, InstrumentationScope, KeyValue};
use opentelemetry_semantic_conventions::attribute::{EXCEPTION_MESSAGE, EXCEPTION_TYPE};
use std::fmt;
use std::future::Future;
use std::time::SystemTime;

/// Name of every processing span.
pub const PROCESS_SPAN_NAME: &str = "process";

/// A consumed message that may carry the producer's span context.
pub trait TracedMessage {
    /// Instrumentation scope of the tracer creating processing spans.
    const INSTRUMENTATION_SCOPE: &'static str;

    /// The producer's span context, if the message attributes carry a valid one.
    fn remote_span_context(&self) -> Option<SpanContext>;

    /// Messaging semantic-convention attributes recorded on the processing span.
    fn messaging_attributes(&self) -> Vec<KeyValue> {
        Vec::new()
    }
}

/// Resolves tracers from the global tracer provider at span start.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalProvider;

impl TracerProvider for GlobalProvider {
    type Tracer = BoxedTracer;

    fn tracer_with_scope(&self, scope: InstrumentationScope) -> BoxedTracer {
        global::tracer_provider().tracer_with_scope(scope)
    }
}

/// Extra options applied to the builder of every processing span.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum SpanStartOption {
    Kind(SpanKind),
    Attributes(Vec<KeyValue>),
    Links(Vec<Link>),
    StartTime(SystemTime),
}

impl SpanStartOption {
    fn apply(&self, mut builder: SpanBuilder) -> SpanBuilder {
        match self {
            SpanStartOption::Kind(kind) => builder.with_kind(kind.clone()),
            SpanStartOption::Attributes(attributes) => {
                builder
                    .attributes
                    .get_or_insert_with(Vec::new)
                    .extend(attributes.iter().cloned());
                builder
            }
            SpanStartOption::Links(links) => {
                builder
                    .links
                    .get_or_insert_with(Vec::new)
                    .extend(links.iter().cloned());
                builder
            }
            SpanStartOption::StartTime(start_time) => builder.with_start_time(*start_time),
        }
    }
}

/// Configuration of processing spans.
///
/// ```ignore
/// let config = ProcessSpanConfig::new()
///     .with_tracer_provider(provider)
///     .with_start_options([SpanStartOption::Kind(SpanKind::Consumer)]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ProcessSpanConfig<P = GlobalProvider> {
    tracer_provider: P,
    start_options: Vec<SpanStartOption>,
}

impl ProcessSpanConfig {
    /// Configuration using the global tracer provider and no extra options.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P> ProcessSpanConfig<P> {
    /// Creates processing spans with `tracer_provider` instead of the global one.
    pub fn with_tracer_provider<Q>(self, tracer_provider: Q) -> ProcessSpanConfig<Q> {
        ProcessSpanConfig {
            tracer_provider,
            start_options: self.start_options,
        }
    }

    /// Appends options forwarded to the span builder.
    pub fn with_start_options(mut self, options: impl IntoIterator<Item = SpanStartOption>) -> Self {
        self.start_options.extend(options);
        self
    }
}

impl<P> ProcessSpanConfig<P>
where
    P: TracerProvider,
    <P::Tracer as Tracer>::Span: Send + Sync + 'static,
{
    /// Starts the processing span of `message` as a child of `cx`.
    ///
    /// The returned context carries the new span. The caller is responsible
    /// for ending it.
    pub fn start_process_span<M: TracedMessage>(&self, cx: &Context, message: &M) -> Context {
        let scope = InstrumentationScope::builder(M::INSTRUMENTATION_SCOPE)
            .with_version(env!("CARGO_PKG_VERSION"))
            .build();
        let tracer = self.tracer_provider.tracer_with_scope(scope);

        let mut builder =
            SpanBuilder::from_name(PROCESS_SPAN_NAME).with_attributes(message.messaging_attributes());
        for option in &self.start_options {
            builder = option.apply(builder);
        }
        if let Some(span_context) = message.remote_span_context() {
            builder
                .links
                .get_or_insert_with(Vec::new)
                .push(Link::new(span_context, Vec::new(), 0));
        }

        let span = tracer.build_with_context(builder, cx);
        cx.with_span(span)
    }

    /// Runs the future returned by `f` inside the processing span of `message`.
    ///
    /// `f` receives the context carrying the processing span, which is also
    /// attached while the future is polled.
    pub async fn in_process_span<M, V, E, F, Fut>(
        &self,
        cx: &Context,
        message: &M,
        f: F,
    ) -> Result<V, E>
    where
        M: TracedMessage,
        E: fmt::Display,
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cx = self.start_process_span(cx, message);
        let result = f(cx.clone()).with_context(cx.clone()).await;
        end_process_span(&cx, &result);
        result
    }
}

/// Wraps a message handler so every call runs inside a processing span.
///
/// Errors returned by `f` are recorded on the span and returned unchanged.
pub fn wrap_processor<M, E, F, P>(
    f: F,
    config: ProcessSpanConfig<P>,
) -> impl Fn(&Context, &M) -> Result<(), E>
where
    M: TracedMessage,
    E: fmt::Display,
    F: Fn(&Context, &M) -> Result<(), E>,
    P: TracerProvider,
    <P::Tracer as Tracer>::Span: Send + Sync + 'static,
{
    move |cx: &Context, message: &M| {
        let cx = config.start_process_span(cx, message);
        let result = f(&cx, message);
        end_process_span(&cx, &result);
        result
    }
}

/// Wraps a message handler that yields a value so every call runs inside a
/// processing span.
///
/// Errors returned by `f` are recorded on the span and returned unchanged.
pub fn wrap_yielder<M, V, E, F, P>(
    f: F,
    config: ProcessSpanConfig<P>,
) -> impl Fn(&Context, &M) -> Result<V, E>
where
    M: TracedMessage,
    E: fmt::Display,
    F: Fn(&Context, &M) -> Result<V, E>,
    P: TracerProvider,
    <P::Tracer as Tracer>::Span: Send + Sync + 'static,
{
    move |cx: &Context, message: &M| {
        let cx = config.start_process_span(cx, message);
        let result = f(&cx, message);
        end_process_span(&cx, &result);
        result
    }
}

// A span left open by a panicking handler is ended when `cx` is dropped.
// `exception.type` is the static error type, so a type-erased error such as
// `anyhow::Error` records the wrapper's name rather than the underlying cause.
fn end_process_span<V, E: fmt::Display>(cx: &Context, result: &Result<V, E>) {
    let span = cx.span();
    if let Err(err) = result {
        let message = err.to_string();
        span.add_event(
            "exception",
            vec![
                KeyValue::new(EXCEPTION_TYPE, std::any::type_name::<E>()),
                KeyValue::new(EXCEPTION_MESSAGE, message.clone()),
            ],
        );
        span.set_status(Status::error(message));
    }
    span.end();
}
