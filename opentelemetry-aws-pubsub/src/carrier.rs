//! Message attribute carrier for OpenTelemetry context propagation.
//!
//! [`MessageAttributeCarrier`] adapts any AWS message attribute map to the
//! OpenTelemetry [`Extractor`] and [`Injector`] traits. Only String-typed
//! attributes are visible for reading; values written through the carrier are
//! always String-typed.

use opentelemetry::propagation::{Extractor, Injector};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::OnceLock;

/// Data type tag shared by SNS and SQS string attributes.
pub const DATA_TYPE_STRING: &str = "String";

/// A message attribute value that may hold a string payload.
pub trait StringAttribute: Sized {
    /// Error returned when a String-typed value cannot be built.
    type Error: fmt::Display;

    /// Returns the payload if the value is String-typed and the payload is
    /// present, `None` otherwise.
    fn string_payload(&self) -> Option<&str>;

    /// Builds a String-typed value holding `value`.
    fn from_string(value: String) -> Result<Self, Self::Error>;
}

/// Implements [`StringAttribute`] for an AWS SDK `MessageAttributeValue`,
/// accepting exactly the `String` data type.
#[cfg(any(feature = "sns", feature = "sqs"))]
macro_rules! impl_sdk_string_attribute {
    ($value:ty, $build_error:ty) => {
        impl $crate::carrier::StringAttribute for $value {
            type Error = $build_error;

            fn string_payload(&self) -> Option<&str> {
                if self.data_type() != $crate::carrier::DATA_TYPE_STRING {
                    return None;
                }
                self.string_value()
            }

            fn from_string(value: String) -> Result<Self, $build_error> {
                <$value>::builder()
                    .data_type($crate::carrier::DATA_TYPE_STRING)
                    .string_value(value)
                    .build()
            }
        }
    };
}

#[cfg(any(feature = "sns", feature = "sqs"))]
pub(crate) use impl_sdk_string_attribute;

/// Read access to a borrowed attribute map.
pub trait AttributeMap {
    /// The attribute value type of the map.
    type Value: StringAttribute;

    fn attributes(&self) -> &HashMap<String, Self::Value>;
}

/// Write access to a borrowed attribute map.
pub trait AttributeMapMut: AttributeMap {
    fn attributes_mut(&mut self) -> &mut HashMap<String, Self::Value>;
}

impl<V: StringAttribute> AttributeMap for &HashMap<String, V> {
    type Value = V;

    fn attributes(&self) -> &HashMap<String, V> {
        self
    }
}

impl<V: StringAttribute> AttributeMap for &mut HashMap<String, V> {
    type Value = V;

    fn attributes(&self) -> &HashMap<String, V> {
        self
    }
}

impl<V: StringAttribute> AttributeMapMut for &mut HashMap<String, V> {
    fn attributes_mut(&mut self) -> &mut HashMap<String, V> {
        self
    }
}

/// An [`Extractor`] and [`Injector`] over a borrowed message attribute map.
///
/// The String-typed view of the map is computed once, on first read, and is
/// not refreshed afterwards: writes made through [`Injector::set`] reach the
/// underlying map but not the view of this carrier.
///
/// # Example
///
/// ```ignore
/// use opentelemetry::global;
/// use opentelemetry_aws_pubsub::MessageAttributeCarrier;
///
/// // Inject into an outgoing SNS attribute map
/// let mut attributes = HashMap::new();
/// global::get_text_map_propagator(|propagator| {
///     propagator.inject_context(&cx, &mut MessageAttributeCarrier::new(&mut attributes));
/// });
///
/// // Extract from a received SQS message
/// let parent_cx = global::get_text_map_propagator(|propagator| {
///     propagator.extract(&MessageAttributeCarrier::new(msg.message_attributes().unwrap_or(&empty)))
/// });
/// ```
#[derive(Debug)]
pub struct MessageAttributeCarrier<M: AttributeMap> {
    attributes: M,
    strings: OnceLock<BTreeMap<String, String>>,
}

impl<M: AttributeMap> MessageAttributeCarrier<M> {
    /// Wraps an attribute map without copying it.
    pub fn new(attributes: M) -> Self {
        Self {
            attributes,
            strings: OnceLock::new(),
        }
    }

    /// Returns the wrapped map.
    pub fn into_inner(self) -> M {
        self.attributes
    }

    fn strings(&self) -> &BTreeMap<String, String> {
        self.strings.get_or_init(|| {
            self.attributes
                .attributes()
                .iter()
                .filter_map(|(key, value)| {
                    value
                        .string_payload()
                        .map(|payload| (key.clone(), payload.to_owned()))
                })
                .collect()
        })
    }
}

impl<M: AttributeMap> Extractor for MessageAttributeCarrier<M> {
    fn get(&self, key: &str) -> Option<&str> {
        self.strings().get(key).map(String::as_str)
    }

    /// Names of the String-typed attributes, in lexicographic order.
    fn keys(&self) -> Vec<&str> {
        self.strings().keys().map(String::as_str).collect()
    }
}

impl<M: AttributeMapMut> Injector for MessageAttributeCarrier<M> {
    fn set(&mut self, key: &str, value: String) {
        match M::Value::from_string(value) {
            Ok(value) => {
                self.attributes
                    .attributes_mut()
                    .insert(key.to_owned(), value);
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to build string message attribute");
            }
        }
    }
}
