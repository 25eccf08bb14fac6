//! SQS message attribute types and values as delivered to Lambda.
//!
//! See <https://docs.aws.amazon.com/AWSSimpleQueueService/latest/SQSDeveloperGuide/sqs-message-metadata.html>.

use crate::binary;
use crate::carrier::{StringAttribute, DATA_TYPE_STRING};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Base data type of an SQS message attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    String,
    Number,
    Binary,
}

impl AttributeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKind::String => DATA_TYPE_STRING,
            AttributeKind::Number => "Number",
            AttributeKind::Binary => "Binary",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "String" => Ok(AttributeKind::String),
            "Number" => Ok(AttributeKind::Number),
            "Binary" => Ok(AttributeKind::Binary),
            _ => Err(Error::UnknownAttributeKind(s.to_owned())),
        }
    }
}

/// Data type of an SQS message attribute: a kind and an optional custom label,
/// rendered `Kind` or `Kind.label` (e.g. `String.UUID`, `Binary.png`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttributeType {
    kind: AttributeKind,
    label: Option<String>,
}

impl AttributeType {
    pub const STRING: AttributeType = AttributeType::of(AttributeKind::String);
    pub const NUMBER: AttributeType = AttributeType::of(AttributeKind::Number);
    pub const BINARY: AttributeType = AttributeType::of(AttributeKind::Binary);

    const fn of(kind: AttributeKind) -> Self {
        Self { kind, label: None }
    }

    /// A custom type such as `String.UUID`. An empty label yields the plain kind.
    pub fn custom(kind: AttributeKind, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            kind,
            label: (!label.is_empty()).then_some(label),
        }
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_custom(&self) -> bool {
        self.label.is_some()
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}.{}", self.kind, label),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl FromStr for AttributeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((kind, label)) => Ok(AttributeType::custom(kind.parse()?, label)),
            None => Ok(AttributeType::of(s.parse()?)),
        }
    }
}

impl TryFrom<String> for AttributeType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttributeType> for String {
    fn from(value: AttributeType) -> Self {
        value.to_string()
    }
}

/// An SQS message attribute: a type and a single payload string.
///
/// Binary payloads are kept base64-encoded. As with SNS, accessors return
/// `None` when the attribute is of another kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAttributeValue", into = "RawAttributeValue")]
pub struct AttributeValue {
    data_type: AttributeType,
    payload: Option<String>,
}

// Wire form of an attribute in Lambda SQS records. `stringListValues` and
// `binaryListValues` are reserved by SQS and ignored.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttributeValue {
    data_type: AttributeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    binary_value: Option<String>,
}

impl From<RawAttributeValue> for AttributeValue {
    fn from(raw: RawAttributeValue) -> Self {
        let payload = match raw.data_type.kind {
            AttributeKind::Binary => raw.binary_value,
            AttributeKind::String | AttributeKind::Number => raw.string_value,
        };
        Self {
            data_type: raw.data_type,
            payload,
        }
    }
}

impl From<AttributeValue> for RawAttributeValue {
    fn from(value: AttributeValue) -> Self {
        let (string_value, binary_value) = match value.data_type.kind {
            AttributeKind::Binary => (None, value.payload),
            AttributeKind::String | AttributeKind::Number => (value.payload, None),
        };
        Self {
            data_type: value.data_type,
            string_value,
            binary_value,
        }
    }
}

impl AttributeValue {
    /// An attribute of `data_type` holding `payload` as carried on the wire:
    /// base64 for binary kinds, text otherwise.
    pub fn with_type(data_type: AttributeType, payload: impl Into<String>) -> Self {
        Self {
            data_type,
            payload: Some(payload.into()),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::with_type(AttributeType::STRING, value)
    }

    /// A `Number` attribute, kept as its decimal representation.
    pub fn number(value: impl Into<String>) -> Self {
        Self::with_type(AttributeType::NUMBER, value)
    }

    /// A `Binary` attribute, stored base64-encoded without padding.
    pub fn binary(raw: &[u8]) -> Self {
        Self::with_type(AttributeType::BINARY, binary::encode(raw))
    }

    pub fn data_type(&self) -> &AttributeType {
        &self.data_type
    }

    fn payload_of(&self, kind: AttributeKind) -> Option<&str> {
        if self.data_type.kind != kind {
            return None;
        }
        self.payload.as_deref()
    }

    pub fn string_value(&self) -> Option<&str> {
        self.payload_of(AttributeKind::String)
    }

    pub fn number_value(&self) -> Option<&str> {
        self.payload_of(AttributeKind::Number)
    }

    pub fn base64_encoded_binary_value(&self) -> Option<&str> {
        self.payload_of(AttributeKind::Binary)
    }

    /// Decodes the payload of a `Binary` attribute.
    pub fn binary_value(&self) -> Option<Result<Vec<u8>, Error>> {
        self.base64_encoded_binary_value().map(binary::decode)
    }
}

impl StringAttribute for AttributeValue {
    type Error = Infallible;

    // Custom string types such as `String.UUID` are readable too.
    fn string_payload(&self) -> Option<&str> {
        self.string_value()
    }

    fn from_string(value: String) -> Result<Self, Infallible> {
        Ok(AttributeValue::string(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_type_parse() {
        let cases = [
            ("String", AttributeType::STRING),
            ("Number", AttributeType::NUMBER),
            ("Binary", AttributeType::BINARY),
            ("String.UUID", AttributeType::custom(AttributeKind::String, "UUID")),
            ("Binary.png", AttributeType::custom(AttributeKind::Binary, "png")),
            ("Number.float", AttributeType::custom(AttributeKind::Number, "float")),
        ];
        for (input, want) in cases {
            let got: AttributeType = input.parse().unwrap();
            assert_eq!(got, want, "{input}");
            assert_eq!(got.to_string(), input);
        }
    }

    #[test]
    fn test_attribute_type_label() {
        let png: AttributeType = "Binary.png".parse().unwrap();
        assert_eq!(png.kind(), AttributeKind::Binary);
        assert_eq!(png.label(), Some("png"));
        assert!(png.is_custom());

        assert!(!AttributeType::STRING.is_custom());
        assert_eq!(AttributeType::custom(AttributeKind::String, ""), AttributeType::STRING);
    }

    #[test]
    fn test_unknown_attribute_kind_fails() {
        for input in ["Boolean", "Boolean.flag", "string", ""] {
            let err = input.parse::<AttributeType>().unwrap_err();
            assert!(matches!(err, Error::UnknownAttributeKind(_)), "{input}");
        }
        assert!(serde_json::from_value::<AttributeType>(json!("Integer")).is_err());
    }

    #[test]
    fn test_custom_type_json_round_trip() {
        let value: AttributeValue = serde_json::from_value(json!({
            "dataType": "Binary.png",
            "binaryValue": "AQEAAA",
            "stringListValues": [],
            "binaryListValues": []
        }))
        .unwrap();

        assert_eq!(value.data_type().label(), Some("png"));
        assert_eq!(value.binary_value().unwrap().unwrap(), vec![1, 1, 0, 0]);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"dataType": "Binary.png", "binaryValue": "AQEAAA"})
        );
    }

    #[test]
    fn test_value_json() {
        let string: AttributeValue = serde_json::from_value(json!({
            "dataType": "String",
            "stringValue": "AttributeValue1",
            "binaryValue": null
        }))
        .unwrap();
        assert_eq!(string, AttributeValue::string("AttributeValue1"));

        assert_eq!(
            serde_json::to_value(AttributeValue::number("123")).unwrap(),
            json!({"dataType": "Number", "stringValue": "123"})
        );
    }

    #[test]
    fn test_accessors_match_kind() {
        let uuid = AttributeValue::with_type(
            AttributeType::custom(AttributeKind::String, "UUID"),
            "0b7c5f8e-4b1a-4f3e-9d2c-8a6b5e4d3c2b",
        );
        assert_eq!(uuid.string_value(), Some("0b7c5f8e-4b1a-4f3e-9d2c-8a6b5e4d3c2b"));
        assert_eq!(uuid.string_payload(), uuid.string_value());
        assert_eq!(uuid.number_value(), None);

        let number = AttributeValue::number("1.5");
        assert_eq!(number.number_value(), Some("1.5"));
        assert_eq!(number.string_payload(), None);

        let binary = AttributeValue::binary(&[1, 2, 3, 4, 5]);
        assert_eq!(binary.base64_encoded_binary_value(), Some("AQIDBAU"));
        assert_eq!(binary.string_value(), None);
    }
}
