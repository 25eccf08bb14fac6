//! SNS message attribute types and values as delivered in notifications.
//!
//! See <https://docs.aws.amazon.com/sns/latest/dg/sns-message-attributes.html>.

use crate::binary;
use crate::carrier::{StringAttribute, DATA_TYPE_STRING};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Data type of an SNS message attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum AttributeType {
    String,
    StringArray,
    Number,
    Binary,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => DATA_TYPE_STRING,
            AttributeType::StringArray => "String.Array",
            AttributeType::Number => "Number",
            AttributeType::Binary => "Binary",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "String" => Ok(AttributeType::String),
            "String.Array" => Ok(AttributeType::StringArray),
            "Number" => Ok(AttributeType::Number),
            "Binary" => Ok(AttributeType::Binary),
            _ => Err(Error::UnknownAttributeType(s.to_owned())),
        }
    }
}

impl TryFrom<String> for AttributeType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttributeType> for &'static str {
    fn from(value: AttributeType) -> Self {
        value.as_str()
    }
}

/// An SNS message attribute: a type tag and a single payload string.
///
/// Accessors return `None` when the attribute is of another type, so reading
/// an attribute with the wrong accessor behaves like reading a missing one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    #[serde(rename = "Type")]
    data_type: AttributeType,
    #[serde(rename = "Value", default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

impl AttributeValue {
    fn new(data_type: AttributeType, value: impl Into<String>) -> Self {
        Self {
            data_type,
            value: Some(value.into()),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(AttributeType::String, value)
    }

    /// A `String.Array` attribute; `value` is a JSON-encoded array.
    pub fn string_array(value: impl Into<String>) -> Self {
        Self::new(AttributeType::StringArray, value)
    }

    /// A `Number` attribute, kept as its decimal representation.
    pub fn number(value: impl Into<String>) -> Self {
        Self::new(AttributeType::Number, value)
    }

    /// A `Binary` attribute, stored base64-encoded without padding.
    pub fn binary(raw: &[u8]) -> Self {
        Self::new(AttributeType::Binary, binary::encode(raw))
    }

    pub fn data_type(&self) -> AttributeType {
        self.data_type
    }

    fn payload_of(&self, data_type: AttributeType) -> Option<&str> {
        if self.data_type != data_type {
            return None;
        }
        self.value.as_deref()
    }

    pub fn string_value(&self) -> Option<&str> {
        self.payload_of(AttributeType::String)
    }

    pub fn string_array_value(&self) -> Option<&str> {
        self.payload_of(AttributeType::StringArray)
    }

    pub fn number_value(&self) -> Option<&str> {
        self.payload_of(AttributeType::Number)
    }

    pub fn base64_encoded_binary_value(&self) -> Option<&str> {
        self.payload_of(AttributeType::Binary)
    }

    /// Decodes the payload of a `Binary` attribute.
    pub fn binary_value(&self) -> Option<Result<Vec<u8>, Error>> {
        self.base64_encoded_binary_value().map(binary::decode)
    }
}

impl StringAttribute for AttributeValue {
    type Error = Infallible;

    fn string_payload(&self) -> Option<&str> {
        self.string_value()
    }

    fn from_string(value: String) -> Result<Self, Infallible> {
        Ok(AttributeValue::string(value))
    }
}

impl TryFrom<&aws_sdk_sns::types::MessageAttributeValue> for AttributeValue {
    type Error = Error;

    /// The attribute as SNS delivers a published attribute in a notification.
    fn try_from(value: &aws_sdk_sns::types::MessageAttributeValue) -> Result<Self, Self::Error> {
        let data_type: AttributeType = value.data_type().parse()?;
        let payload = match data_type {
            AttributeType::Binary => value.binary_value().map(|blob| binary::encode(blob.as_ref())),
            _ => value.string_value().map(str::to_owned),
        };
        Ok(Self {
            data_type,
            value: payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_type_json() {
        for (data_type, json) in [
            (AttributeType::String, json!("String")),
            (AttributeType::StringArray, json!("String.Array")),
            (AttributeType::Number, json!("Number")),
            (AttributeType::Binary, json!("Binary")),
        ] {
            assert_eq!(serde_json::to_value(data_type).unwrap(), json);
            assert_eq!(
                serde_json::from_value::<AttributeType>(json).unwrap(),
                data_type
            );
        }
    }

    #[test]
    fn test_unknown_attribute_type_fails() {
        let err = "Binary.png".parse::<AttributeType>().unwrap_err();
        assert!(matches!(err, Error::UnknownAttributeType(ref s) if s == "Binary.png"));

        assert!(serde_json::from_value::<AttributeValue>(json!({
            "Type": "Boolean",
            "Value": "true",
        }))
        .is_err());
    }

    #[test]
    fn test_accessors_match_type() {
        let string = AttributeValue::string("abc");
        assert_eq!(string.string_value(), Some("abc"));
        assert_eq!(string.number_value(), None);
        assert_eq!(string.string_array_value(), None);

        let number = AttributeValue::number("123");
        assert_eq!(number.number_value(), Some("123"));
        assert_eq!(number.string_value(), None);

        let array = AttributeValue::string_array(r#"["a","b"]"#);
        assert_eq!(array.string_array_value(), Some(r#"["a","b"]"#));
        assert_eq!(array.string_value(), None);
        assert_eq!(array.string_payload(), None);

        let binary = AttributeValue::binary(&[1, 2, 3, 4, 5]);
        assert_eq!(binary.base64_encoded_binary_value(), Some("AQIDBAU"));
        assert_eq!(binary.binary_value().unwrap().unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(binary.string_value(), None);
    }

    #[test]
    fn test_value_json() {
        let value: AttributeValue = serde_json::from_value(json!({
            "Type": "Binary",
            "Value": "AQIDBAU",
        }))
        .unwrap();
        assert_eq!(value, AttributeValue::binary(&[1, 2, 3, 4, 5]));

        assert_eq!(
            serde_json::to_value(AttributeValue::string("TestString")).unwrap(),
            json!({"Type": "String", "Value": "TestString"})
        );
    }

    #[test]
    fn test_string_without_value_is_absent() {
        let value: AttributeValue = serde_json::from_value(json!({"Type": "String"})).unwrap();

        assert_eq!(value.data_type(), AttributeType::String);
        assert_eq!(value.string_value(), None);
    }

    #[test]
    fn test_from_sdk_attribute() {
        let string = aws_sdk_sns::types::MessageAttributeValue::builder()
            .data_type("String")
            .string_value("abc")
            .build()
            .unwrap();
        assert_eq!(
            AttributeValue::try_from(&string).unwrap(),
            AttributeValue::string("abc")
        );

        let binary = aws_sdk_sns::types::MessageAttributeValue::builder()
            .data_type("Binary")
            .binary_value(aws_smithy_types::Blob::new(vec![1, 2, 3, 4, 5]))
            .build()
            .unwrap();
        assert_eq!(
            AttributeValue::try_from(&binary).unwrap(),
            AttributeValue::binary(&[1, 2, 3, 4, 5])
        );

        let unknown = aws_sdk_sns::types::MessageAttributeValue::builder()
            .data_type("Boolean")
            .string_value("true")
            .build()
            .unwrap();
        assert!(AttributeValue::try_from(&unknown).is_err());
    }
}
