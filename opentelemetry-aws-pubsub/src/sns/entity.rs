//! SNS notification entity.

use super::AttributeValue;
use crate::carrier::MessageAttributeCarrier;
use crate::process::TracedMessage;
use crate::propagator::extract_remote_span_context;
use crate::Error;
use chrono::{DateTime, Utc};
use opentelemetry::trace::SpanContext;
use opentelemetry::KeyValue;
use opentelemetry_semantic_conventions::attribute::{
    MESSAGING_DESTINATION_NAME, MESSAGING_MESSAGE_ID, MESSAGING_OPERATION_TYPE, MESSAGING_SYSTEM,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// An SNS notification as delivered to HTTP/S endpoints, and as written into
/// the body of SQS messages when raw message delivery is disabled.
///
/// See <https://docs.aws.amazon.com/sns/latest/dg/sns-message-and-json-formats.html#http-notification-json>.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Entity {
    #[serde(rename = "Type")]
    pub kind: String,
    pub message_id: String,
    pub topic_arn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub signature_version: String,
    pub signature: String,
    #[serde(alias = "SigningCertURL")]
    pub signing_cert_url: String,
    #[serde(alias = "UnsubscribeURL")]
    pub unsubscribe_url: String,
    pub message_attributes: HashMap<String, AttributeValue>,
}

impl Entity {
    /// The message attributes as a propagation carrier.
    pub fn carrier(&self) -> MessageAttributeCarrier<&HashMap<String, AttributeValue>> {
        MessageAttributeCarrier::new(&self.message_attributes)
    }

    /// The topic name, taken from the last segment of the topic ARN.
    pub fn topic_name(&self) -> Option<&str> {
        self.topic_arn
            .rsplit(':')
            .next()
            .filter(|name| !name.is_empty())
    }
}

impl FromStr for Entity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

impl TracedMessage for Entity {
    const INSTRUMENTATION_SCOPE: &'static str = "opentelemetry-aws-pubsub/sns";

    fn remote_span_context(&self) -> Option<SpanContext> {
        extract_remote_span_context(&self.carrier())
    }

    fn messaging_attributes(&self) -> Vec<KeyValue> {
        let mut attributes = vec![
            KeyValue::new(MESSAGING_SYSTEM, "aws.sns"),
            KeyValue::new(MESSAGING_OPERATION_TYPE, "process"),
        ];
        if !self.message_id.is_empty() {
            attributes.push(KeyValue::new(MESSAGING_MESSAGE_ID, self.message_id.clone()));
        }
        if let Some(topic) = self.topic_name() {
            attributes.push(KeyValue::new(MESSAGING_DESTINATION_NAME, topic.to_owned()));
        }
        attributes
    }
}
