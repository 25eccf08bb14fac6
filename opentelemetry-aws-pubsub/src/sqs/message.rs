//! SQS messages as delivered by the Lambda SQS event source, and as received
//! through the SDK.

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

const INSTRUMENTATION_SCOPE: &str = "opentelemetry-aws-pubsub/sqs";
const MESSAGING_SYSTEM_SQS: &str = "aws_sqs";

const SENT_TIMESTAMP: &str = "SentTimestamp";
const APPROXIMATE_FIRST_RECEIVE_TIMESTAMP: &str = "ApproximateFirstReceiveTimestamp";
const APPROXIMATE_RECEIVE_COUNT: &str = "ApproximateReceiveCount";
const SENDER_ID: &str = "SenderId";

/// A batch of SQS messages delivered to a Lambda function.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "Records", alias = "records", default)]
    pub records: Vec<Message>,
}

impl FromStr for Event {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

/// One record of a Lambda SQS event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Message {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    /// System attributes such as `SentTimestamp`.
    pub attributes: HashMap<String, String>,
    pub message_attributes: HashMap<String, AttributeValue>,
    pub md5_of_body: String,
    pub md5_of_message_attributes: String,
    pub event_source: String,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    pub aws_region: String,
}

impl Message {
    /// The message attributes as a propagation carrier.
    pub fn carrier(&self) -> MessageAttributeCarrier<&HashMap<String, AttributeValue>> {
        MessageAttributeCarrier::new(&self.message_attributes)
    }

    /// The queue name, taken from the last segment of the event source ARN.
    pub fn queue_name(&self) -> Option<&str> {
        self.event_source_arn
            .rsplit(':')
            .next()
            .filter(|name| !name.is_empty())
    }

    /// When the message was sent to the queue.
    pub fn sent_timestamp(&self) -> Option<DateTime<Utc>> {
        self.epoch_millis(SENT_TIMESTAMP)
    }

    /// When the message was first received from the queue.
    pub fn approximate_first_receive_timestamp(&self) -> Option<DateTime<Utc>> {
        self.epoch_millis(APPROXIMATE_FIRST_RECEIVE_TIMESTAMP)
    }

    pub fn approximate_receive_count(&self) -> Option<u32> {
        self.attributes.get(APPROXIMATE_RECEIVE_COUNT)?.parse().ok()
    }

    pub fn sender_id(&self) -> Option<&str> {
        self.attributes.get(SENDER_ID).map(String::as_str)
    }

    fn epoch_millis(&self, name: &str) -> Option<DateTime<Utc>> {
        let millis = self.attributes.get(name)?.parse().ok()?;
        DateTime::from_timestamp_millis(millis)
    }
}

impl FromStr for Message {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

fn messaging_attributes(message_id: Option<&str>, queue_name: Option<&str>) -> Vec<KeyValue> {
    let mut attributes = vec![
        KeyValue::new(MESSAGING_SYSTEM, MESSAGING_SYSTEM_SQS),
        KeyValue::new(MESSAGING_OPERATION_TYPE, "process"),
    ];
    if let Some(id) = message_id.filter(|id| !id.is_empty()) {
        attributes.push(KeyValue::new(MESSAGING_MESSAGE_ID, id.to_owned()));
    }
    if let Some(queue) = queue_name {
        attributes.push(KeyValue::new(MESSAGING_DESTINATION_NAME, queue.to_owned()));
    }
    attributes
}

impl TracedMessage for Message {
    const INSTRUMENTATION_SCOPE: &'static str = INSTRUMENTATION_SCOPE;

    fn remote_span_context(&self) -> Option<SpanContext> {
        extract_remote_span_context(&self.carrier())
    }

    fn messaging_attributes(&self) -> Vec<KeyValue> {
        messaging_attributes(Some(self.message_id.as_str()), self.queue_name())
    }
}

impl TracedMessage for aws_sdk_sqs::types::Message {
    const INSTRUMENTATION_SCOPE: &'static str = INSTRUMENTATION_SCOPE;

    fn remote_span_context(&self) -> Option<SpanContext> {
        let attributes = self.message_attributes.as_ref()?;
        extract_remote_span_context(&MessageAttributeCarrier::new(attributes))
    }

    fn messaging_attributes(&self) -> Vec<KeyValue> {
        messaging_attributes(self.message_id(), None)
    }
}
