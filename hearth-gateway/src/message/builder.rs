/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use indexmap::IndexSet;
use serde_json::Value;

use crate::common::{GatewayError, GatewayResult, SystemClock};
use crate::message::{
    Message, MessageAuth, MessageId, MessagePath, MessageStatus, MessageType, OriginTag, Payload,
};
use crate::traits::Clock;

/// Collects the fields of a [`Message`] before it exists.
///
/// Fresh messages get a generated id. Messages rebuilt from elsewhere are
/// marked with [`existing`](Self::existing) and must carry their original id.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    origin: String,
    destination: String,
    msg_type: MessageType,
    status: MessageStatus,
    status_detail: Option<String>,
    human_status: Option<String>,
    payload: Payload,
    path: MessagePath,
    message_id: Option<String>,
    orig_message_id: Option<MessageId>,
    not_before: Option<f64>,
    delay: Option<f64>,
    max_delay: f64,
    auth: MessageAuth,
    is_new: bool,
    tag: OriginTag,
}

impl MessageBuilder {
    pub(crate) fn new(origin: String, destination: String, msg_type: MessageType) -> Self {
        MessageBuilder {
            origin,
            destination,
            msg_type,
            status: MessageStatus::New,
            status_detail: None,
            human_status: None,
            payload: Payload::default(),
            path: MessagePath::default(),
            message_id: None,
            orig_message_id: None,
            not_before: None,
            delay: None,
            max_delay: 0.0,
            auth: MessageAuth::default(),
            is_new: true,
            tag: OriginTag::default(),
        }
    }

    pub fn status(mut self, status: impl Into<MessageStatus>) -> Self {
        self.status = status.into();
        self
    }

    pub fn status_detail(mut self, detail: impl Into<String>) -> Self {
        self.status_detail = Some(detail.into());
        self
    }

    pub fn human_status(mut self, text: impl Into<String>) -> Self {
        self.human_status = Some(text.into());
        self
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn payload_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key, value);
        self
    }

    pub fn path(mut self, path: MessagePath) -> Self {
        self.path = path;
        self
    }

    /// Uses a known id instead of generating one.
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    pub fn orig_message_id(mut self, id: MessageId) -> Self {
        self.orig_message_id = Some(id);
        self
    }

    /// Absolute epoch seconds before which the message is held.
    pub fn not_before(mut self, epoch_seconds: f64) -> Self {
        self.not_before = Some(epoch_seconds);
        self
    }

    /// Relative hold, in seconds from construction. Ignored when `not_before` is set.
    pub fn delay(mut self, seconds: f64) -> Self {
        self.delay = Some(seconds);
        self
    }

    pub fn max_delay(mut self, seconds: f64) -> Self {
        self.max_delay = seconds;
        self
    }

    pub fn auth(mut self, auth: MessageAuth) -> Self {
        self.auth = auth;
        self
    }

    /// Tag embedded in generated ids.
    pub fn tag(mut self, tag: OriginTag) -> Self {
        self.tag = tag;
        self
    }

    /// Marks the message as reconstructed rather than freshly created.
    pub fn existing(mut self) -> Self {
        self.is_new = false;
        self
    }

    pub fn build(self) -> GatewayResult<Message> {
        self.build_with_clock(&SystemClock)
    }

    /// Builds against `clock`, which anchors `delay` and the past-time check.
    pub fn build_with_clock(self, clock: &dyn Clock) -> GatewayResult<Message> {
        let origin = self.origin.trim().to_lowercase();
        let destination = self.destination.trim().to_lowercase();
        if origin.is_empty() {
            return Err(GatewayError::MalformedMessage("origin is required".into()));
        }
        if destination.is_empty() {
            return Err(GatewayError::MalformedMessage("destination is required".into()));
        }

        let message_id = match (self.message_id, self.is_new) {
            (Some(raw), _) => MessageId::parse(&raw)?,
            (None, true) => MessageId::generate(&self.tag),
            (None, false) => {
                return Err(GatewayError::MalformedMessage(
                    "an existing message must carry its message_id".into(),
                ))
            }
        };

        if !self.max_delay.is_finite() || self.max_delay < 0.0 {
            return Err(GatewayError::MalformedMessage(format!(
                "max_delay must be a non-negative number of seconds, got {}",
                self.max_delay
            )));
        }

        let now = clock.now();
        let not_before = match (self.not_before, self.delay) {
            (Some(at), _) => at,
            (None, Some(delay)) if delay > 0.0 => now + delay,
            _ => 0.0,
        };
        if !not_before.is_finite() || not_before < 0.0 {
            return Err(GatewayError::MalformedMessage(format!(
                "not_before must be a non-negative epoch time, got {not_before}"
            )));
        }
        if self.is_new && not_before > 0.0 && not_before < now {
            return Err(GatewayError::MalformedMessage(
                "not_before is in the past".into(),
            ));
        }

        Ok(Message {
            message_id,
            origin,
            destination,
            msg_type: self.msg_type,
            status: self.status,
            status_detail: self.status_detail,
            human_status: self.human_status,
            payload: self.payload,
            path: self.path,
            delivered_to: IndexSet::new(),
            not_before,
            max_delay: self.max_delay,
            orig_message_id: self.orig_message_id,
            auth: self.auth,
            is_new: self.is_new,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ManualClock;

    #[test]
    fn existing_message_requires_id() {
        let err = Message::builder("gateway.lib.a", "gateway.lib.b", "status")
            .existing()
            .build()
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedMessage(_)));
    }

    #[test]
    fn delay_is_relative_to_clock() {
        let clock = ManualClock::new(1_000.0);
        let message = Message::builder("gateway.lib.a", "gateway.lib.b", "cmd")
            .delay(30.0)
            .max_delay(5.0)
            .build_with_clock(&clock)
            .unwrap();
        assert_eq!(message.not_before(), 1_030.0);
        assert_eq!(message.max_delay(), 5.0);
        assert_eq!(message.status(), &MessageStatus::New);
    }

    #[test]
    fn rejects_past_not_before_and_negative_max_delay() {
        let clock = ManualClock::new(1_000.0);
        let past = Message::builder("gateway.lib.a", "gateway.lib.b", "cmd")
            .not_before(900.0)
            .build_with_clock(&clock);
        assert!(matches!(past, Err(GatewayError::MalformedMessage(_))));

        let negative = Message::builder("gateway.lib.a", "gateway.lib.b", "cmd")
            .max_delay(-1.0)
            .build_with_clock(&clock);
        assert!(matches!(negative, Err(GatewayError::MalformedMessage(_))));

        let rebuilt = Message::builder("gateway.lib.a", "gateway.lib.b", "cmd")
            .existing()
            .message_id(MessageId::generate(&OriginTag::default()).as_str())
            .not_before(900.0)
            .build_with_clock(&clock);
        assert!(rebuilt.is_ok());
    }
}
