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
use serde_json::{Map, Value};

use crate::common::{GatewayError, GatewayResult, NodeIdentity, Router, SendReceipt};
use crate::message::auth::{self, MessageAuth};
use crate::message::{
    ComponentAddress, Hop, MessageBuilder, MessageId, MessagePath, MessageStatus, MessageType,
    OriginTag, Payload,
};
use crate::traits::Authenticator;

/// A routed message between gateway components.
///
/// Messages are built with [`Message::builder`], then handed to
/// [`Message::send`], which consumes them. Origin and destination are stored
/// lower-case and the id never changes once assigned.
#[derive(Debug, Clone)]
pub struct Message {
    pub(crate) message_id: MessageId,
    pub(crate) origin: String,
    pub(crate) destination: String,
    pub(crate) msg_type: MessageType,
    pub(crate) status: MessageStatus,
    pub(crate) status_detail: Option<String>,
    pub(crate) human_status: Option<String>,
    pub(crate) payload: Payload,
    pub(crate) path: MessagePath,
    pub(crate) delivered_to: IndexSet<String>,
    pub(crate) not_before: f64,
    pub(crate) max_delay: f64,
    pub(crate) orig_message_id: Option<MessageId>,
    pub(crate) auth: MessageAuth,
    pub(crate) is_new: bool,
}

impl Message {
    /// Starts a new message with status `new`.
    pub fn builder(
        origin: impl Into<String>,
        destination: impl Into<String>,
        msg_type: impl Into<MessageType>,
    ) -> MessageBuilder {
        MessageBuilder::new(origin.into(), destination.into(), msg_type.into())
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn msg_type(&self) -> &MessageType {
        &self.msg_type
    }

    pub fn status(&self) -> &MessageStatus {
        &self.status
    }

    pub fn status_detail(&self) -> Option<&str> {
        self.status_detail.as_deref()
    }

    pub fn human_status(&self) -> Option<&str> {
        self.human_status.as_deref()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    pub fn path(&self) -> &MessagePath {
        &self.path
    }

    /// Components this message was handed to during its last send.
    pub fn delivered_to(&self) -> &IndexSet<String> {
        &self.delivered_to
    }

    /// Epoch seconds before which the message must not be delivered; zero means immediately.
    pub fn not_before(&self) -> f64 {
        self.not_before
    }

    /// Seconds past `not_before` after which the message is dropped.
    pub fn max_delay(&self) -> f64 {
        self.max_delay
    }

    pub fn orig_message_id(&self) -> Option<&MessageId> {
        self.orig_message_id.as_ref()
    }

    pub fn auth(&self) -> &MessageAuth {
        &self.auth
    }

    /// False for messages reconstructed from a serialized form.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Builds a reply: origin and destination swapped, same type, status
    /// `reply`, empty payload, linked back through `orig_message_id`.
    pub fn reply(&self) -> Message {
        Message {
            message_id: MessageId::generate(&OriginTag::default()),
            origin: self.destination.clone(),
            destination: self.origin.clone(),
            msg_type: self.msg_type.clone(),
            status: MessageStatus::Reply,
            status_detail: None,
            human_status: None,
            payload: Payload::default(),
            path: MessagePath::default(),
            delivered_to: IndexSet::new(),
            not_before: 0.0,
            max_delay: 0.0,
            orig_message_id: Some(self.message_id.clone()),
            auth: MessageAuth::default(),
            is_new: true,
        }
    }

    /// A reply builder for overriding status, detail or payload.
    pub fn reply_builder(&self) -> MessageBuilder {
        MessageBuilder::new(
            self.destination.clone(),
            self.origin.clone(),
            self.msg_type.clone(),
        )
        .status(MessageStatus::Reply)
        .orig_message_id(self.message_id.clone())
    }

    /// Lower-cases origin and destination in place.
    pub fn normalize_addresses(&mut self) {
        self.origin = self.origin.trim().to_lowercase();
        self.destination = self.destination.trim().to_lowercase();
    }

    /// True when every hop so far happened on this node.
    pub fn is_origin_local(&self, identity: &NodeIdentity) -> GatewayResult<bool> {
        for hop in self.path.hops() {
            if hop.external {
                return Ok(false);
            }
            if !ComponentAddress::parse(&hop.component)?.is_local_to(&identity.node_id) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// True when the destination has no node suffix or names this node.
    pub fn is_destination_local(&self, identity: &NodeIdentity) -> GatewayResult<bool> {
        Ok(ComponentAddress::parse(&self.destination)?.is_local_to(&identity.node_id))
    }

    pub fn is_origin_full(&self) -> GatewayResult<bool> {
        Ok(ComponentAddress::parse(&self.origin)?.is_full())
    }

    pub fn is_destination_full(&self) -> GatewayResult<bool> {
        Ok(ComponentAddress::parse(&self.destination)?.is_full())
    }

    /// Records a hop and returns its id.
    ///
    /// Local hops must sit under the node's local prefix and get the node id
    /// appended when they carry none. External hops are recorded as given.
    pub fn add_path(
        &mut self,
        component: &str,
        external: bool,
        identity: &NodeIdentity,
    ) -> GatewayResult<String> {
        let address = ComponentAddress::parse(component)?;
        let component = if external {
            address.to_string()
        } else {
            if !address.has_prefix(&identity.local_prefix) {
                return Err(GatewayError::malformed_address(
                    address.to_string(),
                    format!("local hops must start with '{}'", identity.local_prefix),
                ));
            }
            if address.is_full() {
                address.to_string()
            } else {
                address.with_node(&identity.node_id).to_string()
            }
        };
        Ok(self.path.push(Hop {
            component,
            external,
        }))
    }

    /// [`add_path`](Self::add_path) for a name relative to the local prefix.
    pub fn add_local_path(
        &mut self,
        suffix: &str,
        external: bool,
        identity: &NodeIdentity,
    ) -> GatewayResult<String> {
        let component = identity.qualify(suffix);
        self.add_path(&component, external, identity)
    }

    /// Signs the message and stores `{signature, username}` in its auth block.
    ///
    /// Sign after [`validate`](Self::validate) so the payload already holds
    /// the resolved references a receiver will see.
    pub fn generate_auth(&mut self, username: &str, authenticator: &dyn Authenticator) -> GatewayResult<()> {
        self.auth = auth::sign(self, username, authenticator)?;
        Ok(())
    }

    /// Checks the auth block against the live message fields.
    pub fn verify_auth(&self, authenticator: Option<&dyn Authenticator>) -> GatewayResult<()> {
        auth::verify(self, authenticator)
    }

    /// Bulk update of routing fields; unknown keys are rejected.
    pub fn update(&mut self, fields: Map<String, Value>) -> GatewayResult<()> {
        for (key, value) in fields {
            match key.as_str() {
                "origin" => self.origin = expect_string(&key, value)?.to_lowercase(),
                "destination" => self.destination = expect_string(&key, value)?.to_lowercase(),
                "type" => self.msg_type = MessageType::from(expect_string(&key, value)?),
                "status" => self.status = MessageStatus::from(expect_string(&key, value)?),
                "status_detail" => self.status_detail = expect_optional_string(&key, value)?,
                "human_status" => self.human_status = expect_optional_string(&key, value)?,
                "payload" => match value {
                    Value::Object(map) => self.payload = Payload::from(map),
                    other => {
                        return Err(GatewayError::MalformedMessage(format!(
                            "payload must be an object, found {other}"
                        )))
                    }
                },
                "not_before" => self.not_before = expect_seconds(&key, value)?,
                "max_delay" => self.max_delay = expect_seconds(&key, value)?,
                _ => {
                    return Err(GatewayError::MalformedMessage(format!(
                        "'{key}' cannot be updated"
                    )))
                }
            }
        }
        Ok(())
    }

    /// True once `now` is past `not_before + max_delay`.
    pub fn is_expired_at(&self, now: f64) -> bool {
        self.not_before > 0.0 && now > self.not_before + self.max_delay
    }

    /// Hands the message to the router for delivery.
    pub async fn send(self, router: &Router) -> GatewayResult<SendReceipt> {
        router.route(self).await
    }
}

fn expect_string(key: &str, value: Value) -> GatewayResult<String> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(GatewayError::MalformedMessage(format!(
            "'{key}' must be a string, found {other}"
        ))),
    }
}

fn expect_optional_string(key: &str, value: Value) -> GatewayResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        other => expect_string(key, other).map(Some),
    }
}

fn expect_seconds(key: &str, value: Value) -> GatewayResult<f64> {
    value
        .as_f64()
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .ok_or_else(|| {
            GatewayError::MalformedMessage(format!("'{key}' must be a non-negative number"))
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn identity() -> NodeIdentity {
        NodeIdentity {
            node_id: "node1".into(),
            local_prefix: "gateway".into(),
        }
    }

    fn message() -> Message {
        Message::builder("Gateway.Lib.A", "gateway.lib.b", MessageType::Status)
            .build()
            .unwrap()
    }

    #[test]
    fn reply_links_back_to_request() {
        let request = message();
        let reply = request.reply();
        assert_eq!(reply.origin(), "gateway.lib.b");
        assert_eq!(reply.destination(), "gateway.lib.a");
        assert_eq!(reply.orig_message_id(), Some(request.message_id()));
        assert_eq!(reply.status(), &MessageStatus::Reply);
        assert_eq!(reply.msg_type(), &MessageType::Status);
        assert!(reply.payload().is_empty());
        assert_ne!(reply.message_id(), request.message_id());
    }

    #[test]
    fn fresh_message_is_origin_local() {
        assert!(message().is_origin_local(&identity()).unwrap());
    }

    #[test]
    fn external_hop_makes_origin_remote() {
        let mut message = message();
        message.add_path("controller.cloud:abc", true, &identity()).unwrap();
        assert!(!message.is_origin_local(&identity()).unwrap());
    }

    #[test]
    fn local_hops_get_node_suffix() {
        let mut message = message();
        let hop_id = message.add_local_path("lib.a", false, &identity()).unwrap();
        let hop = message.path().get(&hop_id).unwrap();
        assert_eq!(hop.component, "gateway.lib.a:node1");
        assert!(message.is_origin_local(&identity()).unwrap());

        let err = message.add_path("elsewhere.lib", false, &identity()).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedAddress { .. }));
    }

    #[test]
    fn destination_with_two_separators_is_malformed() {
        let mut message = message();
        message.destination = "a:b:c".into();
        assert!(matches!(
            message.is_destination_local(&identity()),
            Err(GatewayError::MalformedAddress { .. })
        ));
    }

    #[test]
    fn update_rejects_unknown_keys() {
        let mut message = message();
        let fields = json!({"status": "done", "destination": "Gateway.Lib.C"});
        message.update(fields.as_object().cloned().unwrap()).unwrap();
        assert_eq!(message.status(), &MessageStatus::Done);
        assert_eq!(message.destination(), "gateway.lib.c");

        let fields = json!({"message_id": "x"});
        let err = message.update(fields.as_object().cloned().unwrap()).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedMessage(_)));
    }

    #[test]
    fn expiry_window_ends_at_max_delay() {
        let mut message = message();
        message.not_before = 100.0;
        message.max_delay = 10.0;
        assert!(!message.is_expired_at(99.0));
        assert!(!message.is_expired_at(110.0));
        assert!(message.is_expired_at(110.001));

        message.max_delay = 0.0;
        assert!(!message.is_expired_at(100.0));
        assert!(message.is_expired_at(100.001));

        message.not_before = 0.0;
        assert!(!message.is_expired_at(1e12));
    }

    #[test]
    fn foreign_node_hop_makes_origin_remote() {
        let mut message = message();
        message.add_path("gateway.lib.x:node2", false, &identity()).unwrap();
        assert!(!message.path().hops().any(|hop| hop.external));
        assert!(!message.is_origin_local(&identity()).unwrap());
    }
}
