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

use serde::{Deserialize, Serialize};

use crate::common::{GatewayError, GatewayResult, NodeIdentity};
use crate::message::{Message, MessageAuth, MessageId, MessagePath, Payload};

/// The flat form a message takes when it leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedMessage {
    pub message_id: String,
    pub origin: String,
    pub destination: String,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub status: String,
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default)]
    pub auth: MessageAuth,
    #[serde(default)]
    pub not_before: f64,
    #[serde(default)]
    pub max_delay: f64,
    #[serde(default)]
    pub orig_message_id: Option<String>,
    #[serde(default)]
    pub path: MessagePath,
}

impl Message {
    pub fn to_serialized(&self) -> SerializedMessage {
        SerializedMessage {
            message_id: self.message_id.as_str().to_string(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            msg_type: self.msg_type.as_str().to_string(),
            status: self.status.as_str().to_string(),
            status_detail: self.status_detail.clone(),
            payload: self.payload.clone(),
            auth: self.auth.clone(),
            not_before: self.not_before,
            max_delay: self.max_delay,
            orig_message_id: self
                .orig_message_id
                .as_ref()
                .map(|id| id.as_str().to_string()),
            path: self.path.clone(),
        }
    }

    /// Serialized form for another node; both addresses must name their node.
    pub fn to_external(&self, identity: &NodeIdentity) -> GatewayResult<SerializedMessage> {
        if !self.is_origin_full()? {
            return Err(GatewayError::malformed_address(
                self.origin.as_str(),
                format!("origin must carry a node id before leaving node '{}'", identity.node_id),
            ));
        }
        if !self.is_destination_full()? {
            return Err(GatewayError::malformed_address(
                self.destination.as_str(),
                "destination must carry a node id to be routed externally",
            ));
        }
        Ok(self.to_serialized())
    }

    /// Rebuilds a message received from elsewhere. The result is not new.
    pub fn from_serialized(serialized: SerializedMessage) -> GatewayResult<Message> {
        let mut builder = Message::builder(
            serialized.origin,
            serialized.destination,
            serialized.msg_type.as_str(),
        )
        .existing()
        .message_id(serialized.message_id)
        .status(serialized.status.as_str())
        .payload(serialized.payload)
        .path(serialized.path)
        .auth(serialized.auth)
        .not_before(serialized.not_before)
        .max_delay(serialized.max_delay);
        if let Some(detail) = serialized.status_detail {
            builder = builder.status_detail(detail);
        }
        if let Some(orig) = serialized.orig_message_id {
            builder = builder.orig_message_id(MessageId::parse(&orig)?);
        }
        builder.build()
    }
}
