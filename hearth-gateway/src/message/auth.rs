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
use sha2::{Digest, Sha256};

use crate::common::{GatewayError, GatewayResult};
use crate::message::{Message, Payload};
use crate::traits::Authenticator;

/// Signature and sender identity attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAuth {
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub username: String,
}

/// The fields covered by a message signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AuthDigest {
    origin: String,
    destination: String,
    #[serde(rename = "type")]
    msg_type: String,
    status: String,
    status_detail: Option<String>,
    message_id: String,
    username: String,
    payload_hash: String,
}

impl AuthDigest {
    pub(crate) fn of(message: &Message, username: &str) -> Self {
        AuthDigest {
            origin: message.origin().to_string(),
            destination: message.destination().to_string(),
            msg_type: message.msg_type().as_str().to_string(),
            status: message.status().as_str().to_string(),
            status_detail: message.status_detail().map(str::to_string),
            message_id: message.message_id().as_str().to_string(),
            username: username.to_string(),
            payload_hash: payload_hash(message.payload()),
        }
    }

    pub(crate) fn to_bytes(&self) -> GatewayResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| GatewayError::MalformedMessage(format!("cannot encode signed fields: {e}")))
    }

    /// Name of the first field that differs, if any.
    fn first_mismatch(&self, other: &AuthDigest) -> Option<&'static str> {
        let checks = [
            ("origin", self.origin == other.origin),
            ("destination", self.destination == other.destination),
            ("type", self.msg_type == other.msg_type),
            ("status", self.status == other.status),
            ("status_detail", self.status_detail == other.status_detail),
            ("message_id", self.message_id == other.message_id),
            ("username", self.username == other.username),
            ("payload", self.payload_hash == other.payload_hash),
        ];
        checks
            .into_iter()
            .find_map(|(field, same)| (!same).then_some(field))
    }
}

/// Hex SHA-256 over the payload values in key order, one `key=<json>` line each.
pub(crate) fn payload_hash(payload: &Payload) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in payload.values() {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.to_string().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

pub(crate) fn sign(message: &Message, username: &str, authenticator: &dyn Authenticator) -> GatewayResult<MessageAuth> {
    let canonical = AuthDigest::of(message, username).to_bytes()?;
    let signature = authenticator
        .sign(&canonical)
        .map_err(|e| GatewayError::AuthMismatch(format!("signing failed: {e:#}")))?;
    Ok(MessageAuth {
        signature: Some(signature),
        username: username.to_string(),
    })
}

pub(crate) fn verify(message: &Message, authenticator: Option<&dyn Authenticator>) -> GatewayResult<()> {
    let auth = message.auth();
    let signature = auth.signature.as_deref().ok_or_else(|| {
        GatewayError::AuthMismatch("message from a non-local origin carries no signature".into())
    })?;
    let authenticator = authenticator
        .ok_or_else(|| GatewayError::AuthMismatch("no authenticator is configured".into()))?;
    let canonical = authenticator
        .verify(signature)
        .map_err(|e| GatewayError::AuthMismatch(format!("signature rejected: {e:#}")))?;
    let signed: AuthDigest = serde_json::from_slice(&canonical)
        .map_err(|e| GatewayError::AuthMismatch(format!("signed fields unreadable: {e}")))?;
    let live = AuthDigest::of(message, &auth.username);
    match signed.first_mismatch(&live) {
        None => Ok(()),
        Some(field) => Err(GatewayError::AuthMismatch(format!(
            "{field} does not match the signature"
        ))),
    }
}
