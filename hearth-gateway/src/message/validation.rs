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

use tracing::debug;

use crate::common::{GatewayError, GatewayResult, NodeIdentity, ReferenceKind};
use crate::message::{Message, MessageStatus, MessageType};
use crate::traits::{Authenticator, ReferenceResolver};

/// The collaborators a message is checked against before routing.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub identity: &'a NodeIdentity,
    pub resolver: &'a dyn ReferenceResolver,
    pub authenticator: Option<&'a dyn Authenticator>,
}

impl Message {
    /// Normalizes addresses, resolves new commands and checks authentication
    /// for messages that did not originate on this node.
    pub fn validate(&mut self, ctx: &ValidationContext<'_>) -> GatewayResult<()> {
        self.normalize_addresses();
        if self.msg_type == MessageType::Cmd && self.status == MessageStatus::New {
            self.resolve_and_route(ctx)?;
        }
        if !self.is_origin_local(ctx.identity)? {
            self.verify_auth(ctx.authenticator)?;
        }
        Ok(())
    }

    /// Resolves the command and, for local destinations, the device; then
    /// points the message at the module that owns the device.
    pub fn resolve_and_route(&mut self, ctx: &ValidationContext<'_>) -> GatewayResult<()> {
        let command = self.payload.resolve_command(ctx.resolver)?;
        self.payload.set_command(command.clone());

        if !self.is_destination_local(ctx.identity)? {
            return Ok(());
        }

        let device = self.payload.resolve_device(ctx.resolver)?;
        self.payload.set_device(device.clone());
        if !device.accepts(&command) {
            return Err(GatewayError::InvalidCommandForDevice {
                command: command.label.clone(),
                device: device.label.clone(),
            });
        }

        let owner = ctx
            .resolver
            .device_owner(&device)
            .ok_or_else(|| {
                GatewayError::unresolved(
                    ReferenceKind::Route,
                    format!("no module handles device type '{}'", device.device_type_id),
                )
            })?
            .to_lowercase();
        if self.destination != owner {
            debug!(
                message_id = %self.message_id,
                from = %self.destination,
                to = %owner,
                "rerouting command to the module that owns the device"
            );
            self.destination = owner;
        }
        Ok(())
    }
}
