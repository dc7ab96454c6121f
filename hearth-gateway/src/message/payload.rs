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

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{GatewayError, GatewayResult, ReferenceKind};
use crate::traits::ReferenceResolver;

pub(crate) const COMMAND_ID_KEY: &str = "command_id";
pub(crate) const COMMAND_LABEL_KEY: &str = "command";
pub(crate) const DEVICE_ID_KEY: &str = "device_id";
pub(crate) const DEVICE_LABEL_KEY: &str = "device";

/// A command a device can be asked to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: String,
    pub label: String,
}

impl Command {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Command {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A controllable device and the ids of the commands it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub label: String,
    pub device_type_id: String,
    pub available_commands: BTreeSet<String>,
}

impl Device {
    pub fn new(id: impl Into<String>, label: impl Into<String>, device_type_id: impl Into<String>) -> Self {
        Device {
            id: id.into(),
            label: label.into(),
            device_type_id: device_type_id.into(),
            available_commands: BTreeSet::new(),
        }
    }

    pub fn with_command(mut self, command_id: impl Into<String>) -> Self {
        self.available_commands.insert(command_id.into());
        self
    }

    pub fn accepts(&self, command: &Command) -> bool {
        self.available_commands.contains(&command.id)
    }
}

/// Message content: JSON values keyed by name, plus resolved references.
///
/// Resolved [`Command`] and [`Device`] objects ride along with the message
/// inside the process but are never serialized; only their ids and labels are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Payload {
    #[serde(flatten)]
    values: BTreeMap<String, Value>,
    #[serde(skip)]
    command: Option<Arc<Command>>,
    #[serde(skip)]
    device: Option<Arc<Device>>,
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Payload {
    pub fn new() -> Self {
        Payload::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Values in key order.
    pub fn values(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.command.is_none() && self.device.is_none()
    }

    pub fn command(&self) -> Option<&Arc<Command>> {
        self.command.as_ref()
    }

    pub fn device(&self) -> Option<&Arc<Device>> {
        self.device.as_ref()
    }

    /// Attaches a resolved command and records its id and label as values.
    pub fn set_command(&mut self, command: Arc<Command>) {
        self.values
            .insert(COMMAND_ID_KEY.to_string(), Value::String(command.id.clone()));
        self.values
            .insert(COMMAND_LABEL_KEY.to_string(), Value::String(command.label.clone()));
        self.command = Some(command);
    }

    /// Attaches a resolved device and records its id and label as values.
    pub fn set_device(&mut self, device: Arc<Device>) {
        self.values
            .insert(DEVICE_ID_KEY.to_string(), Value::String(device.id.clone()));
        self.values
            .insert(DEVICE_LABEL_KEY.to_string(), Value::String(device.label.clone()));
        self.device = Some(device);
    }

    /// Device id this payload targets, whether resolved or only named.
    pub(crate) fn device_id(&self) -> Option<&str> {
        self.device
            .as_ref()
            .map(|device| device.id.as_str())
            .or_else(|| self.get_str(DEVICE_ID_KEY))
    }

    /// Resolves the command: attached object first, then id, then label.
    pub(crate) fn resolve_command(&self, resolver: &dyn ReferenceResolver) -> GatewayResult<Arc<Command>> {
        if let Some(command) = &self.command {
            return Ok(Arc::clone(command));
        }
        if let Some(id) = self.reference_value(COMMAND_ID_KEY, ReferenceKind::Command)? {
            return resolver.command_by_id(id).ok_or_else(|| {
                GatewayError::unresolved(ReferenceKind::Command, format!("no command with id '{id}'"))
            });
        }
        if let Some(label) = self.reference_value(COMMAND_LABEL_KEY, ReferenceKind::Command)? {
            return resolver.command_by_label(label).ok_or_else(|| {
                GatewayError::unresolved(ReferenceKind::Command, format!("no command labelled '{label}'"))
            });
        }
        Err(GatewayError::unresolved(
            ReferenceKind::Command,
            "payload names no command",
        ))
    }

    /// Resolves the device: attached object first, then id, then label.
    pub(crate) fn resolve_device(&self, resolver: &dyn ReferenceResolver) -> GatewayResult<Arc<Device>> {
        if let Some(device) = &self.device {
            return Ok(Arc::clone(device));
        }
        if let Some(id) = self.reference_value(DEVICE_ID_KEY, ReferenceKind::Device)? {
            return resolver.device_by_id(id).ok_or_else(|| {
                GatewayError::unresolved(ReferenceKind::Device, format!("no device with id '{id}'"))
            });
        }
        if let Some(label) = self.reference_value(DEVICE_LABEL_KEY, ReferenceKind::Device)? {
            return resolver.device_by_label(label).ok_or_else(|| {
                GatewayError::unresolved(ReferenceKind::Device, format!("no device labelled '{label}'"))
            });
        }
        Err(GatewayError::unresolved(
            ReferenceKind::Device,
            "payload names no device",
        ))
    }

    fn reference_value(&self, key: &str, kind: ReferenceKind) -> GatewayResult<Option<&str>> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(other) => Err(GatewayError::unresolved(
                kind,
                format!("'{key}' must be a string, found {other}"),
            )),
        }
    }
}

impl From<serde_json::Map<String, Value>> for Payload {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Payload {
            values: map.into_iter().collect(),
            command: None,
            device: None,
        }
    }
}
