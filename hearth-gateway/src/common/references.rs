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

use std::collections::HashMap;
use std::sync::Arc;

use crate::message::{Command, Device};
use crate::traits::ReferenceResolver;

/// Commands, devices and device owners held in memory.
///
/// Labels are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferences {
    commands: HashMap<String, Arc<Command>>,
    devices: HashMap<String, Arc<Device>>,
    owners: HashMap<String, String>,
}

impl InMemoryReferences {
    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.insert(command.id.clone(), Arc::new(command));
        self
    }

    /// Adds a device and the module that routes its commands.
    pub fn with_device(mut self, device: Device, owner: impl Into<String>) -> Self {
        self.owners.insert(device.id.clone(), owner.into());
        self.devices.insert(device.id.clone(), Arc::new(device));
        self
    }
}

impl ReferenceResolver for InMemoryReferences {
    fn command_by_id(&self, id: &str) -> Option<Arc<Command>> {
        self.commands.get(id).cloned()
    }

    fn command_by_label(&self, label: &str) -> Option<Arc<Command>> {
        self.commands
            .values()
            .find(|command| command.label.eq_ignore_ascii_case(label))
            .cloned()
    }

    fn device_by_id(&self, id: &str) -> Option<Arc<Device>> {
        self.devices.get(id).cloned()
    }

    fn device_by_label(&self, label: &str) -> Option<Arc<Device>> {
        self.devices
            .values()
            .find(|device| device.label.eq_ignore_ascii_case(label))
            .cloned()
    }

    fn device_owner(&self, device: &Device) -> Option<String> {
        self.owners.get(&device.id).cloned()
    }
}

/// Resolves nothing. Commands sent through a router using it fail validation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl ReferenceResolver for NullResolver {
    fn command_by_id(&self, _id: &str) -> Option<Arc<Command>> {
        None
    }

    fn command_by_label(&self, _label: &str) -> Option<Arc<Command>> {
        None
    }

    fn device_by_id(&self, _id: &str) -> Option<Arc<Device>> {
        None
    }

    fn device_by_label(&self, _label: &str) -> Option<Arc<Device>> {
        None
    }

    fn device_owner(&self, _device: &Device) -> Option<String> {
        None
    }
}
