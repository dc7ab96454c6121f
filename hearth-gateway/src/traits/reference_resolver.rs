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

use std::fmt::Debug;
use std::sync::Arc;

use crate::message::{Command, Device};

/// Looks up commands, devices and the module that handles each device.
///
/// Lookups are synchronous; implementations are expected to answer from
/// memory.
pub trait ReferenceResolver: Debug + Send + Sync {
    fn command_by_id(&self, id: &str) -> Option<Arc<Command>>;

    fn command_by_label(&self, label: &str) -> Option<Arc<Command>>;

    fn device_by_id(&self, id: &str) -> Option<Arc<Device>>;

    fn device_by_label(&self, label: &str) -> Option<Arc<Device>>;

    /// Name of the module that routes commands for `device`.
    fn device_owner(&self, device: &Device) -> Option<String>;
}
