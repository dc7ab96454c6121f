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

pub use address::ComponentAddress;
pub use auth::MessageAuth;
pub use builder::MessageBuilder;
pub(crate) use envelope::Envelope;
pub use kinds::{MessageStatus, MessageType};
pub use message::Message;
pub use message_id::{MessageId, OriginTag, MESSAGE_ID_LEN};
pub use path::{Hop, MessagePath};
pub use payload::{Command, Device, Payload};
pub use serialized::SerializedMessage;
pub use validation::ValidationContext;

pub use crate::common::ReferenceKind;

mod address;
pub(crate) mod auth;
mod builder;
mod envelope;
mod kinds;
#[allow(clippy::module_inception)]
mod message;
mod message_id;
mod path;
mod payload;
mod serialized;
mod validation;
