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

//! # hearth gateway
//!
//! The message routing core of a home-automation gateway. Components (core
//! *libraries* and pluggable *modules*) run as tokio tasks with their own inbox.
//! A [`Loader`](prelude::Loader) brings them up in ordered phases, and the
//! [`Router`](prelude::Router) delivers [`Message`](prelude::Message)s between
//! them: directly to a destination, to every subscriber of a message type, and
//! to catch-all subscribers. Messages sent before startup completes are held
//! and replayed in order; messages with a future `not_before` wait in a delayed
//! queue until due, and are dropped once they exceed their `max_delay`.
//!
//! ```ignore
//! let config = GatewayConfig::load();
//! let router = Router::builder(&config).build();
//! let loader = Loader::new(config, router, catalog);
//! loader.start().await?;
//!
//! let message = Message::builder("gateway.lib.automation", "gateway.modules.x10", MessageType::Cmd)
//!     .payload_value("command", "on")
//!     .payload_value("device", "porch light")
//!     .build()?;
//! message.send(loader.router()).await?;
//! ```

#![forbid(unsafe_code)]

pub(crate) mod common;
pub(crate) mod component;
pub(crate) mod message;
pub(crate) mod traits;

/// Everything needed to build components and route messages.
pub mod prelude {
    pub use async_trait;
    pub use tokio;

    pub use crate::common::{
        init_tracing, ComponentCatalog, ComponentFactory, ComponentHandle, ComponentRegistry,
        DelayedMessageQueue, DeliveryConfig, DistributionList, GatewayConfig, GatewayError,
        GatewayResult, HookFuture, InMemoryReferences, LibrarySpec, Loader, LoaderConfig,
        LoggingConfig, ManualClock, ModuleSpec, NodeIdentity, NullResolver, RegistryConfig, Reply,
        Router, RouterBuilder, RouterStats, RouterStatsSnapshot, SendReceipt, SweepReport,
        SystemClock, UnroutableTransport, ALL_SUBSCRIBERS,
    };
    pub use crate::component::{
        Awake, ComponentKind, ComponentState, HookOutcome, Idle, ManagedComponent, Phase,
    };
    pub use crate::message::{
        Command, ComponentAddress, Device, Hop, Message, MessageAuth, MessageBuilder, MessageId,
        MessagePath, MessageStatus, MessageType, OriginTag, Payload, ReferenceKind,
        SerializedMessage, ValidationContext, MESSAGE_ID_LEN,
    };
    pub use crate::traits::{Authenticator, Clock, ExternalTransport, ReferenceResolver};
}
