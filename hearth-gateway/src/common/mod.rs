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

pub use catalog::ComponentCatalog;
pub use clock::{ManualClock, SystemClock};
pub use component_handle::ComponentHandle;
pub use config::{
    DeliveryConfig, GatewayConfig, LibrarySpec, LoaderConfig, LoggingConfig, ModuleSpec,
    NodeIdentity, RegistryConfig,
};
pub use delayed_queue::DelayedMessageQueue;
pub use distribution_list::{DistributionList, ALL_SUBSCRIBERS};
pub use error::{GatewayError, GatewayResult, ReferenceKind};
pub use loader::Loader;
pub use logging::init_tracing;
pub use references::{InMemoryReferences, NullResolver};
pub use registry::ComponentRegistry;
pub use reply::Reply;
pub use router::{Router, RouterBuilder, SendReceipt, SweepReport};
pub use stats::{RouterStats, RouterStatsSnapshot};
pub use transport::UnroutableTransport;
pub use types::{ComponentFactory, HookFuture};
pub(crate) use types::{ComponentInbox, ComponentSender, MessageReactor, PhaseHook};

mod catalog;
mod clock;
mod component_handle;
mod config;
mod delayed_queue;
mod distribution_list;
mod error;
mod fuzzy;
mod loader;
mod logging;
mod references;
mod registry;
mod reply;
mod router;
mod stats;
mod transport;
mod types;
