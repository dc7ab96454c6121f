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

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::common::{ComponentHandle, Router};
use crate::component::{Awake, ManagedComponent};
use crate::message::{Envelope, Message};

/// The boxed future every hook and message handler returns.
pub type HookFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// A lifecycle hook registered with `on_init`, `on_load` and friends.
pub(crate) type PhaseHook<Model> =
    Box<dyn for<'a> Fn(&'a mut ManagedComponent<Awake, Model>) -> HookFuture + Send + Sync + 'static>;

/// The handler registered with `on_message`.
pub(crate) type MessageReactor<Model> = Box<
    dyn for<'a> Fn(&'a mut ManagedComponent<Awake, Model>, Message) -> HookFuture
        + Send
        + Sync
        + 'static,
>;

/// Builds and spawns a component for the loader.
pub type ComponentFactory = Arc<dyn Fn(&Router) -> ComponentHandle + Send + Sync + 'static>;

pub(crate) type ComponentSender = mpsc::Sender<Envelope>;
pub(crate) type ComponentInbox = mpsc::Receiver<Envelope>;
