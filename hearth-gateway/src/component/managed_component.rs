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
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

pub use awake::Awake;
pub use idle::Idle;

use crate::common::{MessageReactor, PhaseHook, Router};
use crate::component::{ComponentKind, Phase};

mod awake;
mod idle;

/// A gateway component: user state plus the hooks and handler that act on it.
///
/// Built in the [`Idle`] state, where hooks, a message handler and
/// subscriptions are registered. [`spawn`](ManagedComponent::spawn) moves it
/// into its own task in the [`Awake`] state and returns a
/// [`ComponentHandle`](crate::common::ComponentHandle). Hooks and the handler
/// then receive `&mut ManagedComponent<Awake, Model>`.
///
/// # Type Parameters
///
/// *   `State`: [`Idle`] or [`Awake`].
/// *   `Model`: the component's own state. Must implement `Default`, `Send`
///     and `Debug`, and be `'static`.
pub struct ManagedComponent<State, Model: Default + Send + Debug + 'static> {
    pub(crate) name: String,
    pub(crate) kind: ComponentKind,
    /// The component's own state, reachable from every hook and the handler.
    pub model: Model,
    pub(crate) router: Router,
    pub(crate) subscriptions: Vec<String>,
    pub(crate) reactors: Reactors<Model>,
    _state: PhantomData<State>,
}

/// Registered hooks and the message handler, moved out of the component when it wakes.
pub(crate) struct Reactors<Model: Default + Send + Debug + 'static> {
    pub(crate) hooks: HashMap<Phase, PhaseHook<Model>>,
    pub(crate) message: Option<MessageReactor<Model>>,
}

impl<Model: Default + Send + Debug + 'static> Default for Reactors<Model> {
    fn default() -> Self {
        Self {
            hooks: HashMap::new(),
            message: None,
        }
    }
}

impl<State, Model: Default + Send + Debug + 'static> ManagedComponent<State, Model> {
    /// Lower-cased component name, also its registry key.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub const fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// The router this component sends through.
    #[inline]
    pub const fn router(&self) -> &Router {
        &self.router
    }

    /// Message types this component subscribes to.
    #[inline]
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }
}

impl<State, Model: Default + Send + Debug + 'static> Debug for ManagedComponent<State, Model> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedComponent")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}
