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
use std::marker::PhantomData;

use tokio::sync::mpsc;
use tracing::trace;

use crate::common::{ComponentHandle, HookFuture, Router};
use crate::component::managed_component::Reactors;
use crate::component::{Awake, ComponentKind, ManagedComponent, Phase};
use crate::message::Message;

/// Type-state marker for a component that is still being configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Idle;

impl<Model: Default + Send + Debug + 'static> ManagedComponent<Idle, Model> {
    pub fn new(name: impl AsRef<str>, kind: ComponentKind, router: &Router) -> Self {
        Self {
            name: name.as_ref().trim().to_lowercase(),
            kind,
            model: Model::default(),
            router: router.clone(),
            subscriptions: Vec::new(),
            reactors: Reactors::default(),
            _state: PhantomData,
        }
    }

    pub fn library(name: impl AsRef<str>, router: &Router) -> Self {
        Self::new(name, ComponentKind::Library, router)
    }

    pub fn module(name: impl AsRef<str>, router: &Router) -> Self {
        Self::new(name, ComponentKind::Module, router)
    }

    /// Replaces the default model.
    #[must_use]
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    pub fn on_init<F>(&mut self, hook: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut ManagedComponent<Awake, Model>) -> HookFuture + Send + Sync + 'static,
    {
        self.on_phase(Phase::Init, hook)
    }

    pub fn on_load<F>(&mut self, hook: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut ManagedComponent<Awake, Model>) -> HookFuture + Send + Sync + 'static,
    {
        self.on_phase(Phase::Load, hook)
    }

    pub fn on_start<F>(&mut self, hook: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut ManagedComponent<Awake, Model>) -> HookFuture + Send + Sync + 'static,
    {
        self.on_phase(Phase::Start, hook)
    }

    pub fn on_stop<F>(&mut self, hook: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut ManagedComponent<Awake, Model>) -> HookFuture + Send + Sync + 'static,
    {
        self.on_phase(Phase::Stop, hook)
    }

    pub fn on_unload<F>(&mut self, hook: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut ManagedComponent<Awake, Model>) -> HookFuture + Send + Sync + 'static,
    {
        self.on_phase(Phase::Unload, hook)
    }

    /// Registers the hook for `phase`, replacing any earlier one.
    pub fn on_phase<F>(&mut self, phase: Phase, hook: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut ManagedComponent<Awake, Model>) -> HookFuture + Send + Sync + 'static,
    {
        self.reactors.hooks.insert(phase, Box::new(hook));
        self
    }

    /// Registers the handler for delivered messages.
    ///
    /// Messages are handled one at a time in arrival order. An error returned
    /// by the handler is logged and the component keeps running.
    pub fn on_message<F>(&mut self, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut ManagedComponent<Awake, Model>, Message) -> HookFuture
            + Send
            + Sync
            + 'static,
    {
        self.reactors.message = Some(Box::new(handler));
        self
    }

    /// Asks for every message of `msg_type`; `all` asks for catch-all delivery.
    ///
    /// Subscriptions take effect when the loader runs the component's load phase.
    pub fn subscribe(&mut self, msg_type: impl AsRef<str>) -> &mut Self {
        let msg_type = msg_type.as_ref().trim().to_lowercase();
        if !self.subscriptions.contains(&msg_type) {
            self.subscriptions.push(msg_type);
        }
        self
    }

    /// Moves the component into its own task and returns its handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(mut self) -> ComponentHandle {
        let (outbox, inbox) = mpsc::channel(self.router.inbox_capacity().max(1));
        let cancellation_token = self.router.child_token();
        let tracker = self.router.tracker().clone();
        let reactors = std::mem::take(&mut self.reactors);

        let handle = ComponentHandle::new(
            self.name.clone(),
            self.kind,
            outbox,
            self.subscriptions.clone(),
            tracker.clone(),
            cancellation_token.clone(),
        );

        let awake = ManagedComponent::<Awake, Model> {
            name: self.name,
            kind: self.kind,
            model: self.model,
            router: self.router,
            subscriptions: self.subscriptions,
            reactors: Reactors::default(),
            _state: PhantomData,
        };

        trace!(component = %handle.name(), kind = %handle.kind(), "spawning component task");
        tracker.spawn(awake.wake(reactors, inbox, cancellation_token));
        handle
    }
}
