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

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{trace, warn};

use crate::common::ComponentSender;
use crate::component::{ComponentKind, HookOutcome, Phase};
use crate::message::{Envelope, Message};

/// A cloneable handle to a running component.
///
/// Handles carry the component's name, its kind, the message types it
/// subscribes to and the sending side of its inbox. Equality and hashing use
/// the name only.
#[derive(Debug, Clone)]
pub struct ComponentHandle {
    pub(crate) name: String,
    pub(crate) kind: ComponentKind,
    pub(crate) outbox: ComponentSender,
    pub(crate) subscriptions: Arc<[String]>,
    tracker: TaskTracker,
    pub(crate) cancellation_token: CancellationToken,
}

impl ComponentHandle {
    pub(crate) fn new(
        name: String,
        kind: ComponentKind,
        outbox: ComponentSender,
        subscriptions: Vec<String>,
        tracker: TaskTracker,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            name,
            kind,
            outbox,
            subscriptions: subscriptions.into(),
            tracker,
            cancellation_token,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Message types this component asked to receive.
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    /// True once the component task has exited.
    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }

    /// Puts a message in the inbox without waiting for the handler.
    ///
    /// When the inbox is full the send continues on a tracked background task.
    /// Returns false only if the component has already exited.
    pub(crate) fn deliver(&self, message: Message) -> bool {
        match self.outbox.try_send(Envelope::Deliver(Box::new(message))) {
            Ok(()) => true,
            Err(TrySendError::Full(envelope)) => {
                trace!(component = %self.name, "inbox full, finishing delivery in the background");
                let outbox = self.outbox.clone();
                let name = self.name.clone();
                self.tracker.spawn(async move {
                    if outbox.send(envelope).await.is_err() {
                        warn!(component = %name, "component exited before a queued message could be delivered");
                    }
                });
                true
            }
            Err(TrySendError::Closed(_)) => {
                warn!(component = %self.name, "component has exited; message not delivered");
                false
            }
        }
    }

    /// Runs one lifecycle hook inside the component task and waits for its outcome.
    pub async fn run_phase(&self, phase: Phase) -> HookOutcome {
        let (reply_to, outcome) = oneshot::channel();
        if self
            .outbox
            .send(Envelope::Phase { phase, reply_to })
            .await
            .is_err()
        {
            return HookOutcome::Failed(anyhow!("component '{}' is not running", self.name));
        }
        outcome.await.unwrap_or_else(|_| {
            HookOutcome::Failed(anyhow!(
                "component '{}' exited during its {phase} hook",
                self.name
            ))
        })
    }

    /// Asks the task to finish and waits up to `timeout` for it; cancels it after that.
    pub async fn terminate(&self, timeout: Duration) {
        let outbox = &self.outbox;
        let stop = async {
            if outbox.send(Envelope::Terminate).await.is_ok() {
                outbox.closed().await;
            }
        };
        if tokio::time::timeout(timeout, stop).await.is_err() {
            warn!(component = %self.name, ?timeout, "component did not stop in time; cancelling");
            self.cancellation_token.cancel();
        } else {
            trace!(component = %self.name, "component stopped");
        }
    }
}

impl PartialEq for ComponentHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ComponentHandle {}

impl Hash for ComponentHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
