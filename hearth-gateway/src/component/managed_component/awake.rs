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

use std::any::Any;
use std::fmt::Debug;
use std::panic::AssertUnwindSafe;

use anyhow::anyhow;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, instrument, trace};

use crate::common::ComponentInbox;
use crate::component::managed_component::Reactors;
use crate::component::{HookOutcome, ManagedComponent, Phase};
use crate::message::{Envelope, Message};

/// Type-state marker for a component whose task is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Awake;

impl<Model: Default + Send + Debug + 'static> ManagedComponent<Awake, Model> {
    /// The component task: hooks and messages are handled one at a time, in
    /// arrival order, until termination or cancellation.
    #[instrument(skip_all, fields(component = %self.name))]
    pub(crate) async fn wake(
        mut self,
        reactors: Reactors<Model>,
        mut inbox: ComponentInbox,
        cancellation_token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancellation_token.cancelled() => {
                    trace!("cancelled");
                    break;
                }
                incoming = inbox.recv() => {
                    let Some(envelope) = incoming else {
                        trace!("inbox closed");
                        break;
                    };
                    match envelope {
                        Envelope::Deliver(message) => {
                            tokio::select! {
                                () = cancellation_token.cancelled() => {
                                    trace!("cancelled while handling a message");
                                    break;
                                }
                                () = self.handle_message(&reactors, *message) => {}
                            }
                        }
                        Envelope::Phase { phase, reply_to } => {
                            let outcome = self.run_hook(&reactors, phase).await;
                            if reply_to.send(outcome).is_err() {
                                trace!(%phase, "loader stopped waiting for the hook outcome");
                            }
                        }
                        Envelope::Terminate => {
                            trace!("terminating");
                            break;
                        }
                    }
                }
            }
        }
        inbox.close();
        trace!(model = ?self.model, "component task finished");
    }

    async fn run_hook(&mut self, reactors: &Reactors<Model>, phase: Phase) -> HookOutcome {
        let Some(hook) = reactors.hooks.get(&phase) else {
            return HookOutcome::Missing;
        };
        trace!(%phase, "running hook");
        let future = hook(self);
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(())) => HookOutcome::Completed,
            Ok(Err(error)) => HookOutcome::Failed(error),
            Err(panic) => HookOutcome::Failed(anyhow!(
                "{phase} hook panicked: {}",
                panic_message(panic.as_ref())
            )),
        }
    }

    async fn handle_message(&mut self, reactors: &Reactors<Model>, message: Message) {
        let Some(handler) = reactors.message.as_ref() else {
            trace!(message_id = %message.message_id(), "no message handler registered; dropping");
            return;
        };
        let message_id = message.message_id().clone();
        let future = handler(self, message);
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(())) => trace!(%message_id, "message handled"),
            Ok(Err(e)) => error!(%message_id, "message handler failed: {e:#}"),
            Err(panic) => error!(
                %message_id,
                "message handler panicked: {}",
                panic_message(panic.as_ref())
            ),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
