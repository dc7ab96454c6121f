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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::common::{
    ComponentHandle, ComponentRegistry, DelayedMessageQueue, DeliveryConfig, DistributionList,
    GatewayConfig, GatewayError, GatewayResult, InMemoryReferences, NodeIdentity, RouterStats,
    SystemClock, UnroutableTransport, ALL_SUBSCRIBERS,
};
use crate::message::{
    ComponentAddress, Message, MessageId, MessageStatus, MessageType, ValidationContext,
};
use crate::traits::{Authenticator, Clock, ExternalTransport, ReferenceResolver};

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// How a send was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendReceipt {
    /// Handed to the external transport.
    External,
    /// Held until the gateway finishes starting.
    Queued,
    /// Held until its `not_before`.
    Delayed,
    /// Dropped: past `not_before + max_delay`.
    Expired,
    /// Put in the inboxes of these components, in delivery order.
    Delivered { recipients: Vec<String> },
}

impl SendReceipt {
    pub fn recipients(&self) -> &[String] {
        match self {
            SendReceipt::Delivered { recipients } => recipients,
            _ => &[],
        }
    }
}

/// What one pass over the delayed queue did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub released: Vec<MessageId>,
    pub expired: Vec<MessageId>,
    pub failed: Vec<MessageId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.released.is_empty() && self.expired.is_empty() && self.failed.is_empty()
    }
}

/// Routes messages between components.
///
/// The router owns the component registry, the distribution list and the
/// delayed queue, along with the collaborators messages are validated against.
/// It is cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct Router(pub(crate) Arc<RouterInner>);

#[derive(Debug)]
pub(crate) struct RouterInner {
    identity: NodeIdentity,
    delivery: DeliveryConfig,
    registry: ComponentRegistry,
    distributions: DistributionList,
    queue: DelayedMessageQueue,
    clock: Arc<dyn Clock>,
    resolver: Arc<dyn ReferenceResolver>,
    transport: Arc<dyn ExternalTransport>,
    authenticator: Option<Arc<dyn Authenticator>>,
    fully_started: watch::Sender<bool>,
    sweeper_running: AtomicBool,
    stats: RouterStats,
    tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

/// Assembles a [`Router`] from configuration and collaborators.
#[derive(Debug)]
pub struct RouterBuilder {
    identity: NodeIdentity,
    delivery: DeliveryConfig,
    fuzzy_threshold: f64,
    clock: Arc<dyn Clock>,
    resolver: Arc<dyn ReferenceResolver>,
    transport: Arc<dyn ExternalTransport>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl RouterBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn ExternalTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn build(self) -> Router {
        let (fully_started, _) = watch::channel(false);
        Router(Arc::new(RouterInner {
            identity: self.identity,
            delivery: self.delivery,
            registry: ComponentRegistry::new(self.fuzzy_threshold),
            distributions: DistributionList::default(),
            queue: DelayedMessageQueue::default(),
            clock: self.clock,
            resolver: self.resolver,
            transport: self.transport,
            authenticator: self.authenticator,
            fully_started,
            sweeper_running: AtomicBool::new(false),
            stats: RouterStats::default(),
            tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        }))
    }
}

impl Router {
    /// Starts a builder with the system clock, an empty reference store and no
    /// external transport.
    pub fn builder(config: &GatewayConfig) -> RouterBuilder {
        RouterBuilder {
            identity: config.node.clone(),
            delivery: config.delivery.clone(),
            fuzzy_threshold: config.registry.fuzzy_threshold,
            clock: Arc::new(SystemClock),
            resolver: Arc::new(InMemoryReferences::default()),
            transport: Arc::new(UnroutableTransport),
            authenticator: None,
        }
    }

    #[inline]
    pub fn identity(&self) -> &NodeIdentity {
        &self.0.identity
    }

    #[inline]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.0.registry
    }

    #[inline]
    pub fn distributions(&self) -> &DistributionList {
        &self.0.distributions
    }

    #[inline]
    pub fn queue(&self) -> &DelayedMessageQueue {
        &self.0.queue
    }

    #[inline]
    pub fn stats(&self) -> &RouterStats {
        &self.0.stats
    }

    pub fn now(&self) -> f64 {
        self.0.clock.now()
    }

    pub(crate) fn inbox_capacity(&self) -> usize {
        self.0.delivery.inbox_capacity
    }

    pub(crate) fn tracker(&self) -> &TaskTracker {
        &self.0.tracker
    }

    pub(crate) fn child_token(&self) -> CancellationToken {
        self.0.cancellation_token.child_token()
    }

    /// The collaborators [`Message::validate`] checks against.
    pub fn validation_context(&self) -> ValidationContext<'_> {
        ValidationContext {
            identity: &self.0.identity,
            resolver: self.0.resolver.as_ref(),
            authenticator: self.0.authenticator.as_deref(),
        }
    }

    pub fn is_fully_started(&self) -> bool {
        *self.0.fully_started.borrow()
    }

    /// A receiver that flips to `true` once startup completes.
    pub fn fully_started(&self) -> watch::Receiver<bool> {
        self.0.fully_started.subscribe()
    }

    /// Marks startup complete and replays held messages in the order they were sent.
    ///
    /// Returns false, doing nothing, if startup was already marked complete.
    pub async fn mark_fully_started(&self) -> bool {
        let mut first = false;
        let held = self.0.queue.release_pending(|| {
            first = self.0.fully_started.send_if_modified(|started| {
                let changed = !*started;
                *started = true;
                changed
            });
        });
        if !first {
            return false;
        }
        info!(held = held.len(), "gateway fully started");
        self.replay(held).await;
        true
    }

    /// Re-sends every held startup message, oldest first. Returns how many were routed.
    pub async fn flush_pending(&self) -> usize {
        let held = self.0.queue.take_pending();
        self.replay(held).await
    }

    async fn replay(&self, held: Vec<Message>) -> usize {
        let mut routed = 0;
        for message in held {
            let message_id = message.message_id().clone();
            match self.route(message).await {
                Ok(receipt) => {
                    trace!(%message_id, ?receipt, "replayed held message");
                    routed += 1;
                }
                Err(e) => error!(%message_id, "replaying held message failed: {e}"),
            }
        }
        routed
    }

    /// Validates a message and delivers, holds, delays, drops or forwards it.
    ///
    /// Local delivery goes to the destination, then to subscribers of the
    /// message type, then (for `new` messages and events) to catch-all
    /// subscribers. No component receives the same message twice in one send.
    #[instrument(skip_all, fields(message_id = %message.message_id()))]
    pub async fn route(&self, mut message: Message) -> GatewayResult<SendReceipt> {
        let inner = &self.0;
        message.validate(&self.validation_context())?;

        if !message.is_destination_local(&inner.identity)? {
            trace!(destination = %message.destination(), "forwarding to another node");
            inner.stats.record_external();
            inner
                .transport
                .send_external(message)
                .await
                .map_err(GatewayError::Transport)?;
            return Ok(SendReceipt::External);
        }

        let Some(mut message) = inner
            .queue
            .hold_until_started(message, || self.is_fully_started())
        else {
            inner.stats.record_queued();
            return Ok(SendReceipt::Queued);
        };

        let now = inner.clock.now();
        if message.is_expired_at(now) {
            warn!(
                not_before = message.not_before(),
                max_delay = message.max_delay(),
                "dropping message: max_delay reached"
            );
            inner.stats.record_expired();
            return Ok(SendReceipt::Expired);
        }
        if message.not_before() > now {
            if inner.queue.enqueue_delayed(message) {
                inner.stats.record_delayed();
            }
            return Ok(SendReceipt::Delayed);
        }

        self.before_send(&message);
        let recipients = self.deliver(&mut message)?;
        Ok(SendReceipt::Delivered { recipients })
    }

    fn before_send(&self, message: &Message) {
        if self.0.queue.cancel(message.message_id()).is_some() {
            debug!(message_id = %message.message_id(), "removed delayed copy before sending");
        }
    }

    fn deliver(&self, message: &mut Message) -> GatewayResult<Vec<String>> {
        let inner = &self.0;
        let address = ComponentAddress::parse(message.destination())?;
        message.delivered_to.clear();
        let mut plan: Vec<ComponentHandle> = Vec::new();

        match inner.registry.get(address.name()) {
            Some(handle) => {
                message.delivered_to.insert(handle.name().to_string());
                plan.push(handle);
            }
            None if address.is_broadcast() => trace!("broadcast destination"),
            None => {
                return Err(GatewayError::UnknownDestination(
                    message.destination().to_string(),
                ))
            }
        }

        let mut lists = vec![message.msg_type().as_str().to_string()];
        if *message.status() == MessageStatus::New || *message.msg_type() == MessageType::Event {
            lists.push(ALL_SUBSCRIBERS.to_string());
        }
        for list in &lists {
            for name in inner.distributions.deliverable_subscribers(list) {
                if message.delivered_to.contains(&name) {
                    continue;
                }
                match inner.registry.get(&name) {
                    Some(handle) => {
                        message.delivered_to.insert(name);
                        plan.push(handle);
                    }
                    None => trace!(component = %name, "subscriber not registered; skipping"),
                }
            }
        }

        let recipients: Vec<String> = plan
            .iter()
            .filter(|handle| handle.deliver(message.clone()))
            .map(|handle| handle.name().to_string())
            .collect();
        inner.stats.record_sent(recipients.len());
        debug!(?recipients, "message delivered");
        Ok(recipients)
    }

    /// One pass over the delayed queue: due messages are routed, expired ones dropped.
    pub async fn sweep_delayed(&self) -> SweepReport {
        let inner = &self.0;
        let now = inner.clock.now();
        let mut report = SweepReport::default();

        for message in inner.queue.take_due(now) {
            let message_id = message.message_id().clone();
            if message.is_expired_at(now) {
                warn!(
                    %message_id,
                    not_before = message.not_before(),
                    max_delay = message.max_delay(),
                    "dropping delayed message: max_delay reached"
                );
                inner.stats.record_expired();
                if inner.delivery.notify_origin_on_expiry {
                    self.notify_expired(&message).await;
                }
                report.expired.push(message_id);
                continue;
            }
            match self.route(message).await {
                Ok(SendReceipt::Delivered { .. } | SendReceipt::External) => {
                    report.released.push(message_id);
                }
                Ok(SendReceipt::Expired) => report.expired.push(message_id),
                Ok(receipt) => trace!(%message_id, ?receipt, "delayed message not released yet"),
                Err(e) => {
                    error!(%message_id, "releasing delayed message failed: {e}");
                    report.failed.push(message_id);
                }
            }
        }
        report
    }

    fn until_next_due(&self, period: Duration) -> Duration {
        let Some(due) = self.0.queue.next_due() else {
            return period;
        };
        let seconds = (due - self.now()).max(0.0);
        Duration::try_from_secs_f64(seconds)
            .unwrap_or(period)
            .clamp(MIN_SWEEP_INTERVAL, period)
    }

    async fn notify_expired(&self, message: &Message) {
        let reply = message
            .reply_builder()
            .status(MessageStatus::Failed)
            .status_detail("max_delay reached")
            .build();
        let outcome = match reply {
            Ok(reply) => self.route(reply).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            warn!(message_id = %message.message_id(), "could not tell the origin about an expired message: {e}");
        }
    }

    /// Starts the delayed-queue sweep. Later calls do nothing.
    ///
    /// The sweep wakes when the earliest delayed message falls due, and at
    /// least once per sweep interval.
    pub fn spawn_sweeper(&self) {
        if self.0.sweeper_running.swap(true, Ordering::SeqCst) {
            return;
        }
        let router = self.clone();
        let token = self.0.cancellation_token.clone();
        let period = self.0.delivery.sweep_interval().max(MIN_SWEEP_INTERVAL);
        self.0.tracker.spawn(async move {
            loop {
                let wait = router.until_next_due(period);
                tokio::select! {
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(wait) => {
                        let report = router.sweep_delayed().await;
                        if !report.is_empty() {
                            debug!(?report, "delayed queue swept");
                        }
                    }
                }
            }
            trace!("delayed sweep stopped");
        });
    }

    /// Cancels every component task and the sweep, then waits up to `timeout` for them.
    pub async fn shutdown(&self, timeout: Duration) -> GatewayResult<()> {
        self.0.cancellation_token.cancel();
        self.0.tracker.close();
        tokio::time::timeout(timeout, self.0.tracker.wait())
            .await
            .map_err(|_| {
                GatewayError::Shutdown(format!("router tasks still running after {timeout:?}"))
            })
    }
}
