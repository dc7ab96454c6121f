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

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::message::{Message, MessageId};

type DueKey = (u64, u64);

/// Messages waiting to be routed.
///
/// Two holding areas: the *pending* FIFO for messages sent before the gateway
/// finished starting, and the *delayed* set for messages whose `not_before`
/// lies in the future. Delayed messages are indexed by id and by target device.
#[derive(Debug, Clone, Default)]
pub struct DelayedMessageQueue {
    pending: Arc<Mutex<VecDeque<Message>>>,
    delayed: Arc<Mutex<DelayedSet>>,
}

#[derive(Debug, Default)]
struct DelayedSet {
    by_due: BTreeMap<DueKey, Message>,
    by_id: HashMap<MessageId, DueKey>,
    by_device: HashMap<String, Vec<MessageId>>,
    sequence: u64,
}

impl DelayedSet {
    fn remove(&mut self, id: &MessageId) -> Option<Message> {
        let key = self.by_id.remove(id)?;
        let message = self.by_due.remove(&key)?;
        if let Some(device_id) = message.payload().device_id() {
            if let Some(ids) = self.by_device.get_mut(device_id) {
                ids.retain(|held| held != id);
                if ids.is_empty() {
                    self.by_device.remove(device_id);
                }
            }
        }
        Some(message)
    }
}

impl DelayedMessageQueue {
    /// Holds a message until startup completes.
    pub fn enqueue_pending(&self, message: Message) {
        trace!(message_id = %message.message_id(), "holding message until startup completes");
        self.pending.lock().push_back(message);
    }

    /// Takes every held startup message, oldest first.
    pub fn take_pending(&self) -> Vec<Message> {
        self.pending.lock().drain(..).collect()
    }

    /// Holds the message unless `started()` reports startup already finished,
    /// in which case the message is handed back. Checked under the queue lock.
    pub(crate) fn hold_until_started(
        &self,
        message: Message,
        started: impl FnOnce() -> bool,
    ) -> Option<Message> {
        let mut pending = self.pending.lock();
        if started() {
            return Some(message);
        }
        trace!(message_id = %message.message_id(), "holding message until startup completes");
        pending.push_back(message);
        None
    }

    /// Runs `release` under the queue lock, then drains the held messages.
    pub(crate) fn release_pending(&self, release: impl FnOnce()) -> Vec<Message> {
        let mut pending = self.pending.lock();
        release();
        pending.drain(..).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Holds a message until its `not_before`. Returns false if the id is already held.
    pub fn enqueue_delayed(&self, message: Message) -> bool {
        let mut delayed = self.delayed.lock();
        if delayed.by_id.contains_key(message.message_id()) {
            warn!(message_id = %message.message_id(), "message is already in the delayed queue");
            return false;
        }
        delayed.sequence += 1;
        let key = (to_millis(message.not_before()), delayed.sequence);
        let id = message.message_id().clone();
        if let Some(device_id) = message.payload().device_id() {
            delayed
                .by_device
                .entry(device_id.to_string())
                .or_default()
                .push(id.clone());
        }
        trace!(message_id = %id, not_before = message.not_before(), "delaying message");
        delayed.by_id.insert(id, key);
        delayed.by_due.insert(key, message);
        true
    }

    /// Removes and returns every delayed message due at `now`, earliest first.
    pub fn take_due(&self, now: f64) -> Vec<Message> {
        let mut delayed = self.delayed.lock();
        let cutoff = to_millis(now);
        let due: Vec<MessageId> = delayed
            .by_due
            .range(..=(cutoff, u64::MAX))
            .filter(|(_, message)| message.not_before() <= now)
            .map(|(_, message)| message.message_id().clone())
            .collect();
        due.iter().filter_map(|id| delayed.remove(id)).collect()
    }

    /// Drops a delayed message by id.
    pub fn cancel(&self, id: &MessageId) -> Option<Message> {
        self.delayed.lock().remove(id)
    }

    pub fn is_delayed(&self, id: &MessageId) -> bool {
        self.delayed.lock().by_id.contains_key(id)
    }

    /// Ids of delayed messages aimed at `device_id`, in the order they were delayed.
    pub fn device_pending(&self, device_id: &str) -> Vec<MessageId> {
        self.delayed
            .lock()
            .by_device
            .get(device_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Drops every delayed message aimed at `device_id`; returns how many.
    pub fn cancel_device(&self, device_id: &str) -> usize {
        let mut delayed = self.delayed.lock();
        let ids = delayed.by_device.remove(device_id).unwrap_or_default();
        ids.iter().filter(|id| delayed.remove(id).is_some()).count()
    }

    pub fn delayed_len(&self) -> usize {
        self.delayed.lock().by_due.len()
    }

    /// Earliest `not_before` among delayed messages.
    pub fn next_due(&self) -> Option<f64> {
        self.delayed
            .lock()
            .by_due
            .values()
            .next()
            .map(Message::not_before)
    }
}

fn to_millis(epoch_seconds: f64) -> u64 {
    (epoch_seconds.max(0.0) * 1_000.0).round() as u64
}
