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

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Running totals kept by the router.
#[derive(Debug, Default)]
pub struct RouterStats {
    sent: AtomicU64,
    delivered: AtomicU64,
    queued: AtomicU64,
    delayed: AtomicU64,
    expired: AtomicU64,
    external: AtomicU64,
}

/// A point-in-time copy of [`RouterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouterStatsSnapshot {
    /// Messages that reached local delivery
    pub sent: u64,
    /// Inbox deliveries, one per recipient
    pub delivered: u64,
    /// Messages held until startup completed
    pub queued: u64,
    pub delayed: u64,
    pub expired: u64,
    pub external: u64,
}

impl RouterStats {
    pub(crate) fn record_sent(&self, recipients: usize) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        self.delivered.fetch_add(recipients as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delayed(&self) {
        self.delayed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_external(&self) {
        self.external.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RouterStatsSnapshot {
        RouterStatsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            delayed: self.delayed.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            external: self.external.load(Ordering::Relaxed),
        }
    }
}
