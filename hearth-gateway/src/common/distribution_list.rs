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

use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexSet;
use tracing::trace;

/// Subscription key that receives every message eligible for catch-all delivery.
pub const ALL_SUBSCRIBERS: &str = "all";

/// Which components want which message types.
///
/// Each type keeps its subscribers in subscription order with no duplicates.
#[derive(Debug, Clone, Default)]
pub struct DistributionList {
    lists: Arc<DashMap<String, IndexSet<String>>>,
}

impl DistributionList {
    /// Adds `component` to the list for `msg_type`. Returns false if it was already there.
    pub fn subscribe(&self, msg_type: &str, component: &str) -> bool {
        let added = self
            .lists
            .entry(msg_type.to_lowercase())
            .or_default()
            .insert(component.to_lowercase());
        trace!(msg_type, component, added, "subscribe");
        added
    }

    /// Removes `component` from the list for `msg_type`. Returns false if it was absent.
    pub fn unsubscribe(&self, msg_type: &str, component: &str) -> bool {
        let key = msg_type.to_lowercase();
        let removed = self
            .lists
            .get_mut(&key)
            .is_some_and(|mut list| list.shift_remove(&component.to_lowercase()));
        self.lists.remove_if(&key, |_, list| list.is_empty());
        trace!(msg_type, component, removed, "unsubscribe");
        removed
    }

    /// Snapshot of the subscribers for `msg_type`, in subscription order.
    pub fn deliverable_subscribers(&self, msg_type: &str) -> Vec<String> {
        self.lists
            .get(&msg_type.to_lowercase())
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, msg_type: &str, component: &str) -> bool {
        self.lists
            .get(&msg_type.to_lowercase())
            .is_some_and(|list| list.contains(&component.to_lowercase()))
    }

    pub fn clear(&self) {
        self.lists.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}
