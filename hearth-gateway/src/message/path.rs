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

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One step a message took on its way here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    pub component: String,
    /// Set when the hop happened on another node or outside the gateway.
    #[serde(default)]
    pub external: bool,
}

/// Insertion-ordered record of hops, keyed by a unique hop id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessagePath(IndexMap<String, Hop>);

impl MessagePath {
    /// Appends a hop and returns its id.
    pub(crate) fn push(&mut self, hop: Hop) -> String {
        let hop_id = Uuid::new_v4().to_string();
        self.0.insert(hop_id.clone(), hop);
        hop_id
    }

    pub fn hops(&self) -> impl Iterator<Item = &Hop> {
        self.0.values()
    }

    pub fn get(&self, hop_id: &str) -> Option<&Hop> {
        self.0.get(hop_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hops_keep_insertion_order_through_serde() {
        let mut path = MessagePath::default();
        for name in ["gateway.lib.c:n1", "gateway.lib.a:n1", "gateway.lib.b:n1"] {
            path.push(Hop {
                component: name.to_string(),
                external: false,
            });
        }
        let json = serde_json::to_string(&path).unwrap();
        let restored: MessagePath = serde_json::from_str(&json).unwrap();
        let names: Vec<_> = restored.hops().map(|hop| hop.component.as_str()).collect();
        assert_eq!(names, ["gateway.lib.c:n1", "gateway.lib.a:n1", "gateway.lib.b:n1"]);
    }
}
