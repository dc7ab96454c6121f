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
use tracing::{debug, trace};

use crate::common::fuzzy::similarity;
use crate::common::{ComponentHandle, GatewayError, GatewayResult};

/// Every component this node currently knows about, keyed by lower-cased name.
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    components: Arc<DashMap<String, ComponentHandle>>,
    fuzzy_threshold: f64,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new(0.90)
    }
}

impl ComponentRegistry {
    pub fn new(fuzzy_threshold: f64) -> Self {
        Self {
            components: Arc::new(DashMap::new()),
            fuzzy_threshold,
        }
    }

    /// Registers a handle, returning the one it replaced.
    pub fn register(&self, handle: ComponentHandle) -> Option<ComponentHandle> {
        let key = handle.name().to_lowercase();
        trace!(component = %key, "registering component");
        self.components.insert(key, handle)
    }

    pub fn remove(&self, name: &str) -> Option<ComponentHandle> {
        self.components
            .remove(&name.to_lowercase())
            .map(|(_, handle)| handle)
    }

    /// Exact, case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<ComponentHandle> {
        self.components
            .get(&name.to_lowercase())
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(&name.to_lowercase())
    }

    /// Exact lookup, falling back to the closest name at or above the fuzzy threshold.
    pub fn lookup(&self, name: &str) -> GatewayResult<ComponentHandle> {
        if let Some(handle) = self.get(name) {
            return Ok(handle);
        }
        let wanted = name.to_lowercase();
        let best = self
            .components
            .iter()
            .map(|entry| (similarity(&wanted, entry.key()), entry.value().clone()))
            .filter(|(score, _)| *score >= self.fuzzy_threshold)
            .max_by(|(left, _), (right, _)| left.total_cmp(right));
        match best {
            Some((score, handle)) => {
                debug!(wanted = %wanted, found = %handle.name(), score, "approximate component match");
                Ok(handle)
            }
            None => Err(GatewayError::NoSuchLoadedComponent(name.to_string())),
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.components.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
