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
use std::sync::Arc;

use crate::common::{ComponentFactory, ComponentHandle, Router};

/// Named factories the loader builds components from.
///
/// Each factory configures a `ManagedComponent` against the router it is given
/// and spawns it. Names are matched case-insensitively.
#[derive(Clone, Default)]
pub struct ComponentCatalog {
    factories: HashMap<String, ComponentFactory>,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the factory for `name`.
    pub fn register<F>(&mut self, name: impl AsRef<str>, factory: F) -> &mut Self
    where
        F: Fn(&Router) -> ComponentHandle + Send + Sync + 'static,
    {
        self.factories
            .insert(name.as_ref().trim().to_lowercase(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Builds and spawns the component registered as `name`.
    pub(crate) fn build(&self, name: &str, router: &Router) -> Option<ComponentHandle> {
        self.factories
            .get(&name.to_lowercase())
            .map(|factory| factory(router))
    }
}

impl fmt::Debug for ComponentCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ComponentCatalog")
            .field("factories", &names)
            .finish()
    }
}
