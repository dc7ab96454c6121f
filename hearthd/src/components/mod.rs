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

use hearth_gateway::prelude::*;

pub(crate) use automation::AUTOMATION;
pub(crate) use log_writer::LOG_WRITER;

mod automation;
mod log_writer;

/// Factories for every component the daemon ships with.
pub(crate) fn catalog() -> ComponentCatalog {
    let mut catalog = ComponentCatalog::new();
    catalog
        .register(AUTOMATION, automation::spawn)
        .register(LOG_WRITER, log_writer::spawn);
    catalog
}

pub(crate) fn builtin_libraries() -> Vec<LibrarySpec> {
    vec![LibrarySpec::new(AUTOMATION, 1)]
}

pub(crate) fn builtin_modules() -> Vec<ModuleSpec> {
    vec![ModuleSpec::new(LOG_WRITER)]
}
