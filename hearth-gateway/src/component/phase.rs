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

use std::fmt;

/// The lifecycle phases a component moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Init,
    Load,
    Start,
    Stop,
    Unload,
}

impl Phase {
    /// Phases run on the way up, in order.
    pub const STARTUP: [Phase; 3] = [Phase::Init, Phase::Load, Phase::Start];
    /// Phases run on the way down, in order.
    pub const SHUTDOWN: [Phase; 2] = [Phase::Stop, Phase::Unload];

    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Load => "load",
            Phase::Start => "start",
            Phase::Stop => "stop",
            Phase::Unload => "unload",
        }
    }

    /// State a component is in once this phase has run.
    pub(crate) const fn reached_state(self) -> ComponentState {
        match self {
            Phase::Init => ComponentState::Initialized,
            Phase::Load => ComponentState::Loaded,
            Phase::Start => ComponentState::Started,
            Phase::Stop => ComponentState::Stopping,
            Phase::Unload => ComponentState::Unloaded,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a component is a core library or a pluggable module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Library,
    Module,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Library => f.write_str("library"),
            ComponentKind::Module => f.write_str("module"),
        }
    }
}

/// Where a component is in its lifecycle, as tracked by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentState {
    Unimported,
    Imported,
    Initialized,
    Loaded,
    Started,
    Stopping,
    Unloaded,
}

/// What happened when a component was asked to run a hook.
#[derive(Debug)]
pub enum HookOutcome {
    Completed,
    /// The component never registered a hook for the phase.
    Missing,
    Failed(anyhow::Error),
}
