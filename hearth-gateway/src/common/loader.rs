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

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::common::{
    ComponentCatalog, ComponentHandle, GatewayConfig, GatewayError, GatewayResult, LibrarySpec,
    ModuleSpec, Router,
};
use crate::component::{ComponentKind, ComponentState, HookOutcome, Phase};

/// Brings components up and down in phases.
///
/// Libraries start first, tier by tier: every library in a tier runs init,
/// then load, then start before the next tier begins. Modules follow, all of
/// them through each phase in turn. A failing hook is logged and the rest
/// carry on, except for libraries marked `fatal`, which abort startup. Once
/// everything has started the router is told to replay held messages.
#[derive(Debug, Clone)]
pub struct Loader(Arc<LoaderInner>);

#[derive(Debug)]
struct LoaderInner {
    router: Router,
    catalog: ComponentCatalog,
    libraries: RwLock<Vec<LibrarySpec>>,
    modules: RwLock<Vec<ModuleSpec>>,
    phase_timeout: Duration,
    shutdown_timeout: Duration,
    states: DashMap<String, ComponentState>,
    library_handles: Mutex<Vec<(LibrarySpec, ComponentHandle)>>,
    module_handles: Mutex<Vec<ComponentHandle>>,
    libraries_imported: AtomicBool,
    modules_imported: AtomicBool,
}

impl Loader {
    pub fn new(config: GatewayConfig, router: Router, catalog: ComponentCatalog) -> Self {
        let libraries = config.libraries_in_start_order();
        Loader(Arc::new(LoaderInner {
            router,
            catalog,
            libraries: RwLock::new(libraries),
            modules: RwLock::new(config.loader.modules.clone()),
            phase_timeout: config.loader.phase_timeout(),
            shutdown_timeout: config.loader.shutdown_timeout(),
            states: DashMap::new(),
            library_handles: Mutex::new(Vec::new()),
            module_handles: Mutex::new(Vec::new()),
            libraries_imported: AtomicBool::new(false),
            modules_imported: AtomicBool::new(false),
        }))
    }

    #[inline]
    pub fn router(&self) -> &Router {
        &self.0.router
    }

    /// A receiver that flips to `true` once startup completes.
    pub fn fully_started(&self) -> watch::Receiver<bool> {
        self.0.router.fully_started()
    }

    pub fn component_state(&self, name: &str) -> ComponentState {
        self.0
            .states
            .get(&name.to_lowercase())
            .map_or(ComponentState::Unimported, |state| *state)
    }

    /// Looks up a loaded component, tolerating small misspellings.
    pub fn get_component(&self, name: &str) -> GatewayResult<ComponentHandle> {
        self.0.router.registry().lookup(name)
    }

    /// Runs the whole startup sequence.
    #[instrument(skip(self))]
    pub async fn start(&self) -> GatewayResult<()> {
        self.import_libraries()?;
        let libraries = self.0.library_handles.lock().clone();
        for tier in libraries.chunk_by(|a, b| a.0.tier == b.0.tier) {
            let handles: Vec<ComponentHandle> = tier.iter().map(|(_, handle)| handle.clone()).collect();
            debug!(tier = tier[0].0.tier, count = handles.len(), "starting library tier");
            for phase in Phase::STARTUP {
                self.run_phase_all(&handles, phase).await?;
            }
        }

        self.import_modules()?;
        let modules = self.0.module_handles.lock().clone();
        for phase in Phase::STARTUP {
            self.run_phase_all(&modules, phase).await?;
        }

        self.0.router.mark_fully_started().await;
        self.0.router.spawn_sweeper();
        info!(
            libraries = libraries.len(),
            modules = modules.len(),
            "gateway started"
        );
        Ok(())
    }

    /// Builds, spawns and registers every library. Runs once.
    pub fn import_libraries(&self) -> GatewayResult<()> {
        if self.0.libraries_imported.swap(true, Ordering::SeqCst) {
            warn!("libraries were already imported");
            return Ok(());
        }
        let specs = self.0.libraries.read().clone();
        for spec in specs {
            match self.import(&spec.name, ComponentKind::Library) {
                Ok(handle) => self.0.library_handles.lock().push((spec, handle)),
                Err(e) if spec.fatal => {
                    error!(library = %spec.name, "cannot import fatal library: {e}");
                    return Err(e);
                }
                Err(e) => error!(library = %spec.name, "skipping library: {e}"),
            }
        }
        Ok(())
    }

    /// Builds, spawns and registers every enabled module. Runs once per module set.
    pub fn import_modules(&self) -> GatewayResult<()> {
        if self.0.modules_imported.swap(true, Ordering::SeqCst) {
            warn!("modules were already imported");
            return Ok(());
        }
        let specs = self.0.modules.read().clone();
        for spec in specs {
            if !spec.enabled {
                debug!(module = %spec.name, "module disabled; skipping");
                continue;
            }
            match self.import(&spec.name, ComponentKind::Module) {
                Ok(handle) => self.0.module_handles.lock().push(handle),
                Err(e) => error!(module = %spec.name, "skipping module: {e}"),
            }
        }
        Ok(())
    }

    fn import(&self, name: &str, kind: ComponentKind) -> GatewayResult<ComponentHandle> {
        let handle = self
            .0
            .catalog
            .build(name, &self.0.router)
            .ok_or_else(|| GatewayError::Config(format!("no factory registered for {kind} '{name}'")))?;
        if !handle.name().eq_ignore_ascii_case(name) {
            warn!(expected = %name, built = %handle.name(), "factory built a component under another name");
        }
        if handle.kind() != kind {
            warn!(component = %handle.name(), expected = %kind, built = %handle.kind(), "factory built the wrong kind of component");
        }
        if let Some(previous) = self.0.router.registry().register(handle.clone()) {
            warn!(component = %previous.name(), "replaced an already registered component");
        }
        self.0
            .states
            .insert(handle.name().to_string(), ComponentState::Imported);
        trace!(component = %handle.name(), %kind, "imported");
        Ok(handle)
    }

    async fn run_phase_all(&self, handles: &[ComponentHandle], phase: Phase) -> GatewayResult<()> {
        for handle in handles {
            if !self.ready_for(handle.name(), phase) {
                debug!(component = %handle.name(), %phase, "earlier phase failed; skipping");
                continue;
            }
            if let Err(e) = self.run_phase(handle, phase).await {
                if self.is_fatal(handle.name()) {
                    error!(component = %handle.name(), %phase, "fatal library failed; aborting startup");
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Runs one hook and records the state it leads to.
    ///
    /// A missing hook counts as done and is reported as a configuration error.
    async fn run_phase(&self, handle: &ComponentHandle, phase: Phase) -> GatewayResult<()> {
        let name = handle.name();
        debug!(component = %name, %phase, "running phase");
        let outcome = tokio::time::timeout(self.0.phase_timeout, handle.run_phase(phase))
            .await
            .unwrap_or_else(|_| {
                HookOutcome::Failed(anyhow!("no answer within {:?}", self.0.phase_timeout))
            });
        match outcome {
            HookOutcome::Completed => {}
            HookOutcome::Missing => {
                warn!(component = %name, %phase, "configuration error: component has no {phase} hook");
            }
            HookOutcome::Failed(source) => {
                error!(component = %name, %phase, "hook failed: {source:#}");
                return Err(GatewayError::ComponentPhase {
                    component: name.to_string(),
                    phase,
                    source,
                });
            }
        }
        self.0.states.insert(name.to_string(), phase.reached_state());
        if phase == Phase::Load {
            self.apply_subscriptions(handle);
        }
        Ok(())
    }

    fn ready_for(&self, name: &str, phase: Phase) -> bool {
        let required = match phase {
            Phase::Init => ComponentState::Imported,
            Phase::Load => ComponentState::Initialized,
            Phase::Start => ComponentState::Loaded,
            Phase::Stop | Phase::Unload => return true,
        };
        self.component_state(name) == required
    }

    fn is_fatal(&self, name: &str) -> bool {
        self.0
            .libraries
            .read()
            .iter()
            .any(|spec| spec.fatal && spec.name.eq_ignore_ascii_case(name))
    }

    fn apply_subscriptions(&self, handle: &ComponentHandle) {
        let distributions = self.0.router.distributions();
        for msg_type in handle.subscriptions() {
            distributions.subscribe(msg_type, handle.name());
        }
    }

    /// Stops and unloads every module, clears the distribution list, then runs `then`.
    ///
    /// Library subscriptions are put back after the list is cleared.
    #[instrument(skip_all)]
    pub async fn unload_modules<F, Fut>(&self, then: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let modules: Vec<ComponentHandle> = std::mem::take(&mut *self.0.module_handles.lock());
        for phase in Phase::SHUTDOWN {
            for handle in &modules {
                // failures are logged by run_phase; unloading carries on
                let _ = self.run_phase(handle, phase).await;
            }
        }
        for handle in &modules {
            handle.terminate(self.0.shutdown_timeout).await;
            self.0.router.registry().remove(handle.name());
            self.0
                .states
                .insert(handle.name().to_string(), ComponentState::Unloaded);
        }

        self.0.router.distributions().clear();
        let libraries = self.0.library_handles.lock().clone();
        for (_, handle) in &libraries {
            if matches!(
                self.component_state(handle.name()),
                ComponentState::Loaded | ComponentState::Started
            ) {
                self.apply_subscriptions(handle);
            }
        }
        self.0.modules_imported.store(false, Ordering::SeqCst);
        info!(count = modules.len(), "modules unloaded");
        then().await
    }

    /// Unloads all modules and brings up `modules` in their place.
    pub async fn reconfigure(&self, modules: Vec<ModuleSpec>) -> GatewayResult<()> {
        self.unload_modules(|| async {}).await;
        *self.0.modules.write() = modules;
        self.import_modules()?;
        let handles = self.0.module_handles.lock().clone();
        for phase in Phase::STARTUP {
            self.run_phase_all(&handles, phase).await?;
        }
        info!(count = handles.len(), "modules reconfigured");
        Ok(())
    }

    /// Stops everything: modules first, then libraries in reverse startup order.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> GatewayResult<()> {
        info!("shutting down");
        self.unload_modules(|| async {}).await;

        let libraries: Vec<(LibrarySpec, ComponentHandle)> =
            std::mem::take(&mut *self.0.library_handles.lock());
        let stopping: Vec<&ComponentHandle> = libraries
            .iter()
            .rev()
            .filter(|(spec, _)| spec.stop_on_shutdown)
            .map(|(_, handle)| handle)
            .collect();
        for phase in Phase::SHUTDOWN {
            for handle in &stopping {
                let _ = self.run_phase(handle, phase).await;
            }
        }
        for (_, handle) in libraries.iter().rev() {
            handle.terminate(self.0.shutdown_timeout).await;
            self.0.router.registry().remove(handle.name());
            self.0
                .states
                .insert(handle.name().to_string(), ComponentState::Unloaded);
        }

        self.0.router.shutdown(self.0.shutdown_timeout).await
    }
}
