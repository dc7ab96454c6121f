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
use std::time::Duration;

use hearth_gateway::prelude::*;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// A message as seen by the component that received it.
#[derive(Debug)]
pub struct Delivery {
    pub component: String,
    pub message: Message,
}

/// Counts what a recording component has handled.
#[derive(Debug, Default)]
pub struct Recorder {
    pub handled: usize,
}

/// Shared log of lifecycle events, as `"<component>:<phase>"`.
pub type PhaseLog = Arc<Mutex<Vec<String>>>;

/// Spawns a component that forwards every delivered message to `deliveries`.
pub fn spawn_recorder(
    router: &Router,
    name: &str,
    kind: ComponentKind,
    subscriptions: &[&str],
    deliveries: mpsc::UnboundedSender<Delivery>,
) -> ComponentHandle {
    let mut component = ManagedComponent::<Idle, Recorder>::new(name, kind, router);
    for msg_type in subscriptions {
        component.subscribe(msg_type);
    }
    component.on_message(move |component, message| {
        component.model.handled += 1;
        let _ = deliveries.send(Delivery {
            component: component.name().to_string(),
            message,
        });
        Reply::ready()
    });
    component.spawn()
}

/// Spawns a recorder and registers it and its subscriptions directly with the router.
pub fn register_recorder(
    router: &Router,
    name: &str,
    subscriptions: &[&str],
    deliveries: &mpsc::UnboundedSender<Delivery>,
) -> ComponentHandle {
    let handle = spawn_recorder(router, name, ComponentKind::Module, subscriptions, deliveries.clone());
    for msg_type in subscriptions {
        router.distributions().subscribe(msg_type, handle.name());
    }
    router.registry().register(handle.clone());
    handle
}

/// Registers a catalog factory whose component records each phase it runs.
///
/// `failing` names phases whose hook returns an error; `skipped` names phases
/// the component never registers a hook for.
pub fn register_phased(
    catalog: &mut ComponentCatalog,
    name: &str,
    kind: ComponentKind,
    subscriptions: &[&str],
    log: &PhaseLog,
    failing: &[Phase],
    skipped: &[Phase],
) {
    let name = name.to_string();
    let subscriptions: Vec<String> = subscriptions.iter().map(|s| s.to_string()).collect();
    let failing = failing.to_vec();
    let skipped = skipped.to_vec();
    let log = Arc::clone(log);
    catalog.register(name.clone(), move |router| {
        let mut component = ManagedComponent::<Idle, Recorder>::new(&name, kind, router);
        for msg_type in &subscriptions {
            component.subscribe(msg_type);
        }
        for phase in [Phase::Init, Phase::Load, Phase::Start, Phase::Stop, Phase::Unload] {
            if skipped.contains(&phase) {
                continue;
            }
            let log = Arc::clone(&log);
            let fails = failing.contains(&phase);
            component.on_phase(phase, move |component| {
                log.lock().push(format!("{}:{phase}", component.name()));
                if fails {
                    Reply::failed(anyhow::anyhow!("{} refuses to {phase}", component.name()))
                } else {
                    Reply::ready()
                }
            });
        }
        let log = Arc::clone(&log);
        component.on_message(move |component, message| {
            component.model.handled += 1;
            log.lock()
                .push(format!("{}:message:{}", component.name(), message.msg_type()));
            Reply::ready()
        });
        component.spawn()
    });
}

/// Waits for the next delivery, up to one second.
pub async fn next_delivery(deliveries: &mut mpsc::UnboundedReceiver<Delivery>) -> Option<Delivery> {
    tokio::time::timeout(Duration::from_secs(1), deliveries.recv())
        .await
        .ok()
        .flatten()
}

/// True when nothing arrives within a short window.
pub async fn stays_quiet(deliveries: &mut mpsc::UnboundedReceiver<Delivery>) -> bool {
    tokio::time::timeout(Duration::from_millis(150), deliveries.recv())
        .await
        .is_err()
}
