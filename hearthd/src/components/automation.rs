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

use std::collections::BTreeMap;

use hearth_gateway::prelude::*;
use tracing::{debug, info};

pub(crate) const AUTOMATION: &str = "gateway.lib.automation";

/// Status messages seen, per origin.
#[derive(Debug, Default)]
pub(crate) struct StatusCounter {
    by_origin: BTreeMap<String, u64>,
}

pub(crate) fn spawn(router: &Router) -> ComponentHandle {
    let mut component = ManagedComponent::<Idle, StatusCounter>::library(AUTOMATION, router);
    component.subscribe("status");

    component
        .on_init(|_| Reply::ready())
        .on_load(|_| Reply::ready())
        .on_start(|component| {
            info!(node = %component.router().identity().node_id, "automation ready");
            Reply::ready()
        })
        .on_stop(|component| {
            let total: u64 = component.model.by_origin.values().sum();
            info!(total, origins = component.model.by_origin.len(), "automation stopping");
            Reply::ready()
        })
        .on_unload(|_| Reply::ready());

    component.on_message(|component, message| {
        if *message.msg_type() != MessageType::Status {
            return Reply::ready();
        }
        let seen = component
            .model
            .by_origin
            .entry(message.origin().to_string())
            .or_default();
        *seen += 1;
        debug!(origin = message.origin(), seen = *seen, "status counted");
        Reply::ready()
    });

    component.spawn()
}
