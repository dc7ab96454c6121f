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
use tracing::info;

pub(crate) const LOG_WRITER: &str = "gateway.modules.logwriter";

#[derive(Debug, Default)]
pub(crate) struct LogWriter {
    written: u64,
}

/// Writes every routed message it sees to the log.
pub(crate) fn spawn(router: &Router) -> ComponentHandle {
    let mut component = ManagedComponent::<Idle, LogWriter>::module(LOG_WRITER, router);
    component.subscribe(ALL_SUBSCRIBERS);

    component.on_message(|component, message| {
        component.model.written += 1;
        info!(
            message_id = %message.message_id(),
            origin = message.origin(),
            destination = message.destination(),
            msg_type = %message.msg_type(),
            status = %message.status(),
            payload = ?message.payload(),
            "routed"
        );
        Reply::ready()
    });

    component.on_unload(|component| {
        info!(written = component.model.written, "log writer unloading");
        Reply::ready()
    });

    component.spawn()
}
