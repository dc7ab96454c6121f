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

use hearth_gateway::prelude::*;

pub const LAMP_ON: &str = "cmd-on";
pub const LAMP_DEVICE: &str = "dev-porch";
pub const X10_MODULE: &str = "gateway.modules.x10";

/// A test node: id `node1`, prefix `gateway`, short sweep interval.
pub fn config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.node = NodeIdentity {
        node_id: "node1".to_string(),
        local_prefix: "gateway".to_string(),
    };
    config.delivery.sweep_interval_ms = 1_000;
    config.loader.phase_timeout_ms = 2_000;
    config.loader.shutdown_timeout_ms = 2_000;
    config
}

/// A porch light that accepts `on`, owned by the x10 module.
pub fn references() -> InMemoryReferences {
    InMemoryReferences::default()
        .with_command(Command::new(LAMP_ON, "on"))
        .with_command(Command::new("cmd-dim", "dim"))
        .with_device(
            Device::new(LAMP_DEVICE, "Porch Light", "x10-lamp").with_command(LAMP_ON),
            X10_MODULE,
        )
}

/// Router over the test config, the sample references and `clock`.
pub fn router_with_clock(clock: ManualClock) -> Router {
    Router::builder(&config())
        .clock(Arc::new(clock))
        .resolver(Arc::new(references()))
        .build()
}

/// Signs by wrapping the canonical bytes; verification unwraps them.
#[derive(Debug, Default)]
pub struct PlainAuthenticator;

impl Authenticator for PlainAuthenticator {
    fn sign(&self, canonical: &[u8]) -> anyhow::Result<String> {
        Ok(format!("signed:{}", String::from_utf8(canonical.to_vec())?))
    }

    fn verify(&self, signature: &str) -> anyhow::Result<Vec<u8>> {
        signature
            .strip_prefix("signed:")
            .map(|canonical| canonical.as_bytes().to_vec())
            .ok_or_else(|| anyhow::anyhow!("not a signature"))
    }
}
