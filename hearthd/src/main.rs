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

use anyhow::Result;
use hearth_gateway::prelude::*;
use tracing::{error, info};

mod components;

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = GatewayConfig::load();
    let _log_guard = init_tracing(&config.logging)?;
    info!("** hearthd startup **");

    if config.loader.libraries.is_empty() && config.loader.modules.is_empty() {
        info!("no components configured; loading the built-in set");
        config.loader.libraries = components::builtin_libraries();
        config.loader.modules = components::builtin_modules();
    }

    let router = Router::builder(&config).build();
    let loader = Loader::new(config, router, components::catalog());

    if let Err(e) = loader.start().await {
        error!("startup failed: {e}");
        loader.shutdown().await?;
        return Err(e.into());
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received; shutting down"),
        Err(e) => error!("cannot listen for ctrl-c: {e}"),
    }

    let stats = loader.router().stats().snapshot();
    info!(?stats, "routing totals");
    if let Err(e) = loader.shutdown().await {
        error!("shutdown incomplete: {e}");
    }
    info!("** hearthd shutdown complete **");
    Ok(())
}
