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

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::common::{GatewayError, GatewayResult};

/// Configuration for a gateway node.
///
/// Loaded from TOML in the XDG config directory (`hearth/config.toml`). Every
/// section falls back to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Who this node is and which namespace its components live in
    pub node: NodeIdentity,
    /// Delivery and delayed-queue behaviour
    pub delivery: DeliveryConfig,
    /// Component lookup settings
    pub registry: RegistryConfig,
    /// Startup tables and phase timeouts
    pub loader: LoaderConfig,
    /// Log file location and filter
    pub logging: LoggingConfig,
}

/// Identity of the local node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeIdentity {
    /// Appended to local addresses to make them fully qualified
    pub node_id: String,
    /// Dotted prefix every local component name starts with
    pub local_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Longest wait between delayed-queue sweeps, in milliseconds
    pub sweep_interval_ms: u64,
    /// Capacity of each component inbox
    pub inbox_capacity: usize,
    /// Send a `failed` reply to the origin when an expired message is dropped
    pub notify_origin_on_expiry: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Minimum similarity ratio for an approximate name match
    pub fuzzy_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Upper bound for a single lifecycle hook, in milliseconds
    pub phase_timeout_ms: u64,
    /// Upper bound for a component task to exit after termination, in milliseconds
    pub shutdown_timeout_ms: u64,
    /// Core libraries, started in ascending tier order
    pub libraries: Vec<LibrarySpec>,
    /// Pluggable modules, started after all libraries
    pub modules: Vec<ModuleSpec>,
}

/// One row of the library table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySpec {
    pub name: String,
    #[serde(default = "default_tier")]
    pub tier: u8,
    /// A failure in any phase of a fatal library aborts startup.
    #[serde(default)]
    pub fatal: bool,
    #[serde(default = "default_true")]
    pub stop_on_shutdown: bool,
}

/// One row of the module table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log directory; the XDG data directory's `logs` when unset
    pub directory: Option<PathBuf>,
    pub file_name: String,
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
}

const fn default_tier() -> u8 {
    1
}

const fn default_true() -> bool {
    true
}

impl Default for NodeIdentity {
    fn default() -> Self {
        Self {
            node_id: "local".to_string(),
            local_prefix: "gateway".to_string(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: 2_000,
            inbox_capacity: 255,
            notify_origin_on_expiry: false,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.90,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            phase_timeout_ms: 30_000,
            shutdown_timeout_ms: 10_000,
            libraries: Vec::new(),
            modules: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_name: "hearth.log".to_string(),
            filter: "info".to_string(),
        }
    }
}

impl LibrarySpec {
    pub fn new(name: impl Into<String>, tier: u8) -> Self {
        Self {
            name: name.into(),
            tier,
            fatal: false,
            stop_on_shutdown: true,
        }
    }

    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }
}

impl ModuleSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }
}

impl NodeIdentity {
    /// Prefixes a relative component name with the local namespace.
    pub fn qualify(&self, suffix: &str) -> String {
        let prefix = self.local_prefix.trim_end_matches('.');
        if prefix.is_empty() {
            suffix.to_lowercase()
        } else {
            format!("{prefix}.{}", suffix.trim_start_matches('.')).to_lowercase()
        }
    }
}

impl DeliveryConfig {
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl LoaderConfig {
    pub const fn phase_timeout(&self) -> Duration {
        Duration::from_millis(self.phase_timeout_ms)
    }

    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl LoggingConfig {
    /// Directory the log file is written to.
    pub fn resolve_directory(&self) -> PathBuf {
        if let Some(directory) = &self.directory {
            return directory.clone();
        }
        match xdg::BaseDirectories::with_prefix("hearth") {
            Ok(dirs) => dirs.get_data_home().join("logs"),
            Err(_) => PathBuf::from("logs"),
        }
    }
}

impl GatewayConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(document: &str) -> GatewayResult<Self> {
        toml::from_str(document).map_err(|e| GatewayError::Config(e.to_string()))
    }

    /// Reads and parses the file at `path`.
    pub fn load_from(path: &Path) -> GatewayResult<Self> {
        let document = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&document)
    }

    /// Loads `$XDG_CONFIG_HOME/hearth/config.toml`.
    ///
    /// Falls back to the defaults when no file exists or the file cannot be
    /// read or parsed; the reason is logged.
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("hearth") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        let Some(path) = xdg_dirs.find_config_file("config.toml") else {
            info!("No configuration file found, using defaults");
            return Self::default();
        };

        info!("Loading configuration from: {}", path.display());
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("{e}; using defaults");
                Self::default()
            }
        }
    }

    /// Library rows in startup order: ascending tier, then table order.
    pub fn libraries_in_start_order(&self) -> Vec<LibrarySpec> {
        let mut libraries = self.loader.libraries.clone();
        libraries.sort_by_key(|library| library.tier);
        libraries
    }
}
