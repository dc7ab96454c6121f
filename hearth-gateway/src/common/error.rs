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

use thiserror::Error;

use crate::component::Phase;

/// Result alias used throughout the gateway.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// The kind of reference a message failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Command,
    Device,
    /// The module that owns a device could not be determined.
    Route,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceKind::Command => "command",
            ReferenceKind::Device => "device",
            ReferenceKind::Route => "route",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by message construction, validation, routing and loading.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required field is missing or a field carries an impossible value.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// An address has more than one node separator, or a path hop is outside
    /// the local namespace.
    #[error("malformed address '{address}': {reason}")]
    MalformedAddress { address: String, reason: String },

    /// A command, device or owning module could not be found.
    #[error("unresolved {kind} reference: {detail}")]
    UnresolvedReference { kind: ReferenceKind, detail: String },

    #[error("command '{command}' is not available for device '{device}'")]
    InvalidCommandForDevice { command: String, device: String },

    #[error("message authentication failed: {0}")]
    AuthMismatch(String),

    #[error("no registered component for destination '{0}'")]
    UnknownDestination(String),

    #[error("no loaded component matches '{0}'")]
    NoSuchLoadedComponent(String),

    /// A lifecycle hook failed, panicked or timed out.
    #[error("{phase} phase failed for '{component}': {source:#}")]
    ComponentPhase {
        component: String,
        phase: Phase,
        source: anyhow::Error,
    },

    #[error("external transport failed: {0:#}")]
    Transport(anyhow::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("'{0}' is shut down")]
    Shutdown(String),
}

impl GatewayError {
    pub(crate) fn malformed_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        GatewayError::MalformedAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unresolved(kind: ReferenceKind, detail: impl Into<String>) -> Self {
        GatewayError::UnresolvedReference {
            kind,
            detail: detail.into(),
        }
    }
}
