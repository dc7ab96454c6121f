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

use crate::common::{GatewayError, GatewayResult};

const NODE_SEPARATOR: char = ':';
const BROADCAST_SEGMENT: &str = "all";

/// A component address: a dotted component name with an optional node suffix.
///
/// `gateway.lib.automation` addresses a component on this node,
/// `gateway.lib.automation:7ak2` addresses it on node `7ak2`. Addresses never
/// carry more than one separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentAddress {
    name: String,
    node: Option<String>,
}

impl ComponentAddress {
    pub fn parse(raw: &str) -> GatewayResult<Self> {
        let raw = raw.trim().to_lowercase();
        let mut parts = raw.split(NODE_SEPARATOR);
        let name = parts.next().unwrap_or_default().to_string();
        let node = parts.next().map(str::to_string);
        if parts.next().is_some() {
            return Err(GatewayError::malformed_address(
                raw.as_str(),
                "more than one node separator",
            ));
        }
        if name.is_empty() {
            return Err(GatewayError::malformed_address(raw.as_str(), "empty component name"));
        }
        if node.as_deref() == Some("") {
            return Err(GatewayError::malformed_address(raw.as_str(), "empty node id"));
        }
        Ok(ComponentAddress { name, node })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    /// True when the address carries a node suffix.
    pub fn is_full(&self) -> bool {
        self.node.is_some()
    }

    /// True when the address has no node suffix or names `node_id`.
    pub fn is_local_to(&self, node_id: &str) -> bool {
        self.node
            .as_deref()
            .map_or(true, |node| node.eq_ignore_ascii_case(node_id))
    }

    /// True when the final dotted segment of the name is `all`.
    pub fn is_broadcast(&self) -> bool {
        self.name.rsplit('.').next() == Some(BROADCAST_SEGMENT)
    }

    /// True when the name equals `prefix` or sits below it in the dotted hierarchy.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        let prefix = prefix.trim_end_matches('.');
        prefix.is_empty()
            || self.name == prefix
            || self
                .name
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('.'))
    }

    pub(crate) fn with_node(mut self, node_id: &str) -> Self {
        self.node = Some(node_id.to_lowercase());
        self
    }
}

impl fmt::Display for ComponentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => write!(f, "{}{NODE_SEPARATOR}{node}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_local_and_full_addresses() {
        let local = ComponentAddress::parse("Gateway.Lib.Automation").unwrap();
        assert_eq!(local.name(), "gateway.lib.automation");
        assert!(!local.is_full());
        assert!(local.is_local_to("anything"));

        let full = ComponentAddress::parse("gateway.lib.automation:node7").unwrap();
        assert_eq!(full.node(), Some("node7"));
        assert!(full.is_local_to("NODE7"));
        assert!(!full.is_local_to("node8"));
        assert_eq!(full.to_string(), "gateway.lib.automation:node7");
    }

    #[test]
    fn rejects_more_than_one_separator() {
        let err = ComponentAddress::parse("a:b:c").unwrap_err();
        assert!(matches!(err, GatewayError::MalformedAddress { .. }));
        assert!(ComponentAddress::parse(":node").is_err());
        assert!(ComponentAddress::parse("a:").is_err());
    }

    #[test]
    fn broadcast_and_prefix_checks() {
        assert!(ComponentAddress::parse("gateway.all").unwrap().is_broadcast());
        assert!(ComponentAddress::parse("all").unwrap().is_broadcast());
        assert!(!ComponentAddress::parse("gateway.allsorts").unwrap().is_broadcast());

        let address = ComponentAddress::parse("gateway.modules.x10").unwrap();
        assert!(address.has_prefix("gateway"));
        assert!(address.has_prefix("gateway.modules"));
        assert!(!address.has_prefix("gate"));
        assert!(!ComponentAddress::parse("controller").unwrap().has_prefix("gateway"));
    }
}
