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

use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::common::{GatewayError, GatewayResult};

const RANDOM_LEN: usize = 26;
const SUBTYPE_LEN: usize = 3;
const FILLER: char = 'z';

/// Length of every message id.
pub const MESSAGE_ID_LEN: usize = RANDOM_LEN + 1 + SUBTYPE_LEN;

/// Identifies the kind of component that minted a message id.
///
/// Rendered as the last four characters of the id: one main-type character
/// followed by a three character subtype. Missing or non-alphanumeric
/// characters become `z`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginTag {
    main: char,
    subtype: String,
}

impl Default for OriginTag {
    fn default() -> Self {
        OriginTag {
            main: FILLER,
            subtype: String::new(),
        }
    }
}

impl OriginTag {
    pub fn new(main: char, subtype: impl Into<String>) -> Self {
        OriginTag {
            main,
            subtype: subtype.into(),
        }
    }

    fn render(&self) -> String {
        let clean = |c: char| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                FILLER
            }
        };
        let mut tag = String::with_capacity(1 + SUBTYPE_LEN);
        tag.push(clean(self.main));
        tag.extend(
            self.subtype
                .chars()
                .map(clean)
                .chain(std::iter::repeat(FILLER))
                .take(SUBTYPE_LEN),
        );
        tag
    }
}

/// A 30 character alphanumeric message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageId(String);

impl MessageId {
    /// Mints a fresh id carrying the given origin tag.
    pub fn generate(tag: &OriginTag) -> Self {
        let mut id: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_LEN)
            .map(char::from)
            .collect();
        id.push_str(&tag.render());
        MessageId(id)
    }

    /// Accepts an id received from elsewhere, checking its shape.
    pub fn parse(raw: &str) -> GatewayResult<Self> {
        if raw.len() != MESSAGE_ID_LEN || !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(GatewayError::MalformedMessage(format!(
                "message id '{raw}' must be {MESSAGE_ID_LEN} alphanumeric characters"
            )));
        }
        Ok(MessageId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MessageId {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MessageId::parse(&value)
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn ids_have_fixed_length_and_default_tag() {
        let id = MessageId::generate(&OriginTag::default());
        assert_eq!(id.as_str().len(), MESSAGE_ID_LEN);
        assert!(id.as_str().ends_with("zzzz"));
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn short_subtypes_are_padded() {
        let id = MessageId::generate(&OriginTag::new('m', "x"));
        assert!(id.as_str().ends_with("mxzz"));

        let id = MessageId::generate(&OriginTag::new('L', "automation"));
        assert!(id.as_str().ends_with("laut"));

        let id = MessageId::generate(&OriginTag::new('-', "a.b"));
        assert!(id.as_str().ends_with("zazb"));
    }

    #[test]
    fn ten_thousand_ids_are_distinct() {
        let tag = OriginTag::default();
        let ids: HashSet<MessageId> = (0..10_000).map(|_| MessageId::generate(&tag)).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn parse_rejects_wrong_shapes() {
        assert!(MessageId::parse("short").is_err());
        assert!(MessageId::parse(&"-".repeat(MESSAGE_ID_LEN)).is_err());
        let good = MessageId::generate(&OriginTag::default());
        assert_eq!(MessageId::parse(good.as_str()).ok(), Some(good));
    }
}
