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

use async_trait::async_trait;

use crate::message::Message;
use crate::traits::ExternalTransport;

/// Transport for nodes with no uplink: every external send fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnroutableTransport;

#[async_trait]
impl ExternalTransport for UnroutableTransport {
    async fn send_external(&self, message: Message) -> anyhow::Result<()> {
        anyhow::bail!(
            "no external transport configured for destination '{}'",
            message.destination()
        )
    }
}
