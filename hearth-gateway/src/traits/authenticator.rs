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

use std::fmt::Debug;

/// Signs and verifies the canonical digest of a message.
///
/// `verify` returns the bytes that were signed so the receiver can compare
/// them field by field with the message it holds.
pub trait Authenticator: Debug + Send + Sync {
    fn sign(&self, canonical: &[u8]) -> anyhow::Result<String>;

    fn verify(&self, signature: &str) -> anyhow::Result<Vec<u8>>;
}
