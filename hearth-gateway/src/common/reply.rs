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

//! Helpers for building the futures hooks and handlers return.
//!
//! ```ignore
//! component.on_message(|component, message| {
//!     component.model.seen += 1;
//!     Reply::ready()
//! });
//!
//! component.on_message(|component, message| {
//!     let router = component.router().clone();
//!     Reply::pending(async move {
//!         message.reply().send(&router).await?;
//!         Ok(())
//!     })
//! });
//! ```

use std::future::Future;

use crate::common::HookFuture;

/// Namespace for hook and handler return values.
pub struct Reply;

impl Reply {
    /// A future that completes successfully at once.
    #[inline]
    #[must_use]
    pub fn ready() -> HookFuture {
        Box::pin(async { Ok(()) })
    }

    /// Boxes async work.
    #[inline]
    #[must_use]
    pub fn pending<F>(future: F) -> HookFuture
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Box::pin(future)
    }

    /// A future that fails at once with `error`.
    #[inline]
    #[must_use]
    pub fn failed(error: impl Into<anyhow::Error>) -> HookFuture {
        let error = error.into();
        Box::pin(async move { Err(error) })
    }
}
