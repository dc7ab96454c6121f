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

//! Test support for hearth gateway crates.
//!
//! Integration tests pull in the prelude and annotate `async fn` tests with
//! `#[hearth_test]`. The generated test owns its own multi-thread runtime, so
//! components spawned by the test keep running on worker threads while the
//! test body awaits their replies.

#![forbid(unsafe_code)]

pub use hearth_test_macro::hearth_test;

/// Re-exports used by code generated from `#[hearth_test]`.
#[doc(hidden)]
pub mod __private {
    pub use parking_lot;
    pub use tokio;
    pub use tracing;
}

pub mod prelude {
    pub use hearth_test_macro::hearth_test;
}
