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

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::common::LoggingConfig;

/// Installs the global tracing subscriber, writing to a daily log file.
///
/// `RUST_LOG` overrides the configured filter. Keep the returned guard alive
/// for as long as logs should be flushed.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<WorkerGuard> {
    let directory = config.resolve_directory();
    std::fs::create_dir_all(&directory)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &directory, &config.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))?;

    let subscriber = FmtSubscriber::builder()
        .compact()
        .with_line_number(true)
        .with_target(true)
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(guard)
}
