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

use std::time::Duration;

use hearth_gateway::prelude::*;
use hearth_test::hearth_test;
use serde_json::json;
use tokio::sync::mpsc;

use crate::setup::components::{next_delivery, register_recorder, stays_quiet};
use crate::setup::fixtures::{config, references, LAMP_DEVICE, LAMP_ON, X10_MODULE};
use crate::setup::initialize_tracing;

mod setup;

fn router(clock: &ManualClock, notify_origin_on_expiry: bool) -> Router {
    let mut config = config();
    config.delivery.notify_origin_on_expiry = notify_origin_on_expiry;
    Router::builder(&config)
        .clock(std::sync::Arc::new(clock.clone()))
        .resolver(std::sync::Arc::new(references()))
        .build()
}

#[hearth_test]
async fn test_delayed_message_waits_for_not_before() -> anyhow::Result<()> {
    initialize_tracing();
    let clock = ManualClock::starting_now();
    let router = router(&clock, false);
    router.mark_fully_started().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);

    let message = Message::builder("gateway.modules.web", "gateway.modules.lights", "status")
        .delay(5.0)
        .max_delay(10.0)
        .build_with_clock(&clock)?;
    let id = message.message_id().clone();
    assert_eq!(router.route(message).await?, SendReceipt::Delayed);
    assert!(router.queue().is_delayed(&id));
    assert!(router.sweep_delayed().await.is_empty());
    assert!(stays_quiet(&mut rx).await);

    clock.advance(Duration::from_secs(6));
    let report = router.sweep_delayed().await;
    assert_eq!(report.released, vec![id.clone()]);
    assert!(!router.queue().is_delayed(&id));

    let delivery = next_delivery(&mut rx).await.expect("released message missing");
    assert_eq!(delivery.message.message_id(), &id);
    Ok(())
}

#[hearth_test]
async fn test_delayed_messages_release_earliest_first() -> anyhow::Result<()> {
    initialize_tracing();
    let clock = ManualClock::starting_now();
    let router = router(&clock, false);
    router.mark_fully_started().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);

    let mut ids = Vec::new();
    for delay in [9.0, 3.0, 6.0] {
        let message = Message::builder("gateway.modules.web", "gateway.modules.lights", "status")
            .delay(delay)
            .max_delay(60.0)
            .build_with_clock(&clock)?;
        ids.push(message.message_id().clone());
        router.route(message).await?;
    }
    assert_eq!(router.queue().delayed_len(), 3);

    clock.advance(Duration::from_secs(10));
    let report = router.sweep_delayed().await;
    assert_eq!(report.released, vec![ids[1].clone(), ids[2].clone(), ids[0].clone()]);
    for expected in [&ids[1], &ids[2], &ids[0]] {
        let delivery = next_delivery(&mut rx).await.expect("missing delivery");
        assert_eq!(delivery.message.message_id(), expected);
    }
    Ok(())
}

#[hearth_test]
async fn test_message_past_max_delay_is_dropped() -> anyhow::Result<()> {
    initialize_tracing();
    let clock = ManualClock::starting_now();
    let router = router(&clock, false);
    router.mark_fully_started().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);

    let message = Message::builder("gateway.modules.web", "gateway.modules.lights", "status")
        .delay(5.0)
        .max_delay(1.0)
        .build_with_clock(&clock)?;
    let id = message.message_id().clone();
    router.route(message).await?;

    // 5s delay + 1s max_delay, then half a second more
    clock.advance(Duration::from_millis(6_500));
    let report = router.sweep_delayed().await;
    assert_eq!(report.expired, vec![id]);
    assert!(report.released.is_empty());
    assert!(stays_quiet(&mut rx).await);
    assert_eq!(router.stats().snapshot().expired, 1);
    Ok(())
}

#[hearth_test]
async fn test_late_message_within_max_delay_is_still_delivered() -> anyhow::Result<()> {
    initialize_tracing();
    let clock = ManualClock::starting_now();
    let router = router(&clock, false);
    router.mark_fully_started().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);

    let message = Message::builder("gateway.modules.web", "gateway.modules.lights", "status")
        .delay(5.0)
        .max_delay(1.0)
        .build_with_clock(&clock)?;
    router.route(message).await?;

    clock.advance(Duration::from_millis(5_500));
    assert_eq!(router.sweep_delayed().await.released.len(), 1);
    assert!(next_delivery(&mut rx).await.is_some());
    Ok(())
}

#[hearth_test]
async fn test_message_just_past_max_delay_is_never_delivered() -> anyhow::Result<()> {
    initialize_tracing();
    let clock = ManualClock::starting_now();
    let router = router(&clock, false);
    router.mark_fully_started().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);

    // the window closed 0.7s ago
    let message = Message::builder("gateway.modules.web", "gateway.modules.lights", "status")
        .existing()
        .message_id(MessageId::generate(&OriginTag::default()).as_str())
        .not_before(router.now() - 0.9)
        .max_delay(0.2)
        .build_with_clock(&clock)?;
    assert_eq!(router.route(message).await?, SendReceipt::Expired);
    assert!(stays_quiet(&mut rx).await);

    let queued = Message::builder("gateway.modules.web", "gateway.modules.lights", "status")
        .delay(5.0)
        .max_delay(0.2)
        .build_with_clock(&clock)?;
    let id = queued.message_id().clone();
    router.route(queued).await?;
    clock.advance(Duration::from_millis(5_300));
    let report = router.sweep_delayed().await;
    assert_eq!(report.expired, vec![id]);
    assert!(report.released.is_empty());
    assert!(stays_quiet(&mut rx).await);
    Ok(())
}

#[hearth_test]
async fn test_sweep_does_not_release_a_message_not_yet_due() -> anyhow::Result<()> {
    initialize_tracing();
    let clock = ManualClock::starting_now();
    let router = router(&clock, false);
    router.mark_fully_started().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);

    let message = Message::builder("gateway.modules.web", "gateway.modules.lights", "status")
        .delay(0.0004)
        .max_delay(1.0)
        .build_with_clock(&clock)?;
    let id = message.message_id().clone();
    assert_eq!(router.route(message).await?, SendReceipt::Delayed);

    let report = router.sweep_delayed().await;
    assert!(report.released.is_empty());
    assert!(router.queue().is_delayed(&id));
    assert!(stays_quiet(&mut rx).await);

    clock.advance(Duration::from_millis(1));
    assert_eq!(router.sweep_delayed().await.released, vec![id]);
    assert!(next_delivery(&mut rx).await.is_some());
    Ok(())
}

#[hearth_test]
async fn test_expired_message_notifies_its_origin() -> anyhow::Result<()> {
    initialize_tracing();
    let clock = ManualClock::starting_now();
    let router = router(&clock, true);
    router.mark_fully_started().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);
    let (web_tx, mut web_rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.web", &[], &web_tx);

    let message = Message::builder("gateway.modules.web", "gateway.modules.lights", "status")
        .delay(2.0)
        .build_with_clock(&clock)?;
    let id = message.message_id().clone();
    router.route(message).await?;

    clock.advance(Duration::from_secs(30));
    assert_eq!(router.sweep_delayed().await.expired, vec![id.clone()]);

    let notice = next_delivery(&mut web_rx).await.expect("origin was not told");
    assert_eq!(notice.message.status(), &MessageStatus::Failed);
    assert_eq!(notice.message.status_detail(), Some("max_delay reached"));
    assert_eq!(notice.message.orig_message_id(), Some(&id));
    assert_eq!(notice.message.origin(), "gateway.modules.lights");
    assert!(stays_quiet(&mut rx).await);
    Ok(())
}

#[hearth_test]
async fn test_sending_early_removes_the_delayed_copy() -> anyhow::Result<()> {
    initialize_tracing();
    let clock = ManualClock::starting_now();
    let router = router(&clock, false);
    router.mark_fully_started().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);

    let message = Message::builder("gateway.modules.web", "gateway.modules.lights", "status")
        .delay(30.0)
        .build_with_clock(&clock)?;
    let id = message.message_id().clone();
    let mut early = message.clone();
    router.route(message).await?;
    assert!(router.queue().is_delayed(&id));

    let fields = json!({ "not_before": 0.0 });
    early.update(fields.as_object().cloned().unwrap_or_default())?;
    let receipt = router.route(early).await?;
    assert_eq!(receipt.recipients(), ["gateway.modules.lights"]);
    assert!(!router.queue().is_delayed(&id));
    assert!(next_delivery(&mut rx).await.is_some());

    clock.advance(Duration::from_secs(31));
    assert!(router.sweep_delayed().await.is_empty());
    assert!(stays_quiet(&mut rx).await);
    Ok(())
}

#[hearth_test]
async fn test_delayed_commands_are_tracked_per_device() -> anyhow::Result<()> {
    initialize_tracing();
    let clock = ManualClock::starting_now();
    let router = router(&clock, false);
    router.mark_fully_started().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    register_recorder(&router, X10_MODULE, &[], &tx);

    let mut ids = Vec::new();
    for delay in [10.0, 20.0] {
        let message = Message::builder("gateway.modules.web", "gateway.lib.automation", "cmd")
            .payload_value("command_id", LAMP_ON)
            .payload_value("device_id", LAMP_DEVICE)
            .delay(delay)
            .build_with_clock(&clock)?;
        ids.push(message.message_id().clone());
        assert_eq!(router.route(message).await?, SendReceipt::Delayed);
    }

    assert_eq!(router.queue().device_pending(LAMP_DEVICE), ids);
    assert_eq!(router.queue().cancel_device(LAMP_DEVICE), 2);
    assert_eq!(router.queue().delayed_len(), 0);

    clock.advance(Duration::from_secs(25));
    assert!(router.sweep_delayed().await.is_empty());
    assert!(stays_quiet(&mut rx).await);
    Ok(())
}

#[hearth_test]
async fn test_background_sweeper_releases_due_messages() -> anyhow::Result<()> {
    initialize_tracing();
    let clock = ManualClock::starting_now();
    let mut config = config();
    config.delivery.sweep_interval_ms = 20;
    let router = Router::builder(&config)
        .clock(std::sync::Arc::new(clock.clone()))
        .build();
    router.mark_fully_started().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);

    let message = Message::builder("gateway.modules.web", "gateway.modules.lights", "status")
        .delay(1.0)
        .max_delay(5.0)
        .build_with_clock(&clock)?;
    router.route(message).await?;
    router.spawn_sweeper();
    router.spawn_sweeper();

    assert!(stays_quiet(&mut rx).await);
    clock.advance(Duration::from_secs(2));
    assert!(next_delivery(&mut rx).await.is_some());

    router.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[hearth_test]
async fn test_received_message_already_past_its_window_expires() -> anyhow::Result<()> {
    initialize_tracing();
    let clock = ManualClock::starting_now();
    let router = router(&clock, false);
    router.mark_fully_started().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);

    let message = Message::builder("gateway.modules.web", "gateway.modules.lights", "status")
        .existing()
        .message_id(MessageId::generate(&OriginTag::default()).as_str())
        .not_before(router.now() - 30.0)
        .max_delay(5.0)
        .build_with_clock(&clock)?;
    assert_eq!(router.route(message).await?, SendReceipt::Expired);
    assert!(stays_quiet(&mut rx).await);
    assert_eq!(router.queue().delayed_len(), 0);
    Ok(())
}
