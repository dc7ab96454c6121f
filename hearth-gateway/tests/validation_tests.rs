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

use std::sync::Arc;

use hearth_gateway::prelude::*;
use hearth_test::hearth_test;
use tokio::sync::mpsc;

use crate::setup::components::{next_delivery, register_recorder};
use crate::setup::fixtures::{
    config, references, PlainAuthenticator, LAMP_DEVICE, LAMP_ON, X10_MODULE,
};
use crate::setup::initialize_tracing;

mod setup;

async fn router(authenticator: Option<Arc<dyn Authenticator>>) -> Router {
    let mut builder = Router::builder(&config())
        .clock(Arc::new(ManualClock::starting_now()))
        .resolver(Arc::new(references()));
    if let Some(authenticator) = authenticator {
        builder = builder.authenticator(authenticator);
    }
    let router = builder.build();
    router.mark_fully_started().await;
    router
}

#[hearth_test]
async fn test_command_is_rerouted_to_the_device_owner() -> anyhow::Result<()> {
    initialize_tracing();
    let router = router(None).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    register_recorder(&router, X10_MODULE, &[], &tx);

    let receipt = Message::builder("gateway.modules.web", "gateway.lib.automation", "cmd")
        .payload_value("command", "ON")
        .payload_value("device", "porch light")
        .build()?
        .send(&router)
        .await?;
    assert_eq!(receipt.recipients(), [X10_MODULE]);

    let delivery = next_delivery(&mut rx).await.expect("command not delivered");
    let message = delivery.message;
    assert_eq!(message.destination(), X10_MODULE);
    assert_eq!(message.payload().get_str("command_id"), Some(LAMP_ON));
    assert_eq!(message.payload().get_str("device_id"), Some(LAMP_DEVICE));
    assert_eq!(
        message.payload().device().map(|device| device.label.as_str()),
        Some("Porch Light")
    );
    Ok(())
}

#[hearth_test]
async fn test_validate_rewrites_the_destination_before_any_delivery() -> anyhow::Result<()> {
    initialize_tracing();
    let router = router(None).await;

    let mut message = Message::builder("gateway.modules.web", "Gateway.Lib.X", "cmd")
        .payload_value("command_id", LAMP_ON)
        .payload_value("device", "Porch Light")
        .build()?;
    message.validate(&router.validation_context())?;
    assert_eq!(message.destination(), X10_MODULE);
    assert_eq!(message.payload().get_str("command"), Some("on"));
    Ok(())
}

#[hearth_test]
async fn test_unknown_command_is_rejected() -> anyhow::Result<()> {
    initialize_tracing();
    let router = router(None).await;

    let message = Message::builder("gateway.modules.web", X10_MODULE, "cmd")
        .payload_value("command", "explode")
        .payload_value("device_id", LAMP_DEVICE)
        .build()?;
    let result = router.route(message).await;
    assert!(matches!(
        result,
        Err(GatewayError::UnresolvedReference {
            kind: ReferenceKind::Command,
            ..
        })
    ));
    Ok(())
}

#[hearth_test]
async fn test_command_without_device_is_rejected() -> anyhow::Result<()> {
    initialize_tracing();
    let router = router(None).await;

    let message = Message::builder("gateway.modules.web", X10_MODULE, "cmd")
        .payload_value("command_id", LAMP_ON)
        .build()?;
    assert!(matches!(
        router.route(message).await,
        Err(GatewayError::UnresolvedReference {
            kind: ReferenceKind::Device,
            ..
        })
    ));
    Ok(())
}

#[hearth_test]
async fn test_device_must_accept_the_command() -> anyhow::Result<()> {
    initialize_tracing();
    let router = router(None).await;

    let message = Message::builder("gateway.modules.web", X10_MODULE, "cmd")
        .payload_value("command", "dim")
        .payload_value("device_id", LAMP_DEVICE)
        .build()?;
    match router.route(message).await {
        Err(GatewayError::InvalidCommandForDevice { command, device }) => {
            assert_eq!(command, "dim");
            assert_eq!(device, "Porch Light");
        }
        other => anyhow::bail!("expected InvalidCommandForDevice, got {other:?}"),
    }
    Ok(())
}

#[hearth_test]
async fn test_remote_command_resolves_only_the_command() -> anyhow::Result<()> {
    initialize_tracing();
    let router = router(None).await;

    // resolution succeeds; forwarding then fails on the default transport
    let message = Message::builder("gateway.modules.web", "gateway.modules.x10:node2", "cmd")
        .payload_value("command", "on")
        .payload_value("device_id", "a-device-node1-never-heard-of")
        .build()?;
    assert!(matches!(
        router.route(message).await,
        Err(GatewayError::Transport(_))
    ));
    Ok(())
}

#[hearth_test]
async fn test_address_with_two_node_separators_is_malformed() -> anyhow::Result<()> {
    initialize_tracing();
    let router = router(None).await;

    let message = Message::builder("gateway.modules.web", "gateway.modules.x10:node1:extra", "status")
        .build()?;
    assert!(matches!(
        router.route(message).await,
        Err(GatewayError::MalformedAddress { .. })
    ));
    Ok(())
}

fn remote_status(router: &Router) -> anyhow::Result<Message> {
    let mut message = Message::builder("gateway.modules.web:node2", "gateway.modules.lights", "status")
        .payload_value("level", 10)
        .build()?;
    message.add_path("gateway.modules.web:node2", true, router.identity())?;
    Ok(message)
}

#[hearth_test]
async fn test_signed_message_from_another_node_is_accepted() -> anyhow::Result<()> {
    initialize_tracing();
    let router = router(Some(Arc::new(PlainAuthenticator))).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);

    let mut message = remote_status(&router)?;
    message.generate_auth("alice", &PlainAuthenticator)?;
    assert_eq!(message.auth().username, "alice");

    router.route(message).await?;
    let delivery = next_delivery(&mut rx).await.expect("signed message not delivered");
    assert!(!delivery.message.is_origin_local(router.identity())?);
    Ok(())
}

#[hearth_test]
async fn test_tampered_message_from_another_node_is_rejected() -> anyhow::Result<()> {
    initialize_tracing();
    let router = router(Some(Arc::new(PlainAuthenticator))).await;
    let (tx, _rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);

    let mut message = remote_status(&router)?;
    message.generate_auth("alice", &PlainAuthenticator)?;
    message.payload_mut().insert("level", 99);

    assert!(matches!(
        router.route(message).await,
        Err(GatewayError::AuthMismatch(_))
    ));
    Ok(())
}

#[hearth_test]
async fn test_unsigned_message_from_another_node_is_rejected() -> anyhow::Result<()> {
    initialize_tracing();
    let router = router(Some(Arc::new(PlainAuthenticator))).await;
    let (tx, _rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);

    let message = remote_status(&router)?;
    assert!(matches!(
        router.route(message).await,
        Err(GatewayError::AuthMismatch(_))
    ));
    Ok(())
}

#[hearth_test]
async fn test_unsigned_message_relayed_by_another_node_is_rejected() -> anyhow::Result<()> {
    initialize_tracing();
    let router = router(Some(Arc::new(PlainAuthenticator))).await;
    let (tx, _rx) = mpsc::unbounded_channel();
    register_recorder(&router, "gateway.modules.lights", &[], &tx);

    let mut message = Message::builder("gateway.modules.web", "gateway.modules.lights", "status")
        .build()?;
    message.add_path("gateway.lib.x:node2", false, router.identity())?;
    assert!(!message.is_origin_local(router.identity())?);

    assert!(matches!(
        router.route(message).await,
        Err(GatewayError::AuthMismatch(_))
    ));
    Ok(())
}

#[hearth_test]
async fn test_wire_form_survives_a_trip_through_json() -> anyhow::Result<()> {
    initialize_tracing();
    let router = router(None).await;

    let unqualified = Message::builder("gateway.modules.web", "gateway.modules.lights:node2", "status")
        .build()?;
    assert!(matches!(
        unqualified.to_external(router.identity()),
        Err(GatewayError::MalformedAddress { .. })
    ));

    let mut message = Message::builder("gateway.modules.web:node1", "gateway.modules.lights:node2", "status")
        .payload_value("level", 10)
        .build()?;
    message.add_local_path("modules.web", false, router.identity())?;
    let wire = serde_json::to_string(&message.to_external(router.identity())?)?;

    let received: SerializedMessage = serde_json::from_str(&wire)?;
    let rebuilt = Message::from_serialized(received)?;
    assert!(!rebuilt.is_new());
    assert_eq!(rebuilt.message_id(), message.message_id());
    assert_eq!(rebuilt.origin(), "gateway.modules.web:node1");
    assert_eq!(rebuilt.path().len(), 1);
    assert_eq!(
        rebuilt.path().hops().next().map(|hop| hop.component.as_str()),
        Some("gateway.modules.web:node1")
    );
    assert_eq!(rebuilt.payload(), message.payload());
    Ok(())
}
