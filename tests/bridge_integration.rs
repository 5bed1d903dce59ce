// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end bridge tests against a mock MQTT broker.

use std::sync::Arc;
use std::time::Duration;

use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::time::sleep;

use lumibridge::bridge::Bridge;
use lumibridge::config::BridgeConfig;
use lumibridge::error::HardwareError;
use lumibridge::hal::{Edge, GpioInput, IlluminanceReader, LightDriver};
use lumibridge::registry::Registry;
use lumibridge::types::LightState;

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(19300);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to bind and accept connections.
    sleep(Duration::from_millis(500)).await;
}

/// In-memory light driver recording every applied state.
#[derive(Default)]
struct FakeLight {
    applied: Mutex<Vec<LightState>>,
}

impl LightDriver for FakeLight {
    fn apply(&self, state: &LightState) -> Result<(), HardwareError> {
        self.applied.lock().push(*state);
        Ok(())
    }
    fn read_initial(&self) -> Result<LightState, HardwareError> {
        Ok(LightState::default())
    }
}

struct FakeIlluminance(f64);
impl IlluminanceReader for FakeIlluminance {
    fn read(&self) -> Result<f64, HardwareError> {
        Ok(self.0)
    }
}

struct FakeGpio(bool);
impl GpioInput for FakeGpio {
    fn read(&self) -> Result<bool, HardwareError> {
        Ok(self.0)
    }
}

fn test_config(port: u16, device_id: &str) -> BridgeConfig {
    BridgeConfig {
        mqtt_host: "127.0.0.1".to_string(),
        mqtt_port: port,
        device_id: Some(device_id.to_string()),
        ..BridgeConfig::default()
    }
}

/// Spawns a bridge wired to fake hardware, returning the fake light.
///
/// `Bridge::run`'s future is not `Send` (rumqttc's `EventLoop` is not
/// `Sync`), so the bridge runs on the test's `LocalSet`.
fn spawn_bridge(config: BridgeConfig) -> Arc<FakeLight> {
    let light = Arc::new(FakeLight::default());
    let registry = Registry::build(
        &config,
        Arc::clone(&light) as Arc<dyn LightDriver>,
        Arc::new(FakeIlluminance(400.0)),
        |_| Arc::new(FakeGpio(false)),
    )
    .expect("registry");
    let bridge = Bridge::new(config, registry, None).expect("bridge");
    tokio::task::spawn_local(async move {
        let _ = bridge.run().await;
    });
    light
}

/// Collects (topic, payload) pairs from the broker for `duration`.
async fn observe(
    port: u16,
    client_id: &str,
    filter: &str,
    duration: Duration,
) -> (AsyncClient, Vec<(String, String)>) {
    let mut options = MqttOptions::new(client_id, "127.0.0.1", port);
    options.set_keep_alive(Duration::from_secs(5));
    let (client, mut event_loop) = AsyncClient::new(options, 32);
    client.subscribe(filter, QoS::AtLeastOnce).await.expect("subscribe");

    let mut messages = Vec::new();
    let deadline = tokio::time::Instant::now() + duration;
    loop {
        match tokio::time::timeout_at(deadline, event_loop.poll()).await {
            Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                messages.push((
                    publish.topic.clone(),
                    String::from_utf8_lossy(&publish.payload).into_owned(),
                ));
            }
            Ok(Ok(_)) => {}
            Ok(Err(_)) | Err(_) => break,
        }
    }
    (client, messages)
}

#[tokio::test]
async fn bridge_announces_itself_on_connect() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let port = get_test_port();
            start_mock_broker(port).await;

            let ((), (_client, messages)) = tokio::join!(
                async {
                    sleep(Duration::from_millis(200)).await;
                    spawn_bridge(test_config(port, "itest1"));
                },
                observe(port, "observer1", "#", Duration::from_secs(3)),
            );

            let topics: Vec<&str> = messages.iter().map(|(t, _)| t.as_str()).collect();
            assert!(
                topics.contains(&"lumi/itest1/status"),
                "missing availability: {topics:?}"
            );
            assert!(
                topics.contains(&"homeassistant/light/itest1/light/config"),
                "missing light discovery: {topics:?}"
            );
            assert!(
                topics.contains(&"lumi/itest1/light"),
                "missing light state: {topics:?}"
            );
            assert!(
                topics.contains(&"lumi/itest1/illuminance"),
                "missing illuminance: {topics:?}"
            );

            let status = messages
                .iter()
                .find(|(t, _)| t == "lumi/itest1/status")
                .map(|(_, p)| p.as_str());
            assert_eq!(status, Some("online"));

            let lux = messages
                .iter()
                .find(|(t, _)| t == "lumi/itest1/illuminance")
                .map(|(_, p)| p.as_str());
            assert_eq!(lux, Some("400"));
        })
        .await;
}

#[tokio::test]
async fn zero_transition_set_echoes_exact_state() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let port = get_test_port();
            start_mock_broker(port).await;

            let light = spawn_bridge(test_config(port, "itest2"));
            sleep(Duration::from_millis(700)).await;

            let mut options = MqttOptions::new("commander2", "127.0.0.1", port);
            options.set_keep_alive(Duration::from_secs(5));
            let (client, mut event_loop) = AsyncClient::new(options, 32);
            client
                .subscribe("lumi/itest2/light", QoS::AtLeastOnce)
                .await
                .expect("subscribe");
            // Drive the connection while we command and listen.
            let command = async {
                sleep(Duration::from_millis(300)).await;
                client
                    .publish(
                        "lumi/itest2/light/set",
                        QoS::AtLeastOnce,
                        false,
                        r#"{"state":"ON","color":{"r":10,"g":20,"b":30},"transition":0}"#,
                    )
                    .await
                    .expect("publish");
            };
            let listen = async {
                let deadline = tokio::time::Instant::now() + Duration::from_secs(4);
                let mut seen = Vec::new();
                loop {
                    match tokio::time::timeout_at(deadline, event_loop.poll()).await {
                        Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                            seen.push(String::from_utf8_lossy(&publish.payload).into_owned());
                            if seen.last().is_some_and(|p| p.contains("\"r\":10")) {
                                break;
                            }
                        }
                        Ok(Ok(_)) => {}
                        Ok(Err(_)) | Err(_) => break,
                    }
                }
                seen
            };
            let ((), seen) = tokio::join!(command, listen);

            let last = seen.last().expect("a state echo");
            let state: serde_json::Value = serde_json::from_str(last).expect("valid JSON");
            assert_eq!(state["state"], "ON");
            assert_eq!(state["color"]["r"], 10);
            assert_eq!(state["color"]["g"], 20);
            assert_eq!(state["color"]["b"], 30);

            // The hardware saw the same state, with no intermediate steps for a
            // zero-length transition.
            let applied = light.applied.lock();
            let with_color: Vec<_> = applied
                .iter()
                .filter(|s| s.color.r == 10 && s.color.g == 20 && s.color.b == 30)
                .collect();
            assert_eq!(with_color.len(), 1, "expected exactly one apply");
        })
        .await;
}

#[tokio::test]
async fn button_edges_drain_during_reconnect_backoff() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            // Nothing listens on this port, so the first poll fails immediately
            // and the bridge enters its reconnect backoff (10s by default).
            let port = get_test_port();
            let config = test_config(port, "itest3");
            let registry = Registry::build(
                &config,
                Arc::new(FakeLight::default()),
                Arc::new(FakeIlluminance(400.0)),
                |_| Arc::new(FakeGpio(false)),
            )
            .expect("registry");
            let (tx, button_rx) = mpsc::channel(8);
            let bridge = Bridge::new(config, registry, Some(button_rx)).expect("bridge");
            tokio::task::spawn_local(async move {
                let _ = bridge.run().await;
            });

            // Let the failed connect put the loop into backoff, then keep
            // pressing. The loop must drain every edge while it waits; a stalled
            // loop lets the small channel fill and try_send fail.
            sleep(Duration::from_millis(300)).await;
            for _ in 0..20 {
                tx.try_send(Edge::Press)
                    .expect("event loop stopped draining button edges");
                tx.try_send(Edge::Release)
                    .expect("event loop stopped draining button edges");
                sleep(Duration::from_millis(50)).await;
            }
        })
        .await;
}
