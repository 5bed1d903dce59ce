// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bridge event loop.
//!
//! One task owns all entity state and multiplexes, via `select!`:
//!
//! 1. the MQTT event loop, carrying inbound commands and (re)connection
//!    events;
//! 2. the sensor poll timer, feeding illuminance and GPIO samples
//!    through the debounce/change filters;
//! 3. button edges from the input-reader thread, plus the settle timer
//!    that classifies them into gestures;
//! 4. transition animation ticks while a light animation is in flight;
//! 5. completion notices from offloaded custom commands.
//!
//! Nothing in the loop blocks beyond a bounded sysfs read: shell
//! commands run on detached tasks, the button device on its own thread.
//! All publishes go through the loop's single client, so outbound
//! traffic and per-light animation steps are strictly serialized.

use std::time::{Duration, Instant};

use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;

use crate::button::{ClickTracker, SETTLE_TIMEOUT};
use crate::config::BridgeConfig;
use crate::dispatch::{CommandDispatcher, CommandDone};
use crate::discovery::DiscoveryPublisher;
use crate::error::{ProtocolError, Result};
use crate::filter::{ChangeFilter, DebounceFilter};
use crate::hal::Edge;
use crate::registry::Registry;
use crate::router::{Route, TopicRouter};
use crate::transition::TransitionController;
use crate::types::{ButtonAction, LightState};

/// Availability payloads on the status topic.
const ONLINE: &str = "online";
const OFFLINE: &str = "offline";

/// The assembled bridge, ready to run.
pub struct Bridge {
    config: BridgeConfig,
    registry: Registry,
    router: TopicRouter,
    discovery: DiscoveryPublisher,
    controller: TransitionController,
    client: AsyncClient,
    event_loop: EventLoop,
    button_rx: Option<mpsc::Receiver<Edge>>,
}

impl Bridge {
    /// Assembles the bridge: resolves topics, seeds the light state from
    /// hardware and prepares the MQTT client (LWT included). No network
    /// traffic happens until [`run`](Self::run).
    ///
    /// `button_rx` delivers edges from the input device reader; pass
    /// `None` when the gateway has no button device.
    ///
    /// # Errors
    ///
    /// Returns an error when the device id cannot be resolved.
    pub fn new(
        config: BridgeConfig,
        registry: Registry,
        button_rx: Option<mpsc::Receiver<Edge>>,
    ) -> Result<Self> {
        let device_id = config.resolve_device_id()?;
        let router = TopicRouter::new(config.resolve_topic_root(&device_id));
        let discovery = DiscoveryPublisher::new(&device_id);

        let initial = registry.light.driver.read_initial().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "cannot read initial light state, assuming off");
            LightState::default()
        });
        let controller = TransitionController::new(
            initial,
            Duration::from_secs_f64(config.light_transition_period),
        );

        let mut options = MqttOptions::new(
            format!("lumibridge_{device_id}"),
            config.mqtt_host.clone(),
            config.mqtt_port,
        );
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(true);
        options.set_last_will(LastWill::new(
            router.status_topic(),
            OFFLINE,
            QoS::AtLeastOnce,
            true,
        ));
        if let (Some(user), Some(password)) = (&config.mqtt_user, &config.mqtt_password) {
            options.set_credentials(user.clone(), password.clone());
        }
        let (client, event_loop) = AsyncClient::new(options, 64);

        tracing::info!(
            device_id,
            root = router.root(),
            host = %config.mqtt_host,
            port = config.mqtt_port,
            "bridge assembled"
        );
        Ok(Self {
            config,
            registry,
            router,
            discovery,
            controller,
            client,
            event_loop,
            button_rx,
        })
    }

    /// The resolved root topic.
    #[must_use]
    pub fn root(&self) -> &str {
        self.router.root()
    }

    /// Runs the event loop until shutdown (ctrl-c).
    ///
    /// # Errors
    ///
    /// Returns an error only for unrecoverable protocol failures; lost
    /// connections are retried forever at `reconnection_interval`.
    #[allow(clippy::too_many_lines)]
    pub async fn run(mut self) -> Result<()> {
        let (dispatcher, mut completion_rx) = CommandDispatcher::new();
        let mut illuminance_filter = DebounceFilter::new(
            self.config.sensor_threshold,
            self.config.debounce_period(),
        );
        let mut binary_filters: Vec<ChangeFilter> = self
            .registry
            .binary_sensors
            .iter()
            .map(|_| ChangeFilter::new())
            .collect();
        let mut tracker = ClickTracker::new();
        let mut settle_deadline: Option<Instant> = None;
        let mut reconnect_at: Option<Instant> = None;

        let mut poll_timer = tokio::time::interval(clamp_period(self.config.poll_period()));
        poll_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut notify_timer =
            tokio::time::interval(clamp_period(self.config.notification_period()));
        notify_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut anim_timer = tokio::time::interval(self.controller.cadence());
        anim_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = self.event_loop.poll(), if reconnect_at.is_none() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        tracing::info!("connected to broker");
                        self.on_connect(&mut illuminance_filter, &mut binary_filters).await;
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        self.on_message(&publish.topic, &publish.payload, &dispatcher).await;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        let err = ProtocolError::ConnectionLost(err.to_string());
                        tracing::error!(error = %err, "will retry");
                        // Backoff as a deadline, not an inline sleep: the
                        // other branches keep running while we wait.
                        reconnect_at =
                            Some(Instant::now() + self.config.reconnection_interval());
                    }
                },

                () = sleep_until_opt(reconnect_at), if reconnect_at.is_some() => {
                    reconnect_at = None;
                    tracing::info!("retrying broker connection");
                }

                _ = poll_timer.tick() => {
                    self.sample_sensors(&mut illuminance_filter, &mut binary_filters).await;
                }

                _ = anim_timer.tick(), if self.controller.is_active() => {
                    if let Some(state) = self.controller.tick(Instant::now()) {
                        self.apply_and_publish_light(state).await;
                    }
                }

                _ = notify_timer.tick() => {
                    self.publish_light_state().await;
                }

                edge = next_edge(&mut self.button_rx) => {
                    match edge {
                        Some(edge) => {
                            if let Some(action) = tracker.on_edge(edge) {
                                self.publish_button_action(action).await;
                            }
                            settle_deadline =
                                tracker.armed().then(|| Instant::now() + SETTLE_TIMEOUT);
                        }
                        None => {
                            let err = ProtocolError::ChannelClosed("button edges".to_string());
                            tracing::warn!(error = %err, "button reader stopped");
                            self.button_rx = None;
                        }
                    }
                }

                () = sleep_until_opt(settle_deadline), if settle_deadline.is_some() => {
                    settle_deadline = None;
                    if let Some(action) = tracker.on_settle() {
                        self.publish_button_action(action).await;
                        if tracker.armed() {
                            settle_deadline = Some(Instant::now() + SETTLE_TIMEOUT);
                        }
                    }
                }

                done = completion_rx.recv() => {
                    if let Some(CommandDone { id }) = done {
                        // Echo OFF so the switch entity resets in the hub.
                        self.publish(&self.router.topic(&id), "OFF", false).await;
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutting down");
                    self.publish(&self.router.status_topic(), OFFLINE, true).await;
                    let _ = self.client.disconnect().await;
                    return Ok(());
                }
            }
        }
    }

    /// Connection (or reconnection) bring-up: availability, command
    /// subscriptions, discovery, and a full state snapshot.
    ///
    /// The filters are reset first so the snapshot publishes every
    /// sensor unconditionally; a hub that just resubscribed must not
    /// wait out the debounce window for its first value.
    async fn on_connect(
        &self,
        illuminance_filter: &mut DebounceFilter,
        binary_filters: &mut [ChangeFilter],
    ) {
        self.publish(&self.router.status_topic(), ONLINE, true).await;

        let filter = self.router.subscription_filter();
        if let Err(err) = self.client.subscribe(&filter, QoS::AtLeastOnce).await {
            tracing::error!(filter, error = %ProtocolError::from(err), "subscribe failed");
        }

        if self.config.auto_discovery {
            for message in self.discovery.documents(&self.registry, &self.router) {
                self.publish(&message.topic, message.payload.to_string(), true)
                    .await;
            }
        }

        self.publish_light_state().await;
        illuminance_filter.reset();
        for filter in binary_filters.iter_mut() {
            filter.reset();
        }
        self.sample_sensors(illuminance_filter, binary_filters).await;
    }

    /// Routes one inbound publish.
    async fn on_message(&mut self, topic: &str, payload: &[u8], dispatcher: &CommandDispatcher) {
        match self.router.route(&self.registry, topic, payload) {
            Route::LightSet(request) => {
                tracing::debug!(?request, "light command");
                if let Some(state) = self.controller.request(&request, Instant::now()) {
                    self.apply_and_publish_light(state).await;
                }
            }
            Route::CommandSet { command, payload } => {
                dispatcher.execute(command, &payload);
            }
            Route::Ignored => {}
        }
    }

    /// One sampling cycle over the illuminance sensor and GPIO lines.
    async fn sample_sensors(
        &self,
        illuminance_filter: &mut DebounceFilter,
        binary_filters: &mut [ChangeFilter],
    ) {
        let retain = self.config.sensor_retain;
        match self.registry.sensor.reader.read() {
            Ok(value) => {
                if let Some(publish) = illuminance_filter.observe(value, Instant::now()) {
                    #[allow(clippy::cast_possible_truncation)]
                    let rounded = publish.round() as i64;
                    self.publish(
                        &self.router.topic(&self.registry.sensor.id),
                        rounded.to_string(),
                        retain,
                    )
                    .await;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "illuminance read failed, skipping cycle");
            }
        }

        for (sensor, filter) in self.registry.binary_sensors.iter().zip(binary_filters) {
            match sensor.gpio.read() {
                Ok(state) => {
                    if let Some(publish) = filter.observe(state) {
                        let payload = if publish { "ON" } else { "OFF" };
                        self.publish(&self.router.topic(&sensor.topic), payload, retain)
                            .await;
                    }
                }
                Err(err) => {
                    tracing::warn!(sensor = %sensor.id, error = %err, "GPIO read failed");
                }
            }
        }
    }

    /// Applies a light state to hardware and echoes it on the bus.
    async fn apply_and_publish_light(&self, state: LightState) {
        if let Err(err) = self.registry.light.driver.apply(&state) {
            tracing::warn!(error = %err, "light write failed");
        }
        self.publish_light(state).await;
    }

    async fn publish_light_state(&self) {
        self.publish_light(self.controller.current()).await;
    }

    async fn publish_light(&self, state: LightState) {
        match serde_json::to_string(&state) {
            Ok(payload) => {
                self.publish(&self.router.topic(&self.registry.light.id), payload, false)
                    .await;
            }
            Err(err) => tracing::error!(error = %err, "cannot serialize light state"),
        }
    }

    /// Publishes a classified gesture: JSON attributes, the plain action
    /// topic for automations, then the empty-action reset.
    async fn publish_button_action(&self, action: ButtonAction) {
        tracing::debug!(%action, "button action");
        let topic = self.router.topic(&self.registry.button.id);
        self.publish(&topic, format!(r#"{{"action": "{action}"}}"#), false)
            .await;
        self.publish(&format!("{topic}/action"), action.as_str(), false)
            .await;
        self.publish(&topic, r#"{"action": ""}"#, false).await;
    }

    /// Publishes at QoS 1, logging failures instead of propagating: a
    /// dropped publish is recovered by the next state change or
    /// heartbeat after reconnect.
    async fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>, retain: bool) {
        let payload: Vec<u8> = payload.into();
        if let Err(err) = self
            .client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await
        {
            tracing::warn!(topic, error = %ProtocolError::from(err), "publish failed");
        }
    }
}

/// Interval periods must be nonzero; a zero configuration means "as fast
/// as the loop turns".
fn clamp_period(period: Duration) -> Duration {
    period.max(Duration::from_millis(10))
}

/// Receives the next button edge; pending forever when there is no
/// button device, so the branch simply never fires.
async fn next_edge(rx: &mut Option<mpsc::Receiver<Edge>>) -> Option<Edge> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Sleeps until the deadline; pending forever when there is none. Only
/// polled when the guard says a deadline exists.
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_periods_are_clamped() {
        assert_eq!(clamp_period(Duration::ZERO), Duration::from_millis(10));
        assert_eq!(clamp_period(Duration::from_secs(1)), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_button_channel_stays_pending() {
        let mut rx: Option<mpsc::Receiver<Edge>> = None;
        let result =
            tokio::time::timeout(Duration::from_millis(50), next_edge(&mut rx)).await;
        assert!(result.is_err(), "no button device must mean no edges, ever");
    }

    #[tokio::test(start_paused = true)]
    async fn optional_sleep_fires_at_deadline() {
        let deadline = Instant::now() + Duration::from_millis(300);
        tokio::time::timeout(
            Duration::from_millis(400),
            sleep_until_opt(Some(deadline)),
        )
        .await
        .expect("should fire before the timeout");
    }
}
