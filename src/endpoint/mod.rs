//! Shadow-synchronized endpoint.
//!
//! Both door endpoints are the same tick loop parameterized by a
//! [`ShadowRole`]: the actuator consumes requests and acts, the sensor
//! observes and reports.

pub mod actuator;
pub mod sensor;

pub use actuator::ActuatorRole;
pub use sensor::SensorRole;

use crate::clock::Clock;
use crate::error::{ChannelError, DriverError};
use crate::link::Link;
use crate::mqtt::{InboundMessage, MessageChannel, Outbox};
use crate::supervisor::{ConnectionSupervisor, Connectivity};
use log::{info, warn};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Direction-specific behavior of an endpoint.
pub trait ShadowRole {
    fn name(&self) -> &'static str;

    /// Topics to subscribe to on every new session.
    fn subscriptions(&self) -> Vec<String>;

    /// Hardware setup before the first tick.
    fn begin(&mut self) -> Result<(), DriverError>;

    /// Inbound hook, run synchronously from inside the channel pump.
    fn on_message(&mut self, message: &InboundMessage, outbox: &mut Outbox);

    /// Per-tick work once messages are processed.
    fn poll(&mut self, _outbox: &mut Outbox) {}
}

/// One endpoint process: role, channel and connectivity supervision.
pub struct Endpoint<R, C, L, K> {
    role: R,
    channel: C,
    supervisor: ConnectionSupervisor<L, K>,
    subscriptions: Vec<String>,
    outbox: Outbox,
    tick_interval: Duration,
}

impl<R, C, L, K> Endpoint<R, C, L, K>
where
    R: ShadowRole,
    C: MessageChannel,
    L: Link,
    K: Clock,
{
    pub fn new(
        role: R,
        channel: C,
        supervisor: ConnectionSupervisor<L, K>,
        tick_interval: Duration,
    ) -> Self {
        let subscriptions = role.subscriptions();
        Self {
            role,
            channel,
            supervisor,
            subscriptions,
            outbox: Outbox::new(),
            tick_interval,
        }
    }

    pub fn role(&self) -> &R {
        &self.role
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Initialize the role's hardware.
    pub fn begin(&mut self) -> Result<(), DriverError> {
        info!("[Endpoint] Starting {} endpoint", self.role.name());
        self.role.begin()
    }

    /// One supervised tick: connectivity, inbound messages, then role polling.
    pub async fn tick(&mut self) -> Connectivity {
        let connectivity = self
            .supervisor
            .ensure_connected(&mut self.channel, &self.subscriptions)
            .await;
        if !connectivity.is_usable() {
            return connectivity;
        }

        let role = &mut self.role;
        let outbox = &mut self.outbox;
        let pumped = self
            .channel
            .pump(|message| role.on_message(&message, outbox))
            .await;

        // Reports produced before a drop still go through the
        // disconnected-publish path so the failure is surfaced.
        self.flush().await;

        if let Err(e) = pumped {
            warn!("[MQTT] Session lost while processing messages: {}", e);
            return Connectivity::SessionDown;
        }

        self.role.poll(&mut self.outbox);
        self.flush().await;

        connectivity
    }

    /// Tick forever at the configured interval.
    pub async fn run(&mut self) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "[Endpoint] {} endpoint running (tick {:?})",
            self.role.name(),
            self.tick_interval
        );

        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    async fn flush(&mut self) {
        for request in self.outbox.take() {
            match self.channel.publish(&request.topic, &request.payload).await {
                Ok(()) => {}
                Err(ChannelError::NotConnected) => {
                    warn!(
                        "[MQTT] Not connected, dropping publish to {}; reconnecting",
                        request.topic
                    );
                    self.channel.mark_disconnected();
                }
                Err(e) => warn!("[MQTT] Publish to {} failed: {}", request.topic, e),
            }
        }
    }
}
