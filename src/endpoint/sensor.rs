//! Observe-and-report role: publishes exterior door transitions.

use super::ShadowRole;
use crate::error::DriverError;
use crate::mqtt::{InboundMessage, Outbox};
use crate::sensors::{ContactPin, DebouncedMonitor};
use crate::shadow::{self, DoorState, ReportedState};
use log::info;

/// Reports the real exterior door state. Never acts on desired state.
pub struct SensorRole<P> {
    attribute: String,
    report_topic: String,
    subscriptions: Vec<String>,
    monitor: DebouncedMonitor<P>,
}

impl<P: ContactPin> SensorRole<P> {
    pub fn new(attribute: impl Into<String>, report_topic: impl Into<String>, pin: P) -> Self {
        Self {
            attribute: attribute.into(),
            report_topic: report_topic.into(),
            subscriptions: Vec::new(),
            monitor: DebouncedMonitor::new(pin),
        }
    }

    /// Also subscribe to `topic`; inbound messages are only logged.
    pub fn with_subscription(mut self, topic: impl Into<String>) -> Self {
        self.subscriptions.push(topic.into());
        self
    }

    pub fn monitor(&self) -> &DebouncedMonitor<P> {
        &self.monitor
    }
}

impl<P: ContactPin> ShadowRole for SensorRole<P> {
    fn name(&self) -> &'static str {
        "sensor"
    }

    fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.clone()
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        let is_open = self.monitor.begin()?;
        info!(
            "[Sensor] Initial {} state: {}",
            self.attribute,
            DoorState::from_open(is_open)
        );
        Ok(())
    }

    fn on_message(&mut self, message: &InboundMessage, _outbox: &mut Outbox) {
        info!(
            "[MQTT] Message on {}: {}",
            message.topic,
            message.payload_lossy()
        );
    }

    fn poll(&mut self, outbox: &mut Outbox) {
        let Some(is_open) = self.monitor.poll() else {
            return;
        };

        let report = ReportedState::new(self.attribute.clone(), DoorState::from_open(is_open));
        info!("[Sensor] {} changed -> {}", report.attribute, report.value);

        let payload = shadow::encode_reported(&report);
        info!("[Shadow] Report ({}): {}", report.attribute, payload);
        outbox.publish(self.report_topic.clone(), payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::monitor::testing::ScriptedPin;
    use crate::shadow::EXTERIOR_DOOR;

    const UPDATE: &str = "$aws/things/door/shadow/update";

    #[test]
    fn test_transitions_become_reports() {
        let pin = ScriptedPin::new(&[false, false, false, true, true, false]);
        let mut role = SensorRole::new(EXTERIOR_DOOR, UPDATE, pin);
        role.begin().unwrap();

        let mut outbox = Outbox::new();
        for _ in 0..5 {
            role.poll(&mut outbox);
        }

        let payloads: Vec<String> = outbox.take().into_iter().map(|r| r.payload).collect();
        assert_eq!(
            payloads,
            vec![
                r#"{"state":{"reported":{"exteriorDoor":"OPEN"}}}"#.to_string(),
                r#"{"state":{"reported":{"exteriorDoor":"CLOSE"}}}"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_inbound_messages_are_ignored() {
        let mut role = SensorRole::new(EXTERIOR_DOOR, UPDATE, ScriptedPin::new(&[false]))
            .with_subscription("sensor/commands");
        assert_eq!(role.subscriptions(), vec!["sensor/commands".to_string()]);

        let mut outbox = Outbox::new();
        role.on_message(
            &InboundMessage::new("sensor/commands", r#"{"state":{"exteriorDoor":"OPEN"}}"#),
            &mut outbox,
        );
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_no_subscriptions_by_default() {
        let role = SensorRole::new(EXTERIOR_DOOR, UPDATE, ScriptedPin::new(&[false]));
        assert!(role.subscriptions().is_empty());
    }
}
