//! Consume-and-act role: reconciles shadow requests onto the servo.

use super::ShadowRole;
use crate::device::Actuator;
use crate::error::DriverError;
use crate::mqtt::{InboundMessage, Outbox};
use crate::shadow::{self, DoorState, ReportedState, Resolution, ShadowUpdate};
use log::{debug, error, info, warn};

/// Drives the interior door from delta/desired documents and echoes every
/// recognized request back as `reported`.
pub struct ActuatorRole<A> {
    attribute: String,
    delta_topic: String,
    report_topic: String,
    actuator: A,
}

impl<A: Actuator> ActuatorRole<A> {
    pub fn new(
        attribute: impl Into<String>,
        delta_topic: impl Into<String>,
        report_topic: impl Into<String>,
        actuator: A,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            delta_topic: delta_topic.into(),
            report_topic: report_topic.into(),
            actuator,
        }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    fn reconcile(&mut self, update: ShadowUpdate, outbox: &mut Outbox) {
        info!(
            "[Shadow] {} = {} (from {})",
            update.attribute, update.requested, update.source
        );

        // The report mirrors the request even when the move failed
        if let Err(e) = self.actuator.move_to(update.requested) {
            error!("[Servo] Failed to move to {}: {}", update.requested, e);
        }

        let report = ReportedState::new(update.attribute, update.requested);
        let payload = shadow::encode_reported(&report);
        info!("[Shadow] Report ({}): {}", report.attribute, payload);
        outbox.publish(self.report_topic.clone(), payload);
    }
}

impl<A: Actuator> ShadowRole for ActuatorRole<A> {
    fn name(&self) -> &'static str {
        "actuator"
    }

    fn subscriptions(&self) -> Vec<String> {
        vec![self.delta_topic.clone()]
    }

    /// Park the servo in the closed position. Nothing is reported.
    fn begin(&mut self) -> Result<(), DriverError> {
        self.actuator.move_to(DoorState::Close)
    }

    fn on_message(&mut self, message: &InboundMessage, outbox: &mut Outbox) {
        info!(
            "[MQTT] Message on {}: {}",
            message.topic,
            message.payload_lossy()
        );

        match shadow::decode_update(&self.attribute, &message.payload) {
            Err(e) => warn!("[Shadow] Ignoring message on {}: {}", message.topic, e),
            Ok(Resolution::Missing) => debug!("[Shadow] No {} in message", self.attribute),
            Ok(Resolution::Unrecognized { source, value }) => warn!(
                "[Shadow] Rejecting {} value '{}' from {}: expected OPEN or CLOSE",
                self.attribute, value, source
            ),
            Ok(Resolution::Update(update)) => self.reconcile(update, outbox),
        }
    }
}
