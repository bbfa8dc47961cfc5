//! The cloud-side control application.
//!
//! Watches every device event and status message, maps sensor readings to an
//! alarm level and commands the actuator whenever the level changes.

use rumqttc::QoS;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::alarm::{AlarmLevel, AlarmTracker, Thresholds};
use crate::cloud::{
    actuator_device, sensor_device, AlarmPayload, CloudClient, CloudMessage, DeviceId,
    ReadingPayload, StatusPayload, ANY, CURRENT_STATE_EVENT, NEW_STATE_COMMAND, READING_EVENT,
};
use crate::context::AppContext;
use crate::error::Result;

/// Applies thresholds to sensor readings and commands the actuator.
pub struct ControlApplication<C> {
    cloud: C,
    tracker: AlarmTracker,
    sensor_device: DeviceId,
    actuator_device: DeviceId,
}

impl<C: CloudClient> ControlApplication<C> {
    /// Create the application with the given thresholds.
    pub fn new(cloud: C, thresholds: Thresholds) -> Self {
        Self {
            cloud,
            tracker: AlarmTracker::new(thresholds),
            sensor_device: sensor_device(),
            actuator_device: actuator_device(),
        }
    }

    /// Last known alarm level.
    pub fn current_level(&self) -> AlarmLevel {
        self.tracker.current()
    }

    /// Subscribe to all device events and status.
    pub async fn start(&self) -> Result<()> {
        self.cloud
            .subscribe_device_events(&DeviceId::any(), ANY, QoS::AtMostOnce)
            .await?;
        self.cloud
            .subscribe_device_status(&DeviceId::any(), QoS::AtMostOnce)
            .await?;

        info!(
            "Control application started, thresholds {}/{}",
            self.tracker.thresholds().warning,
            self.tracker.thresholds().critical
        );
        Ok(())
    }

    /// React to an inbound message. Malformed payloads are logged and ignored.
    pub async fn handle_message(&mut self, message: &CloudMessage) {
        match message {
            CloudMessage::Event { device, event, .. } => {
                if device == &self.sensor_device && event == READING_EVENT {
                    match message.json::<ReadingPayload>() {
                        Ok(reading) => self.handle_temperature(reading.temperature).await,
                        Err(e) => warn!("Malformed reading: {}", e),
                    }
                } else if device == &self.actuator_device && event == CURRENT_STATE_EVENT {
                    match message
                        .json::<AlarmPayload>()
                        .and_then(|payload| AlarmLevel::try_from(payload.alarm))
                    {
                        Ok(level) => {
                            info!("Actuator reports {}", level);
                            self.tracker.observe(level);
                        }
                        Err(e) => warn!("Malformed state report: {}", e),
                    }
                } else {
                    debug!("Event {} from {}", event, device);
                }
            }
            CloudMessage::Status { device, .. } => match message.json::<StatusPayload>() {
                Ok(status) => {
                    let action = status.action.as_deref().unwrap_or("?");
                    match status.reason.as_deref() {
                        Some(reason) if action == "Disconnect" => {
                            info!("Status {}: {} ({})", device, action, reason)
                        }
                        _ => info!(
                            "Status {}: {} from {}",
                            device,
                            action,
                            status.client_addr.as_deref().unwrap_or("?")
                        ),
                    }
                }
                Err(e) => warn!("Malformed status from {}: {}", device, e),
            },
            CloudMessage::Command { device, command, .. } => {
                debug!("Command {} for {}", command, device);
            }
        }
    }

    /// Feed a reading and command the actuator if the level changed.
    pub async fn handle_temperature(&mut self, celsius: i32) {
        debug!("Temperature {} C", celsius);

        let Some(level) = self.tracker.update(celsius) else {
            return;
        };

        info!("Temperature {} C, setting alarm {}", celsius, level);

        let payload = match serde_json::to_value(AlarmPayload {
            alarm: level.as_u8(),
        }) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode command: {}", e);
                return;
            }
        };

        if let Err(e) = self
            .cloud
            .publish_command(
                &self.actuator_device,
                NEW_STATE_COMMAND,
                &payload,
                QoS::AtLeastOnce,
            )
            .await
        {
            warn!("Failed to send {} command: {}", NEW_STATE_COMMAND, e);
        }
    }

    /// Run until shutdown is requested or the cloud connection goes away.
    pub async fn run(
        mut self,
        context: &AppContext,
        mut inbound: mpsc::Receiver<CloudMessage>,
    ) -> Result<()> {
        let mut shutdown = context.shutdown_signal();
        self.start().await?;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Control application stopping");
                    break;
                }
                message = inbound.recv() => match message {
                    Some(message) => self.handle_message(&message).await,
                    None => {
                        error!("Cloud connection closed");
                        break;
                    }
                },
            }
        }

        self.cloud.disconnect().await
    }
}
