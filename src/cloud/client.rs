//! MQTT connection to the IoT platform.

use async_trait::async_trait;
use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, Transport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::cloud::message::CloudMessage;
use crate::cloud::topic::{DeviceId, Topic, ANY};
use crate::config::{ClientIdentity, CloudOptions};
use crate::error::{Error, Result};

/// Payload format used for every publish.
pub const JSON_FORMAT: &str = "json";

const REQUEST_CAPACITY: usize = 32;
const INBOUND_CAPACITY: usize = 64;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Publish and subscribe operations on the platform.
///
/// Inbound messages are not returned from here; they arrive on the receiver
/// handed out when the connection was made.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Publish an event on behalf of `device`.
    async fn publish_device_event(
        &self,
        device: &DeviceId,
        event: &str,
        payload: &serde_json::Value,
        qos: QoS,
    ) -> Result<()>;

    /// Send a command to `device`.
    async fn publish_command(
        &self,
        device: &DeviceId,
        command: &str,
        payload: &serde_json::Value,
        qos: QoS,
    ) -> Result<()>;

    /// Receive events from `device` (wildcards allowed).
    async fn subscribe_device_events(&self, device: &DeviceId, event: &str, qos: QoS)
        -> Result<()>;

    /// Receive connection status of `device` (wildcards allowed).
    async fn subscribe_device_status(&self, device: &DeviceId, qos: QoS) -> Result<()>;

    /// Receive commands addressed to `device`.
    async fn subscribe_device_commands(
        &self,
        device: &DeviceId,
        command: &str,
        qos: QoS,
    ) -> Result<()>;

    /// Close the connection.
    async fn disconnect(&self) -> Result<()>;
}

/// Subscriptions to restore after a reconnect that lost the session.
#[derive(Debug, Default)]
struct SubscriptionRegistry {
    entries: Mutex<Vec<(String, QoS)>>,
}

impl SubscriptionRegistry {
    fn add(&self, topic: &str, qos: QoS) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.iter_mut().find(|(t, _)| t == topic) {
            entry.1 = qos;
        } else {
            entries.push((topic.to_string(), qos));
        }
    }

    fn snapshot(&self) -> Vec<(String, QoS)> {
        self.entries.lock().clone()
    }
}

/// [`CloudClient`] over rumqttc.
///
/// Requests are queued without waiting. While the broker is unreachable the
/// queue is not drained, so once it is full publishes fail with
/// [`Error::Mqtt`] instead of stalling the caller.
pub struct MqttCloudClient {
    client: AsyncClient,
    subscriptions: Arc<SubscriptionRegistry>,
    closing: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MqttCloudClient {
    /// Connect and wait for the broker to accept the session.
    ///
    /// Returns the client and the receiver inbound messages are delivered to.
    /// The connection is kept alive by a background task which reconnects on
    /// failure until [`CloudClient::disconnect`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are incomplete, the broker refuses the
    /// connection or it is not acknowledged within 30 seconds.
    pub async fn connect(
        options: &CloudOptions,
        identity: ClientIdentity,
    ) -> Result<(Self, mpsc::Receiver<CloudMessage>)> {
        options.validate(identity)?;

        let client_id = options.client_id(identity);
        let mut mqtt = MqttOptions::new(client_id.clone(), options.host(), options.port());
        mqtt.set_keep_alive(options.keep_alive());
        mqtt.set_clean_session(options.clean_session);
        if let Some((user, token)) = options.credentials(identity) {
            mqtt.set_credentials(user, token);
        }
        if options.use_tls() {
            mqtt.set_transport(Transport::tls_with_default_config());
        }

        info!(
            "Connecting to {}:{} as {}",
            options.host(),
            options.port(),
            client_id
        );

        let (client, mut eventloop) = AsyncClient::new(mqtt, REQUEST_CAPACITY);

        tokio::time::timeout(CONNECT_TIMEOUT, async {
            loop {
                if let Event::Incoming(Packet::ConnAck(ack)) = eventloop.poll().await? {
                    debug!("ConnAck: {:?}", ack.code);
                    return Ok::<_, Error>(());
                }
            }
        })
        .await
        .map_err(|_| Error::Timeout)??;

        info!("Connected to the cloud");
        Ok(Self::spawn(client, eventloop))
    }

    /// Hand `eventloop` to a background task.
    fn spawn(client: AsyncClient, eventloop: EventLoop) -> (Self, mpsc::Receiver<CloudMessage>) {
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let subscriptions = Arc::new(SubscriptionRegistry::default());
        let closing = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(drive(
            eventloop,
            client.clone(),
            Arc::clone(&subscriptions),
            Arc::clone(&closing),
            tx,
        ));

        (
            Self {
                client,
                subscriptions,
                closing,
                task: Mutex::new(Some(task)),
            },
            rx,
        )
    }

    async fn publish(&self, topic: Topic, payload: &serde_json::Value, qos: QoS) -> Result<()> {
        let bytes = serde_json::to_vec(payload)?;
        let topic = topic.to_string();
        trace!("Publishing {} to {}", payload, topic);
        self.client.try_publish(topic, qos, false, bytes)?;
        Ok(())
    }

    async fn subscribe(&self, topic: Topic, qos: QoS) -> Result<()> {
        let topic = topic.to_string();
        debug!("Subscribing to {} ({:?})", topic, qos);
        self.client.try_subscribe(topic.as_str(), qos)?;
        self.subscriptions.add(&topic, qos);
        Ok(())
    }
}

#[async_trait]
impl CloudClient for MqttCloudClient {
    async fn publish_device_event(
        &self,
        device: &DeviceId,
        event: &str,
        payload: &serde_json::Value,
        qos: QoS,
    ) -> Result<()> {
        self.publish(Topic::event(device.clone(), event, JSON_FORMAT), payload, qos)
            .await
    }

    async fn publish_command(
        &self,
        device: &DeviceId,
        command: &str,
        payload: &serde_json::Value,
        qos: QoS,
    ) -> Result<()> {
        self.publish(Topic::command(device.clone(), command, JSON_FORMAT), payload, qos)
            .await
    }

    async fn subscribe_device_events(
        &self,
        device: &DeviceId,
        event: &str,
        qos: QoS,
    ) -> Result<()> {
        self.subscribe(Topic::event(device.clone(), event, ANY), qos)
            .await
    }

    async fn subscribe_device_status(&self, device: &DeviceId, qos: QoS) -> Result<()> {
        self.subscribe(Topic::status(device.clone()), qos).await
    }

    async fn subscribe_device_commands(
        &self,
        device: &DeviceId,
        command: &str,
        qos: QoS,
    ) -> Result<()> {
        self.subscribe(Topic::command(device.clone(), command, ANY), qos)
            .await
    }

    async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from the cloud");
        self.closing.store(true, Ordering::SeqCst);
        if let Err(e) = self.client.try_disconnect() {
            warn!("Disconnect request not queued: {}", e);
        }

        let task = self.task.lock().take();
        if let Some(mut task) = task {
            match tokio::time::timeout(DISCONNECT_TIMEOUT, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Cloud event loop ended abnormally: {}", e),
                Err(_) => {
                    warn!("Cloud event loop did not stop, aborting it");
                    task.abort();
                }
            }
        }
        Ok(())
    }
}

impl Drop for MqttCloudClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

/// Poll the connection, route inbound publishes and log acknowledgements.
async fn drive(
    mut eventloop: EventLoop,
    client: AsyncClient,
    subscriptions: Arc<SubscriptionRegistry>,
    closing: Arc<AtomicBool>,
    inbound: mpsc::Sender<CloudMessage>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match CloudMessage::from_publish(&publish.topic, publish.payload) {
                    Ok(message) => {
                        if inbound.send(message).await.is_err() {
                            debug!("Inbound receiver dropped, stopping event loop");
                            break;
                        }
                    }
                    Err(e) => warn!("Ignoring publish: {}", e),
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                info!(
                    "Subscription {} acknowledged: {:?}",
                    ack.pkid, ack.return_codes
                );
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => {
                debug!("Publish {} acknowledged", ack.pkid);
            }
            Ok(Event::Incoming(Packet::PubComp(ack))) => {
                debug!("Publish {} completed", ack.pkid);
            }
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!("Reconnected to the cloud");
                if !ack.session_present {
                    for (topic, qos) in subscriptions.snapshot() {
                        if let Err(e) = client.try_subscribe(topic.as_str(), qos) {
                            warn!("Failed to restore subscription {}: {}", topic, e);
                        }
                    }
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("Disconnect sent, stopping event loop");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if closing.load(Ordering::SeqCst) {
                    debug!("Connection lost while closing, stopping event loop");
                    break;
                }
                warn!("Cloud connection error: {}", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
