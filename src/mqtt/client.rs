//! rumqttc-backed messaging channel.

use super::{InboundMessage, MessageChannel};
use crate::config::MqttConfig;
use crate::error::{ChannelError, EndpointError};
use log::{debug, info, trace, warn};
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS, TlsConfiguration,
    Transport,
};
use std::time::Duration;

/// Capacity of the rumqttc request queue between client and event loop.
const REQUEST_CAPACITY: usize = 64;

/// Upper bound on events handled by one `pump` call.
const MAX_EVENTS_PER_PUMP: usize = 32;

/// MQTT session to the shadow service.
///
/// The event loop is driven only from `connect` and `pump`, so all network
/// activity happens on the caller's tick. Requests are queued with the
/// non-blocking `try_*` calls and flushed by the next poll.
pub struct MqttChannel {
    options: MqttOptions,
    client: AsyncClient,
    event_loop: EventLoop,
    connected: bool,
    connect_timeout: Duration,
    pump_window: Duration,
}

impl MqttChannel {
    /// Create a channel from configuration. Reads TLS material from disk.
    pub fn new(config: &MqttConfig) -> Result<Self, EndpointError> {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(config.keep_alive);
        // A fresh session never inherits subscriptions; the supervisor resubscribes.
        options.set_clean_session(true);

        // Set credentials if provided
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        if let Some(ca_path) = &config.ca_path {
            let ca = read_pem(ca_path)?;
            let client_auth = match (&config.cert_path, &config.key_path) {
                (Some(cert), Some(key)) => Some((read_pem(cert)?, read_pem(key)?)),
                (None, None) => None,
                _ => {
                    return Err(EndpointError::InvalidConfig(
                        "MQTT_CERT_PATH and MQTT_KEY_PATH must be set together".to_string(),
                    ));
                }
            };
            options.set_transport(Transport::tls_with_config(TlsConfiguration::Simple {
                ca,
                alpn: None,
                client_auth,
            }));
            info!(
                "[MQTT] TLS enabled for {}:{}",
                config.broker_host, config.broker_port
            );
        }

        let (client, event_loop) = AsyncClient::new(options.clone(), REQUEST_CAPACITY);

        Ok(Self {
            options,
            client,
            event_loop,
            connected: false,
            connect_timeout: config.connect_timeout,
            pump_window: config.pump_window,
        })
    }

    async fn await_connack(event_loop: &mut EventLoop) -> Result<(), ChannelError> {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    return if ack.code == ConnectReturnCode::Success {
                        Ok(())
                    } else {
                        Err(ChannelError::Refused(format!("{:?}", ack.code)))
                    };
                }
                Ok(event) => trace!("[MQTT] Event while connecting: {:?}", event),
                Err(e) => return Err(ChannelError::Connection(e.to_string())),
            }
        }
    }

    fn request_error(operation: &'static str, topic: &str, e: rumqttc::ClientError) -> ChannelError {
        ChannelError::Request {
            operation,
            topic: topic.to_string(),
            reason: e.to_string(),
        }
    }
}

fn read_pem(path: &str) -> Result<Vec<u8>, EndpointError> {
    std::fs::read(path).map_err(|source| EndpointError::TlsMaterial {
        path: path.to_string(),
        source,
    })
}

impl MessageChannel for MqttChannel {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn mark_disconnected(&mut self) {
        if self.connected {
            info!("[MQTT] Dropping session");
        }
        self.connected = false;
        // Replace the event loop so the next connect opens a new network
        // connection instead of waiting on a half-dead one.
        let (client, event_loop) = AsyncClient::new(self.options.clone(), REQUEST_CAPACITY);
        self.client = client;
        self.event_loop = event_loop;
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        if self.connected {
            return Ok(());
        }

        info!(
            "[MQTT] Attempting connection to {}:{} as {}",
            self.options.broker_address().0,
            self.options.broker_address().1,
            self.options.client_id()
        );

        let timeout = self.connect_timeout;
        match tokio::time::timeout(timeout, Self::await_connack(&mut self.event_loop)).await {
            Ok(Ok(())) => {
                self.connected = true;
                info!("[MQTT] Connected");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ChannelError::ConnectTimeout),
        }
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        if !self.connected {
            return Err(ChannelError::NotConnected);
        }
        info!("[MQTT] Subscribing to {}", topic);
        self.client
            .try_subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| Self::request_error("subscribe", topic, e))
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), ChannelError> {
        if !self.connected {
            return Err(ChannelError::NotConnected);
        }
        debug!("[MQTT] Publishing to {}: {}", topic, payload);
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .map_err(|e| Self::request_error("publish", topic, e))
    }

    async fn pump<F>(&mut self, mut hook: F) -> Result<(), ChannelError>
    where
        F: FnMut(InboundMessage),
    {
        if !self.connected {
            return Err(ChannelError::NotConnected);
        }

        for _ in 0..MAX_EVENTS_PER_PUMP {
            let event = match tokio::time::timeout(self.pump_window, self.event_loop.poll()).await
            {
                // Nothing more arrived within the window
                Err(_) => break,
                Ok(Ok(event)) => event,
                Ok(Err(e)) => {
                    warn!("[MQTT] Connection error: {}", e);
                    self.connected = false;
                    return Err(ChannelError::Connection(e.to_string()));
                }
            };

            match event {
                Event::Incoming(Packet::Publish(publish)) => {
                    debug!(
                        "[MQTT] Received {} bytes on {}",
                        publish.payload.len(),
                        publish.topic
                    );
                    hook(InboundMessage::new(publish.topic, publish.payload.to_vec()));
                }
                Event::Incoming(Packet::Disconnect) => {
                    warn!("[MQTT] Broker closed the session");
                    self.connected = false;
                    return Err(ChannelError::Connection(
                        "broker sent DISCONNECT".to_string(),
                    ));
                }
                other => trace!("[MQTT] Event: {:?}", other),
            }
        }

        Ok(())
    }
}
