use std::fs;
use std::path::Path;
use std::time::Duration;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: We're single-threaded at this point (called before any async runtime)
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Split `.env` content into key/value pairs, skipping blanks and comments.
fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Find the first '=' and split there
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            // Remove surrounding quotes if present
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            pairs.push((key, value));
        }
    }

    pairs
}

/// Which side of the door pair this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Actuator,
    Sensor,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub shadow: ShadowConfig,
    pub link: LinkConfig,
    pub servo: ServoConfig,
    pub sensor: SensorConfig,
    /// Period of the endpoint tick loop.
    pub tick_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    /// PEM root CA. TLS is enabled when this is set.
    pub ca_path: Option<String>,
    /// PEM client certificate and private key for mutual TLS.
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// How long a single session connect attempt may wait for CONNACK.
    pub connect_timeout: Duration,
    /// Idle time after which a pump call returns.
    pub pump_window: Duration,
}

#[derive(Debug, Clone)]
pub struct ShadowConfig {
    /// Topic receiving reported (and, from door-ctl, desired) documents.
    pub update_topic: String,
    /// Topic the actuator subscribes to for delta/desired requests.
    pub delta_topic: String,
    /// Topic used to request the full shadow document.
    pub get_topic: String,
    /// Optional extra subscription for the sensor endpoint (inbound is only logged).
    pub sensor_subscribe_topic: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Interface to watch; any non-loopback interface when unset.
    pub interface: Option<String>,
    pub retry_interval: Duration,
    /// Give up after this many failed link attempts per tick; retry forever when unset.
    pub max_attempts: Option<u32>,
    /// Pause after a failed session connect.
    pub session_retry_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct ServoConfig {
    /// sysfs PWM channel directory (e.g. /sys/class/pwm/pwmchip0/pwm0). Simulated when unset.
    pub pwm_path: Option<String>,
    pub period_hz: u32,
    pub min_pulse_us: u32,
    pub max_pulse_us: u32,
    pub open_angle: u16,
    pub closed_angle: u16,
}

#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// sysfs GPIO value file (e.g. /sys/class/gpio/gpio4/value). Simulated when unset.
    pub gpio_path: Option<String>,
    /// Reed switch wired with a pull-up: a LOW level means the door is open.
    pub active_low: bool,
    /// Toggle period of the simulated contact.
    pub simulation_period: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig {
                broker_host: "localhost".to_string(),
                broker_port: 8883,
                client_id: "door-endpoint".to_string(),
                keep_alive: Duration::from_secs(30),
                ca_path: None,
                cert_path: None,
                key_path: None,
                username: None,
                password: None,
                connect_timeout: Duration::from_secs(10),
                pump_window: Duration::from_millis(20),
            },
            shadow: ShadowConfig {
                update_topic: "$aws/things/door/shadow/update".to_string(),
                delta_topic: "$aws/things/door/shadow/update/delta".to_string(),
                get_topic: "$aws/things/door/shadow/get".to_string(),
                sensor_subscribe_topic: None,
            },
            link: LinkConfig {
                interface: None,
                retry_interval: Duration::from_secs(1),
                max_attempts: None,
                session_retry_delay: Duration::from_secs(5),
            },
            servo: ServoConfig {
                pwm_path: None,
                period_hz: 50,
                min_pulse_us: 500,
                max_pulse_us: 2500,
                open_angle: 30,
                closed_angle: 120,
            },
            sensor: SensorConfig {
                gpio_path: None,
                active_low: true,
                simulation_period: Duration::from_secs(30),
            },
            tick_interval: Duration::from_millis(50),
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}

impl Config {
    /// Defaults for `role`, overlaid with environment variables.
    pub fn from_env(role: Role) -> Self {
        let mut config = Self::default();

        config.mqtt.client_id = match role {
            Role::Actuator => "door-actuator".to_string(),
            Role::Sensor => "door-sensor".to_string(),
        };

        // MQTT configuration
        if let Ok(host) = std::env::var("MQTT_BROKER_HOST") {
            config.mqtt.broker_host = host;
        }
        if let Ok(port) = std::env::var("MQTT_BROKER_PORT")
            && let Ok(p) = port.parse()
        {
            config.mqtt.broker_port = p;
        }
        if let Ok(client_id) = std::env::var("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Ok(secs) = std::env::var("MQTT_KEEP_ALIVE_SECS")
            && let Ok(s) = secs.parse()
        {
            config.mqtt.keep_alive = Duration::from_secs(s);
        }
        if let Ok(path) = std::env::var("MQTT_CA_PATH") {
            config.mqtt.ca_path = Some(path);
        }
        if let Ok(path) = std::env::var("MQTT_CERT_PATH") {
            config.mqtt.cert_path = Some(path);
        }
        if let Ok(path) = std::env::var("MQTT_KEY_PATH") {
            config.mqtt.key_path = Some(path);
        }
        if let Ok(username) = std::env::var("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Ok(password) = std::env::var("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }

        // Shadow topics
        if let Ok(topic) = std::env::var("SHADOW_UPDATE_TOPIC") {
            config.shadow.update_topic = topic;
        }
        if let Ok(topic) = std::env::var("SHADOW_DELTA_TOPIC") {
            config.shadow.delta_topic = topic;
        }
        if let Ok(topic) = std::env::var("SHADOW_GET_TOPIC") {
            config.shadow.get_topic = topic;
        }
        if let Ok(topic) = std::env::var("SENSOR_SUBSCRIBE_TOPIC") {
            config.shadow.sensor_subscribe_topic = Some(topic);
        }

        // Connectivity
        if let Ok(interface) = std::env::var("LINK_INTERFACE") {
            config.link.interface = Some(interface);
        }
        if let Some(d) = env_millis("LINK_RETRY_MS") {
            config.link.retry_interval = d;
        }
        if let Some(d) = env_millis("SESSION_RETRY_MS") {
            config.link.session_retry_delay = d;
        }
        if let Some(d) = env_millis("TICK_INTERVAL_MS") {
            config.tick_interval = d;
        }

        // Drivers
        if let Ok(path) = std::env::var("SERVO_PWM_PATH") {
            config.servo.pwm_path = Some(path);
        }
        if let Ok(path) = std::env::var("SENSOR_GPIO_PATH") {
            config.sensor.gpio_path = Some(path);
        }
        if let Ok(active_low) = std::env::var("SENSOR_ACTIVE_LOW")
            && let Ok(v) = active_low.parse()
        {
            config.sensor.active_low = v;
        }

        config
    }
}
