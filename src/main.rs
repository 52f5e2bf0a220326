//! Door endpoint process.
//!
//! Usage:
//!   door-endpoint actuator
//!   door-endpoint sensor
//!
//! Drivers are simulated unless `SERVO_PWM_PATH` / `SENSOR_GPIO_PATH` are set.

use clap::{Parser, Subcommand};
use door_shadow_sync::clock::TokioClock;
use door_shadow_sync::config::{self, Config, Role};
use door_shadow_sync::device::{Actuator, PwmServo, ServoCalibration};
use door_shadow_sync::endpoint::{ActuatorRole, Endpoint, SensorRole, ShadowRole};
use door_shadow_sync::error::Result;
use door_shadow_sync::instance_lock::InstanceLock;
use door_shadow_sync::link::InterfaceLink;
use door_shadow_sync::mqtt::MqttChannel;
use door_shadow_sync::sensors::{ContactPin, SysfsContact};
use door_shadow_sync::shadow::{EXTERIOR_DOOR, INTERIOR_DOOR};
use door_shadow_sync::simulation::{SimulatedContact, SimulatedServo};
use door_shadow_sync::supervisor::{ConnectionSupervisor, RetryPolicy};
use log::{error, info, warn};
use std::process::ExitCode;
use tokio::signal;

#[derive(Parser)]
#[command(name = "door-endpoint")]
#[command(about = "Door endpoint synchronized with a device shadow over MQTT")]
struct Cli {
    /// Override the MQTT client id
    #[arg(long, env = "MQTT_CLIENT_ID")]
    client_id: Option<String>,

    /// Use simulated drivers even when hardware paths are configured
    #[arg(long, env = "DOOR_SIMULATE")]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the interior door servo from shadow requests
    Actuator,
    /// Report the exterior door contact to the shadow
    Sensor,
}

impl Commands {
    fn role(&self) -> Role {
        match self {
            Commands::Actuator => Role::Actuator,
            Commands::Sensor => Role::Sensor,
        }
    }
}

type Supervisor = ConnectionSupervisor<InterfaceLink, TokioClock>;

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file before anything else
    config::load_dotenv();
    init_logger();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let role = cli.command.role();
    let mut config = Config::from_env(role);
    if let Some(client_id) = cli.client_id {
        config.mqtt.client_id = client_id;
    }
    if cli.simulate {
        config.servo.pwm_path = None;
        config.sensor.gpio_path = None;
    }

    info!("Configuration loaded:");
    info!(
        "  Broker: {}:{}",
        config.mqtt.broker_host, config.mqtt.broker_port
    );
    info!("  Client ID: {}", config.mqtt.client_id);
    info!(
        "  TLS: {}",
        if config.mqtt.ca_path.is_some() { "enabled" } else { "disabled" }
    );
    info!("  Update topic: {}", config.shadow.update_topic);

    let _lock = InstanceLock::acquire(&config.mqtt.client_id)?;

    let channel = MqttChannel::new(&config.mqtt)?;
    let supervisor = ConnectionSupervisor::new(
        InterfaceLink::new(config.link.interface.clone()),
        TokioClock,
        RetryPolicy::from(&config.link),
    );

    match role {
        Role::Actuator => match &config.servo.pwm_path {
            Some(path) => {
                let servo = PwmServo::open(path, ServoCalibration::from(&config.servo))?;
                serve(actuator_role(servo, &config), channel, supervisor, &config).await
            }
            None => {
                warn!("[Servo] SERVO_PWM_PATH not set, using simulated servo");
                let role = actuator_role(SimulatedServo::new(), &config);
                serve(role, channel, supervisor, &config).await
            }
        },
        Role::Sensor => match &config.sensor.gpio_path {
            Some(path) => {
                let pin = SysfsContact::new(path, config.sensor.active_low);
                serve(sensor_role(pin, &config), channel, supervisor, &config).await
            }
            None => {
                warn!("[Sensor] SENSOR_GPIO_PATH not set, using simulated contact");
                let pin = SimulatedContact::new(config.sensor.simulation_period);
                serve(sensor_role(pin, &config), channel, supervisor, &config).await
            }
        },
    }
}

fn actuator_role<A: Actuator>(servo: A, config: &Config) -> ActuatorRole<A> {
    ActuatorRole::new(
        INTERIOR_DOOR,
        &config.shadow.delta_topic,
        &config.shadow.update_topic,
        servo,
    )
}

fn sensor_role<P: ContactPin>(pin: P, config: &Config) -> SensorRole<P> {
    let role = SensorRole::new(EXTERIOR_DOOR, &config.shadow.update_topic, pin);
    match &config.shadow.sensor_subscribe_topic {
        Some(topic) => role.with_subscription(topic),
        None => role,
    }
}

async fn serve<R: ShadowRole>(
    role: R,
    channel: MqttChannel,
    supervisor: Supervisor,
    config: &Config,
) -> Result<()> {
    let mut endpoint = Endpoint::new(role, channel, supervisor, config.tick_interval);
    endpoint.begin()?;

    info!("Door endpoint is running");
    info!("  - Press Ctrl+C to exit");

    tokio::select! {
        _ = endpoint.run() => {}
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        },
    }

    info!("Door endpoint stopped");
    Ok(())
}
