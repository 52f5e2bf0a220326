//! Remote control for the door shadow.
//!
//! Usage:
//!   door-ctl open
//!   door-ctl close
//!   door-ctl status [--attribute exteriorDoor]
//!
//! `open`/`close` write the desired interior door state; the actuator
//! endpoint picks the resulting delta up. `status` reads the full shadow.

use clap::{Parser, Subcommand};
use door_shadow_sync::config::{self, Config, Role};
use door_shadow_sync::error::Result;
use door_shadow_sync::mqtt::{InboundMessage, MessageChannel, MqttChannel};
use door_shadow_sync::shadow::{self, DoorState, INTERIOR_DOOR};
use log::{debug, error, info, warn};
use std::process::ExitCode;
use std::time::Duration;
use tokio::time::Instant;

/// Time given to the event loop to flush a queued desired update.
const FLUSH_WINDOW: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "door-ctl")]
#[command(about = "Request door state changes and read the door shadow")]
struct Cli {
    /// Seconds to wait for the broker and for the shadow response
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the actuator to open the interior door
    Open,
    /// Ask the actuator to close the interior door
    Close,
    /// Print the current state of a door attribute
    Status {
        /// Shadow attribute to read
        #[arg(long, default_value = INTERIOR_DOOR)]
        attribute: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

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
    let timeout = Duration::from_secs(cli.timeout);

    let mut config = Config::from_env(Role::Actuator);
    // Never collide with a running endpoint's session
    config.mqtt.client_id = format!("door-ctl-{}", uuid::Uuid::new_v4().simple());
    config.mqtt.connect_timeout = timeout;

    let mut channel = MqttChannel::new(&config.mqtt)?;
    channel.connect().await?;

    match cli.command {
        Commands::Open => request(&mut channel, &config, DoorState::Open).await,
        Commands::Close => request(&mut channel, &config, DoorState::Close).await,
        Commands::Status { attribute } => {
            status(&mut channel, &config, &attribute, timeout).await
        }
    }
}

async fn request(channel: &mut MqttChannel, config: &Config, state: DoorState) -> Result<()> {
    let payload = shadow::encode_desired(INTERIOR_DOOR, state);
    channel
        .publish(&config.shadow.update_topic, &payload)
        .await?;
    drain(channel, FLUSH_WINDOW, |_| {}).await?;

    info!("Requested {} = {}", INTERIOR_DOOR, state);
    println!("{} requested: {}", INTERIOR_DOOR, state);
    Ok(())
}

async fn status(
    channel: &mut MqttChannel,
    config: &Config,
    attribute: &str,
    timeout: Duration,
) -> Result<()> {
    let accepted = format!("{}/accepted", config.shadow.get_topic);
    let rejected = format!("{}/rejected", config.shadow.get_topic);
    channel.subscribe(&accepted).await?;
    channel.subscribe(&rejected).await?;
    // Let the subscriptions reach the broker before asking
    drain(channel, FLUSH_WINDOW, |_| {}).await?;

    channel.publish(&config.shadow.get_topic, "{}").await?;

    let mut response: Option<InboundMessage> = None;
    let deadline = Instant::now() + timeout;
    while response.is_none() && Instant::now() < deadline {
        channel
            .pump(|message| {
                if message.topic == accepted || message.topic == rejected {
                    response = Some(message);
                } else {
                    debug!("Ignoring message on {}", message.topic);
                }
            })
            .await?;
    }

    let Some(message) = response else {
        warn!("No shadow response within {:?}", timeout);
        println!("{}: unknown", attribute);
        return Ok(());
    };

    if message.topic == rejected {
        // The shadow does not exist yet
        warn!("Shadow get rejected: {}", message.payload_lossy());
        println!("{}: unknown", attribute);
        return Ok(());
    }

    let status = shadow::decode_status(attribute, &message.payload)?;
    match status.door_state() {
        Some(state) => println!("{}: {}", attribute, state),
        None => match status.effective() {
            Some(other) => println!("{}: unknown ({})", attribute, other),
            None => println!("{}: unknown", attribute),
        },
    }
    Ok(())
}

/// Drive the event loop for `window`, handing inbound messages to `hook`.
async fn drain<F>(channel: &mut MqttChannel, window: Duration, mut hook: F) -> Result<()>
where
    F: FnMut(InboundMessage),
{
    let deadline = Instant::now() + window;
    while Instant::now() < deadline {
        channel.pump(&mut hook).await?;
    }
    Ok(())
}
